//! Data models for Jellyfin API responses

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ticks per second used by Jellyfin for positions and runtimes (100ns units)
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Server information returned by `/System/Info`
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SystemInfo {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "ServerName", default)]
    pub server_name: String,
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "OperatingSystem", default)]
    pub operating_system: Option<String>,
    #[serde(rename = "HasUpdateAvailable", default)]
    pub has_update_available: bool,
}

/// Playback state for a session.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct PlayerStateInfo {
    #[serde(rename = "IsPaused", default)]
    pub is_paused: bool,
    #[serde(rename = "CanSeek", default)]
    pub can_seek: bool,
    #[serde(rename = "IsMuted", default)]
    pub is_muted: bool,
    #[serde(rename = "RepeatMode", default)]
    pub repeat_mode: Option<String>,
    #[serde(rename = "PositionTicks", default)]
    pub position_ticks: Option<i64>,
    #[serde(rename = "VolumeLevel", default)]
    pub volume_level: Option<i32>,
    #[serde(rename = "MediaSourceId", default)]
    pub media_source_id: Option<String>,
    #[serde(rename = "PlayMethod", default)]
    pub play_method: Option<String>,
}

/// Image tag identifiers keyed by image type.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ImageTags {
    #[serde(rename = "Primary", default)]
    pub primary: Option<String>,
    #[serde(rename = "Thumb", default)]
    pub thumb: Option<String>,
    #[serde(rename = "Backdrop", default)]
    pub backdrop: Option<String>,
}

/// Media item currently playing in a session.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct NowPlayingItem {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Type", default)]
    pub media_type: String,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "RunTimeTicks", default)]
    pub run_time_ticks: Option<i64>,
    #[serde(rename = "IndexNumber", default)]
    pub index_number: Option<i32>,
    #[serde(rename = "ParentIndexNumber", default)]
    pub parent_index_number: Option<i32>,
    #[serde(rename = "SeriesName", default)]
    pub series_name: Option<String>,
    #[serde(rename = "Album", default)]
    pub album: Option<String>,
    #[serde(rename = "Artists", default)]
    pub artists: Option<Vec<String>>,
    #[serde(rename = "AlbumArtist", default)]
    pub album_artist: Option<String>,
    #[serde(rename = "IsThemeMedia", default)]
    pub is_theme_media: bool,
    #[serde(rename = "ImageTags", default)]
    pub image_tags: Option<ImageTags>,
}

/// One active session as reported by `/Sessions` or the `Sessions` push message.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct SessionInfo {
    #[serde(rename = "Id", default)]
    pub id: Option<String>,
    #[serde(rename = "UserId", default)]
    pub user_id: Option<String>,
    #[serde(rename = "UserName", default)]
    pub user_name: Option<String>,
    #[serde(rename = "Client", default)]
    pub client: Option<String>,
    #[serde(rename = "DeviceId", default)]
    pub device_id: Option<String>,
    #[serde(rename = "DeviceName", default)]
    pub device_name: Option<String>,
    #[serde(rename = "HasCustomDeviceName", default)]
    pub has_custom_device_name: bool,
    #[serde(rename = "SupportsRemoteControl", default)]
    pub supports_remote_control: bool,
    #[serde(rename = "PlayState", default)]
    pub play_state: Option<PlayerStateInfo>,
    #[serde(rename = "NowPlayingItem", default)]
    pub now_playing_item: Option<NowPlayingItem>,
}

/// Studio/person reference
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct NameGuidPair {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Id", default)]
    pub id: Option<String>,
}

/// Per-user data attached to an item
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct UserItemData {
    #[serde(rename = "PlayedPercentage", default)]
    pub played_percentage: Option<f64>,
    #[serde(rename = "Played", default)]
    pub played: Option<bool>,
}

/// Library item as returned by `/Items` and `/Shows/NextUp`
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct BaseItem {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Type")]
    pub media_type: String,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "SeriesName", default)]
    pub series_name: Option<String>,
    #[serde(rename = "ParentIndexNumber", default)]
    pub parent_index_number: Option<i32>,
    #[serde(rename = "IndexNumber", default)]
    pub index_number: Option<i32>,
    #[serde(rename = "DateCreated", default)]
    pub date_created: Option<String>,
    #[serde(rename = "PremiereDate", default)]
    pub premiere_date: Option<String>,
    #[serde(rename = "RunTimeTicks", default)]
    pub run_time_ticks: Option<i64>,
    #[serde(rename = "Studios", default)]
    pub studios: Option<Vec<NameGuidPair>>,
    #[serde(rename = "Genres", default)]
    pub genres: Option<Vec<String>>,
    #[serde(rename = "UserData", default)]
    pub user_data: Option<UserItemData>,
    #[serde(rename = "Taglines", default)]
    pub taglines: Option<Vec<String>>,
    #[serde(rename = "ProviderIds", default)]
    pub provider_ids: Option<HashMap<String, String>>,
    #[serde(rename = "Artists", default)]
    pub artists: Option<Vec<String>>,
    #[serde(rename = "CommunityRating", default)]
    pub community_rating: Option<f64>,
    #[serde(rename = "CriticRating", default)]
    pub critic_rating: Option<f64>,
}

/// Paged collection of library items
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ItemsResponse {
    #[serde(rename = "Items")]
    pub items: Vec<BaseItem>,
    #[serde(rename = "TotalRecordCount", default)]
    pub total_record_count: i64,
    #[serde(rename = "StartIndex", default)]
    pub start_index: Option<i64>,
}

/// Library totals from `/Items/Counts`
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemCounts {
    #[serde(rename = "MovieCount", default)]
    pub movie_count: u64,
    #[serde(rename = "SeriesCount", default)]
    pub series_count: u64,
    #[serde(rename = "EpisodeCount", default)]
    pub episode_count: u64,
    #[serde(rename = "AlbumCount", default)]
    pub album_count: u64,
    #[serde(rename = "SongCount", default)]
    pub song_count: u64,
}

/// Audio/video stream within a media source.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct MediaStream {
    #[serde(rename = "Type")]
    pub stream_type: String,
    #[serde(rename = "Codec", default)]
    pub codec: Option<String>,
    #[serde(rename = "SampleRate", default)]
    pub sample_rate: Option<i64>,
    #[serde(rename = "Width", default)]
    pub width: Option<i64>,
    #[serde(rename = "Height", default)]
    pub height: Option<i64>,
}

/// Media source (file/stream) for playback.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct MediaSourceInfo {
    #[serde(rename = "Id", default)]
    pub id: Option<String>,
    #[serde(rename = "SupportsDirectStream", default)]
    pub supports_direct_stream: bool,
    #[serde(rename = "SupportsTranscoding", default)]
    pub supports_transcoding: bool,
    #[serde(rename = "Container", default)]
    pub container: Option<String>,
    #[serde(rename = "Bitrate", default)]
    pub bitrate: Option<i64>,
    #[serde(rename = "TranscodingUrl", default)]
    pub transcoding_url: Option<String>,
    #[serde(rename = "TranscodingContainer", default)]
    pub transcoding_container: Option<String>,
    #[serde(rename = "MediaStreams", default)]
    pub media_streams: Option<Vec<MediaStream>>,
}

/// Response from `/Items/{id}/PlaybackInfo`
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct PlaybackInfoResponse {
    #[serde(rename = "MediaSources", default)]
    pub media_sources: Option<Vec<MediaSourceInfo>>,
    #[serde(rename = "PlaySessionId", default)]
    pub play_session_id: Option<String>,
    #[serde(rename = "ErrorCode", default)]
    pub error_code: Option<String>,
}
