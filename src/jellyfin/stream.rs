//! Stream URL resolution from `PlaybackInfo` media sources

use serde_json::json;
use tracing::{debug, error};

use crate::jellyfin::api::{JellyfinApiContract, JellyfinError};
use crate::jellyfin::auth::CLIENT_NAME;
use crate::jellyfin::models::{MediaSourceInfo, PlaybackInfoResponse};

/// A playable URL for an item together with its mime type and a short
/// human-readable description of the main stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSelection {
    pub url: String,
    pub mime_type: String,
    pub info: String,
}

fn is_audio(media_type: &str) -> bool {
    matches!(media_type, "Audio" | "track")
}

/// Device profile sent with `PlaybackInfo` requests.
pub fn device_profile() -> serde_json::Value {
    let subtitle_profiles: Vec<serde_json::Value> = [
        ("srt", "External"),
        ("srt", "Embed"),
        ("ass", "External"),
        ("ass", "Embed"),
        ("sub", "Embed"),
        ("sub", "External"),
        ("ssa", "Embed"),
        ("ssa", "External"),
        ("smi", "Embed"),
        ("smi", "External"),
        // Jellyfin refuses to serve image based subtitles as external files.
        ("pgssub", "Embed"),
        ("dvdsub", "Embed"),
        ("pgs", "Embed"),
    ]
    .iter()
    .map(|(format, method)| json!({ "Format": format, "Method": method }))
    .collect();

    json!({
        "Name": CLIENT_NAME,
        "MaxStreamingBitrate": 25_000_000,
        "MusicStreamingTranscodingBitrate": 1_920_000,
        "TimelineOffsetSeconds": 5,
        "TranscodingProfiles": [
            { "Type": "Audio", "Container": "mp3", "Protocol": "http", "AudioCodec": "mp3", "MaxAudioChannels": "2" },
            { "Type": "Video", "Container": "mp4", "Protocol": "http", "AudioCodec": "aac,mp3,opus,flac,vorbis",
              "VideoCodec": "h264,mpeg4,mpeg2video", "MaxAudioChannels": "6" },
            { "Container": "jpeg", "Type": "Photo" }
        ],
        "DirectPlayProfiles": [
            { "Type": "Audio", "Container": "mp3", "AudioCodec": "mp3" },
            { "Type": "Audio", "Container": "m4a,m4b", "AudioCodec": "aac" },
            { "Type": "Video", "Container": "mp4,m4v", "AudioCodec": "aac,mp3,opus,flac,vorbis",
              "VideoCodec": "h264,mpeg4,mpeg2video", "MaxAudioChannels": "6" }
        ],
        "ResponseProfiles": [],
        "ContainerProfiles": [],
        "CodecProfiles": [],
        "SubtitleProfiles": subtitle_profiles,
    })
}

/// Picks the media source with the highest weight; direct-streamable sources
/// always beat transcode-only ones, bitrate breaks ties.
pub fn select_media_source(playback_info: &PlaybackInfoResponse) -> Option<&MediaSourceInfo> {
    let mut selected = None;
    let mut selected_weight = 0.0_f64;
    for source in playback_info.media_sources.as_deref().unwrap_or_default() {
        let weight = if source.supports_direct_stream { 50_000.0 } else { 0.0 }
            + source.bitrate.unwrap_or(0) as f64 / 1000.0;
        if weight > selected_weight {
            selected_weight = weight;
            selected = Some(source);
        }
    }
    selected
}

/// Builds the stream URL, mime type and info string for a selected source.
pub fn build_stream(
    server_url: &str,
    api_key: &str,
    item_id: &str,
    media_type: &str,
    source: &MediaSourceInfo,
) -> StreamSelection {
    let audio = is_audio(media_type);
    let kind = if audio { "audio" } else { "video" };
    let mut url = String::new();
    let mut mime_type = "none/none".to_string();
    let container = source.container.clone().unwrap_or_default();

    if source.supports_direct_stream {
        let endpoint = if audio { "Audio" } else { "Videos" };
        mime_type = format!("{}/{}", kind, container);
        url = format!(
            "{}/{}/{}/stream?static=true&MediaSourceId={}&api_key={}",
            server_url,
            endpoint,
            item_id,
            source.id.as_deref().unwrap_or_default(),
            api_key
        );
    } else if source.supports_transcoding {
        url = format!("{}{}", server_url, source.transcoding_url.as_deref().unwrap_or_default());
        let transcoding_container = source.transcoding_container.clone().unwrap_or(container);
        mime_type = format!("{}/{}", kind, transcoding_container);
    }

    let streams = source.media_streams.as_deref().unwrap_or_default();
    let info = if audio {
        streams.iter().find(|s| s.stream_type == "Audio").map(|s| {
            format!(
                "{} {}Hz",
                s.codec.as_deref().unwrap_or("unknown"),
                s.sample_rate.unwrap_or(0)
            )
        })
    } else {
        streams.iter().find(|s| s.stream_type == "Video").map(|s| {
            format!(
                "{}x{} {}",
                s.width.unwrap_or(0),
                s.height.unwrap_or(0),
                s.codec.as_deref().unwrap_or("unknown")
            )
        })
    };

    StreamSelection {
        url,
        mime_type,
        info: info.unwrap_or_else(|| "Not playable".to_string()),
    }
}

/// Resolves a stream for `item_id` via the server's `PlaybackInfo` endpoint.
///
/// `Ok(None)` means the server returned no usable media source.
pub async fn resolve_stream(
    api: &dyn JellyfinApiContract,
    item_id: &str,
    media_type: &str,
    user_id: Option<&str>,
) -> Result<Option<StreamSelection>, JellyfinError> {
    let api_key = api
        .api_key()
        .ok_or_else(|| JellyfinError::Authentication("API key not set".to_string()))?
        .to_string();
    let playback_info = api.playback_info(item_id, user_id, &device_profile()).await?;
    let Some(source) = select_media_source(&playback_info) else {
        error!("No playback info for item id {}", item_id);
        return Ok(None);
    };
    let selection = build_stream(api.server_url(), &api_key, item_id, media_type, source);
    debug!("stream info: {} - url: {}", selection.info, selection.url);
    Ok(Some(selection))
}
