//! Read-only view of a tracked device, as rendered to media player entities.

use serde::Serialize;

use crate::jellyfin::api::artwork_url;
use crate::jellyfin::models::{NowPlayingItem, TICKS_PER_SECOND};
use crate::tracker::{DeviceIdentity, DeviceRecord, PlaybackState};

/// Width requested for now-playing artwork
const ARTWORK_WIDTH: u32 = 500;

/// Borrowed view over a [`DeviceRecord`] with media player style accessors.
#[derive(Debug, Clone, Copy)]
pub struct DeviceView<'a> {
    record: &'a DeviceRecord,
    server_url: &'a str,
}

impl<'a> DeviceView<'a> {
    pub fn new(record: &'a DeviceRecord, server_url: &'a str) -> Self {
        DeviceView { record, server_url }
    }

    fn item(&self) -> Option<&'a NowPlayingItem> {
        self.record.session.now_playing_item.as_ref()
    }

    pub fn identity(&self) -> &'a DeviceIdentity {
        &self.record.identity
    }

    pub fn session_id(&self) -> Option<&'a str> {
        self.record.session.id.as_deref()
    }

    /// Per-login device id reported by the server
    pub fn unique_id(&self) -> Option<&'a str> {
        self.record.session.device_id.as_deref()
    }

    pub fn name(&self) -> Option<&'a str> {
        self.record.session.device_name.as_deref()
    }

    pub fn client(&self) -> Option<&'a str> {
        self.record.session.client.as_deref()
    }

    pub fn username(&self) -> Option<&'a str> {
        self.record.session.user_name.as_deref()
    }

    pub fn state(&self) -> PlaybackState {
        if self.record.is_active() {
            PlaybackState::of_session(&self.record.session)
        } else {
            PlaybackState::Off
        }
    }

    pub fn is_now_playing(&self) -> bool {
        matches!(self.state(), PlaybackState::Playing | PlaybackState::Paused)
    }

    pub fn media_title(&self) -> Option<&'a str> {
        self.item()?.name.as_deref()
    }

    pub fn media_series_title(&self) -> Option<&'a str> {
        self.item()?.series_name.as_deref()
    }

    pub fn media_season(&self) -> Option<i32> {
        self.item()?.parent_index_number
    }

    pub fn media_episode(&self) -> Option<i32> {
        self.item()?.index_number
    }

    pub fn media_album_name(&self) -> Option<&'a str> {
        self.item()?.album.as_deref()
    }

    /// First listed artist
    pub fn media_artist(&self) -> Option<&'a str> {
        self.item()?.artists.as_ref()?.first().map(String::as_str)
    }

    pub fn media_album_artist(&self) -> Option<&'a str> {
        self.item()?.album_artist.as_deref()
    }

    pub fn media_id(&self) -> Option<&'a str> {
        self.item().map(|item| item.id.as_str())
    }

    pub fn media_type(&self) -> Option<&'a str> {
        self.item().map(|item| item.media_type.as_str())
    }

    pub fn media_position_secs(&self) -> Option<f64> {
        let ticks = self.record.session.play_state.as_ref()?.position_ticks?;
        Some(ticks as f64 / TICKS_PER_SECOND as f64)
    }

    pub fn media_runtime_secs(&self) -> Option<f64> {
        let ticks = self.item()?.run_time_ticks?;
        Some(ticks as f64 / TICKS_PER_SECOND as f64)
    }

    pub fn media_percent_played(&self) -> Option<f64> {
        let runtime = self.media_runtime_secs().filter(|r| *r > 0.0)?;
        Some(self.media_position_secs()? / runtime * 100.0)
    }

    /// Artwork of the current item, Thumb preferred over Primary.
    pub fn media_image_url(&self) -> Option<String> {
        if !self.is_now_playing() {
            return None;
        }
        let item = self.item()?;
        let tags = item.image_tags.as_ref()?;
        let image_type = if tags.thumb.is_some() {
            "Thumb"
        } else if tags.primary.is_some() {
            "Primary"
        } else {
            return None;
        };
        Some(artwork_url(self.server_url, &item.id, image_type, ARTWORK_WIDTH))
    }

    pub fn supports_remote_control(&self) -> bool {
        self.record.session.supports_remote_control
    }

    /// Everything above, collected for rendering.
    pub fn attributes(&self) -> MediaPlayerAttributes {
        MediaPlayerAttributes {
            identity: self.identity().to_string(),
            state: self.state(),
            name: self.name().map(str::to_string),
            client: self.client().map(str::to_string),
            username: self.username().map(str::to_string),
            session_id: self.session_id().map(str::to_string),
            media_title: self.media_title().map(str::to_string),
            media_series_title: self.media_series_title().map(str::to_string),
            media_season: self.media_season(),
            media_episode: self.media_episode(),
            media_album_name: self.media_album_name().map(str::to_string),
            media_artist: self.media_artist().map(str::to_string),
            media_album_artist: self.media_album_artist().map(str::to_string),
            media_content_id: self.media_id().map(str::to_string),
            media_content_type: self.media_type().map(str::to_string),
            media_position: self.media_position_secs(),
            media_duration: self.media_runtime_secs(),
            media_percent_played: self.media_percent_played(),
            media_image_url: self.media_image_url(),
            supports_remote_control: self.supports_remote_control(),
        }
    }
}

/// Rendered media player state of one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaPlayerAttributes {
    pub identity: String,
    pub state: PlaybackState,
    pub name: Option<String>,
    pub client: Option<String>,
    pub username: Option<String>,
    pub session_id: Option<String>,
    pub media_title: Option<String>,
    pub media_series_title: Option<String>,
    pub media_season: Option<i32>,
    pub media_episode: Option<i32>,
    pub media_album_name: Option<String>,
    pub media_artist: Option<String>,
    pub media_album_artist: Option<String>,
    pub media_content_id: Option<String>,
    pub media_content_type: Option<String>,
    pub media_position: Option<f64>,
    pub media_duration: Option<f64>,
    pub media_percent_played: Option<f64>,
    pub media_image_url: Option<String>,
    pub supports_remote_control: bool,
}
