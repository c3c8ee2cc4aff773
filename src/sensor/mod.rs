//! Server status sensor and the card payloads it carries.
//!
//! Rendering is a pure function of [`SensorData`], a snapshot the client
//! manager takes of its state.

pub mod upcoming;
pub mod yamc;
#[cfg(test)]
mod tests;

use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

use crate::jellyfin::models::{BaseItem, ItemCounts, ItemsResponse, SystemInfo, TICKS_PER_SECOND};
use crate::jellyfin::stream::StreamSelection;

pub use upcoming::UpcomingEntry;
pub use yamc::{YamcAttributes, YamcEntry};

const DEFAULT_NAME: &str = "Jellyfin";

/// Manager state needed to render the sensors.
#[derive(Debug, Clone, Default)]
pub struct SensorData {
    pub server_url: String,
    pub available: bool,
    pub info: Option<SystemInfo>,
    /// Library totals; `None` until the first successful fetch
    pub item_counts: Option<ItemCounts>,
    pub generate_upcoming: bool,
    pub generate_yamc: bool,
    pub upcoming: Option<ItemsResponse>,
    pub yamc: Option<ItemsResponse>,
    /// Resolved streams of the current YAMC page, by item id
    pub yamc_streams: HashMap<String, StreamSelection>,
    pub yamc_page: u32,
    pub last_search: String,
    pub last_playlist: String,
    pub connected_sessions: usize,
    pub playing_sessions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerAttributes {
    pub os: Option<String>,
    pub update_available: bool,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<UpcomingEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yamc: Option<YamcAttributes>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerSensor {
    pub name: String,
    pub unique_id: Option<String>,
    /// `on` while the manager is available
    pub state: &'static str,
    pub attributes: Option<ServerAttributes>,
}

impl ServerSensor {
    pub fn render(data: &SensorData) -> Self {
        let info = data.info.as_ref().filter(|_| data.available);
        let name = match info {
            Some(info) if !info.server_name.is_empty() => format!("Jellyfin {}", info.server_name),
            _ => DEFAULT_NAME.to_string(),
        };

        let attributes = info.map(|info| ServerAttributes {
            os: info.operating_system.clone(),
            update_available: info.has_update_available,
            version: info.version.clone(),
            data: data
                .generate_upcoming
                .then(|| upcoming::payload(data.upcoming.as_ref(), &data.server_url)),
            yamc: data.generate_yamc.then(|| yamc::attributes(data)),
        });

        ServerSensor {
            name,
            unique_id: info.map(|info| info.id.clone()),
            state: if data.available { "on" } else { "off" },
            attributes,
        }
    }
}

/// Library and session count gauges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountSensor {
    pub name: String,
    pub unique_id: Option<String>,
    /// `None` while the count is unknown
    pub value: Option<u64>,
    pub available: bool,
}

/// Movie, episode and series totals followed by the connected and playing
/// session counts.
pub fn count_sensors(data: &SensorData) -> Vec<CountSensor> {
    let server_name = data
        .info
        .as_ref()
        .map(|info| info.server_name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_NAME);
    let counts = data.item_counts.as_ref();

    [
        ("movie", "Movie", counts.map(|c| c.movie_count)),
        ("episode", "Episode", counts.map(|c| c.episode_count)),
        ("series", "Series", counts.map(|c| c.series_count)),
        ("connected_session", "Connected Session", Some(data.connected_sessions as u64)),
        ("playing_session", "Playing Session", Some(data.playing_sessions as u64)),
    ]
    .into_iter()
    .map(|(key, label, value)| CountSensor {
        name: format!("{} {} Count", server_name, label),
        unique_id: data.info.as_ref().map(|info| format!("{}_{}_count", info.id, key)),
        value,
        available: data.available,
    })
    .collect()
}

// --- helpers shared by the card payloads ---

pub(crate) fn join_studios(item: &BaseItem) -> Option<String> {
    let joined = item
        .studios
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|s| s.name.as_deref())
        .collect::<Vec<_>>()
        .join(",");
    (!joined.is_empty()).then_some(joined)
}

pub(crate) fn join_genres(item: &BaseItem) -> Option<String> {
    item.genres
        .as_ref()
        .filter(|genres| !genres.is_empty())
        .map(|genres| genres.join(","))
}

/// `S{season}E{episode}` when both numbers are known
pub(crate) fn episode_number(item: &BaseItem) -> Option<String> {
    match (item.parent_index_number, item.index_number) {
        (Some(season), Some(episode)) => Some(format!("S{}E{}", season, episode)),
        _ => None,
    }
}

pub(crate) fn runtime_minutes(item: &BaseItem) -> Option<i64> {
    item.run_time_ticks
        .filter(|ticks| *ticks > 0)
        .map(|ticks| ticks / TICKS_PER_SECOND / 60)
}

/// Parses a Jellyfin timestamp (`2023-05-01T00:00:00.0000000Z`) or plain date.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok())
}

pub(crate) fn format_date(raw: Option<&str>, format: &str) -> Option<String> {
    raw.and_then(parse_date).map(|date| date.format(format).to_string())
}
