//! "Upcoming media" card payload built from Next Up.

use serde::Serialize;
use tracing::warn;

use super::{episode_number, format_date, join_genres, join_studios, runtime_minutes};
use crate::jellyfin::api::artwork_url;
use crate::jellyfin::models::{BaseItem, ItemsResponse};

const ARTWORK_WIDTH: u32 = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingDefaults {
    pub title_default: &'static str,
    pub line1_default: &'static str,
    pub line2_default: &'static str,
    pub line3_default: &'static str,
    pub line4_default: &'static str,
    pub icon: &'static str,
}

impl Default for UpcomingDefaults {
    fn default() -> Self {
        UpcomingDefaults {
            title_default: "$title",
            line1_default: "$episode",
            line2_default: "$release",
            line3_default: "$rating - $runtime",
            line4_default: "$number - $studio",
            icon: "mdi:arrow-down-bold-circle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingItem {
    pub title: String,
    pub episode: String,
    pub flag: bool,
    pub airdate: Option<String>,
    pub number: Option<String>,
    pub runtime: Option<i64>,
    pub studio: Option<String>,
    /// `dd/mm/YYYY`
    pub release: Option<String>,
    pub poster: String,
    pub fanart: String,
    pub genres: Option<String>,
    pub rating: Option<String>,
    pub stream_url: Option<String>,
    pub info_url: Option<String>,
}

/// The defaults header followed by one entry per item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UpcomingEntry {
    Defaults(UpcomingDefaults),
    Item(UpcomingItem),
}

fn item_entry(item: &BaseItem, server_url: &str) -> Option<UpcomingItem> {
    let title = item.series_name.as_deref().or(item.name.as_deref()).filter(|t| !t.is_empty());
    let episode = item.name.as_deref().filter(|e| !e.is_empty());
    let (Some(title), Some(episode)) = (title, episode) else {
        warn!("Skipping upcoming item {} without title or episode name", item.id);
        return None;
    };

    Some(UpcomingItem {
        title: title.to_string(),
        episode: episode.to_string(),
        flag: false,
        airdate: item.date_created.clone(),
        number: episode_number(item),
        runtime: runtime_minutes(item),
        studio: join_studios(item),
        release: format_date(item.premiere_date.as_deref(), "%d/%m/%Y"),
        poster: artwork_url(server_url, &item.id, "Primary", ARTWORK_WIDTH),
        fanart: artwork_url(server_url, &item.id, "Backdrop", ARTWORK_WIDTH),
        genres: join_genres(item),
        rating: None,
        stream_url: None,
        info_url: None,
    })
}

pub fn payload(next_up: Option<&ItemsResponse>, server_url: &str) -> Vec<UpcomingEntry> {
    let mut entries = vec![UpcomingEntry::Defaults(UpcomingDefaults::default())];
    if let Some(next_up) = next_up {
        entries.extend(
            next_up
                .items
                .iter()
                .filter_map(|item| item_entry(item, server_url))
                .map(UpcomingEntry::Item),
        );
    }
    entries
}
