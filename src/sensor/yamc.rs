//! YAMC (library browser card) payload.

use serde::Serialize;
use tracing::warn;

use super::{episode_number, format_date, join_genres, join_studios, runtime_minutes, SensorData};
use crate::jellyfin::api::artwork_url;
use crate::jellyfin::models::BaseItem;
use crate::jellyfin::stream::StreamSelection;
use crate::manager::playlists::{PLAYLISTS, YAMC_MAX_TOTAL_ITEMS, YAMC_PAGE_SIZE};

const ARTWORK_WIDTH: u32 = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YamcDefaults {
    pub title_default: &'static str,
    pub line1_default: &'static str,
    pub line2_default: &'static str,
    pub line3_default: &'static str,
    pub line4_default: &'static str,
    pub line5_default: &'static str,
    pub text_link_default: &'static str,
    pub link_default: &'static str,
}

impl Default for YamcDefaults {
    fn default() -> Self {
        YamcDefaults {
            title_default: "$title",
            line1_default: "$tagline",
            line2_default: "$empty",
            line3_default: "$release - $genres",
            line4_default: "$runtime - $rating - $info",
            line5_default: "$date",
            text_link_default: "$info_url",
            link_default: "$stream_url",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YamcItem {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub title: String,
    pub episode: Option<String>,
    pub tagline: Option<String>,
    pub flag: bool,
    pub airdate: Option<String>,
    pub number: Option<String>,
    pub runtime: Option<i64>,
    pub studio: Option<String>,
    pub release: Option<String>,
    pub poster: String,
    pub fanart: String,
    pub genres: Option<String>,
    pub progress: f64,
    pub rating: Option<String>,
    /// Stream description, e.g. `1920x1080 h264`
    pub info: Option<String>,
    pub stream_url: Option<String>,
    pub info_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum YamcEntry {
    Defaults(YamcDefaults),
    Item(YamcItem),
}

/// Sensor attributes of the YAMC card. `playlists` and `data` are JSON text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YamcAttributes {
    pub last_search: String,
    pub last_playlist: String,
    pub playlists: String,
    pub total_items: i64,
    pub page: u32,
    pub page_size: u32,
    pub data: String,
}

/// `★ 8.1` from the community rating, else the critic rating scaled to 10.
pub fn rating(item: &BaseItem) -> Option<String> {
    item.community_rating
        .or(item.critic_rating.map(|critic| critic / 10.0))
        .map(|value| format!("\u{2605} {:.1}", value))
}

pub fn info_url(item: &BaseItem) -> Option<String> {
    let ids = item.provider_ids.as_ref()?;
    match item.media_type.as_str() {
        "Movie" => ids
            .get("Imdb")
            .map(|id| format!("https://trakt.tv/search/imdb/{}?id_type=movie", id)),
        "Series" => ids
            .get("Imdb")
            .map(|id| format!("https://trakt.tv/search/imdb/{}?id_type=series", id)),
        "Episode" => ids
            .get("Imdb")
            .map(|id| format!("https://trakt.tv/search/imdb/{}?id_type=episode", id)),
        "MusicAlbum" => ids
            .get("MusicBrainzAlbum")
            .map(|id| format!("https://musicbrainz.org/album/{}", id)),
        "MusicArtist" => ids
            .get("MusicBrainzArtist")
            .map(|id| format!("https://musicbrainz.org/artist/{}", id)),
        _ => None,
    }
}

pub fn item_entry(item: &BaseItem, stream: Option<&StreamSelection>, server_url: &str) -> Option<YamcItem> {
    let Some(title) = item.name.as_deref().or(item.series_name.as_deref()).filter(|t| !t.is_empty()) else {
        warn!("Skipping YAMC item {} without title", item.id);
        return None;
    };

    let played = item.user_data.as_ref().and_then(|d| d.played).unwrap_or(false);
    let mut progress = item
        .user_data
        .as_ref()
        .and_then(|d| d.played_percentage)
        .unwrap_or(if played { 100.0 } else { 0.0 });
    let mut flag = played;
    let artists = item.artists.as_ref().filter(|a| !a.is_empty()).map(|a| a.join(","));
    let full_date = format_date(item.premiere_date.as_deref(), "%d/%m/%Y");
    let year = |raw: Option<&str>| format_date(raw, "%Y");

    let (episode, tagline, release, fanart_type) = match item.media_type.as_str() {
        "Movie" => (
            None,
            Some(item.taglines.as_ref().and_then(|t| t.first().cloned()).unwrap_or_default()),
            year(item.premiere_date.as_deref()),
            "Backdrop",
        ),
        "Series" => (item.name.clone(), item.name.clone(), full_date, "Backdrop"),
        "Episode" => (item.name.clone(), item.name.clone(), full_date, "Primary"),
        "MusicAlbum" => {
            flag = false;
            progress = 0.0;
            (None, artists, year(item.premiere_date.as_deref()), "Primary")
        }
        "MusicArtist" => {
            flag = false;
            progress = 0.0;
            (None, artists, year(item.date_created.as_deref()), "Primary")
        }
        _ => {
            flag = false;
            progress = 0.0;
            (item.name.clone(), item.name.clone(), full_date, "Primary")
        }
    };

    Some(YamcItem {
        id: item.id.clone(),
        item_type: item.media_type.clone(),
        title: title.to_string(),
        episode,
        tagline,
        flag,
        airdate: item.date_created.clone(),
        number: episode_number(item),
        runtime: runtime_minutes(item),
        studio: join_studios(item),
        release,
        poster: artwork_url(server_url, &item.id, "Primary", ARTWORK_WIDTH),
        fanart: artwork_url(server_url, &item.id, fanart_type, ARTWORK_WIDTH),
        genres: join_genres(item),
        progress,
        rating: rating(item),
        info: stream.map(|s| s.info.clone()),
        stream_url: stream.map(|s| s.url.clone()).filter(|url| !url.is_empty()),
        info_url: info_url(item),
    })
}

pub fn payload(data: &SensorData) -> Vec<YamcEntry> {
    let mut entries = vec![YamcEntry::Defaults(YamcDefaults::default())];
    if let Some(yamc) = &data.yamc {
        entries.extend(
            yamc.items
                .iter()
                .filter_map(|item| item_entry(item, data.yamc_streams.get(&item.id), &data.server_url))
                .map(YamcEntry::Item),
        );
    }
    entries
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        warn!("Failed to encode YAMC attribute: {}", e);
        "[]".to_string()
    })
}

pub fn attributes(data: &SensorData) -> YamcAttributes {
    let total = data.yamc.as_ref().map_or(0, |yamc| yamc.total_record_count);
    YamcAttributes {
        last_search: data.last_search.clone(),
        last_playlist: data.last_playlist.clone(),
        playlists: to_json(&PLAYLISTS),
        total_items: total.min(YAMC_MAX_TOTAL_ITEMS),
        page: data.yamc_page,
        page_size: YAMC_PAGE_SIZE,
        data: to_json(&payload(data)),
    }
}
