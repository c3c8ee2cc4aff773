//! Predefined YAMC playlists

use serde::Serialize;

/// Items shown per YAMC page and requested from Next Up
pub const YAMC_PAGE_SIZE: u32 = 25;
/// Upper bound reported as `total_items`
pub const YAMC_MAX_TOTAL_ITEMS: i64 = 50;

pub const DEFAULT_PLAYLIST: &str = "latest_movies";
/// Served from `/Shows/NextUp` instead of `/Items`
pub const NEXT_UP_PLAYLIST: &str = "nextup";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Playlist {
    pub name: &'static str,
    pub label: &'static str,
    pub query: &'static [(&'static str, &'static str)],
}

pub const PLAYLISTS: &[Playlist] = &[
    Playlist {
        name: "latest_movies",
        label: "Latest Movies",
        query: &[
            ("includeItemTypes", "Movie"),
            ("sortBy", "DateCreated"),
            ("sortOrder", "Descending"),
            ("filters", "IsUnplayed"),
        ],
    },
    Playlist {
        name: "latest_series",
        label: "Latest Series",
        query: &[
            ("includeItemTypes", "Series"),
            ("sortBy", "DateLastContentAdded"),
            ("sortOrder", "Descending"),
        ],
    },
    Playlist {
        name: "latest_music",
        label: "Latest Music",
        query: &[
            ("includeItemTypes", "MusicAlbum"),
            ("sortBy", "DateCreated"),
            ("sortOrder", "Descending"),
        ],
    },
    Playlist {
        name: "continue_watching",
        label: "Continue Watching",
        query: &[
            ("filters", "IsResumable"),
            ("sortBy", "DatePlayed"),
            ("sortOrder", "Descending"),
        ],
    },
    Playlist {
        name: "favorites",
        label: "Favorites",
        query: &[("filters", "IsFavorite"), ("includeItemTypes", "Movie,Series,MusicAlbum")],
    },
    Playlist {
        name: NEXT_UP_PLAYLIST,
        label: "Next Up",
        query: &[],
    },
];

pub fn find(name: &str) -> Option<&'static Playlist> {
    PLAYLISTS.iter().find(|p| p.name == name)
}
