//! Tests for sensor rendering and card payloads

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::jellyfin::models::{BaseItem, ItemCounts, ItemsResponse, NameGuidPair, SystemInfo, UserItemData};
    use crate::jellyfin::stream::StreamSelection;
    use crate::sensor::upcoming::{self, UpcomingEntry};
    use crate::sensor::yamc::{self, YamcEntry};
    use crate::sensor::{count_sensors, format_date, parse_date, ServerSensor, SensorData};

    const SERVER: &str = "http://jf:8096";

    fn info() -> SystemInfo {
        SystemInfo {
            id: "srv".to_string(),
            server_name: "Den".to_string(),
            version: "10.9.1".to_string(),
            operating_system: Some("Linux".to_string()),
            has_update_available: true,
        }
    }

    fn data() -> SensorData {
        SensorData {
            server_url: SERVER.to_string(),
            available: true,
            info: Some(info()),
            yamc_page: 1,
            last_playlist: "latest_movies".to_string(),
            ..Default::default()
        }
    }

    fn episode() -> BaseItem {
        BaseItem {
            id: "ep1".to_string(),
            media_type: "Episode".to_string(),
            name: Some("The Pilot".to_string()),
            series_name: Some("The Show".to_string()),
            parent_index_number: Some(2),
            index_number: Some(5),
            date_created: Some("2024-01-02T10:00:00.0000000Z".to_string()),
            premiere_date: Some("2023-11-20T00:00:00.0000000Z".to_string()),
            run_time_ticks: Some(26_400_000_000),
            studios: Some(vec![
                NameGuidPair { name: Some("HBO".to_string()), id: None },
                NameGuidPair { name: None, id: Some("x".to_string()) },
                NameGuidPair { name: Some("BBC".to_string()), id: None },
            ]),
            genres: Some(vec!["Drama".to_string(), "Crime".to_string()]),
            ..Default::default()
        }
    }

    fn page(items: Vec<BaseItem>, total: i64) -> ItemsResponse {
        ItemsResponse {
            items,
            total_record_count: total,
            start_index: Some(0),
        }
    }

    #[test]
    fn test_server_sensor_on() {
        let sensor = ServerSensor::render(&data());
        assert_eq!(sensor.name, "Jellyfin Den");
        assert_eq!(sensor.state, "on");
        assert_eq!(sensor.unique_id.as_deref(), Some("srv"));
        let attributes = sensor.attributes.unwrap();
        assert_eq!(attributes.os.as_deref(), Some("Linux"));
        assert!(attributes.update_available);
        assert_eq!(attributes.version, "10.9.1");
        assert!(attributes.data.is_none());
        assert!(attributes.yamc.is_none());
    }

    #[test]
    fn test_server_sensor_off_when_unavailable() {
        let sensor = ServerSensor::render(&SensorData { available: false, ..data() });
        assert_eq!(sensor.state, "off");
        assert_eq!(sensor.name, "Jellyfin");
        assert!(sensor.attributes.is_none());
    }

    #[test]
    fn test_count_sensors() {
        let sensors = count_sensors(&SensorData {
            item_counts: Some(ItemCounts {
                movie_count: 120,
                episode_count: 840,
                series_count: 31,
                ..Default::default()
            }),
            connected_sessions: 3,
            playing_sessions: 1,
            ..data()
        });
        let names: Vec<&str> = sensors.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Den Movie Count",
                "Den Episode Count",
                "Den Series Count",
                "Den Connected Session Count",
                "Den Playing Session Count",
            ]
        );
        let values: Vec<Option<u64>> = sensors.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![Some(120), Some(840), Some(31), Some(3), Some(1)]);
        assert_eq!(sensors[0].unique_id.as_deref(), Some("srv_movie_count"));
        assert_eq!(sensors[3].unique_id.as_deref(), Some("srv_connected_session_count"));
    }

    #[test]
    fn test_item_counts_unknown_before_first_fetch() {
        let sensors = count_sensors(&data());
        assert!(sensors[..3].iter().all(|s| s.value.is_none()));
        assert_eq!(sensors[4].value, Some(0));
    }

    #[test]
    fn test_upcoming_payload() {
        let mut nameless = episode();
        nameless.name = None;
        let next_up = page(vec![episode(), nameless], 2);

        let entries = upcoming::payload(Some(&next_up), SERVER);
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0], UpcomingEntry::Defaults(_)));
        let UpcomingEntry::Item(item) = &entries[1] else {
            panic!("expected an item");
        };
        assert_eq!(item.title, "The Show");
        assert_eq!(item.episode, "The Pilot");
        assert_eq!(item.number.as_deref(), Some("S2E5"));
        assert_eq!(item.runtime, Some(44));
        assert_eq!(item.studio.as_deref(), Some("HBO,BBC"));
        assert_eq!(item.genres.as_deref(), Some("Drama,Crime"));
        assert_eq!(item.release.as_deref(), Some("20/11/2023"));
        assert_eq!(item.poster, "http://jf:8096/Items/ep1/Images/Primary?MaxWidth=500&format=jpg");
        assert_eq!(item.fanart, "http://jf:8096/Items/ep1/Images/Backdrop?MaxWidth=500&format=jpg");
    }

    #[test]
    fn test_upcoming_payload_serializes_defaults_first() {
        let json = serde_json::to_value(upcoming::payload(None, SERVER)).unwrap();
        assert_eq!(json[0]["title_default"], "$title");
        assert_eq!(json[0]["icon"], "mdi:arrow-down-bold-circle");
    }

    #[test]
    fn test_sensor_includes_upcoming_when_enabled() {
        let sensor = ServerSensor::render(&SensorData {
            generate_upcoming: true,
            upcoming: Some(page(vec![episode()], 1)),
            ..data()
        });
        assert_eq!(sensor.attributes.unwrap().data.unwrap().len(), 2);
    }

    #[test]
    fn test_yamc_rating_and_info_url() {
        let mut movie = BaseItem {
            id: "m1".to_string(),
            media_type: "Movie".to_string(),
            name: Some("Heat".to_string()),
            community_rating: Some(8.26),
            provider_ids: Some(HashMap::from([("Imdb".to_string(), "tt0113277".to_string())])),
            ..Default::default()
        };
        assert_eq!(yamc::rating(&movie).as_deref(), Some("\u{2605} 8.3"));
        assert_eq!(
            yamc::info_url(&movie).as_deref(),
            Some("https://trakt.tv/search/imdb/tt0113277?id_type=movie")
        );

        movie.community_rating = None;
        movie.critic_rating = Some(87.0);
        assert_eq!(yamc::rating(&movie).as_deref(), Some("\u{2605} 8.7"));

        let album = BaseItem {
            id: "a1".to_string(),
            media_type: "MusicAlbum".to_string(),
            provider_ids: Some(HashMap::from([("MusicBrainzAlbum".to_string(), "mb-1".to_string())])),
            ..Default::default()
        };
        assert_eq!(yamc::info_url(&album).as_deref(), Some("https://musicbrainz.org/album/mb-1"));
    }

    #[test]
    fn test_yamc_movie_entry() {
        let movie = BaseItem {
            id: "m1".to_string(),
            media_type: "Movie".to_string(),
            name: Some("Heat".to_string()),
            premiere_date: Some("1995-12-15T00:00:00.0000000Z".to_string()),
            taglines: Some(vec!["A Los Angeles crime saga".to_string()]),
            user_data: Some(UserItemData { played_percentage: Some(40.0), played: Some(false) }),
            ..Default::default()
        };
        let stream = StreamSelection {
            url: "http://jf:8096/Videos/m1/stream".to_string(),
            mime_type: "video/mp4".to_string(),
            info: "1920x1080 h264".to_string(),
        };

        let item = yamc::item_entry(&movie, Some(&stream), SERVER).unwrap();
        assert_eq!(item.item_type, "Movie");
        assert_eq!(item.tagline.as_deref(), Some("A Los Angeles crime saga"));
        assert_eq!(item.release.as_deref(), Some("1995"));
        assert!(item.episode.is_none());
        assert_eq!(item.progress, 40.0);
        assert!(!item.flag);
        assert_eq!(item.info.as_deref(), Some("1920x1080 h264"));
        assert!(item.fanart.contains("/Images/Backdrop"));
    }

    #[test]
    fn test_yamc_played_and_music_entries() {
        let mut watched = episode();
        watched.user_data = Some(UserItemData { played_percentage: None, played: Some(true) });
        let item = yamc::item_entry(&watched, None, SERVER).unwrap();
        assert!(item.flag);
        assert_eq!(item.progress, 100.0);
        assert_eq!(item.title, "The Pilot");
        assert!(item.stream_url.is_none());

        let album = BaseItem {
            id: "a1".to_string(),
            media_type: "MusicAlbum".to_string(),
            name: Some("Kid A".to_string()),
            artists: Some(vec!["Radiohead".to_string()]),
            premiere_date: Some("2000-10-02T00:00:00.0000000Z".to_string()),
            user_data: Some(UserItemData { played_percentage: Some(50.0), played: Some(true) }),
            ..Default::default()
        };
        let item = yamc::item_entry(&album, None, SERVER).unwrap();
        assert!(!item.flag);
        assert_eq!(item.progress, 0.0);
        assert_eq!(item.tagline.as_deref(), Some("Radiohead"));
        assert_eq!(item.release.as_deref(), Some("2000"));
    }

    #[test]
    fn test_yamc_attributes() {
        let untitled = BaseItem {
            id: "x".to_string(),
            media_type: "Movie".to_string(),
            ..Default::default()
        };
        let sensor_data = SensorData {
            generate_yamc: true,
            yamc: Some(page(vec![episode(), untitled], 120)),
            last_search: "show".to_string(),
            ..data()
        };

        let attributes = yamc::attributes(&sensor_data);
        assert_eq!(attributes.total_items, 50);
        assert_eq!(attributes.page, 1);
        assert_eq!(attributes.page_size, 25);
        assert_eq!(attributes.last_search, "show");

        let payload: serde_json::Value = serde_json::from_str(&attributes.data).unwrap();
        assert_eq!(payload.as_array().unwrap().len(), 2);
        assert_eq!(payload[1]["type"], "Episode");
        let playlists: serde_json::Value = serde_json::from_str(&attributes.playlists).unwrap();
        assert_eq!(playlists[0]["name"], "latest_movies");

        let entries = yamc::payload(&sensor_data);
        assert!(matches!(entries[0], YamcEntry::Defaults(_)));
    }

    #[test]
    fn test_date_parsing() {
        assert_eq!(
            parse_date("2023-11-20T00:00:00.0000000Z").map(|d| d.to_string()).as_deref(),
            Some("2023-11-20")
        );
        assert!(parse_date("2023-11-20").is_some());
        assert!(parse_date("soon").is_none());
        assert_eq!(format_date(Some("2021-03-04T12:00:00Z"), "%d/%m/%Y").as_deref(), Some("04/03/2021"));
        assert_eq!(format_date(None, "%Y"), None);
    }
}
