//! Integration tests for the Jellyfin client against a mock server

use r_jellytrack::jellyfin::{JellyfinApiContract, JellyfinClient, JellyfinError};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::test_utils::constants::TEST_API_KEY;
use crate::test_utils::session_json;

#[cfg(test)]
mod jellyfin_integration_tests {
    use super::*;

    fn client(server: &MockServer) -> JellyfinClient {
        JellyfinClient::new(&server.uri(), true)
            .unwrap()
            .with_api_key(TEST_API_KEY)
            .with_device_id("test-device")
    }

    #[tokio::test]
    async fn test_fetch_sessions_sends_token_and_drops_bad_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Sessions"))
            .and(header("X-Emby-Token", TEST_API_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                session_json("s1", "LivingRoomTV", "u1", Some("m1")),
                { "Id": 42, "HasCustomDeviceName": "yes" },
                session_json("s2", "Tablet", "u2", None),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let sessions = client(&server).fetch_sessions().await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].device_name.as_deref(), Some("LivingRoomTV"));
        assert_eq!(sessions[0].now_playing_item.as_ref().map(|i| i.id.as_str()), Some("m1"));
        assert!(sessions[1].now_playing_item.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Sessions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_sessions().await.unwrap_err();
        assert!(matches!(err, JellyfinError::Authentication(_)));
        assert!(err.is_connectivity());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_rejected_locally() {
        let server = MockServer::start().await;
        let client = JellyfinClient::new(&server.uri(), true).unwrap();
        let err = client.system_info().await.unwrap_err();
        assert!(matches!(err, JellyfinError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_system_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/System/Info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Id": "srv",
                "ServerName": "Den",
                "Version": "10.9.1",
                "OperatingSystem": "Linux",
                "HasUpdateAvailable": false,
            })))
            .mount(&server)
            .await;

        let info = client(&server).system_info().await.unwrap();
        assert_eq!(info.id, "srv");
        assert_eq!(info.server_name, "Den");
        assert!(!info.has_update_available);
    }

    #[tokio::test]
    async fn test_item_counts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Items/Counts"))
            .and(query_param("userId", "u1"))
            .and(header("X-Emby-Token", TEST_API_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "MovieCount": 120,
                "SeriesCount": 31,
                "EpisodeCount": 840,
                "TrailerCount": 0,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let counts = client(&server).item_counts(Some("u1")).await.unwrap();
        assert_eq!(counts.movie_count, 120);
        assert_eq!(counts.series_count, 31);
        assert_eq!(counts.episode_count, 840);
        assert_eq!(counts.song_count, 0);
    }

    #[tokio::test]
    async fn test_session_command_posts_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Sessions/s1/Playing"))
            .and(query_param("playCommand", "PlayNow"))
            .and(query_param("itemIds", "m1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let params = vec![
            ("playCommand".to_string(), "PlayNow".to_string()),
            ("itemIds".to_string(), "m1".to_string()),
        ];
        client(&server).post_session_command("s1", "Playing", &params).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_item_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/Items/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server).delete_item("gone").await.unwrap_err();
        assert!(matches!(err, JellyfinError::NotFound(_)));
    }
}
