//! End-to-end tracking through the client manager and a mock server

use r_jellytrack::jellyfin::{JellyfinApiContract, JellyfinClient};
use r_jellytrack::manager::{ClientManager, ManagerOptions, PlaystateCommand};
use r_jellytrack::tracker::{DeviceIdentity, NotificationKind, PlaybackState, SessionTracker};
use serde_json::json;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::test_utils::constants::TEST_API_KEY;
use crate::test_utils::session_json;

#[cfg(test)]
mod tracker_integration_tests {
    use super::*;

    async fn mount_sessions(server: &MockServer, body: serde_json::Value) {
        server.reset().await;
        Mock::given(method("GET"))
            .and(path("/Sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn manager(server: &MockServer, tracker: Arc<SessionTracker>) -> ClientManager {
        let client = JellyfinClient::new(&server.uri(), true).unwrap().with_api_key(TEST_API_KEY);
        let api: Arc<dyn JellyfinApiContract> = Arc::new(client);
        ClientManager::new(api, tracker, ManagerOptions::default())
    }

    #[tokio::test]
    async fn test_device_lifecycle_over_http() {
        let server = MockServer::start().await;
        let tracker = SessionTracker::shared();
        let manager = manager(&server, tracker.clone());
        let tv = DeviceIdentity::from("LivingRoomTV.u1");

        let seen = Arc::new(Mutex::new(Vec::new()));
        for kind in [NotificationKind::NewDevice, NotificationKind::StaleDevice, NotificationKind::Update] {
            let seen = seen.clone();
            tracker
                .subscribe(kind, tv.clone(), move |n| {
                    seen.lock().unwrap().push(n.kind);
                    Ok(())
                })
                .await;
        }

        mount_sessions(&server, json!([session_json("s1", "LivingRoomTV", "u1", Some("m1"))])).await;
        let report = manager.refresh_sessions().await.unwrap();
        assert_eq!(report.dispatch.delivered, 1);
        assert_eq!(tracker.device(&tv).await.unwrap().fingerprint.state, PlaybackState::Playing);

        // Same snapshot again: nothing changes.
        let report = manager.refresh_sessions().await.unwrap();
        assert!(report.reconcile.intents.is_empty());

        mount_sessions(&server, json!([session_json("s1", "LivingRoomTV", "u1", None)])).await;
        manager.refresh_sessions().await.unwrap();

        mount_sessions(&server, json!([])).await;
        manager.refresh_sessions().await.unwrap();
        assert!(!tracker.device(&tv).await.unwrap().is_active());

        assert_eq!(
            *seen.lock().unwrap(),
            vec![NotificationKind::NewDevice, NotificationKind::Update, NotificationKind::StaleDevice]
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_devices() {
        let server = MockServer::start().await;
        let tracker = SessionTracker::shared();
        let manager = manager(&server, tracker.clone());

        mount_sessions(&server, json!([session_json("s1", "LivingRoomTV", "u1", None)])).await;
        manager.refresh_sessions().await.unwrap();
        let before = tracker.registry().await;

        server.reset().await;
        Mock::given(method("GET"))
            .and(path("/Sessions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        assert!(manager.refresh_sessions().await.is_err());
        assert_eq!(tracker.registry().await, before);
    }

    #[tokio::test]
    async fn test_seek_reaches_tracked_session() {
        let server = MockServer::start().await;
        let tracker = SessionTracker::shared();
        let manager = manager(&server, tracker.clone());

        mount_sessions(&server, json!([session_json("s1", "LivingRoomTV", "u1", Some("m1"))])).await;
        Mock::given(method("POST"))
            .and(path("/Sessions/s1/Playing/Seek"))
            .and(query_param("SeekPositionTicks", "900000000"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        manager.refresh_sessions().await.unwrap();
        let session_id = manager
            .session_id_for(&DeviceIdentity::from("LivingRoomTV.u1"))
            .await
            .unwrap();
        manager
            .set_playstate(&session_id, PlaystateCommand::Seek { position_secs: 90.0 })
            .await
            .unwrap();
        assert!(manager.session_id_for(&DeviceIdentity::from("Unknown.u1")).await.is_none());
    }
}
