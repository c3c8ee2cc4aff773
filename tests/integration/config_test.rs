//! Integration tests for configuration management
//!
//! These tests verify that settings flow correctly into the client manager.

use r_jellytrack::config::Settings;
use r_jellytrack::manager::ManagerOptions;
use std::error::Error;
use tempfile::tempdir;

#[cfg(test)]
mod config_integration_tests {
    use super::*;

    /// Test complete configuration workflow
    #[test]
    fn test_config_lifecycle() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let config_path = dir.path().join("nested").join("config.json");

        let mut settings = Settings {
            server_url: "https://jellyfin-server.example.com".to_string(),
            api_key: Some("integration-test-api-key".to_string()),
            generate_yamc: true,
            library_user_id: Some("integration-test-user-id".to_string()),
            ..Default::default()
        };
        let (device_id, generated) = settings.ensure_device_id();
        assert!(generated);

        settings.validate()?;
        settings.save(&config_path)?;

        let mut loaded = Settings::load(&config_path)?;
        assert_eq!(loaded, settings);
        assert_eq!(loaded.ensure_device_id(), (device_id, false));

        loaded.server_url = "https://updated-server.example.com".to_string();
        loaded.save(&config_path)?;
        let reloaded = Settings::load(&config_path)?;
        assert_eq!(reloaded.server_url, "https://updated-server.example.com");

        let options = ManagerOptions::from(&reloaded);
        assert!(options.generate_yamc);
        assert!(!options.generate_upcoming);
        assert_eq!(options.library_user_id.as_deref(), Some("integration-test-user-id"));

        Ok(())
    }

    /// Test invalid configuration handling
    #[test]
    fn test_invalid_config_validation() {
        let invalid_settings = Settings {
            server_url: "".to_string(),
            api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        let result = invalid_settings.validate();
        assert!(result.is_err());
        if let Err(e) = result {
            assert!(e.to_string().contains("URL cannot be empty"));
        }

        let no_auth_settings = Settings {
            server_url: "https://example.com".to_string(),
            api_key: None,
            ..Default::default()
        };
        assert!(no_auth_settings.validate().is_err());
    }
}
