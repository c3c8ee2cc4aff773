//! Tests for the command-line interface

#[cfg(test)]
mod tests {
    use super::super::*;
    use clap::Parser;

    use crate::config::Settings;
    use crate::jellyfin::models::{NowPlayingItem, SessionInfo};
    use crate::manager::PlaystateCommand;
    use crate::tracker::DeviceRegistry;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["r-jellytrack"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_args_parsing() {
        use clap::CommandFactory;
        let app = Args::command();
        app.debug_assert();
    }

    #[test]
    fn test_default_command_is_watch() {
        let cli = Cli { args: args(&[]) };
        assert_eq!(cli.command(), Command::Watch);
    }

    #[test]
    fn test_control_subcommand() {
        let parsed = args(&["control", "LivingRoomTV.u1", "seek", "--position", "90"]);
        assert_eq!(
            parsed.command,
            Some(Command::Control {
                device: "LivingRoomTV.u1".to_string(),
                action: ControlAction::Seek,
                position: Some(90.0),
                item: None,
            })
        );

        let parsed = args(&["control", "Tablet.u2", "play-item", "--item", "m1"]);
        let Some(Command::Control { action, item, .. }) = parsed.command else {
            panic!("expected control");
        };
        assert_eq!(action, ControlAction::PlayItem);
        assert_eq!(item.as_deref(), Some("m1"));
    }

    #[test]
    fn test_unknown_action_rejected() {
        assert!(Args::try_parse_from(["r-jellytrack", "control", "Tablet.u2", "rewind"]).is_err());
    }

    #[test]
    fn test_action_mapping() {
        assert_eq!(ControlAction::Pause.playstate(None), Ok(Some(PlaystateCommand::Pause)));
        assert_eq!(ControlAction::Play.playstate(None), Ok(Some(PlaystateCommand::Unpause)));
        assert_eq!(ControlAction::Next.playstate(None), Ok(Some(PlaystateCommand::NextTrack)));
        assert_eq!(
            ControlAction::Seek.playstate(Some(12.5)),
            Ok(Some(PlaystateCommand::Seek { position_secs: 12.5 }))
        );
        assert!(ControlAction::Seek.playstate(None).is_err());
        assert_eq!(ControlAction::Browse.playstate(None), Ok(None));
    }

    #[test]
    fn test_overrides_replace_loaded_settings() {
        let cli = Cli {
            args: args(&[
                "--server-url",
                "http://other:8096",
                "--api-key",
                "k2",
                "-u",
                "u9",
                "--insecure",
            ]),
        };
        let mut settings = Settings {
            server_url: "http://jf:8096".to_string(),
            api_key: Some("k1".to_string()),
            ..Default::default()
        };
        cli.apply_overrides(&mut settings);

        assert_eq!(settings.server_url, "http://other:8096");
        assert_eq!(settings.api_key.as_deref(), Some("k2"));
        assert_eq!(settings.library_user_id.as_deref(), Some("u9"));
        assert!(!settings.verify_ssl);
    }

    #[test]
    fn test_format_device() {
        let mut registry = DeviceRegistry::default();
        registry.reconcile(&[SessionInfo {
            id: Some("s1".to_string()),
            user_id: Some("u1".to_string()),
            device_name: Some("LivingRoomTV".to_string()),
            has_custom_device_name: true,
            client: Some("Jellyfin Web".to_string()),
            now_playing_item: Some(NowPlayingItem {
                id: "e1".to_string(),
                media_type: "Episode".to_string(),
                name: Some("The Pilot".to_string()),
                series_name: Some("The Show".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }]);
        let record = registry.iter().next().unwrap();

        let line = Cli::format_device(record, "http://jf:8096");
        assert!(line.starts_with("LivingRoomTV.u1"));
        assert!(line.contains("playing"));
        assert!(line.contains("Jellyfin Web"));
        assert!(line.ends_with("The Show - The Pilot"));
    }

    #[test]
    fn test_display_error() {
        let cli = Cli { args: args(&[]) };
        let error = std::io::Error::new(std::io::ErrorKind::Other, "Test error");
        cli.display_error(&error);
    }
}
