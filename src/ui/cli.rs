//! Command-line interface implementation

use clap::{Parser, Subcommand, ValueEnum};
use std::error::Error;

use crate::config::Settings;
use crate::entity::EntityUpdate;
use crate::manager::device::DeviceView;
use crate::manager::PlaystateCommand;
use crate::tracker::DeviceRecord;

/// Command-line arguments for r-jellytrack
#[derive(Parser, Debug)]
#[command(author, version, about = "Jellyfin session tracker", long_about = None)]
pub struct Args {
    /// Jellyfin server URL
    #[arg(short, long, env = "JELLYFIN_URL")]
    pub server_url: Option<String>,

    /// Jellyfin API key
    #[arg(short, long, env = "JELLYFIN_API_KEY")]
    pub api_key: Option<String>,

    /// User whose library feeds the upcoming and YAMC payloads
    #[arg(short = 'u', long, env = "JELLYFIN_LIBRARY_USER_ID")]
    pub library_user_id: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,

    /// Config file path
    #[arg(short, long, env = "JELLYTRACK_CONFIG")]
    pub config: Option<String>,

    /// Log as JSON lines
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Follow sessions over the push channel (default)
    Watch,
    /// Print the current sessions once
    Sessions,
    /// Send a playback command to a device
    Control {
        /// Device identity, `{DeviceName}.{UserId}`
        device: String,
        #[arg(value_enum)]
        action: ControlAction,
        /// Seek target in seconds
        #[arg(long)]
        position: Option<f64>,
        /// Item for `play-item` and `browse`
        #[arg(long)]
        item: Option<String>,
    },
    /// Start a library scan
    Scan,
    /// Delete a library item
    Delete { item_id: String },
    /// Print the server sensor with its payloads as JSON
    Sensor {
        /// YAMC search term
        #[arg(long)]
        search: Option<String>,
        /// YAMC playlist
        #[arg(long)]
        playlist: Option<String>,
        /// YAMC page
        #[arg(long)]
        page: Option<u32>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    Seek,
    PlayItem,
    Browse,
}

impl ControlAction {
    /// Playstate command for this action; `None` for item based actions.
    pub fn playstate(&self, position: Option<f64>) -> Result<Option<PlaystateCommand>, String> {
        Ok(Some(match self {
            ControlAction::Play => PlaystateCommand::Unpause,
            ControlAction::Pause => PlaystateCommand::Pause,
            ControlAction::Stop => PlaystateCommand::Stop,
            ControlAction::Next => PlaystateCommand::NextTrack,
            ControlAction::Previous => PlaystateCommand::PreviousTrack,
            ControlAction::Seek => PlaystateCommand::Seek {
                position_secs: position.ok_or("seek needs --position")?,
            },
            ControlAction::PlayItem | ControlAction::Browse => return Ok(None),
        }))
    }
}

/// CLI user interface for interacting with the application
pub struct Cli {
    pub args: Args,
}

impl Cli {
    /// Create a new CLI instance
    pub fn new() -> Self {
        Cli { args: Args::parse() }
    }

    pub fn command(&self) -> Command {
        self.args.command.clone().unwrap_or(Command::Watch)
    }

    /// Applies command-line and environment values over the loaded settings.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(url) = &self.args.server_url {
            settings.server_url = url.clone();
        }
        if let Some(key) = &self.args.api_key {
            settings.api_key = Some(key.clone());
        }
        if let Some(user) = &self.args.library_user_id {
            settings.library_user_id = Some(user.clone());
        }
        if self.args.insecure {
            settings.verify_ssl = false;
        }
    }

    /// One line per tracked device
    pub fn format_device(record: &DeviceRecord, server_url: &str) -> String {
        let view = DeviceView::new(record, server_url);
        let media = match (view.media_series_title(), view.media_title()) {
            (Some(series), Some(title)) => format!("{} - {}", series, title),
            (None, Some(title)) => title.to_string(),
            _ => String::new(),
        };
        format!(
            "{:<30} {:<8} {:<20} {}",
            view.identity().as_str(),
            view.state().as_str(),
            view.client().unwrap_or("-"),
            media
        )
    }

    /// Display the tracked devices
    pub fn display_devices(&self, records: &[DeviceRecord], server_url: &str) {
        println!("\n{:<30} {:<8} {:<20} {}", "Device", "State", "Client", "Media");
        println!("{}", "-".repeat(80));
        for record in records {
            println!("{}", Self::format_device(record, server_url));
        }
        println!();
    }

    pub fn display_update(&self, update: &EntityUpdate) {
        let state = update
            .attributes
            .as_ref()
            .map(|a| a.state.as_str())
            .unwrap_or(if update.available { "on" } else { "off" });
        let title = update
            .attributes
            .as_ref()
            .and_then(|a| a.media_title.as_deref())
            .unwrap_or_default();
        println!("[{}] {} {} {}", update.kind, update.identity, state, title);
    }

    /// Display error messages
    pub fn display_error(&self, error: &dyn Error) {
        eprintln!("Error: {}", error);
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self::new()
    }
}
