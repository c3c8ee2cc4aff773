//! Jellyfin API client module for interacting with Jellyfin media server

pub mod api;
pub mod auth;
pub mod models;
pub mod stream;
pub mod url;
pub mod websocket;
mod ws_incoming_handler;

pub use api::*;
pub use models::*;
pub use websocket::WebSocketHandler;
pub use ws_incoming_handler::{IncomingEvent, WebSocketMessage};
