//! Jellyfin API client implementation

use async_trait::async_trait;
use reqwest::{Client, Error as ReqwestError, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, instrument, trace, warn};

use crate::jellyfin::auth::{authorization_value, local_device_name};
use crate::jellyfin::models::{
    BaseItem, ItemCounts, ItemsResponse, PlaybackInfoResponse, SessionInfo, SystemInfo,
};
use crate::jellyfin::url::normalize_server_url;

const API_LOG_TARGET: &str = "r_jellytrack::jellyfin::api";

/// Query parameters passed through to the server as-is
pub type QueryParams = Vec<(String, String)>;

/// Error types for Jellyfin API operations
#[derive(Debug)]
pub enum JellyfinError {
    Network(ReqwestError),
    Authentication(String),
    NotFound(String),
    InvalidResponse(String),
    WebSocketError(String),
    Other(String),
}

impl JellyfinError {
    /// True for failures that mean the server could not be reached or refused
    /// our credentials, as opposed to a bad payload.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            JellyfinError::Network(_) | JellyfinError::Authentication(_) | JellyfinError::WebSocketError(_)
        )
    }
}

impl fmt::Display for JellyfinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JellyfinError::Network(e) => write!(f, "Network error: {}", e),
            JellyfinError::Authentication(msg) => write!(f, "Authentication error: {}", msg),
            JellyfinError::NotFound(msg) => write!(f, "Not found: {}", msg),
            JellyfinError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
            JellyfinError::WebSocketError(msg) => write!(f, "WebSocket error: {}", msg),
            JellyfinError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl Error for JellyfinError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            JellyfinError::Network(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ReqwestError> for JellyfinError {
    fn from(err: ReqwestError) -> Self {
        JellyfinError::Network(err)
    }
}

/// The subset of the Jellyfin API the session tracker and sensors consume.
///
/// `JellyfinClient` is the production implementation; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait JellyfinApiContract: Send + Sync {
    /// Normalized base URL of the server
    fn server_url(&self) -> &str;

    /// Access token used for authenticated requests and stream URLs
    fn api_key(&self) -> Option<&str>;

    /// `GET /System/Info`
    async fn system_info(&self) -> Result<SystemInfo, JellyfinError>;

    /// `GET /Sessions`: the current snapshot of active sessions.
    async fn fetch_sessions(&self) -> Result<Vec<SessionInfo>, JellyfinError>;

    /// `GET /Shows/NextUp`
    async fn next_up(&self, query: &QueryParams) -> Result<ItemsResponse, JellyfinError>;

    /// `GET /Items`
    async fn items(&self, query: &QueryParams) -> Result<ItemsResponse, JellyfinError>;

    /// `GET /Items/Counts`, scoped to `user_id` when given
    async fn item_counts(&self, user_id: Option<&str>) -> Result<ItemCounts, JellyfinError>;

    /// `GET /Items/{id}`
    async fn get_item(&self, item_id: &str, user_id: Option<&str>) -> Result<BaseItem, JellyfinError>;

    /// `DELETE /Items/{id}`
    async fn delete_item(&self, item_id: &str) -> Result<(), JellyfinError>;

    /// `POST /Library/Refresh`
    async fn refresh_library(&self) -> Result<(), JellyfinError>;

    /// `POST /Sessions/{session_id}/{command}` with query parameters
    async fn post_session_command(
        &self,
        session_id: &str,
        command: &str,
        params: &QueryParams,
    ) -> Result<(), JellyfinError>;

    /// `POST /Items/{id}/PlaybackInfo` with a device profile
    async fn playback_info(
        &self,
        item_id: &str,
        user_id: Option<&str>,
        device_profile: &serde_json::Value,
    ) -> Result<PlaybackInfoResponse, JellyfinError>;

    /// URL of an item's artwork, usable without further authentication
    fn artwork_url(&self, item_id: &str, image_type: &str, max_width: u32) -> String {
        artwork_url(self.server_url(), item_id, image_type, max_width)
    }
}

/// `{server}/Items/{id}/Images/{type}?MaxWidth={w}&format=jpg`
pub fn artwork_url(server_url: &str, item_id: &str, image_type: &str, max_width: u32) -> String {
    format!(
        "{}/Items/{}/Images/{}?MaxWidth={}&format=jpg",
        server_url, item_id, image_type, max_width
    )
}

/// Client for interacting with Jellyfin API
#[derive(Clone)]
pub struct JellyfinClient {
    client: Client,
    server_url: String,
    api_key: Option<String>,
    device_id: String,
    device_name: String,
}

impl JellyfinClient {
    /// Create a new Jellyfin client with the server URL.
    ///
    /// The URL is normalized; an unparseable URL is an `Other` error.
    pub fn new(server_url: &str, verify_ssl: bool) -> Result<Self, JellyfinError> {
        debug!(target: API_LOG_TARGET, "Creating new JellyfinClient with server_url: {}", server_url);

        let normalized_url = normalize_server_url(server_url).map_err(JellyfinError::Other)?;
        debug!(target: API_LOG_TARGET, "Normalized server URL: {}", normalized_url);

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(!verify_ssl)
            .build()?;

        Ok(JellyfinClient {
            client,
            server_url: normalized_url,
            api_key: None,
            device_id: uuid::Uuid::new_v4().to_string(),
            device_name: local_device_name(),
        })
    }

    /// Set API key for authentication
    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    /// Set the device id this client reports to the server
    pub fn with_device_id(mut self, device_id: &str) -> Self {
        self.device_id = device_id.to_string();
        self
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    // --- Private Helper Methods ---

    /// Builds a full URL for an API endpoint path.
    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }

    /// Checks if the client has authentication credentials.
    fn ensure_authenticated(&self) -> Result<&str, JellyfinError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| JellyfinError::Authentication("API key not set".to_string()))
    }

    /// Starts an authenticated request to `path`.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, JellyfinError> {
        let api_key = self.ensure_authenticated()?;
        let url = self.build_url(path);
        debug!(target: API_LOG_TARGET, "Sending {} request to: {}", method, url);
        Ok(self
            .client
            .request(method, &url)
            .header("X-Emby-Token", api_key)
            .header(
                "X-Emby-Authorization",
                authorization_value(&self.device_name, &self.device_id),
            ))
    }

    /// Sends a GET request and deserializes the JSON response.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &QueryParams) -> Result<T, JellyfinError> {
        let response = self.request(Method::GET, path)?.query(query).send().await?;
        Self::handle_response(response).await
    }

    /// Sends a request and accepts any 2xx status without reading a body.
    async fn send_expect_success(&self, builder: RequestBuilder) -> Result<(), JellyfinError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            trace!(target: API_LOG_TARGET, "Request successful with status: {}", status);
            return Ok(());
        }
        let error_text = response.text().await.unwrap_or_else(|_| "Failed to read error body".to_string());
        error!(target: API_LOG_TARGET, "Request failed. Status: {}, Body: {}", status, error_text);
        Err(Self::status_error(status, error_text))
    }

    fn status_error(status: StatusCode, error_text: String) -> JellyfinError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                JellyfinError::Authentication(format!("Authentication failed ({}): {}", status, error_text))
            }
            StatusCode::NOT_FOUND => JellyfinError::NotFound(format!("Resource not found ({}): {}", status, error_text)),
            _ => JellyfinError::InvalidResponse(format!("Request failed with status {}: {}", status, error_text)),
        }
    }

    /// Handles response status checking and JSON deserialization.
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, JellyfinError> {
        let status = response.status();
        trace!(target: API_LOG_TARGET, "Response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(target: API_LOG_TARGET, "Request failed. Status: {}, Body: {}", status, error_text);
            return Err(Self::status_error(status, error_text));
        }

        let response_text = response.text().await?;
        if response_text.is_empty() {
            error!(target: API_LOG_TARGET, "Received empty response body with success status {}", status);
            return Err(JellyfinError::InvalidResponse("Empty response body received".to_string()));
        }

        serde_json::from_str::<T>(&response_text).map_err(|e| {
            error!(target: API_LOG_TARGET, "JSON parsing error: {}", e);
            trace!(target: API_LOG_TARGET, "Full response text:\n{}", response_text);
            JellyfinError::InvalidResponse(format!("Failed to parse JSON response: {}", e))
        })
    }
}

/// Playback fields of a session; a record whose only problem is one of
/// these is kept without them.
const PLAYBACK_FIELDS: [&str; 2] = ["NowPlayingItem", "PlayState"];

/// Decodes a session list element by element.
///
/// An element that does not decode is retried without its playback fields;
/// if that still fails it is dropped with a warning and the rest of the list
/// survives. A payload that is not an array at all is an error.
pub fn parse_sessions(value: serde_json::Value) -> Result<Vec<SessionInfo>, JellyfinError> {
    let entries = match value {
        serde_json::Value::Array(entries) => entries,
        other => {
            return Err(JellyfinError::InvalidResponse(format!(
                "Expected a session list, got: {}",
                other
            )))
        }
    };

    let mut sessions = Vec::with_capacity(entries.len());
    for (index, mut entry) in entries.into_iter().enumerate() {
        let e = match SessionInfo::deserialize(&entry) {
            Ok(session) => {
                sessions.push(session);
                continue;
            }
            Err(e) => e,
        };

        if let Some(fields) = entry.as_object_mut() {
            for field in PLAYBACK_FIELDS {
                fields.remove(field);
            }
        }
        match serde_json::from_value::<SessionInfo>(entry) {
            Ok(session) => {
                warn!(target: API_LOG_TARGET, "Session record #{} has unreadable playback data, keeping it without: {}", index, e);
                sessions.push(session);
            }
            Err(_) => warn!(target: API_LOG_TARGET, "Dropping malformed session record #{}: {}", index, e),
        }
    }
    Ok(sessions)
}

#[async_trait]
impl JellyfinApiContract for JellyfinClient {
    fn server_url(&self) -> &str {
        &self.server_url
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    #[instrument(skip(self))]
    async fn system_info(&self) -> Result<SystemInfo, JellyfinError> {
        self.get_json("/System/Info", &Vec::new()).await
    }

    #[instrument(skip(self))]
    async fn fetch_sessions(&self) -> Result<Vec<SessionInfo>, JellyfinError> {
        let raw: serde_json::Value = self.get_json("/Sessions", &Vec::new()).await?;
        let sessions = parse_sessions(raw)?;
        debug!(target: API_LOG_TARGET, "Fetched {} sessions", sessions.len());
        Ok(sessions)
    }

    async fn next_up(&self, query: &QueryParams) -> Result<ItemsResponse, JellyfinError> {
        self.get_json("/Shows/NextUp", query).await
    }

    async fn items(&self, query: &QueryParams) -> Result<ItemsResponse, JellyfinError> {
        self.get_json("/Items", query).await
    }

    async fn item_counts(&self, user_id: Option<&str>) -> Result<ItemCounts, JellyfinError> {
        let query: QueryParams = user_id
            .map(|id| vec![("userId".to_string(), id.to_string())])
            .unwrap_or_default();
        self.get_json("/Items/Counts", &query).await
    }

    async fn get_item(&self, item_id: &str, user_id: Option<&str>) -> Result<BaseItem, JellyfinError> {
        let path = format!("/Items/{}", urlencoding::encode(item_id));
        let query: QueryParams = user_id
            .map(|id| vec![("userId".to_string(), id.to_string())])
            .unwrap_or_default();
        self.get_json(&path, &query).await
    }

    #[instrument(skip(self))]
    async fn delete_item(&self, item_id: &str) -> Result<(), JellyfinError> {
        let path = format!("/Items/{}", urlencoding::encode(item_id));
        let builder = self.request(Method::DELETE, &path)?;
        self.send_expect_success(builder).await
    }

    #[instrument(skip(self))]
    async fn refresh_library(&self) -> Result<(), JellyfinError> {
        let builder = self.request(Method::POST, "/Library/Refresh")?;
        self.send_expect_success(builder).await
    }

    #[instrument(skip(self, params))]
    async fn post_session_command(
        &self,
        session_id: &str,
        command: &str,
        params: &QueryParams,
    ) -> Result<(), JellyfinError> {
        let path = format!("/Sessions/{}/{}", urlencoding::encode(session_id), command);
        let builder = self.request(Method::POST, &path)?.query(params);
        self.send_expect_success(builder).await
    }

    async fn playback_info(
        &self,
        item_id: &str,
        user_id: Option<&str>,
        device_profile: &serde_json::Value,
    ) -> Result<PlaybackInfoResponse, JellyfinError> {
        let path = format!("/Items/{}/PlaybackInfo", urlencoding::encode(item_id));
        let mut body = serde_json::json!({ "DeviceProfile": device_profile });
        if let Some(user_id) = user_id {
            body["UserId"] = serde_json::Value::String(user_id.to_string());
        }
        let response = self.request(Method::POST, &path)?.json(&body).send().await?;
        Self::handle_response(response).await
    }
}
