//! Jellyfin authentication helpers

pub const CLIENT_NAME: &str = "r-jellytrack";
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Builds the `X-Emby-Authorization` value identifying this client.
pub fn authorization_value(device_name: &str, device_id: &str) -> String {
    format!(
        "MediaBrowser Client=\"{}\", Device=\"{}\", DeviceId=\"{}\", Version=\"{}\"",
        CLIENT_NAME, device_name, device_id, CLIENT_VERSION
    )
}

/// Name reported to the server for this process' device
pub fn local_device_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .map(|name| format!("{} ({})", CLIENT_NAME, name))
        .unwrap_or_else(|| CLIENT_NAME.to_string())
}
