//! Server URL normalisation

use url::{Host, Url};

pub const DEFAULT_HTTP_PORT: u16 = 8096;
pub const DEFAULT_HTTPS_PORT: u16 = 8920;

/// Normalize a Jellyfin server URL: default scheme `http`, explicit port,
/// no trailing slash.
///
/// `"jelly.local"` becomes `"http://jelly.local:8096"`,
/// `"https://jelly.example.com/"` becomes `"https://jelly.example.com:8920"`.
pub fn normalize_server_url(raw_url: &str) -> Result<String, String> {
    let trimmed = raw_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err("URL must include a hostname".to_string());
    }

    let parsed = match Url::parse(trimmed) {
        Ok(url) if url.has_host() => url,
        _ => Url::parse(&format!("http://{}", trimmed))
            .map_err(|e| format!("Invalid server URL '{}': {}", raw_url, e))?,
    };

    let scheme = parsed.scheme().to_ascii_lowercase();
    let host = match parsed.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => format!("[{}]", addr),
        _ => return Err("URL must include a hostname".to_string()),
    };

    let port = parsed.port().unwrap_or(if scheme == "https" {
        DEFAULT_HTTPS_PORT
    } else {
        DEFAULT_HTTP_PORT
    });

    let path = parsed.path().trim_end_matches('/');
    let mut normalized = format!("{}://{}:{}{}", scheme, host, port, path);
    if let Some(query) = parsed.query() {
        normalized.push('?');
        normalized.push_str(query);
    }
    Ok(normalized)
}
