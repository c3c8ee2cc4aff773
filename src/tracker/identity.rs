use serde::Serialize;
use std::fmt;

use crate::jellyfin::models::SessionInfo;

/// Stable key for a physical device across logins: `{DeviceName}.{UserId}`.
///
/// The per-login `DeviceId` is deliberately not part of the key; browser
/// clients regenerate it on every login.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DeviceIdentity(String);

/// A customised session that lacks the fields an identity is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedRecord {
    pub session_id: Option<String>,
    pub device_id: Option<String>,
    pub reason: &'static str,
}

impl fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (session={}, device={})",
            self.reason,
            self.session_id.as_deref().unwrap_or("-"),
            self.device_id.as_deref().unwrap_or("-")
        )
    }
}

impl std::error::Error for MalformedRecord {}

impl DeviceIdentity {
    pub fn combine(device_name: &str, user_id: &str) -> Self {
        DeviceIdentity(format!("{}.{}", device_name, user_id))
    }

    /// Identity of the device behind `session`.
    ///
    /// Sessions without a custom device name are not tracked at all and yield
    /// `Ok(None)`.
    pub fn from_session(session: &SessionInfo) -> Result<Option<Self>, MalformedRecord> {
        if !session.has_custom_device_name {
            return Ok(None);
        }

        let malformed = |reason| MalformedRecord {
            session_id: session.id.clone(),
            device_id: session.device_id.clone(),
            reason,
        };

        let device_name = session
            .device_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| malformed("HasCustomDeviceName is set but DeviceName is null/empty"))?;
        let user_id = session
            .user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| malformed("UserId is null/empty"))?;

        Ok(Some(Self::combine(device_name, user_id)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceIdentity {
    fn from(value: &str) -> Self {
        DeviceIdentity(value.to_string())
    }
}
