use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Lifecycle status of a session.
///
/// `Active` is entered at creation. The reaper demotes `Active` to `Idle`
/// after the idle threshold; any access refresh moves `Active`/`Idle` back
/// to `Active`. `UserTerminated` and `SystemTerminated` are terminal: no
/// automatic transition ever leaves them, only an administrative override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Active,
    Idle,
    UserTerminated,
    SystemTerminated,
}

impl SessionStatus {
    /// Whether this status is terminal (no automatic transitions apply).
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::UserTerminated | SessionStatus::SystemTerminated)
    }

    /// The stored text form of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "Active",
            SessionStatus::Idle => "Idle",
            SessionStatus::UserTerminated => "UserTerminated",
            SessionStatus::SystemTerminated => "SystemTerminated",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(SessionStatus::Active),
            "Idle" => Ok(SessionStatus::Idle),
            "UserTerminated" => Ok(SessionStatus::UserTerminated),
            "SystemTerminated" => Ok(SessionStatus::SystemTerminated),
            other => Err(AppError::Validation(format!("Unknown session status: {}", other))),
        }
    }
}

/// A session as persisted in the store.
///
/// ⚠️ IMPORTANT: `email`, `mac_address`, `client_ip` and `server_ip` hold
/// envelope wire strings, NOT plaintext. They must be opened with the
/// `EnvelopeCipher` before display. The id is deliberately plaintext - it
/// is the lookup key, and sealing it would force a decrypt-and-scan of the
/// whole collection on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// The unique session identifier, generated at creation, never reused.
    pub id: Uuid,
    /// The holder's display name (not sensitive).
    pub nickname: String,
    /// Sealed holder email.
    pub email: String,
    /// Sealed client MAC address.
    pub mac_address: String,
    /// Sealed client IP.
    pub client_ip: String,
    /// Sealed server IP.
    pub server_ip: String,
    /// Current lifecycle status.
    pub status: SessionStatus,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp of the last authenticated access.
    pub last_accessed: DateTime<Utc>,
}

/// The decrypted sensitive fields of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecureFields {
    pub email: String,
    pub mac_address: String,
    pub client_ip: String,
    pub server_ip: String,
}

/// A session as surfaced to callers: plaintext metadata, derived idle and
/// duration metrics, and the decrypted fields.
///
/// `secure` is `None` when this record's envelopes could not be opened
/// (corrupt data or rotated keys) - the typed partial-failure surface for
/// bulk listings, instead of a log line alone.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[serde(rename = "sessionID")]
    pub id: Uuid,
    pub nickname: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    /// Whole seconds since the last access.
    pub idle_seconds: i64,
    /// Whole seconds since creation.
    pub duration_seconds: i64,
    #[serde(flatten)]
    pub secure: Option<SecureFields>,
}

/// Input for creating a session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub email: String,
    pub nickname: String,
    pub mac_address: String,
    pub client_ip: String,
    pub server_ip: String,
}

/// A partial update applied atomically to a single session record.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub status: Option<SessionStatus>,
    pub last_accessed: Option<DateTime<Utc>>,
}

impl SessionPatch {
    /// A patch that only changes the status.
    pub fn status(status: SessionStatus) -> Self {
        Self { status: Some(status), last_accessed: None }
    }

    /// A patch that changes the status and stamps the last access to now.
    pub fn status_touched(status: SessionStatus) -> Self {
        Self { status: Some(status), last_accessed: Some(Utc::now()) }
    }
}
