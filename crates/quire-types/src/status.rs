//! Remote sync status: the connection-health value the thread-status event
//! carries. Decoded from an integer wire code; unknown codes are dropped by
//! the caller rather than mapped to a guess.

use serde::{Deserialize, Serialize};

/// Health of the link between the local client and the remote store.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, strum::FromRepr,
)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum SyncStatus {
    #[default]
    Unknown = 0,
    Offline = 1,
    Syncing = 2,
    Synced = 3,
    Failed = 4,
    /// Remote speaks a protocol version this client does not.
    Incompatible = 5,
}

impl SyncStatus {
    /// Decode an integer wire code.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::from_repr(code)
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Unknown => "unknown",
            SyncStatus::Offline => "offline",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
            SyncStatus::Incompatible => "incompatible",
        }
    }

    /// Whether the local replica is known to be caught up.
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncStatus::Synced)
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
