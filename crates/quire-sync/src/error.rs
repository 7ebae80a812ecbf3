//! Error types for the sync pipeline.
//!
//! Only remote call failures propagate: start/stop return the failure to the
//! immediate caller and stop there (retry policy belongs to layers with
//! user-facing context). Everything else (undecodable wire values, lookups
//! on absent ids, duplicate registrations) is handled in place with a
//! diagnostic so one bad event never halts processing of the next.

use thiserror::Error;

use quire_types::SubscriptionId;

/// Failure of a call against the remote store.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The call reached the store and was rejected.
    #[error("remote store rejected the call: {0}")]
    Rejected(String),

    /// The transport dropped before a response arrived.
    #[error("remote transport failed: {0}")]
    Transport(String),
}

/// Error from the sync pipeline's public surface.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A subscription start or stop call failed remotely.
    #[error("remote call for {0:?} failed")]
    Remote(SubscriptionId, #[source] RemoteError),
}
