//! Typed identifiers for blocks, objects, subscriptions, and contexts.
//!
//! All ID types wrap a short inline string (`smartstring`) because identity is
//! assigned by the remote store and arrives over the wire as text; this crate
//! never mints block or object ids of its own. They're opaque on the wire and
//! display as-is for logging. The `short()` form (first 8 chars) is for
//! human-facing log lines, never for lookup.
//!
//! The empty string is the sentinel "no id" value (the remote uses it to mark
//! generic event batches), so `is_empty()` plays the role a nil UUID would.
//!
//! `SubscriptionId` is the one type minted locally: `generate()` produces a
//! time-ordered id for ad-hoc queries, and the reserved `/dep` suffix marks
//! the companion dependency subscription the remote store creates alongside
//! each real one.

use std::fmt;

use serde::{Deserialize, Serialize};
use smartstring::alias::String as SmartString;

/// A block identifier (remote-assigned, unique within a document).
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(SmartString);

/// An object identifier: the key of a details record.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(SmartString);

/// A subscription identifier (well-known tab id or generated ad-hoc id).
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(SmartString);

/// A context identifier: the scope an event batch addresses (an open
/// document, or a subscription id echoed back by the remote store).
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(SmartString);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Wrap a wire string as a typed id.
            pub fn new(s: impl AsRef<str>) -> Self {
                Self(SmartString::from(s.as_ref()))
            }

            /// The raw id text.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// First 8 characters, for human display only.
            pub fn short(&self) -> &str {
                self.0.get(..8).unwrap_or(&self.0)
            }

            /// The empty sentinel ("no id").
            pub fn none() -> Self {
                Self(SmartString::new())
            }

            /// Check if this is the empty sentinel.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self::none()
            }
        }

        impl From<&str> for $T {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $T {
            fn from(s: String) -> Self {
                Self(SmartString::from(s))
            }
        }

        impl AsRef<str> for $T {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.0)
            }
        }
    };
}

impl_typed_id!(BlockId, "BlockId");
impl_typed_id!(ObjectId, "ObjectId");
impl_typed_id!(SubscriptionId, "SubscriptionId");
impl_typed_id!(ContextId, "ContextId");

// ── SubscriptionId extras ───────────────────────────────────────────────────

/// Suffix the remote store appends to a subscription id to address its
/// companion dependency subscription. Dependency ids are diagnostic-only:
/// they never carry a callback registration.
pub const DEPENDENT_SUFFIX: &str = "/dep";

impl SubscriptionId {
    /// Generate a fresh ad-hoc subscription id (time-ordered).
    pub fn generate() -> Self {
        Self(SmartString::from(
            uuid::Uuid::now_v7().simple().to_string(),
        ))
    }

    /// The companion dependency id (`<id>/dep`).
    pub fn dependent(&self) -> Self {
        let mut s = self.0.clone();
        s.push_str(DEPENDENT_SUFFIX);
        Self(s)
    }

    /// Check for the reserved `/dep` suffix.
    pub fn is_dependent(&self) -> bool {
        self.0.ends_with(DEPENDENT_SUFFIX)
    }
}

// ── Cross-type views ────────────────────────────────────────────────────────

impl ContextId {
    /// Reinterpret this context id as a subscription id.
    ///
    /// Subscription-scoped batches echo the subscription id in the batch's
    /// context field; the registry lookup needs it under the right type.
    pub fn as_subscription(&self) -> SubscriptionId {
        SubscriptionId(self.0.clone())
    }

    /// Reinterpret this context id as the root object id of the document.
    pub fn as_object(&self) -> ObjectId {
        ObjectId(self.0.clone())
    }
}

impl ObjectId {
    /// Reinterpret this object id as a block id.
    ///
    /// The root block of a document shares the document object's id.
    pub fn as_block(&self) -> BlockId {
        BlockId(self.0.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================
