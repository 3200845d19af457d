//! Core types shared by every subsystem.
//!
//! - [`Cid`] - process-unique identifier for objects and collection items
//! - [`SubscriptionId`] - monotonic id handed out by event bindings
//! - [`Value`] / [`ValueMap`] - dynamic values for config, fields and event data
//! - [`LifecycleState`] - where an object is in its lifecycle

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use serde_json::{Map, Value};

/// String-keyed map of dynamic values.
pub type ValueMap = Map<String, Value>;

// =============================================================================
// Cid
// =============================================================================

/// Identifier assigned to objects and collection items.
///
/// Generated ids look like `c12`; callers may also supply their own.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cid(String);

impl Cid {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Cid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Cid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&Cid> for Cid {
    fn from(value: &Cid) -> Self {
        value.clone()
    }
}

impl Borrow<str> for Cid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Cid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Cid> for Value {
    fn from(value: Cid) -> Self {
        Value::String(value.0)
    }
}

// =============================================================================
// SubscriptionId
// =============================================================================

/// Handle returned by `bind`/`bind_event`, used to unbind later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Object lifecycle. `TornDown` is terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LifecycleState {
    #[default]
    Unconstructed,
    Initialized,
    TornDown,
}

impl LifecycleState {
    pub fn is_live(self) -> bool {
        self == Self::Initialized
    }
}
