//! Configuration.
//!
//! Two layers:
//! - [`Config`] - what an object is created with (`create(config)`)
//! - [`RuntimeSettings`] - thread-wide policy (create failures, id prefix)
//!
//! # Example
//!
//! ```ignore
//! use serde_json::json;
//! use spark_objects::Config;
//!
//! let config = Config::from_json(json!({
//!     "id": "sidebar",
//!     "title": "Inbox",
//!     "plugins": ["Tooltip", ["Resizable", { "min": 10 }]],
//! }))?;
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::{Object, PluginSpec};
use crate::error::{Error, Result};
use crate::types::{Cid, Value, ValueMap};

// =============================================================================
// Object config
// =============================================================================

/// Construction config for an object.
///
/// `values` are imported onto the object by the class chain's
/// `import_config` names; `objects` carries references to other objects
/// (usable by import and by `"event field"` event-map entries).
#[derive(Clone, Default)]
pub struct Config {
    pub id: Option<Cid>,
    pub values: ValueMap,
    pub objects: HashMap<String, Object>,
    pub plugins: Vec<PluginSpec>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<Cid>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn object(mut self, key: impl Into<String>, object: &Object) -> Self {
        self.objects.insert(key.into(), object.clone());
        self
    }

    pub fn plugin(mut self, spec: impl Into<PluginSpec>) -> Self {
        self.plugins.push(spec.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_object(&self, key: &str) -> Option<&Object> {
        self.objects.get(key)
    }

    /// Parse a JSON object. `id` and `plugins` are lifted out; every other
    /// key becomes a value. A plugin entry is either `"Name"` or
    /// `["Name", { ..config }]`.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(Error::invalid_config("expected a JSON object"));
        };

        let id = match map.remove("id") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(Cid::new(id)),
            Some(Value::Number(n)) => Some(Cid::new(n.to_string())),
            Some(other) => {
                return Err(Error::invalid_config(format!("unsupported id: {other}")));
            }
        };

        let plugins = match map.remove("plugins") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(entries)) => entries
                .into_iter()
                .map(parse_plugin_entry)
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(Error::invalid_config(format!(
                    "plugins must be an array, got {other}"
                )));
            }
        };

        Ok(Self {
            id,
            values: map,
            objects: HashMap::new(),
            plugins,
        })
    }
}

fn parse_plugin_entry(entry: Value) -> Result<PluginSpec> {
    match entry {
        Value::String(name) => Ok(PluginSpec::named(name, Config::new())),
        Value::Array(pair) => {
            let mut pair = pair.into_iter();
            let Some(Value::String(name)) = pair.next() else {
                return Err(Error::invalid_config("plugin pair must start with a name"));
            };
            let config = match pair.next() {
                None => Config::new(),
                Some(value) => Config::from_json(value)?,
            };
            Ok(PluginSpec::named(name, config))
        }
        other => Err(Error::invalid_config(format!(
            "unsupported plugin entry: {other}"
        ))),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut objects: Vec<&String> = self.objects.keys().collect();
        objects.sort();
        f.debug_struct("Config")
            .field("id", &self.id)
            .field("values", &self.values)
            .field("objects", &objects)
            .field("plugins", &self.plugins)
            .finish()
    }
}

// =============================================================================
// Runtime settings
// =============================================================================

/// What `create` does when a class init hook fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreatePolicy {
    /// Return the error to the caller. The half-built instance is torn down.
    #[default]
    Propagate,
    /// Log the error and hand back the uninitialized instance.
    Degrade,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub create_policy: CreatePolicy,
    /// Prefix for generated cids.
    pub id_prefix: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            create_policy: CreatePolicy::Propagate,
            id_prefix: "c".to_string(),
        }
    }
}

impl RuntimeSettings {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(Error::invalid_config)
    }
}

thread_local! {
    static SETTINGS: RefCell<RuntimeSettings> = RefCell::new(RuntimeSettings::default());
}

/// Current settings for this thread.
pub fn settings() -> RuntimeSettings {
    SETTINGS.with(|s| s.borrow().clone())
}

pub fn set_settings(new_settings: RuntimeSettings) {
    SETTINGS.with(|s| *s.borrow_mut() = new_settings);
}

/// Reset settings (for testing).
pub fn reset_settings() {
    set_settings(RuntimeSettings::default());
}
