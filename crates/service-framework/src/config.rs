//! # Configuration & Attribute Stores
//!
//! [`Config`] is the key/value store every service carries for its settings.
//! Keys are uppercase-normalized, so `get("stop_timeout")` and
//! `get("STOP_TIMEOUT")` hit the same entry. Values are JSON values, which
//! keeps the store serializable and lets settings carry strings, numbers,
//! and booleans without a per-service schema type.
//!
//! Service types declare their settings up front as [`Setting`] entries:
//! a name, an optional default, and a required flag. Defaults are seeded at
//! construction; required settings with no supplied value fail
//! [`Config::validate`], which the lifecycle machine runs during `init`.
//!
//! [`Attributes`] is the simpler sibling: a plain store for descriptive
//! attributes, no normalization and no schema.

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::ConfigError;

/// Value type stored by [`Config`] and [`Attributes`].
pub type Value = serde_json::Value;

/// Static schema entry for one declared configuration field.
#[derive(Debug, Clone)]
pub struct Setting {
    pub name: &'static str,
    pub default: Option<Value>,
    pub required: bool,
}

impl Setting {
    /// Declares an optional setting with a default value.
    pub fn new(name: &'static str, default: impl Into<Value>) -> Self {
        Self {
            name,
            default: Some(default.into()),
            required: false,
        }
    }

    /// Declares an optional setting with no default.
    pub fn optional(name: &'static str) -> Self {
        Self {
            name,
            default: None,
            required: false,
        }
    }

    /// Declares a setting that must be supplied before the owning service
    /// initializes.
    pub fn required(name: &'static str) -> Self {
        Self {
            name,
            default: None,
            required: true,
        }
    }
}

/// Uppercase-normalized key/value store for service settings.
#[derive(Debug, Default)]
pub struct Config {
    values: RwLock<IndexMap<String, Value>>,
    schema: Vec<Setting>,
}

fn normalize(key: &str) -> String {
    key.to_ascii_uppercase()
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from declared settings, seeding every default.
    pub fn with_schema(schema: Vec<Setting>) -> Self {
        let mut values = IndexMap::new();
        for setting in &schema {
            if let Some(default) = &setting.default {
                values.insert(normalize(setting.name), default.clone());
            }
        }
        Self {
            values: RwLock::new(values),
            schema,
        }
    }

    /// Returns the value under `key`, if set.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(&normalize(key)).cloned()
    }

    /// Returns the value under `key`, or `default` when unset.
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Returns the string value under `key`, if set and a string.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_owned))
    }

    /// Returns the value under `key` or fails with
    /// [`ConfigError::MissingRequired`].
    pub fn require(&self, key: &str) -> Result<Value, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingRequired(normalize(key)))
    }

    /// Sets `key` to `value`.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.values.write().insert(normalize(key), value.into());
    }

    pub fn is_set(&self, key: &str) -> bool {
        self.values.read().contains_key(&normalize(key))
    }

    /// Checks that every setting declared `required` has a value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = self.values.read();
        for setting in &self.schema {
            if setting.required && !values.contains_key(&normalize(setting.name)) {
                return Err(ConfigError::MissingRequired(normalize(setting.name)));
            }
        }
        Ok(())
    }

    /// Merges every entry of a JSON object into the store. Non-object
    /// values are ignored and reported by the return value.
    pub fn merge(&self, object: &Value) -> bool {
        match object.as_object() {
            Some(entries) => {
                let mut values = self.values.write();
                for (key, value) in entries {
                    values.insert(normalize(key), value.clone());
                }
                true
            }
            None => false,
        }
    }

    /// Loads every environment variable starting with `prefix`, stripping
    /// the prefix: with prefix `"APP_"`, `APP_STORE_TYPE` lands under
    /// `STORE_TYPE`.
    pub fn from_env(&self, prefix: &str) {
        let mut values = self.values.write();
        for (key, value) in std::env::vars() {
            if let Some(stripped) = key.strip_prefix(prefix) {
                values.insert(normalize(stripped), Value::String(value));
            }
        }
    }

    /// A point-in-time copy of every entry, in insertion order.
    pub fn snapshot(&self) -> IndexMap<String, Value> {
        self.values.read().clone()
    }
}

/// Plain key/value store for descriptive service attributes.
#[derive(Debug, Default)]
pub struct Attributes {
    values: RwLock<IndexMap<String, Value>>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.values.write().insert(key.to_owned(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.write().shift_remove(key)
    }

    pub fn snapshot(&self) -> IndexMap<String, Value> {
        self.values.read().clone()
    }
}
