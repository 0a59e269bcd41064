//! Connector service configuration types
//!
//! Per-service [`Properties`], the property names the service tier reads or
//! writes, masked-property metadata and process-level [`ServiceSettings`].

use std::collections::BTreeMap;
use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::PropertyCipher;
use crate::error::{ConnectorError, ConnectorResult};

/// Names of the properties understood by the service tier.
pub mod property_names {
    /// Binding name of the service; internal bookkeeping key.
    pub const SERVICE_NAME: &str = "ServiceName";
    /// Whether data source availability is polled.
    pub const SERVICE_MONITORING_ENABLED: &str = "ServiceMonitoringEnabled";
    /// `;`-separated classpath specification of the connector.
    pub const CONNECTOR_CLASS_PATH: &str = "ConnectorClassPath";
    /// Type tag selecting the connector manager factory.
    pub const CONNECTOR_MANAGER_TYPE: &str = "ConnectorManagerType";
    /// Connector identifier handed to the manager.
    pub const CONNECTOR_ID: &str = "ConnectorID";
    /// Binding name handed to the manager.
    pub const CONNECTOR_BINDING_NAME: &str = "ConnectorBindingName";
    /// Host VM name handed to the manager.
    pub const CONNECTOR_VM_NAME: &str = "VMName";
}

/// Manager type used when `ConnectorManagerType` is not configured.
pub const DEFAULT_MANAGER_TYPE: &str = "standard";

/// String-valued configuration of one connector service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    /// Create an empty property set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Get a property value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Get a boolean property, falling back to `default` when absent or not a boolean.
    #[must_use]
    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        self.get(name).and_then(parse_bool).unwrap_or(default)
    }

    /// Set a property value, returning the previous one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    /// Remove a property.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    /// Check whether a property is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Metadata describing one property of a component type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    /// Property name.
    pub name: String,
    /// Whether the stored value is encrypted.
    #[serde(default)]
    pub masked: bool,
}

impl PropertyDescriptor {
    /// Descriptor of a plain property.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            masked: false,
        }
    }

    /// Descriptor of a masked property.
    pub fn masked(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            masked: true,
        }
    }
}

/// Process-level settings of the connector service tier, read from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Whether isolated code contexts are reused across services.
    pub cache_class_loaders: bool,
    /// Name of the host VM handed to connector managers.
    pub vm_name: String,
    /// Hex-encoded master key of the property cipher.
    pub property_key_hex: Option<String>,
}

impl ServiceSettings {
    /// Environment variable controlling class context reuse.
    pub const CACHE_CLASS_LOADERS_VAR: &'static str = "FEDERATE_CACHE_CLASS_LOADERS";
    /// Environment variable naming the host VM.
    pub const VM_NAME_VAR: &'static str = "FEDERATE_VM_NAME";
    /// Environment variable holding the hex master key.
    pub const PROPERTY_KEY_VAR: &'static str = "FEDERATE_PROPERTY_KEY";

    /// Read settings from environment variables, using defaults for anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            cache_class_loaders: lookup(Self::CACHE_CLASS_LOADERS_VAR)
                .as_deref()
                .and_then(parse_bool)
                .unwrap_or(defaults.cache_class_loaders),
            vm_name: lookup(Self::VM_NAME_VAR)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.vm_name),
            property_key_hex: lookup(Self::PROPERTY_KEY_VAR).filter(|v| !v.trim().is_empty()),
        }
    }

    /// Build the property cipher from the configured master key.
    pub fn property_cipher(&self) -> ConnectorResult<PropertyCipher> {
        let key = self
            .property_key_hex
            .as_deref()
            .ok_or_else(|| ConnectorError::Configuration {
                message: format!("{} is not set", Self::PROPERTY_KEY_VAR),
            })?;
        PropertyCipher::from_hex(key).map_err(|e| ConnectorError::Configuration {
            message: format!("{} is invalid: {e}", Self::PROPERTY_KEY_VAR),
        })
    }
}

impl fmt::Debug for ServiceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceSettings")
            .field("cache_class_loaders", &self.cache_class_loaders)
            .field("vm_name", &self.vm_name)
            .field(
                "property_key_hex",
                &self.property_key_hex.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            cache_class_loaders: true,
            vm_name: "federate-vm".to_string(),
            property_key_hex: None,
        }
    }
}
