//! Credential unmasking
//!
//! Masked configuration values are decrypted once, before the connector
//! manager is constructed. Which properties are masked is decided by the
//! property descriptors of the binding's component type.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use federate_connector::config::{property_names, Properties, PropertyDescriptor};
use federate_connector::crypto::PropertyCipher;
use federate_connector::error::{ConnectorError, ConnectorResult};

/// External configuration metadata.
///
/// Store failures should be reported as [`ConnectorError::Configuration`].
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// Component type declared by a connector binding.
    async fn binding_component_type(&self, binding: &str) -> ConnectorResult<Option<String>>;

    /// Property descriptors of a component type.
    async fn component_type_definitions(
        &self,
        component_type: &str,
    ) -> ConnectorResult<Option<Vec<PropertyDescriptor>>>;
}

/// In-memory [`ConfigurationStore`].
#[derive(Debug, Default)]
pub struct InMemoryConfigurationStore {
    bindings: RwLock<HashMap<String, String>>,
    component_types: RwLock<HashMap<String, Vec<PropertyDescriptor>>>,
}

impl InMemoryConfigurationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the component type of a binding.
    pub async fn add_binding(&self, binding: impl Into<String>, component_type: impl Into<String>) {
        self.bindings
            .write()
            .await
            .insert(binding.into(), component_type.into());
    }

    /// Define the properties of a component type.
    pub async fn add_component_type(
        &self,
        component_type: impl Into<String>,
        definitions: Vec<PropertyDescriptor>,
    ) {
        self.component_types
            .write()
            .await
            .insert(component_type.into(), definitions);
    }
}

#[async_trait]
impl ConfigurationStore for InMemoryConfigurationStore {
    async fn binding_component_type(&self, binding: &str) -> ConnectorResult<Option<String>> {
        Ok(self.bindings.read().await.get(binding).cloned())
    }

    async fn component_type_definitions(
        &self,
        component_type: &str,
    ) -> ConnectorResult<Option<Vec<PropertyDescriptor>>> {
        Ok(self.component_types.read().await.get(component_type).cloned())
    }
}

/// Return a copy of `properties` with every masked property decrypted.
///
/// The `ServiceName` bookkeeping key is removed from the copy. Unmasked
/// properties are copied unchanged, and masked descriptors without a value
/// are skipped.
pub async fn decrypt_masked_properties(
    properties: &Properties,
    store: &dyn ConfigurationStore,
    cipher: &PropertyCipher,
) -> ConnectorResult<Properties> {
    let mut result = properties.clone();
    result.remove(property_names::SERVICE_NAME);

    let binding = properties
        .get(property_names::SERVICE_NAME)
        .ok_or(ConnectorError::MissingBindingName)?;

    let component_type = store
        .binding_component_type(binding)
        .await?
        .ok_or_else(|| ConnectorError::BindingNotFound {
            binding: binding.to_string(),
        })?;

    let definitions = store
        .component_type_definitions(&component_type)
        .await?
        .ok_or_else(|| ConnectorError::ComponentTypeNotFound {
            component_type: component_type.clone(),
        })?;

    let mut unmasked = 0usize;
    for descriptor in definitions.iter().filter(|d| d.masked) {
        let Some(masked) = properties.get(&descriptor.name) else {
            continue;
        };
        let plain = cipher.decrypt_property(masked).map_err(|e| {
            ConnectorError::PropertyDecryption {
                property: descriptor.name.clone(),
                source: Box::new(e),
            }
        })?;
        result.set(descriptor.name.clone(), plain);
        unmasked += 1;
    }

    debug!(
        binding = %binding,
        component_type = %component_type,
        unmasked,
        "Decrypted masked connector properties"
    );

    Ok(result)
}
