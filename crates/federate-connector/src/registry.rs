//! Connector manager factory registry
//!
//! Managers are constructed by type tag through registered factories; the
//! tag comes from the `ConnectorManagerType` property.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::code_context::CodeContext;
use crate::config::Properties;
use crate::error::{ConnectorError, ConnectorResult};
use crate::ids::ConnectorId;
use crate::traits::ConnectorManager;

/// Everything a factory needs to construct a manager.
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    /// Identifier derived from the owning service.
    pub connector_id: ConnectorId,
    /// Binding name of the owning service.
    pub binding_name: String,
    /// Isolated code context the connector is loaded in.
    pub code_context: Arc<CodeContext>,
    /// Host VM name.
    pub vm_name: String,
    /// Unmasked configuration.
    pub properties: Properties,
}

/// Constructs connector managers of one type.
pub trait ManagerFactory: Send + Sync {
    /// Create a manager. The caller initializes and starts it.
    fn create(&self, settings: ManagerSettings) -> ConnectorResult<Arc<dyn ConnectorManager>>;
}

impl<F> ManagerFactory for F
where
    F: Fn(ManagerSettings) -> ConnectorResult<Arc<dyn ConnectorManager>> + Send + Sync,
{
    fn create(&self, settings: ManagerSettings) -> ConnectorResult<Arc<dyn ConnectorManager>> {
        self(settings)
    }
}

/// Table of manager factories keyed by type tag.
#[derive(Default)]
pub struct ManagerFactoryRegistry {
    factories: RwLock<HashMap<String, Arc<dyn ManagerFactory>>>,
}

impl ManagerFactoryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a type tag, replacing any previous one.
    ///
    /// Returns `true` if a factory was replaced.
    pub async fn register_factory<F>(&self, manager_type: impl Into<String>, factory: F) -> bool
    where
        F: ManagerFactory + 'static,
    {
        let manager_type = manager_type.into();
        tracing::debug!(manager_type = %manager_type, "Registering connector manager factory");
        self.factories
            .write()
            .await
            .insert(manager_type, Arc::new(factory))
            .is_some()
    }

    /// Remove the factory for a type tag.
    pub async fn unregister(&self, manager_type: &str) -> bool {
        self.factories.write().await.remove(manager_type).is_some()
    }

    /// Registered type tags, sorted.
    pub async fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.read().await.keys().cloned().collect();
        types.sort();
        types
    }

    /// Check whether a type tag has a factory.
    pub async fn contains(&self, manager_type: &str) -> bool {
        self.factories.read().await.contains_key(manager_type)
    }

    /// Construct a manager of the given type.
    pub async fn create(
        &self,
        manager_type: &str,
        settings: ManagerSettings,
    ) -> ConnectorResult<Arc<dyn ConnectorManager>> {
        let factory = self
            .factories
            .read()
            .await
            .get(manager_type)
            .cloned()
            .ok_or_else(|| ConnectorError::UnsupportedManagerType {
                manager_type: manager_type.to_string(),
            })?;

        factory.create(settings)
    }
}

impl std::fmt::Debug for ManagerFactoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerFactoryRegistry").finish_non_exhaustive()
    }
}
