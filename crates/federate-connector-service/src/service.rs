//! Connector service lifecycle
//!
//! A [`ConnectorService`] owns exactly one connector manager between a
//! successful [`ConnectorService::init`] and its shutdown through
//! [`ConnectorService::close_service`] or [`ConnectorService::kill_service`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use federate_connector::code_context::CodeContext;
use federate_connector::config::{property_names, Properties, ServiceSettings, DEFAULT_MANAGER_TYPE};
use federate_connector::crypto::PropertyCipher;
use federate_connector::environment::ServiceRegistry;
use federate_connector::error::{ConnectorError, ConnectorResult};
use federate_connector::ids::{ConnectorId, DeployedComponentId, ServiceId};
use federate_connector::registry::{ManagerFactoryRegistry, ManagerSettings};
use federate_connector::traits::ConnectorManager;
use federate_connector::types::{ConnectionStatus, ServiceState};

use crate::class_context::ClassContextCache;
use crate::drain::{WorkGuard, WorkTracker};
use crate::events::EventBus;
use crate::proxy::bind_sibling_services;
use crate::unmask::{decrypt_masked_properties, ConfigurationStore};

/// Collaborators shared by the connector services of one host.
#[derive(Clone)]
pub struct ServiceContext {
    /// Configuration metadata used to find masked properties.
    pub configuration: Arc<dyn ConfigurationStore>,
    /// Manager factories keyed by type tag.
    pub factories: Arc<ManagerFactoryRegistry>,
    /// Cipher for masked property values.
    pub cipher: PropertyCipher,
    /// Cache of isolated code contexts.
    pub class_cache: Arc<ClassContextCache>,
    /// Host VM name handed to managers.
    pub vm_name: String,
    event_bus: Option<Arc<dyn EventBus>>,
}

impl ServiceContext {
    /// Create a context using the process-wide class context cache.
    pub fn new(
        configuration: Arc<dyn ConfigurationStore>,
        factories: Arc<ManagerFactoryRegistry>,
        cipher: PropertyCipher,
    ) -> Self {
        Self {
            configuration,
            factories,
            cipher,
            class_cache: ClassContextCache::global(),
            vm_name: ServiceSettings::default().vm_name,
            event_bus: None,
        }
    }

    /// Create a context from process settings.
    ///
    /// The context owns a class context cache seeded from `settings`, shared
    /// by every service initialized with this context or its clones. The
    /// process-wide cache is left untouched.
    pub fn from_settings(
        settings: &ServiceSettings,
        configuration: Arc<dyn ConfigurationStore>,
        factories: Arc<ManagerFactoryRegistry>,
    ) -> ConnectorResult<Self> {
        Ok(Self {
            configuration,
            factories,
            cipher: settings.property_cipher()?,
            class_cache: Arc::new(ClassContextCache::from_settings(settings)),
            vm_name: settings.vm_name.clone(),
            event_bus: None,
        })
    }

    /// Use a private class context cache.
    #[must_use]
    pub fn with_class_cache(mut self, class_cache: Arc<ClassContextCache>) -> Self {
        self.class_cache = class_cache;
        self
    }

    /// Set the host VM name.
    #[must_use]
    pub fn with_vm_name(mut self, vm_name: impl Into<String>) -> Self {
        self.vm_name = vm_name.into();
        self
    }

    /// Invalidate the class context cache on extension module changes.
    #[must_use]
    pub fn with_event_bus(mut self, event_bus: Arc<dyn EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("cipher", &self.cipher)
            .field("class_cache", &self.class_cache)
            .field("vm_name", &self.vm_name)
            .field("event_bus", &self.event_bus.is_some())
            .finish_non_exhaustive()
    }
}

/// Advertised state plus the last health observation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StatusRecord {
    pub(crate) state: ServiceState,
    pub(crate) last_status: Option<ConnectionStatus>,
    pub(crate) last_checked_at: Option<DateTime<Utc>>,
}

/// One connector service instance.
pub struct ConnectorService {
    service_id: ServiceId,
    deployed_component_id: DeployedComponentId,
    binding_name: String,
    connector_id: ConnectorId,
    manager_name: String,
    monitoring_enabled: bool,
    code_context: Arc<CodeContext>,
    pub(crate) manager: RwLock<Option<Arc<dyn ConnectorManager>>>,
    pub(crate) status: RwLock<StatusRecord>,
    pub(crate) work: WorkTracker,
}

impl ConnectorService {
    /// Initialize the service and start its connector manager.
    ///
    /// Masked properties are decrypted, the code context resolved, the
    /// manager constructed and initialized, and finally started with proxies
    /// to the sibling services. If start fails the service is killed and the
    /// start error returned.
    pub async fn init(
        context: &ServiceContext,
        service_id: ServiceId,
        deployed_component_id: DeployedComponentId,
        properties: Properties,
        registry: Arc<dyn ServiceRegistry>,
    ) -> ConnectorResult<Self> {
        if let Some(bus) = &context.event_bus {
            context.class_cache.watch_artifacts(bus.as_ref());
        }

        let mut unmasked = decrypt_masked_properties(
            &properties,
            context.configuration.as_ref(),
            &context.cipher,
        )
        .await?;

        let binding_name = properties
            .get(property_names::SERVICE_NAME)
            .ok_or(ConnectorError::MissingBindingName)?
            .to_string();

        let monitoring_enabled = unmasked.get_bool(property_names::SERVICE_MONITORING_ENABLED, true);
        info!(
            binding = %binding_name,
            monitoring_enabled,
            "Connector service monitoring configured"
        );

        let class_path = unmasked
            .get(property_names::CONNECTOR_CLASS_PATH)
            .unwrap_or_default()
            .to_string();
        let code_context = context.class_cache.get_or_create(&class_path)?;

        let manager_type = unmasked
            .get(property_names::CONNECTOR_MANAGER_TYPE)
            .unwrap_or(DEFAULT_MANAGER_TYPE)
            .to_string();

        let connector_id = ConnectorId::derive(&service_id);
        unmasked.set(property_names::CONNECTOR_ID, connector_id.as_str());
        unmasked.set(property_names::CONNECTOR_BINDING_NAME, binding_name.as_str());
        unmasked.set(property_names::CONNECTOR_VM_NAME, context.vm_name.as_str());

        let settings = ManagerSettings {
            connector_id: connector_id.clone(),
            binding_name: binding_name.clone(),
            code_context: Arc::clone(&code_context),
            vm_name: context.vm_name.clone(),
            properties: unmasked.clone(),
        };

        let manager = context
            .factories
            .create(&manager_type, settings)
            .await
            .map_err(|e| construction_error(&manager_type, e))?;
        manager
            .initialize(&unmasked)
            .await
            .map_err(|e| construction_error(&manager_type, e))?;

        let environment = bind_sibling_services(registry);
        let manager_name = manager.name();

        let service = Self {
            service_id,
            deployed_component_id,
            binding_name,
            connector_id,
            manager_name,
            monitoring_enabled,
            code_context,
            manager: RwLock::new(Some(Arc::clone(&manager))),
            status: RwLock::new(StatusRecord {
                state: ServiceState::Open,
                last_status: None,
                last_checked_at: None,
            }),
            work: WorkTracker::new(),
        };

        if let Err(e) = manager.start(environment).await {
            service.kill_service().await;
            return Err(e);
        }

        info!(
            binding = %service.binding_name,
            connector_id = %service.connector_id,
            manager = %service.manager_name,
            manager_type = %manager_type,
            "Connector manager started"
        );

        Ok(service)
    }

    /// Close gracefully: refuse new work, wait for in-flight calls, then stop.
    ///
    /// The manager handle is cleared even when stop fails; the failure is
    /// returned as [`ConnectorError::StopFailed`].
    pub async fn close_service(&self) -> ConnectorResult<()> {
        self.work.close();
        self.work.drain().await;

        let Some(manager) = self.manager.write().await.take() else {
            debug!(binding = %self.binding_name, "Close requested with no running manager");
            return Ok(());
        };

        info!(manager = %self.manager_name, "Shutting down connector manager");
        let result = manager.stop().await;
        self.set_terminal(ServiceState::Closed).await;

        result.map_err(|e| ConnectorError::StopFailed {
            name: self.manager_name.clone(),
            message: e.to_string(),
            source: Some(Box::new(e)),
        })
    }

    /// Stop immediately without draining. Never fails.
    pub async fn kill_service(&self) {
        self.work.close();

        let Some(manager) = self.manager.write().await.take() else {
            debug!(binding = %self.binding_name, "Kill requested with no running manager");
            return;
        };

        info!(manager = %self.manager_name, "Killing connector manager");
        if let Err(e) = manager.stop().await {
            error!(
                manager = %self.manager_name,
                error = %e,
                "Unable to shut down connector manager"
            );
        }
        self.set_terminal(ServiceState::Killed).await;
    }

    async fn set_terminal(&self, state: ServiceState) {
        let mut status = self.status.write().await;
        if !status.state.is_terminal() {
            info!(binding = %self.binding_name, from = %status.state, to = %state, "Connector service state changed");
            status.state = state;
        }
    }

    /// Connector identifier, `"<controllerID>|<instanceID>"`.
    #[must_use]
    pub fn connector_id(&self) -> &ConnectorId {
        &self.connector_id
    }

    /// Identity of this service instance.
    #[must_use]
    pub fn service_id(&self) -> ServiceId {
        self.service_id
    }

    /// Deployment unit the service belongs to.
    #[must_use]
    pub fn deployed_component_id(&self) -> DeployedComponentId {
        self.deployed_component_id
    }

    /// Binding name from configuration.
    #[must_use]
    pub fn binding_name(&self) -> &str {
        &self.binding_name
    }

    /// Name reported by the connector manager.
    #[must_use]
    pub fn manager_name(&self) -> &str {
        &self.manager_name
    }

    /// Whether data source availability is polled.
    #[must_use]
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring_enabled
    }

    /// Code context the connector was loaded in.
    #[must_use]
    pub fn code_context(&self) -> &Arc<CodeContext> {
        &self.code_context
    }

    /// Current advertised state.
    pub async fn state(&self) -> ServiceState {
        self.status.read().await.state
    }

    /// Whether a manager is still held.
    pub async fn has_manager(&self) -> bool {
        self.manager.read().await.is_some()
    }

    pub(crate) async fn current_manager(&self) -> Option<Arc<dyn ConnectorManager>> {
        self.manager.read().await.clone()
    }

    /// Admit one unit of new work, returning the manager to run it on.
    pub(crate) async fn admit(
        &self,
    ) -> ConnectorResult<(WorkGuard<'_>, Arc<dyn ConnectorManager>)> {
        let Some(guard) = self.work.try_begin() else {
            return Err(self.not_open().await);
        };
        let Some(manager) = self.current_manager().await else {
            return Err(self.not_open().await);
        };
        Ok((guard, manager))
    }

    pub(crate) async fn not_open(&self) -> ConnectorError {
        ConnectorError::ServiceNotOpen {
            state: self.state().await,
        }
    }
}

impl std::fmt::Debug for ConnectorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorService")
            .field("service_id", &self.service_id)
            .field("binding_name", &self.binding_name)
            .field("connector_id", &self.connector_id)
            .field("manager_name", &self.manager_name)
            .field("monitoring_enabled", &self.monitoring_enabled)
            .finish_non_exhaustive()
    }
}

fn construction_error(manager_type: &str, error: ConnectorError) -> ConnectorError {
    match error {
        ConnectorError::UnsupportedManagerType { .. } | ConnectorError::ManagerConstruction { .. } => {
            error
        }
        other => ConnectorError::ManagerConstruction {
            manager_type: manager_type.to_string(),
            message: other.to_string(),
            source: Some(Box::new(other)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_error_wraps_once() {
        let wrapped = construction_error("standard", ConnectorError::internal("boom"));
        assert!(matches!(
            &wrapped,
            ConnectorError::ManagerConstruction { manager_type, .. } if manager_type == "standard"
        ));

        let again = construction_error("standard", wrapped);
        match again {
            ConnectorError::ManagerConstruction { message, .. } => {
                assert_eq!(message, "internal error: boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    fn settings(cache_class_loaders: bool) -> ServiceSettings {
        ServiceSettings {
            cache_class_loaders,
            vm_name: "vm-7".to_string(),
            property_key_hex: Some(federate_connector::crypto::generate_master_key_hex()),
        }
    }

    #[test]
    fn test_context_from_settings_applies_cache_flag() {
        let store: Arc<dyn ConfigurationStore> =
            Arc::new(crate::unmask::InMemoryConfigurationStore::new());
        let factories = Arc::new(ManagerFactoryRegistry::new());

        let context =
            ServiceContext::from_settings(&settings(false), Arc::clone(&store), Arc::clone(&factories))
                .unwrap();
        assert!(!context.class_cache.is_caching_enabled());
        assert_eq!(context.vm_name, "vm-7");
        assert!(!Arc::ptr_eq(&context.class_cache, &ClassContextCache::global()));

        let context = ServiceContext::from_settings(&settings(true), store, factories).unwrap();
        assert!(context.class_cache.is_caching_enabled());
    }

    #[test]
    fn test_context_from_settings_requires_key() {
        let store: Arc<dyn ConfigurationStore> =
            Arc::new(crate::unmask::InMemoryConfigurationStore::new());
        let err = ServiceContext::from_settings(
            &ServiceSettings::default(),
            store,
            Arc::new(ManagerFactoryRegistry::new()),
        )
        .unwrap_err();
        assert!(matches!(err, ConnectorError::Configuration { .. }));
    }

    #[test]
    fn test_unsupported_type_is_not_wrapped() {
        let err = construction_error(
            "pooled",
            ConnectorError::UnsupportedManagerType {
                manager_type: "pooled".to_string(),
            },
        );
        assert!(matches!(err, ConnectorError::UnsupportedManagerType { .. }));
    }
}
