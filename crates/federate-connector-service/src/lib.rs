//! # Connector Service
//!
//! The connector service tier of the federate query engine. A
//! [`ConnectorService`] hosts one connector manager and sits between the
//! distributed query processor and the connector.
//!
//! ## Lifecycle
//!
//! ```ignore
//! use federate_connector_service::prelude::*;
//!
//! let context = ServiceContext::from_settings(&ServiceSettings::from_env(), store, factories)?
//!     .with_event_bus(bus);
//! let service = ConnectorService::init(&context, service_id, component_id, props, registry).await?;
//!
//! service.execute_request(request, receiver).await?;
//! service.check_state().await?;
//! service.close_service().await?;
//! ```
//!
//! ## Modules
//!
//! - [`class_context`] - Isolated code context cache
//! - [`events`] - Platform events driving cache invalidation
//! - [`unmask`] - Masked property decryption
//! - [`proxy`] - Call-time handles to sibling services
//! - [`service`] - Lifecycle controller
//! - [`bridge`] - Execute, batch, cancel and close of atomic requests
//! - [`health`] - Availability polling
//! - [`admin`] - Statistics, capabilities and cache administration

pub mod admin;
pub mod bridge;
pub mod class_context;
pub mod drain;
pub mod events;
pub mod health;
pub mod proxy;
pub mod service;
pub mod unmask;

pub use service::{ConnectorService, ServiceContext};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::admin::RESULT_SET_CACHE_NAME;
    pub use crate::class_context::ClassContextCache;
    pub use crate::events::{EventBus, EventType, LocalEventBus, ModuleEventKind, PlatformEvent};
    pub use crate::health::ServiceHealth;
    pub use crate::proxy::bind_sibling_services;
    pub use crate::service::{ConnectorService, ServiceContext};
    pub use crate::unmask::{ConfigurationStore, InMemoryConfigurationStore};

    pub use federate_connector::prelude::*;
}
