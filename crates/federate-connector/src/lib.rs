//! # Connector Contracts
//!
//! Types and traits shared by the federate connector service tier and the
//! connector managers it hosts.
//!
//! A connector adapts engine requests to one external data source. Each
//! connector runs behind a [`ConnectorManager`](traits::ConnectorManager),
//! which the service tier constructs through a registered factory, starts
//! with a [`ServiceEnvironment`](environment::ServiceEnvironment) of
//! co-located services, and drives with atomic requests.
//!
//! ## Example
//!
//! ```ignore
//! use federate_connector::prelude::*;
//!
//! let registry = ManagerFactoryRegistry::new();
//! registry.register_factory("standard", |settings: ManagerSettings| {
//!     Ok(Arc::new(JdbcManager::new(settings)) as Arc<dyn ConnectorManager>)
//! }).await;
//!
//! let manager = registry.create("standard", settings).await?;
//! manager.initialize(&properties).await?;
//! manager.start(environment).await?;
//! ```
//!
//! ## Crate Organization
//!
//! - [`ids`] - Service, connector and request identifiers
//! - [`types`] - Service state and data source liveness
//! - [`error`] - Error taxonomy with initialization/lifecycle/operational kinds
//! - [`traits`] - Connector manager and sibling service contracts
//! - [`environment`] - Services handed to a started manager
//! - [`code_context`] - Isolated code contexts built from classpath specs
//! - [`config`] - Properties, masked-property metadata and process settings
//! - [`crypto`] - Masked property encryption
//! - [`request`] - Atomic requests, result batches and receivers
//! - [`registry`] - Connector manager factories

pub mod capabilities;
pub mod code_context;
pub mod config;
pub mod crypto;
pub mod environment;
pub mod error;
pub mod ids;
pub mod registry;
pub mod request;
pub mod stats;
pub mod traits;
pub mod types;

/// Prelude module for convenient imports.
///
/// ```
/// use federate_connector::prelude::*;
/// ```
pub mod prelude {
    // IDs
    pub use crate::ids::{
        AtomicRequestId, ConnectorId, ControllerId, DeployedComponentId, RequestId, ServiceId,
    };

    // Types and enums
    pub use crate::types::{CacheType, ConnectionStatus, ServiceState};

    // Error handling
    pub use crate::error::{ConnectorError, ConnectorResult, ErrorKind};

    // Traits
    pub use crate::traits::{
        BufferService, CommandStatus, ConnectorManager, SourceCommandEvent, TrackingService,
        TransactionContext, TransactionScope, TransactionService,
    };

    // Environment
    pub use crate::environment::{
        BoundService, CoreComponent, ServiceEnvironment, ServiceName, ServiceRegistry,
    };

    // Code isolation
    pub use crate::code_context::{CodeContext, Resolution};

    // Configuration
    pub use crate::config::{property_names, Properties, PropertyDescriptor, ServiceSettings};

    // Crypto
    pub use crate::crypto::PropertyCipher;

    // Requests
    pub use crate::request::{
        AtomicRequest, AtomicResults, ChannelReceiver, ExecutionPayload, ResultsReceiver,
        WorkContext,
    };

    // Capabilities and statistics
    pub use crate::capabilities::{Capability, SourceCapabilities};
    pub use crate::stats::WorkerPoolStats;

    // Registry
    pub use crate::registry::{ManagerFactory, ManagerFactoryRegistry, ManagerSettings};
}

// Re-export async_trait for manager implementors
pub use async_trait::async_trait;
