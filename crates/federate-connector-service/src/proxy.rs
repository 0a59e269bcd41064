//! Sibling service proxies
//!
//! Connector managers are started before the core query component may be
//! running, so they are handed proxies instead of the sibling services
//! themselves. Every proxy call looks the live service up through the
//! registry and forwards to it; errors from the service come back unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use federate_connector::environment::{
    BoundService, ServiceEnvironment, ServiceName, ServiceRegistry,
};
use federate_connector::error::{ConnectorError, ConnectorResult};
use federate_connector::ids::RequestId;
use federate_connector::traits::{
    BufferService, SourceCommandEvent, TrackingService, TransactionContext, TransactionService,
};

/// Name reported when no core query component is running.
pub const CORE_COMPONENT_NAME: &str = "A local QueryService";

#[derive(Clone)]
struct SiblingLocator {
    registry: Arc<dyn ServiceRegistry>,
}

impl SiblingLocator {
    fn locate(&self, name: ServiceName) -> ConnectorResult<BoundService> {
        let core = self
            .registry
            .core_component()
            .ok_or_else(|| ConnectorError::unavailable(CORE_COMPONENT_NAME))?;

        let service = core
            .environment()
            .find_service(name)
            .cloned()
            .ok_or_else(|| ConnectorError::unavailable(name.as_str()))?;

        debug!(service = %name, "Resolved sibling service");
        Ok(service)
    }

    fn buffer(&self) -> ConnectorResult<Arc<dyn BufferService>> {
        match self.locate(ServiceName::Buffer)? {
            BoundService::Buffer(service) => Ok(service),
            _ => Err(ConnectorError::unavailable(ServiceName::Buffer.as_str())),
        }
    }

    fn transaction(&self) -> ConnectorResult<Arc<dyn TransactionService>> {
        match self.locate(ServiceName::Transaction)? {
            BoundService::Transaction(service) => Ok(service),
            _ => Err(ConnectorError::unavailable(
                ServiceName::Transaction.as_str(),
            )),
        }
    }

    fn tracking(&self) -> ConnectorResult<Arc<dyn TrackingService>> {
        match self.locate(ServiceName::Tracking)? {
            BoundService::Tracking(service) => Ok(service),
            _ => Err(ConnectorError::unavailable(ServiceName::Tracking.as_str())),
        }
    }
}

/// Call-time handle to the buffer service.
pub struct BufferServiceProxy {
    locator: SiblingLocator,
}

#[async_trait]
impl BufferService for BufferServiceProxy {
    async fn reserve_memory(&self, group: &str, bytes: u64) -> ConnectorResult<u64> {
        self.locator.buffer()?.reserve_memory(group, bytes).await
    }

    async fn release_memory(&self, group: &str, bytes: u64) -> ConnectorResult<u64> {
        self.locator.buffer()?.release_memory(group, bytes).await
    }

    async fn group_memory_used(&self, group: &str) -> ConnectorResult<u64> {
        self.locator.buffer()?.group_memory_used(group).await
    }
}

/// Call-time handle to the transaction service.
pub struct TransactionServiceProxy {
    locator: SiblingLocator,
}

#[async_trait]
impl TransactionService for TransactionServiceProxy {
    async fn transaction_context(
        &self,
        request_id: &RequestId,
    ) -> ConnectorResult<Option<TransactionContext>> {
        self.locator
            .transaction()?
            .transaction_context(request_id)
            .await
    }

    async fn commit(&self, transaction_id: &str) -> ConnectorResult<()> {
        self.locator.transaction()?.commit(transaction_id).await
    }

    async fn rollback(&self, transaction_id: &str) -> ConnectorResult<()> {
        self.locator.transaction()?.rollback(transaction_id).await
    }
}

/// Call-time handle to the tracking service.
pub struct TrackingServiceProxy {
    locator: SiblingLocator,
}

#[async_trait]
impl TrackingService for TrackingServiceProxy {
    async fn log_source_command(&self, event: SourceCommandEvent) -> ConnectorResult<()> {
        self.locator.tracking()?.log_source_command(event).await
    }
}

/// Build the environment a connector manager is started with.
///
/// The registry is bound directly; every proxied sibling gets a handle that
/// resolves through it on each call.
pub fn bind_sibling_services(registry: Arc<dyn ServiceRegistry>) -> ServiceEnvironment {
    let locator = SiblingLocator {
        registry: Arc::clone(&registry),
    };

    let mut environment = ServiceEnvironment::new().with(BoundService::Registry(registry));
    for name in ServiceName::PROXIED {
        let locator = locator.clone();
        let service = match name {
            ServiceName::Buffer => BoundService::Buffer(Arc::new(BufferServiceProxy { locator })),
            ServiceName::Transaction => {
                BoundService::Transaction(Arc::new(TransactionServiceProxy { locator }))
            }
            ServiceName::Tracking => {
                BoundService::Tracking(Arc::new(TrackingServiceProxy { locator }))
            }
            ServiceName::Registry => continue,
        };
        environment.bind_service(service);
    }
    environment
}
