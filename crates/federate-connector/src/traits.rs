//! Connector service traits
//!
//! The contract a connector manager fulfils for the service tier, and the
//! contracts of the co-located services a manager may call back into.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capabilities::SourceCapabilities;
use crate::config::Properties;
use crate::environment::ServiceEnvironment;
use crate::error::ConnectorResult;
use crate::ids::{AtomicRequestId, ConnectorId, RequestId};
use crate::request::{AtomicRequest, ExecutionPayload, ResultsReceiver, WorkContext};
use crate::stats::WorkerPoolStats;
use crate::types::ConnectionStatus;

/// A connector manager: owns one connector and runs its requests.
///
/// One instance is shared by every in-flight request of a service, so all
/// request methods must be safe to call concurrently.
#[async_trait]
pub trait ConnectorManager: Send + Sync {
    /// Display name of the manager.
    fn name(&self) -> String;

    /// Identifier the manager was created with.
    fn connector_id(&self) -> ConnectorId;

    /// Apply the (already unmasked) configuration.
    async fn initialize(&self, properties: &Properties) -> ConnectorResult<()>;

    /// Start the manager with access to co-located services.
    async fn start(&self, environment: ServiceEnvironment) -> ConnectorResult<()>;

    /// Stop the manager and release its resources.
    async fn stop(&self) -> ConnectorResult<()>;

    /// Submit a request for asynchronous execution.
    ///
    /// The manager invokes `receiver` exactly once with the first batch or
    /// the failure.
    async fn execute_request(
        &self,
        receiver: Arc<dyn ResultsReceiver>,
        request: AtomicRequest,
    ) -> ConnectorResult<()>;

    /// Cancel a request. Unknown or finished requests are not an error.
    async fn cancel_request(&self, request_id: &AtomicRequestId) -> ConnectorResult<()>;

    /// Release everything held for a request. Idempotent.
    async fn close_request(&self, request_id: &AtomicRequestId) -> ConnectorResult<()>;

    /// Produce the next batch of an open request through its receiver.
    async fn request_more(&self, request_id: &AtomicRequestId) -> ConnectorResult<()>;

    /// Query features of the data source for planning.
    async fn capabilities(
        &self,
        request_id: &RequestId,
        payload: &ExecutionPayload,
        context: &WorkContext,
    ) -> ConnectorResult<SourceCapabilities>;

    /// Liveness of the underlying data source.
    async fn status(&self) -> ConnectionStatus;

    /// Occupancy of every worker pool, if the manager reports any.
    fn queue_statistics(&self) -> Option<Vec<WorkerPoolStats>>;

    /// Occupancy of the named worker pool, if known.
    fn queue_statistics_for(&self, name: &str) -> Option<Vec<WorkerPoolStats>>;

    /// Drop cached result sets.
    async fn clear_cache(&self);
}

/// Memory accounting of the buffer subsystem, per tuple group.
///
/// A tuple group is typically one session or connection.
#[async_trait]
pub trait BufferService: Send + Sync {
    /// Reserve memory for a group, returning the group's new total.
    async fn reserve_memory(&self, group: &str, bytes: u64) -> ConnectorResult<u64>;

    /// Release memory held by a group, returning the group's new total.
    async fn release_memory(&self, group: &str, bytes: u64) -> ConnectorResult<u64>;

    /// Bytes currently reserved by a group.
    async fn group_memory_used(&self, group: &str) -> ConnectorResult<u64>;
}

/// Scope of a transaction a request participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionScope {
    /// Local to one connection
    Local,
    /// Spans one user request
    Request,
    /// Distributed, coordinated outside the engine
    Global,
}

/// Transaction a request runs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionContext {
    /// Transaction identifier.
    pub transaction_id: String,
    /// Transaction scope.
    pub scope: TransactionScope,
}

/// Transaction coordination offered to connectors.
#[async_trait]
pub trait TransactionService: Send + Sync {
    /// The transaction a request runs in, if any.
    async fn transaction_context(
        &self,
        request_id: &RequestId,
    ) -> ConnectorResult<Option<TransactionContext>>;

    /// Commit a transaction.
    async fn commit(&self, transaction_id: &str) -> ConnectorResult<()>;

    /// Roll back a transaction.
    async fn rollback(&self, transaction_id: &str) -> ConnectorResult<()>;
}

/// Phase of a source command being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    /// Command sent to the source
    Start,
    /// Command finished
    End,
    /// Command cancelled
    Cancel,
    /// Command failed
    Error,
}

/// Audit record of a command sent to a data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCommandEvent {
    /// Atomic request that issued the command.
    pub request_id: AtomicRequestId,
    /// Connector the command was sent through.
    pub connector_id: ConnectorId,
    /// Phase being recorded.
    pub status: CommandStatus,
    /// Rows produced so far, when known.
    pub row_count: Option<u64>,
    /// When the phase was reached.
    pub occurred_at: DateTime<Utc>,
}

/// Command tracking offered to connectors.
#[async_trait]
pub trait TrackingService: Send + Sync {
    /// Record one phase of a source command.
    async fn log_source_command(&self, event: SourceCommandEvent) -> ConnectorResult<()>;
}
