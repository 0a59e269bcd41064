//! Atomic request types
//!
//! One atomic request is a sub-query sent to a single data source as part of
//! a larger federated plan. Results come back asynchronously through a
//! [`ResultsReceiver`].

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{ConnectorError, ConnectorResult};
use crate::ids::{AtomicRequestId, ConnectorId};

/// Opaque execution payload passed through to the connector manager.
pub type ExecutionPayload = serde_json::Value;

/// Session-level context of the caller that issued a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkContext {
    /// Client session.
    pub session_id: String,
    /// Authenticated user.
    pub user_name: String,
    /// Virtual database being queried.
    pub vdb_name: String,
    /// Version of the virtual database.
    pub vdb_version: String,
}

/// One sub-query addressed to a single connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomicRequest {
    /// Request identifier, unique among in-flight sub-queries.
    pub id: AtomicRequestId,
    /// Target connector.
    pub connector_id: ConnectorId,
    /// Command in the connector's language.
    pub command: ExecutionPayload,
    /// Rows per batch requested by the caller.
    pub fetch_size: usize,
    /// Caller context.
    pub work_context: WorkContext,
}

impl AtomicRequest {
    /// Default rows per batch.
    pub const DEFAULT_FETCH_SIZE: usize = 2048;

    /// Create a request with the default fetch size and an empty context.
    pub fn new(id: AtomicRequestId, connector_id: ConnectorId, command: ExecutionPayload) -> Self {
        Self {
            id,
            connector_id,
            command,
            fetch_size: Self::DEFAULT_FETCH_SIZE,
            work_context: WorkContext::default(),
        }
    }

    /// Set the fetch size.
    #[must_use]
    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size;
        self
    }

    /// Set the caller context.
    #[must_use]
    pub fn with_work_context(mut self, work_context: WorkContext) -> Self {
        self.work_context = work_context;
        self
    }
}

/// One batch of results for an atomic request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicResults {
    /// Request the batch belongs to.
    pub request_id: AtomicRequestId,
    /// Rows in this batch.
    pub rows: Vec<Vec<serde_json::Value>>,
    /// Total row count, known once the last batch is produced.
    pub final_row: Option<usize>,
    /// Whether this is the last batch.
    pub is_last: bool,
    /// Non-fatal warnings raised by the data source.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl AtomicResults {
    /// Create an intermediate batch.
    #[must_use]
    pub fn batch(request_id: AtomicRequestId, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self {
            request_id,
            rows,
            final_row: None,
            is_last: false,
            warnings: Vec::new(),
        }
    }

    /// Mark this batch as the last one, with the total row count.
    #[must_use]
    pub fn last(mut self, final_row: usize) -> Self {
        self.is_last = true;
        self.final_row = Some(final_row);
        self
    }
}

/// Caller-supplied sink for the outcome of a request.
///
/// The connector manager invokes exactly one of these methods per
/// `execute_request` or `request_more` call.
pub trait ResultsReceiver: Send + Sync {
    /// A batch was produced.
    fn receive_results(&self, results: AtomicResults);

    /// The request failed.
    fn exception_occurred(&self, error: ConnectorError);
}

/// [`ResultsReceiver`] that forwards outcomes into a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelReceiver {
    sender: mpsc::UnboundedSender<ConnectorResult<AtomicResults>>,
}

impl ChannelReceiver {
    /// Create a receiver and the channel end outcomes are delivered to.
    #[must_use]
    pub fn new() -> (
        Self,
        mpsc::UnboundedReceiver<ConnectorResult<AtomicResults>>,
    ) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn deliver(&self, outcome: ConnectorResult<AtomicResults>) {
        if self.sender.send(outcome).is_err() {
            tracing::debug!("Results receiver dropped before outcome was delivered");
        }
    }
}

impl ResultsReceiver for ChannelReceiver {
    fn receive_results(&self, results: AtomicResults) {
        self.deliver(Ok(results));
    }

    fn exception_occurred(&self, error: ConnectorError) {
        self.deliver(Err(error));
    }
}
