//! Async request bridge
//!
//! Forwards atomic request operations to the connector manager. The bridge
//! keeps no per-request state: outcomes travel from the manager straight to
//! the caller's [`ResultsReceiver`], and manager errors are returned as-is.
//!
//! For [`ConnectorService::request_batch`] the caller must wait for the
//! previous batch (or failure) of a request to be delivered before asking
//! for the next one; overlapping calls are passed through, not rejected.

use std::sync::Arc;

use tracing::debug;

use federate_connector::error::{ConnectorError, ConnectorResult};
use federate_connector::ids::AtomicRequestId;
use federate_connector::request::{AtomicRequest, ResultsReceiver};

use crate::service::ConnectorService;

impl ConnectorService {
    /// Submit an atomic request. The manager reports its outcome to `receiver`.
    pub async fn execute_request(
        &self,
        request: AtomicRequest,
        receiver: Arc<dyn ResultsReceiver>,
    ) -> ConnectorResult<()> {
        let (_work, manager) = self.admit().await?;
        debug!(
            connector_id = %self.connector_id(),
            request_id = %request.id,
            "Executing atomic request"
        );
        manager.execute_request(receiver, request).await
    }

    /// Ask for the next batch of an open request.
    pub async fn request_batch(&self, request_id: &AtomicRequestId) -> ConnectorResult<()> {
        let (_work, manager) = self.admit().await?;
        manager.request_more(request_id).await
    }

    /// Cancel a request. Unknown or finished requests are ignored.
    pub async fn cancel_request(&self, request_id: &AtomicRequestId) -> ConnectorResult<()> {
        let Some(manager) = self.current_manager().await else {
            debug!(request_id = %request_id, "Cancel with no running manager");
            return Ok(());
        };
        absorb_unknown(request_id, manager.cancel_request(request_id).await)
    }

    /// Release resources held for a request. Idempotent.
    pub async fn close_request(&self, request_id: &AtomicRequestId) -> ConnectorResult<()> {
        let Some(manager) = self.current_manager().await else {
            debug!(request_id = %request_id, "Close with no running manager");
            return Ok(());
        };
        absorb_unknown(request_id, manager.close_request(request_id).await)
    }
}

fn absorb_unknown(request_id: &AtomicRequestId, result: ConnectorResult<()>) -> ConnectorResult<()> {
    match result {
        Err(ConnectorError::RequestNotFound { .. }) => {
            debug!(request_id = %request_id, "Request already finished or unknown");
            Ok(())
        }
        other => other,
    }
}
