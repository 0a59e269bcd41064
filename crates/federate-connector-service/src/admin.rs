//! Metrics and cache administration
//!
//! Read-only worker pool statistics, source capabilities, and the one
//! cache that can be cleared by name.

use std::collections::BTreeMap;

use tracing::{debug, info};

use federate_connector::capabilities::SourceCapabilities;
use federate_connector::error::ConnectorResult;
use federate_connector::ids::RequestId;
use federate_connector::request::{ExecutionPayload, WorkContext};
use federate_connector::stats::WorkerPoolStats;
use federate_connector::types::CacheType;

use crate::service::ConnectorService;

/// Admin name of the connector result set cache.
pub const RESULT_SET_CACHE_NAME: &str = "ConnectorResultSetCache";

impl ConnectorService {
    /// Statistics of every worker pool. Empty when nothing is reported.
    pub async fn queue_statistics(&self) -> Vec<WorkerPoolStats> {
        self.current_manager()
            .await
            .and_then(|manager| manager.queue_statistics())
            .unwrap_or_default()
    }

    /// Statistics of one worker pool, zero-valued when unknown.
    pub async fn queue_statistics_for(&self, name: &str) -> WorkerPoolStats {
        self.current_manager()
            .await
            .and_then(|manager| manager.queue_statistics_for(name))
            .and_then(|stats| stats.into_iter().next())
            .unwrap_or_default()
    }

    /// Query features of the data source.
    pub async fn capabilities(
        &self,
        request_id: &RequestId,
        payload: &ExecutionPayload,
        context: &WorkContext,
    ) -> ConnectorResult<SourceCapabilities> {
        let (_work, manager) = self.admit().await?;
        manager.capabilities(request_id, payload, context).await
    }

    /// Caches that can be cleared through [`ConnectorService::clear_cache`].
    #[must_use]
    pub fn caches(&self) -> BTreeMap<String, CacheType> {
        BTreeMap::from([(
            RESULT_SET_CACHE_NAME.to_string(),
            CacheType::ConnectorResultSet,
        )])
    }

    /// Clear a cache by name. Unknown names are ignored.
    pub async fn clear_cache(&self, name: &str) {
        if name != RESULT_SET_CACHE_NAME {
            debug!(cache = %name, "Ignoring clear request for unknown cache");
            return;
        }
        if let Some(manager) = self.current_manager().await {
            info!(manager = %self.manager_name(), cache = %name, "Clearing connector cache");
            manager.clear_cache().await;
        }
    }
}
