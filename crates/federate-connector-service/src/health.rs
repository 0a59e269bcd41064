//! Health polling
//!
//! An external scheduler calls [`ConnectorService::check_state`] on a
//! cadence. A dead data source moves an open service to
//! `DataSourceUnavailable`; only an alive observation moves it back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use federate_connector::error::{ConnectorError, ConnectorResult};
use federate_connector::ids::ConnectorId;
use federate_connector::types::{ConnectionStatus, ServiceState};

use crate::service::ConnectorService;

/// Snapshot of a service's health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    /// Connector the snapshot describes.
    pub connector_id: ConnectorId,
    /// Advertised state.
    pub state: ServiceState,
    /// Whether availability is polled.
    pub monitoring_enabled: bool,
    /// Last observed data source liveness.
    pub last_status: Option<ConnectionStatus>,
    /// When liveness was last observed.
    pub last_checked_at: Option<DateTime<Utc>>,
}

/// State after observing `status` in state `current`, if it changes.
#[must_use]
pub fn transition(current: ServiceState, status: ConnectionStatus) -> Option<ServiceState> {
    match (current, status) {
        (ServiceState::Open, ConnectionStatus::Dead) => Some(ServiceState::DataSourceUnavailable),
        (ServiceState::DataSourceUnavailable, ConnectionStatus::Alive) => Some(ServiceState::Open),
        _ => None,
    }
}

impl ConnectorService {
    /// Poll the data source and apply the resulting state transition.
    ///
    /// While the data source is unavailable the generic liveness check is
    /// skipped and this returns `Ok`. Otherwise a service that is not open
    /// fails with [`ConnectorError::ServiceNotOpen`].
    pub async fn check_state(&self) -> ConnectorResult<()> {
        if self.monitoring_enabled() {
            if let Some(manager) = self.current_manager().await {
                let observed = manager.status().await;
                self.record_status(observed).await;
            }
        }

        let state = self.state().await;
        if state == ServiceState::DataSourceUnavailable {
            debug!(connector_id = %self.connector_id(), "Data source unavailable, liveness check suppressed");
            return Ok(());
        }
        self.check_liveness(state)
    }

    async fn record_status(&self, observed: ConnectionStatus) {
        let mut status = self.status.write().await;
        status.last_status = Some(observed);
        status.last_checked_at = Some(Utc::now());

        if let Some(next) = transition(status.state, observed) {
            info!(
                manager = %self.manager_name(),
                from = %status.state,
                to = %next,
                "Connector service state changed"
            );
            status.state = next;
        }
    }

    fn check_liveness(&self, state: ServiceState) -> ConnectorResult<()> {
        if state == ServiceState::Open {
            return Ok(());
        }
        warn!(connector_id = %self.connector_id(), state = %state, "Connector service is not open");
        Err(ConnectorError::ServiceNotOpen { state })
    }

    /// Current health snapshot.
    pub async fn health(&self) -> ServiceHealth {
        let status = *self.status.read().await;
        ServiceHealth {
            connector_id: self.connector_id().clone(),
            state: status.state,
            monitoring_enabled: self.monitoring_enabled(),
            last_status: status.last_status,
            last_checked_at: status.last_checked_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        assert_eq!(
            transition(ServiceState::Open, ConnectionStatus::Dead),
            Some(ServiceState::DataSourceUnavailable)
        );
        assert_eq!(
            transition(ServiceState::DataSourceUnavailable, ConnectionStatus::Alive),
            Some(ServiceState::Open)
        );
        assert_eq!(transition(ServiceState::Open, ConnectionStatus::Alive), None);
        assert_eq!(
            transition(ServiceState::DataSourceUnavailable, ConnectionStatus::Dead),
            None
        );
    }

    #[test]
    fn test_terminal_states_never_reopen() {
        for state in [ServiceState::Closed, ServiceState::Killed] {
            assert_eq!(transition(state, ConnectionStatus::Alive), None);
            assert_eq!(transition(state, ConnectionStatus::Dead), None);
        }
    }
}
