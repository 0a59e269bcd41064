//! Connector service type definitions
//!
//! Enums for service state, data source liveness and admin caches.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Advertised state of a connector service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// Service is running and the data source is reachable
    Open,
    /// Service is running but the data source was observed dead
    DataSourceUnavailable,
    /// Service was closed gracefully
    Closed,
    /// Service was killed
    Killed,
}

impl ServiceState {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Open => "open",
            ServiceState::DataSourceUnavailable => "data_source_unavailable",
            ServiceState::Closed => "closed",
            ServiceState::Killed => "killed",
        }
    }

    /// Check if the state is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceState::Closed | ServiceState::Killed)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ServiceState {
    type Err = ParseServiceStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(ServiceState::Open),
            "data_source_unavailable" => Ok(ServiceState::DataSourceUnavailable),
            "closed" => Ok(ServiceState::Closed),
            "killed" => Ok(ServiceState::Killed),
            _ => Err(ParseServiceStateError(s.to_string())),
        }
    }
}

/// Error parsing service state from string.
#[derive(Debug, Clone)]
pub struct ParseServiceStateError(String);

impl fmt::Display for ParseServiceStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid service state '{}', expected one of: open, data_source_unavailable, closed, killed",
            self.0
        )
    }
}

impl std::error::Error for ParseServiceStateError {}

/// Liveness of the data source behind a connector manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Data source answered
    Alive,
    /// Data source could not be reached
    Dead,
}

impl ConnectionStatus {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Alive => "alive",
            ConnectionStatus::Dead => "dead",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConnectionStatus {
    type Err = ParseConnectionStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "alive" => Ok(ConnectionStatus::Alive),
            "dead" => Ok(ConnectionStatus::Dead),
            _ => Err(ParseConnectionStatusError(s.to_string())),
        }
    }
}

/// Error parsing connection status from string.
#[derive(Debug, Clone)]
pub struct ParseConnectionStatusError(String);

impl fmt::Display for ParseConnectionStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid connection status '{}', expected one of: alive, dead",
            self.0
        )
    }
}

impl std::error::Error for ParseConnectionStatusError {}

/// Kind of a cache exposed through the admin surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    /// Result sets cached by the connector manager
    ConnectorResultSet,
}

impl CacheType {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheType::ConnectorResultSet => "connector_result_set",
        }
    }
}

impl fmt::Display for CacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_state_roundtrip() {
        for state in [
            ServiceState::Open,
            ServiceState::DataSourceUnavailable,
            ServiceState::Closed,
            ServiceState::Killed,
        ] {
            let parsed: ServiceState = state.as_str().parse().unwrap();
            assert_eq!(parsed, state);
        }
        assert!("half_open".parse::<ServiceState>().is_err());
    }

    #[test]
    fn test_service_state_terminal() {
        assert!(ServiceState::Closed.is_terminal());
        assert!(ServiceState::Killed.is_terminal());
        assert!(!ServiceState::Open.is_terminal());
        assert!(!ServiceState::DataSourceUnavailable.is_terminal());
    }

    #[test]
    fn test_connection_status_parse() {
        assert_eq!(
            "ALIVE".parse::<ConnectionStatus>().unwrap(),
            ConnectionStatus::Alive
        );
        let err = "unknown".parse::<ConnectionStatus>().unwrap_err();
        assert!(err.to_string().contains("alive, dead"));
    }

    #[test]
    fn test_service_state_serde() {
        let json = serde_json::to_string(&ServiceState::DataSourceUnavailable).unwrap();
        assert_eq!(json, "\"data_source_unavailable\"");
    }
}
