//! Connector service ID types
//!
//! Newtype wrappers for type-safe identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for the VM controller hosting a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControllerId(Uuid);

impl ControllerId {
    /// Create a new random `ControllerId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ControllerId` from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parse from a string representation.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for ControllerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ControllerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for ControllerId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Identity of one connector service instance within its controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId {
    /// Controller hosting the service.
    pub controller_id: ControllerId,
    /// Instance number assigned by the controller.
    pub instance_id: u64,
}

impl ServiceId {
    /// Create a service id.
    #[must_use]
    pub fn new(controller_id: ControllerId, instance_id: u64) -> Self {
        Self {
            controller_id,
            instance_id,
        }
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.controller_id, self.instance_id)
    }
}

/// Unique identifier for the deployed component a service runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeployedComponentId(Uuid);

impl DeployedComponentId {
    /// Create a new random `DeployedComponentId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `DeployedComponentId` from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DeployedComponentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DeployedComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier handed to a connector manager.
///
/// Derived from the hosting service as `"<controllerID>|<instanceID>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorId(String);

impl ConnectorId {
    /// Wrap an existing identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the connector identifier of a service instance.
    #[must_use]
    pub fn derive(service_id: &ServiceId) -> Self {
        Self(service_id.to_string())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a user request (one federated query execution).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId {
    /// Client connection the request arrived on.
    pub connection_id: String,
    /// Execution number within the connection.
    pub execution_id: i64,
}

impl RequestId {
    /// Create a request id.
    pub fn new(connection_id: impl Into<String>, execution_id: i64) -> Self {
        Self {
            connection_id: connection_id.into(),
            execution_id,
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.connection_id, self.execution_id)
    }
}

/// Identifier of one atomic sub-query sent to a single connector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AtomicRequestId {
    /// Owning user request.
    pub request_id: RequestId,
    /// Plan node that issued the sub-query.
    pub node_id: i32,
    /// Re-execution counter of the node.
    pub execution_count: i32,
}

impl AtomicRequestId {
    /// Create an atomic request id.
    #[must_use]
    pub fn new(request_id: RequestId, node_id: i32, execution_count: i32) -> Self {
        Self {
            request_id,
            node_id,
            execution_count,
        }
    }
}

impl fmt::Display for AtomicRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.request_id, self.node_id, self.execution_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_id_derivation() {
        let controller = ControllerId::new();
        let service = ServiceId::new(controller, 7);

        let connector_id = ConnectorId::derive(&service);
        assert_eq!(connector_id.as_str(), format!("{controller}|7"));
    }

    #[test]
    fn test_controller_id_parse() {
        let id = ControllerId::new();
        let parsed: ControllerId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!(ControllerId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_atomic_request_id_display() {
        let id = AtomicRequestId::new(RequestId::new("conn1", 4), 2, 1);
        assert_eq!(id.to_string(), "conn1.4.2.1");
    }

    #[test]
    fn test_atomic_request_id_equality() {
        let a = AtomicRequestId::new(RequestId::new("c", 1), 1, 0);
        let b = AtomicRequestId::new(RequestId::new("c", 1), 1, 1);
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }
}
