//! Service environment
//!
//! The set of co-located services a connector manager is started with, and
//! the registry through which the live core query component is found.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::traits::{BufferService, TrackingService, TransactionService};

/// Names of the services an environment may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceName {
    /// Registry of co-located components
    Registry,
    /// Buffer memory accounting
    Buffer,
    /// Transaction coordination
    Transaction,
    /// Source command tracking
    Tracking,
}

impl ServiceName {
    /// Sibling services reached through call-time proxies.
    pub const PROXIED: [ServiceName; 3] = [
        ServiceName::Buffer,
        ServiceName::Transaction,
        ServiceName::Tracking,
    ];

    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceName::Registry => "RegistryService",
            ServiceName::Buffer => "BufferService",
            ServiceName::Transaction => "TransactionService",
            ServiceName::Tracking => "TrackingService",
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ServiceName {
    type Err = ParseServiceNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RegistryService" => Ok(ServiceName::Registry),
            "BufferService" => Ok(ServiceName::Buffer),
            "TransactionService" => Ok(ServiceName::Transaction),
            "TrackingService" => Ok(ServiceName::Tracking),
            _ => Err(ParseServiceNameError(s.to_string())),
        }
    }
}

/// Error parsing a service name from string.
#[derive(Debug, Clone)]
pub struct ParseServiceNameError(String);

impl fmt::Display for ParseServiceNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid service name '{}', expected one of: RegistryService, BufferService, TransactionService, TrackingService",
            self.0
        )
    }
}

impl std::error::Error for ParseServiceNameError {}

/// A service bound into an environment.
#[derive(Clone)]
pub enum BoundService {
    Registry(Arc<dyn ServiceRegistry>),
    Buffer(Arc<dyn BufferService>),
    Transaction(Arc<dyn TransactionService>),
    Tracking(Arc<dyn TrackingService>),
}

impl BoundService {
    /// Name the service is bound under.
    #[must_use]
    pub fn name(&self) -> ServiceName {
        match self {
            BoundService::Registry(_) => ServiceName::Registry,
            BoundService::Buffer(_) => ServiceName::Buffer,
            BoundService::Transaction(_) => ServiceName::Transaction,
            BoundService::Tracking(_) => ServiceName::Tracking,
        }
    }
}

impl fmt::Debug for BoundService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoundService").field(&self.name()).finish()
    }
}

/// Services available to a connector manager, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ServiceEnvironment {
    services: HashMap<ServiceName, BoundService>,
}

impl ServiceEnvironment {
    /// Create an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style bind.
    #[must_use]
    pub fn with(mut self, service: BoundService) -> Self {
        self.bind_service(service);
        self
    }

    /// Bind a service under its name, returning the one it replaces.
    pub fn bind_service(&mut self, service: BoundService) -> Option<BoundService> {
        self.services.insert(service.name(), service)
    }

    /// Look up a service by name.
    #[must_use]
    pub fn find_service(&self, name: ServiceName) -> Option<&BoundService> {
        self.services.get(&name)
    }

    /// The bound registry, if any.
    #[must_use]
    pub fn registry(&self) -> Option<Arc<dyn ServiceRegistry>> {
        match self.find_service(ServiceName::Registry)? {
            BoundService::Registry(s) => Some(Arc::clone(s)),
            _ => None,
        }
    }

    /// The bound buffer service, if any.
    #[must_use]
    pub fn buffer(&self) -> Option<Arc<dyn BufferService>> {
        match self.find_service(ServiceName::Buffer)? {
            BoundService::Buffer(s) => Some(Arc::clone(s)),
            _ => None,
        }
    }

    /// The bound transaction service, if any.
    #[must_use]
    pub fn transaction(&self) -> Option<Arc<dyn TransactionService>> {
        match self.find_service(ServiceName::Transaction)? {
            BoundService::Transaction(s) => Some(Arc::clone(s)),
            _ => None,
        }
    }

    /// The bound tracking service, if any.
    #[must_use]
    pub fn tracking(&self) -> Option<Arc<dyn TrackingService>> {
        match self.find_service(ServiceName::Tracking)? {
            BoundService::Tracking(s) => Some(Arc::clone(s)),
            _ => None,
        }
    }

    /// Names of all bound services, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<ServiceName> {
        let mut names: Vec<_> = self.services.keys().copied().collect();
        names.sort();
        names
    }

    /// Number of bound services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// The host's core query component.
pub trait CoreComponent: Send + Sync {
    /// Services the component hosts.
    fn environment(&self) -> &ServiceEnvironment;
}

/// Lookup of live co-located components.
pub trait ServiceRegistry: Send + Sync {
    /// The live core query component, if one is running.
    fn core_component(&self) -> Option<Arc<dyn CoreComponent>>;
}
