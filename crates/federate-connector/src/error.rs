//! Connector service error types
//!
//! Error definitions classified by the phase that produced them, with a
//! transient/permanent split for callers that implement their own retry.

use thiserror::Error;

use crate::ids::AtomicRequestId;
use crate::types::ServiceState;

/// Broad classification of a [`ConnectorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Fatal during `init`; the service never reaches `Open`.
    Initialization,
    /// Manager start/stop failure.
    Lifecycle,
    /// Execute/cancel/close/batch/capabilities failure, propagated verbatim.
    Operational,
}

/// Error that can occur in the connector service tier.
#[derive(Debug, Error)]
pub enum ConnectorError {
    // Initialization errors
    /// No classpath specification was configured.
    #[error("no connector classpath configured")]
    MissingClassPath,

    /// The classpath specification could not be parsed.
    #[error("illegal connector classpath '{spec}': {message}")]
    InvalidClassPath { spec: String, message: String },

    /// The configuration does not carry a binding name.
    #[error("unable to get connector binding name from connector properties")]
    MissingBindingName,

    /// The configuration store does not know the binding.
    #[error("connector binding '{binding}' not found in configuration")]
    BindingNotFound { binding: String },

    /// The component type of a binding is not defined.
    #[error("unable to get connector component type '{component_type}'")]
    ComponentTypeNotFound { component_type: String },

    /// A masked property could not be decrypted.
    #[error("failed decrypting masked property '{property}'")]
    PropertyDecryption {
        property: String,
        #[source]
        source: Box<ConnectorError>,
    },

    /// No manager factory is registered for the configured type tag.
    #[error("unsupported connector manager type: {manager_type}")]
    UnsupportedManagerType { manager_type: String },

    /// The manager factory or the manager's `initialize` failed.
    #[error("unable to construct connector manager of type '{manager_type}': {message}")]
    ManagerConstruction {
        manager_type: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration could not be read.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Property encryption failed.
    #[error("encryption failed: {message}")]
    EncryptionFailed { message: String },

    /// Property decryption failed.
    #[error("decryption failed: {message}")]
    DecryptionFailed { message: String },

    // Lifecycle errors
    /// The connector manager failed to start.
    #[error("unable to start connector manager {name}: {message}")]
    StartFailed {
        name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The connector manager failed to stop.
    #[error("unable to shut down connector manager {name}: {message}")]
    StopFailed {
        name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Operational errors
    /// A co-located service is not available right now.
    #[error("{service} is not available")]
    ServiceUnavailable { service: String },

    /// The connector service is not accepting work.
    #[error("connector service is not open (current state: {state})")]
    ServiceNotOpen { state: ServiceState },

    /// The connector manager does not know the request.
    #[error("request not found: {request_id}")]
    RequestNotFound { request_id: AtomicRequestId },

    /// Execution against the data source failed.
    #[error("execution failed: {message}")]
    ExecutionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal error.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ConnectorError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectorError::MissingClassPath
            | ConnectorError::InvalidClassPath { .. }
            | ConnectorError::MissingBindingName
            | ConnectorError::BindingNotFound { .. }
            | ConnectorError::ComponentTypeNotFound { .. }
            | ConnectorError::PropertyDecryption { .. }
            | ConnectorError::UnsupportedManagerType { .. }
            | ConnectorError::ManagerConstruction { .. }
            | ConnectorError::Configuration { .. }
            | ConnectorError::EncryptionFailed { .. }
            | ConnectorError::DecryptionFailed { .. } => ErrorKind::Initialization,
            ConnectorError::StartFailed { .. } | ConnectorError::StopFailed { .. } => {
                ErrorKind::Lifecycle
            }
            ConnectorError::ServiceUnavailable { .. }
            | ConnectorError::ServiceNotOpen { .. }
            | ConnectorError::RequestNotFound { .. }
            | ConnectorError::ExecutionFailed { .. }
            | ConnectorError::Internal { .. } => ErrorKind::Operational,
        }
    }

    /// Check if this error is transient and the caller may retry.
    ///
    /// This layer never retries on its own.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectorError::ServiceUnavailable { .. } | ConnectorError::ExecutionFailed { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::MissingClassPath => "MISSING_CLASS_PATH",
            ConnectorError::InvalidClassPath { .. } => "INVALID_CLASS_PATH",
            ConnectorError::MissingBindingName => "MISSING_BINDING_NAME",
            ConnectorError::BindingNotFound { .. } => "BINDING_NOT_FOUND",
            ConnectorError::ComponentTypeNotFound { .. } => "COMPONENT_TYPE_NOT_FOUND",
            ConnectorError::PropertyDecryption { .. } => "PROPERTY_DECRYPTION_FAILED",
            ConnectorError::UnsupportedManagerType { .. } => "UNSUPPORTED_MANAGER_TYPE",
            ConnectorError::ManagerConstruction { .. } => "MANAGER_CONSTRUCTION_FAILED",
            ConnectorError::Configuration { .. } => "CONFIGURATION_ERROR",
            ConnectorError::EncryptionFailed { .. } => "ENCRYPTION_FAILED",
            ConnectorError::DecryptionFailed { .. } => "DECRYPTION_FAILED",
            ConnectorError::StartFailed { .. } => "START_FAILED",
            ConnectorError::StopFailed { .. } => "STOP_FAILED",
            ConnectorError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            ConnectorError::ServiceNotOpen { .. } => "SERVICE_NOT_OPEN",
            ConnectorError::RequestNotFound { .. } => "REQUEST_NOT_FOUND",
            ConnectorError::ExecutionFailed { .. } => "EXECUTION_FAILED",
            ConnectorError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    // Convenience constructors

    /// Create a service unavailable error.
    pub fn unavailable(service: impl Into<String>) -> Self {
        ConnectorError::ServiceUnavailable {
            service: service.into(),
        }
    }

    /// Create an execution failed error.
    pub fn execution_failed(message: impl Into<String>) -> Self {
        ConnectorError::ExecutionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create an execution failed error with source.
    pub fn execution_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::ExecutionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a start failed error.
    pub fn start_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        ConnectorError::StartFailed {
            name: name.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a stop failed error.
    pub fn stop_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        ConnectorError::StopFailed {
            name: name.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ConnectorError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error with source.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;
