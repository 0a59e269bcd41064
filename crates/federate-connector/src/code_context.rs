//! Isolated code contexts
//!
//! A [`CodeContext`] is the loading context built from one classpath
//! specification. Symbols resolve inside the context unless they fall under
//! one of its shared prefixes, which are the only names delegated to the host.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{ConnectorError, ConnectorResult};

/// Separator between classpath entries.
pub const CLASS_PATH_SEPARATOR: char = ';';

/// Prefixes shared with the host by default.
pub const DEFAULT_SHARED_PREFIXES: &[&str] = &["std::", "core::", "alloc::", "federate_connector::"];

/// Where a symbol is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Delegated to the host context
    Host,
    /// Resolved only from the context's own entries
    Isolated,
}

/// Isolated loading context of one connector.
#[derive(Debug, Clone)]
pub struct CodeContext {
    id: Uuid,
    spec: String,
    entries: Vec<Url>,
    shared_prefixes: Vec<String>,
    created_at: DateTime<Utc>,
}

impl CodeContext {
    /// Build a context from a `;`-separated classpath specification.
    ///
    /// Entries are trimmed and empty entries skipped. Each entry must be an
    /// absolute URL or an absolute filesystem path.
    pub fn parse(spec: &str) -> ConnectorResult<Self> {
        if spec.trim().is_empty() {
            return Err(ConnectorError::MissingClassPath);
        }

        let entries = spec
            .split(CLASS_PATH_SEPARATOR)
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| parse_entry(spec, entry))
            .collect::<ConnectorResult<Vec<_>>>()?;

        Ok(Self {
            id: Uuid::new_v4(),
            spec: spec.to_string(),
            entries,
            shared_prefixes: DEFAULT_SHARED_PREFIXES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            created_at: Utc::now(),
        })
    }

    /// Share an additional symbol prefix with the host.
    #[must_use]
    pub fn with_shared_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.shared_prefixes.push(prefix.into());
        self
    }

    /// Unique identity of this context instance.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Specification the context was built from, verbatim.
    #[must_use]
    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// Resolved classpath entries, in specification order.
    #[must_use]
    pub fn entries(&self) -> &[Url] {
        &self.entries
    }

    /// When the context was built.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Decide where a symbol is resolved.
    #[must_use]
    pub fn resolution(&self, symbol: &str) -> Resolution {
        if self
            .shared_prefixes
            .iter()
            .any(|prefix| symbol.starts_with(prefix.as_str()))
        {
            Resolution::Host
        } else {
            Resolution::Isolated
        }
    }
}

fn parse_entry(spec: &str, entry: &str) -> ConnectorResult<Url> {
    let invalid = |message: String| ConnectorError::InvalidClassPath {
        spec: spec.to_string(),
        message,
    };

    if Path::new(entry).is_absolute() {
        return Url::from_file_path(entry)
            .map_err(|()| invalid(format!("'{entry}' is not a usable file path")));
    }

    Url::parse(entry).map_err(|e| invalid(format!("'{entry}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_entries() {
        let ctx = CodeContext::parse("extensionjar:driver.jar; /opt/lib/util.jar ;;").unwrap();

        let entries: Vec<&str> = ctx.entries().iter().map(Url::as_str).collect();
        assert_eq!(entries, vec!["extensionjar:driver.jar", "file:///opt/lib/util.jar"]);
        assert_eq!(ctx.spec(), "extensionjar:driver.jar; /opt/lib/util.jar ;;");
    }

    #[test]
    fn test_parse_blank_spec() {
        assert!(matches!(
            CodeContext::parse("  "),
            Err(ConnectorError::MissingClassPath)
        ));
    }

    #[test]
    fn test_parse_relative_entry_names_spec() {
        let err = CodeContext::parse("file:///a.jar;lib/b.jar").unwrap_err();
        match err {
            ConnectorError::InvalidClassPath { spec, message } => {
                assert_eq!(spec, "file:///a.jar;lib/b.jar");
                assert!(message.contains("lib/b.jar"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolution_allow_list() {
        let ctx = CodeContext::parse("file:///a.jar")
            .unwrap()
            .with_shared_prefix("serde::");

        assert_eq!(ctx.resolution("std::sync::Arc"), Resolution::Host);
        assert_eq!(ctx.resolution("federate_connector::ConnectorManager"), Resolution::Host);
        assert_eq!(ctx.resolution("serde::Serialize"), Resolution::Host);
        assert_eq!(ctx.resolution("oracle_driver::Connection"), Resolution::Isolated);
        assert_eq!(ctx.resolution("stdx::Thing"), Resolution::Isolated);
    }

    #[test]
    fn test_each_parse_is_a_new_context() {
        let a = CodeContext::parse("file:///a.jar").unwrap();
        let b = CodeContext::parse("file:///a.jar").unwrap();
        assert_ne!(a.id(), b.id());
    }
}
