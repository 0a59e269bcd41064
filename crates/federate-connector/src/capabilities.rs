//! Declared query features of a data source.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A query feature a data source may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Inner joins pushed to the source
    InnerJoin,
    /// Left/right outer joins
    OuterJoin,
    /// Full outer joins
    FullOuterJoin,
    /// `ORDER BY`
    OrderBy,
    /// `GROUP BY` and aggregates
    Aggregates,
    /// `IN (...)` criteria
    InCriteria,
    /// `LIKE` criteria
    LikeCriteria,
    /// Scalar subqueries
    ScalarSubqueries,
    /// `UNION`
    Union,
    /// Row limits
    RowLimit,
    /// Insert/update/delete
    BulkUpdate,
}

/// Query features declared by a connector for the planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCapabilities {
    /// Supported features.
    pub supported: BTreeSet<Capability>,
    /// Maximum number of values in one `IN` criteria, if bounded.
    pub max_in_criteria_size: Option<usize>,
}

impl SourceCapabilities {
    /// Capabilities with nothing supported.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Builder-style add of a supported feature.
    #[must_use]
    pub fn with(mut self, capability: Capability) -> Self {
        self.supported.insert(capability);
        self
    }

    /// Set the `IN` criteria bound.
    #[must_use]
    pub fn with_max_in_criteria_size(mut self, size: usize) -> Self {
        self.max_in_criteria_size = Some(size);
        self
    }

    /// Check whether a feature is supported.
    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        self.supported.contains(&capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports() {
        let caps = SourceCapabilities::none()
            .with(Capability::OuterJoin)
            .with_max_in_criteria_size(1000);

        assert!(caps.supports(Capability::OuterJoin));
        assert!(!caps.supports(Capability::FullOuterJoin));
        assert_eq!(caps.max_in_criteria_size, Some(1000));
    }
}
