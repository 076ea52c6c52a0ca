//! Read-only view over a completed Great Expectations checkpoint run
//!
//! Great Expectations hands us a serialized `CheckpointResult`. The
//! [`document`] adapter turns that loosely-typed JSON into a [`CheckpointRun`],
//! and nothing past this module ever looks at the raw document again.

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use std::fmt;

pub mod document;

pub use document::{AdaptError, overall_success};

/// One checkpoint execution covering one or more validations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckpointRun {
    /// Overall pass/fail of the checkpoint
    pub success: bool,
    /// Owning checkpoint name, if the framework recorded one
    pub checkpoint_name: Option<String>,
    pub run_id: RunIdentity,
    /// Per-validation outcomes in the order the framework reported them
    pub validations: IndexMap<ValidationKey, ValidationOutcome>,
}

/// Name and start time the framework assigned to a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunIdentity {
    pub name: Option<String>,
    /// Recorded with the offset the framework wrote
    pub time: Option<DateTime<FixedOffset>>,
}

/// Identifies one validation within a checkpoint run
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ValidationKey {
    pub suite_name: Option<String>,
    pub run_name: Option<String>,
    pub batch_identifier: Option<String>,
}

impl fmt::Display for ValidationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{}::{}",
            self.suite_name.as_deref().unwrap_or(""),
            self.run_name.as_deref().unwrap_or(""),
            self.batch_identifier.as_deref().unwrap_or("")
        )
    }
}

/// Outcome of a single expectation suite validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationOutcome {
    pub success: bool,
    /// `meta.batch_spec`, the preferred dataset metadata source
    pub batch_spec: Option<BatchMetadata>,
    /// `meta.active_batch_definition`, consulted for fields `batch_spec` lacks
    pub active_batch_definition: Option<BatchMetadata>,
    pub results: Vec<ExpectationRecord>,
    pub statistics: Option<ValidationStatistics>,
}

/// Dataset naming carried in a validation's metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchMetadata {
    pub datasource_name: Option<String>,
    pub data_asset_name: Option<String>,
}

/// A single expectation result as the framework reported it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectationRecord {
    pub expectation_type: Option<String>,
    pub success: Option<bool>,
    pub column: Option<String>,
}

/// Expectation counters for one validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationStatistics {
    pub evaluated_expectations: u64,
    pub successful_expectations: u64,
    pub unsuccessful_expectations: u64,
    pub success_percent: Option<f64>,
}
