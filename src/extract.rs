//! Identity and metadata extraction
//!
//! Pure functions over a [`CheckpointRun`]. None of them can fail: every
//! missing or empty field has a fixed default.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::checkpoint::{BatchMetadata, CheckpointRun, ValidationKey, ValidationOutcome};

/// Namespace for deterministic run ids (the RFC 4122 DNS namespace)
pub const RUN_NAMESPACE: Uuid = Uuid::from_u128(0x6ba7b810_9dad_11d1_80b4_00c04fd430c8);

pub const UNKNOWN_CHECKPOINT: &str = "unknown_checkpoint";
pub const UNKNOWN_SUITE: &str = "unknown_suite";
pub const UNKNOWN: &str = "unknown";

/// A dataset the validation ran against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRef {
    pub namespace: String,
    pub name: String,
}

/// One expectation outcome, in the shape of the assertions facet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionResult {
    pub assertion: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

/// `{checkpoint}.{suite}`, names passed through verbatim
pub fn job_name(run: &CheckpointRun, key: &ValidationKey) -> String {
    let checkpoint = non_empty(run.checkpoint_name.as_deref()).unwrap_or(UNKNOWN_CHECKPOINT);
    let suite = non_empty(key.suite_name.as_deref()).unwrap_or(UNKNOWN_SUITE);
    format!("{}.{}", checkpoint, suite)
}

/// Base run id for a checkpoint run
///
/// Named runs map to a UUIDv5 of the run name, so re-emitting the same run
/// yields the same id. Unnamed runs get a random UUIDv4.
pub fn run_id(run: &CheckpointRun) -> Uuid {
    match non_empty(run.run_id.name.as_deref()) {
        Some(name) => Uuid::new_v5(&RUN_NAMESPACE, name.as_bytes()),
        None => Uuid::new_v4(),
    }
}

/// Per-validation run id, unique for each key under the same base id
pub fn validation_run_id(base: &Uuid, key: &ValidationKey) -> Uuid {
    let seed = format!("{}:{}", base, key);
    Uuid::new_v5(&RUN_NAMESPACE, seed.as_bytes())
}

/// The run's recorded start time, or now
pub fn run_time(run: &CheckpointRun) -> DateTime<FixedOffset> {
    run.run_id.time.unwrap_or_else(|| Utc::now().fixed_offset())
}

/// Resolve the dataset from the primary slot, filling each missing field from the fallback
///
/// Without a datasource name there is no dataset at all; a datasource without
/// an asset name is reported with the name `unknown`.
pub fn dataset_ref(primary: Option<&BatchMetadata>, fallback: Option<&BatchMetadata>) -> Option<DatasetRef> {
    let datasource = primary
        .and_then(|m| non_empty(m.datasource_name.as_deref()))
        .or_else(|| fallback.and_then(|m| non_empty(m.datasource_name.as_deref())))?;

    let asset = primary
        .and_then(|m| non_empty(m.data_asset_name.as_deref()))
        .or_else(|| fallback.and_then(|m| non_empty(m.data_asset_name.as_deref())))
        .unwrap_or(UNKNOWN);

    Some(DatasetRef {
        namespace: datasource.to_string(),
        name: asset.to_string(),
    })
}

/// Dataset for a validation outcome, `batch_spec` first
pub fn outcome_dataset(outcome: &ValidationOutcome) -> Option<DatasetRef> {
    dataset_ref(outcome.batch_spec.as_ref(), outcome.active_batch_definition.as_ref())
}

pub fn assertions(outcome: &ValidationOutcome) -> Vec<AssertionResult> {
    outcome
        .results
        .iter()
        .map(|record| AssertionResult {
            assertion: non_empty(record.expectation_type.as_deref())
                .unwrap_or(UNKNOWN)
                .to_string(),
            success: record.success.unwrap_or(false),
            column: non_empty(record.column.as_deref()).map(str::to_string),
        })
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}
