//! OpenLineage run event wire types

use chrono::{DateTime, FixedOffset, SecondsFormat};
use colored::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::extract::{AssertionResult, DatasetRef};

/// Identifies this integration as the producer of every event and facet
pub const PRODUCER: &str = concat!(
    "https://github.com/correlator-io/correlator-ge/",
    env!("CARGO_PKG_VERSION")
);

pub const RUN_EVENT_SCHEMA_URL: &str = "https://openlineage.io/spec/2-0-2/OpenLineage.json#/definitions/RunEvent";

pub const METRICS_FACET_SCHEMA_URL: &str =
    "https://openlineage.io/spec/facets/1-0-0/DataQualityMetricsInputDatasetFacet.json";

pub const ASSERTIONS_FACET_SCHEMA_URL: &str =
    "https://openlineage.io/spec/facets/1-0-0/DataQualityAssertionsDatasetFacet.json";

/// Run state transition carried by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Start,
    Complete,
    Fail,
    #[allow(dead_code)] // never produced for validations
    Abort,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Start => "START",
            EventType::Complete => "COMPLETE",
            EventType::Fail => "FAIL",
            EventType::Abort => "ABORT",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single OpenLineage run event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageEvent {
    pub event_type: EventType,
    pub event_time: DateTime<FixedOffset>,
    pub run: Run,
    pub job: Job,
    pub producer: &'static str,
    #[serde(rename = "schemaURL")]
    pub schema_url: &'static str,
    /// Absent when the validation carried no dataset metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<InputDataset>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub run_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDataset {
    pub namespace: String,
    pub name: String,
    pub input_facets: InputFacets,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputFacets {
    pub data_quality_metrics: DataQualityMetricsFacet,
    pub data_quality_assertions: DataQualityAssertionsFacet,
}

/// Column-level metrics facet
///
/// Validation results carry expectation counts, not row counts, so `rowCount`
/// is never set and `columnMetrics` stays empty.
#[derive(Debug, Clone, Serialize)]
pub struct DataQualityMetricsFacet {
    #[serde(rename = "_producer")]
    pub producer: &'static str,
    #[serde(rename = "_schemaURL")]
    pub schema_url: &'static str,
    #[serde(rename = "columnMetrics")]
    pub column_metrics: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataQualityAssertionsFacet {
    #[serde(rename = "_producer")]
    pub producer: &'static str,
    #[serde(rename = "_schemaURL")]
    pub schema_url: &'static str,
    pub assertions: Vec<AssertionResult>,
}

impl LineageEvent {
    pub fn new(event_type: EventType, event_time: DateTime<FixedOffset>, run_id: Uuid, job: Job) -> Self {
        Self {
            event_type,
            event_time,
            run: Run { run_id },
            job,
            producer: PRODUCER,
            schema_url: RUN_EVENT_SCHEMA_URL,
            inputs: None,
        }
    }

    pub fn with_inputs(mut self, inputs: Option<Vec<InputDataset>>) -> Self {
        self.inputs = inputs;
        self
    }

    /// One-line summary for terminal output
    pub fn format_display(&self) -> String {
        let event_colored = match self.event_type {
            EventType::Start => self.event_type.as_str().cyan(),
            EventType::Complete => self.event_type.as_str().green(),
            EventType::Fail => self.event_type.as_str().red(),
            EventType::Abort => self.event_type.as_str().yellow(),
        };

        let mut parts = vec![
            self.event_time
                .to_rfc3339_opts(SecondsFormat::Secs, true)
                .dimmed()
                .to_string(),
            event_colored.to_string(),
            self.job.name.bold().to_string(),
            format!("[{}]", &self.run.run_id.to_string()[..8]).dimmed().to_string(),
        ];

        for input in self.inputs.iter().flatten() {
            let assertions = &input.input_facets.data_quality_assertions.assertions;
            let passed = assertions.iter().filter(|a| a.success).count();
            parts.push(format!(
                "{}/{} ({}/{} assertions passed)",
                input.namespace,
                input.name,
                passed,
                assertions.len()
            ));
        }

        parts.join(" ")
    }
}

impl InputDataset {
    /// Wrap a dataset with the data quality facets for its assertions
    pub fn with_quality_facets(dataset: DatasetRef, assertions: Vec<AssertionResult>) -> Self {
        Self {
            namespace: dataset.namespace,
            name: dataset.name,
            input_facets: InputFacets {
                data_quality_metrics: DataQualityMetricsFacet {
                    producer: PRODUCER,
                    schema_url: METRICS_FACET_SCHEMA_URL,
                    column_metrics: BTreeMap::new(),
                },
                data_quality_assertions: DataQualityAssertionsFacet {
                    producer: PRODUCER,
                    schema_url: ASSERTIONS_FACET_SCHEMA_URL,
                    assertions,
                },
            },
        }
    }
}
