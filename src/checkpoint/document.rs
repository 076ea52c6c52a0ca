//! Adapter from a serialized `CheckpointResult` document to [`CheckpointRun`]
//!
//! Reads are permissive: a missing or mistyped leaf field becomes `None` and is
//! defaulted later during extraction. Only a document whose structure cannot
//! describe a checkpoint run at all is rejected.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use super::{
    BatchMetadata, CheckpointRun, ExpectationRecord, RunIdentity, ValidationKey, ValidationOutcome,
    ValidationStatistics,
};

/// Errors raised when a document cannot be read as a checkpoint result
#[derive(Debug, Error)]
pub enum AdaptError {
    #[error("checkpoint result must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("invalid checkpoint result: `{field}` must be {expected}, got {found}")]
    InvalidShape {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Read the checkpoint's overall success flag without adapting the document
///
/// A missing or non-boolean flag counts as a failed checkpoint.
pub fn overall_success(document: &Value) -> bool {
    document.get("success").and_then(Value::as_bool).unwrap_or(false)
}

impl CheckpointRun {
    /// Build the view from a checkpoint result document
    pub fn from_document(document: &Value) -> Result<Self, AdaptError> {
        let root = document
            .as_object()
            .ok_or_else(|| AdaptError::NotAnObject(kind(document)))?;

        let run_id = root.get("run_id").map(run_identity).unwrap_or_default();

        let checkpoint_name = root
            .get("checkpoint_config")
            .and_then(|config| non_empty_str(config, "name"));

        let mut validations = IndexMap::new();
        match root.get("run_results") {
            None => {}
            Some(Value::Object(entries)) => {
                for (raw_key, entry) in entries {
                    let (mut key, outcome) = validation_entry(raw_key, entry)?;
                    // Entry keys are unique, so a clash comes from identical ids
                    if validations.contains_key(&key) {
                        let batch = key.batch_identifier.take().unwrap_or_default();
                        key.batch_identifier = Some(format!("{}@{}", batch, raw_key));
                        log::warn!("Validation id of {} repeats an earlier entry, keyed as {}", raw_key, key);
                    }
                    validations.insert(key, outcome);
                }
            }
            Some(other) => {
                return Err(AdaptError::InvalidShape {
                    field: "run_results".to_string(),
                    expected: "an object",
                    found: kind(other),
                });
            }
        }

        Ok(Self {
            success: overall_success(document),
            checkpoint_name,
            run_id,
            validations,
        })
    }
}

fn validation_entry(raw_key: &str, entry: &Value) -> Result<(ValidationKey, ValidationOutcome), AdaptError> {
    let fields = entry.as_object().ok_or_else(|| AdaptError::InvalidShape {
        field: format!("run_results.{}", raw_key),
        expected: "an object",
        found: kind(entry),
    })?;

    // Older captures store the validation result directly under the key
    let result = fields.get("validation_result").unwrap_or(entry);
    if !result.is_object() {
        return Err(AdaptError::InvalidShape {
            field: format!("run_results.{}.validation_result", raw_key),
            expected: "an object",
            found: kind(result),
        });
    }

    let key = match fields.get("validation_id") {
        Some(id) if id.is_object() => validation_key(raw_key, id),
        _ => ValidationKey {
            suite_name: non_empty_str(result, "suite_name").or_else(|| {
                result
                    .get("meta")
                    .and_then(|meta| non_empty_str(meta, "expectation_suite_name"))
            }),
            run_name: None,
            batch_identifier: Some(raw_key.to_string()),
        },
    };

    Ok((key, validation_outcome(result)))
}

/// Key from a `validation_id`; the entry key stands in for a missing batch identifier
fn validation_key(raw_key: &str, id: &Value) -> ValidationKey {
    let suite_name = id.get("expectation_suite_identifier").and_then(|suite| {
        non_empty_str(suite, "name").or_else(|| non_empty_str(suite, "expectation_suite_name"))
    });

    ValidationKey {
        suite_name,
        run_name: id.get("run_id").and_then(|run| string_like(run.get("run_name"))),
        batch_identifier: string_like(id.get("batch_identifier")).or_else(|| Some(raw_key.to_string())),
    }
}

fn validation_outcome(result: &Value) -> ValidationOutcome {
    let meta = result.get("meta");

    ValidationOutcome {
        success: result.get("success").and_then(Value::as_bool).unwrap_or(false),
        batch_spec: meta.and_then(|m| m.get("batch_spec")).and_then(batch_metadata),
        active_batch_definition: meta
            .and_then(|m| m.get("active_batch_definition"))
            .and_then(batch_metadata),
        results: result
            .get("results")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(expectation_record).collect())
            .unwrap_or_default(),
        statistics: result.get("statistics").and_then(statistics),
    }
}

fn batch_metadata(value: &Value) -> Option<BatchMetadata> {
    if !value.is_object() {
        return None;
    }

    Some(BatchMetadata {
        datasource_name: non_empty_str(value, "datasource_name"),
        data_asset_name: non_empty_str(value, "data_asset_name"),
    })
}

fn expectation_record(item: &Value) -> ExpectationRecord {
    let config = item.get("expectation_config");

    let expectation_type = config.and_then(|c| {
        non_empty_str(c, "expectation_type").or_else(|| non_empty_str(c, "type"))
    });

    let column = config
        .and_then(|c| c.get("kwargs"))
        .and_then(|kwargs| non_empty_str(kwargs, "column"));

    ExpectationRecord {
        expectation_type,
        success: item.get("success").and_then(Value::as_bool),
        column,
    }
}

fn statistics(value: &Value) -> Option<ValidationStatistics> {
    if !value.is_object() {
        return None;
    }

    let count = |field: &str| value.get(field).and_then(Value::as_u64).unwrap_or(0);

    Some(ValidationStatistics {
        evaluated_expectations: count("evaluated_expectations"),
        successful_expectations: count("successful_expectations"),
        unsuccessful_expectations: count("unsuccessful_expectations"),
        success_percent: value.get("success_percent").and_then(Value::as_f64),
    })
}

fn run_identity(value: &Value) -> RunIdentity {
    RunIdentity {
        name: string_like(value.get("run_name")),
        time: value.get("run_time").and_then(Value::as_str).and_then(parse_timestamp),
    }
}

/// Parse an RFC 3339 timestamp keeping its offset, or a naive ISO-8601 one taken as UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed);
    }

    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => Some(naive.and_utc().fixed_offset()),
        Err(e) => {
            log::debug!("Ignoring unparseable run_time {:?}: {}", raw, e);
            None
        }
    }
}

fn non_empty_str(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Strings pass through; numbers and booleans are rendered, everything else is absent
fn string_like(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineage::{EventBuilder, event::EventType};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::collections::HashSet;

    fn success_document() -> Value {
        json!({
            "success": true,
            "run_id": {"run_name": "test-run-123", "run_time": "2024-01-15T10:30:00+00:00"},
            "checkpoint_config": {"name": "daily_validation"},
            "run_results": {
                "users_suite::test-run-123::batch-1": {
                    "validation_id": {
                        "expectation_suite_identifier": {"name": "users_suite"},
                        "run_id": {"run_name": "test-run-123"},
                        "batch_identifier": "batch-1"
                    },
                    "validation_result": {
                        "success": true,
                        "meta": {
                            "batch_spec": {"datasource_name": "postgres_prod", "data_asset_name": "public.users"}
                        },
                        "results": [
                            {
                                "success": true,
                                "expectation_config": {
                                    "expectation_type": "expect_column_values_to_not_be_null",
                                    "kwargs": {"column": "user_id"}
                                }
                            },
                            {
                                "success": true,
                                "expectation_config": {
                                    "type": "expect_table_row_count_to_be_between",
                                    "kwargs": {"min_value": 1}
                                }
                            }
                        ],
                        "statistics": {
                            "evaluated_expectations": 2,
                            "successful_expectations": 2,
                            "unsuccessful_expectations": 0,
                            "success_percent": 100.0
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_adapts_success_document() {
        let run = CheckpointRun::from_document(&success_document()).expect("adapt");

        assert!(run.success);
        assert_eq!(run.checkpoint_name.as_deref(), Some("daily_validation"));
        assert_eq!(run.run_id.name.as_deref(), Some("test-run-123"));
        assert_eq!(
            run.run_id.time.map(|t| t.with_timezone(&Utc)),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap())
        );
        assert_eq!(run.validations.len(), 1);

        let (key, outcome) = run.validations.first().expect("one validation");
        assert_eq!(key.suite_name.as_deref(), Some("users_suite"));
        assert_eq!(key.batch_identifier.as_deref(), Some("batch-1"));
        assert!(outcome.success);
        assert_eq!(
            outcome.batch_spec.as_ref().and_then(|b| b.datasource_name.as_deref()),
            Some("postgres_prod")
        );
        assert!(outcome.active_batch_definition.is_none());
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].column.as_deref(), Some("user_id"));
        assert_eq!(
            outcome.results[1].expectation_type.as_deref(),
            Some("expect_table_row_count_to_be_between")
        );
        assert!(outcome.results[1].column.is_none());
        assert_eq!(outcome.statistics.as_ref().map(|s| s.evaluated_expectations), Some(2));
    }

    #[test]
    fn test_preserves_validation_order() {
        let document = json!({
            "success": false,
            "run_results": {
                "zeta": {"validation_result": {"success": true}},
                "alpha": {"validation_result": {"success": false}},
                "mid": {"validation_result": {"success": true}}
            }
        });

        let run = CheckpointRun::from_document(&document).expect("adapt");
        let batches: Vec<_> = run
            .validations
            .keys()
            .map(|k| k.batch_identifier.clone().unwrap_or_default())
            .collect();
        assert_eq!(batches, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_entry_without_validation_id_uses_suite_name_and_raw_key() {
        let document = json!({
            "run_results": {
                "raw-key": {"success": true, "suite_name": "orders_suite"}
            }
        });

        let run = CheckpointRun::from_document(&document).expect("adapt");
        let (key, outcome) = run.validations.first().expect("one validation");
        assert_eq!(key.suite_name.as_deref(), Some("orders_suite"));
        assert_eq!(key.batch_identifier.as_deref(), Some("raw-key"));
        assert!(outcome.success);
    }

    #[test]
    fn test_entries_sharing_a_suite_without_batch_id_stay_separate() {
        let id = json!({"expectation_suite_identifier": {"name": "orders"}, "run_id": {"run_name": "nightly"}});
        let document = json!({
            "success": false,
            "run_id": {"run_name": "nightly"},
            "run_results": {
                "orders::nightly::batch-a": {"validation_id": id, "validation_result": {"success": true}},
                "orders::nightly::batch-b": {"validation_id": id, "validation_result": {"success": false}}
            }
        });

        let run = CheckpointRun::from_document(&document).expect("adapt");
        let batches: Vec<_> = run.validations.keys().map(|k| k.batch_identifier.clone()).collect();
        assert_eq!(
            batches,
            vec![
                Some("orders::nightly::batch-a".to_string()),
                Some("orders::nightly::batch-b".to_string())
            ]
        );

        let events = EventBuilder::new("great_expectations://default").build(&run);
        let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![EventType::Start, EventType::Complete, EventType::Start, EventType::Fail]
        );
        let run_ids: HashSet<_> = events.iter().map(|e| e.run.run_id).collect();
        assert_eq!(run_ids.len(), 2);
    }

    #[test]
    fn test_repeated_validation_id_keeps_both_entries() {
        let id = json!({"expectation_suite_identifier": {"name": "orders_suite"}, "batch_identifier": "b1"});
        let document = json!({
            "run_results": {
                "first": {"validation_id": id, "validation_result": {"success": false}},
                "other": {"validation_id": {"batch_identifier": "b2"}, "validation_result": {"success": true}},
                "second": {"validation_id": id, "validation_result": {"success": true}}
            }
        });

        let run = CheckpointRun::from_document(&document).expect("adapt");
        assert_eq!(run.validations.len(), 3);

        let batches: Vec<_> = run
            .validations
            .keys()
            .map(|k| k.batch_identifier.clone().unwrap_or_default())
            .collect();
        assert_eq!(batches, vec!["b1", "b2", "b1@second"]);
        assert!(!run.validations[0].success);
        assert!(run.validations[2].success);

        let events = EventBuilder::new("great_expectations://default").build(&run);
        assert_eq!(events.len(), 6);
        let run_ids: HashSet<_> = events.iter().map(|e| e.run.run_id).collect();
        assert_eq!(run_ids.len(), 3);
    }

    #[test]
    fn test_run_time_keeps_its_offset() {
        let run = CheckpointRun::from_document(&json!({"run_id": {"run_time": "2024-01-15T12:30:00+02:00"}}))
            .expect("adapt");
        let time = run.run_id.time.expect("run time");
        assert_eq!(time.offset().local_minus_utc(), 2 * 3600);
        assert_eq!(time.to_rfc3339(), "2024-01-15T12:30:00+02:00");
    }

    #[test]
    fn test_missing_run_results_is_empty_run() {
        let run = CheckpointRun::from_document(&json!({"success": true})).expect("adapt");
        assert!(run.validations.is_empty());
        assert!(run.checkpoint_name.is_none());
        assert_eq!(run.run_id, RunIdentity::default());
    }

    #[test]
    fn test_null_run_results_is_rejected() {
        let err = CheckpointRun::from_document(&json!({"success": true, "run_results": null})).unwrap_err();
        assert!(matches!(err, AdaptError::InvalidShape { ref field, .. } if field == "run_results"));
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        let err = CheckpointRun::from_document(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, AdaptError::NotAnObject("an array")));
    }

    #[test]
    fn test_non_object_entry_is_rejected() {
        let err = CheckpointRun::from_document(&json!({"run_results": {"k": 3}})).unwrap_err();
        assert!(err.to_string().contains("run_results.k"));
    }

    #[test]
    fn test_empty_and_non_string_leaves_are_absent() {
        let document = json!({
            "run_id": {"run_name": "", "run_time": "not a time"},
            "checkpoint_config": {"name": ""},
            "run_results": {
                "k": {
                    "validation_result": {
                        "meta": {"batch_spec": {"datasource_name": "", "data_asset_name": 7}},
                        "results": [{"expectation_config": {"kwargs": {"column": ""}}}]
                    }
                }
            }
        });

        let run = CheckpointRun::from_document(&document).expect("adapt");
        assert!(run.run_id.name.is_none());
        assert!(run.run_id.time.is_none());
        assert!(run.checkpoint_name.is_none());

        let outcome = &run.validations[0];
        assert!(!outcome.success);
        assert_eq!(outcome.batch_spec, Some(BatchMetadata::default()));
        assert_eq!(outcome.results[0], ExpectationRecord::default());
    }

    #[test]
    fn test_numeric_run_name_is_stringified() {
        let run = CheckpointRun::from_document(&json!({"run_id": {"run_name": 20240115}})).expect("adapt");
        assert_eq!(run.run_id.name.as_deref(), Some("20240115"));
    }

    #[test]
    fn test_naive_run_time_is_taken_as_utc() {
        let parsed = parse_timestamp("2024-01-15T10:30:00.250").expect("parse");
        assert_eq!(parsed.timestamp_millis(), 1_705_314_600_250);
    }

    #[test]
    fn test_overall_success_defaults_to_false() {
        assert!(overall_success(&json!({"success": true})));
        assert!(!overall_success(&json!({"success": "yes"})));
        assert!(!overall_success(&json!({})));
        assert!(!overall_success(&json!(null)));
    }
}
