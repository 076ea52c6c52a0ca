//! Event construction for checkpoint runs

use chrono::Utc;

use super::event::{EventType, InputDataset, Job, LineageEvent};
use crate::checkpoint::CheckpointRun;
use crate::extract;

/// Builds the OpenLineage events describing one checkpoint run
///
/// Every validation yields a START event followed by its terminal event
/// (COMPLETE or FAIL), in the run's validation order. Both events of a
/// validation share a run id derived from the checkpoint run and the
/// validation key.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    job_namespace: String,
}

impl EventBuilder {
    pub fn new(job_namespace: impl Into<String>) -> Self {
        Self {
            job_namespace: job_namespace.into(),
        }
    }

    pub fn build(&self, run: &CheckpointRun) -> Vec<LineageEvent> {
        let base_run_id = extract::run_id(run);
        // All validations of a checkpoint run share one start time
        let run_time = extract::run_time(run);

        let mut events = Vec::with_capacity(run.validations.len() * 2);

        for (key, outcome) in &run.validations {
            let job = Job {
                namespace: self.job_namespace.clone(),
                name: extract::job_name(run, key),
            };
            let run_id = extract::validation_run_id(&base_run_id, key);

            events.push(LineageEvent::new(EventType::Start, run_time, run_id, job.clone()));

            let terminal = if outcome.success {
                EventType::Complete
            } else {
                EventType::Fail
            };

            if let Some(stats) = &outcome.statistics {
                log::debug!(
                    "{}: {}/{} expectations successful ({} unsuccessful)",
                    job.name,
                    stats.successful_expectations,
                    stats.evaluated_expectations,
                    stats.unsuccessful_expectations
                );
            }

            let inputs = extract::outcome_dataset(outcome)
                .map(|dataset| vec![InputDataset::with_quality_facets(dataset, extract::assertions(outcome))]);
            if inputs.is_none() {
                log::debug!("{}: no dataset metadata, emitting {} without inputs", job.name, terminal);
            }

            events.push(LineageEvent::new(terminal, Utc::now().fixed_offset(), run_id, job).with_inputs(inputs));
        }

        log::debug!(
            "Built {} events for {} validations (base run id {})",
            events.len(),
            run.validations.len(),
            base_run_id
        );

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::{
        BatchMetadata, CheckpointRun, ExpectationRecord, RunIdentity, ValidationKey, ValidationOutcome,
    };
    use chrono::{DateTime, FixedOffset, TimeZone};
    use indexmap::IndexMap;
    use std::collections::HashSet;

    const NAMESPACE: &str = "great_expectations://default";

    fn run_time() -> DateTime<FixedOffset> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap().fixed_offset()
    }

    fn key(suite: &str) -> ValidationKey {
        ValidationKey {
            suite_name: Some(suite.to_string()),
            run_name: Some("test-run-123".to_string()),
            batch_identifier: Some(format!("{}-batch", suite)),
        }
    }

    fn outcome(success: bool, dataset: Option<(&str, &str)>) -> ValidationOutcome {
        ValidationOutcome {
            success,
            batch_spec: dataset.map(|(ds, asset)| BatchMetadata {
                datasource_name: Some(ds.to_string()),
                data_asset_name: Some(asset.to_string()),
            }),
            results: vec![ExpectationRecord {
                expectation_type: Some("expect_column_values_to_not_be_null".to_string()),
                success: Some(success),
                column: Some("id".to_string()),
            }],
            ..Default::default()
        }
    }

    fn checkpoint(run_name: Option<&str>, validations: Vec<(ValidationKey, ValidationOutcome)>) -> CheckpointRun {
        CheckpointRun {
            success: validations.iter().all(|(_, o)| o.success),
            checkpoint_name: Some("daily_validation".to_string()),
            run_id: RunIdentity {
                name: run_name.map(str::to_string),
                time: Some(run_time()),
            },
            validations: validations.into_iter().collect::<IndexMap<_, _>>(),
        }
    }

    #[test]
    fn test_single_success_yields_start_and_complete() {
        let run = checkpoint(Some("r"), vec![(key("users"), outcome(true, Some(("pg", "users"))))]);
        let events = EventBuilder::new(NAMESPACE).build(&run);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::Start);
        assert_eq!(events[1].event_type, EventType::Complete);
        assert_eq!(events[0].run.run_id, events[1].run.run_id);
        assert_eq!(events[0].job.name, "daily_validation.users");
        assert_eq!(events[1].job.namespace, NAMESPACE);
    }

    #[test]
    fn test_single_failure_yields_start_and_fail() {
        let run = checkpoint(Some("r"), vec![(key("users"), outcome(false, Some(("pg", "users"))))]);
        let events = EventBuilder::new(NAMESPACE).build(&run);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::Start);
        assert_eq!(events[1].event_type, EventType::Fail);
    }

    #[test]
    fn test_events_interleave_per_validation() {
        let validations = (0..4)
            .map(|i| (key(&format!("suite_{}", i)), outcome(i % 2 == 0, None)))
            .collect();
        let run = checkpoint(Some("r"), validations);
        let events = EventBuilder::new(NAMESPACE).build(&run);

        assert_eq!(events.len(), 8);
        for (i, pair) in events.chunks(2).enumerate() {
            assert_eq!(pair[0].event_type, EventType::Start);
            let expected = if i % 2 == 0 { EventType::Complete } else { EventType::Fail };
            assert_eq!(pair[1].event_type, expected);
            assert_eq!(pair[0].run.run_id, pair[1].run.run_id);
            assert_eq!(pair[0].job.name, format!("daily_validation.suite_{}", i));
        }

        let run_ids: HashSet<_> = events.iter().map(|e| e.run.run_id).collect();
        assert_eq!(run_ids.len(), 4);
    }

    #[test]
    fn test_start_events_use_run_time() {
        let run = checkpoint(
            Some("r"),
            vec![(key("a"), outcome(true, None)), (key("b"), outcome(true, None))],
        );
        let events = EventBuilder::new(NAMESPACE).build(&run);

        assert_eq!(events[0].event_time, run_time());
        assert_eq!(events[2].event_time, run_time());
        assert!(events[1].event_time > run_time());
    }

    #[test]
    fn test_run_ids_are_deterministic_for_named_runs() {
        let run = checkpoint(Some("nightly"), vec![(key("a"), outcome(true, None))]);
        let builder = EventBuilder::new(NAMESPACE);

        let first = builder.build(&run);
        let second = builder.build(&run);
        assert_eq!(first[0].run.run_id, second[0].run.run_id);
    }

    #[test]
    fn test_run_ids_differ_between_unnamed_runs() {
        let run = checkpoint(None, vec![(key("a"), outcome(true, None))]);
        let builder = EventBuilder::new(NAMESPACE);

        let first = builder.build(&run);
        let second = builder.build(&run);
        assert_ne!(first[0].run.run_id, second[0].run.run_id);
    }

    #[test]
    fn test_empty_run_yields_no_events() {
        let run = checkpoint(Some("r"), vec![]);
        assert!(EventBuilder::new(NAMESPACE).build(&run).is_empty());
    }

    #[test]
    fn test_only_terminal_event_carries_inputs() {
        let run = checkpoint(Some("r"), vec![(key("users"), outcome(true, Some(("pg", "public.users"))))]);
        let events = EventBuilder::new(NAMESPACE).build(&run);

        assert!(events[0].inputs.is_none());
        let inputs = events[1].inputs.as_ref().expect("inputs");
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].namespace, "pg");
        assert_eq!(inputs[0].name, "public.users");
        assert_eq!(inputs[0].input_facets.data_quality_assertions.assertions.len(), 1);
    }

    #[test]
    fn test_mixed_run_end_to_end() {
        let run = checkpoint(
            Some("r"),
            vec![
                (key("a"), outcome(true, Some(("ds1", "table1")))),
                (key("b"), outcome(false, None)),
            ],
        );
        let events = EventBuilder::new(NAMESPACE).build(&run);
        let wire = serde_json::to_value(&events).expect("serialize");
        let wire = wire.as_array().expect("array");

        let types: Vec<_> = wire.iter().map(|e| e["eventType"].as_str().unwrap()).collect();
        assert_eq!(types, vec!["START", "COMPLETE", "START", "FAIL"]);

        let inputs = wire[1]["inputs"].as_array().expect("inputs on COMPLETE(A)");
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0]["namespace"], "ds1");
        assert_eq!(inputs[0]["name"], "table1");

        assert!(wire[3].as_object().unwrap().get("inputs").is_none());
        assert_ne!(wire[0]["run"]["runId"], wire[2]["run"]["runId"]);
    }
}
