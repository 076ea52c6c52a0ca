//! Checkpoint action: gate, build, emit
//!
//! [`CorrelatorAction::run`] is what the validation framework calls after a
//! checkpoint completes. Emission is a side channel, so nothing that goes wrong
//! here is allowed to fail the checkpoint: every failure is logged and folded
//! into [`ActionOutcome::Failed`], and the returned result always reports
//! `success: true`.

use colored::*;
use serde::Serialize;
use serde_json::Value;

use crate::checkpoint::{self, AdaptError, CheckpointRun};
use crate::config::{ConfigError, CorrelatorConfig, EmitOn};
use crate::lineage::{EventBuilder, LineageEvent};
use crate::observability::{EmitReport, EventSink, HttpEmitter};

/// Name reported in every action result
pub const ACTION_CLASS: &str = "CorrelatorValidationAction";

/// What the action did with a checkpoint run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ActionOutcome {
    Emitted { event_count: usize },
    Skipped { message: String },
    Failed { error: String },
}

/// Result handed back to the framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub class: &'static str,
    /// The action ran to completion; always true
    pub success: bool,
    #[serde(flatten)]
    pub outcome: ActionOutcome,
}

impl ActionResult {
    pub fn new(outcome: ActionOutcome) -> Self {
        Self {
            class: ACTION_CLASS,
            success: true,
            outcome,
        }
    }

    /// Record a failure that happened before the action could run
    pub fn failed(error: impl std::fmt::Display) -> Self {
        let error = error.to_string();
        log::warn!("Failed to emit events to Correlator: {}", error);
        Self::new(ActionOutcome::Failed { error })
    }

    pub fn format_display(&self) -> String {
        match &self.outcome {
            ActionOutcome::Emitted { event_count } => {
                format!("{} Emitted {} events to Correlator", "✓".green(), event_count)
            }
            ActionOutcome::Skipped { message } => format!("{} {}", "⊘".yellow(), message),
            ActionOutcome::Failed { error } => {
                format!("{} Emission failed (checkpoint unaffected): {}", "⚠".yellow(), error)
            }
        }
    }
}

/// Failures between gating and a completed delivery
#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error("failed to build events: {0}")]
    Build(#[from] AdaptError),

    #[error(transparent)]
    Emit(#[from] crate::observability::EmitError),
}

/// Emits OpenLineage events for completed checkpoint runs
pub struct CorrelatorAction {
    emit_on: EmitOn,
    builder: EventBuilder,
    sink: Box<dyn EventSink>,
}

impl CorrelatorAction {
    /// Action delivering to the configured Correlator endpoint over HTTP
    pub fn from_config(config: &CorrelatorConfig) -> Result<Self, ConfigError> {
        let endpoint = config.endpoint()?;
        let sink = HttpEmitter::new(endpoint, config.api_key.clone(), config.timeout()?);
        Ok(Self::with_sink(config, Box::new(sink)))
    }

    pub fn with_sink(config: &CorrelatorConfig, sink: Box<dyn EventSink>) -> Self {
        Self {
            emit_on: config.emit_on,
            builder: EventBuilder::new(config.job_namespace.clone()),
            sink,
        }
    }

    pub fn should_emit(&self, checkpoint_success: bool) -> bool {
        self.emit_on.allows(checkpoint_success)
    }

    /// Handle a completed checkpoint result document; never fails
    ///
    /// The gate reads only the top-level success flag, so a document that
    /// cannot be adapted is still skipped when the policy rules it out.
    pub fn run(&self, document: &Value) -> ActionResult {
        if let Some(skipped) = self.gate(checkpoint::overall_success(document)) {
            return skipped;
        }

        match CheckpointRun::from_document(document) {
            Ok(run) => self.run_checkpoint(&run),
            Err(e) => Self::finish(Err(RunError::from(e))),
        }
    }

    /// Handle an already adapted checkpoint run; never fails
    pub fn run_checkpoint(&self, run: &CheckpointRun) -> ActionResult {
        if let Some(skipped) = self.gate(run.success) {
            return skipped;
        }

        Self::finish(self.emit(&self.builder.build(run)))
    }

    fn gate(&self, checkpoint_success: bool) -> Option<ActionResult> {
        if self.should_emit(checkpoint_success) {
            return None;
        }

        let message = format!(
            "Emission skipped: emit_on={} and checkpoint {}",
            self.emit_on.as_str(),
            if checkpoint_success { "succeeded" } else { "failed" }
        );
        log::info!("{}", message);
        Some(ActionResult::new(ActionOutcome::Skipped { message }))
    }

    fn emit(&self, events: &[LineageEvent]) -> Result<usize, RunError> {
        match self.sink.send(events)? {
            EmitReport::Accepted { .. } => {}
            EmitReport::Partial { failed_events, .. } => {
                log::warn!(
                    "Correlator accepted the batch with {} rejected events",
                    failed_events.len()
                );
            }
        }

        Ok(events.len())
    }

    fn finish(emitted: Result<usize, RunError>) -> ActionResult {
        match emitted {
            Ok(event_count) => ActionResult::new(ActionOutcome::Emitted { event_count }),
            Err(RunError::Emit(e)) if !e.reached_receiver() => {
                ActionResult::failed(format!("Correlator unreachable: {}", e))
            }
            Err(e) => ActionResult::failed(e),
        }
    }
}
