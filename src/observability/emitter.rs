//! HTTP emitter for Correlator's lineage endpoint
//!
//! Response contract:
//! - 200 / 204: accepted (a 200 body may carry a `summary`)
//! - 207: partial success, per-event failures in `failed_events`
//! - 429: rate limited
//! - other 4xx: rejected
//! - 5xx and anything unexpected: receiver error

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use ureq::Agent;

use crate::lineage::LineageEvent;

/// Response bodies quoted in errors are cut to this many characters
pub const MAX_ERROR_BODY_CHARS: usize = 500;

/// Why a batch of events did not reach Correlator intact
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("timeout emitting events to {endpoint}")]
    Timeout { endpoint: String },

    #[error("connection error emitting events to {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("rate limited by Correlator")]
    RateLimited,

    #[error("event rejected by Correlator ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Correlator returned {status}: {body}")]
    ReceiverError { status: u16, body: String },

    #[error("failed to serialize events: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl EmitError {
    /// True when the request got an HTTP response, false when it never arrived
    pub fn reached_receiver(&self) -> bool {
        matches!(
            self,
            EmitError::RateLimited | EmitError::Rejected { .. } | EmitError::ReceiverError { .. }
        )
    }
}

/// Counters Correlator reports for a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResponseSummary {
    pub received: Option<u64>,
    pub successful: Option<u64>,
    pub failed: Option<u64>,
}

/// One event Correlator refused in a 207 response
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FailedEvent {
    pub index: Option<u64>,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponseBody {
    summary: Option<ResponseSummary>,
    failed_events: Vec<FailedEvent>,
    correlation_id: Option<String>,
}

/// Successful delivery, possibly with per-event failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitReport {
    Accepted {
        summary: Option<ResponseSummary>,
    },
    Partial {
        summary: Option<ResponseSummary>,
        failed_events: Vec<FailedEvent>,
    },
}

/// Sends event batches to a Correlator endpoint
pub struct HttpEmitter {
    endpoint: String,
    api_key: Option<String>,
    agent: Agent,
}

impl HttpEmitter {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            endpoint: endpoint.into(),
            api_key: api_key.filter(|key| !key.is_empty()),
            agent,
        }
    }

    /// POST all events as one JSON array and classify the response
    pub fn emit(&self, events: &[LineageEvent]) -> Result<EmitReport, EmitError> {
        let body = serde_json::to_string(events)?;

        let mut request = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key.as_str());
        }

        log::debug!("POST {} events to {}", events.len(), self.endpoint);

        let mut response = request
            .send(body.as_bytes())
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        let text = response.body_mut().read_to_string().unwrap_or_else(|e| {
            log::debug!("Could not read response body: {}", e);
            String::new()
        });

        classify_response(status, &text, events.len())
    }

    fn transport_error(&self, err: ureq::Error) -> EmitError {
        let endpoint = self.endpoint.clone();
        match err {
            ureq::Error::Timeout(_) => EmitError::Timeout { endpoint },
            ureq::Error::Io(ref io) if io.kind() == std::io::ErrorKind::TimedOut => EmitError::Timeout { endpoint },
            other => EmitError::Connection {
                endpoint,
                reason: other.to_string(),
            },
        }
    }
}

/// Map a Correlator response onto the delivery contract
pub fn classify_response(status: u16, body: &str, event_count: usize) -> Result<EmitReport, EmitError> {
    match status {
        200 | 204 => {
            log::info!("Successfully emitted {} events", event_count);

            let summary = if status == 200 { parse_body(body).and_then(|b| b.summary) } else { None };
            if let Some(summary) = &summary {
                log::info!(
                    "Response: {} successful, {} failed",
                    summary.successful.unwrap_or(0),
                    summary.failed.unwrap_or(0)
                );
            }

            Ok(EmitReport::Accepted { summary })
        }
        207 => {
            let Some(parsed) = parse_body(body) else {
                log::warn!("Partial success (207) but could not parse response");
                return Ok(EmitReport::Partial {
                    summary: None,
                    failed_events: Vec::new(),
                });
            };

            let successful = parsed.summary.as_ref().and_then(|s| s.successful).unwrap_or(0);
            let received = parsed
                .summary
                .as_ref()
                .and_then(|s| s.received)
                .unwrap_or(event_count as u64);

            log::warn!(
                "Partial success: {}/{} events succeeded ({} failed, correlation id {})",
                successful,
                received,
                parsed.failed_events.len(),
                parsed.correlation_id.as_deref().unwrap_or("none")
            );

            for failed in &parsed.failed_events {
                log::error!(
                    "Event {} failed: {}",
                    failed.index.map(|i| i.to_string()).unwrap_or_else(|| "?".to_string()),
                    failed.reason.as_deref().unwrap_or("Unknown error")
                );
            }

            Ok(EmitReport::Partial {
                summary: parsed.summary,
                failed_events: parsed.failed_events,
            })
        }
        429 => Err(EmitError::RateLimited),
        400..=499 => Err(EmitError::Rejected {
            status,
            body: truncate(body),
        }),
        _ => Err(EmitError::ReceiverError {
            status,
            body: truncate(body),
        }),
    }
}

fn parse_body(body: &str) -> Option<ResponseBody> {
    if body.trim().is_empty() {
        return None;
    }

    serde_json::from_str(body)
        .map_err(|e| log::debug!("Ignoring unparseable response body: {}", e))
        .ok()
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
