//! Delivery of lineage events to Correlator
//!
//! Events leave the process through an [`EventSink`]. The production sink is
//! [`HttpEmitter`], which POSTs the whole batch as one JSON array and maps the
//! receiver's response onto [`EmitReport`] or [`EmitError`].

pub mod emitter;

pub use emitter::{EmitError, EmitReport, HttpEmitter};

use crate::lineage::LineageEvent;

/// Destination for a batch of lineage events
pub trait EventSink: Send + Sync {
    fn send(&self, events: &[LineageEvent]) -> Result<EmitReport, EmitError>;
}

impl EventSink for HttpEmitter {
    fn send(&self, events: &[LineageEvent]) -> Result<EmitReport, EmitError> {
        self.emit(events)
    }
}
