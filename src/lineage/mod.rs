//! OpenLineage events for checkpoint runs
//!
//! - `event` - wire types and facet constants
//! - `builder` - turns a checkpoint run into an ordered event sequence

pub mod builder;
pub mod event;

pub use builder::EventBuilder;
pub use event::LineageEvent;
