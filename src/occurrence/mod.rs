//! Occurrence tracking for repeated detections.
//!
//! - `monitor`: the debouncer that reports repeats of the current label
//! - `timer`: dedicated expiry thread backing the monitor's window

mod monitor;
mod timer;

pub use monitor::{OccurrenceError, OccurrenceMonitor, OccurrenceStatus};
pub use timer::TimerError;
