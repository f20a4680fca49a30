//! Automation subsystems that write relay targets.
//!
//! Every subsystem works on the selected [`Device`](crate::model::Device)
//! and routes relay writes through the [`arbiter`], so a relay in manual
//! mode is never touched by automation.

pub mod actions;
pub mod arbiter;
pub mod flags;
pub mod pid;
pub mod temperature;
pub mod timers;

pub use actions::ActionEngine;
pub use flags::{FeatureFlags, FlagSource};
pub use pid::{Direction, PidController};
pub use temperature::TemperatureController;
pub use timers::TimerSequencer;

use log::debug;

use crate::app::ports::{LogSink, Severity};
use crate::error::{Error, Result};
use crate::report;

/// Surface the outcome of an arbiter call.
///
/// A manual override is the expected way for the user to win over
/// automation and is only traced; anything else reaches the log sink.
pub(crate) fn settle(sink: &mut dyn LogSink, context: &str, result: Result<()>) {
    match result {
        Ok(()) => {}
        Err(Error::Conflict(conflict)) => debug!("{}: {}", context, conflict),
        Err(e) => report!(sink, Severity::Warning, "{}: {}", context, e),
    }
}
