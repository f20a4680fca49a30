//! Console log sink.
//!
//! Implements [`LogSink`] by writing user-visible records to the ESP-IDF
//! logger (UART / USB-CDC in production) and keeping the most recent lines
//! for a status page.  A chat bot or web console adapter implements the same
//! trait.

use heapless::Deque;
use log::{error, info, warn};

use crate::app::events::LogLine;
use crate::app::ports::{LogSink, Severity};

/// Lines kept for [`ConsoleLogSink::recent`].
pub const HISTORY: usize = 32;

#[derive(Debug, Default)]
pub struct ConsoleLogSink {
    history: Deque<(Severity, LogLine), HISTORY>,
}

impl ConsoleLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest first.
    pub fn recent(&self) -> impl Iterator<Item = (Severity, &str)> {
        self.history.iter().map(|(s, line)| (*s, line.as_str()))
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

impl LogSink for ConsoleLogSink {
    fn record(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => info!("LOG | {}", message),
            Severity::Warning => warn!("LOG | {}", message),
            Severity::Error => error!("LOG | {}", message),
            Severity::Notify => info!("NOTIFY | {}", message),
        }
        if self.history.is_full() {
            self.history.pop_front();
        }
        let _ = self
            .history
            .push_back((severity, LogLine::format(format_args!("{}", message))));
    }
}
