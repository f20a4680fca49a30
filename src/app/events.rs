//! Outbound log records.
//!
//! Subsystems report user-visible happenings through the
//! [`LogSink`](super::ports::LogSink) port with the [`report!`](crate::report)
//! macro.  Lines are formatted into a fixed-capacity buffer so reporting
//! never allocates; text past the capacity is dropped.

use core::fmt::{self, Write};

use heapless::String;

use super::ports::{LogSink, Severity};

pub const LOG_LINE_CAP: usize = 160;

/// A formatted, bounded log line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogLine(String<LOG_LINE_CAP>);

impl LogLine {
    pub fn format(args: fmt::Arguments<'_>) -> Self {
        let mut line = Self::default();
        // `write_str` below never fails; overflow is truncated.
        let _ = line.write_fmt(args);
        line
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Write for LogLine {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = LOG_LINE_CAP - self.0.len();
        let mut end = s.len().min(room);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        let _ = self.0.push_str(&s[..end]);
        Ok(())
    }
}

/// Format and hand a line to the sink.  Use [`report!`](crate::report).
pub fn emit(sink: &mut dyn LogSink, severity: Severity, args: fmt::Arguments<'_>) {
    let line = LogLine::format(args);
    sink.record(severity, line.as_str());
}

/// `report!(sink, Severity::Info, "relay {} on", id)`
#[macro_export]
macro_rules! report {
    ($sink:expr, $severity:expr, $($arg:tt)+) => {
        $crate::app::events::emit($sink, $severity, format_args!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Capture(Vec<(Severity, std::string::String)>);

    impl LogSink for Capture {
        fn record(&mut self, severity: Severity, message: &str) {
            self.0.push((severity, message.to_owned()));
        }
    }

    #[test]
    fn report_formats_into_the_sink() {
        let mut sink = Capture(Vec::new());
        crate::report!(&mut sink, Severity::Warning, "relay {} busy", 3);
        assert_eq!(sink.0, vec![(Severity::Warning, "relay 3 busy".to_owned())]);
    }

    #[test]
    fn overlong_lines_are_truncated() {
        let long = "x".repeat(LOG_LINE_CAP + 40);
        let line = LogLine::format(format_args!("{}{}", long, "tail"));
        assert_eq!(line.as_str().len(), LOG_LINE_CAP);
        assert!(!line.as_str().ends_with("tail"));
    }
}
