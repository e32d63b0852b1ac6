//! Leveled diagnostic output.
//!
//! A `Reporter` is built once at startup and handed to whatever needs to
//! report; nothing reads a process-wide verbosity setting.

use std::fmt;
use std::io::{self, Write};

use clap::ValueEnum;
use colored::Colorize;

/// Diagnostic level. Lower is more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        };
        f.write_str(tag)
    }
}

/// Writes messages at or below a verbosity threshold to a sink.
pub struct Reporter {
    verbosity: Level,
    quiet: bool,
    sink: Box<dyn Write>,
}

impl Reporter {
    pub fn new(verbosity: Level, quiet: bool, sink: Box<dyn Write>) -> Self {
        Self {
            verbosity,
            quiet,
            sink,
        }
    }

    /// Reporter writing to stderr.
    pub fn stderr(verbosity: Level, quiet: bool) -> Self {
        Self::new(verbosity, quiet, Box::new(io::stderr()))
    }

    /// Reporter that drops everything.
    pub fn silent() -> Self {
        Self::new(Level::Error, true, Box::new(io::sink()))
    }

    /// Whether a message at `level` would be written.
    pub fn enabled(&self, level: Level) -> bool {
        !self.quiet && level <= self.verbosity
    }

    pub fn report(&mut self, level: Level, msg: impl fmt::Display) {
        if !self.enabled(level) {
            return;
        }
        let tag = match level {
            Level::Error => level.to_string().red().bold(),
            Level::Warn => level.to_string().yellow(),
            Level::Info => level.to_string().cyan(),
            Level::Debug => level.to_string().dimmed(),
        };
        let _ = writeln!(self.sink, "{tag}: {msg}");
    }

    pub fn error(&mut self, msg: impl fmt::Display) {
        self.report(Level::Error, msg);
    }

    pub fn warn(&mut self, msg: impl fmt::Display) {
        self.report(Level::Warn, msg);
    }

    pub fn info(&mut self, msg: impl fmt::Display) {
        self.report(Level::Info, msg);
    }

    pub fn debug(&mut self, msg: impl fmt::Display) {
        self.report(Level::Debug, msg);
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("verbosity", &self.verbosity)
            .field("quiet", &self.quiet)
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod tests {
    use super::capture::Capture;
    use super::*;

    fn reporter(verbosity: Level, quiet: bool) -> (Reporter, Capture) {
        colored::control::set_override(false);
        let cap = Capture::default();
        (Reporter::new(verbosity, quiet, Box::new(cap.clone())), cap)
    }

    #[test]
    fn test_threshold_filters() {
        let (mut r, cap) = reporter(Level::Warn, false);
        r.error("boom");
        r.warn("careful");
        r.info("hidden");
        r.debug("hidden too");
        assert_eq!(cap.lines(), ["error: boom", "warn: careful"]);
    }

    #[test]
    fn test_quiet_suppresses_all() {
        let (mut r, cap) = reporter(Level::Debug, true);
        r.error("boom");
        assert!(cap.contents().is_empty());
        assert!(!r.enabled(Level::Error));
    }

    #[test]
    fn test_level_order() {
        assert!(Level::Error < Level::Warn);
        assert!(Level::Info < Level::Debug);
    }
}
