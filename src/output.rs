//! Colored status output, filtered by [`Verbosity`].
//!
//! ERROR HANDLING STRATEGY FOR DECORATIVE I/O:
//! All termcolor operations use `let _ =` to deliberately ignore errors.
//! Colored output is decorative. If stderr/stdout is unavailable (broken pipe,
//! no TTY, etc.) the run carries on without it.

use crate::config::Verbosity;
use std::fmt;
use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Where a message is printed and how it is decorated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warn,
    Success,
    Info,
    Debug,
}

impl Level {
    fn threshold(self) -> Verbosity {
        match self {
            Self::Error => Verbosity::Error,
            Self::Warn => Verbosity::Warn,
            Self::Success | Self::Info => Verbosity::Info,
            Self::Debug => Verbosity::Debug,
        }
    }

    fn decoration(self) -> Option<(Color, &'static str)> {
        match self {
            Self::Error => Some((Color::Red, "❌ ")),
            Self::Warn => Some((Color::Yellow, "⚠️  ")),
            Self::Success => Some((Color::Green, "✓ ")),
            Self::Info => None,
            Self::Debug => Some((Color::Cyan, "· ")),
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, Self::Error | Self::Warn | Self::Debug)
    }
}

/// Terminal reporter shared by every provisioning step.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    verbosity: Verbosity,
    color: ColorChoice,
}

impl Reporter {
    #[must_use]
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            color: ColorChoice::Auto,
        }
    }

    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    #[must_use]
    pub fn enabled(&self, level: Level) -> bool {
        level.threshold() <= self.verbosity
    }

    pub fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }

        let bufwtr = if level.to_stderr() {
            BufferWriter::stderr(self.color)
        } else {
            BufferWriter::stdout(self.color)
        };
        let mut buffer = bufwtr.buffer();
        if let Some((color, marker)) = level.decoration() {
            let _ = buffer.set_color(ColorSpec::new().set_fg(Some(color)));
            let _ = write!(&mut buffer, "{marker}");
            let _ = buffer.reset();
        }
        let _ = writeln!(&mut buffer, "{args}");
        let _ = bufwtr.print(&buffer);
    }

    /// Print a block verbatim (e.g. a captured tool log), indented.
    pub fn emit_block(&self, level: Level, text: &str) {
        for line in text.lines() {
            self.emit(level, format_args!("   {line}"));
        }
    }
}

#[macro_export]
macro_rules! error {
    ($out:expr, $($arg:tt)*) => {
        $out.emit($crate::output::Level::Error, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! warn {
    ($out:expr, $($arg:tt)*) => {
        $out.emit($crate::output::Level::Warn, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! success {
    ($out:expr, $($arg:tt)*) => {
        $out.emit($crate::output::Level::Success, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! info {
    ($out:expr, $($arg:tt)*) => {
        $out.emit($crate::output::Level::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug {
    ($out:expr, $($arg:tt)*) => {
        $out.emit($crate::output::Level::Debug, format_args!($($arg)*))
    };
}
