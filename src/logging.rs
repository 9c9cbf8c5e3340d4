//! Structured logging setup using the `tracing` ecosystem.
//!
//! Configures a `tracing-subscriber` with either JSON output (for
//! production) or pretty-printed output (for TTY / local dev), written to
//! stdout, stderr, or an appended log file. Format is auto-detected from
//! the output stream but can be forced via `--json` or `--pretty`.
//! Timestamps follow the `--log-date` / `--log-time` / `--log-msec` /
//! `--log-utc` flags, and `--log-prefix` rides on a span around the work.

use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{ChronoLocal, ChronoUtc, FormatTime};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

use crate::cli::LogLevel;
use crate::error::BalancerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    Stderr,
    File(PathBuf),
}

impl LogTarget {
    /// `stdout` and `stderr` (or an empty value) name streams; anything else is a file path.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "" | "stdout" => Self::Stdout,
            "stderr" => Self::Stderr,
            path => Self::File(PathBuf::from(path)),
        }
    }

    fn is_terminal(&self) -> bool {
        match self {
            Self::Stdout => std::io::stdout().is_terminal(),
            Self::Stderr => std::io::stderr().is_terminal(),
            Self::File(_) => false,
        }
    }

    fn make_writer(&self) -> Result<BoxMakeWriter, BalancerError> {
        Ok(match self {
            Self::Stdout => BoxMakeWriter::new(std::io::stdout),
            Self::Stderr => BoxMakeWriter::new(std::io::stderr),
            Self::File(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                BoxMakeWriter::new(Mutex::new(file))
            }
        })
    }
}

#[must_use]
pub fn resolve_format(pretty: bool, json: bool, target: &LogTarget) -> LogFormat {
    if json {
        LogFormat::Json
    } else if pretty || target.is_terminal() {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

/// Which parts of the wall clock prefix each log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamps {
    pub date: bool,
    pub time: bool,
    /// Microsecond resolution; implies `time`.
    pub micros: bool,
    pub utc: bool,
}

impl Default for Timestamps {
    fn default() -> Self {
        Self {
            date: true,
            time: true,
            micros: false,
            utc: false,
        }
    }
}

impl Timestamps {
    /// strftime pattern for the enabled parts, `None` when nothing is shown.
    fn pattern(&self) -> Option<String> {
        let mut parts = Vec::with_capacity(2);
        if self.date {
            parts.push("%Y/%m/%d");
        }
        if self.micros {
            parts.push("%H:%M:%S%.6f");
        } else if self.time {
            parts.push("%H:%M:%S");
        }
        (!parts.is_empty()).then(|| parts.join(" "))
    }

    fn clock(&self) -> Option<Clock> {
        self.pattern().map(|pattern| {
            if self.utc {
                Clock::Utc(ChronoUtc::new(pattern))
            } else {
                Clock::Local(ChronoLocal::new(pattern))
            }
        })
    }
}

#[derive(Debug)]
enum Clock {
    Local(ChronoLocal),
    Utc(ChronoUtc),
}

impl FormatTime for Clock {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        match self {
            Self::Local(clock) => clock.format_time(w),
            Self::Utc(clock) => clock.format_time(w),
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

pub fn init(
    level: &LogLevel,
    format: LogFormat,
    target: &LogTarget,
    timestamps: Timestamps,
) -> Result<(), BalancerError> {
    let filter = Targets::new().with_default(level.to_tracing_level());
    let writer = target.make_writer()?;
    let ansi = target.is_terminal();

    let layer: BoxedLayer = match (format, timestamps.clock()) {
        (LogFormat::Json, Some(clock)) => fmt::layer()
            .json()
            .with_target(false)
            .with_timer(clock)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        (LogFormat::Json, None) => fmt::layer()
            .json()
            .with_target(false)
            .without_time()
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        (LogFormat::Pretty, Some(clock)) => fmt::layer()
            .pretty()
            .with_ansi(ansi)
            .with_timer(clock)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        (LogFormat::Pretty, None) => fmt::layer()
            .pretty()
            .with_ansi(ansi)
            .without_time()
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(layer).init();

    Ok(())
}

/// Span carrying `prefix` on every event recorded inside it.
///
/// Error level keeps it enabled under every `--log-level`.
#[must_use]
pub fn prefix_span(prefix: &str) -> tracing::Span {
    if prefix.is_empty() {
        tracing::Span::none()
    } else {
        tracing::error_span!("balancer", prefix)
    }
}
