//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, validate, dummy), and their associated argument
//! structs. Balancer flags have environment variable equivalents for
//! container deployments.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::logging::Timestamps;

#[derive(Parser)]
#[command(
    name = "fanout-balancer",
    version,
    about = "Failover-aware HTTP dispatcher",
    propagate_version = true,
    infer_long_args = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        fanout-balancer run -e http://a:8000,http://b:8000          Serial failover\n  \
        fanout-balancer run -e http://a:8000,http://b:8000 --fanout Concurrent dispatch\n  \
        fanout-balancer dummy --address 127.0.0.1:8000               Local test upstream"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the balancer
    Run(Box<RunArgs>),

    /// Check endpoints and terminal statuses without starting
    Validate(ValidateArgs),

    /// Start a dummy upstream that answers slowly and sometimes fails
    Dummy(DummyArgs),
}

/// Settings shared by `run` and `validate`.
#[derive(Args, Debug, Default)]
pub struct BalancerArgs {
    /// Comma-separated upstream URLs, e.g. 'https://one.com,https://two.com'
    #[arg(short, long, env = "BALANCER_ENDPOINTS")]
    pub endpoints: Option<String>,

    /// Status floors whose replies are relayed [default: 100,200,300,400]
    #[arg(short, long, env = "BALANCER_TERMINAL_RESPONSES")]
    pub terminal_responses: Option<String>,

    /// Dispatch to all endpoints concurrently instead of one after another
    #[arg(short, long, env = "BALANCER_FANOUT")]
    pub fanout: bool,

    /// Config file path (.yaml, .json, .toml)
    #[arg(short, long, env = "BALANCER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Per-endpoint call timeout in milliseconds [default: 5000]
    #[arg(long, env = "BALANCER_TIMEOUT_MS", help_heading = "Tuning")]
    pub timeout: Option<u64>,
}

#[derive(Args)]
#[command(infer_long_args = true, after_help = "\x1b[1mExamples:\x1b[0m\n  \
        fanout-balancer run -e http://a:8000,http://b:8000              Serial failover\n  \
        fanout-balancer run -c balancer.yaml -a :9090 --pretty          Config file, local dev\n  \
        fanout-balancer run -e http://a,http://b -t 200,300 --fanout    Only 2xx/3xx, concurrent")]
pub struct RunArgs {
    #[command(flatten)]
    pub balancer: BalancerArgs,

    /// Listen address (':8080' binds all interfaces)
    #[arg(short, long, env = "BALANCER_ADDRESS", default_value = "0.0.0.0:8080")]
    pub address: String,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    /// Log output: 'stdout', 'stderr', or a file to append to
    #[arg(long, env = "LOG_FILE", default_value = "stdout")]
    pub log_file: String,

    /// Prefix attached to every log line (empty disables it)
    #[arg(long, env = "LOG_PREFIX", default_value = "fanout-balancer")]
    pub log_prefix: String,

    /// Emit the date in log timestamps
    #[arg(long, env = "LOG_DATE", default_value_t = true, action = ArgAction::Set)]
    pub log_date: bool,

    /// Emit the time of day in log timestamps
    #[arg(long, env = "LOG_TIME", default_value_t = true, action = ArgAction::Set)]
    pub log_time: bool,

    /// Emit microseconds in log timestamps (implies --log-time)
    #[arg(long, env = "LOG_MSEC")]
    pub log_msec: bool,

    /// Log timestamps in UTC instead of local time
    #[arg(long, env = "LOG_UTC")]
    pub log_utc: bool,

    // -- Tuning --
    /// Max request body size in bytes
    #[arg(
        long,
        env = "MAX_BODY_SIZE",
        default_value_t = crate::server::DEFAULT_MAX_BODY,
        help_heading = "Tuning"
    )]
    pub max_body: usize,
}

#[derive(Args)]
#[command(infer_long_args = true)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub balancer: BalancerArgs,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Args)]
#[command(infer_long_args = true)]
pub struct DummyArgs {
    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1:8000")]
    pub address: String,

    /// Stop after this many seconds (0 runs until interrupted)
    #[arg(long, default_value_t = 0)]
    pub stop_after: u64,

    /// Answer immediately instead of after a random delay
    #[arg(long)]
    pub no_delay: bool,

    /// Never simulate failures (otherwise ~25% of replies are 500)
    #[arg(long)]
    pub no_errors: bool,

    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,
}

impl RunArgs {
    #[must_use]
    pub const fn timestamps(&self) -> Timestamps {
        Timestamps {
            date: self.log_date,
            time: self.log_time,
            micros: self.log_msec,
            utc: self.log_utc,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}
