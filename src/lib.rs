//! fanout-balancer is a failover-aware HTTP dispatcher.
//!
//! Each incoming request is forwarded to a fixed list of upstream
//! endpoints, either one after another or all at once, and the caller
//! receives the reply of the lowest-indexed endpoint whose status falls
//! into a configured set of "terminal" status classes.
//!
//! # Architecture
//!
//! - [`classifier`] -- Which status classes (100, 200, ...) are terminal.
//! - [`endpoints`] -- The ordered endpoint list, each bound to a forwarder.
//! - [`proxy`] -- Request capture, forwarding, and the fan-out engine.
//! - [`telemetry`] -- Per-request outcome records and counters.
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, validate, dummy).
//! - [`config`] -- Flag and config-file resolution into startup settings.
//! - [`error`] -- Unified error type using `thiserror`.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`server`] -- Axum server setup, shared state, HTTP client, and
//!   graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |

// Binary crate: public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod classifier;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod server;
pub mod telemetry;
