//! Unified error type for the balancer.
//!
//! Every variant is a startup-time failure: configuration that cannot be
//! turned into an endpoint list or status classifier, a config file that
//! cannot be read or parsed, or a listener that cannot be bound. Upstream
//! failures during request handling never surface here; they become
//! statuses in a [`ResponseCapture`](crate::proxy::capture::ResponseCapture).

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BalancerError {
    #[error("terminal statuses: invalid status token '{token}' in '{spec}'")]
    InvalidStatusToken { token: String, spec: String },

    #[error("terminal statuses: status floor '{token}' in '{spec}' is not a round hundred")]
    StatusNotRoundHundred { token: String, spec: String },

    #[error("terminal statuses: at least one status floor is required")]
    EmptyStatusSpec,

    #[error("endpoint #{index} is empty (check for a stray comma)")]
    EmptyEndpoint { index: usize },

    #[error("bad endpoint #{index} '{token}': {reason}")]
    InvalidEndpoint {
        index: usize,
        token: String,
        reason: String,
    },

    #[error("No endpoints configured.\n\n  {hint}")]
    NoEndpoints { hint: String },

    #[error("Config file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("Config parse error in {path}:\n  {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl BalancerError {
    /// True for errors caused by the balancer settings themselves rather
    /// than by the environment (files, sockets).
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(
            self,
            Self::InvalidStatusToken { .. }
                | Self::StatusNotRoundHundred { .. }
                | Self::EmptyStatusSpec
                | Self::EmptyEndpoint { .. }
                | Self::InvalidEndpoint { .. }
                | Self::NoEndpoints { .. }
                | Self::ConfigParse { .. }
                | Self::UnsupportedFormat(_)
        )
    }
}
