//! Balancer settings: command-line flags merged over an optional file.
//!
//! [`Settings::resolve`] turns [`BalancerArgs`] (and the file they may
//! point at) into checked startup settings. Precedence is flag or
//! environment variable, then file, then built-in default. Any problem
//! here is fatal: the server never starts with a half-valid setup.

pub mod file;
pub mod model;

use std::time::Duration;

use crate::classifier::StatusClassifier;
use crate::cli::BalancerArgs;
use crate::endpoints::{parse_addresses, EndpointSet};
use crate::error::BalancerError;
use crate::proxy::fanout::DispatchMode;
use crate::proxy::forward::{ReverseProxy, DEFAULT_TIMEOUT_MS};
use crate::server::HttpClient;
use model::FileConfig;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Endpoint addresses, already checked to be absolute HTTP(S) URLs.
    pub endpoints: Vec<String>,
    pub classifier: StatusClassifier,
    pub mode: DispatchMode,
    pub timeout: Duration,
}

impl Settings {
    pub fn resolve(args: &BalancerArgs) -> Result<Self, BalancerError> {
        let file = match &args.config {
            Some(path) => file::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    fn merge(args: &BalancerArgs, file: FileConfig) -> Result<Self, BalancerError> {
        let endpoints: Vec<String> = match (&args.endpoints, file.endpoints) {
            (Some(spec), _) => spec.split(',').map(String::from).collect(),
            (None, Some(list)) => list,
            (None, None) => {
                return Err(BalancerError::NoEndpoints {
                    hint: "Provide --endpoints <URLS> (or BALANCER_ENDPOINTS), or list\n  \
                           'endpoints' in a config file passed with --config."
                        .into(),
                })
            }
        };
        parse_addresses(&endpoints)?;

        let classifier = match (&args.terminal_responses, file.terminal_responses) {
            (Some(spec), _) => StatusClassifier::new(spec)?,
            (None, Some(floors)) => StatusClassifier::from_floors(floors)?,
            (None, None) => StatusClassifier::default(),
        };

        let mode = if args.fanout {
            DispatchMode::Concurrent
        } else {
            file.mode.unwrap_or_default()
        };

        let timeout_ms = args.timeout.or(file.timeout).unwrap_or(DEFAULT_TIMEOUT_MS);

        Ok(Self {
            endpoints,
            classifier,
            mode,
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Bind every endpoint to a reverse proxy over `client`.
    pub fn build_endpoints(&self, client: &HttpClient) -> Result<EndpointSet, BalancerError> {
        EndpointSet::from_tokens(
            &self.endpoints,
            ReverseProxy::binder(client.clone(), self.timeout),
        )
    }
}
