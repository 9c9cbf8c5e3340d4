//! Serde data structure for the optional balancer config file.
//!
//! Every field is optional; values given on the command line (or via
//! environment variables) take precedence over the file.

use serde::{Deserialize, Serialize};

use crate::proxy::fanout::DispatchMode;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Upstream URLs in priority order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Vec<String>>,

    /// Accepted status floors, e.g. `[200, 300]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_responses: Option<Vec<u16>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<DispatchMode>,

    /// Per-endpoint call timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}
