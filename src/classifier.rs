//! Terminal status classification.
//!
//! A [`StatusClassifier`] holds the set of "hundred floors" (100, 200, ...)
//! whose statuses are good enough to relay to the caller. A reply with
//! status 404 is accepted when 400 is in the set.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::BalancerError;

/// Floors accepted when no terminal statuses are configured.
pub const DEFAULT_TERMINAL_RESPONSES: &str = "100,200,300,400";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusClassifier {
    floors: BTreeSet<u16>,
}

impl StatusClassifier {
    /// Parse a comma-separated list such as `"100,200,300,400"`.
    pub fn new(spec: &str) -> Result<Self, BalancerError> {
        if spec.trim().is_empty() {
            return Err(BalancerError::EmptyStatusSpec);
        }

        let mut floors = Vec::new();
        for part in spec.split(',') {
            let token = part.trim();
            let floor = token
                .parse::<u16>()
                .map_err(|_| BalancerError::InvalidStatusToken {
                    token: token.to_string(),
                    spec: spec.to_string(),
                })?;
            if floor % 100 != 0 {
                return Err(BalancerError::StatusNotRoundHundred {
                    token: token.to_string(),
                    spec: spec.to_string(),
                });
            }
            floors.push(floor);
        }

        Self::from_floors(floors)
    }

    /// Build from numeric floors, as read from a config file list.
    pub fn from_floors(floors: impl IntoIterator<Item = u16>) -> Result<Self, BalancerError> {
        let floors: BTreeSet<u16> = floors.into_iter().collect();
        if floors.is_empty() {
            return Err(BalancerError::EmptyStatusSpec);
        }
        if let Some(bad) = floors.iter().find(|f| **f % 100 != 0) {
            return Err(BalancerError::StatusNotRoundHundred {
                token: bad.to_string(),
                spec: join_floors(&floors),
            });
        }
        Ok(Self { floors })
    }

    #[must_use]
    pub fn is_accepted(&self, status: u16) -> bool {
        self.floors.contains(&(status - status % 100))
    }

    /// Accepted floors in ascending order.
    pub fn floors(&self) -> impl Iterator<Item = u16> + '_ {
        self.floors.iter().copied()
    }
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self {
            floors: [100, 200, 300, 400].into_iter().collect(),
        }
    }
}

impl FromStr for StatusClassifier {
    type Err = BalancerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for StatusClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_floors(&self.floors))
    }
}

fn join_floors(floors: &BTreeSet<u16>) -> String {
    floors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
