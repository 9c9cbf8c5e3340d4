//! The ordered set of upstream endpoints.
//!
//! Endpoints are configured as a comma-separated list of absolute URLs
//! (`http://one:8000,http://two:8000`). Each one is bound to its own
//! forwarding primitive at construction; position in the list is the
//! endpoint's index, which decides priority and identifies it in logs.

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::BalancerError;
use crate::proxy::forward::Forward;

#[derive(Clone)]
pub struct Endpoint {
    index: usize,
    address: String,
    url: Url,
    forwarder: Arc<dyn Forward>,
}

impl Endpoint {
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// The address exactly as configured.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn forwarder(&self) -> &dyn Forward {
        &*self.forwarder
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("index", &self.index)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct EndpointSet {
    endpoints: Vec<Endpoint>,
}

impl EndpointSet {
    /// Parse a comma-separated address list and bind each address with `bind`.
    pub fn parse<F>(spec: &str, bind: F) -> Result<Self, BalancerError>
    where
        F: FnMut(&Url) -> Arc<dyn Forward>,
    {
        Self::from_tokens(spec.split(','), bind)
    }

    pub fn from_tokens<I, S, F>(tokens: I, mut bind: F) -> Result<Self, BalancerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnMut(&Url) -> Arc<dyn Forward>,
    {
        let endpoints = parse_addresses(tokens)?
            .into_iter()
            .enumerate()
            .map(|(index, (address, url))| {
                tracing::info!(endpoint = index, address = %address, "configuring endpoint");
                let forwarder = bind(&url);
                Endpoint {
                    index,
                    address,
                    url,
                    forwarder,
                }
            })
            .collect();

        Ok(Self { endpoints })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Always false for a successfully built set; kept for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Endpoint> {
        self.endpoints.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Endpoint> {
        self.endpoints.iter()
    }
}

impl<'a> IntoIterator for &'a EndpointSet {
    type Item = &'a Endpoint;
    type IntoIter = std::slice::Iter<'a, Endpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.endpoints.iter()
    }
}

/// Validate addresses without binding them to a forwarder.
///
/// Returns `(configured text, parsed url)` pairs in input order. Fails on
/// the first empty token, unparseable URL, or non-HTTP scheme.
pub fn parse_addresses<I, S>(tokens: I) -> Result<Vec<(String, Url)>, BalancerError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = Vec::new();

    for (index, token) in tokens.into_iter().enumerate() {
        let token = token.as_ref().trim();
        if token.is_empty() {
            return Err(BalancerError::EmptyEndpoint { index });
        }

        let url = Url::parse(token).map_err(|e| BalancerError::InvalidEndpoint {
            index,
            token: token.to_string(),
            reason: e.to_string(),
        })?;

        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(BalancerError::InvalidEndpoint {
                index,
                token: token.to_string(),
                reason: format!("unsupported scheme '{scheme}' (expected http or https)"),
            });
        }

        parsed.push((token.to_string(), url));
    }

    if parsed.is_empty() {
        return Err(BalancerError::EmptyEndpoint { index: 0 });
    }

    Ok(parsed)
}
