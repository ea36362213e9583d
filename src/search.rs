//! Search-count collaborator.
//!
//! A single blocking call per query: how many literature records match?
//! [`HttpSearchCounter`] targets an esearch-style endpoint; any transport,
//! quota, or format problem surfaces as a [`SearchError`] that callers catch
//! per candidate — a failed count never aborts the run.

use std::time::Duration;

use serde::Deserialize;

use crate::error::SearchError;

pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Seam for the search-count collaborator.
pub trait SearchCounter {
    /// Number of records matching `query`. `retmax` caps how many result ids
    /// the service materializes; it does not affect the count.
    fn count(&self, query: &str, retmax: Option<usize>) -> SearchResult<u64>;
}

/// Esearch-style HTTP search counter.
pub struct HttpSearchCounter {
    endpoint: String,
    database: String,
    agent: ureq::Agent,
}

impl HttpSearchCounter {
    pub fn new(endpoint: impl Into<String>, database: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            endpoint: endpoint.into(),
            database: database.into(),
            agent,
        }
    }
}

impl SearchCounter for HttpSearchCounter {
    fn count(&self, query: &str, retmax: Option<usize>) -> SearchResult<u64> {
        let retmax = retmax.unwrap_or(10).to_string();
        let response = self
            .agent
            .get(&self.endpoint)
            .query("db", &self.database)
            .query("term", query)
            .query("retmax", &retmax)
            .query("retmode", "json")
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(status, _) => SearchError::Http { status },
                ureq::Error::Transport(transport) => SearchError::Transport {
                    message: transport.to_string(),
                },
            })?;

        let envelope: EsearchEnvelope =
            response.into_json().map_err(|e| SearchError::Format {
                message: e.to_string(),
            })?;
        envelope.esearchresult.count.parse()
    }
}

#[derive(Debug, Deserialize)]
struct EsearchEnvelope {
    esearchresult: EsearchResult,
}

#[derive(Debug, Deserialize)]
struct EsearchResult {
    count: CountField,
}

/// The count comes back as a JSON string on most deployments and as a bare
/// integer on some.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CountField {
    Text(String),
    Number(u64),
}

impl CountField {
    fn parse(self) -> SearchResult<u64> {
        match self {
            CountField::Number(n) => Ok(n),
            CountField::Text(s) => s.parse().map_err(|_| SearchError::Format {
                message: format!("count is not a non-negative integer: {s:?}"),
            }),
        }
    }
}
