//! SearXNG search client.
//!
//! Thin JSON-format client for a SearXNG instance. Request failures are
//! recovered to empty result sets: an unreachable search backend degrades
//! the answer, it does not fail the call.

use serde::Deserialize;
use tracing::warn;
use url::Url;

/// Optional search parameters.
#[derive(Debug, Clone, Default)]
pub struct SearxngSearchOptions {
    pub categories: Option<Vec<String>>,
    pub engines: Option<Vec<String>>,
    pub language: Option<String>,
    pub pageno: Option<u32>,
}

/// A single search result.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SearxngSearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// Results plus query suggestions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearxngResponse {
    #[serde(default)]
    pub results: Vec<SearxngSearchResult>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

/// Client for one SearXNG endpoint.
#[derive(Debug, Clone)]
pub struct SearxngClient {
    http: reqwest::Client,
    base_url: String,
}

impl SearxngClient {
    /// Create a client for the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Run a search, returning empty results on any failure.
    pub async fn search(
        &self,
        query: &str,
        opts: Option<&SearxngSearchOptions>,
    ) -> SearxngResponse {
        match self.try_search(query, opts).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, query = %query, "SearXNG request failed");
                SearxngResponse::default()
            }
        }
    }

    async fn try_search(
        &self,
        query: &str,
        opts: Option<&SearxngSearchOptions>,
    ) -> anyhow::Result<SearxngResponse> {
        let mut url = Url::parse(&format!(
            "{}/search",
            self.base_url.trim_end_matches('/')
        ))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("format", "json");
            pairs.append_pair("q", query);

            if let Some(opts) = opts {
                if let Some(categories) = &opts.categories {
                    pairs.append_pair("categories", &categories.join(","));
                }
                if let Some(engines) = &opts.engines {
                    pairs.append_pair("engines", &engines.join(","));
                }
                if let Some(language) = &opts.language {
                    pairs.append_pair("language", language);
                }
                if let Some(pageno) = opts.pageno {
                    pairs.append_pair("pageno", &pageno.to_string());
                }
            }
        }

        let resp = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<SearxngResponse>()
            .await?;

        Ok(resp)
    }
}
