//! SERP search client.
//!
//! Epistemic foundation:
//! - K_i: The provider returns parsed Google results as JSON when `brd_json=1` is set
//! - B_i: The proxy zone is configured for SERP (might not be → HTML comes back)
//! - I^B: Network availability unknowable → surfaced as `SearchError::Transport`
//!
//! No retries here: the executor owns the fallback policy.

use crate::models::{Config, ProxyCredentials, SearchConfig, SearchError, SearchResultBundle};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::{Duration, Instant};
use tracing::debug;

/// Longest slice of an unexpected body kept for the error message.
const SNIPPET_CHARS: usize = 200;

/// Web search collaborator.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one search for a free-text query.
    async fn search(&self, query: &str) -> Result<SearchResultBundle, SearchError>;
}

/// Search client talking to a SERP endpoint, optionally through the provider's proxy.
pub struct SerpClient {
    /// None when proxy credentials are missing; every search then fails
    client: Option<reqwest::Client>,
    base_url: String,
    language: String,
    country: Option<String>,
    num_results: Option<u32>,
}

impl SerpClient {
    /// Build a client from configuration.
    ///
    /// Missing proxy credentials do not fail construction: they surface as
    /// `SearchError::MissingCredentials` on the first search, inside the run.
    pub fn from_config(config: &Config) -> Result<Self, SearchError> {
        let credentials = config.resolve_proxy_credentials();
        Self::new(&config.search, credentials)
    }

    pub fn new(
        config: &SearchConfig,
        credentials: Option<ProxyCredentials>,
    ) -> Result<Self, SearchError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs);

        let client = if config.use_proxy {
            match credentials {
                Some(creds) => {
                    let proxy_url = format!("http://{}:{}", config.proxy_host, config.proxy_port);
                    let proxy = reqwest::Proxy::all(&proxy_url)
                        .map_err(SearchError::Transport)?
                        .basic_auth(&creds.username(), &creds.password);
                    builder = builder.proxy(proxy);
                    Some(builder.build().map_err(SearchError::Transport)?)
                }
                None => None,
            }
        } else {
            Some(builder.no_proxy().build().map_err(SearchError::Transport)?)
        };

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            language: config.language.clone(),
            country: config.country.clone(),
            num_results: config.num_results,
        })
    }

    fn query_params(&self, query: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.to_string()),
            ("brd_json", "1".to_string()),
            ("hl", self.language.clone()),
        ];
        if let Some(country) = &self.country {
            params.push(("gl", country.clone()));
        }
        if let Some(num) = self.num_results {
            params.push(("num", num.to_string()));
        }
        params
    }
}

/// Whether a response is an HTML page rather than the JSON payload.
fn looks_like_html(content_type: &str, body: &str) -> bool {
    content_type.contains("text/html") || body.trim_start().starts_with('<')
}

fn snippet(body: &str) -> String {
    body.trim().chars().take(SNIPPET_CHARS).collect()
}

#[async_trait]
impl SearchProvider for SerpClient {
    async fn search(&self, query: &str) -> Result<SearchResultBundle, SearchError> {
        let client = self.client.as_ref().ok_or_else(|| {
            SearchError::MissingCredentials(format!(
                "proxy identity requires {}, {} and {}",
                crate::models::CUSTOMER_ID_ENV,
                crate::models::ZONE_ENV,
                crate::models::PASSWORD_ENV
            ))
        })?;

        let start = Instant::now();
        let response = client
            .get(&self.base_url)
            .query(&self.query_params(query))
            .send()
            .await
            .map_err(SearchError::Transport)?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let body = response.text().await.map_err(SearchError::Transport)?;

        if !status.is_success() {
            return Err(SearchError::HttpStatus {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        if looks_like_html(&content_type, &body) {
            return Err(SearchError::UnexpectedContent {
                content_type: if content_type.is_empty() {
                    "markup".to_string()
                } else {
                    content_type
                },
                snippet: snippet(&body),
            });
        }

        let bundle: SearchResultBundle =
            serde_json::from_str(&body).map_err(|e| SearchError::InvalidPayload(e.to_string()))?;

        debug!(
            query = query,
            organic = bundle.organic.len(),
            has_knowledge = bundle.knowledge.is_some(),
            paa = bundle.people_also_ask.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Search completed"
        );

        Ok(bundle)
    }
}
