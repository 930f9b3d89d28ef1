//! Everything HTTP API client
//!
//! Thin client over the Everything (voidtools) HTTP server search endpoint.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, SearchError};
use crate::everything::types::{SearchResponse, SearchResult};

/// Anything that can run an Everything query
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Run `query`, asking the server for at most `max_results` hits (0 = no limit)
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchResult>>;
}

/// Everything HTTP API client
pub struct EverythingClient {
    /// HTTP client
    http_client: reqwest::Client,

    /// Base URL including scheme and port
    base_url: String,

    /// Basic auth credentials, only when both parts are set
    credentials: Option<(String, String)>,
}

impl EverythingClient {
    /// Create a new client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let credentials = config
            .has_credentials()
            .then(|| (config.username.clone(), config.password.clone()));

        Ok(Self {
            http_client,
            base_url: resolve_base_url(&config.base_url, config.port)?,
            credentials,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full search URL for a query
    pub fn search_url(&self, query: &str, max_results: u32) -> String {
        let mut url = format!(
            "{}/?search={}&json=1&path_column=1&size_column=1&date_modified_column=1",
            self.base_url,
            urlencoding::encode(query)
        );
        if max_results > 0 {
            url.push_str(&format!("&count={}", max_results));
        }
        url
    }
}

#[async_trait]
impl Searcher for EverythingClient {
    async fn search(&self, query: &str, max_results: u32) -> Result<Vec<SearchResult>> {
        let url = self.search_url(query, max_results);
        debug!(%url, authenticated = self.credentials.is_some(), "Sending search request");

        let mut request = self.http_client.get(&url);
        if let Some((username, password)) = &self.credentials {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(match &self.credentials {
                None => SearchError::CredentialsRequired,
                Some((username, _)) => SearchError::AuthenticationFailed {
                    username: username.clone(),
                },
            }
            .into());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::RequestFailed {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let body = response.text().await?;
        let results = parse_search_body(&body);
        debug!(count = results.len(), "Search completed");
        Ok(results)
    }
}

/// Combine the configured base URL and port.
///
/// A port is appended only when the URL does not already carry one; a URL
/// without a scheme is treated as plain `http`.
pub fn resolve_base_url(base_url: &str, port: u16) -> Result<String> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(SearchError::InvalidBaseUrl {
            url: base_url.to_string(),
        }
        .into());
    }

    let (scheme, host) = match trimmed.split_once("://") {
        Some((scheme, host)) if scheme == "http" || scheme == "https" => (scheme, host),
        Some(_) => {
            return Err(SearchError::InvalidBaseUrl {
                url: base_url.to_string(),
            }
            .into())
        }
        None => ("http", trimmed),
    };

    let authority = host.split('/').next().unwrap_or(host);
    if port != 0 && !authority.contains(':') {
        Ok(format!("{}://{}:{}", scheme, host, port))
    } else {
        Ok(format!("{}://{}", scheme, host))
    }
}

/// Parse a search response body.
///
/// JSON bodies are read as [`SearchResponse`]; anything else is treated as a
/// plain-text listing with one path per line.
pub fn parse_search_body(body: &str) -> Vec<SearchResult> {
    match serde_json::from_str::<SearchResponse>(body) {
        Ok(response) => response.results.into_iter().map(SearchResult::from).collect(),
        Err(_) => body
            .trim()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| SearchResult {
                path: line.to_string(),
                full_path: line.to_string(),
                ..SearchResult::default()
            })
            .collect(),
    }
}
