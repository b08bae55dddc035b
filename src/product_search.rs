//! # Product Search Module
//!
//! Looks up catalog products whose nutrient data is compared against a label.
//!
//! The HTTP client is built from an explicit [`SearchConfig`]; it issues
//! `GET {endpoint}?query=<q>&page_size=<n>[&api_key=<k>]` and expects
//!
//! ```json
//! {"products": [{"id": "…", "name": "…", "nutrients": {"energy": {"value": 250.0, "unit": "kcal"}}}]}
//! ```
//!
//! `code` and `product_name` are accepted in place of `id` and `name`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Instrument};

use crate::circuit_breaker::CircuitBreaker;
use crate::comparator::CandidateProduct;
use crate::errors::{error_logging, AppError, AppResult};
use crate::observability;
use crate::ocr::calculate_retry_delay;
use crate::ocr_config::RecoveryConfig;

pub const DEFAULT_SEARCH_ENDPOINT: &str = "http://localhost:8080/api/products/search";
pub const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PAGE_SIZE: u32 = 5;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Longest upstream error body kept in [`SearchError::Status`]
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Failure modes of a product search
#[derive(Debug, Clone, PartialEq)]
pub enum SearchError {
    /// Connection, TLS or timeout failure
    Transport(String),
    /// Non-success HTTP status with (truncated) body
    Status(u16, String),
    /// Response body was not the expected JSON
    Decode(String),
    /// Circuit breaker is open
    Unavailable(String),
}

impl SearchError {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            SearchError::Transport(_) => true,
            SearchError::Status(code, _) => *code >= 500 || *code == 429,
            SearchError::Decode(_) | SearchError::Unavailable(_) => false,
        }
    }
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::Transport(msg) => write!(f, "[SEARCH_TRANSPORT] Request failed: {}", msg),
            SearchError::Status(code, body) => {
                write!(f, "[SEARCH_STATUS] Upstream returned {}: {}", code, body)
            }
            SearchError::Decode(msg) => write!(f, "[SEARCH_DECODE] Invalid response: {}", msg),
            SearchError::Unavailable(msg) => {
                write!(f, "[SEARCH_UNAVAILABLE] Search temporarily unavailable: {}", msg)
            }
        }
    }
}

impl std::error::Error for SearchError {}

/// Connection settings for [`HttpProductSearch`]
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum number of products requested
    pub page_size: u32,
    pub recovery: RecoveryConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_SEARCH_TIMEOUT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
            recovery: RecoveryConfig::default(),
        }
    }
}

impl SearchConfig {
    /// Validate search configuration parameters
    pub fn validate(&self) -> AppResult<()> {
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Invalid product search endpoint format: {}",
                self.endpoint
            )));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err(AppError::Config(format!(
                "timeout_secs ({}) must be between 1 and 300",
                self.timeout_secs
            )));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(AppError::Config(format!(
                "page_size ({}) must be between 1 and {}",
                self.page_size, MAX_PAGE_SIZE
            )));
        }
        if let Some(key) = &self.api_key {
            if key.trim().is_empty() {
                return Err(AppError::Config(
                    "api_key cannot be empty if provided".to_string(),
                ));
            }
        }
        self.recovery.validate()
    }
}

/// Finds catalog products for a free-text query
#[async_trait]
pub trait ProductSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<CandidateProduct>, SearchError>;
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    products: Option<Vec<CandidateProduct>>,
}

/// Decode a search response body
///
/// ```rust
/// use just_nutrition::product_search::parse_search_response;
///
/// let products = parse_search_response(r#"{"products": []}"#).unwrap();
/// assert!(products.is_empty());
/// assert!(parse_search_response("not json").is_err());
/// ```
pub fn parse_search_response(body: &str) -> Result<Vec<CandidateProduct>, SearchError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| SearchError::Decode(e.to_string()))?;
    Ok(response.products.unwrap_or_default())
}

/// HTTP-backed [`ProductSearch`]
pub struct HttpProductSearch {
    client: Client,
    config: SearchConfig,
    circuit_breaker: CircuitBreaker,
}

impl HttpProductSearch {
    pub fn new(config: SearchConfig) -> AppResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let circuit_breaker = CircuitBreaker::new("product_search", config.recovery.clone());
        Ok(Self {
            client,
            config,
            circuit_breaker,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    async fn send_once(&self, query: &str) -> Result<Vec<CandidateProduct>, SearchError> {
        let mut params = vec![
            ("query", query.to_string()),
            ("page_size", self.config.page_size.to_string()),
        ];
        if let Some(key) = &self.config.api_key {
            params.push(("api_key", key.clone()));
        }

        // without_url keeps the API key out of error messages
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status(
                status.as_u16(),
                body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SearchError::Transport(e.without_url().to_string()))?;
        parse_search_response(&body)
    }

    async fn search_with_retries(&self, query: &str) -> Result<Vec<CandidateProduct>, SearchError> {
        let start_time = Instant::now();

        if self.circuit_breaker.is_open() {
            warn!("Circuit breaker is open, rejecting product search");
            return Err(SearchError::Unavailable(
                "product search failed repeatedly, try again later".to_string(),
            ));
        }

        let max_attempts = self.config.recovery.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(attempt, endpoint = %self.config.endpoint, "Sending product search request");

            match self.send_once(query).await {
                Ok(products) => {
                    self.circuit_breaker.record_success();
                    observability::record_search_metrics(
                        true,
                        start_time.elapsed(),
                        products.len(),
                        attempt,
                    );
                    info!(attempt, products = products.len(), "Product search completed");
                    return Ok(products);
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay_ms = calculate_retry_delay(attempt, &self.config.recovery);
                    warn!(attempt, delay_ms, error = %err, "Product search failed, retrying");
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(err) => {
                    if err.is_retryable() {
                        self.circuit_breaker.record_failure();
                    }
                    observability::record_search_metrics(false, start_time.elapsed(), 0, attempt);
                    error_logging::log_search_error(
                        &err,
                        "search",
                        Some(&self.config.endpoint),
                        Some(attempt),
                    );
                    return Err(err);
                }
            }
        }
    }
}

#[async_trait]
impl ProductSearch for HttpProductSearch {
    async fn search(&self, query: &str) -> Result<Vec<CandidateProduct>, SearchError> {
        let span = observability::search_span("search", query);
        self.search_with_retries(query).instrument(span).await
    }
}
