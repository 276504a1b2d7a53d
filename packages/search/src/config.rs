//! Compile-time embedded live search service configuration.
//!
//! The service is defined in `services/yelp.toml` and parsed once per
//! client. Only the API key comes from the environment.

use serde::Deserialize;

use crate::SearchError;

/// A live search service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchService {
    /// Unique identifier (e.g., `"yelp"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// API base URL.
    pub base_url: String,
    /// Path of the business search endpoint.
    pub search_path: String,
    /// Path prefix of the per-business endpoints.
    pub business_path: String,
    /// Suffix appended to a business path for its reviews.
    pub reviews_suffix: String,
    /// Environment variable holding the bearer token.
    pub api_key_env: String,
    /// Maximum listings requested per search.
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries for transient HTTP failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

const fn default_search_limit() -> u32 {
    50
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_retries() -> u32 {
    3
}

const YELP_TOML: &str = include_str!("../services/yelp.toml");

impl SearchService {
    /// Parses a service definition.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the TOML is malformed.
    pub fn from_toml(source: &str) -> Result<Self, SearchError> {
        toml::de::from_str(source).map_err(|e| SearchError::Config {
            message: format!("Failed to parse search service: {e}"),
        })
    }

    /// The embedded Yelp service definition.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the embedded TOML is malformed.
    pub fn yelp() -> Result<Self, SearchError> {
        Self::from_toml(YELP_TOML)
    }

    /// Reads the API key from [`Self::api_key_env`].
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::MissingApiKey`] if the variable is unset or
    /// blank.
    pub fn api_key(&self) -> Result<String, SearchError> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(SearchError::MissingApiKey {
                var: self.api_key_env.clone(),
            }),
        }
    }

    /// Full URL of the search endpoint.
    #[must_use]
    pub fn search_url(&self) -> String {
        format!("{}{}", self.base_url, self.search_path)
    }

    /// Full URL of one business.
    #[must_use]
    pub fn business_url(&self, business_id: &str) -> String {
        format!("{}{}/{business_id}", self.base_url, self.business_path)
    }

    /// Full URL of one business's reviews.
    #[must_use]
    pub fn reviews_url(&self, business_id: &str) -> String {
        format!("{}{}", self.business_url(business_id), self.reviews_suffix)
    }
}
