//! Cached live business search client.
//!
//! Every request is looked up in the [`ResponseCache`] first. On a miss
//! the API is called (with retry) and the response is written back before
//! being returned, so a repeated query never reaches the network.

use std::sync::Mutex;
use std::time::Duration;

use dining_atlas_database::{ResponseCache, cache_key};
use serde_json::Value;

use crate::config::SearchService;
use crate::processing::{BusinessDetails, ReviewExcerpt};
use crate::{SearchError, retry};

const USER_AGENT: &str = concat!("dining-atlas/", env!("CARGO_PKG_VERSION"));

/// Live search client with a persistent response cache.
pub struct SearchClient {
    http: reqwest::Client,
    service: SearchService,
    api_key: String,
    /// `duckdb::Connection` is `Send` but not `Sync`, so a `Mutex` is needed.
    cache: Mutex<ResponseCache>,
}

impl SearchClient {
    /// Creates a client for `service`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(
        service: SearchService,
        api_key: String,
        cache: ResponseCache,
    ) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(service.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            service,
            api_key,
            cache: Mutex::new(cache),
        })
    }

    /// Creates a client for the embedded Yelp service, reading the API key
    /// from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the config is malformed, the API key is
    /// missing, or the HTTP client cannot be built.
    pub fn from_env(cache: ResponseCache) -> Result<Self, SearchError> {
        let service = SearchService::yelp()?;
        let api_key = service.api_key()?;
        Self::new(service, api_key, cache)
    }

    /// The service this client talks to.
    #[must_use]
    pub const fn service(&self) -> &SearchService {
        &self.service
    }

    /// Searches businesses matching `term` near `location`.
    ///
    /// Returns the raw response; see
    /// [`SearchSummary::from_response`](crate::processing::SearchSummary::from_response).
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the cache or the API call fails.
    pub async fn search_businesses(&self, term: &str, location: &str) -> Result<Value, SearchError> {
        let limit = self.service.search_limit.to_string();
        self.fetch(
            &self.service.search_url(),
            &[("term", term), ("location", location), ("limit", &limit)],
        )
        .await
    }

    /// Fetches details of one business.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the cache or the API call fails.
    pub async fn business_details(&self, business_id: &str) -> Result<BusinessDetails, SearchError> {
        let response = self
            .fetch(&self.service.business_url(business_id), &[])
            .await?;
        Ok(BusinessDetails::from_response(business_id, &response))
    }

    /// Fetches the first reviews of one business.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the cache or the API call fails.
    pub async fn business_reviews(
        &self,
        business_id: &str,
    ) -> Result<Vec<ReviewExcerpt>, SearchError> {
        let response = self
            .fetch(&self.service.reviews_url(business_id), &[])
            .await?;
        Ok(ReviewExcerpt::from_response(&response))
    }

    async fn fetch(&self, url: &str, params: &[(&str, &str)]) -> Result<Value, SearchError> {
        let key = cache_key(url, params);

        if let Some(hit) = self.cache()?.get(&key)? {
            log::debug!("Cache hit for {key}");
            return Ok(hit);
        }

        log::info!("Cache miss, calling {url}");
        let response = retry::send_json(
            || {
                self.http
                    .get(url)
                    .bearer_auth(&self.api_key)
                    .query(params)
            },
            self.service.max_retries,
        )
        .await?;

        self.cache()?.put(&key, url, &response)?;
        Ok(response)
    }

    fn cache(&self) -> Result<std::sync::MutexGuard<'_, ResponseCache>, SearchError> {
        self.cache.lock().map_err(|_| SearchError::CacheUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(cache: ResponseCache) -> SearchClient {
        SearchClient::new(SearchService::yelp().unwrap(), "test-key".to_string(), cache).unwrap()
    }

    #[tokio::test]
    async fn cached_search_skips_network() {
        let service = SearchService::yelp().unwrap();
        let cache = ResponseCache::open_in_memory().unwrap();
        let body = json!({"businesses": [{"id": "a", "review_count": 3}]});
        let key = cache_key(
            &service.search_url(),
            &[("limit", "50"), ("location", "Seattle"), ("term", "Thai")],
        );
        cache.put(&key, &service.search_url(), &body).unwrap();

        let result = client(cache)
            .search_businesses("Thai", "Seattle")
            .await
            .unwrap();
        assert_eq!(result, body);
    }

    #[tokio::test]
    async fn cached_reviews_are_trimmed() {
        let service = SearchService::yelp().unwrap();
        let cache = ResponseCache::open_in_memory().unwrap();
        let url = service.reviews_url("a");
        cache
            .put(
                &cache_key(&url, &[]),
                &url,
                &json!({"reviews": [
                    {"rating": 5, "text": "1", "user": {"name": "A"}},
                    {"rating": 4, "text": "2", "user": {"name": "B"}},
                    {"rating": 3, "text": "3", "user": {"name": "C"}},
                    {"rating": 2, "text": "4", "user": {"name": "D"}}
                ]}),
            )
            .unwrap();

        let reviews = client(cache).business_reviews("a").await.unwrap();
        assert_eq!(reviews.len(), 3);
        assert_eq!(reviews[2].text.as_deref(), Some("3"));
    }
}
