// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! External script cache for deep-DOM mode
//!
//! Fetches are bounded by a fixed-size semaphore and keyed by script URL.
//! The first fetch populates the cache; every later request for the same
//! URL must be served from it. A duplicate network call for the same
//! external script is a correctness defect, not just waste, so each URL
//! also holds a per-key in-flight lock.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::{Mutex, Semaphore};
use tracing::debug;

use super::client::HttpClient;
use crate::error::{Error, Result};

/// Default concurrent external fetches
pub const DEFAULT_FETCH_CONCURRENCY: usize = 5;

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct ScriptCacheStats {
    /// Network fetches actually performed
    pub fetches: u64,
    /// Requests served from the cache
    pub hits: u64,
}

/// Shared, deduplicated external-script fetcher
pub struct ScriptCache {
    client: Arc<HttpClient>,
    cache: DashMap<String, Arc<String>>,
    inflight: DashMap<String, Arc<Mutex<()>>>,
    semaphore: Arc<Semaphore>,
    stats: RwLock<ScriptCacheStats>,
}

impl ScriptCache {
    pub fn new(client: Arc<HttpClient>, concurrency: usize) -> Self {
        Self {
            client,
            cache: DashMap::new(),
            inflight: DashMap::new(),
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            stats: RwLock::new(ScriptCacheStats::default()),
        }
    }

    /// Fetch a script body, once per URL for the cache's lifetime
    pub async fn fetch(&self, url: &str) -> Result<Arc<String>> {
        if let Some(cached) = self.cache.get(url) {
            self.stats.write().hits += 1;
            return Ok(cached.clone());
        }

        // Serialize fetches of the same URL; losers of the race find the
        // cache populated when they get the lock.
        let lock = self
            .inflight
            .entry(url.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        if let Some(cached) = self.cache.get(url) {
            self.stats.write().hits += 1;
            return Ok(cached.clone());
        }

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| Error::Cancelled)?;

        debug!("[seitti] fetching external script: {}", url);
        self.stats.write().fetches += 1;
        let response = self.client.get(url).await?;
        let body = Arc::new(response.body);
        self.cache.insert(url.to_string(), body.clone());
        Ok(body)
    }

    /// Snapshot of fetch/hit counters
    pub fn stats(&self) -> ScriptCacheStats {
        self.stats.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_same_url_fetched_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("var a = 1;"))
            .expect(1)
            .mount(&server)
            .await;

        let client = Arc::new(HttpClient::new().expect("client builds"));
        let cache = Arc::new(ScriptCache::new(client, 2));
        let url = format!("{}/app.js", server.uri());

        let (a, b, c) = tokio::join!(cache.fetch(&url), cache.fetch(&url), cache.fetch(&url));
        assert_eq!(*a.expect("fetch a"), "var a = 1;");
        assert_eq!(*b.expect("fetch b"), "var a = 1;");
        assert_eq!(*c.expect("fetch c"), "var a = 1;");

        let stats = cache.stats();
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.hits, 2);
    }

    #[tokio::test]
    async fn test_distinct_urls_fetch_separately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("b"))
            .mount(&server)
            .await;

        let client = Arc::new(HttpClient::new().expect("client builds"));
        let cache = ScriptCache::new(client, 2);

        let a = cache
            .fetch(&format!("{}/a.js", server.uri()))
            .await
            .expect("a");
        let b = cache
            .fetch(&format!("{}/b.js", server.uri()))
            .await
            .expect("b");
        assert_eq!(*a, "a");
        assert_eq!(*b, "b");
        assert_eq!(cache.stats().fetches, 2);
    }
}
