//! Open Graph metadata for link previews, cached in a JSON file keyed by URL.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spdlog::{debug, error};

pub mod cache;
pub mod fetch;
pub mod scrape;

pub use cache::OgCache;
pub use fetch::HttpOgFetcher;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OgData {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
    /// Set when the page could not be fetched. Failed lookups are cached too.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OgData {
    pub fn failed(url: &str, error: String) -> OgData {
        OgData {
            url: url.to_string(),
            error: Some(error),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OgEntry {
    #[serde(flatten)]
    pub data: OgData,
    pub fetched_at: DateTime<Utc>,
}

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = OgData> + 'a>>;

/// Source of fresh metadata. Failures are reported inside [`OgData::error`].
pub trait OgFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a>;
}

/// Cache-first lookup. The lock is released while fetching so lookups for
/// different URLs do not wait on each other.
pub async fn fetch_cached(cache: &Mutex<OgCache>, fetcher: &dyn OgFetcher, url: &str) -> OgEntry {
    let now = Utc::now();
    if let Ok(cache) = cache.lock() {
        if let Some(entry) = cache.lookup(url, now) {
            debug!("OG cache hit for {}", url);
            return entry.clone();
        }
    }

    debug!("OG cache miss for {}. Fetching", url);
    let entry = OgEntry {
        data: fetcher.fetch(url).await,
        fetched_at: Utc::now(),
    };

    match cache.lock() {
        Ok(mut cache) => {
            if let Err(e) = cache.store(url, entry.clone()) {
                error!("Error saving OG cache: {}", e);
            }
        }
        Err(e) => error!("OG cache lock poisoned: {}", e),
    }

    entry
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use chrono::Duration;
    use tempfile::TempDir;

    use super::*;

    struct CountingFetcher {
        calls: Cell<usize>,
    }

    impl OgFetcher for CountingFetcher {
        fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
            self.calls.set(self.calls.get() + 1);
            Box::pin(async move {
                OgData {
                    url: url.to_string(),
                    title: Some(format!("fetched #{}", self.calls.get())),
                    ..Default::default()
                }
            })
        }
    }

    fn entry(url: &str, title: &str, fetched_at: DateTime<Utc>) -> OgEntry {
        OgEntry {
            data: OgData {
                url: url.to_string(),
                title: Some(title.to_string()),
                ..Default::default()
            },
            fetched_at,
        }
    }

    #[ntex::test]
    async fn test_fresh_entry_skips_network() {
        let dir = TempDir::new().unwrap();
        let mut cache = OgCache::load(&dir.path().join("og.json"), Duration::days(7));
        let url = "https://example.com/a";
        cache.store(url, entry(url, "cached", Utc::now() - Duration::days(6))).unwrap();

        let cache = Mutex::new(cache);
        let fetcher = CountingFetcher { calls: Cell::new(0) };
        let got = fetch_cached(&cache, &fetcher, url).await;

        assert_eq!(got.data.title.as_deref(), Some("cached"));
        assert_eq!(fetcher.calls.get(), 0);
    }

    #[ntex::test]
    async fn test_stale_entry_is_refetched_and_saved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("og.json");
        let mut cache = OgCache::load(&path, Duration::days(7));
        let url = "https://example.com/a";
        cache.store(url, entry(url, "old", Utc::now() - Duration::days(8))).unwrap();

        let cache = Mutex::new(cache);
        let fetcher = CountingFetcher { calls: Cell::new(0) };
        let got = fetch_cached(&cache, &fetcher, url).await;
        assert_eq!(got.data.title.as_deref(), Some("fetched #1"));
        assert_eq!(fetcher.calls.get(), 1);

        let again = fetch_cached(&cache, &fetcher, url).await;
        assert_eq!(again.data.title.as_deref(), Some("fetched #1"));
        assert_eq!(fetcher.calls.get(), 1);

        let reloaded = OgCache::load(&path, Duration::days(7));
        assert_eq!(reloaded.entries().get(url).and_then(|e| e.data.title.clone()), Some("fetched #1".to_string()));
    }

    #[ntex::test]
    async fn test_key_is_the_exact_url() {
        let dir = TempDir::new().unwrap();
        let cache = Mutex::new(OgCache::load(&dir.path().join("og.json"), Duration::days(7)));
        let fetcher = CountingFetcher { calls: Cell::new(0) };

        fetch_cached(&cache, &fetcher, "https://example.com/a").await;
        fetch_cached(&cache, &fetcher, "https://example.com/a/").await;
        assert_eq!(fetcher.calls.get(), 2);
        assert_eq!(cache.lock().unwrap().entries().len(), 2);
    }

    #[test]
    fn test_error_field_only_when_failed() {
        let ok = serde_json::to_value(OgData::default()).unwrap();
        assert!(ok.get("error").is_none());

        let failed = serde_json::to_value(OgData::failed("u", "timeout".to_string())).unwrap();
        assert_eq!(failed["error"], "timeout");
        assert_eq!(failed["siteName"], serde_json::Value::Null);
    }
}
