//! Caching wrapper over any search provider

use async_trait::async_trait;
use litscout_core::{FileCache, LitResult, PaperRecord};
use std::sync::Arc;
use tracing::debug;

use crate::SearchProvider;

/// Version tag baked into every cache key. Bump when the requested fields or
/// the record shape change.
const CACHE_TAG: &str = "s2-v1";

/// A [`SearchProvider`] that consults a [`FileCache`] before delegating to
/// the inner provider, and records every successful response.
///
/// Errors are never cached: a failed call leaves the cache untouched so a
/// retry goes back to the network.
pub struct CachedSearch {
    inner: Arc<dyn SearchProvider>,
    cache: FileCache,
}

impl CachedSearch {
    pub fn new(inner: Arc<dyn SearchProvider>, cache: FileCache) -> Self {
        Self { inner, cache }
    }

    fn store<T: serde::Serialize>(&self, key: &str, value: &T) {
        // cache write failures degrade to uncached operation
        if let Err(e) = self.cache.put(key, value) {
            e.log();
        }
    }
}

#[async_trait]
impl SearchProvider for CachedSearch {
    async fn search(
        &self,
        query: &str,
        year_range: Option<(i32, i32)>,
    ) -> LitResult<Vec<PaperRecord>> {
        let input = match year_range {
            Some((start, end)) => format!("{query}|{start}-{end}"),
            None => query.to_string(),
        };
        let key = FileCache::fingerprint("search", &input, CACHE_TAG);

        if let Some(hit) = self.cache.get::<Vec<PaperRecord>>(&key) {
            debug!(query = %query, "Search served from cache");
            return Ok(hit);
        }

        let records = self.inner.search(query, year_range).await?;
        self.store(&key, &records);
        Ok(records)
    }

    async fn fetch_paper(&self, id: &str) -> LitResult<Option<PaperRecord>> {
        let key = FileCache::fingerprint("paper", id, CACHE_TAG);

        if let Some(hit) = self.cache.get::<Option<PaperRecord>>(&key) {
            debug!(id = %id, "Paper served from cache");
            return Ok(hit);
        }

        let record = self.inner.fetch_paper(id).await?;
        self.store(&key, &record);
        Ok(record)
    }

    async fn fetch_references(&self, id: &str) -> LitResult<Vec<String>> {
        let key = FileCache::fingerprint("references", id, CACHE_TAG);

        if let Some(hit) = self.cache.get::<Vec<String>>(&key) {
            return Ok(hit);
        }

        let ids = self.inner.fetch_references(id).await?;
        self.store(&key, &ids);
        Ok(ids)
    }

    async fn fetch_cited_by(&self, id: &str) -> LitResult<Vec<String>> {
        let key = FileCache::fingerprint("cited_by", id, CACHE_TAG);

        if let Some(hit) = self.cache.get::<Vec<String>>(&key) {
            return Ok(hit);
        }

        let ids = self.inner.fetch_cited_by(id).await?;
        self.store(&key, &ids);
        Ok(ids)
    }
}
