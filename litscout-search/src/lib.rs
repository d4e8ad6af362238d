//! Litscout Search - Academic search API clients
//!
//! Provides the [`SearchProvider`] abstraction over paper discovery APIs,
//! a Semantic Scholar implementation, and a caching wrapper.

pub mod cached;
pub mod semantic_scholar;

pub use cached::CachedSearch;
pub use semantic_scholar::{SemanticScholarClient, SemanticScholarConfig};

use async_trait::async_trait;
use litscout_core::{LitResult, PaperRecord};

/// Abstraction over an academic search backend.
///
/// Implementations return bare records: no relevance scores, no discovery
/// path. The orchestration layer owns both.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Keyword search, optionally restricted to an inclusive year range.
    /// A query with no results is `Ok(vec![])`, not an error.
    async fn search(
        &self,
        query: &str,
        year_range: Option<(i32, i32)>,
    ) -> LitResult<Vec<PaperRecord>>;

    /// Fetch a single paper by identifier. Unknown identifiers are `Ok(None)`.
    async fn fetch_paper(&self, id: &str) -> LitResult<Option<PaperRecord>>;

    /// Identifiers of papers referenced by the given paper
    async fn fetch_references(&self, id: &str) -> LitResult<Vec<String>>;

    /// Identifiers of papers citing the given paper
    async fn fetch_cited_by(&self, id: &str) -> LitResult<Vec<String>>;
}
