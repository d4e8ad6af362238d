//! Semantic Scholar Graph API client implementation

use async_trait::async_trait;
use litscout_core::{ErrorContext, LitError, LitResult, PaperRecord, RateLimiter, SearchConfig};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::SearchProvider;

/// Fields requested for every paper payload
const PAPER_FIELDS: &str = "paperId,externalIds,title,abstract,authors,venue,year,citationCount,url";

/// Client configuration
#[derive(Debug, Clone)]
pub struct SemanticScholarConfig {
    /// API base URL
    pub base_url: String,
    /// API key (optional; unauthenticated access is rate limited harder)
    pub api_key: Option<String>,
    /// Results requested per search query
    pub page_size: usize,
    /// Citation edges requested per paper
    pub edge_limit: usize,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for SemanticScholarConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.semanticscholar.org/graph/v1".to_string(),
            api_key: None,
            page_size: 15,
            edge_limit: 100,
            timeout_seconds: 30,
        }
    }
}

impl SemanticScholarConfig {
    /// Build a client config from the shared search settings
    pub fn from_search_config(config: &SearchConfig, page_size: usize) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            page_size,
            ..Default::default()
        }
    }
}

/// Semantic Scholar API client
pub struct SemanticScholarClient {
    client: reqwest::Client,
    config: SemanticScholarConfig,
    rate_limiter: RateLimiter,
}

// ---- wire format ----

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<PaperPayload>,
}

#[derive(Debug, Deserialize)]
struct PaperPayload {
    #[serde(rename = "paperId")]
    paper_id: Option<String>,
    #[serde(rename = "externalIds")]
    external_ids: Option<ExternalIds>,
    title: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    authors: Vec<AuthorPayload>,
    venue: Option<String>,
    year: Option<i32>,
    #[serde(rename = "citationCount")]
    citation_count: Option<u64>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "ArXiv")]
    arxiv: Option<String>,
    #[serde(rename = "MAG")]
    mag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorPayload {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EdgeResponse {
    #[serde(default)]
    data: Vec<EdgePayload>,
}

#[derive(Debug, Deserialize)]
struct EdgePayload {
    #[serde(rename = "citedPaper")]
    cited_paper: Option<PaperPayload>,
    #[serde(rename = "citingPaper")]
    citing_paper: Option<PaperPayload>,
}

impl PaperPayload {
    /// Resolve a stable identifier: Semantic Scholar ID first, then DOI,
    /// ArXiv, MAG. Payloads with no identifier at all are dropped.
    fn resolve_id(&self) -> Option<String> {
        if let Some(id) = self.paper_id.as_ref().filter(|id| !id.is_empty()) {
            return Some(id.clone());
        }
        let ext = self.external_ids.as_ref()?;
        if let Some(doi) = ext.doi.as_ref().filter(|d| !d.is_empty()) {
            return Some(format!("DOI:{doi}"));
        }
        if let Some(arxiv) = ext.arxiv.as_ref().filter(|a| !a.is_empty()) {
            return Some(format!("ARXIV:{arxiv}"));
        }
        if let Some(mag) = ext.mag.as_ref().filter(|m| !m.is_empty()) {
            return Some(format!("MAG:{mag}"));
        }
        None
    }

    fn into_record(self) -> Option<PaperRecord> {
        let id = self.resolve_id()?;
        let title = self.title.clone().unwrap_or_default();
        if title.trim().is_empty() {
            return None;
        }
        let mut record = PaperRecord::new(id, title);
        record.abstract_text = self.abstract_text;
        record.authors = self.authors.into_iter().filter_map(|a| a.name).collect();
        record.venue = self.venue.filter(|v| !v.is_empty());
        record.year = self.year;
        record.citation_count = self.citation_count;
        record.url = self.url;
        Some(record)
    }
}

// ---- payload parsing, kept free of I/O so it can be tested directly ----

fn parse_search_response(body: &str) -> LitResult<Vec<PaperRecord>> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response
        .data
        .into_iter()
        .filter_map(PaperPayload::into_record)
        .collect())
}

fn parse_paper_response(body: &str) -> LitResult<Option<PaperRecord>> {
    let payload: PaperPayload = serde_json::from_str(body)?;
    Ok(payload.into_record())
}

fn parse_edge_ids(body: &str) -> LitResult<Vec<String>> {
    let response: EdgeResponse = serde_json::from_str(body)?;
    Ok(response
        .data
        .into_iter()
        .filter_map(|edge| edge.cited_paper.or(edge.citing_paper))
        .filter_map(|payload| payload.resolve_id())
        .collect())
}

impl SemanticScholarClient {
    /// Create a new client with its own rate limiter
    pub fn new(config: SemanticScholarConfig, search: &SearchConfig) -> LitResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .user_agent("litscout/0.1")
            .build()
            .map_err(|e| LitError::Network {
                message: format!("Failed to build HTTP client: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("semantic_scholar").with_operation("new"),
            })?;

        info!(base_url = %config.base_url, "Created Semantic Scholar client");

        Ok(Self {
            client,
            config,
            rate_limiter: RateLimiter::new(search.max_concurrent, search.min_interval_ms),
        })
    }

    /// Make a rate-limited GET request and return the body, with API errors
    /// mapped onto the shared error type. A 404 comes back as `Ok(None)`.
    async fn get_request(&self, endpoint: &str) -> LitResult<Option<String>> {
        let _guard = self.rate_limiter.acquire().await?;

        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );

        debug!(url = %url, "Semantic Scholar request");

        let mut request = self.client.get(&url);
        if let Some(ref key) = self.config.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await.map_err(|e| LitError::Network {
            message: format!("Request to Semantic Scholar failed: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("semantic_scholar")
                .with_operation("get_request")
                .with_suggestion("Check network connectivity"),
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            return Err(LitError::RateLimit {
                message: "Semantic Scholar rate limit exceeded".to_string(),
                retry_after_ms,
                context: ErrorContext::new("semantic_scholar")
                    .with_operation("get_request")
                    .with_suggestion("Provide an API key or lower the request rate"),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LitError::Search {
                message: format!("Semantic Scholar returned {}: {}", status, body),
                source: None,
                context: ErrorContext::new("semantic_scholar").with_operation("get_request"),
            });
        }

        let body = response.text().await.map_err(|e| LitError::Network {
            message: format!("Failed to read response body: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("semantic_scholar").with_operation("get_request"),
        })?;

        Ok(Some(body))
    }
}

#[async_trait]
impl SearchProvider for SemanticScholarClient {
    async fn search(
        &self,
        query: &str,
        year_range: Option<(i32, i32)>,
    ) -> LitResult<Vec<PaperRecord>> {
        let mut endpoint = format!(
            "paper/search?query={}&limit={}&fields={}",
            urlencoding::encode(query),
            self.config.page_size,
            PAPER_FIELDS
        );
        if let Some((start, end)) = year_range {
            endpoint.push_str(&format!("&year={start}-{end}"));
        }

        match self.get_request(&endpoint).await? {
            Some(body) => {
                let records = parse_search_response(&body)?;
                info!(query = %query, results = records.len(), "Search completed");
                Ok(records)
            }
            None => {
                warn!(query = %query, "Search endpoint returned 404, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    async fn fetch_paper(&self, id: &str) -> LitResult<Option<PaperRecord>> {
        let endpoint = format!(
            "paper/{}?fields={}",
            urlencoding::encode(id),
            PAPER_FIELDS
        );
        match self.get_request(&endpoint).await? {
            Some(body) => parse_paper_response(&body),
            None => {
                debug!(id = %id, "Paper not found");
                Ok(None)
            }
        }
    }

    async fn fetch_references(&self, id: &str) -> LitResult<Vec<String>> {
        let endpoint = format!(
            "paper/{}/references?fields=paperId,externalIds&limit={}",
            urlencoding::encode(id),
            self.config.edge_limit
        );
        match self.get_request(&endpoint).await? {
            Some(body) => parse_edge_ids(&body),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_cited_by(&self, id: &str) -> LitResult<Vec<String>> {
        let endpoint = format!(
            "paper/{}/citations?fields=paperId,externalIds&limit={}",
            urlencoding::encode(id),
            self.config.edge_limit
        );
        match self.get_request(&endpoint).await? {
            Some(body) => parse_edge_ids(&body),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_payload_is_parsed_into_records() {
        let body = r#"{
            "total": 2,
            "data": [
                {
                    "paperId": "abc123",
                    "title": "Attention Is All You Need",
                    "abstract": "The dominant sequence transduction models...",
                    "authors": [{"authorId": "1", "name": "Ashish Vaswani"}],
                    "venue": "NeurIPS",
                    "year": 2017,
                    "citationCount": 90000,
                    "url": "https://example.org/abc123"
                },
                {
                    "paperId": null,
                    "externalIds": {"DOI": "10.1000/xyz"},
                    "title": "Some DOI-only paper",
                    "authors": []
                }
            ]
        }"#;

        let records = parse_search_response(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "abc123");
        assert_eq!(records[0].authors, vec!["Ashish Vaswani"]);
        assert_eq!(records[0].year, Some(2017));
        assert_eq!(records[1].id, "DOI:10.1000/xyz");
    }

    #[test]
    fn payloads_without_any_identifier_are_dropped() {
        let body = r#"{
            "data": [
                {"paperId": null, "title": "Orphan record"},
                {"paperId": "keep", "title": "Kept record"}
            ]
        }"#;

        let records = parse_search_response(body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "keep");
    }

    #[test]
    fn payloads_without_title_are_dropped() {
        let body = r#"{"data": [{"paperId": "x", "title": "  "}]}"#;
        let records = parse_search_response(body).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn empty_data_array_parses_to_empty() {
        let records = parse_search_response(r#"{"total": 0, "data": []}"#).unwrap();
        assert!(records.is_empty());
        let records = parse_search_response(r#"{"total": 0}"#).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn reference_edges_resolve_identifiers_with_fallback() {
        let body = r#"{
            "data": [
                {"citedPaper": {"paperId": "p1", "title": "First"}},
                {"citedPaper": {"paperId": null, "externalIds": {"ArXiv": "2101.00001"}}},
                {"citedPaper": {"paperId": null}}
            ]
        }"#;

        let ids = parse_edge_ids(body).unwrap();
        assert_eq!(ids, vec!["p1", "ARXIV:2101.00001"]);
    }

    #[test]
    fn citation_edges_use_citing_paper() {
        let body = r#"{"data": [{"citingPaper": {"paperId": "c1", "title": "Citing"}}]}"#;
        let ids = parse_edge_ids(body).unwrap();
        assert_eq!(ids, vec!["c1"]);
    }

    #[test]
    fn single_paper_payload_is_parsed() {
        let body = r#"{
            "paperId": "xyz",
            "title": "BERT",
            "abstract": "We introduce BERT...",
            "authors": [{"name": "Jacob Devlin"}],
            "year": 2019
        }"#;

        let record = parse_paper_response(body).unwrap().unwrap();
        assert_eq!(record.id, "xyz");
        assert_eq!(record.abstract_text.as_deref(), Some("We introduce BERT..."));
    }
}
