//! Shared stubs for engine tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use litscout_core::{ErrorContext, LitError, LitResult, PaperRecord};
use litscout_llm::CompletionBackend;
use litscout_search::SearchProvider;

/// Build a candidate paper with an abstract so it takes the LLM scoring path
pub fn candidate(id: &str, title: &str) -> PaperRecord {
    let mut record = PaperRecord::new(id, title);
    record.abstract_text = Some(format!("Abstract of {title}"));
    record
}

/// Completion backend stub keyed on prompt markers.
///
/// Plans come from the configured strategy list, relevance scores from a
/// title-to-score map, and refinement returns a fixed query.
pub struct StubBackend {
    /// (name, query) pairs emitted as the research plan
    pub strategies: Vec<(String, String)>,
    /// Candidate title fragment -> (relevance, confidence)
    pub scores: HashMap<String, (f64, f64)>,
    /// Query returned for refinement requests
    pub refined_query: String,
    /// All completion calls
    pub calls: AtomicUsize,
    /// When set, scoring requests fail
    pub fail_scoring: bool,
}

impl StubBackend {
    pub fn new(strategies: &[(&str, &str)]) -> Self {
        Self {
            strategies: strategies
                .iter()
                .map(|(name, query)| (name.to_string(), query.to_string()))
                .collect(),
            scores: HashMap::new(),
            refined_query: "refined query".to_string(),
            calls: AtomicUsize::new(0),
            fail_scoring: false,
        }
    }

    pub fn with_score(mut self, title_fragment: &str, relevance: f64, confidence: f64) -> Self {
        self.scores
            .insert(title_fragment.to_string(), (relevance, confidence));
        self
    }

    pub fn failing_scorer(mut self) -> Self {
        self.fail_scoring = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn plan_json(&self) -> String {
        let strategies: Vec<String> = self
            .strategies
            .iter()
            .map(|(name, query)| {
                format!(r#"{{"name": "{name}", "focus": "test", "query": "{query}"}}"#)
            })
            .collect();
        format!(
            r#"{{
                "research_questions": ["What is known?"],
                "keywords": ["stub"],
                "focus_areas": ["testing"],
                "search_strategies": [{}]
            }}"#,
            strategies.join(",")
        )
    }
}

#[async_trait]
impl CompletionBackend for StubBackend {
    async fn complete(&self, prompt: &str) -> LitResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if prompt.contains("Generate a comprehensive research plan") {
            return Ok(self.plan_json());
        }

        if prompt.contains("Create an improved search query") {
            return Ok(self.refined_query.clone());
        }

        if prompt.contains("Assess the relevance of the CANDIDATE PAPER") {
            if self.fail_scoring {
                return Err(LitError::Llm {
                    message: "stub scoring failure".to_string(),
                    provider: Some("stub".to_string()),
                    model: Some("model".to_string()),
                    context: ErrorContext::new("stub_backend"),
                });
            }

            let (relevance, confidence) = self
                .scores
                .iter()
                .find(|(fragment, _)| prompt.contains(fragment.as_str()))
                .map(|(_, scores)| *scores)
                .unwrap_or((0.5, 0.5));

            return Ok(format!(
                r#"{{"overall_relevance": {relevance}, "confidence": {confidence}, "aspects": {{}}}}"#
            ));
        }

        Ok("unexpected prompt".to_string())
    }

    fn model_id(&self) -> String {
        "stub/model".to_string()
    }
}

/// Search provider stub backed by in-memory maps
pub struct StubSearch {
    /// Query -> results; unknown queries fall back to `default_results`
    pub results: HashMap<String, Vec<PaperRecord>>,
    pub default_results: Vec<PaperRecord>,
    /// Paper id -> record, for expansion fetches
    pub papers: HashMap<String, PaperRecord>,
    pub references: HashMap<String, Vec<String>>,
    pub cited_by: HashMap<String, Vec<String>>,
    pub search_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    /// When set, every search fails with a rate limit error
    pub always_rate_limited: bool,
}

impl StubSearch {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            default_results: Vec::new(),
            papers: HashMap::new(),
            references: HashMap::new(),
            cited_by: HashMap::new(),
            search_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            always_rate_limited: false,
        }
    }

    pub fn with_results(mut self, query: &str, records: Vec<PaperRecord>) -> Self {
        self.results.insert(query.to_string(), records);
        self
    }

    pub fn with_default_results(mut self, records: Vec<PaperRecord>) -> Self {
        self.default_results = records;
        self
    }

    pub fn with_paper(mut self, record: PaperRecord) -> Self {
        self.papers.insert(record.id.clone(), record);
        self
    }

    pub fn with_references(mut self, id: &str, refs: &[&str]) -> Self {
        self.references
            .insert(id.to_string(), refs.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn rate_limited(mut self) -> Self {
        self.always_rate_limited = true;
        self
    }

    pub fn search_count(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for StubSearch {
    async fn search(
        &self,
        query: &str,
        _year_range: Option<(i32, i32)>,
    ) -> LitResult<Vec<PaperRecord>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        if self.always_rate_limited {
            return Err(LitError::RateLimit {
                message: "stub rate limit".to_string(),
                retry_after_ms: Some(1),
                context: ErrorContext::new("stub_search"),
            });
        }

        Ok(self
            .results
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.default_results.clone()))
    }

    async fn fetch_paper(&self, id: &str) -> LitResult<Option<PaperRecord>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.papers.get(id).cloned())
    }

    async fn fetch_references(&self, id: &str) -> LitResult<Vec<String>> {
        Ok(self.references.get(id).cloned().unwrap_or_default())
    }

    async fn fetch_cited_by(&self, id: &str) -> LitResult<Vec<String>> {
        Ok(self.cited_by.get(id).cloned().unwrap_or_default())
    }
}
