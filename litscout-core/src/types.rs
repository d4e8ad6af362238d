//! Core data structures for the literature discovery pipeline

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// The user's paper that the review is anchored on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewTarget {
    /// Title of the user's paper
    pub title: String,
    /// Abstract of the user's paper
    pub abstract_text: String,
}

impl ReviewTarget {
    pub fn new(title: impl Into<String>, abstract_text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            abstract_text: abstract_text.into(),
        }
    }
}

/// How a candidate paper entered the pipeline (diagnostics only)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DiscoveryStep {
    /// Returned by a keyword search
    Query { query: String, iteration: usize },
    /// Discovered by following a citation edge from an accepted paper
    Expansion { source_id: String, iteration: usize },
}

/// One discovered publication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Stable external identifier (Semantic Scholar ID, DOI, ArXiv ID, ...).
    /// Never changes once assigned.
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    /// Author names in publication order
    pub authors: Vec<String>,
    pub venue: Option<String>,
    pub year: Option<i32>,
    pub citation_count: Option<u64>,
    pub url: Option<String>,
    /// Identifiers of papers this record cites (may be incomplete)
    #[serde(default)]
    pub reference_ids: BTreeSet<String>,
    /// Identifiers of papers citing this record (may be incomplete)
    #[serde(default)]
    pub cited_by_ids: BTreeSet<String>,
    /// Relevance to the review target, absent until scored
    pub relevance_score: Option<f64>,
    /// Scorer confidence in the assessment
    pub score_confidence: Option<f64>,
    /// True when the score came from a fallback path after a scoring failure
    #[serde(default)]
    pub score_degraded: bool,
    /// How this record was found, in order
    #[serde(default)]
    pub discovery_path: Vec<DiscoveryStep>,
}

impl PaperRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            abstract_text: None,
            authors: Vec::new(),
            venue: None,
            year: None,
            citation_count: None,
            url: None,
            reference_ids: BTreeSet::new(),
            cited_by_ids: BTreeSet::new(),
            relevance_score: None,
            score_confidence: None,
            score_degraded: false,
            discovery_path: Vec::new(),
        }
    }

    /// A record with no relevance score is never part of the accepted set
    pub fn is_accepted(&self, threshold: f64) -> bool {
        self.relevance_score
            .map(|score| score >= threshold)
            .unwrap_or(false)
    }
}

/// One search angle produced by the research planner.
/// Consumed once per orchestration iteration, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryStrategy {
    /// Short human-readable name
    pub name: String,
    /// What this strategy focuses on (subtopic, method, application domain)
    pub focus: Option<String>,
    /// The search query string
    pub query: String,
    /// Optional publication year filter
    pub year_range: Option<(i32, i32)>,
}

impl QueryStrategy {
    /// Fallback strategy built directly from the target title
    pub fn from_title(title: &str) -> Self {
        Self {
            name: "Title keywords".to_string(),
            focus: Some("General overview".to_string()),
            query: title.to_string(),
            year_range: None,
        }
    }
}

/// The orchestrator's working collection: identifier -> record, insertion
/// order preserved for reproducible output ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateSet {
    records: Vec<PaperRecord>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record unless its identifier is already present.
    /// Returns true if the record was inserted (first-seen wins).
    pub fn insert(&mut self, record: PaperRecord) -> bool {
        if self.index.contains_key(&record.id) {
            return false;
        }
        self.index.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&PaperRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut PaperRecord> {
        let i = *self.index.get(id)?;
        Some(&mut self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &PaperRecord> {
        self.records.iter()
    }

    /// Accepted records in insertion order
    pub fn accepted(&self, threshold: f64) -> Vec<&PaperRecord> {
        self.records
            .iter()
            .filter(|r| r.is_accepted(threshold))
            .collect()
    }

    pub fn accepted_count(&self, threshold: f64) -> usize {
        self.records
            .iter()
            .filter(|r| r.is_accepted(threshold))
            .count()
    }

    /// Final output: accepted records ranked by score descending, ties broken
    /// by earliest discovery order, truncated to `limit`.
    pub fn into_ranked(self, threshold: f64, limit: usize) -> Vec<PaperRecord> {
        let mut accepted: Vec<PaperRecord> = self
            .records
            .into_iter()
            .filter(|r| r.is_accepted(threshold))
            .collect();
        // stable sort keeps insertion order between equal scores
        accepted.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        accepted.truncate(limit);
        accepted
    }

    /// Rebuild the identifier index after deserialization
    pub fn rebuild_index(&mut self) {
        self.index = self
            .records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
    }
}
