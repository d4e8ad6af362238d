//! Review session state and progress reporting

use chrono::{DateTime, Utc};
use litscout_core::{CandidateSet, PaperRecord, ReviewTarget};
use litscout_llm::ResearchPlan;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Where the review currently is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStage {
    Planning,
    Searching,
    Scoring,
    Expanding,
    Done,
}

impl std::fmt::Display for ReviewStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReviewStage::Planning => "planning",
            ReviewStage::Searching => "searching",
            ReviewStage::Scoring => "scoring",
            ReviewStage::Expanding => "expanding",
            ReviewStage::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// Diagnostics accumulated over a review run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewProgress {
    pub stage: ReviewStage,
    pub iteration: usize,
    /// Unique candidates seen across all iterations
    pub candidates_seen: usize,
    pub accepted: usize,
    /// Records dropped as near-duplicate titles
    pub duplicates_dropped: usize,
    /// Search queries that failed after retries and were skipped
    pub skipped_queries: usize,
    /// Papers whose relevance scoring failed and was degraded
    pub degraded_scores: usize,
    /// Every query issued, in order
    pub queries_run: Vec<String>,
    /// Human-readable status trail
    pub status_log: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ReviewProgress {
    pub fn new() -> Self {
        Self {
            stage: ReviewStage::Planning,
            iteration: 0,
            candidates_seen: 0,
            accepted: 0,
            duplicates_dropped: 0,
            skipped_queries: 0,
            degraded_scores: 0,
            queries_run: Vec::new(),
            status_log: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Append a status message and log it
    pub fn add_status(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(
            stage = %self.stage,
            iteration = self.iteration,
            "{}", message
        );
        self.status_log.push(message);
    }

    pub fn record_query(&mut self, query: &str) {
        self.queries_run.push(query.to_string());
    }

    pub fn finish(&mut self) {
        self.stage = ReviewStage::Done;
        self.finished_at = Some(Utc::now());
    }

    /// Render a diagnostics section for the report
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("## Review diagnostics\n\n");
        out.push_str(&format!("- Iterations: {}\n", self.iteration));
        out.push_str(&format!("- Candidates seen: {}\n", self.candidates_seen));
        out.push_str(&format!("- Papers accepted: {}\n", self.accepted));
        out.push_str(&format!(
            "- Near-duplicates dropped: {}\n",
            self.duplicates_dropped
        ));
        out.push_str(&format!("- Queries skipped: {}\n", self.skipped_queries));
        out.push_str(&format!("- Degraded scores: {}\n", self.degraded_scores));
        if !self.queries_run.is_empty() {
            out.push_str("\n### Queries\n\n");
            for (i, query) in self.queries_run.iter().enumerate() {
                out.push_str(&format!("{}. `{}`\n", i + 1, query));
            }
        }
        out
    }
}

impl Default for ReviewProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable state threaded through one review run
#[derive(Debug, Clone)]
pub struct ReviewContext {
    pub target: ReviewTarget,
    pub plan: ResearchPlan,
    pub candidates: CandidateSet,
    pub progress: ReviewProgress,
}

/// The final product of a review run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub target: ReviewTarget,
    pub plan: ResearchPlan,
    /// Accepted papers, ranked by relevance descending
    pub papers: Vec<PaperRecord>,
    pub progress: ReviewProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_markdown_lists_queries() {
        let mut progress = ReviewProgress::new();
        progress.iteration = 2;
        progress.record_query("first query");
        progress.record_query("second query");

        let md = progress.to_markdown();
        assert!(md.contains("Iterations: 2"));
        assert!(md.contains("1. `first query`"));
        assert!(md.contains("2. `second query`"));
    }

    #[test]
    fn finish_stamps_the_end_time() {
        let mut progress = ReviewProgress::new();
        assert!(progress.finished_at.is_none());
        progress.finish();
        assert_eq!(progress.stage, ReviewStage::Done);
        assert!(progress.finished_at.is_some());
    }
}
