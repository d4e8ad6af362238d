//! LLM-based relevance assessment of candidate papers

use litscout_core::{text, FileCache, PaperRecord, ReviewTarget};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::CompletionBackend;

/// One relevance judgement for a candidate paper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceAssessment {
    /// Overall relevance in [0, 1]
    pub relevance: f64,
    /// Scorer confidence in [0, 1]
    pub confidence: f64,
    /// Per-dimension scores as reported by the model
    pub aspects: BTreeMap<String, f64>,
    /// True when scoring failed and this is a placeholder judgement
    pub degraded: bool,
}

impl RelevanceAssessment {
    /// Placeholder returned when scoring fails. Scored low so the paper is
    /// rejected rather than silently accepted.
    fn degraded() -> Self {
        Self {
            relevance: 0.0,
            confidence: 0.0,
            aspects: BTreeMap::new(),
            degraded: true,
        }
    }
}

/// Scores candidate papers against the review target.
///
/// Successful LLM judgements are cached keyed by target, candidate, and
/// model. Degraded judgements are never cached so a later run can retry.
pub struct RelevanceScorer {
    backend: Arc<dyn CompletionBackend>,
    cache: FileCache,
}

impl RelevanceScorer {
    pub fn new(backend: Arc<dyn CompletionBackend>, cache: FileCache) -> Self {
        Self { backend, cache }
    }

    /// Assess how relevant `paper` is to the review target.
    ///
    /// Never fails: papers without an abstract get a title-similarity
    /// heuristic, and LLM failures produce a degraded zero score.
    pub async fn score(&self, target: &ReviewTarget, paper: &PaperRecord) -> RelevanceAssessment {
        let abstract_text = match paper.abstract_text.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => return Self::heuristic_assessment(target, paper),
        };

        let cache_input = format!("{}\x1f{}\x1f{}", target.title, target.abstract_text, paper.id);
        let key = FileCache::fingerprint("score", &cache_input, &self.backend.model_id());

        if let Some(hit) = self.cache.get::<RelevanceAssessment>(&key) {
            debug!(paper = %paper.id, "Relevance assessment served from cache");
            return hit;
        }

        let prompt = build_assessment_prompt(target, &paper.title, abstract_text);

        let response = match self.backend.complete(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!(paper = %paper.id, error = %e, "Relevance scoring failed, degrading");
                return RelevanceAssessment::degraded();
            }
        };

        match parse_assessment(&response) {
            Some(assessment) => {
                if let Err(e) = self.cache.put(&key, &assessment) {
                    e.log();
                }
                assessment
            }
            None => {
                warn!(
                    paper = %paper.id,
                    "Could not parse relevance assessment, degrading"
                );
                RelevanceAssessment::degraded()
            }
        }
    }

    /// Title-only heuristic for papers with no abstract
    fn heuristic_assessment(target: &ReviewTarget, paper: &PaperRecord) -> RelevanceAssessment {
        let similarity = text::title_similarity(&target.title, &paper.title);
        let mut aspects = BTreeMap::new();
        aspects.insert("title_similarity".to_string(), similarity);

        RelevanceAssessment {
            relevance: (similarity * 1.5).min(1.0),
            confidence: 0.3,
            aspects,
            degraded: false,
        }
    }
}

fn build_assessment_prompt(target: &ReviewTarget, title: &str, abstract_text: &str) -> String {
    format!(
        r#"Assess the relevance of the CANDIDATE PAPER to the USER'S RESEARCH.

USER'S RESEARCH:
Title: {}
Abstract: {}

CANDIDATE PAPER:
Title: {}
Abstract: {}

Evaluate the relevance of the candidate paper to the user's research needs across these dimensions:
1. Topical relevance: How closely the subject matter matches
2. Methodological relevance: Similarity in approaches or techniques
3. Contribution relevance: How the findings might inform the user's work
4. Recency/currency: Whether it represents current thinking (if applicable)

Score each dimension from 0.0 to 1.0, where:
- 0.0 = Not relevant at all
- 0.3 = Slightly relevant
- 0.5 = Moderately relevant
- 0.7 = Very relevant
- 1.0 = Extremely relevant

Also provide an overall relevance score and your confidence in the assessment.

Return your evaluation as JSON:
{{
  "overall_relevance": 0.0-1.0,
  "confidence": 0.0-1.0,
  "aspects": {{
    "topical_relevance": 0.0-1.0,
    "methodological_relevance": 0.0-1.0,
    "contribution_relevance": 0.0-1.0,
    "recency_relevance": 0.0-1.0
  }}
}}

Return ONLY the JSON with no additional text."#,
        target.title, target.abstract_text, title, abstract_text
    )
}

/// Extract the JSON object from a model response that may wrap it in prose
/// or markdown fences.
fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&response[start..=end])
}

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Parse a relevance assessment from a model response. Returns `None` when
/// the response has no usable JSON object.
fn parse_assessment(response: &str) -> Option<RelevanceAssessment> {
    let json_str = extract_json_object(response)?;
    let value: Value = serde_json::from_str(json_str).ok()?;

    let relevance = clamp_unit(value.get("overall_relevance")?.as_f64()?);
    let confidence = clamp_unit(value.get("confidence").and_then(Value::as_f64).unwrap_or(0.5));

    let aspects = value
        .get("aspects")
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_f64().map(|score| (k.clone(), clamp_unit(score))))
                .collect()
        })
        .unwrap_or_default();

    Some(RelevanceAssessment {
        relevance,
        confidence,
        aspects,
        degraded: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_assessment_is_parsed() {
        let response = r#"{
            "overall_relevance": 0.85,
            "confidence": 0.9,
            "aspects": {
                "topical_relevance": 0.9,
                "methodological_relevance": 0.7
            }
        }"#;

        let assessment = parse_assessment(response).unwrap();
        assert_eq!(assessment.relevance, 0.85);
        assert_eq!(assessment.confidence, 0.9);
        assert_eq!(assessment.aspects.get("topical_relevance"), Some(&0.9));
        assert!(!assessment.degraded);
    }

    #[test]
    fn json_is_extracted_from_surrounding_prose() {
        let response = "Here is my assessment:\n```json\n{\"overall_relevance\": 0.6, \"confidence\": 0.8}\n```\nLet me know if you need more.";
        let assessment = parse_assessment(response).unwrap();
        assert_eq!(assessment.relevance, 0.6);
        assert!(assessment.aspects.is_empty());
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let response = r#"{"overall_relevance": 1.4, "confidence": -0.2}"#;
        let assessment = parse_assessment(response).unwrap();
        assert_eq!(assessment.relevance, 1.0);
        assert_eq!(assessment.confidence, 0.0);
    }

    #[test]
    fn missing_relevance_fails_to_parse() {
        assert!(parse_assessment(r#"{"confidence": 0.8}"#).is_none());
        assert!(parse_assessment("no json here at all").is_none());
    }

    #[test]
    fn heuristic_scores_by_title_similarity() {
        let target = ReviewTarget::new("Graph neural networks for chemistry", "...");
        let close = PaperRecord::new("a", "Graph neural networks for chemistry");
        let far = PaperRecord::new("b", "Bayesian optimization of wind farms");

        let close_score = RelevanceScorer::heuristic_assessment(&target, &close);
        let far_score = RelevanceScorer::heuristic_assessment(&target, &far);

        assert!(close_score.relevance > far_score.relevance);
        assert_eq!(close_score.confidence, 0.3);
        assert!(!close_score.degraded);
    }
}
