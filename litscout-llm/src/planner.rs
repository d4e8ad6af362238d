//! Research plan generation and query refinement

use litscout_core::{FileCache, QueryStrategy, ReviewTarget};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::CompletionBackend;

/// A generated plan for the literature search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchPlan {
    /// Research questions derived from the target paper
    pub research_questions: Vec<String>,
    /// Keywords useful for searching
    pub keywords: Vec<String>,
    /// Focus areas for the review
    pub focus_areas: Vec<String>,
    /// Search strategies, consumed one per iteration
    pub strategies: Vec<QueryStrategy>,
}

impl ResearchPlan {
    /// Minimal plan used when generation fails: one strategy built from the
    /// target title.
    pub fn fallback(target: &ReviewTarget) -> Self {
        Self {
            research_questions: vec![
                "What are the key findings in this research area?".to_string()
            ],
            keywords: Vec::new(),
            focus_areas: vec!["General overview of the field".to_string()],
            strategies: vec![QueryStrategy::from_title(&target.title)],
        }
    }
}

/// Generates search strategies from the review target and refines queries
/// between iterations.
///
/// Plans and refinements are cached; failures fall back to deterministic
/// defaults instead of aborting the review.
pub struct ResearchPlanner {
    backend: Arc<dyn CompletionBackend>,
    cache: FileCache,
}

impl ResearchPlanner {
    pub fn new(backend: Arc<dyn CompletionBackend>, cache: FileCache) -> Self {
        Self { backend, cache }
    }

    /// Generate a research plan with at most `max_strategies` strategies
    pub async fn plan(&self, target: &ReviewTarget, max_strategies: usize) -> ResearchPlan {
        let cache_input = format!(
            "{}\x1f{}\x1f{}",
            target.title, target.abstract_text, max_strategies
        );
        let key = FileCache::fingerprint("plan", &cache_input, &self.backend.model_id());

        if let Some(hit) = self.cache.get::<ResearchPlan>(&key) {
            debug!("Research plan served from cache");
            return hit;
        }

        let prompt = build_plan_prompt(target);

        let response = match self.backend.complete(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Plan generation failed, using title fallback");
                return ResearchPlan::fallback(target);
            }
        };

        match parse_plan(&response, max_strategies) {
            Some(plan) => {
                info!(
                    strategies = plan.strategies.len(),
                    keywords = plan.keywords.len(),
                    "Research plan generated"
                );
                if let Err(e) = self.cache.put(&key, &plan) {
                    e.log();
                }
                plan
            }
            None => {
                warn!("Could not parse research plan, using title fallback");
                ResearchPlan::fallback(target)
            }
        }
    }

    /// Refine a search query based on what previous iterations found.
    /// Returns the original query when refinement fails.
    pub async fn refine_query(
        &self,
        target: &ReviewTarget,
        original_query: &str,
        found_titles: &[String],
        iteration: usize,
    ) -> String {
        let cache_input = format!(
            "{}\x1f{}\x1f{}\x1f{}",
            target.title,
            original_query,
            iteration,
            found_titles.join("\x1e")
        );
        let key = FileCache::fingerprint("refine", &cache_input, &self.backend.model_id());

        if let Some(hit) = self.cache.get::<String>(&key) {
            debug!(query = %hit, "Refined query served from cache");
            return hit;
        }

        let prompt = build_refine_prompt(target, original_query, found_titles, iteration);

        let response = match self.backend.complete(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Query refinement failed, keeping original query");
                return original_query.to_string();
            }
        };

        let refined = clean_refined_query(&response);
        if refined.is_empty() {
            warn!("Refined query was empty, keeping original query");
            return original_query.to_string();
        }

        debug!(original = %original_query, refined = %refined, "Query refined");
        if let Err(e) = self.cache.put(&key, &refined) {
            e.log();
        }
        refined
    }
}

fn build_plan_prompt(target: &ReviewTarget) -> String {
    format!(
        r#"You are a research assistant helping to create a literature review. You need to generate a research plan based on a paper title and abstract.

USER'S PAPER:
Title: {}
Abstract: {}

Generate a comprehensive research plan that includes:
1. 3-5 specific research questions derived from the user's paper
2. 5-8 relevant keywords that will be useful for searching
3. 3-4 specific focus areas for the literature review
4. 3-4 search strategies, each with a specific focus and query

Format your response as JSON with the following structure:
{{
  "research_questions": ["question1", "question2", ...],
  "keywords": ["keyword1", "keyword2", ...],
  "focus_areas": ["area1", "area2", ...],
  "search_strategies": [
    {{
      "name": "Strategy name",
      "focus": "What this strategy focuses on",
      "query": "The search query to use"
    }},
    ...
  ]
}}

Return ONLY valid JSON without markdown formatting, explanation, or any other text."#,
        target.title, target.abstract_text
    )
}

fn build_refine_prompt(
    target: &ReviewTarget,
    original_query: &str,
    found_titles: &[String],
    iteration: usize,
) -> String {
    let mut prev_papers = String::new();
    for (i, title) in found_titles.iter().take(5).enumerate() {
        prev_papers.push_str(&format!("{}. {}\n", i + 1, title));
    }
    if found_titles.len() > 5 {
        prev_papers.push_str(&format!("...and {} more papers\n", found_titles.len() - 5));
    }

    format!(
        r#"You are an expert research assistant helping with a literature review search.

RESEARCH FOCUS:
Title: {}
Abstract: {}

PREVIOUS SEARCH QUERY:
{}

PAPERS ALREADY FOUND ({} total):
{}

ITERATION: {} (higher iterations should be more exploratory/divergent from initial query)

TASK:
Create an improved search query that will help find additional relevant papers.
Your new query should:
1. Be more specific or use different terms based on what's been found so far
2. Address gaps in the current results
3. Use highly specific technical terms where appropriate
4. Not exceed 200 characters

Return ONLY the new search query with no explanation or additional text."#,
        target.title,
        target.abstract_text,
        original_query,
        found_titles.len(),
        prev_papers,
        iteration
    )
}

/// Strip quoting and fences from a refined-query response and keep the first
/// non-empty line.
fn clean_refined_query(response: &str) -> String {
    response
        .lines()
        .map(|line| line.trim().trim_matches('`').trim_matches('"').trim())
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .chars()
        .take(200)
        .collect()
}

fn string_array(value: &Value, field: &str) -> Vec<String> {
    value
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Parse a research plan from a model response. Returns `None` when no
/// usable strategy can be extracted.
fn parse_plan(response: &str, max_strategies: usize) -> Option<ResearchPlan> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }

    let value: Value = serde_json::from_str(&response[start..=end]).ok()?;

    let mut strategies: Vec<QueryStrategy> = value
        .get("search_strategies")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let query = item.get("query")?.as_str()?.trim();
                    if query.is_empty() {
                        return None;
                    }
                    Some(QueryStrategy {
                        name: item
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or("Unnamed strategy")
                            .to_string(),
                        focus: item
                            .get("focus")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        query: query.to_string(),
                        year_range: None,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    if strategies.is_empty() {
        return None;
    }
    strategies.truncate(max_strategies);

    Some(ResearchPlan {
        research_questions: string_array(&value, "research_questions"),
        keywords: string_array(&value, "keywords"),
        focus_areas: string_array(&value, "focus_areas"),
        strategies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_with_strategies_is_parsed() {
        let response = r#"{
            "research_questions": ["What methods exist?"],
            "keywords": ["graph neural networks", "molecules"],
            "focus_areas": ["Methods"],
            "search_strategies": [
                {"name": "Core methods", "focus": "Architectures", "query": "graph neural network molecular property"},
                {"name": "Applications", "focus": "Chemistry", "query": "GNN drug discovery"}
            ]
        }"#;

        let plan = parse_plan(response, 4).unwrap();
        assert_eq!(plan.strategies.len(), 2);
        assert_eq!(plan.strategies[0].name, "Core methods");
        assert_eq!(plan.keywords.len(), 2);
    }

    #[test]
    fn strategies_are_truncated_to_limit() {
        let response = r#"{
            "search_strategies": [
                {"name": "a", "query": "q1"},
                {"name": "b", "query": "q2"},
                {"name": "c", "query": "q3"}
            ]
        }"#;

        let plan = parse_plan(response, 2).unwrap();
        assert_eq!(plan.strategies.len(), 2);
    }

    #[test]
    fn empty_or_missing_strategies_fail_to_parse() {
        assert!(parse_plan(r#"{"search_strategies": []}"#, 4).is_none());
        assert!(parse_plan(r#"{"keywords": ["x"]}"#, 4).is_none());
        assert!(parse_plan("not json", 4).is_none());
    }

    #[test]
    fn strategies_without_queries_are_dropped() {
        let response = r#"{
            "search_strategies": [
                {"name": "empty", "query": "   "},
                {"name": "ok", "query": "real query"}
            ]
        }"#;

        let plan = parse_plan(response, 4).unwrap();
        assert_eq!(plan.strategies.len(), 1);
        assert_eq!(plan.strategies[0].query, "real query");
    }

    #[test]
    fn refined_query_is_cleaned() {
        assert_eq!(
            clean_refined_query("```\n\"transformer attention AND efficiency\"\n```"),
            "transformer attention AND efficiency"
        );
        assert_eq!(clean_refined_query("   \n  \n"), "");
    }

    #[test]
    fn fallback_plan_uses_the_target_title() {
        let target = ReviewTarget::new("My paper title", "My abstract");
        let plan = ResearchPlan::fallback(&target);
        assert_eq!(plan.strategies.len(), 1);
        assert_eq!(plan.strategies[0].query, "My paper title");
    }
}
