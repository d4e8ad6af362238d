//! The iterative review engine
//!
//! Drives the full discovery loop: plan, search, deduplicate, score, expand,
//! and converge on a ranked set of relevant papers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use litscout_core::{
    retry_async, process_concurrently, CandidateSet, DiscoveryStep, LitResult, PaperRecord,
    RetryConfig, ReviewOptions, ReviewTarget,
};
use litscout_llm::{RelevanceScorer, ResearchPlanner};
use litscout_search::SearchProvider;
use tracing::{info, warn};

use crate::dedup::Deduplicator;
use crate::expand::CitationExpander;
use crate::types::{ReviewContext, ReviewOutcome, ReviewProgress, ReviewStage};
use crate::{AgentError, AgentResult};

/// Orchestrates one literature review from target paper to ranked output.
///
/// The engine owns no I/O itself; search and scoring go through the injected
/// provider and scorer, which makes the whole loop testable with stubs.
pub struct ReviewEngine {
    provider: Arc<dyn SearchProvider>,
    planner: ResearchPlanner,
    scorer: Arc<RelevanceScorer>,
    options: ReviewOptions,
    retry: RetryConfig,
    cancel: Arc<AtomicBool>,
}

impl ReviewEngine {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        planner: ResearchPlanner,
        scorer: RelevanceScorer,
        options: ReviewOptions,
    ) -> Self {
        Self {
            provider,
            planner,
            scorer: Arc::new(scorer),
            options,
            retry: RetryConfig::default(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Override the retry policy for external calls
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Handle that aborts the run when set. The engine checks it before
    /// every external call and finishes with whatever it has accepted.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Run the full review loop for `target`
    pub async fn run(&self, target: ReviewTarget) -> AgentResult<ReviewOutcome> {
        if target.title.trim().is_empty() {
            return Err(AgentError::Review {
                message: "Review target has an empty title".to_string(),
            });
        }

        let mut progress = ReviewProgress::new();
        progress.add_status(format!("Planning review for '{}'", target.title));

        let plan = self.planner.plan(&target, self.options.max_strategies).await;
        progress.add_status(format!(
            "Plan ready: {} strategies, {} keywords",
            plan.strategies.len(),
            plan.keywords.len()
        ));

        let mut ctx = ReviewContext {
            target,
            plan,
            candidates: CandidateSet::new(),
            progress,
        };

        let mut strategies: VecDeque<_> = ctx.plan.strategies.clone().into();
        let threshold = self.options.relevance_threshold;

        for iteration in 1..=self.options.max_iterations {
            if self.is_cancelled() {
                ctx.progress.add_status("Review cancelled");
                break;
            }

            ctx.progress.iteration = iteration;

            if let Some(strategy) = strategies.pop_front() {
                ctx.progress
                    .add_status(format!("Iteration {}: strategy '{}'", iteration, strategy.name));
                self.run_strategy(&mut ctx, &strategy.query, strategy.year_range, iteration)
                    .await?;
            }

            let accepted = ctx.candidates.accepted_count(threshold);
            if accepted >= self.options.num_papers {
                ctx.progress.add_status(format!(
                    "Target of {} papers reached with {} accepted",
                    self.options.num_papers, accepted
                ));
                break;
            }

            let mut expansion_added = 0;
            if self.options.expand_references && !self.is_cancelled() {
                expansion_added = self.run_expansion(&mut ctx, iteration).await?;
                if ctx.candidates.accepted_count(threshold) >= self.options.num_papers {
                    ctx.progress.add_status("Target reached after expansion");
                    break;
                }
            }

            if strategies.is_empty() && expansion_added == 0 {
                ctx.progress
                    .add_status("No strategies left and expansion found nothing new");
                break;
            }
        }

        let ReviewContext {
            target,
            plan,
            candidates,
            mut progress,
        } = ctx;

        progress.accepted = candidates.accepted_count(threshold);
        progress.finish();
        progress.add_status(format!(
            "Review finished: {} accepted of {} candidates",
            progress.accepted,
            candidates.len()
        ));

        let papers = candidates.into_ranked(threshold, self.options.num_papers);

        Ok(ReviewOutcome {
            target,
            plan,
            papers,
            progress,
        })
    }

    /// Execute one search strategy: refine the query after the first
    /// iteration, search, deduplicate, and score.
    async fn run_strategy(
        &self,
        ctx: &mut ReviewContext,
        base_query: &str,
        strategy_years: Option<(i32, i32)>,
        iteration: usize,
    ) -> AgentResult<()> {
        let query = if iteration > 1 {
            let found_titles: Vec<String> = ctx
                .candidates
                .accepted(self.options.relevance_threshold)
                .iter()
                .map(|r| r.title.clone())
                .collect();
            self.planner
                .refine_query(&ctx.target, base_query, &found_titles, iteration)
                .await
        } else {
            base_query.to_string()
        };

        let year_range = strategy_years.or_else(|| self.options.year_range());

        ctx.progress.stage = ReviewStage::Searching;
        ctx.progress.record_query(&query);

        if self.is_cancelled() {
            return Ok(());
        }

        let batch = match self.search_with_retry(&query, year_range).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!(query = %query, error = %e, "Search failed after retries, skipping query");
                ctx.progress.skipped_queries += 1;
                ctx.progress
                    .add_status(format!("Skipped failing query '{}'", query));
                return Ok(());
            }
        };

        info!(query = %query, results = batch.len(), "Search returned");

        let dedup = Deduplicator::new(
            self.options.duplicate_threshold,
            self.options.keep_duplicates,
        );
        let (mut fresh, dropped) = dedup.filter_new(batch, &ctx.candidates);
        ctx.progress.duplicates_dropped += dropped;

        for record in &mut fresh {
            record.discovery_path.push(DiscoveryStep::Query {
                query: query.clone(),
                iteration,
            });
        }

        self.score_batch(ctx, fresh).await?;
        Ok(())
    }

    /// One citation expansion pass. Returns how many new candidates entered
    /// the set.
    async fn run_expansion(&self, ctx: &mut ReviewContext, iteration: usize) -> AgentResult<usize> {
        ctx.progress.stage = ReviewStage::Expanding;

        let expander = CitationExpander::new(
            self.options.max_expand_papers,
            self.options.max_edges_per_paper,
        );

        let source_ids: Vec<String> = expander
            .pick_sources(&ctx.candidates.accepted(self.options.relevance_threshold))
            .iter()
            .map(|r| r.id.clone())
            .collect();

        if source_ids.is_empty() {
            return Ok(0);
        }

        // fill in citation edges for sources that don't have them yet
        for id in &source_ids {
            if self.is_cancelled() {
                return Ok(0);
            }
            let needs_edges = ctx
                .candidates
                .get(id)
                .map(|r| r.reference_ids.is_empty() && r.cited_by_ids.is_empty())
                .unwrap_or(false);
            if !needs_edges {
                continue;
            }

            let references = self.fetch_edges_with_retry(id, EdgeKind::References).await;
            let cited_by = self.fetch_edges_with_retry(id, EdgeKind::CitedBy).await;

            match (references, cited_by) {
                (Ok(refs), Ok(cites)) => {
                    if let Some(record) = ctx.candidates.get_mut(id) {
                        record.reference_ids = refs.into_iter().collect();
                        record.cited_by_ids = cites.into_iter().collect();
                    }
                }
                (refs, cites) => {
                    if let Err(e) = refs.and(cites) {
                        warn!(id = %id, error = %e, "Could not fetch citation edges, skipping source");
                    }
                }
            }
        }

        let sources: Vec<&PaperRecord> = source_ids
            .iter()
            .filter_map(|id| ctx.candidates.get(id))
            .collect();
        let frontier = expander.frontier(&sources, &ctx.candidates);
        drop(sources);

        if frontier.is_empty() {
            return Ok(0);
        }

        ctx.progress.add_status(format!(
            "Expanding {} citation edges from {} papers",
            frontier.len(),
            source_ids.len()
        ));

        let mut batch = Vec::new();
        for (candidate_id, source_id) in frontier {
            if self.is_cancelled() {
                break;
            }
            match self.fetch_paper_with_retry(&candidate_id).await {
                Ok(Some(mut record)) => {
                    record.discovery_path.push(DiscoveryStep::Expansion {
                        source_id,
                        iteration,
                    });
                    batch.push(record);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(id = %candidate_id, error = %e, "Could not fetch expansion candidate");
                }
            }
        }

        let dedup = Deduplicator::new(
            self.options.duplicate_threshold,
            self.options.keep_duplicates,
        );
        let (fresh, dropped) = dedup.filter_new(batch, &ctx.candidates);
        ctx.progress.duplicates_dropped += dropped;

        let added = self.score_batch(ctx, fresh).await?;
        Ok(added)
    }

    /// Score a deduplicated batch with bounded concurrency and insert the
    /// results in batch order. Returns how many records were inserted.
    async fn score_batch(
        &self,
        ctx: &mut ReviewContext,
        records: Vec<PaperRecord>,
    ) -> AgentResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        ctx.progress.stage = ReviewStage::Scoring;

        let scorer = self.scorer.clone();
        let target = Arc::new(ctx.target.clone());
        let indexed: Vec<(usize, PaperRecord)> = records.into_iter().enumerate().collect();

        let results = process_concurrently(
            indexed,
            self.options.max_concurrent_scores,
            move |(index, record)| {
                let scorer = scorer.clone();
                let target = target.clone();
                async move {
                    let assessment = scorer.score(&target, &record).await;
                    Ok((index, record, assessment))
                }
            },
        )
        .await;

        let mut scored = Vec::with_capacity(results.len());
        for result in results {
            scored.push(result?);
        }
        // concurrency scrambles completion order; restore batch order so
        // insertion order stays deterministic
        scored.sort_by_key(|(index, _, _)| *index);

        let mut inserted = 0;
        for (_, mut record, assessment) in scored {
            record.relevance_score = Some(assessment.relevance);
            record.score_confidence = Some(assessment.confidence);
            record.score_degraded = assessment.degraded;
            if assessment.degraded {
                ctx.progress.degraded_scores += 1;
            }
            if ctx.candidates.insert(record) {
                ctx.progress.candidates_seen += 1;
                inserted += 1;
            }
        }

        ctx.progress.accepted = ctx
            .candidates
            .accepted_count(self.options.relevance_threshold);
        Ok(inserted)
    }

    async fn search_with_retry(
        &self,
        query: &str,
        year_range: Option<(i32, i32)>,
    ) -> LitResult<Vec<PaperRecord>> {
        let provider = self.provider.clone();
        let query = query.to_string();
        retry_async(
            move || {
                let provider = provider.clone();
                let query = query.clone();
                Box::pin(async move { provider.search(&query, year_range).await })
            },
            &self.retry,
            "search",
        )
        .await
    }

    async fn fetch_paper_with_retry(&self, id: &str) -> LitResult<Option<PaperRecord>> {
        let provider = self.provider.clone();
        let id = id.to_string();
        retry_async(
            move || {
                let provider = provider.clone();
                let id = id.clone();
                Box::pin(async move { provider.fetch_paper(&id).await })
            },
            &self.retry,
            "fetch_paper",
        )
        .await
    }

    async fn fetch_edges_with_retry(&self, id: &str, kind: EdgeKind) -> LitResult<Vec<String>> {
        let provider = self.provider.clone();
        let id = id.to_string();
        retry_async(
            move || {
                let provider = provider.clone();
                let id = id.clone();
                Box::pin(async move {
                    match kind {
                        EdgeKind::References => provider.fetch_references(&id).await,
                        EdgeKind::CitedBy => provider.fetch_cited_by(&id).await,
                    }
                })
            },
            &self.retry,
            "fetch_edges",
        )
        .await
    }
}

#[derive(Debug, Clone, Copy)]
enum EdgeKind {
    References,
    CitedBy,
}
