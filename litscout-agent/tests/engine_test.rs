//! End-to-end tests for the review engine with stubbed search and LLM layers

mod support;

use std::sync::Arc;

use litscout_agent::{ReviewEngine, ReviewStage};
use litscout_core::{DiscoveryStep, FileCache, RetryConfig, ReviewOptions, ReviewTarget};
use litscout_llm::{RelevanceScorer, ResearchPlanner};

use support::{candidate, StubBackend, StubSearch};

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 2,
        initial_delay_ms: 1,
        max_delay_ms: 2,
        backoff_multiplier: 2.0,
        jitter: false,
    }
}

fn build_engine(
    provider: Arc<StubSearch>,
    backend: Arc<StubBackend>,
    options: ReviewOptions,
) -> ReviewEngine {
    let planner = ResearchPlanner::new(backend.clone(), FileCache::disabled());
    let scorer = RelevanceScorer::new(backend, FileCache::disabled());
    ReviewEngine::new(provider, planner, scorer, options).with_retry_config(fast_retry())
}

fn target() -> ReviewTarget {
    ReviewTarget::new(
        "Graph neural networks for molecular property prediction",
        "We study message passing architectures on molecular graphs.",
    )
}

#[tokio::test]
async fn papers_below_threshold_are_rejected_and_output_is_ranked() {
    let provider = Arc::new(StubSearch::new().with_results(
        "gnn molecules",
        vec![
            candidate("p1", "Strong match one"),
            candidate("p2", "Weak match"),
            candidate("p3", "Strong match two"),
        ],
    ));
    let backend = Arc::new(
        StubBackend::new(&[("Core", "gnn molecules")])
            .with_score("Strong match one", 0.95, 0.9)
            .with_score("Weak match", 0.4, 0.9)
            .with_score("Strong match two", 0.92, 0.9),
    );

    let options = ReviewOptions {
        relevance_threshold: 0.9,
        num_papers: 10,
        expand_references: false,
        ..Default::default()
    };

    let outcome = build_engine(provider, backend, options)
        .run(target())
        .await
        .unwrap();

    let ids: Vec<&str> = outcome.papers.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p3"]);
    assert_eq!(outcome.papers[0].relevance_score, Some(0.95));
    assert_eq!(outcome.progress.candidates_seen, 3);
    assert_eq!(outcome.progress.accepted, 2);
    assert_eq!(outcome.progress.stage, ReviewStage::Done);
}

#[tokio::test]
async fn near_duplicate_titles_are_dropped() {
    let provider = Arc::new(StubSearch::new().with_results(
        "gnn molecules",
        vec![
            candidate("p1", "Attention Is All You Need"),
            candidate("p2", "attention is all you need!"),
        ],
    ));
    let backend = Arc::new(
        StubBackend::new(&[("Core", "gnn molecules")]).with_score("Attention", 0.9, 0.9),
    );

    let options = ReviewOptions {
        relevance_threshold: 0.5,
        expand_references: false,
        ..Default::default()
    };

    let outcome = build_engine(provider, backend, options)
        .run(target())
        .await
        .unwrap();

    assert_eq!(outcome.papers.len(), 1);
    assert_eq!(outcome.papers[0].id, "p1");
    assert_eq!(outcome.progress.duplicates_dropped, 1);
}

#[tokio::test]
async fn failing_queries_are_skipped_and_the_run_still_completes() {
    let provider = Arc::new(StubSearch::new().rate_limited());
    let backend = Arc::new(StubBackend::new(&[("First", "q1"), ("Second", "q2")]));

    let options = ReviewOptions {
        expand_references: false,
        ..Default::default()
    };

    let engine = build_engine(provider.clone(), backend, options);
    let outcome = engine.run(target()).await.unwrap();

    assert!(outcome.papers.is_empty());
    assert_eq!(outcome.progress.skipped_queries, 2);
    // each query was retried once before being skipped
    assert_eq!(provider.search_count(), 4);
}

#[tokio::test]
async fn engine_stops_once_the_target_count_is_reached() {
    let provider = Arc::new(
        StubSearch::new()
            .with_default_results(vec![candidate("hit", "Relevant result")]),
    );
    let backend = Arc::new(
        StubBackend::new(&[("A", "q1"), ("B", "q2"), ("C", "q3")])
            .with_score("Relevant result", 0.95, 0.9),
    );

    let options = ReviewOptions {
        num_papers: 1,
        relevance_threshold: 0.5,
        expand_references: false,
        max_iterations: 5,
        ..Default::default()
    };

    let engine = build_engine(provider.clone(), backend, options);
    let outcome = engine.run(target()).await.unwrap();

    assert_eq!(outcome.papers.len(), 1);
    assert_eq!(provider.search_count(), 1);
}

#[tokio::test]
async fn iteration_budget_bounds_the_number_of_searches() {
    let provider = Arc::new(
        StubSearch::new().with_default_results(vec![candidate("only", "Low relevance result")]),
    );
    let backend = Arc::new(
        StubBackend::new(&[("A", "q1"), ("B", "q2"), ("C", "q3"), ("D", "q4"), ("E", "q5")])
            .with_score("Low relevance result", 0.1, 0.9),
    );

    let options = ReviewOptions {
        max_iterations: 2,
        relevance_threshold: 0.9,
        expand_references: false,
        ..Default::default()
    };

    let engine = build_engine(provider.clone(), backend, options);
    let outcome = engine.run(target()).await.unwrap();

    assert!(outcome.papers.is_empty());
    assert_eq!(outcome.progress.iteration, 2);
    assert_eq!(provider.search_count(), 2);
}

#[tokio::test]
async fn citation_expansion_discovers_and_attributes_new_papers() {
    let provider = Arc::new(
        StubSearch::new()
            .with_results("gnn molecules", vec![candidate("seed", "Seed paper")])
            .with_references("seed", &["ref1"])
            .with_paper(candidate("ref1", "Referenced paper")),
    );
    let backend = Arc::new(
        StubBackend::new(&[("Core", "gnn molecules")])
            .with_score("Seed paper", 0.95, 0.9)
            .with_score("Referenced paper", 0.9, 0.9),
    );

    let options = ReviewOptions {
        num_papers: 2,
        relevance_threshold: 0.5,
        expand_references: true,
        ..Default::default()
    };

    let outcome = build_engine(provider.clone(), backend, options)
        .run(target())
        .await
        .unwrap();

    let ids: Vec<&str> = outcome.papers.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["seed", "ref1"]);
    assert_eq!(provider.fetch_count(), 1);

    let expanded = &outcome.papers[1];
    assert!(matches!(
        expanded.discovery_path.last(),
        Some(DiscoveryStep::Expansion { source_id, .. }) if source_id == "seed"
    ));
}

#[tokio::test]
async fn raising_the_threshold_never_accepts_more_papers() {
    let results = vec![
        candidate("p1", "High relevance"),
        candidate("p2", "Medium relevance"),
        candidate("p3", "Low relevance"),
    ];

    let mut accepted_counts = Vec::new();
    for threshold in [0.2, 0.5, 0.8, 0.95] {
        let provider = Arc::new(
            StubSearch::new().with_results("gnn molecules", results.clone()),
        );
        let backend = Arc::new(
            StubBackend::new(&[("Core", "gnn molecules")])
                .with_score("High relevance", 0.9, 0.9)
                .with_score("Medium relevance", 0.6, 0.9)
                .with_score("Low relevance", 0.3, 0.9),
        );
        let options = ReviewOptions {
            relevance_threshold: threshold,
            expand_references: false,
            ..Default::default()
        };

        let outcome = build_engine(provider, backend, options)
            .run(target())
            .await
            .unwrap();
        accepted_counts.push(outcome.papers.len());
    }

    assert_eq!(accepted_counts, vec![3, 2, 1, 0]);
    assert!(accepted_counts.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn scoring_failures_degrade_instead_of_aborting() {
    let provider = Arc::new(StubSearch::new().with_results(
        "gnn molecules",
        vec![candidate("p1", "First"), candidate("p2", "Second")],
    ));
    let backend = Arc::new(StubBackend::new(&[("Core", "gnn molecules")]).failing_scorer());

    let options = ReviewOptions {
        relevance_threshold: 0.5,
        expand_references: false,
        ..Default::default()
    };

    let outcome = build_engine(provider, backend, options)
        .run(target())
        .await
        .unwrap();

    assert!(outcome.papers.is_empty());
    assert_eq!(outcome.progress.degraded_scores, 2);
    assert_eq!(outcome.progress.candidates_seen, 2);
}

#[tokio::test]
async fn cancellation_stops_the_run_before_any_search() {
    let provider = Arc::new(
        StubSearch::new().with_default_results(vec![candidate("x", "Anything")]),
    );
    let backend = Arc::new(StubBackend::new(&[("Core", "q")]));

    let engine = build_engine(
        provider.clone(),
        backend,
        ReviewOptions::default(),
    );
    engine
        .cancel_handle()
        .store(true, std::sync::atomic::Ordering::Relaxed);

    let outcome = engine.run(target()).await.unwrap();

    assert!(outcome.papers.is_empty());
    assert_eq!(provider.search_count(), 0);
    assert!(outcome
        .progress
        .status_log
        .iter()
        .any(|s| s.contains("cancelled")));
}

#[tokio::test]
async fn empty_target_title_is_rejected() {
    let provider = Arc::new(StubSearch::new());
    let backend = Arc::new(StubBackend::new(&[("Core", "q")]));

    let engine = build_engine(provider, backend, ReviewOptions::default());
    let result = engine.run(ReviewTarget::new("  ", "abstract")).await;

    assert!(result.is_err());
}
