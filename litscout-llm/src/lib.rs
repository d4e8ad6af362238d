//! Litscout LLM - Language model integration
//!
//! Provides the [`CompletionBackend`] abstraction, a siumai-based
//! implementation supporting multiple providers, and the two LLM consumers:
//! the research planner and the relevance scorer.

pub mod backend;
pub mod planner;
pub mod scorer;

pub use backend::SiumaiBackend;
pub use planner::{ResearchPlan, ResearchPlanner};
pub use scorer::{RelevanceAssessment, RelevanceScorer};

use async_trait::async_trait;
use litscout_core::LitResult;

/// Abstraction over a text completion model.
///
/// Sampling parameters are fixed at construction time; callers only supply
/// prompts.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Complete a prompt and return the generated text
    async fn complete(&self, prompt: &str) -> LitResult<String>;

    /// Stable identifier for the configured model, used in cache keys
    fn model_id(&self) -> String;
}
