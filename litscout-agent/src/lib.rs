//! Litscout Agent - Iterative literature review orchestration
//!
//! Ties the search, planning, and scoring layers together into the
//! discovery loop that produces a ranked reading list.

pub mod dedup;
pub mod engine;
pub mod expand;
pub mod types;

pub use dedup::Deduplicator;
pub use engine::ReviewEngine;
pub use expand::CitationExpander;
pub use types::{ReviewContext, ReviewOutcome, ReviewProgress, ReviewStage};

use litscout_core::LitError;
use thiserror::Error;

/// Errors surfaced by the orchestration layer
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Review error: {message}")]
    Review { message: String },

    #[error(transparent)]
    Core(#[from] LitError),
}

pub type AgentResult<T> = Result<T, AgentError>;
