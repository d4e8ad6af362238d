//! Unified error handling system
//!
//! Provides structured error types with context, recovery suggestions, and proper error chaining

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type LitResult<T> = Result<T, LitError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for the litscout system
#[derive(Error, Debug)]
pub enum LitError {
    #[error("Search error: {message}")]
    Search {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after_ms: Option<u64>,
        context: ErrorContext,
    },

    #[error("Resource not found: {resource}")]
    NotFound {
        resource: String,
        context: ErrorContext,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("LLM error: {message}")]
    Llm {
        message: String,
        provider: Option<String>,
        model: Option<String>,
        context: ErrorContext,
    },

    #[error("Cache error: {message}")]
    Cache {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("Operation timeout: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },
}

impl LitError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            LitError::Search { context, .. } => Some(context),
            LitError::RateLimit { context, .. } => Some(context),
            LitError::NotFound { context, .. } => Some(context),
            LitError::Network { context, .. } => Some(context),
            LitError::Llm { context, .. } => Some(context),
            LitError::Cache { context, .. } => Some(context),
            LitError::Config { context, .. } => Some(context),
            LitError::Validation { context, .. } => Some(context),
            LitError::Timeout { context, .. } => Some(context),
            LitError::Internal { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Check if error is recoverable (retry may succeed)
    pub fn is_recoverable(&self) -> bool {
        match self {
            LitError::Network { .. } => true,
            LitError::Timeout { .. } => true,
            LitError::RateLimit { .. } => true,
            LitError::Llm { .. } => true,
            LitError::Config { .. } => false,
            LitError::Validation { .. } => false,
            LitError::NotFound { .. } => false,
            _ => false,
        }
    }

    /// Get retry delay in milliseconds for recoverable errors
    pub fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            LitError::Network { .. } => Some(1000),
            LitError::Timeout { .. } => Some(2000),
            LitError::RateLimit { retry_after_ms, .. } => {
                Some(retry_after_ms.unwrap_or(5000))
            }
            _ => None,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            LitError::Internal { .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Internal error occurred"
                );
            }
            LitError::Config { .. } | LitError::Validation { .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Configuration or validation error"
                );
            }
            LitError::Network { .. } | LitError::Timeout { .. } | LitError::RateLimit { .. } => {
                warn!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Transient error (may be recoverable)"
                );
            }
            _ => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Error occurred"
                );
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::LitError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your configuration file")
                .with_suggestion("Run 'litscout config --init' to create default config"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::LitError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_recoverable_with_delay() {
        let err = LitError::RateLimit {
            message: "429 from search API".to_string(),
            retry_after_ms: Some(1234),
            context: ErrorContext::new("search"),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.retry_delay_ms(), Some(1234));
    }

    #[test]
    fn validation_error_is_fatal() {
        let err = validation_error!("threshold out of range", "relevance_threshold", "config");
        assert!(!err.is_recoverable());
        assert_eq!(err.retry_delay_ms(), None);
    }

    #[test]
    fn not_found_is_not_retried() {
        let err = LitError::NotFound {
            resource: "paper:abc".to_string(),
            context: ErrorContext::new("search"),
        };
        assert!(!err.is_recoverable());
    }
}
