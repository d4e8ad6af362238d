//! Configuration loading and validation

use crate::error::{ErrorContext, LitError, LitResult};
use crate::logging::LoggingConfig;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for a literature review run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Discovery loop settings
    #[serde(default)]
    pub review: ReviewOptions,
    /// LLM backend settings
    #[serde(default)]
    pub llm: LlmConfig,
    /// Search API settings
    #[serde(default)]
    pub search: SearchConfig,
    /// Result cache settings
    #[serde(default)]
    pub cache: CacheConfig,
    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings consumed by the orchestration loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOptions {
    /// Target number of accepted papers
    pub num_papers: usize,
    /// Minimum relevance score for acceptance, in [0, 1]
    pub relevance_threshold: f64,
    /// Title similarity above which two records are duplicates, in [0, 1]
    pub duplicate_threshold: f64,
    /// Hard bound on orchestration iterations
    pub max_iterations: usize,
    /// Maximum number of query strategies requested from the planner
    pub max_strategies: usize,
    /// Inclusive publication year filter
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    /// Whether to follow citation edges from accepted papers
    pub expand_references: bool,
    /// Keep near-duplicate titles, merging only identifier-exact duplicates
    pub keep_duplicates: bool,
    /// Results requested per search query
    pub page_size: usize,
    /// How many top-relevance accepted papers to expand per pass
    pub max_expand_papers: usize,
    /// Citation edges fetched per expanded paper
    pub max_edges_per_paper: usize,
    /// Bounded worker pool size for concurrent relevance scoring
    pub max_concurrent_scores: usize,
}

impl Default for ReviewOptions {
    fn default() -> Self {
        Self {
            num_papers: 15,
            relevance_threshold: 0.5,
            duplicate_threshold: 0.8,
            max_iterations: 3,
            max_strategies: 4,
            start_year: None,
            end_year: None,
            expand_references: true,
            keep_duplicates: false,
            page_size: 15,
            max_expand_papers: 5,
            max_edges_per_paper: 10,
            max_concurrent_scores: 4,
        }
    }
}

impl ReviewOptions {
    pub fn year_range(&self) -> Option<(i32, i32)> {
        match (self.start_year, self.end_year) {
            (Some(start), Some(end)) => Some((start, end)),
            (Some(start), None) => Some((start, chrono::Utc::now().year())),
            (None, Some(end)) => Some((1900, end)),
            (None, None) => None,
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider type (openai, anthropic, ollama, groq)
    pub provider: String,
    /// Model name
    pub model: String,
    /// API key (optional, can be set via environment)
    pub api_key: Option<String>,
    /// Base URL for custom providers
    pub base_url: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: None,
            temperature: 0.2,
            max_tokens: Some(1024),
        }
    }
}

/// Search API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Semantic Scholar API key (optional; unauthenticated access is rate limited harder)
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
    /// Minimum interval between requests in milliseconds
    pub min_interval_ms: u64,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.semanticscholar.org/graph/v1".to_string(),
            min_interval_ms: 1000,
            max_concurrent: 2,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether caching is enabled
    pub enabled: bool,
    /// Directory for cache entries
    pub dir: String,
    /// Entries older than this are treated as absent
    pub max_age_days: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: "./.litscout-cache".to_string(),
            max_age_days: 7,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for generated files
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "./output".to_string(),
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            review: ReviewOptions::default(),
            llm: LlmConfig::default(),
            search: SearchConfig::default(),
            cache: CacheConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ReviewConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> LitResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| LitError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: ReviewConfig = toml::from_str(&content).map_err(|e| LitError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> LitResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| LitError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| LitError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Validate configuration. Invalid values are fatal and surfaced before
    /// the discovery loop starts.
    pub fn validate(&self) -> LitResult<()> {
        fn unit_range(value: f64, field: &str) -> LitResult<()> {
            if !(0.0..=1.0).contains(&value) {
                return Err(crate::validation_error!(
                    format!("{} must be in [0.0, 1.0], got {}", field, value),
                    field,
                    "config"
                ));
            }
            Ok(())
        }

        unit_range(self.review.relevance_threshold, "relevance_threshold")?;
        unit_range(self.review.duplicate_threshold, "duplicate_threshold")?;

        if self.review.num_papers == 0 {
            return Err(crate::validation_error!(
                "num_papers must be at least 1",
                "num_papers",
                "config"
            ));
        }
        if self.review.max_iterations == 0 {
            return Err(crate::validation_error!(
                "max_iterations must be at least 1",
                "max_iterations",
                "config"
            ));
        }
        if self.review.max_strategies == 0 {
            return Err(crate::validation_error!(
                "max_strategies must be at least 1",
                "max_strategies",
                "config"
            ));
        }
        if self.review.page_size == 0 {
            return Err(crate::validation_error!(
                "page_size must be at least 1",
                "page_size",
                "config"
            ));
        }
        if self.review.max_concurrent_scores == 0 {
            return Err(crate::validation_error!(
                "max_concurrent_scores must be at least 1",
                "max_concurrent_scores",
                "config"
            ));
        }
        if let (Some(start), Some(end)) = (self.review.start_year, self.review.end_year) {
            if start > end {
                return Err(crate::validation_error!(
                    format!("start_year {} is after end_year {}", start, end),
                    "start_year",
                    "config"
                ));
            }
        }
        if self.cache.enabled && self.cache.max_age_days == 0 {
            return Err(crate::validation_error!(
                "cache max_age_days must be at least 1 when caching is enabled",
                "max_age_days",
                "config"
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(crate::validation_error!(
                format!("llm temperature must be in [0.0, 2.0], got {}", self.llm.temperature),
                "temperature",
                "config"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ReviewConfig::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut config = ReviewConfig::default();
        config.review.relevance_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_year_range_is_rejected() {
        let mut config = ReviewConfig::default();
        config.review.start_year = Some(2024);
        config.review.end_year = Some(2020);
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_targets_are_rejected() {
        let mut config = ReviewConfig::default();
        config.review.num_papers = 0;
        assert!(config.validate().is_err());

        let mut config = ReviewConfig::default();
        config.review.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_year_range_is_filled_in() {
        let mut options = ReviewOptions::default();
        options.start_year = Some(2018);
        let (start, end) = options.year_range().unwrap();
        assert_eq!(start, 2018);
        assert!(end >= 2018);
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let config = ReviewConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: ReviewConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.review.num_papers, config.review.num_papers);
        assert_eq!(parsed.cache.max_age_days, config.cache.max_age_days);
    }
}
