//! LLM client integration using siumai
//!
//! Builds the appropriate siumai client for the configured provider and
//! exposes it through the [`CompletionBackend`] trait.

use async_trait::async_trait;
use litscout_core::{ErrorContext, LitError, LitResult, LlmConfig};
use siumai::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

use crate::CompletionBackend;

/// Unified completion backend supporting multiple providers
pub struct SiumaiBackend {
    client: Box<dyn LlmClient>,
    config: LlmConfig,
}

impl SiumaiBackend {
    /// Create a new backend for the configured provider
    pub async fn new(config: LlmConfig) -> LitResult<Self> {
        let client = Self::build_client(&config).await?;

        info!(
            provider = %config.provider,
            model = %config.model,
            "Created LLM backend"
        );

        Ok(Self { client, config })
    }

    /// Build the appropriate siumai client based on configuration
    async fn build_client(config: &LlmConfig) -> LitResult<Box<dyn LlmClient>> {
        match config.provider.as_str() {
            "openai" => {
                let api_key = config
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                    .ok_or_else(|| Self::missing_key_error("OpenAI", "OPENAI_API_KEY"))?;

                let mut builder = LlmBuilder::new()
                    .openai()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                if let Some(base_url) = &config.base_url {
                    builder = builder.base_url(base_url);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| Self::build_error("OpenAI", config, e))?;

                Ok(Box::new(client))
            }
            "anthropic" => {
                let api_key = config
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
                    .ok_or_else(|| Self::missing_key_error("Anthropic", "ANTHROPIC_API_KEY"))?;

                let mut builder = LlmBuilder::new()
                    .anthropic()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| Self::build_error("Anthropic", config, e))?;

                Ok(Box::new(client))
            }
            "ollama" => {
                let base_url = config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string());

                let mut builder = LlmBuilder::new()
                    .ollama()
                    .model(&config.model)
                    .base_url(&base_url)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| Self::build_error("Ollama", config, e))?;

                Ok(Box::new(client))
            }
            "groq" => {
                let api_key = config
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("GROQ_API_KEY").ok())
                    .ok_or_else(|| Self::missing_key_error("Groq", "GROQ_API_KEY"))?;

                let mut builder = LlmBuilder::new()
                    .groq()
                    .api_key(&api_key)
                    .model(&config.model)
                    .temperature(config.temperature);

                if let Some(max_tokens) = config.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }

                let client = builder
                    .build()
                    .await
                    .map_err(|e| Self::build_error("Groq", config, e))?;

                Ok(Box::new(client))
            }
            provider => Err(LitError::Config {
                message: format!("Unsupported LLM provider: {}", provider),
                source: None,
                context: ErrorContext::new("llm_backend")
                    .with_operation("build_client")
                    .with_suggestion("Supported providers: openai, anthropic, ollama, groq"),
            }),
        }
    }

    fn missing_key_error(provider: &str, env_var: &str) -> LitError {
        LitError::Config {
            message: format!("{} API key not found", provider),
            source: None,
            context: ErrorContext::new("llm_backend")
                .with_operation("build_client")
                .with_suggestion(&format!(
                    "Set the {} environment variable or the llm.api_key config field",
                    env_var
                )),
        }
    }

    fn build_error(provider: &str, config: &LlmConfig, e: impl std::fmt::Display) -> LitError {
        LitError::Llm {
            message: format!("Failed to build {} client: {}", provider, e),
            provider: Some(config.provider.clone()),
            model: Some(config.model.clone()),
            context: ErrorContext::new("llm_backend").with_operation("build_client"),
        }
    }
}

#[async_trait]
impl CompletionBackend for SiumaiBackend {
    async fn complete(&self, prompt: &str) -> LitResult<String> {
        let start_time = Instant::now();
        let messages = vec![user!(prompt)];

        let response = self.client.chat(messages).await.map_err(|e| LitError::Llm {
            message: format!("LLM generation failed: {}", e),
            provider: Some(self.config.provider.clone()),
            model: Some(self.config.model.clone()),
            context: ErrorContext::new("llm_backend").with_operation("complete"),
        })?;

        match response.content_text() {
            Some(content) => {
                debug!(
                    elapsed_ms = start_time.elapsed().as_millis() as u64,
                    chars = content.len(),
                    "LLM completion finished"
                );
                Ok(content.to_string())
            }
            None => Err(LitError::Llm {
                message: "No text content in LLM response".to_string(),
                provider: Some(self.config.provider.clone()),
                model: Some(self.config.model.clone()),
                context: ErrorContext::new("llm_backend").with_operation("complete"),
            }),
        }
    }

    fn model_id(&self) -> String {
        format!("{}/{}", self.config.provider, self.config.model)
    }
}
