/*!
 * Core translation service implementation.
 *
 * This module contains the `TranslationClient` boundary used by the
 * orchestrator and `TranslationService`, which implements it on top of any
 * `Provider` with bounded exponential-backoff retry.
 */

use async_trait::async_trait;
use log::{debug, error, warn};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

use crate::app_config::ProviderSettings;
use crate::errors::{AppError, ProviderError, TranslationError};
use crate::providers::anthropic::{Anthropic, API_KEY_ENV};
use crate::providers::{GenerationOptions, Provider};

/// Sends one batch plus the instruction and returns the translated text
#[async_trait]
pub trait TranslationClient: Send + Sync {
    /// Translate one serialized batch under `instruction`
    async fn translate(&self, batch_text: &str, instruction: &str) -> Result<String, TranslationError>;

    /// Cheap request that fails fast on a rejected credential
    async fn preflight(&self) -> Result<(), TranslationError> {
        Ok(())
    }

    /// One-line usage summary for the end of a run
    fn usage_summary(&self) -> Option<String> {
        None
    }
}

/// Token usage statistics for tracking API consumption
#[derive(Clone, Debug)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Successful requests
    pub requests: u64,

    /// Total time spent on successful API requests
    pub api_duration: Duration,

    /// Model name
    pub model: String,
}

impl TokenUsageStats {
    /// Create new token usage stats for a model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            requests: 0,
            api_duration: Duration::from_secs(0),
            model: model.into(),
        }
    }

    /// Record one successful request
    pub fn record(&mut self, usage: Option<(u64, u64)>, duration: Duration) {
        if let Some((prompt, completion)) = usage {
            self.prompt_tokens += prompt;
            self.completion_tokens += completion;
        }
        self.requests += 1;
        self.api_duration += duration;
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    /// Summary line for logs
    pub fn summary(&self) -> String {
        format!(
            "{}: {} requests, {} tokens ({} prompt + {} completion), {:.1}s in API calls",
            self.model,
            self.requests,
            self.total_tokens(),
            self.prompt_tokens,
            self.completion_tokens,
            self.api_duration.as_secs_f64()
        )
    }
}

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each following one
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Fail on the first error
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base_ms: 0,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    ///
    /// A `retry-after` hint from a rate-limit response wins when it is longer.
    pub fn delay_for(&self, attempt: u32, error: &ProviderError) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let backoff_ms = self.backoff_base_ms.saturating_mul(1u64 << shift);

        let hinted_ms = match error {
            ProviderError::RateLimitExceeded { retry_after_secs: Some(secs), .. } => secs.saturating_mul(1000),
            _ => 0,
        };

        Duration::from_millis(backoff_ms.max(hinted_ms))
    }
}

/// Translation client over a provider
pub struct TranslationService<P: Provider> {
    /// Provider implementation
    provider: P,

    /// Generation parameters for every request
    pub options: GenerationOptions,

    /// Retry policy for failed requests
    pub retry: RetryPolicy,

    /// Accumulated token usage
    stats: Mutex<TokenUsageStats>,
}

impl<P: Provider> TranslationService<P> {
    /// Create a service from a provider and explicit settings
    pub fn new(provider: P, options: GenerationOptions, retry: RetryPolicy) -> Self {
        let stats = Mutex::new(TokenUsageStats::new(options.model.clone()));
        Self {
            provider,
            options,
            retry,
            stats,
        }
    }

    /// Create a service from provider settings
    pub fn with_settings(provider: P, settings: &ProviderSettings) -> Self {
        Self::new(
            provider,
            GenerationOptions {
                model: settings.model.clone(),
                max_tokens: settings.max_tokens,
                ..Default::default()
            },
            RetryPolicy {
                max_retries: settings.retry_count,
                backoff_base_ms: settings.retry_backoff_ms,
            },
        )
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Snapshot of the token usage so far
    pub fn token_stats(&self) -> TokenUsageStats {
        self.stats.lock().clone()
    }

    async fn attempt(&self, batch_text: &str, instruction: &str) -> Result<String, ProviderError> {
        let request = self.provider.build_request(instruction, batch_text, &self.options);
        let started = Instant::now();
        let response = self.provider.complete(request).await?;

        if P::is_truncated(&response) {
            return Err(ProviderError::ResponseTruncated {
                max_tokens: self.options.max_tokens,
            });
        }

        let text = P::extract_text(&response);
        if text.trim().is_empty() {
            return Err(ProviderError::ParseError("response contained no text".to_string()));
        }

        self.stats.lock().record(P::token_usage(&response), started.elapsed());
        Ok(text)
    }
}

impl TranslationService<Anthropic> {
    /// Build an Anthropic-backed service.
    ///
    /// The credential is passed in explicitly; a missing or blank key fails
    /// here, before any request is made.
    pub fn anthropic(api_key: Option<&str>, settings: &ProviderSettings) -> Result<Self, AppError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| AppError::CredentialMissing(API_KEY_ENV.to_string()))?;

        settings.validate()?;

        let client = Anthropic::new(api_key, settings.endpoint.as_str(), settings.timeout_secs);
        Ok(Self::with_settings(client, settings))
    }
}

#[async_trait]
impl<P: Provider> TranslationClient for TranslationService<P> {
    async fn translate(&self, batch_text: &str, instruction: &str) -> Result<String, TranslationError> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.attempt(batch_text, instruction).await {
                Ok(text) => {
                    if attempt > 1 {
                        debug!("Request succeeded on attempt {}", attempt);
                    }
                    return Ok(text);
                }
                Err(e) if e.is_retryable() && attempt <= self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt, &e);
                    warn!(
                        "{} - attempt {}/{}, retrying in {} ms",
                        e,
                        attempt,
                        self.retry.max_retries + 1,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!("Translation request failed after {} attempt(s): {}", attempt, e);
                    return Err(TranslationError::Provider(e));
                }
            }
        }
    }

    async fn preflight(&self) -> Result<(), TranslationError> {
        self.provider
            .test_connection(&self.options)
            .await
            .map_err(TranslationError::Provider)
    }

    fn usage_summary(&self) -> Option<String> {
        Some(self.stats.lock().summary())
    }
}
