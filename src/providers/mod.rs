/*!
 * Provider implementations for text-generation services.
 *
 * This module contains client implementations for LLM providers:
 * - Anthropic: Anthropic Messages API integration
 * - Mock: in-process provider with scripted behavior, used by tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Generation parameters shared by every request of a run
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    /// Model name
    pub model: String,
    /// Output token ceiling
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: 8192,
            temperature: 0.0,
        }
    }
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the translation service.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Build a single-turn request: `system` as the directive, `user` as the only message
    fn build_request(&self, system: &str, user: &str, options: &GenerationOptions) -> Self::Request;

    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<Self::Response, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection (and credential) with a minimal request
    async fn test_connection(&self, options: &GenerationOptions) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;

    /// Whether generation stopped at the token ceiling
    fn is_truncated(_response: &Self::Response) -> bool {
        false
    }

    /// Input and output token counts, when reported
    fn token_usage(_response: &Self::Response) -> Option<(u64, u64)> {
        None
    }
}

pub mod anthropic;
pub mod mock;
