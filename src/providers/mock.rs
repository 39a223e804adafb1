/*!
 * Mock provider implementation for testing.
 *
 * This module provides a mock provider that simulates different behaviors:
 * - `MockProvider::working()` - Always succeeds, marking every text line as translated
 * - `MockProvider::failing()` - Always fails with a connection error
 * - `MockProvider::fail_first(n)` - Fails `n` times, then succeeds
 * - `MockProvider::auth_failing()` - Rejects the credential
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{GenerationOptions, Provider};
use crate::subtitle_processor::is_block_header;

/// Prefix the working mock puts in front of every text line
pub const TRANSLATED_MARKER: &str = "[TRANSLATED] ";

/// Mock request for testing
#[derive(Debug, Clone, PartialEq)]
pub struct MockRequest {
    /// The system directive
    pub system: String,
    /// The single user turn
    pub user: String,
    /// Generation options the request was built with
    pub options: GenerationOptions,
}

/// Mock response for testing
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// The translated text
    pub text: String,
    /// Whether the mock simulated a token-limit stop
    pub truncated: bool,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Fails the first N requests with a connection error, then works
    FailFirst { failures: usize },
    /// Fails every Nth request
    Intermittent { fail_every: usize },
    /// Always fails with a connection error
    Failing,
    /// Always fails with an authentication error
    AuthFailing,
    /// Returns an empty response
    Empty,
    /// Returns a response cut off at the token ceiling
    Truncated,
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter
    request_count: Arc<AtomicUsize>,
    /// Every request received, in order
    requests: Arc<Mutex<Vec<MockRequest>>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock that fails `failures` times before succeeding
    pub fn fail_first(failures: usize) -> Self {
        Self::new(MockBehavior::FailFirst { failures })
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that rejects the credential
    pub fn auth_failing() -> Self {
        Self::new(MockBehavior::AuthFailing)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that reports a token-limit stop
    pub fn truncated() -> Self {
        Self::new(MockBehavior::Truncated)
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of every request received
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().clone()
    }

    /// Prefix every text line with the translated marker, leaving headers and
    /// blank lines untouched
    pub fn mark_translated(srt: &str) -> String {
        let lines: Vec<&str> = srt.split('\n').collect();
        let header_lines: HashSet<usize> = (0..lines.len().saturating_sub(1))
            .filter(|&i| is_block_header(lines[i], lines[i + 1]))
            .flat_map(|i| [i, i + 1])
            .collect();

        lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                if line.is_empty() || header_lines.contains(&i) {
                    line.to_string()
                } else {
                    format!("{}{}", TRANSLATED_MARKER, line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn connection_error(attempt: usize) -> ProviderError {
        ProviderError::ConnectionError(format!("simulated connection failure on request {}", attempt))
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Request = MockRequest;
    type Response = MockResponse;

    fn build_request(&self, system: &str, user: &str, options: &GenerationOptions) -> MockRequest {
        MockRequest {
            system: system.to_string(),
            user: user.to_string(),
            options: options.clone(),
        }
    }

    async fn complete(&self, request: MockRequest) -> Result<MockResponse, ProviderError> {
        let attempt = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().push(request.clone());

        let translated = || MockResponse {
            text: Self::mark_translated(&request.user),
            truncated: false,
        };

        match self.behavior {
            MockBehavior::Working => Ok(translated()),
            MockBehavior::FailFirst { failures } => {
                if attempt <= failures {
                    Err(Self::connection_error(attempt))
                } else {
                    Ok(translated())
                }
            }
            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && attempt % fail_every == 0 {
                    Err(Self::connection_error(attempt))
                } else {
                    Ok(translated())
                }
            }
            MockBehavior::Failing => Err(Self::connection_error(attempt)),
            MockBehavior::AuthFailing => Err(ProviderError::AuthenticationError("invalid x-api-key".to_string())),
            MockBehavior::Empty => Ok(MockResponse {
                text: String::new(),
                truncated: false,
            }),
            MockBehavior::Truncated => {
                let mut text = Self::mark_translated(&request.user);
                let cut = (0..=text.len() / 2).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0);
                text.truncate(cut);
                Ok(MockResponse { text, truncated: true })
            }
        }
    }

    async fn test_connection(&self, _options: &GenerationOptions) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::AuthFailing => Err(ProviderError::AuthenticationError("invalid x-api-key".to_string())),
            MockBehavior::Failing => Err(Self::connection_error(0)),
            _ => Ok(()),
        }
    }

    fn extract_text(response: &MockResponse) -> String {
        response.text.clone()
    }

    fn is_truncated(response: &MockResponse) -> bool {
        response.truncated
    }

    fn token_usage(response: &MockResponse) -> Option<(u64, u64)> {
        let output = response.text.split_whitespace().count() as u64;
        Some((output, output))
    }
}
