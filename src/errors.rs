/*!
 * Error types for the srtran application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions. Every error is
 * terminal for a translation run; nothing here is recovered locally.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Error message from the API
        message: String,
        /// Seconds to wait, when the API sent a `retry-after` header
        retry_after_secs: Option<u64>,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The model stopped at the output token ceiling
    #[error("Response stopped at the {max_tokens} token ceiling")]
    ResponseTruncated {
        /// Ceiling that was hit
        max_tokens: u32,
    },
}

impl ProviderError {
    /// Whether another attempt at the same request may succeed.
    ///
    /// Authentication failures, client-side (4xx) rejections and truncated
    /// responses are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError(_)
            | Self::RateLimitExceeded { .. }
            | Self::ParseError(_)
            | Self::RequestFailed(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::AuthenticationError(_) | Self::ResponseTruncated { .. } => false,
        }
    }
}

/// Errors that can occur during subtitle processing
#[derive(Error, Debug, PartialEq)]
pub enum SubtitleError {
    /// No index/timing header was found anywhere in the text
    #[error("No subtitle block found: expected an index line followed by 'HH:MM:SS,mmm --> HH:MM:SS,mmm'")]
    NoBlocks,

    /// A timestamp matched the header shape but is out of range
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// The index line does not fit a positive integer
    #[error("Invalid block index: {0}")]
    InvalidIndex(String),

    /// A block has a header but no text lines
    #[error("Block {index} has no text")]
    EmptyText {
        /// Block index as written in the file
        index: usize,
    },

    /// A block ends before it starts
    #[error("Invalid time range in block {index}: {start} --> {end}")]
    InvalidTimeRange {
        /// Block index as written in the file
        index: usize,
        /// Formatted start timestamp
        start: String,
        /// Formatted end timestamp
        end: String,
    },
}

/// Errors raised while loading the translation configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist
    #[error("Translation configuration file not found: {0}")]
    Missing(PathBuf),

    /// A required key is absent from the configuration
    #[error("'{0}' variable is missing in the configuration file")]
    KeyMissing(String),

    /// A key is present but holds the wrong kind of value
    #[error("'{key}' must be {expected}")]
    InvalidValue {
        /// Offending key
        key: String,
        /// Human readable description of the expected value
        expected: String,
    },

    /// The file is not valid YAML
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A batch could not be translated
    #[error("Batch {batch} of {total} failed: {source}")]
    BatchFailed {
        /// 1-based batch position
        batch: usize,
        /// Number of batches in the run
        total: usize,
        /// Underlying provider failure
        #[source]
        source: ProviderError,
    },
}

impl TranslationError {
    /// Whether the failure came from rejected credentials
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            Self::Provider(ProviderError::AuthenticationError(_))
                | Self::BatchFailed { source: ProviderError::AuthenticationError(_), .. }
        )
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// The source subtitle file does not exist
    #[error("Source file not found: {0}")]
    InputNotFound(PathBuf),

    /// The output file is already there and is never overwritten
    #[error("Output file already exists: {0}")]
    OutputExists(PathBuf),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No credential for the translation service
    #[error("Credential missing: {0} is not set")]
    CredentialMissing(String),

    /// Error from subtitle processing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InputNotFound(_) => 2,
            Self::OutputExists(_) => 3,
            Self::Config(_) => 4,
            Self::CredentialMissing(_) => 5,
            Self::Subtitle(_) => 6,
            Self::Translation(_) => 7,
            Self::File(_) | Self::Unknown(_) => 1,
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(error: ProviderError) -> Self {
        Self::Translation(TranslationError::Provider(error))
    }
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
