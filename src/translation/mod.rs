/*!
 * Translation of subtitle documents through a text-generation service.
 *
 * - `batch`: block-aligned splitting of documents into request-sized batches
 * - `prompts`: the instruction sent with every batch
 * - `core`: the `TranslationClient` boundary and the retrying service over a provider
 */

// Re-export main types for easier usage
pub use self::batch::{concatenate, Batch, Batcher, DEFAULT_MAX_BLOCKS_PER_BATCH};
pub use self::core::{RetryPolicy, TokenUsageStats, TranslationClient, TranslationService};
pub use self::prompts::{prompt_from_yaml, PromptBuilder, PromptTemplate};

// Submodules
pub mod batch;
pub mod core;
pub mod prompts;
