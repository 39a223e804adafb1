/*!
 * Prompt construction for SRT translation.
 */

pub mod templates;

pub use self::templates::{prompt_from_yaml, PromptBuilder, PromptTemplate};
