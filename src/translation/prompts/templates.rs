/*!
 * Instruction templates for SRT translation.
 *
 * The instruction is sent as the system directive of every request. It has a
 * fixed frame plus one optional section: the override list, which is emitted
 * only when the glossary has entries.
 */

use crate::app_config::{GlossaryEntry, TranslationConfig};
use crate::errors::ConfigError;

/// System instruction template for subtitle translation.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default instruction frame.
    ///
    /// Placeholders: `{language}`, `{bible_verse_translation}`, `{mapping_rule}`.
    pub const SRT_TRANSLATOR: &'static str = r#"You are SRT title translator. Translate to {language} language. Output only SRT format.
Keep every subtitle number and timing line exactly as given and translate only the text lines. Do not add notes or wrap the output in code fences.

Key rules to follow:
1. **Bible verse Translations:**
    - For every Bible verse encountered, use "{bible_verse_translation}" Bible translation.
{mapping_rule}
Follow these instructions carefully to ensure that the translation is accurate and free of any extraneous commentary."#;

    /// Header of the override section
    pub const MAPPING_RULE_HEADER: &'static str = r#"
2. **Translation Mapping:**
    - For the following words or phrases, use the provided translations:"#;

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default SRT translator template.
    pub fn srt_translator() -> Self {
        Self::new(Self::SRT_TRANSLATOR)
    }

    /// Render the template with the given variables.
    ///
    /// Placeholders are filled in a single pass over the template, so a value
    /// that itself contains `{language}` is inserted literally.
    pub fn render(&self, language: &str, bible_verse_translation: &str, mapping_rule: &str) -> String {
        let placeholders = [
            ("{language}", language),
            ("{bible_verse_translation}", bible_verse_translation),
            ("{mapping_rule}", mapping_rule),
        ];

        let mut out = String::with_capacity(self.template.len() + mapping_rule.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            rest = &rest[open..];
            match placeholders.iter().find(|(name, _)| rest.starts_with(name)) {
                Some((name, value)) => {
                    out.push_str(value);
                    rest = &rest[name.len()..];
                }
                None => {
                    out.push('{');
                    rest = &rest[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::srt_translator()
    }
}

/// Builds the system instruction from a translation configuration.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    template: PromptTemplate,
}

impl PromptBuilder {
    /// Create a builder over the default template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom template instead of the default one.
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Build the instruction for `config`.
    pub fn build(&self, config: &TranslationConfig) -> String {
        let mapping_rule = Self::mapping_rule(&config.glossary);
        self.template
            .render(&config.language, &config.bible_verse_translation, &mapping_rule)
    }

    /// One line per override, `"source" → "target"`.
    pub fn mapping_lines(glossary: &[GlossaryEntry]) -> Vec<String> {
        glossary
            .iter()
            .map(|entry| format!("       - \"{}\" \u{2192} \"{}\"", entry.source, entry.target))
            .collect()
    }

    /// The override section, or an empty string when there is nothing to override.
    fn mapping_rule(glossary: &[GlossaryEntry]) -> String {
        if glossary.is_empty() {
            return String::new();
        }

        let mut section = String::from(PromptTemplate::MAPPING_RULE_HEADER);
        for line in Self::mapping_lines(glossary) {
            section.push('\n');
            section.push_str(&line);
        }
        section.push('\n');
        section
    }
}

/// Load a YAML configuration and build its instruction in one step.
///
/// Fails with `ConfigError::KeyMissing` before anything else happens when a
/// required key is absent.
pub fn prompt_from_yaml(content: &str) -> Result<String, ConfigError> {
    let config = TranslationConfig::from_yaml_str(content)?;
    Ok(PromptBuilder::new().build(&config))
}
