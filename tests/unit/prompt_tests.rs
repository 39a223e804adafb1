/*!
 * Tests for the translation instruction builder
 */

use srtran::app_config::{GlossaryEntry, TranslationConfig};
use srtran::errors::ConfigError;
use srtran::translation::prompts::{prompt_from_yaml, PromptBuilder, PromptTemplate};
use crate::common;

fn config_with(glossary: Vec<(&str, &str)>) -> TranslationConfig {
    let yaml = "language: French\ntranslation_mapping: {}\nbible_verse_translation: Louis Segond\n";
    let mut config = TranslationConfig::from_yaml_str(yaml).unwrap();
    config.glossary = glossary
        .into_iter()
        .map(|(source, target)| GlossaryEntry {
            source: source.to_string(),
            target: target.to_string(),
        })
        .collect();
    config
}

#[test]
fn test_build_shouldNameLanguageAndBibleTranslation() {
    let prompt = PromptBuilder::new().build(&config_with(vec![]));

    assert!(prompt.contains("Translate to French language"));
    assert!(prompt.contains("\"Louis Segond\" Bible translation"));
    assert!(prompt.contains("Output only SRT format"));
    assert!(prompt.contains("code fences"));
}

#[test]
fn test_build_withEmptyGlossary_shouldOmitMappingSection() {
    let prompt = PromptBuilder::new().build(&config_with(vec![]));
    assert!(!prompt.contains("Translation Mapping"));
    assert!(!prompt.contains('\u{2192}'));
}

#[test]
fn test_build_withGlossary_shouldListEveryPairWithArrow() {
    let prompt = PromptBuilder::new().build(&config_with(vec![("Lord", "Seigneur"), ("grace", "grâce")]));

    assert!(prompt.contains("Translation Mapping"));
    let line = prompt
        .lines()
        .find(|l| l.contains("Lord"))
        .expect("mapping line for Lord");
    assert!(line.contains("Seigneur"));
    assert!(line.contains("\"Lord\" \u{2192} \"Seigneur\""));
    assert!(prompt.contains("\"grace\" \u{2192} \"grâce\""));
    assert!(!prompt.contains("â†’"));
}

#[test]
fn test_build_withGlossary_shouldKeepFileOrder() {
    let prompt = prompt_from_yaml(common::FRENCH_CONFIG).unwrap();
    let lord = prompt.find("\"Lord\"").unwrap();
    let spirit = prompt.find("\"Holy Spirit\"").unwrap();
    assert!(lord < spirit);
}

#[test]
fn test_build_shouldBeDeterministic() {
    let config = config_with(vec![("Lord", "Seigneur")]);
    let builder = PromptBuilder::new();
    assert_eq!(builder.build(&config), builder.build(&config));
}

#[test]
fn test_mapping_lines_shouldFormatEachPair() {
    let lines = PromptBuilder::mapping_lines(&[GlossaryEntry {
        source: "Lord".to_string(),
        target: "Seigneur".to_string(),
    }]);
    assert_eq!(lines, vec!["       - \"Lord\" \u{2192} \"Seigneur\"".to_string()]);
}

#[test]
fn test_with_template_shouldRenderCustomFrame() {
    let builder = PromptBuilder::new().with_template(PromptTemplate::new("{language}|{bible_verse_translation}|{mapping_rule}"));
    assert_eq!(builder.build(&config_with(vec![])), "French|Louis Segond|");
}

#[test]
fn test_render_withPlaceholderInValue_shouldInsertItLiterally() {
    let template = PromptTemplate::new("to {language} using {bible_verse_translation}{mapping_rule} {unknown}");
    let rendered = template.render("{bible_verse_translation}", "{mapping_rule}", "!");
    assert_eq!(rendered, "to {bible_verse_translation} using {mapping_rule}! {unknown}");
}

#[test]
fn test_prompt_from_yaml_withMissingBibleKey_shouldFailWithKeyMissing() {
    let yaml = "language: French\ntranslation_mapping:\n  Lord: Seigneur\n";
    match prompt_from_yaml(yaml) {
        Err(ConfigError::KeyMissing(key)) => assert_eq!(key, "bible_verse_translation"),
        other => panic!("expected KeyMissing, got {:?}", other),
    }
}

#[test]
fn test_prompt_from_yaml_withMissingMapping_shouldFailWithKeyMissing() {
    let yaml = "language: French\nbible_verse_translation: Louis Segond\n";
    assert!(matches!(prompt_from_yaml(yaml), Err(ConfigError::KeyMissing(key)) if key == "translation_mapping"));
}
