//! Language utilities for target language codes
//!
//! Target folders are named by language code (`fr`, `es`, `pt-BR`) while the
//! translation configuration names the language in words. These helpers
//! resolve codes through ISO 639 so the two can be cross-checked.

use anyhow::{Result, anyhow};
use isolang::Language;

/// Primary subtag of a code, lowercased (`pt-BR` -> `pt`)
fn primary_subtag(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Resolve an ISO 639-1 or ISO 639-3 code
pub fn lookup(code: &str) -> Option<Language> {
    let code = primary_subtag(code);
    match code.len() {
        2 => Language::from_639_1(&code),
        3 => Language::from_639_3(&code),
        _ => None,
    }
}

/// Validate a language code
pub fn validate_language_code(code: &str) -> Result<()> {
    lookup(code)
        .map(|_| ())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let lang = lookup(code).ok_or_else(|| anyhow!("Invalid language code: {}", code))?;
    Ok(lang.to_name().to_string())
}

/// Whether `name` plausibly names the language behind `code`.
///
/// Compares against the English name and the autonym, case-insensitively.
/// Unknown codes always match so that custom folder names are not rejected.
pub fn name_matches_code(code: &str, name: &str) -> bool {
    let Some(lang) = lookup(code) else {
        return true;
    };

    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return false;
    }

    let english = lang.to_name().to_lowercase();
    if english.contains(&name) || name.contains(&english) {
        return true;
    }

    lang.to_autonym()
        .map(|autonym| {
            let autonym = autonym.to_lowercase();
            autonym.contains(&name) || name.contains(&autonym)
        })
        .unwrap_or(false)
}
