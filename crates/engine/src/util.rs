//! Internal helpers for input normalization and model conversion.
//!
//! These utilities are **not** part of the public API.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{Currency, EngineError, ResultEngine};

/// Parse a currency code stored in the DB into a strongly typed `Currency`.
pub(crate) fn model_currency(value: &str) -> ResultEngine<Currency> {
    Currency::try_from(value)
        .map_err(|_| EngineError::InvalidCurrency(format!("invalid stored currency: {value}")))
}

/// Trim a display name; empty names are rejected.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Comparison key of a name: accents stripped, lowercased, punctuation and
/// whitespace runs collapsed to a single space.
///
/// "Café  Bar" and "cafe-bar" share the key `cafe bar`.
pub(crate) fn normalize_name_key(value: &str) -> ResultEngine<String> {
    let mut out = String::new();
    let mut prev_space = false;
    for ch in value.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            prev_space = false;
        } else if !out.is_empty() && !prev_space {
            out.push(' ');
            prev_space = true;
        }
    }
    let key = out.trim_end();
    if key.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "name '{value}' has no letters or digits"
        )));
    }
    Ok(key.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_key_folds_accents_case_and_punctuation() {
        assert_eq!(normalize_name_key("Café  Bar").unwrap(), "cafe bar");
        assert_eq!(normalize_name_key("cafe-bar!").unwrap(), "cafe bar");
        assert_eq!(normalize_name_key("  Groceries ").unwrap(), "groceries");
        assert!(normalize_name_key("--").is_err());
    }

    #[test]
    fn optional_text_drops_blank() {
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(
            normalize_optional_text(Some(" lunch ")),
            Some("lunch".to_string())
        );
        assert_eq!(normalize_optional_text(None), None);
    }

    #[test]
    fn required_name_rejects_blank() {
        assert_eq!(
            normalize_required_name("  ", "asset").unwrap_err().code(),
            "invalid_name"
        );
    }
}
