//! Input checks for project and segment payloads.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::model::SegmentCondition;
use crate::errors::{AppError, AppResult};

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_SCRIPT_CHARS: usize = 5000;
pub const MAX_URL_CHARS: usize = 2048;

static UTM_SOURCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,64}$").expect("valid utm regex"));

static LANGUAGE_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8}){0,3}$").expect("valid language regex")
});

pub fn validate_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Project name is required".to_string()));
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::Validation(format!(
            "Project name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Site URLs must be absolute http(s) URLs with a host
pub fn validate_site_url(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.len() > MAX_URL_CHARS {
        return Err(AppError::Validation("URL is too long".to_string()));
    }
    let parsed = Url::parse(trimmed)
        .map_err(|e| AppError::Validation(format!("Invalid URL '{trimmed}': {e}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(AppError::Validation(
            "URL must start with http:// or https://".to_string(),
        ));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(AppError::Validation("URL must include a host".to_string()));
    }
    Ok(parsed.to_string())
}

/// Normalize a language tag: lowercase primary subtag, uppercase two-letter region
///
/// `EN-us` becomes `en-US`, `pt_br` becomes `pt-BR`.
pub fn normalize_language(raw: &str) -> AppResult<String> {
    let candidate = raw.trim().replace('_', "-");
    if candidate.len() > 35 || !LANGUAGE_TAG_RE.is_match(&candidate) {
        return Err(AppError::Validation(format!(
            "Invalid language tag '{}'",
            raw.trim()
        )));
    }

    let normalized = candidate
        .split('-')
        .enumerate()
        .map(|(i, part)| {
            if i == 0 {
                part.to_lowercase()
            } else if part.len() == 2 && part.chars().all(|c| c.is_ascii_alphabetic()) {
                part.to_uppercase()
            } else {
                part.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("-");
    Ok(normalized)
}

pub fn validate_script(script: &str) -> AppResult<String> {
    let trimmed = script.trim();
    if trimmed.chars().count() > MAX_SCRIPT_CHARS {
        return Err(AppError::Validation(format!(
            "Script must be at most {MAX_SCRIPT_CHARS} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Validate and normalize a segment condition
pub fn validate_condition(condition: SegmentCondition) -> AppResult<SegmentCondition> {
    match condition {
        SegmentCondition::UtmSource { source } => {
            let source = source.trim().to_string();
            if !UTM_SOURCE_RE.is_match(&source) {
                return Err(AppError::Validation(
                    "UTM source must be 1-64 characters of letters, digits, '.', '_' or '-'"
                        .to_string(),
                ));
            }
            Ok(SegmentCondition::UtmSource { source })
        }
        SegmentCondition::Language { language } => Ok(SegmentCondition::Language {
            language: normalize_language(&language)?,
        }),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Acme  ").unwrap(), "Acme");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(101)).is_err());
        assert!(validate_name(&"é".repeat(100)).is_ok());
    }

    #[test]
    fn test_validate_site_url() {
        assert_eq!(
            validate_site_url("https://acme.test").unwrap(),
            "https://acme.test/"
        );
        assert!(validate_site_url("ftp://acme.test").is_err());
        assert!(validate_site_url("acme.test").is_err());
        assert!(validate_site_url("mailto:someone@acme.test").is_err());
    }

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("EN-us").unwrap(), "en-US");
        assert_eq!(normalize_language("pt_br").unwrap(), "pt-BR");
        assert_eq!(normalize_language("zh-Hant-TW").unwrap(), "zh-Hant-TW");
        assert_eq!(normalize_language("fr").unwrap(), "fr");
        assert!(normalize_language("english").is_err());
        assert!(normalize_language("").is_err());
    }

    #[test]
    fn test_validate_script_length() {
        assert_eq!(validate_script("  hi ").unwrap(), "hi");
        assert!(validate_script(&"a".repeat(MAX_SCRIPT_CHARS + 1)).is_err());
    }

    #[test]
    fn test_validate_condition() {
        let utm = validate_condition(SegmentCondition::UtmSource {
            source: " google ".to_string(),
        })
        .unwrap();
        assert_eq!(
            utm,
            SegmentCondition::UtmSource {
                source: "google".to_string()
            }
        );

        assert!(
            validate_condition(SegmentCondition::UtmSource {
                source: "bad source!".to_string()
            })
            .is_err()
        );

        let lang = validate_condition(SegmentCondition::Language {
            language: "DE-de".to_string(),
        })
        .unwrap();
        assert_eq!(
            lang,
            SegmentCondition::Language {
                language: "de-DE".to_string()
            }
        );
    }
}
