use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::error::{AutofillError, Result};
use crate::fill::fill_model::FormMapping;

static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("trailing comma pattern is valid"));

/// Recover a selector → profile key mapping from raw oracle output.
///
/// The reply may be wrapped in prose or code fences, or carry small JSON
/// defects. Anything that still fails to parse is reported as
/// `InvalidOracleResponse`; no partial mapping is ever returned. Entries whose
/// value is `null` are treated as "no match" and dropped.
pub fn parse_mapping(content: &str, provider: &str) -> Result<FormMapping> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AutofillError::EmptyOracleResponse(provider.to_string()));
    }

    let invalid = || AutofillError::InvalidOracleResponse {
        provider: provider.to_string(),
    };

    let unfenced = strip_code_fence(trimmed);
    let object = extract_object(unfenced).ok_or_else(|| {
        warn!(provider, "oracle reply holds no JSON object");
        invalid()
    })?;

    let raw = parse_lenient(object).ok_or_else(|| {
        warn!(provider, "oracle reply could not be repaired");
        invalid()
    })?;

    let mut mapping = FormMapping::new();
    for (selector, value) in raw {
        match value {
            Value::String(key) => mapping.insert(selector, key),
            Value::Null => continue,
            _ => {
                warn!(provider, selector = %selector, "non-string mapping value");
                return Err(invalid());
            }
        }
    }
    Ok(mapping)
}

fn parse_lenient(object: &str) -> Option<IndexMap<String, Value>> {
    if let Ok(map) = serde_json::from_str(object) {
        return Some(map);
    }

    let mut repaired = TRAILING_COMMA.replace_all(object, "$1").into_owned();
    if let Ok(map) = serde_json::from_str(&repaired) {
        return Some(map);
    }

    // Single quotes are only swapped when no double quote appears at all.
    if !repaired.contains('"') {
        repaired = repaired.replace('\'', "\"");
        return serde_json::from_str(&repaired).ok();
    }
    None
}

/// Body of the first ``` fence, or the input unchanged.
fn strip_code_fence(text: &str) -> &str {
    let Some(start) = text.find("```") else {
        return text;
    };
    let after = &text[start + 3..];
    // Skip a language tag such as `json` on the opening line.
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    }
}

/// Outermost balanced `{...}`, honoring string literals and escapes.
fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                in_string = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => in_string = Some(ch),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
