//! `{key}` placeholder substitution for crew text.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Identifier-shaped keys only; any other brace is literal text
const PLACEHOLDER: &str = r"\{([A-Za-z_][A-Za-z0-9_]*)\}";

fn placeholder_pattern() -> Result<&'static Regex> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    if let Some(re) = PATTERN.get() {
        return Ok(re);
    }
    let re = Regex::new(PLACEHOLDER)
        .map_err(|e| Error::Internal(format!("Invalid placeholder pattern: {}", e)))?;
    Ok(PATTERN.get_or_init(|| re))
}

/// Replace every `{key}` in `text` with its value from `inputs`.
///
/// A placeholder with no input is an error naming `location`.
pub fn interpolate(text: &str, inputs: &BTreeMap<String, String>, location: &str) -> Result<String> {
    let re = placeholder_pattern()?;
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in re.captures_iter(text) {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = inputs
            .get(key.as_str())
            .ok_or_else(|| Error::PlaceholderUnresolved {
                key: key.as_str().to_string(),
                location: location.to_string(),
            })?;
        out.push_str(&text[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }

    out.push_str(&text[last..]);
    Ok(out)
}
