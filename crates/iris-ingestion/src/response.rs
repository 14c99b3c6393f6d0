//! Parsing of collaborator output into raw claims.
//!
//! The model is asked for JSON but frequently wraps it in code fences,
//! prefixes it with prose, or returns a single object where a list was
//! expected. Parsing is lenient about shape and strict about content: a
//! claim without text is discarded, everything else is coerced.

use iris_common::RawClaim;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("empty model response")]
    Empty,

    #[error("response is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("response contains no usable claims")]
    NoClaims,
}

/// Strip code fences and a leading `json` language marker.
pub fn clean_model_text(text: &str) -> String {
    let mut cleaned = text.trim().to_string();
    if cleaned.starts_with("```") {
        cleaned = cleaned.trim_start_matches('`').to_string();
        if let Some(rest) = cleaned.strip_prefix("json").or_else(|| cleaned.strip_prefix("JSON")) {
            cleaned = rest.to_string();
        }
    }
    cleaned.trim().trim_end_matches('`').trim().to_string()
}

/// Cut the text down to the outermost JSON object or array.
fn repair_json(text: &str) -> Option<&str> {
    let open = text.find(['{', '['])?;
    let close_char = if text[open..].starts_with('{') { '}' } else { ']' };
    let close = text.rfind(close_char)?;
    (close > open).then(|| &text[open..=close])
}

/// Parse a model response into raw claims.
pub fn parse_claims(raw: &str) -> Result<Vec<RawClaim>, ParseError> {
    let cleaned = clean_model_text(raw);
    if cleaned.is_empty() {
        return Err(ParseError::Empty);
    }

    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(v) => v,
        Err(e) => match repair_json(&cleaned) {
            Some(candidate) => serde_json::from_str(candidate)?,
            None => return Err(ParseError::NotJson(e)),
        },
    };

    let objects: Vec<&Value> = match &value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match map.get("claims") {
            Some(Value::Array(items)) => items.iter().collect(),
            _ => vec![&value],
        },
        _ => Vec::new(),
    };

    let claims: Vec<RawClaim> = objects.into_iter().filter_map(claim_from_value).collect();
    if claims.is_empty() {
        return Err(ParseError::NoClaims);
    }
    Ok(claims)
}

fn claim_from_value(value: &Value) -> Option<RawClaim> {
    let obj = value.as_object()?;
    let text = ["text", "claim", "statement"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|t| !t.is_empty())?;

    Some(RawClaim {
        text: text.to_string(),
        confidence: obj.get("confidence").and_then(coerce_number),
        methods: obj.get("methods").map(coerce_strings).unwrap_or_default(),
        metrics: obj.get("metrics").map(coerce_strings).unwrap_or_default(),
        provenance: obj.get("provenance").map(coerce_strings).unwrap_or_default(),
        used_fallback: false,
    })
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_strings(value: &Value) -> Vec<String> {
    let scalar = |v: &Value| match v {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    match value {
        Value::Array(items) => items.iter().filter_map(scalar).collect(),
        other => scalar(other).into_iter().collect(),
    }
}
