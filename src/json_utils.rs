use serde_json::Value;

/// Render an id-like value as a string: strings as-is, integers in decimal.
/// Anything else (null, bool, float, containers) is not an id.
pub fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        _ => None,
    }
}

/// Extract a record id. `id_str` wins over `id` because numeric ids above 2^53
/// lose precision in some JSON producers.
pub fn record_id(v: &Value) -> Option<String> {
    v.get("id_str").and_then(id_string).or_else(|| v.get("id").and_then(id_string))
}

/// Pull the continuation token out of a search response.
pub fn next_token(v: &Value) -> Option<String> {
    v.get("meta")
        .and_then(|m| m.get("next_token"))
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
}

/// Text for a table cell: `null` is missing, strings pass through, other
/// scalars use their JSON text.
pub fn cell_from_value(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
