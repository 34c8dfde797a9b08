//! Schema validation helpers for maistro JSON5 configuration.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    ensure_allowed_keys(map, &["$schema", "artist", "memory", "context"], layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("artist") {
        validate_artist(value, layer, "artist")?;
    }
    if let Some(value) = map.get("memory") {
        validate_memory(value, layer, "memory")?;
    }
    if let Some(value) = map.get("context") {
        validate_context(value, layer, "context")?;
    }
    Ok(())
}

/// Validate the "artist" block.
fn validate_artist(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["name", "persona_path"], layer, path)?;

    for key in ["name", "persona_path"] {
        if let Some(value) = map.get(key) {
            expect_string(value, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

/// Validate the "memory" block.
fn validate_memory(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["path", "embedding", "recall", "ingest"], layer, path)?;

    if let Some(value) = map.get("path") {
        expect_string(value, layer, &join_path(path, "path"))?;
    }
    if let Some(value) = map.get("embedding") {
        let embedding_path = join_path(path, "embedding");
        let embedding = expect_object(value, layer, &embedding_path)?;
        ensure_allowed_keys(embedding, &["dimensions"], layer, &embedding_path)?;
        if let Some(value) = embedding.get("dimensions") {
            expect_u64(value, layer, &join_path(&embedding_path, "dimensions"))?;
        }
    }
    if let Some(value) = map.get("recall") {
        validate_recall(value, layer, &join_path(path, "recall"))?;
    }
    if let Some(value) = map.get("ingest") {
        validate_ingest(value, layer, &join_path(path, "ingest"))?;
    }
    Ok(())
}

/// Validate recall tuning.
fn validate_recall(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["max_results", "min_score", "deadline_ms", "include_superseded"],
        layer,
        path,
    )?;

    if let Some(value) = map.get("max_results") {
        expect_u64(value, layer, &join_path(path, "max_results"))?;
    }
    if let Some(value) = map.get("min_score") {
        let score_path = join_path(path, "min_score");
        expect_f64(value, layer, &score_path)?;
        let score = value.as_f64().unwrap_or_default();
        if !(-1.0..=1.0).contains(&score) {
            return Err(invalid_field(layer, &score_path, "expected value in [-1, 1]"));
        }
    }
    if let Some(value) = map.get("deadline_ms") {
        expect_u64(value, layer, &join_path(path, "deadline_ms"))?;
    }
    if let Some(value) = map.get("include_superseded") {
        expect_bool(value, layer, &join_path(path, "include_superseded"))?;
    }
    Ok(())
}

/// Validate ingestion settings.
fn validate_ingest(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["chunk_max_chars", "extensions"], layer, path)?;

    if let Some(value) = map.get("chunk_max_chars") {
        if !value.is_null() {
            expect_u64(value, layer, &join_path(path, "chunk_max_chars"))?;
        }
    }
    if let Some(value) = map.get("extensions") {
        validate_string_array(value, layer, &join_path(path, "extensions"))?;
    }
    Ok(())
}

/// Validate the "context" block.
fn validate_context(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["budget", "unit"], layer, path)?;

    if let Some(value) = map.get("budget") {
        expect_u64(value, layer, &join_path(path, "budget"))?;
    }
    if let Some(value) = map.get("unit") {
        let unit_path = join_path(path, "unit");
        match value.as_str() {
            Some("chars" | "tokens") => {}
            Some(_) => {
                return Err(invalid_field(
                    layer,
                    &unit_path,
                    "expected one of: chars, tokens",
                ));
            }
            None => return Err(invalid_field(layer, &unit_path, "expected string")),
        }
    }
    Ok(())
}

/// Expect a JSON object or return a typed error.
fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

/// Expect a JSON string or return a typed error.
fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.as_str().is_some() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

/// Expect a JSON boolean or return a typed error.
fn expect_bool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if matches!(value, Value::Bool(_)) {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected bool"))
    }
}

/// Expect a non-negative JSON integer or return a typed error.
fn expect_u64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_u64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected non-negative integer"))
    }
}

/// Expect a JSON number or return a typed error.
fn expect_f64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_number() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected number"))
    }
}

/// Validate that a value is an array of strings.
fn validate_string_array(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let arr = match value {
        Value::Array(arr) => arr,
        _ => return Err(invalid_field(layer, path, "expected array")),
    };
    for (idx, entry) in arr.iter().enumerate() {
        if entry.as_str().is_none() {
            return Err(invalid_field(
                layer,
                &format!("{path}[{idx}]"),
                "expected string",
            ));
        }
    }
    Ok(())
}

/// Ensure an object contains only allowed keys.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(invalid_field(layer, &join_path(path, key), "unknown key"));
        }
    }
    Ok(())
}

/// Join nested paths for better error messages.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Build a structured invalid-field error.
fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
