//! Layer merging.

use serde_json::{Map, Value};

/// Fold `overlay` into `base`.
///
/// Sections merge key by key. Any other overlay value, including lists and
/// an explicit `null`, replaces what the lower layer set.
pub(super) fn merge_layer(base: &mut Value, overlay: Value) {
    let Value::Object(overlay) = overlay else {
        *base = overlay;
        return;
    };
    if !base.is_object() {
        *base = Value::Object(Map::new());
    }
    if let Value::Object(sections) = base {
        for (key, value) in overlay {
            match sections.get_mut(&key) {
                Some(slot) if value.is_object() => merge_layer(slot, value),
                Some(slot) => *slot = value,
                None => {
                    sections.insert(key, value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::merge_layer;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn sections_merge_and_lists_replace() {
        let mut base = json!({
            "memory": { "recall": { "max_results": 5 }, "ingest": { "extensions": ["md", "txt"] } }
        });
        merge_layer(
            &mut base,
            json!({
                "memory": { "recall": { "min_score": 0.2 }, "ingest": { "extensions": ["md"] } }
            }),
        );
        assert_eq!(
            base,
            json!({
                "memory": {
                    "recall": { "max_results": 5, "min_score": 0.2 },
                    "ingest": { "extensions": ["md"] }
                }
            })
        );
    }

    #[test]
    fn explicit_null_overrides_lower_layer() {
        let mut base = json!({ "memory": { "ingest": { "chunk_max_chars": 2000 } } });
        merge_layer(
            &mut base,
            json!({ "memory": { "ingest": { "chunk_max_chars": null } } }),
        );
        assert_eq!(
            base,
            json!({ "memory": { "ingest": { "chunk_max_chars": null } } })
        );
    }

    #[test]
    fn section_replaces_scalar() {
        let mut base = json!({ "context": 5 });
        merge_layer(&mut base, json!({ "context": { "budget": 10 } }));
        assert_eq!(base, json!({ "context": { "budget": 10 } }));
    }
}
