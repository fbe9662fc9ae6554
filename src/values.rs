//! # Values merge helpers.
//!
//! Modules are configured by layering values: built-in defaults, the
//! global config, per-module config, and hook-computed values. The
//! merge is the usual chart-values discipline:
//!
//! - maps merge recursively, key by key;
//! - arrays concatenate (earlier layer first);
//! - anything else is replaced by the later layer.
//!
//! Later layers always win on type conflicts.

use serde_json::{Map, Value};

/// Merges `layers` left to right into a single JSON object.
///
/// Non-object layers are ignored; an empty input yields an empty object.
pub fn merge_values<'a>(layers: impl IntoIterator<Item = &'a Value>) -> Value {
    let mut result = Map::new();
    for layer in layers {
        if let Value::Object(map) = layer {
            merge_into(&mut result, map);
        }
    }
    Value::Object(result)
}

fn merge_into(base: &mut Map<String, Value>, layer: &Map<String, Value>) {
    for (key, incoming) in layer {
        match (base.get_mut(key), incoming) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_into(existing, incoming);
            }
            (Some(Value::Array(existing)), Value::Array(incoming)) => {
                existing.extend(incoming.iter().cloned());
            }
            (_, incoming) => {
                base.insert(key.clone(), incoming.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn later_scalars_override_earlier_ones() {
        let a = json!({"replicas": 1, "image": "nginx"});
        let b = json!({"replicas": 3});

        let merged = merge_values([&a, &b]);
        assert_eq!(merged, json!({"replicas": 3, "image": "nginx"}));
    }

    #[test]
    fn nested_maps_merge_recursively() {
        let a = json!({"ingress": {"host": "a.example.com", "tls": true}});
        let b = json!({"ingress": {"host": "b.example.com"}});

        let merged = merge_values([&a, &b]);
        assert_eq!(
            merged,
            json!({"ingress": {"host": "b.example.com", "tls": true}})
        );
    }

    #[test]
    fn arrays_concatenate_in_layer_order() {
        let a = json!({"hosts": ["a"]});
        let b = json!({"hosts": ["b", "c"]});

        let merged = merge_values([&a, &b]);
        assert_eq!(merged, json!({"hosts": ["a", "b", "c"]}));
    }

    #[test]
    fn type_conflict_is_won_by_the_later_layer() {
        let a = json!({"storage": {"size": "10Gi"}});
        let b = json!({"storage": "none"});

        let merged = merge_values([&a, &b]);
        assert_eq!(merged, json!({"storage": "none"}));

        let merged = merge_values([&b, &a]);
        assert_eq!(merged, json!({"storage": {"size": "10Gi"}}));
    }

    #[test]
    fn empty_input_yields_empty_object() {
        let layers: [&Value; 0] = [];
        assert_eq!(merge_values(layers), json!({}));
    }

    #[test]
    fn three_layers_merge_left_to_right() {
        let defaults = json!({"log": {"level": "info"}, "replicas": 1});
        let global = json!({"log": {"level": "debug"}});
        let module = json!({"replicas": 2, "log": {"format": "json"}});

        let merged = merge_values([&defaults, &global, &module]);
        assert_eq!(
            merged,
            json!({"log": {"level": "debug", "format": "json"}, "replicas": 2})
        );
    }
}
