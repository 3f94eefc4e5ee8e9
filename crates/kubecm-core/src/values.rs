//! Values trees and their layered merge
//!
//! Every data section (vars, resources, values, patches) is a [`Values`]
//! tree. Layers are merged from lowest to highest priority:
//!
//! - mappings merge key by key, keys keep the position of their first
//!   appearance
//! - scalars and sequences from the higher layer replace the lower one
//! - a null in the higher layer removes the key (knockout)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::path::Path;

use crate::error::{CoreError, Result};

/// A YAML/JSON tree with layered merge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    /// An empty mapping
    pub fn new() -> Self {
        Self(JsonValue::Object(Map::new()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse a YAML document; an empty document is an empty mapping
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        match serde_yaml::from_str::<JsonValue>(yaml)? {
            JsonValue::Null => Ok(Self::new()),
            value => Ok(Self(value)),
        }
    }

    /// Merge a higher-priority layer into this one
    pub fn merge(&mut self, overlay: &Values) {
        merge_tree(&mut self.0, &overlay.0, Nulls::KnockOut);
    }

    /// Combine two overlays into one, keeping the nulls of `overlay` so
    /// the result still knocks out keys when merged into data
    pub fn stack(&mut self, overlay: &Values) {
        merge_tree(&mut self.0, &overlay.0, Nulls::Keep);
    }

    /// Set a value at a dotted path such as `image.tag`, creating
    /// intermediate mappings
    pub fn set(&mut self, path: &str, value: JsonValue) -> Result<()> {
        let segments = segments(path).ok_or_else(|| CoreError::ValuesMerge {
            message: format!("Invalid key path: '{}'", path),
        })?;

        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| CoreError::ValuesMerge {
                message: "empty key path".to_string(),
            })?;

        let mut node = &mut self.0;
        for segment in parents {
            node = ensure_mapping(node)?
                .entry(segment.to_string())
                .or_insert_with(|| JsonValue::Object(Map::new()));
        }
        ensure_mapping(node)?.insert(last.to_string(), value);
        Ok(())
    }

    /// Value at a dotted path; numeric segments index sequences and the
    /// empty path is the whole tree
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        if path.is_empty() {
            return Some(&self.0);
        }

        path.split('.').try_fold(&self.0, |node, segment| match node {
            JsonValue::Object(map) => map.get(segment),
            JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Whether the tree is null or an empty mapping
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }
}

impl From<JsonValue> for Values {
    fn from(value: JsonValue) -> Self {
        Self(value)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Nulls {
    KnockOut,
    Keep,
}

fn merge_tree(base: &mut JsonValue, overlay: &JsonValue, nulls: Nulls) {
    match (base.as_object_mut(), overlay.as_object()) {
        (Some(base_map), Some(overlay_map)) => {
            for (key, value) in overlay_map {
                if value.is_null() && nulls == Nulls::KnockOut {
                    base_map.remove(key);
                } else if let Some(existing) = base_map.get_mut(key) {
                    merge_tree(existing, value, nulls);
                } else {
                    base_map.insert(key.clone(), value.clone());
                }
            }
        }
        _ => *base = overlay.clone(),
    }
}

fn segments(path: &str) -> Option<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').collect();
    (!segments.iter().any(|s| s.is_empty())).then_some(segments)
}

// Scalars on the way are replaced by a mapping
fn ensure_mapping(node: &mut JsonValue) -> Result<&mut Map<String, JsonValue>> {
    if !node.is_object() {
        *node = JsonValue::Object(Map::new());
    }
    node.as_object_mut().ok_or_else(|| CoreError::ValuesMerge {
        message: "expected a mapping".to_string(),
    })
}

/// Parse `--set key.path=value` overrides
///
/// `true`, `false` and `null` are typed, as are integers written without
/// leading zeros and JSON sequences/mappings. Everything else, `1.10` and
/// `007` included, stays a string.
pub fn parse_set_values(set_args: &[String]) -> Result<Values> {
    let mut values = Values::new();

    for arg in set_args {
        let (key, raw) = arg.split_once('=').ok_or_else(|| CoreError::ValuesMerge {
            message: format!("Invalid --set format: '{}'. Expected key=value", arg),
        })?;
        values.set(key, infer_scalar(raw))?;
    }

    Ok(values)
}

fn infer_scalar(raw: &str) -> JsonValue {
    match raw {
        "true" => return JsonValue::Bool(true),
        "false" => return JsonValue::Bool(false),
        "null" => return JsonValue::Null,
        _ => {}
    }

    if let Ok(int) = raw.parse::<i64>() {
        if int.to_string() == raw {
            return JsonValue::from(int);
        }
    }
    if raw.starts_with('[') || raw.starts_with('{') {
        if let Ok(structured) = serde_json::from_str(raw) {
            return structured;
        }
    }
    JsonValue::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn yaml(source: &str) -> Values {
        Values::from_yaml(source).unwrap()
    }

    #[test]
    fn test_higher_layer_wins() {
        let mut common = yaml(
            "config:\n  data:\n    memory_example: 512Mi\n    threads_example: '4'\n",
        );
        common.merge(&yaml("config:\n  data:\n    memory_example: 1Gi\n"));

        assert_eq!(common.get("config.data.memory_example").unwrap(), "1Gi");
        assert_eq!(common.get("config.data.threads_example").unwrap(), "4");
    }

    #[test]
    fn test_null_knocks_out_key() {
        let mut common = yaml("secret:\n  kind: Secret\nconfig:\n  kind: ConfigMap\n");
        common.merge(&yaml("secret: null\n"));

        assert!(common.get("secret").is_none());
        assert_eq!(common.get("config.kind").unwrap(), "ConfigMap");
    }

    #[test]
    fn test_keys_keep_first_position() {
        let mut base = yaml("deployment: {}\nconfig: {}\n");
        base.merge(&yaml("service: {}\ndeployment:\n  replicas: 2\n"));

        let keys: Vec<&String> = base.inner().as_object().unwrap().keys().collect();
        assert_eq!(keys, ["deployment", "config", "service"]);
    }

    #[test]
    fn test_stack_keeps_nulls() {
        let mut extra = Values::new();
        extra.stack(&yaml("replicas: null\nimage:\n  tag: null\n  repo: nginx\n"));
        assert_eq!(
            extra.inner(),
            &json!({"replicas": null, "image": {"tag": null, "repo": "nginx"}})
        );

        let mut data = yaml("replicas: 3\nimage:\n  tag: v1\n  pullPolicy: Always\n");
        data.merge(&extra);
        assert_eq!(
            data.inner(),
            &json!({"image": {"pullPolicy": "Always", "repo": "nginx"}})
        );
    }

    #[test]
    fn test_stack_later_overlay_wins() {
        let mut extra = yaml("replicas: null\n");
        extra.stack(&yaml("replicas: 2\n"));
        assert_eq!(extra.get("replicas").unwrap(), 2);
    }

    #[test]
    fn test_sequences_replace() {
        let mut base = yaml("args: [--verbose, --port=80]\n");
        base.merge(&yaml("args: [--port=8080]\n"));

        assert_eq!(base.get("args").unwrap(), &json!(["--port=8080"]));
    }

    #[test]
    fn test_mapping_replaces_scalar() {
        let mut base = yaml("image: nginx\n");
        base.merge(&yaml("image:\n  tag: v1\n"));
        assert_eq!(base.get("image.tag").unwrap(), "v1");
    }

    #[test]
    fn test_empty_document() {
        let values = yaml("");
        assert!(values.is_empty());
        assert!(values.inner().is_object());
    }

    #[test]
    fn test_set_creates_mappings() {
        let mut values = yaml("image: nginx\n");
        values.set("image.tag", json!("v1")).unwrap();
        values.set("replicas", json!(3)).unwrap();

        assert_eq!(values.inner(), &json!({"image": {"tag": "v1"}, "replicas": 3}));
    }

    #[test]
    fn test_set_rejects_empty_segment() {
        let mut values = Values::new();
        assert!(values.set("image..tag", JsonValue::Null).is_err());
        assert!(values.set("", JsonValue::Null).is_err());
    }

    #[test]
    fn test_get_paths() {
        let values = yaml("spec:\n  ports:\n    - name: http\n");
        assert_eq!(values.get("spec.ports.0.name").unwrap(), "http");
        assert!(values.get("spec.ports.1").is_none());
        assert!(values.get("spec.ports.name").is_none());
        assert_eq!(values.get(""), Some(values.inner()));
    }

    #[test]
    fn test_parse_set_values() {
        let args: Vec<String> = [
            "image.tag=v2",
            "replicas=5",
            "ratio=0.5",
            "image.version=1.10",
            "code=007",
            "offset=-3",
            "debug=true",
            "args=[\"a\",\"b\"]",
            "name={not json",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let values = parse_set_values(&args).unwrap();

        assert_eq!(values.get("image.tag").unwrap(), "v2");
        assert_eq!(values.get("replicas").unwrap(), 5);
        assert_eq!(values.get("ratio").unwrap(), "0.5");
        assert_eq!(values.get("image.version").unwrap(), "1.10");
        assert_eq!(values.get("code").unwrap(), "007");
        assert_eq!(values.get("offset").unwrap(), -3);
        assert_eq!(values.get("debug").unwrap(), true);
        assert_eq!(values.get("args").unwrap(), &json!(["a", "b"]));
        assert_eq!(values.get("name").unwrap(), "{not json");
    }

    #[test]
    fn test_parse_set_values_invalid() {
        let err = parse_set_values(&["novalue".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Expected key=value"));
    }
}
