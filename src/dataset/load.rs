use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use super::records::DatasetInput;

pub fn load_dataset(path: &Path) -> Result<DatasetInput> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset file {}", path.display()))?;
    parse_dataset(&raw).with_context(|| format!("failed to parse dataset file {}", path.display()))
}

/// Accepts either the dataset object itself or an API envelope that wraps it in
/// a `data` field.
pub fn parse_dataset(raw: &str) -> Result<DatasetInput> {
    let parsed: Value = serde_json::from_str(raw).context("invalid dataset JSON")?;
    let object = parsed
        .as_object()
        .ok_or_else(|| anyhow!("dataset JSON must be an object"))?;

    let payload = match object.get("data") {
        Some(data) if data.is_object() => data.clone(),
        _ => parsed,
    };

    DatasetInput::deserialize_value(payload)
}

impl DatasetInput {
    fn deserialize_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).context("dataset JSON does not match the node/relation shape")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize dataset")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_dataset() {
        let dataset = parse_dataset(
            r#"{
                "nodes": [
                    {"id": "a", "label": "Alpha", "state": "mastered", "sizeHint": 0.2, "tags": ["x"]},
                    {"_id": "b", "title": "Beta", "status": "reviewing"}
                ],
                "relations": [
                    {"sourceId": "a", "targetId": "b", "relationType": "derived", "strength": 0.9}
                ],
                "enableTagInference": true
            }"#,
        )
        .expect("dataset parses");

        assert_eq!(dataset.nodes.len(), 2);
        assert_eq!(dataset.nodes[1].id, "b");
        assert_eq!(dataset.nodes[1].label, "Beta");
        assert_eq!(dataset.nodes[1].state.as_deref(), Some("reviewing"));
        assert_eq!(dataset.relations[0].relation_type.as_deref(), Some("derived"));
        assert!(dataset.enable_tag_inference);
    }

    #[test]
    fn unwraps_data_envelope_and_edge_alias() {
        let dataset = parse_dataset(
            r#"{"data": {"knowledgePoints": [{"id": "n"}], "edges": [{"source": "n", "target": "m"}]}}"#,
        )
        .expect("envelope parses");

        assert_eq!(dataset.nodes.len(), 1);
        assert_eq!(dataset.relations[0].target_id, "m");
        assert!(!dataset.enable_tag_inference);
    }

    #[test]
    fn rejects_non_object_json() {
        assert!(parse_dataset("[1, 2, 3]").is_err());
        assert!(parse_dataset("not json").is_err());
    }

    #[test]
    fn serialized_dataset_parses_back() {
        let dataset = parse_dataset(r#"{"nodes": [{"id": "n", "tags": ["t"]}]}"#).expect("parses");
        let json = dataset.to_json().expect("serializes");
        let reparsed = parse_dataset(&json).expect("reparses");
        assert_eq!(reparsed.nodes[0].tags, vec!["t".to_owned()]);
    }
}
