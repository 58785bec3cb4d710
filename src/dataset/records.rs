use serde::{Deserialize, Serialize};

/// Raw dataset handed to the engine by the data-loading collaborator.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetInput {
    #[serde(default, alias = "knowledgePoints")]
    pub nodes: Vec<NodeRecord>,
    #[serde(default, alias = "edges")]
    pub relations: Vec<RelationRecord>,
    #[serde(default)]
    pub enable_tag_inference: bool,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, alias = "title")]
    pub label: String,
    #[serde(default, alias = "status", alias = "stateFlag")]
    pub state: Option<String>,
    #[serde(default)]
    pub review_list: bool,
    #[serde(default)]
    pub size_hint: Option<f32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub skin: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationRecord {
    #[serde(alias = "source")]
    pub source_id: String,
    #[serde(alias = "target")]
    pub target_id: String,
    #[serde(default)]
    pub relation_type: Option<String>,
    #[serde(default)]
    pub strength: Option<f32>,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

impl RelationRecord {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, strength: f32) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_type: None,
            strength: Some(strength),
        }
    }

    pub fn with_type(mut self, relation_type: &str) -> Self {
        self.relation_type = Some(relation_type.to_owned());
        self
    }
}
