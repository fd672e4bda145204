use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Schema tag written into new documents; carried through unmodified on
/// load/save round-trips of existing files.
pub const DOCUMENT_VERSION: &str = "1.0";

pub const DEFAULT_ROOT_TOPIC: &str = "中心主题";
pub const DEFAULT_ROOT_ID: &str = "root";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

/// One topic in the tree. Optional fields are omitted from the wire when
/// absent so saved files stay minimal and foreign documents round-trip
/// without gaining keys.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindNode {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    // only meaningful on top-level children
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MindNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
    // visual attributes, opaque to the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub icons: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl MindNode {
    /// Bare node with a fresh id, for callers building topics programmatically.
    pub fn new(topic: impl Into<String>) -> Self {
        MindNode {
            topic: topic.into(),
            id: Some(Uuid::new_v4().to_string()),
            direction: None,
            children: Vec::new(),
            expanded: None,
            style: None,
            note: None,
            hyperlink: None,
            icons: Vec::new(),
            tags: Vec::new(),
        }
    }
}

/// The persisted envelope: root tree plus layout metadata. The root node is
/// stored under the `nodeData` key in the on-disk format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindDocument {
    #[serde(rename = "nodeData")]
    pub root: MindNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl MindDocument {
    /// Canonical empty document: fixed root topic and id, no children.
    pub fn new_empty() -> Self {
        MindDocument {
            root: MindNode {
                topic: DEFAULT_ROOT_TOPIC.to_string(),
                id: Some(DEFAULT_ROOT_ID.to_string()),
                direction: Some(Direction::Right),
                children: Vec::new(),
                expanded: None,
                style: None,
                note: None,
                hyperlink: None,
                icons: Vec::new(),
                tags: Vec::new(),
            },
            direction: Some(Direction::Right),
            theme: None,
            version: Some(DOCUMENT_VERSION.to_string()),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| format!("parse document: {}", e))
    }

    /// Human-diffable form used for explicit saves.
    pub fn to_pretty_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("serialize document: {}", e))
    }
}
