//! Tree form of a document: `{type, attrs?, content?, text?, marks?}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Attrs, Mark, Node, NodeType, SchemaError};
use crate::error::{Result, StepsError};

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonNode {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<JsonNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    marks: Vec<Mark>,
}

impl From<&Node> for JsonNode {
    fn from(node: &Node) -> Self {
        Self {
            kind: node.kind().name().to_string(),
            attrs: node.attrs().clone(),
            content: node.content().iter().map(JsonNode::from).collect(),
            text: node.is_text().then(|| node.as_text().to_string()),
            marks: node.marks().to_vec(),
        }
    }
}

impl TryFrom<JsonNode> for Node {
    type Error = StepsError;

    fn try_from(json: JsonNode) -> Result<Self> {
        let kind =
            NodeType::from_name(&json.kind).ok_or(SchemaError::UnknownType(json.kind.clone()))?;
        if kind.is_text() {
            let text = json.text.unwrap_or_default();
            return Ok(Node::styled_text(&text, json.marks).with_attrs(json.attrs));
        }
        if json.text.is_some() || !json.marks.is_empty() {
            return Err(StepsError::Parse(format!(
                "{} node carries text or marks",
                kind.name()
            )));
        }
        let content = json
            .content
            .into_iter()
            .map(Node::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Node::new(kind, content).with_attrs(json.attrs))
    }
}

impl Node {
    pub fn to_json(&self) -> Value {
        // A map of strings, nodes and marks always serializes.
        serde_json::to_value(JsonNode::from(self)).unwrap_or(Value::Null)
    }

    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Builds a node from its tree form and validates it against the schema.
    pub fn from_json(value: &Value) -> Result<Self> {
        let json = JsonNode::deserialize(value).map_err(|err| StepsError::Parse(err.to_string()))?;
        let node = Node::try_from(json)?;
        node.check()?;
        Ok(node)
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(input).map_err(|err| StepsError::Parse(err.to_string()))?;
        Self::from_json(&value)
    }
}
