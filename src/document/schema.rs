use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Node;

/// The closed set of node types the document knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    Doc,
    Paragraph,
    Heading,
    Blockquote,
    BulletList,
    OrderedList,
    ListItem,
    CodeBlock,
    Steps,
    StepItem,
    StepTitle,
    StepContent,
    Text,
}

/// Inline formatting applied to text runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{parent:?} cannot contain {found}")]
    InvalidContent { parent: NodeType, found: String },
    #[error("{0:?} requires at least one child")]
    EmptyContent(NodeType),
    #[error("mark {mark:?} is not allowed inside {parent:?}")]
    DisallowedMark { parent: NodeType, mark: Mark },
    #[error("text nodes must not be empty")]
    EmptyText,
    #[error("heading level {0} is out of range")]
    InvalidHeadingLevel(u64),
    #[error("unknown node type `{0}`")]
    UnknownType(String),
}

const ALL_TYPES: [NodeType; 13] = [
    NodeType::Doc,
    NodeType::Paragraph,
    NodeType::Heading,
    NodeType::Blockquote,
    NodeType::BulletList,
    NodeType::OrderedList,
    NodeType::ListItem,
    NodeType::CodeBlock,
    NodeType::Steps,
    NodeType::StepItem,
    NodeType::StepTitle,
    NodeType::StepContent,
    NodeType::Text,
];

impl NodeType {
    pub fn name(self) -> &'static str {
        match self {
            NodeType::Doc => "doc",
            NodeType::Paragraph => "paragraph",
            NodeType::Heading => "heading",
            NodeType::Blockquote => "blockquote",
            NodeType::BulletList => "bulletList",
            NodeType::OrderedList => "orderedList",
            NodeType::ListItem => "listItem",
            NodeType::CodeBlock => "codeBlock",
            NodeType::Steps => "steps",
            NodeType::StepItem => "stepItem",
            NodeType::StepTitle => "stepTitle",
            NodeType::StepContent => "stepContent",
            NodeType::Text => "text",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ALL_TYPES.iter().copied().find(|kind| kind.name() == name)
    }

    pub fn is_text(self) -> bool {
        self == NodeType::Text
    }

    /// Blocks whose content is inline text.
    pub fn is_textblock(self) -> bool {
        matches!(
            self,
            NodeType::Paragraph | NodeType::Heading | NodeType::CodeBlock | NodeType::StepTitle
        )
    }

    /// Members of the host `block` group.
    pub fn is_block(self) -> bool {
        matches!(
            self,
            NodeType::Paragraph
                | NodeType::Heading
                | NodeType::Blockquote
                | NodeType::BulletList
                | NodeType::OrderedList
                | NodeType::CodeBlock
        )
    }

    pub fn is_step_node(self) -> bool {
        matches!(
            self,
            NodeType::Steps | NodeType::StepItem | NodeType::StepTitle | NodeType::StepContent
        )
    }

    /// Whether a child of type `child` may appear anywhere in this node's content.
    pub fn accepts(self, child: NodeType) -> bool {
        match self {
            NodeType::Doc => child.is_block() || child == NodeType::Steps,
            NodeType::Paragraph
            | NodeType::Heading
            | NodeType::CodeBlock
            | NodeType::StepTitle => child == NodeType::Text,
            NodeType::Blockquote | NodeType::ListItem | NodeType::StepContent => child.is_block(),
            NodeType::BulletList | NodeType::OrderedList => child == NodeType::ListItem,
            NodeType::Steps => child == NodeType::StepItem,
            NodeType::StepItem => matches!(child, NodeType::StepTitle | NodeType::StepContent),
            NodeType::Text => false,
        }
    }

    pub fn allows_mark(self, mark: Mark) -> bool {
        match self {
            NodeType::Paragraph | NodeType::Heading => true,
            NodeType::StepTitle => mark == Mark::Italic,
            _ => false,
        }
    }

    fn requires_content(self) -> bool {
        matches!(
            self,
            NodeType::Doc
                | NodeType::Blockquote
                | NodeType::BulletList
                | NodeType::OrderedList
                | NodeType::ListItem
                | NodeType::Steps
                | NodeType::StepContent
        )
    }

    /// Checks the direct children of a node of this type.
    pub fn check_content(self, children: &[Node]) -> Result<(), SchemaError> {
        if self == NodeType::StepItem {
            return match children {
                [title, content]
                    if title.kind() == NodeType::StepTitle
                        && content.kind() == NodeType::StepContent =>
                {
                    Ok(())
                }
                _ => Err(SchemaError::InvalidContent {
                    parent: self,
                    found: describe(children),
                }),
            };
        }

        if self.requires_content() && children.is_empty() {
            return Err(SchemaError::EmptyContent(self));
        }
        if let Some(child) = children.iter().find(|child| !self.accepts(child.kind())) {
            return Err(SchemaError::InvalidContent {
                parent: self,
                found: child.kind().name().to_string(),
            });
        }
        for child in children.iter().filter(|child| child.is_text()) {
            if child.as_text().is_empty() {
                return Err(SchemaError::EmptyText);
            }
            if let Some(mark) = child.marks().iter().find(|mark| !self.allows_mark(**mark)) {
                return Err(SchemaError::DisallowedMark {
                    parent: self,
                    mark: *mark,
                });
            }
        }
        Ok(())
    }
}

fn describe(children: &[Node]) -> String {
    let names = children
        .iter()
        .map(|child| child.kind().name())
        .collect::<Vec<_>>();
    format!("[{}]", names.join(", "))
}
