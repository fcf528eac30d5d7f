use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::document::NodeType;
use crate::editor::Shortcut;

pub const DEFAULT_TITLE_PLACEHOLDER: &str = "Step title";
pub const DEFAULT_CONTENT_PLACEHOLDER: &str = "Add step instructions…";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Behaviour and serialization settings for the step nodes.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StepsOptions {
    /// Heading level used when a step title is dissolved back into prose.
    pub heading_level: u8,
    pub title_placeholder: Option<String>,
    pub content_placeholder: Option<String>,
    /// Extra HTML attributes per step node, keyed by node name
    /// (`steps`, `stepItem`, `stepTitle`, `stepContent`).
    pub html_attributes: BTreeMap<String, BTreeMap<String, String>>,
    pub toggle_shortcut: Shortcut,
}

impl Default for StepsOptions {
    fn default() -> Self {
        Self {
            heading_level: 2,
            title_placeholder: Some(DEFAULT_TITLE_PLACEHOLDER.to_string()),
            content_placeholder: Some(DEFAULT_CONTENT_PLACEHOLDER.to_string()),
            html_attributes: BTreeMap::new(),
            toggle_shortcut: Shortcut::default(),
        }
    }
}

impl StepsOptions {
    /// Loads options from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| {
            tracing::warn!("Failed to read config at {:?}: {}", path, source);
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Self::parse(&content).map_err(|source| {
            tracing::warn!("Failed to parse config at {:?}: {}", path, source);
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let mut options: Self = toml::from_str(content)?;
        options.heading_level = options.heading_level.clamp(1, 6);
        Ok(options)
    }

    pub fn html_attributes_for(&self, kind: NodeType) -> Option<&BTreeMap<String, String>> {
        self.html_attributes.get(kind.name())
    }

    pub fn placeholder_for(&self, kind: NodeType) -> Option<&str> {
        match kind {
            NodeType::StepTitle => self.title_placeholder.as_deref(),
            NodeType::StepContent => self.content_placeholder.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    #[test]
    fn parse_empty_config() {
        let options = StepsOptions::parse("").unwrap();
        assert_eq!(options, StepsOptions::default());
        assert_eq!(
            options.placeholder_for(NodeType::StepTitle),
            Some(DEFAULT_TITLE_PLACEHOLDER)
        );
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
heading_level = 3
title_placeholder = "Name this step"
toggle_shortcut = "ctrl+shift+l"

[html_attributes.steps]
class = "guide"
"#;
        let options = StepsOptions::parse(toml_str).unwrap();
        assert_eq!(options.heading_level, 3);
        assert_eq!(
            options.placeholder_for(NodeType::StepTitle),
            Some("Name this step")
        );
        assert_eq!(
            options.placeholder_for(NodeType::StepContent),
            Some(DEFAULT_CONTENT_PLACEHOLDER)
        );
        assert_eq!(
            options
                .html_attributes_for(NodeType::Steps)
                .and_then(|attrs| attrs.get("class"))
                .map(String::as_str),
            Some("guide")
        );
        assert_eq!(options.toggle_shortcut.code, KeyCode::Char('l'));
        assert_eq!(
            options.toggle_shortcut.modifiers,
            KeyModifiers::CONTROL | KeyModifiers::SHIFT
        );
    }

    #[test]
    fn heading_level_is_clamped() {
        let options = StepsOptions::parse("heading_level = 9").unwrap();
        assert_eq!(options.heading_level, 6);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(StepsOptions::parse("colour = \"red\"").is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let options = StepsOptions::load(Path::new("/definitely/not/here.toml")).unwrap();
        assert_eq!(options, StepsOptions::default());
    }
}
