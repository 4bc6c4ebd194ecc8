//! # Structured Patch Values
//!
//! `tree` patches carry a small HTML syntax tree instead of a string. The
//! shape follows the hast convention (`type`, `tagName`, `properties`,
//! `children`) so the edge renderer can hydrate it without a parser.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A node of a structured patch value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TreeNode {
    /// Wrapper holding a sequence of sibling nodes.
    Root {
        /// Top-level nodes.
        children: Vec<TreeNode>,
    },
    /// An HTML element.
    #[serde(rename_all = "camelCase")]
    Element {
        /// Lowercase tag name.
        tag_name: String,
        /// Attributes, sorted for deterministic serialization.
        #[serde(default)]
        properties: BTreeMap<String, String>,
        /// Child nodes in document order.
        #[serde(default)]
        children: Vec<TreeNode>,
    },
    /// A text node.
    Text {
        /// Raw text; escaping is the renderer's job.
        value: String,
    },
}

impl TreeNode {
    /// Build a root node from its children.
    pub fn root(children: Vec<TreeNode>) -> Self {
        Self::Root { children }
    }

    /// Build an element without attributes.
    pub fn element(tag_name: impl Into<String>, children: Vec<TreeNode>) -> Self {
        Self::Element {
            tag_name: tag_name.into(),
            properties: BTreeMap::new(),
            children,
        }
    }

    /// Build a text node.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
        }
    }

    /// Build an element holding a single text child.
    pub fn text_element(tag_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::element(tag_name, vec![Self::text(value)])
    }

    /// Set an attribute. No-op on non-element nodes.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Self::Element { properties, .. } = &mut self {
            properties.insert(name.into(), value.into());
        }
        self
    }

    /// Concatenated text content of this node and its descendants.
    pub fn text_content(&self) -> String {
        match self {
            Self::Text { value } => value.clone(),
            Self::Root { children } | Self::Element { children, .. } => {
                children.iter().map(TreeNode::text_content).collect()
            }
        }
    }
}
