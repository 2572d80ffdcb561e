//! Node predicates used as search endpoints.
//!
//! Callers usually know the format they want, not which handler should
//! serve it, so search endpoints are predicates rather than node ids.

use std::fmt;
use std::sync::Arc;

use convgraph_core::types::format::{Category, Format};

use crate::node::Node;

/// Predicate over graph nodes.
#[derive(Clone)]
pub enum NodeSelector {
    /// Exactly this (handler, format id) pair.
    Node {
        /// Handler name.
        handler: String,
        /// Format id.
        format: String,
    },
    /// Any node with this format id.
    Format(String),
    /// Any node whose format has this MIME type.
    Mime(String),
    /// Any node whose format has this extension.
    Extension(String),
    /// Any node whose format belongs to this category.
    Category(Category),
    /// Arbitrary predicate.
    Custom(Arc<dyn Fn(&Node) -> bool + Send + Sync>),
}

impl NodeSelector {
    /// Select exactly `node`.
    pub fn node(node: &Node) -> Self {
        Self::Node {
            handler: node.handler().to_string(),
            format: node.format().id.clone(),
        }
    }

    /// Select any node carrying the format id.
    pub fn format(id: impl Into<String>) -> Self {
        Self::Format(id.into())
    }

    /// Select with an arbitrary predicate.
    pub fn custom(predicate: impl Fn(&Node) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(predicate))
    }

    /// Whether `node` satisfies this selector.
    pub fn matches(&self, node: &Node) -> bool {
        let format = node.format();
        match self {
            Self::Node { handler, format: id } => {
                node.handler() == handler.as_str() && &format.id == id
            }
            Self::Format(id) => &format.id == id,
            Self::Mime(mime) => format.matches_mime(mime),
            Self::Extension(ext) => format.matches_extension(ext),
            Self::Category(category) => format.has_category(*category),
            Self::Custom(predicate) => predicate(node),
        }
    }
}

impl From<&Format> for NodeSelector {
    fn from(format: &Format) -> Self {
        Self::Format(format.id.clone())
    }
}

impl From<&Node> for NodeSelector {
    fn from(node: &Node) -> Self {
        Self::node(node)
    }
}

impl fmt::Debug for NodeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node { handler, format } => write!(f, "Node({format}@{handler})"),
            Self::Format(id) => write!(f, "Format({id})"),
            Self::Mime(mime) => write!(f, "Mime({mime})"),
            Self::Extension(ext) => write!(f, "Extension({ext})"),
            Self::Category(category) => write!(f, "Category({category})"),
            Self::Custom(_) => write!(f, "Custom(<predicate>)"),
        }
    }
}

impl fmt::Display for NodeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node { handler, format } => write!(f, "{format}@{handler}"),
            Self::Format(id) => write!(f, "{id}"),
            Self::Mime(mime) => write!(f, "{mime}"),
            Self::Extension(ext) => write!(f, ".{ext}"),
            Self::Category(category) => write!(f, "any {category}"),
            Self::Custom(_) => write!(f, "<predicate>"),
        }
    }
}
