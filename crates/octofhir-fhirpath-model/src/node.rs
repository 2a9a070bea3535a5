//! Result nodes and parent-aware element handles

use crate::{ElementNode, ElementRef};
use octofhir_fhirpath_types::Value;
use std::fmt;
use std::sync::Arc;

/// An element together with the chain of elements it was reached through
#[derive(Clone)]
pub struct ScopedNode {
    inner: Arc<Scoped>,
}

struct Scoped {
    element: ElementRef,
    parent: Option<ScopedNode>,
}

impl ScopedNode {
    /// A node with no known parent
    pub fn root(element: ElementRef) -> Self {
        Self {
            inner: Arc::new(Scoped {
                element,
                parent: None,
            }),
        }
    }

    pub fn element(&self) -> &dyn ElementNode {
        self.inner.element.as_ref()
    }

    pub fn parent(&self) -> Option<&ScopedNode> {
        self.inner.parent.as_ref()
    }

    /// Children, each remembering `self` as parent
    pub fn children(&self, name: Option<&str>) -> Vec<ScopedNode> {
        self.inner
            .element
            .children(name)
            .into_iter()
            .map(|element| Self {
                inner: Arc::new(Scoped {
                    element,
                    parent: Some(self.clone()),
                }),
            })
            .collect()
    }

    /// Self and then each ancestor, innermost first
    pub fn ancestors(&self) -> impl Iterator<Item = &ScopedNode> {
        std::iter::successors(Some(self), |node: &&ScopedNode| node.parent())
    }

    /// Nearest resource at or above this node
    pub fn resource(&self) -> Option<&ScopedNode> {
        self.ancestors().find(|node| node.element().is_resource())
    }

    /// Nearest resource that is not itself contained in another resource
    pub fn root_resource(&self) -> Option<&ScopedNode> {
        let mut current = self.resource()?;
        while current.element().name() == "contained" {
            match current.parent().and_then(ScopedNode::resource) {
                Some(container) => current = container,
                None => break,
            }
        }
        Some(current)
    }

    /// Address of the element this chain was entered at, which tells
    /// separately built trees apart
    fn tree_address(&self) -> *const () {
        let top = self.ancestors().last().unwrap_or(self);
        Arc::as_ptr(&top.inner.element).cast::<()>()
    }

    /// True when both handles point at the same data-tree element instance
    pub fn same_element(&self, other: &ScopedNode) -> bool {
        std::ptr::addr_eq(
            Arc::as_ptr(&self.inner.element),
            Arc::as_ptr(&other.inner.element),
        )
    }
}

impl fmt::Debug for ScopedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedNode")
            .field("location", &self.element().location())
            .field("type", &self.element().type_name())
            .field("value", &self.element().value())
            .finish()
    }
}

/// One entry of a result collection
#[derive(Debug, Clone)]
pub enum Node {
    /// An element of the navigated data tree
    Element(ScopedNode),
    /// A value computed during evaluation
    Value(Value),
}

impl Node {
    pub fn element(element: ElementRef) -> Self {
        Self::Element(ScopedNode::root(element))
    }

    /// Primitive value carried by this node
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Element(node) => node.element().value(),
            Self::Value(value) => Some(value),
        }
    }

    pub fn as_scoped(&self) -> Option<&ScopedNode> {
        match self {
            Self::Element(node) => Some(node),
            Self::Value(_) => None,
        }
    }

    /// Element type tag, or the system type name for computed values
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Element(node) => node.element().type_name(),
            Self::Value(value) => Some(value.system_type().name()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.as_scoped().map(|node| node.element().name())
    }

    pub fn location(&self) -> Option<&str> {
        self.as_scoped().map(|node| node.element().location())
    }

    pub fn is_primitive(&self) -> bool {
        match self {
            Self::Element(node) => node.element().is_primitive(),
            Self::Value(_) => true,
        }
    }

    pub fn is_resource(&self) -> bool {
        self.as_scoped()
            .is_some_and(|node| node.element().is_resource())
    }

    /// A primitive slot with nothing in it
    pub fn is_null(&self) -> bool {
        self.is_primitive() && self.value().is_none()
    }

    /// Children of an element; computed values have none
    pub fn children(&self, name: Option<&str>) -> Vec<Node> {
        match self {
            Self::Element(node) => node.children(name).into_iter().map(Self::Element).collect(),
            Self::Value(_) => Vec::new(),
        }
    }

    /// Key used for identity-based distinctness: the tree and data-tree
    /// location of elements, the typed canonical text of computed values
    pub fn identity_key(&self) -> String {
        match self {
            Self::Element(node) => {
                format!("{:p}/{}", node.tree_address(), node.element().location())
            }
            Self::Value(value) => format!("{}:{value}", value.system_type().qualified_name()),
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<ScopedNode> for Node {
    fn from(node: ScopedNode) -> Self {
        Self::Element(node)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(node) => match node.element().value() {
                Some(value) => write!(f, "{value}"),
                None => write!(f, "{}", node.element().location()),
            },
            Self::Value(value) => write!(f, "{value}"),
        }
    }
}
