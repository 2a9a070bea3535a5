//! Immutable result collections

use crate::Node;
use octofhir_fhirpath_types::Value;
use std::ops::Deref;
use std::sync::Arc;

/// An ordered, shareable sequence of result nodes
///
/// Empty stands in for null; a scalar is a singleton.
#[derive(Debug, Clone)]
pub struct Collection(Arc<[Node]>);

impl Collection {
    pub fn empty() -> Self {
        Self(Arc::from(Vec::new()))
    }

    pub fn single(node: impl Into<Node>) -> Self {
        Self(Arc::from(vec![node.into()]))
    }

    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        values.into_iter().map(Node::Value).collect()
    }

    pub fn as_slice(&self) -> &[Node] {
        &self.0
    }

    /// The only element, if there is exactly one
    pub fn singleton(&self) -> Option<&Node> {
        match self.0.as_ref() {
            [node] => Some(node),
            _ => None,
        }
    }

    /// `self` followed by `other`
    pub fn concat(&self, other: &Collection) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        self.iter().chain(other.iter()).cloned().collect()
    }

    /// Primitive values in order, skipping nodes without one
    pub fn values(&self) -> Vec<Value> {
        self.iter().filter_map(|node| node.value().cloned()).collect()
    }
}

impl Default for Collection {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for Collection {
    type Target = [Node];

    fn deref(&self) -> &[Node] {
        &self.0
    }
}

impl FromIterator<Node> for Collection {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<Node>> for Collection {
    fn from(nodes: Vec<Node>) -> Self {
        Self(Arc::from(nodes))
    }
}

impl From<Value> for Collection {
    fn from(value: Value) -> Self {
        Self::single(value)
    }
}

impl From<Option<Value>> for Collection {
    fn from(value: Option<Value>) -> Self {
        value.map_or_else(Self::empty, Self::single)
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
