//! Data model abstraction for FHIRPath evaluation
//!
//! The evaluator never sees concrete resources. It navigates anything that
//! implements [`ElementNode`], wrapped in a [`ScopedNode`] so that parents
//! stay reachable, and it produces [`Collection`]s of [`Node`]s.

mod collection;
mod element;
mod memory;
mod node;

pub use collection::Collection;
pub use element::{ElementNode, ElementRef};
pub use memory::{MemoryNode, NodeBuilder};
pub use node::{Node, ScopedNode};

/// Data model error
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Expected a JSON object, found {0}")]
    NotAnObject(String),

    #[error("Number '{0}' is not a valid decimal")]
    InvalidNumber(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
