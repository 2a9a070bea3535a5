//! The node contract consumed by the evaluator

use octofhir_fhirpath_types::Value;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a data-tree element
pub type ElementRef = Arc<dyn ElementNode>;

/// A read-only element of a data tree
///
/// Implementations must be cheap to clone through [`ElementRef`] and must not
/// change while an evaluation is running.
pub trait ElementNode: Send + Sync + fmt::Debug {
    /// Element name as it appears in paths (`name`, `given`)
    fn name(&self) -> &str;

    /// Type tag (`HumanName`, `string`, `Patient`), if known
    fn type_name(&self) -> Option<&str>;

    /// Primitive value, if any
    fn value(&self) -> Option<&Value>;

    /// Children in document order, optionally filtered by element name
    fn children(&self, name: Option<&str>) -> Vec<ElementRef>;

    /// Stable path used in diagnostics and as the node identity
    fn location(&self) -> &str;

    fn is_resource(&self) -> bool {
        false
    }

    /// Primitive elements may still lack a value (an extension-only `_birthDate`).
    /// Primitive type names start with a lowercase letter.
    fn is_primitive(&self) -> bool {
        self.value().is_some()
            || self
                .type_name()
                .is_some_and(|name| name.starts_with(|c: char| c.is_ascii_lowercase()))
    }
}
