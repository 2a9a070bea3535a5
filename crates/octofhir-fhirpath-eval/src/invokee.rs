//! Bound executable units

use crate::closure::Scope;
use crate::error::EvalResult;
use octofhir_fhirpath_model::Collection;
use std::fmt;
use std::sync::Arc;

type InvokeFn = dyn Fn(&Scope<'_>) -> EvalResult<Collection> + Send + Sync;

/// A compiled node: evaluates against a scope and yields a collection
///
/// Function arguments are handed to implementations as unevaluated
/// invokees, so control constructs decide whether, when and how often
/// each one runs.
#[derive(Clone)]
pub struct Invokee(Arc<InvokeFn>);

impl Invokee {
    pub fn new(f: impl Fn(&Scope<'_>) -> EvalResult<Collection> + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Always yields `value`
    pub fn constant(value: Collection) -> Self {
        Self::new(move |_| Ok(value.clone()))
    }

    #[inline]
    pub fn invoke(&self, scope: &Scope<'_>) -> EvalResult<Collection> {
        (self.0)(scope)
    }
}

impl fmt::Debug for Invokee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Invokee")
    }
}
