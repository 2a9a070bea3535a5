//! Caller-supplied evaluation context

use crate::debug::DebugHook;
use crate::error::EvalResult;
use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use octofhir_fhirpath_model::{Collection, Node};
use std::fmt;
use std::sync::Arc;

/// Receives the output of `trace()`
pub trait Tracer: Send + Sync {
    fn trace(&self, name: &str, items: &Collection) -> EvalResult<()>;
}

impl<F> Tracer for F
where
    F: Fn(&str, &Collection) -> EvalResult<()> + Send + Sync,
{
    fn trace(&self, name: &str, items: &Collection) -> EvalResult<()> {
        self(name, items)
    }
}

/// Everything a single evaluation needs besides the compiled expression and the root node
#[derive(Clone, Default)]
pub struct EvaluationContext {
    /// Named variables, referenced as `%name`
    pub variables: IndexMap<String, Collection>,
    /// Overrides the inferred `%resource`
    pub resource: Option<Node>,
    /// Overrides the inferred `%rootResource`
    pub root_resource: Option<Node>,
    /// Fixed clock for `now()`, `today()` and `timeOfDay()`
    pub now: Option<DateTime<FixedOffset>>,
    pub tracer: Option<Arc<dyn Tracer>>,
    pub debug_hook: Option<Arc<dyn DebugHook>>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> EvaluationContextBuilder {
        EvaluationContextBuilder::default()
    }

    pub fn variable(&self, name: &str) -> Option<&Collection> {
        self.variables.get(name)
    }
}

impl fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("variables", &self.variables.keys().collect::<Vec<_>>())
            .field("resource", &self.resource)
            .field("root_resource", &self.root_resource)
            .field("now", &self.now)
            .field("tracer", &self.tracer.is_some())
            .field("debug_hook", &self.debug_hook.is_some())
            .finish()
    }
}

/// Builder for [`EvaluationContext`]
#[derive(Default)]
pub struct EvaluationContextBuilder {
    context: EvaluationContext,
}

impl EvaluationContextBuilder {
    /// Bind `%name`; a leading `%` in `name` is ignored
    pub fn variable(mut self, name: &str, value: impl Into<Collection>) -> Self {
        let name = name.strip_prefix('%').unwrap_or(name);
        self.context.variables.insert(name.to_string(), value.into());
        self
    }

    pub fn resource(mut self, resource: impl Into<Node>) -> Self {
        self.context.resource = Some(resource.into());
        self
    }

    pub fn root_resource(mut self, resource: impl Into<Node>) -> Self {
        self.context.root_resource = Some(resource.into());
        self
    }

    pub fn now(mut self, now: DateTime<FixedOffset>) -> Self {
        self.context.now = Some(now);
        self
    }

    pub fn tracer(mut self, tracer: impl Tracer + 'static) -> Self {
        self.context.tracer = Some(Arc::new(tracer));
        self
    }

    pub fn debug_hook(mut self, hook: Arc<dyn DebugHook>) -> Self {
        self.context.debug_hook = Some(hook);
        self
    }

    pub fn build(self) -> EvaluationContext {
        self.context
    }
}
