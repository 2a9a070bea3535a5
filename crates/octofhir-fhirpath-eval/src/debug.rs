//! Step-by-step diagnostic hook
//!
//! Only expressions compiled with `CompilerOptions { diagnostics: true }`
//! carry the instrumentation; otherwise nothing here runs.

use crate::closure::{INDEX, TOTAL};
use crate::error::EvalResult;
use crate::invokee::Invokee;
use indexmap::IndexMap;
use octofhir_fhirpath_ast::Expression;
use octofhir_fhirpath_model::Collection;
use parking_lot::Mutex;
use std::sync::Arc;

/// One evaluated AST node
#[derive(Debug, Clone)]
pub struct DebugStep {
    /// Monotonic within one root evaluation, assigned when the node is entered
    pub step_id: u64,
    pub node: Arc<Expression>,
    /// Input of a function call, `$this` for every other node
    pub focus: Collection,
    pub this: Collection,
    pub index: Option<Collection>,
    pub total: Option<Collection>,
    pub result: Collection,
    /// User variables visible at this node
    pub variables: IndexMap<String, Collection>,
}

/// Observer of evaluation steps; an error aborts the evaluation
pub trait DebugHook: Send + Sync {
    fn on_step(&self, step: &DebugStep) -> EvalResult<()>;
}

/// A hook that keeps every step in memory
#[derive(Debug, Default)]
pub struct RecordingHook {
    steps: Mutex<Vec<DebugStep>>,
}

impl RecordingHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps in completion order
    pub fn steps(&self) -> Vec<DebugStep> {
        self.steps.lock().clone()
    }

    /// Steps ordered by `step_id`, i.e. in the order nodes were entered
    pub fn steps_by_id(&self) -> Vec<DebugStep> {
        let mut steps = self.steps();
        steps.sort_by_key(|step| step.step_id);
        steps
    }

    pub fn clear(&self) {
        self.steps.lock().clear();
    }
}

impl DebugHook for RecordingHook {
    fn on_step(&self, step: &DebugStep) -> EvalResult<()> {
        self.steps.lock().push(step.clone());
        Ok(())
    }
}

/// Wrap `inner` so that each evaluation reports a step for `node`
pub(crate) fn instrument(node: Arc<Expression>, inner: Invokee) -> Invokee {
    Invokee::new(move |scope| {
        let session = scope.session();
        let step_id = session.next_step_id();
        session.enter_step();
        let outcome = inner.invoke(scope);
        let captured = session.leave_step();
        let result = outcome?;

        let Some(hook) = session.context().debug_hook.as_ref() else {
            return Ok(result);
        };
        let this = scope.this();
        let step = DebugStep {
            step_id,
            node: Arc::clone(&node),
            focus: captured.unwrap_or_else(|| this.clone()),
            this,
            index: scope.resolve(INDEX),
            total: scope.resolve(TOTAL),
            result: result.clone(),
            variables: scope.variables(),
        };
        hook.on_step(&step)?;
        Ok(result)
    })
}

/// Report the result of a function's focus argument to the enclosing step
pub(crate) fn capture_focus(inner: Invokee) -> Invokee {
    Invokee::new(move |scope| {
        let focus = inner.invoke(scope)?;
        scope.session().record_focus(&focus);
        Ok(focus)
    })
}
