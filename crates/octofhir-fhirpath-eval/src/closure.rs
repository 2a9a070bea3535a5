//! Lexical scopes for one evaluation
//!
//! All scopes of an evaluation live in an arena owned by the [`Session`];
//! a [`Scope`] is an index into it plus a reference to the session. Lookup
//! walks parent indices, nesting pushes a new frame. Nested frames are
//! popped when their [`Nested`] guard drops, so frames are released in
//! reverse order of creation.

use crate::context::EvaluationContext;
use crate::error::{EvalError, EvalResult};
use chrono::{DateTime, FixedOffset, Local};
use indexmap::IndexMap;
use octofhir_fhirpath_model::{Collection, Node};
use octofhir_fhirpath_types::Value;
use std::cell::{Cell, RefCell};
use std::ops::Deref;

pub(crate) const THIS: &str = "$this";
pub(crate) const THAT: &str = "$that";
pub(crate) const INDEX: &str = "$index";
pub(crate) const TOTAL: &str = "$total";
pub(crate) const RESOURCE: &str = "%resource";
pub(crate) const ROOT_RESOURCE: &str = "%rootResource";
pub(crate) const CONTEXT: &str = "%context";

const RESERVED: [&str; 7] = [THIS, THAT, INDEX, TOTAL, RESOURCE, ROOT_RESOURCE, CONTEXT];

/// Names user code may never define
pub(crate) fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
        || ["resource", "rootResource", "context", "ucum", "sct", "loinc"].contains(&name)
}

struct Frame {
    parent: Option<usize>,
    bindings: IndexMap<String, Collection>,
}

/// Mutable state shared by every scope of one root evaluation
pub struct Session<'e> {
    frames: RefCell<Vec<Frame>>,
    next_step: Cell<u64>,
    focus_stack: RefCell<Vec<Option<Collection>>>,
    context: &'e EvaluationContext,
    now: DateTime<FixedOffset>,
}

impl<'e> Session<'e> {
    pub fn new(context: &'e EvaluationContext) -> Self {
        Self {
            frames: RefCell::new(Vec::new()),
            next_step: Cell::new(0),
            focus_stack: RefCell::new(Vec::new()),
            context,
            now: context.now.unwrap_or_else(|| Local::now().fixed_offset()),
        }
    }

    pub fn context(&self) -> &EvaluationContext {
        self.context
    }

    /// Evaluation clock, fixed for the whole session
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }

    /// Number of live scopes
    pub fn scope_count(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Seed the root scope for `node`
    ///
    /// `%resource` is the nearest resource at or above `node`,
    /// `%rootResource` the nearest one that is not contained, unless the
    /// context overrides either.
    pub fn root(&self, node: Option<Node>) -> Scope<'_> {
        let scope = self.push(None);
        let subject: Collection = node.iter().cloned().collect();
        let scoped = node.as_ref().and_then(Node::as_scoped);
        let resource = self.context.resource.clone().or_else(|| {
            scoped
                .and_then(|n| n.resource())
                .map(|r| Node::Element(r.clone()))
        });
        let root_resource = self.context.root_resource.clone().or_else(|| {
            scoped
                .and_then(|n| n.root_resource())
                .map(|r| Node::Element(r.clone()))
        });

        scope.set(THIS, subject.clone());
        scope.set(THAT, subject.clone());
        scope.set(INDEX, Collection::single(Value::Integer(1)));
        scope.set(CONTEXT, subject);
        scope.set(RESOURCE, resource.into_iter().collect());
        scope.set(ROOT_RESOURCE, root_resource.into_iter().collect());
        for (name, value) in &self.context.variables {
            scope.set(name, value.clone());
        }
        scope
    }

    fn push(&self, parent: Option<usize>) -> Scope<'_> {
        let mut frames = self.frames.borrow_mut();
        frames.push(Frame {
            parent,
            bindings: IndexMap::new(),
        });
        Scope {
            session: self,
            index: frames.len() - 1,
        }
    }

    pub(crate) fn next_step_id(&self) -> u64 {
        let id = self.next_step.get();
        self.next_step.set(id + 1);
        id
    }

    pub(crate) fn enter_step(&self) {
        self.focus_stack.borrow_mut().push(None);
    }

    pub(crate) fn record_focus(&self, focus: &Collection) {
        if let Some(top) = self.focus_stack.borrow_mut().last_mut() {
            *top = Some(focus.clone());
        }
    }

    pub(crate) fn leave_step(&self) -> Option<Collection> {
        self.focus_stack.borrow_mut().pop().flatten()
    }
}

/// A handle to one lexical scope
#[derive(Clone, Copy)]
pub struct Scope<'s> {
    session: &'s Session<'s>,
    index: usize,
}

impl<'s> Scope<'s> {
    pub fn session(&self) -> &'s Session<'s> {
        self.session
    }

    /// Look a name up here, then in each parent
    pub fn resolve(&self, name: &str) -> Option<Collection> {
        let frames = self.session.frames.borrow();
        let mut current = Some(self.index);
        while let Some(index) = current {
            let frame = &frames[index];
            if let Some(value) = frame.bindings.get(name) {
                return Some(value.clone());
            }
            current = frame.parent;
        }
        None
    }

    /// `$this`, empty when unbound
    pub fn this(&self) -> Collection {
        self.resolve(THIS).unwrap_or_default()
    }

    /// Child scope with no bindings of its own, discarded with the guard
    pub fn nest(&self) -> Nested<'s> {
        Nested {
            scope: self.session.push(Some(self.index)),
        }
    }

    /// Child scope for one iteration step
    pub fn iteration(&self, item: &Node, index: usize) -> Nested<'s> {
        let scope = self.nest();
        scope.set(THIS, Collection::single(item.clone()));
        let position = i32::try_from(index).unwrap_or(i32::MAX);
        scope.set(INDEX, Collection::single(Value::Integer(position)));
        scope
    }

    /// Bind in this scope, replacing any existing binding
    pub fn set(&self, name: &str, value: Collection) {
        let mut frames = self.session.frames.borrow_mut();
        frames[self.index].bindings.insert(name.to_string(), value);
    }

    /// Bind a user variable in this scope; names may be bound only once
    pub fn define(&self, name: &str, value: Collection) -> EvalResult<()> {
        let taken = is_reserved(name)
            || self.session.frames.borrow()[self.index]
                .bindings
                .contains_key(name)
            || self.session.context.variables.contains_key(name);
        if taken {
            return Err(EvalError::VariableRedefined {
                name: name.to_string(),
            });
        }
        self.set(name, value);
        Ok(())
    }

    /// User variables visible from this scope, innermost binding wins
    pub fn variables(&self) -> IndexMap<String, Collection> {
        let frames = self.session.frames.borrow();
        let mut chain = Vec::new();
        let mut current = Some(self.index);
        while let Some(index) = current {
            chain.push(index);
            current = frames[index].parent;
        }
        let mut visible = IndexMap::new();
        for index in chain.into_iter().rev() {
            for (name, value) in &frames[index].bindings {
                if !name.starts_with(['$', '%']) {
                    visible.insert(name.clone(), value.clone());
                }
            }
        }
        visible
    }
}

/// A nested scope that pops its frame, and everything pushed after it,
/// when dropped
pub struct Nested<'s> {
    scope: Scope<'s>,
}

impl<'s> Deref for Nested<'s> {
    type Target = Scope<'s>;

    fn deref(&self) -> &Scope<'s> {
        &self.scope
    }
}

impl Drop for Nested<'_> {
    fn drop(&mut self) {
        self.scope.session.frames.borrow_mut().truncate(self.scope.index);
    }
}
