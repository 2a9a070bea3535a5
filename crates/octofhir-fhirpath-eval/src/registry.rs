//! Symbol table for functions and operators
//!
//! Entries are keyed by name and arity. A name that resolves to one entry is
//! bound statically; several entries for the same name and arity are bound
//! to a dispatcher that picks one per call from the runtime argument types.
//! Operators live under `binary.<symbol>` and `unary.<symbol>`.
//!
//! Arity never counts the focus: `substring(1, 2)` has arity 2, `a + b`
//! (focus `a`) has arity 1.

use crate::closure::Scope;
use crate::error::{EvalError, EvalResult};
use crate::invokee::Invokee;
use log::trace;
use octofhir_fhirpath_model::{Collection, Node};
use octofhir_fhirpath_types::{SystemType, Value};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

/// Implementation of an ordinary function: receives converted arguments
pub type NativeFn = Arc<dyn Fn(&Scope<'_>, &[Arg]) -> EvalResult<Collection> + Send + Sync>;

/// Implementation of a control construct: receives unevaluated arguments
pub type ControlFn = Arc<dyn Fn(&Scope<'_>, &[Invokee]) -> EvalResult<Collection> + Send + Sync>;

/// Declared shape of one parameter (the focus is parameter 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// The whole collection, unconverted
    Collection,
    /// At most one node of any type
    Any,
    /// At most one value, implicitly converted to the type
    Of(SystemType),
}

/// Which empty arguments make a function return empty without running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    None,
    /// Only an empty focus short-circuits
    Focus,
    /// Any empty argument short-circuits
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    /// Any count of at least `min`
    Variadic { min: usize },
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Self::Fixed(n) => n == count,
            Self::Variadic { min } => count >= min,
        }
    }
}

/// A converted argument handed to a native implementation
#[derive(Debug, Clone)]
pub enum Arg {
    Collection(Collection),
    Node(Node),
    Value(Value),
    /// Empty, or a primitive without a value
    Null,
}

impl Arg {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Node(node) => node.value(),
            _ => None,
        }
    }

    pub fn node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    /// The argument as a collection; scalars become singletons
    pub fn collection(&self) -> Collection {
        match self {
            Self::Collection(items) => items.clone(),
            Self::Node(node) => Collection::single(node.clone()),
            Self::Value(value) => Collection::single(value.clone()),
            Self::Null => Collection::empty(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value().and_then(Value::as_str)
    }

    pub fn as_integer(&self) -> Option<i32> {
        self.value().and_then(Value::as_integer)
    }

    pub fn as_boolean(&self) -> Option<bool> {
        self.value().and_then(Value::as_boolean)
    }
}

/// Parameter list and null policy of a native entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: SmallVec<[ParamType; 4]>,
    pub propagation: Propagation,
}

#[derive(Clone)]
enum Body {
    Native { signature: Signature, func: NativeFn },
    Control(ControlFn),
}

#[derive(Clone)]
struct Entry {
    arity: Arity,
    body: Body,
}

/// Functions, operators and environment constants known to the compiler
///
/// Built once, then shared read-only between compilations and threads.
#[derive(Clone, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Vec<Entry>>,
    constants: HashMap<String, Collection>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an ordinary function; `params[0]` describes the focus
    ///
    /// An entry with the same name and parameter list is replaced.
    pub fn add_native<F>(
        &mut self,
        name: &str,
        params: &[ParamType],
        propagation: Propagation,
        func: F,
    ) -> &mut Self
    where
        F: Fn(&Scope<'_>, &[Arg]) -> EvalResult<Collection> + Send + Sync + 'static,
    {
        let signature = Signature {
            params: params.iter().copied().collect(),
            propagation,
        };
        let arity = Arity::Fixed(params.len().saturating_sub(1));
        let entries = self.symbols.entry(name.to_string()).or_default();
        entries.retain(|entry| match &entry.body {
            Body::Native { signature: s, .. } => s.params != signature.params,
            Body::Control(_) => entry.arity != arity,
        });
        entries.push(Entry {
            arity,
            body: Body::Native {
                signature,
                func: Arc::new(func),
            },
        });
        self
    }

    /// Register a control construct, replacing every entry with this arity
    pub fn add_control<F>(&mut self, name: &str, arity: Arity, func: F) -> &mut Self
    where
        F: Fn(&Scope<'_>, &[Invokee]) -> EvalResult<Collection> + Send + Sync + 'static,
    {
        let entries = self.symbols.entry(name.to_string()).or_default();
        entries.retain(|entry| entry.arity != arity);
        entries.push(Entry {
            arity,
            body: Body::Control(Arc::new(func)),
        });
        self
    }

    /// Register an environment constant, referenced as `%name`
    pub fn add_constant(&mut self, name: &str, value: impl Into<Collection>) -> &mut Self {
        self.constants.insert(name.to_string(), value.into());
        self
    }

    pub fn constant(&self, name: &str) -> Option<&Collection> {
        self.constants.get(name)
    }

    pub fn contains(&self, name: &str, arity: usize) -> bool {
        !self.candidates(name, arity).is_empty()
    }

    /// Number of registered entries across all names
    pub fn len(&self) -> usize {
        self.symbols.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed-arity entries win over variadic ones
    fn candidates(&self, name: &str, arity: usize) -> Vec<&Entry> {
        let Some(entries) = self.symbols.get(name) else {
            return Vec::new();
        };
        let fixed: Vec<&Entry> = entries
            .iter()
            .filter(|e| e.arity == Arity::Fixed(arity))
            .collect();
        if !fixed.is_empty() {
            return fixed;
        }
        entries.iter().filter(|e| e.arity.accepts(arity)).collect()
    }

    /// Bind `name` to `args` (focus first), failing if nothing matches
    pub fn bind(&self, name: &str, args: Vec<Invokee>) -> EvalResult<Invokee> {
        let arity = args.len().saturating_sub(1);
        let candidates = self.candidates(name, arity);
        trace!("binding {name}/{arity}: {} candidate(s)", candidates.len());

        let invokee = match candidates.as_slice() {
            [] => return Err(EvalError::unknown_symbol(name, arity)),
            [entry] => bind_static(name, (*entry).clone(), args),
            many => {
                let overloads: Vec<(Signature, NativeFn)> = many
                    .iter()
                    .filter_map(|entry| match &entry.body {
                        Body::Native { signature, func } => {
                            Some((signature.clone(), Arc::clone(func)))
                        }
                        Body::Control(_) => None,
                    })
                    .collect();
                bind_dynamic(name, overloads, args)
            }
        };
        Ok(invokee)
    }
}

fn bind_static(name: &str, entry: Entry, args: Vec<Invokee>) -> Invokee {
    let name = name.to_string();
    match entry.body {
        Body::Control(func) => Invokee::new(move |scope| {
            func(scope, &args).map_err(|e| e.in_function(&name))
        }),
        Body::Native { signature, func } => Invokee::new(move |scope| {
            call_native(scope, &signature, &func, &args).map_err(|e| e.in_function(&name))
        }),
    }
}

fn call_native(
    scope: &Scope<'_>,
    signature: &Signature,
    func: &NativeFn,
    args: &[Invokee],
) -> EvalResult<Collection> {
    let Some(evaluated) = evaluate_arguments(scope, signature.propagation, args)? else {
        return Ok(Collection::empty());
    };
    let converted = signature
        .params
        .iter()
        .zip(&evaluated)
        .map(|(param, items)| convert_arg(*param, items))
        .collect::<EvalResult<Vec<_>>>()?;
    func(scope, &converted)
}

/// Evaluate left to right; `None` when the null policy short-circuits
fn evaluate_arguments(
    scope: &Scope<'_>,
    propagation: Propagation,
    args: &[Invokee],
) -> EvalResult<Option<Vec<Collection>>> {
    let mut evaluated = Vec::with_capacity(args.len());
    for (position, arg) in args.iter().enumerate() {
        let items = arg.invoke(scope)?;
        let gated = match propagation {
            Propagation::None => false,
            Propagation::Focus => position == 0,
            Propagation::All => true,
        };
        if gated && is_null(&items) {
            return Ok(None);
        }
        evaluated.push(items);
    }
    Ok(Some(evaluated))
}

/// Empty, or a single primitive slot without a value
pub(crate) fn is_null(items: &Collection) -> bool {
    match items.as_slice() {
        [] => true,
        [node] => node.is_null(),
        _ => false,
    }
}

fn convert_arg(param: ParamType, items: &Collection) -> EvalResult<Arg> {
    if param == ParamType::Collection {
        return Ok(Arg::Collection(items.clone()));
    }
    let node = match items.as_slice() {
        [] => return Ok(Arg::Null),
        [node] if node.is_null() => return Ok(Arg::Null),
        [node] => node,
        many => return Err(EvalError::cardinality("argument", many.len())),
    };
    match param {
        ParamType::Of(target) => {
            let value = node.value().ok_or_else(|| {
                EvalError::conversion(node.type_name().unwrap_or("element"), target)
            })?;
            value
                .implicit_convert(target)
                .map(Arg::Value)
                .ok_or_else(|| EvalError::conversion(value, target))
        }
        _ => Ok(Arg::Node(node.clone())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Fit {
    Compatible,
    Exact,
}

fn param_fit(param: ParamType, items: &Collection) -> Option<Fit> {
    match param {
        ParamType::Collection => Some(Fit::Exact),
        ParamType::Any => (items.len() <= 1).then_some(Fit::Exact),
        ParamType::Of(target) => match items.as_slice() {
            [] => Some(Fit::Exact),
            [node] if node.is_null() => Some(Fit::Exact),
            [node] => {
                let actual = node.value()?.system_type();
                if actual == target {
                    Some(Fit::Exact)
                } else if actual.can_implicitly_convert_to(target) {
                    Some(Fit::Compatible)
                } else {
                    None
                }
            }
            _ => None,
        },
    }
}

fn signature_fit(signature: &Signature, evaluated: &[Collection]) -> Option<Fit> {
    signature
        .params
        .iter()
        .zip(evaluated)
        .map(|(param, items)| param_fit(*param, items))
        .try_fold(Fit::Exact, |acc, fit| fit.map(|fit| acc.min(fit)))
}

/// Exact match first, then the first compatible entry in declaration order
fn select_overload<'o>(
    overloads: &'o [(Signature, NativeFn)],
    evaluated: &[Collection],
) -> Option<&'o (Signature, NativeFn)> {
    let fits: Vec<Option<Fit>> = overloads
        .iter()
        .map(|(signature, _)| signature_fit(signature, evaluated))
        .collect();
    let pick = |wanted: Fit| {
        fits.iter()
            .position(|fit| *fit == Some(wanted))
            .map(|i| &overloads[i])
    };
    pick(Fit::Exact).or_else(|| pick(Fit::Compatible))
}

fn describe(items: &Collection) -> String {
    match items.as_slice() {
        [] => "empty".to_string(),
        [node] => match node.value() {
            Some(value) => value.system_type().to_string(),
            None => node.type_name().unwrap_or("Element").to_string(),
        },
        many => format!("collection of {}", many.len()),
    }
}

fn bind_dynamic(name: &str, overloads: Vec<(Signature, NativeFn)>, args: Vec<Invokee>) -> Invokee {
    let name = name.to_string();
    let focus_gated = overloads
        .iter()
        .all(|(signature, _)| signature.propagation != Propagation::None);

    Invokee::new(move |scope| {
        let dispatch = || -> EvalResult<Collection> {
            let mut evaluated = Vec::with_capacity(args.len());
            for (position, arg) in args.iter().enumerate() {
                let items = arg.invoke(scope)?;
                if position == 0 && focus_gated && is_null(&items) {
                    return Ok(Collection::empty());
                }
                evaluated.push(items);
            }

            let Some((signature, func)) = select_overload(&overloads, &evaluated) else {
                if let Some(many) = evaluated.iter().find(|items| items.len() > 1) {
                    return Err(EvalError::cardinality("argument", many.len()));
                }
                let types: Vec<String> = evaluated.iter().map(describe).collect();
                return Err(EvalError::NoMatchingOverload {
                    name: name.clone(),
                    types: types.join(", "),
                });
            };
            trace!(
                "dispatching {name} on ({})",
                evaluated.iter().map(describe).collect::<Vec<_>>().join(", ")
            );

            let short_circuit = match signature.propagation {
                Propagation::None => false,
                Propagation::Focus => evaluated.first().is_some_and(is_null),
                Propagation::All => evaluated.iter().any(is_null),
            };
            if short_circuit {
                return Ok(Collection::empty());
            }
            let converted = signature
                .params
                .iter()
                .zip(&evaluated)
                .map(|(param, items)| convert_arg(*param, items))
                .collect::<EvalResult<Vec<_>>>()?;
            func(scope, &converted)
        };
        dispatch().map_err(|e| e.in_function(&name))
    })
}
