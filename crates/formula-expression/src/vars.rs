//! Host callbacks: resolving variables and calling declared functions.

use crate::error::{ExpressionError, ExpressionResult};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Supplies values for variables and implementations for declared functions.
///
/// Both methods receive the correlation id of the evaluation. The defaults
/// fail with "Unable to evaluate expression ...".
pub trait Resolver {
    fn resolve_variable(&self, name: &str, correlation_id: Uuid) -> ExpressionResult<Value> {
        let _ = correlation_id;
        Err(ExpressionError::unresolved(name))
    }

    fn call_function(&self, name: &str, args: &[Value], correlation_id: Uuid) -> ExpressionResult<Value> {
        let _ = (args, correlation_id);
        Err(ExpressionError::unresolved(name))
    }
}

/// Resolves nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl Resolver for NoResolver {}

/// Variables looked up by exact name.
impl Resolver for HashMap<String, Value> {
    fn resolve_variable(&self, name: &str, _correlation_id: Uuid) -> ExpressionResult<Value> {
        self.get(name).cloned().ok_or_else(|| ExpressionError::unresolved(name))
    }
}

type VariableFn = dyn Fn(&str, Uuid) -> ExpressionResult<Value> + Send + Sync;
type FunctionFn = dyn Fn(&str, &[Value], Uuid) -> ExpressionResult<Value> + Send + Sync;

/// Resolver built from closures.
///
/// ```
/// use formula_expression::{FnResolver, Value};
///
/// let resolver = FnResolver::new()
///     .on_variable(|name, _| Ok(Value::from(name.len() as f64)))
///     .on_function(|_, args, _| Ok(Value::from(args.len() as f64)));
/// # let _ = resolver;
/// ```
#[derive(Default)]
pub struct FnResolver {
    variables: Option<Box<VariableFn>>,
    functions: Option<Box<FunctionFn>>,
}

impl FnResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_variable<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Uuid) -> ExpressionResult<Value> + Send + Sync + 'static,
    {
        self.variables = Some(Box::new(f));
        self
    }

    pub fn on_function<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &[Value], Uuid) -> ExpressionResult<Value> + Send + Sync + 'static,
    {
        self.functions = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for FnResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnResolver")
            .field("variables", &self.variables.is_some())
            .field("functions", &self.functions.is_some())
            .finish()
    }
}

impl Resolver for FnResolver {
    fn resolve_variable(&self, name: &str, correlation_id: Uuid) -> ExpressionResult<Value> {
        match &self.variables {
            Some(f) => f(name, correlation_id),
            None => Err(ExpressionError::unresolved(name)),
        }
    }

    fn call_function(&self, name: &str, args: &[Value], correlation_id: Uuid) -> ExpressionResult<Value> {
        match &self.functions {
            Some(f) => f(name, args, correlation_id),
            None => Err(ExpressionError::unresolved(name)),
        }
    }
}

type BoundFn = Box<dyn Fn(&[Value]) -> ExpressionResult<Value> + Send + Sync>;

/// Named variable bindings and function implementations.
///
/// Lookups are exact unless the store was created with
/// [`Vars::case_insensitive`].
#[derive(Default)]
pub struct Vars {
    values: HashMap<String, Value>,
    functions: HashMap<String, BoundFn>,
    fold_case: bool,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn case_insensitive() -> Self {
        Vars {
            fold_case: true,
            ..Self::default()
        }
    }

    fn key(&self, name: &str) -> String {
        if self.fold_case {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    /// Binds a variable. Empty names are rejected.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> ExpressionResult<()> {
        if name.is_empty() {
            return Err(ExpressionError::host("Invalid variable name."));
        }
        let key = self.key(name);
        self.values.insert(key, value.into());
        Ok(())
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> ExpressionResult<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(&self.key(name))
    }

    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(&self.key(name))
    }

    pub fn del(&mut self, name: &str) -> bool {
        let key = self.key(name);
        self.values.remove(&key).is_some()
    }

    /// Binds a function implementation.
    pub fn define<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&[Value]) -> ExpressionResult<Value> + Send + Sync + 'static,
    {
        let key = self.key(name);
        self.functions.insert(key, Box::new(f));
    }
}

impl fmt::Debug for Vars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut functions: Vec<&String> = self.functions.keys().collect();
        functions.sort();
        f.debug_struct("Vars")
            .field("values", &self.values)
            .field("functions", &functions)
            .field("fold_case", &self.fold_case)
            .finish()
    }
}

impl Resolver for Vars {
    fn resolve_variable(&self, name: &str, _correlation_id: Uuid) -> ExpressionResult<Value> {
        self.get(name).cloned().ok_or_else(|| ExpressionError::unresolved(name))
    }

    fn call_function(&self, name: &str, args: &[Value], _correlation_id: Uuid) -> ExpressionResult<Value> {
        match self.functions.get(&self.key(name)) {
            Some(f) => f(args),
            None => Err(ExpressionError::unresolved(name)),
        }
    }
}
