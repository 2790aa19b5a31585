use crate::error::ExpressionResult;
use crate::value::Value;
use crate::vars::Resolver;
use uuid::Uuid;

/// The context passed down a single evaluation.
///
/// Holds no mutable state, so one tree can be evaluated from several threads
/// at once, each with its own context.
pub struct EvalCtx<'a> {
    /// Host callbacks for variables and declared functions.
    pub resolver: &'a dyn Resolver,
    /// Handed to every callback, lets the host tell concurrent evaluations
    /// apart.
    pub correlation_id: Uuid,
}

impl<'a> EvalCtx<'a> {
    pub fn new(resolver: &'a dyn Resolver) -> Self {
        EvalCtx {
            resolver,
            correlation_id: Uuid::nil(),
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn resolve_variable(&self, name: &str) -> ExpressionResult<Value> {
        tracing::trace!(name, correlation_id = %self.correlation_id, "resolve variable");
        self.resolver.resolve_variable(name, self.correlation_id)
    }

    pub fn call_function(&self, name: &str, args: &[Value]) -> ExpressionResult<Value> {
        tracing::trace!(name, args = args.len(), correlation_id = %self.correlation_id, "call function");
        self.resolver.call_function(name, args, self.correlation_id)
    }
}
