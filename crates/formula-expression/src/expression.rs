//! The user-facing expression object.

use crate::ast::Node;
use crate::error::ExpressionResult;
use crate::eval_ctx::EvalCtx;
use crate::evaluate::evaluate;
use crate::operators::OperatorType;
use crate::parser::parse;
use crate::reduce::reduce;
use crate::symbols::{CaseSensitivity, SymbolTable};
use crate::value::Value;
use crate::vars::Resolver;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

/// Parse-time settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionOptions {
    pub case_sensitivity: CaseSensitivity,
    pub operator_type: OperatorType,
    /// Deepest allowed nesting of groups, lists and call arguments, and
    /// the tallest allowed tree.
    pub max_depth: usize,
}

impl Default for ExpressionOptions {
    fn default() -> Self {
        ExpressionOptions {
            case_sensitivity: CaseSensitivity::NONE,
            operator_type: OperatorType::Arithmetic,
            max_depth: 128,
        }
    }
}

impl ExpressionOptions {
    pub fn with_case_sensitivity(mut self, case_sensitivity: CaseSensitivity) -> Self {
        self.case_sensitivity = case_sensitivity;
        self
    }

    pub fn with_operator_type(mut self, operator_type: OperatorType) -> Self {
        self.operator_type = operator_type;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Formula text together with its declared names.
///
/// The tree is built on first use and cached. Declaring a name drops the
/// cache, since it can change how the text tokenizes. Evaluation only needs
/// `&self`, so a built expression can be shared across threads.
#[derive(Debug, Default)]
pub struct Expression {
    text: String,
    symbols: SymbolTable,
    options: ExpressionOptions,
    tree: OnceLock<Arc<Node>>,
}

impl Clone for Expression {
    fn clone(&self) -> Self {
        let tree = OnceLock::new();
        if let Some(node) = self.tree.get() {
            let _ = tree.set(Arc::clone(node));
        }
        Expression {
            text: self.text.clone(),
            symbols: self.symbols.clone(),
            options: self.options,
            tree,
        }
    }
}

impl Expression {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_options(text, ExpressionOptions::default())
    }

    pub fn with_options(text: impl Into<String>, options: ExpressionOptions) -> Self {
        Expression {
            text: text.into(),
            symbols: SymbolTable::new(),
            options,
            tree: OnceLock::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &ExpressionOptions {
        &self.options
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Replaces the text, keeping the declared names.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.tree = OnceLock::new();
    }

    pub fn set_options(&mut self, options: ExpressionOptions) {
        self.options = options;
        self.tree = OnceLock::new();
    }

    pub fn add_variable(&mut self, name: impl Into<String>) -> ExpressionResult<&mut Self> {
        self.symbols.add_variable(name)?;
        self.tree = OnceLock::new();
        Ok(self)
    }

    pub fn add_variables<I, S>(&mut self, names: I) -> ExpressionResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.symbols.add_variable(name)?;
        }
        self.tree = OnceLock::new();
        Ok(self)
    }

    pub fn add_function(&mut self, name: impl Into<String>) -> ExpressionResult<&mut Self> {
        self.symbols.add_function(name)?;
        self.tree = OnceLock::new();
        Ok(self)
    }

    pub fn add_functions<I, S>(&mut self, names: I) -> ExpressionResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.symbols.add_function(name)?;
        }
        self.tree = OnceLock::new();
        Ok(self)
    }

    pub fn add_constant(&mut self, name: impl Into<String>, value: impl Into<Value>) -> ExpressionResult<&mut Self> {
        self.symbols.add_constant(name, value)?;
        self.tree = OnceLock::new();
        Ok(self)
    }

    /// Returns the tree, building it on first call.
    #[tracing::instrument(level = "debug", skip(self), fields(text = %self.text), err)]
    pub fn parse(&self) -> ExpressionResult<Arc<Node>> {
        if let Some(tree) = self.tree.get() {
            return Ok(Arc::clone(tree));
        }
        let symbols = self.symbols.freeze(self.options.case_sensitivity)?;
        let tree = Arc::new(parse(&self.text, &symbols, &self.options)?);
        tracing::debug!(tree = %tree, "built expression tree");
        // Another thread may have won the race; either tree is equivalent.
        Ok(Arc::clone(self.tree.get_or_init(|| tree)))
    }

    pub fn evaluate(&self, resolver: &dyn Resolver) -> ExpressionResult<Value> {
        self.evaluate_with(resolver, Uuid::nil())
    }

    /// Evaluates with a correlation id handed to every host callback.
    #[tracing::instrument(level = "debug", skip(self, resolver), fields(text = %self.text), err)]
    pub fn evaluate_with(&self, resolver: &dyn Resolver, correlation_id: Uuid) -> ExpressionResult<Value> {
        let tree = self.parse()?;
        let ctx = EvalCtx::new(resolver).with_correlation_id(correlation_id);
        evaluate(&tree, &ctx)
    }

    /// Returns the tree with host-independent subtrees folded.
    pub fn reduce(&self) -> ExpressionResult<Node> {
        reduce(&*self.parse()?)
    }

    pub fn to_polish_string(&self) -> ExpressionResult<String> {
        Ok(self.parse()?.to_polish_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vars::NoResolver;

    #[test]
    fn tree_is_cached_until_a_name_is_declared() {
        let mut expr = Expression::new("ab + 1");
        assert!(expr.parse().is_err());
        expr.add_variable("ab").unwrap();
        let first = expr.parse().unwrap();
        let second = expr.parse().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        expr.add_variable("a").unwrap();
        assert!(!Arc::ptr_eq(&first, &expr.parse().unwrap()));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: ExpressionOptions = serde_json::from_str(r#"{"operator_type":"Binary"}"#).unwrap();
        assert_eq!(options.operator_type, OperatorType::Binary);
        assert_eq!(options.max_depth, 128);
        assert_eq!(options.case_sensitivity, CaseSensitivity::NONE);
    }

    #[test]
    fn shared_between_threads() {
        let expr = Arc::new(Expression::new("2 * (3 + 4)"));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let expr = Arc::clone(&expr);
                std::thread::spawn(move || expr.evaluate(&NoResolver).unwrap())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), Value::Number(14.0));
        }
    }
}
