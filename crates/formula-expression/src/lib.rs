//! Formula expression language: tokenizer, precedence tree builder and
//! tree-walking evaluator.
//!
//! # Overview
//!
//! Expressions are infix text such as `price * qty2 + tax(region)`. Names must
//! be declared before parsing: variables and functions are resolved by the
//! host at evaluation time through a [`Resolver`], constants are fixed at
//! declaration.
//!
//! # Example
//!
//! ```
//! use formula_expression::{Expression, Value, Vars};
//!
//! let mut expr = Expression::new("x2 + y");
//! expr.add_variables(["x", "y"]).unwrap();
//!
//! let vars = Vars::new().with("x", 3.0).unwrap().with("y", 2.0).unwrap();
//! assert_eq!(expr.evaluate(&vars).unwrap(), Value::Number(11.0));
//! ```

pub mod ast;
pub mod error;
pub mod eval_ctx;
pub mod evaluate;
pub mod expression;
pub mod extract;
pub mod lexer;
pub mod operators;
pub mod parser;
pub mod reduce;
pub mod symbols;
pub mod value;
pub mod vars;
pub mod visitor;

// Re-export the core public API
pub use ast::Node;
pub use error::{ErrorKind, ExpressionError, ExpressionResult};
pub use eval_ctx::EvalCtx;
pub use evaluate::evaluate;
pub use expression::{Expression, ExpressionOptions};
pub use extract::{extract_names, NameKinds};
pub use operators::{BinaryOp, OperatorType, UnaryOp};
pub use parser::parse;
pub use reduce::{invert, reduce};
pub use symbols::{CaseSensitivity, FrozenSymbols, SymbolTable};
pub use value::{CustomOperand, OtherOperand, PendingOperand, Value};
pub use vars::{FnResolver, NoResolver, Resolver, Vars};
pub use visitor::{walk_node, Visitor};
