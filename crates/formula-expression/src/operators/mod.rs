//! Operator tables and semantics.
//!
//! - [`binary`] evaluates binary nodes (short-circuit, custom operands,
//!   array broadcast).
//! - [`coercion`] holds the scalar coercion matrix.
//! - [`unary`] evaluates prefix operators.
//! - [`functions`] implements the built-in functions.

pub mod binary;
pub mod coercion;
pub mod functions;
pub mod unary;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Meaning of `^`: power in arithmetic mode, exclusive or in binary mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OperatorType {
    #[default]
    Arithmetic,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Like,
    In,
    BitAnd,
    Xor,
    Pow,
    BitOr,
    And,
    Or,
}

impl BinaryOp {
    /// Maps an operator as written in the text. Keyword operators are matched
    /// case-insensitively.
    pub fn from_symbol(symbol: &str, operator_type: OperatorType) -> Option<BinaryOp> {
        let op = match symbol.to_ascii_lowercase().as_str() {
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "=" | "==" => BinaryOp::Eq,
            "<>" | "!=" => BinaryOp::Ne,
            "like" => BinaryOp::Like,
            "in" => BinaryOp::In,
            "&" => BinaryOp::BitAnd,
            "^" => match operator_type {
                OperatorType::Arithmetic => BinaryOp::Pow,
                OperatorType::Binary => BinaryOp::Xor,
            },
            "|" => BinaryOp::BitOr,
            "and" | "&&" => BinaryOp::And,
            "or" | "||" => BinaryOp::Or,
            _ => return None,
        };
        Some(op)
    }

    /// Binding strength, lower binds tighter.
    pub fn priority(self) -> i8 {
        match self {
            BinaryOp::Pow => -1,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 0,
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Shl | BinaryOp::Shr => 2,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 3,
            BinaryOp::Like | BinaryOp::In | BinaryOp::Eq | BinaryOp::Ne => 4,
            BinaryOp::BitAnd => 5,
            BinaryOp::Xor => 6,
            BinaryOp::BitOr => 7,
            BinaryOp::And => 8,
            BinaryOp::Or => 9,
        }
    }

    /// Canonical spelling, used for rewritten nodes.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Like => "like",
            BinaryOp::In => "in",
            BinaryOp::BitAnd => "&",
            BinaryOp::Xor | BinaryOp::Pow => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }

    /// Operators producing a boolean.
    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Like
                | BinaryOp::In
                | BinaryOp::And
                | BinaryOp::Or
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    /// Relational and equality operators, which reduce arrays to a single
    /// boolean instead of broadcasting.
    pub fn is_comparison(self) -> bool {
        self.is_boolean() && !self.is_logical() && self != BinaryOp::In
    }

    /// The operator of the logical complement: `<` becomes `>=`, `and`
    /// becomes `or`, and so on. `like` and `in` have none.
    pub fn inverse(self) -> Option<BinaryOp> {
        let op = match self {
            BinaryOp::Lt => BinaryOp::Ge,
            BinaryOp::Le => BinaryOp::Gt,
            BinaryOp::Gt => BinaryOp::Le,
            BinaryOp::Ge => BinaryOp::Lt,
            BinaryOp::Eq => BinaryOp::Ne,
            BinaryOp::Ne => BinaryOp::Eq,
            BinaryOp::And => BinaryOp::Or,
            BinaryOp::Or => BinaryOp::And,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn from_char(c: char) -> Option<UnaryOp> {
        match c {
            '+' => Some(UnaryOp::Plus),
            '-' => Some(UnaryOp::Minus),
            '!' => Some(UnaryOp::Not),
            '~' => Some(UnaryOp::BitNot),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
