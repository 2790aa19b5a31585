//! Expression tree.
//!
//! Trees are immutable once built; [`crate::reduce`] and inversion always
//! produce new nodes.

use crate::operators::functions::Builtin;
use crate::operators::{BinaryOp, UnaryOp};
use crate::symbols::CaseSensitivity;
use crate::value::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Number, string, boolean, date or hex literal, or a folded result.
    Literal(Value),
    Binary(BinaryNode),
    Unary(UnaryNode),
    /// `[a, b, ...]`
    Array(Vec<Node>),
    /// Declared function, called on the host.
    Function(FunctionNode),
    /// Built-in function evaluated in process.
    Builtin(BuiltinNode),
    Variable(VariableNode),
    Constant(ConstantNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryNode {
    pub op: BinaryOp,
    /// Operator as written, handed to custom operands.
    pub symbol: String,
    pub left: Box<Node>,
    pub right: Box<Node>,
    /// Set when the node came from a parenthesized group; such a node is
    /// never split by a later operator.
    pub is_entity: bool,
    pub case_sensitivity: CaseSensitivity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryNode {
    pub op: UnaryOp,
    pub operand: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    pub name: String,
    pub args: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinNode {
    pub function: Builtin,
    pub args: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableNode {
    /// Name as written in the text.
    pub name: String,
    /// Digit suffix: `x2` means `x^2`.
    pub power: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantNode {
    pub name: String,
    pub value: Value,
    pub power: Option<f64>,
}

impl BinaryNode {
    pub fn new(op: BinaryOp, left: Node, right: Node) -> Self {
        BinaryNode {
            op,
            symbol: op.symbol().to_string(),
            left: Box::new(left),
            right: Box::new(right),
            is_entity: false,
            case_sensitivity: CaseSensitivity::NONE,
        }
    }

    pub fn priority(&self) -> i8 {
        self.op.priority()
    }
}

impl Node {
    pub fn literal(value: impl Into<Value>) -> Node {
        Node::Literal(value.into())
    }

    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Node {
        Node::Binary(BinaryNode::new(op, left, right))
    }

    pub fn unary(op: UnaryOp, operand: Node) -> Node {
        Node::Unary(UnaryNode {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn variable(name: impl Into<String>) -> Node {
        Node::Variable(VariableNode {
            name: name.into(),
            power: None,
        })
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Node::Literal(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Node::Literal(_))
    }

    /// Whether the node yields a boolean by construction: a comparison,
    /// logical operator or `!`.
    pub fn is_boolean_expression(&self) -> bool {
        match self {
            Node::Binary(b) => b.op.is_boolean(),
            Node::Unary(u) => u.op == UnaryOp::Not,
            _ => false,
        }
    }

    /// Prefix rendering: `+ 1 * 3 4`.
    pub fn to_polish_string(&self) -> String {
        let mut out = String::new();
        write_polish(self, &mut out);
        out
    }

    /// Number of nodes on the longest path from this node to a leaf.
    pub fn height(&self) -> usize {
        let tallest = |nodes: &[Node]| nodes.iter().map(Node::height).max().unwrap_or(0);
        1 + match self {
            Node::Binary(b) => b.left.height().max(b.right.height()),
            Node::Unary(u) => u.operand.height(),
            Node::Array(items) => tallest(items.as_slice()),
            Node::Function(f) => tallest(f.args.as_slice()),
            Node::Builtin(b) => tallest(b.args.as_slice()),
            Node::Literal(_) | Node::Variable(_) | Node::Constant(_) => 0,
        }
    }
}

fn write_polish(node: &Node, out: &mut String) {
    match node {
        Node::Binary(b) => {
            out.push_str(&b.symbol);
            out.push(' ');
            write_polish(&b.left, out);
            out.push(' ');
            write_polish(&b.right, out);
        }
        Node::Unary(u) => {
            out.push_str(u.op.symbol());
            out.push(' ');
            write_polish(&u.operand, out);
        }
        other => out.push_str(&other.to_string()),
    }
}

// ---------------------------------------------------------- Infix display

fn write_literal(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Null => f.write_str("null"),
        Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
        Value::DateTime(d) => write!(f, "@D({})", d.format("%Y-%m-%d %H:%M:%S")),
        Value::UInt(u) => write!(f, "0x{:X}", u),
        Value::Array(items) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_literal(item, f)?;
            }
            f.write_str("]")
        }
        other => write!(f, "{}", other),
    }
}

fn write_args(args: &[Node], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

fn write_power(power: Option<f64>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match power {
        Some(p) => write!(f, "{}", p),
        None => Ok(()),
    }
}

// Operands of equal priority associate to the left, so only the right side
// needs parentheses on a tie.
fn needs_parens(child: &Node, parent: i8, right_side: bool) -> bool {
    match child {
        Node::Binary(b) => {
            b.is_entity || b.priority() > parent || (right_side && b.priority() == parent)
        }
        _ => false,
    }
}

fn write_operand(child: &Node, parens: bool, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if parens {
        write!(f, "({})", child)
    } else {
        write!(f, "{}", child)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(v) => write_literal(v, f),
            Node::Binary(b) => {
                let p = b.priority();
                write_operand(&b.left, needs_parens(&b.left, p, false), f)?;
                write!(f, " {} ", b.symbol)?;
                write_operand(&b.right, needs_parens(&b.right, p, true), f)
            }
            Node::Unary(u) => {
                f.write_str(u.op.symbol())?;
                write_operand(&u.operand, matches!(*u.operand, Node::Binary(_)), f)
            }
            Node::Array(items) => {
                f.write_str("[")?;
                write_args(items, f)?;
                f.write_str("]")
            }
            Node::Function(func) => {
                write!(f, "{}(", func.name)?;
                write_args(&func.args, f)?;
                f.write_str(")")
            }
            Node::Builtin(func) => {
                write!(f, "{}(", func.function.name())?;
                write_args(&func.args, f)?;
                f.write_str(")")
            }
            Node::Variable(v) => {
                f.write_str(&v.name)?;
                write_power(v.power, f)
            }
            Node::Constant(c) => {
                f.write_str(&c.name)?;
                write_power(c.power, f)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_adds_needed_parentheses() {
        // (a or b) and c
        let node = Node::binary(
            BinaryOp::And,
            Node::binary(BinaryOp::Or, Node::variable("a"), Node::variable("b")),
            Node::variable("c"),
        );
        assert_eq!(node.to_string(), "(a or b) and c");

        // a - (b - c)
        let node = Node::binary(
            BinaryOp::Sub,
            Node::variable("a"),
            Node::binary(BinaryOp::Sub, Node::variable("b"), Node::variable("c")),
        );
        assert_eq!(node.to_string(), "a - (b - c)");
    }

    #[test]
    fn literals_render_as_source() {
        assert_eq!(Node::literal("it's").to_string(), "'it''s'");
        assert_eq!(Node::literal(255u64).to_string(), "0xFF");
        assert_eq!(Node::literal(2.5).to_string(), "2.5");
    }

    #[test]
    fn polish_notation() {
        let node = Node::binary(
            BinaryOp::Add,
            Node::literal(1.0),
            Node::binary(BinaryOp::Mul, Node::literal(3.0), Node::literal(4.0)),
        );
        assert_eq!(node.to_polish_string(), "+ 1 * 3 4");
        assert_eq!(
            Node::unary(UnaryOp::Minus, Node::variable("x")).to_polish_string(),
            "- x"
        );
    }
}
