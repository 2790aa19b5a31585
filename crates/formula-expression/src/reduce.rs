//! Constant folding and logical inversion.

use crate::ast::{BinaryNode, BuiltinNode, FunctionNode, Node, UnaryNode};
use crate::error::{ExpressionError, ExpressionResult};
use crate::eval_ctx::EvalCtx;
use crate::evaluate::{apply_power, evaluate};
use crate::operators::{binary, unary, UnaryOp};
use crate::value::Value;
use crate::vars::NoResolver;

/// Returns an equivalent tree with every host-independent subtree folded
/// into a literal.
///
/// Variables and declared functions are kept; `+x` becomes `x`, `--x`
/// becomes `x` and `!` is pushed into comparisons and logical operators.
pub fn reduce(node: &Node) -> ExpressionResult<Node> {
    match node {
        Node::Literal(_) | Node::Variable(_) => Ok(node.clone()),
        Node::Constant(c) => Ok(Node::Literal(apply_power(c.value.clone(), c.power)?)),
        Node::Array(items) => {
            let items = reduce_all(items)?;
            match literals(&items) {
                Some(values) => Ok(Node::Literal(Value::Array(values))),
                None => Ok(Node::Array(items)),
            }
        }
        Node::Function(f) => Ok(Node::Function(FunctionNode {
            name: f.name.clone(),
            args: reduce_all(&f.args)?,
        })),
        Node::Builtin(f) => {
            let node = Node::Builtin(BuiltinNode {
                function: f.function,
                args: reduce_all(&f.args)?,
            });
            match &node {
                Node::Builtin(b) if b.args.iter().all(Node::is_literal) => fold(&node),
                _ => Ok(node),
            }
        }
        Node::Binary(b) => reduce_binary(b),
        Node::Unary(u) => reduce_unary(u),
    }
}

fn reduce_all(nodes: &[Node]) -> ExpressionResult<Vec<Node>> {
    nodes.iter().map(reduce).collect()
}

fn literals(nodes: &[Node]) -> Option<Vec<Value>> {
    nodes.iter().map(|n| n.as_literal().cloned()).collect()
}

// Evaluates a subtree that no longer depends on the host.
fn fold(node: &Node) -> ExpressionResult<Node> {
    let ctx = EvalCtx::new(&NoResolver);
    evaluate(node, &ctx).map(Node::Literal)
}

fn reduce_binary(node: &BinaryNode) -> ExpressionResult<Node> {
    let left = reduce(&node.left)?;
    let right = reduce(&node.right)?;
    if let (Node::Literal(l), Node::Literal(r)) = (&left, &right) {
        let value = binary::combine(node.op, &node.symbol, l.clone(), r.clone(), node.case_sensitivity)?;
        return Ok(Node::Literal(value));
    }
    Ok(Node::Binary(BinaryNode {
        op: node.op,
        symbol: node.symbol.clone(),
        left: Box::new(left),
        right: Box::new(right),
        is_entity: node.is_entity,
        case_sensitivity: node.case_sensitivity,
    }))
}

fn reduce_unary(node: &UnaryNode) -> ExpressionResult<Node> {
    let operand = reduce(&node.operand)?;
    if let Node::Literal(v) = &operand {
        return unary::apply(node.op, v.clone()).map(Node::Literal);
    }
    match node.op {
        UnaryOp::Plus => Ok(operand),
        UnaryOp::Minus => match operand {
            Node::Unary(UnaryNode { op: UnaryOp::Minus, operand: inner }) => Ok(*inner),
            other => Ok(Node::unary(UnaryOp::Minus, other)),
        },
        UnaryOp::Not => invert(&operand),
        UnaryOp::BitNot => Ok(Node::unary(UnaryOp::BitNot, operand)),
    }
}

/// Builds the logical complement of `node`.
///
/// Comparisons flip their operator, `and`/`or` swap and invert their
/// operands, `!x` becomes `x`. Names and calls of unknown type are wrapped
/// in `!`. Non-boolean operators cannot be inverted.
pub fn invert(node: &Node) -> ExpressionResult<Node> {
    match node {
        Node::Literal(v) => unary::apply(UnaryOp::Not, v.clone()).map(Node::Literal),
        Node::Unary(u) if u.op == UnaryOp::Not => Ok((*u.operand).clone()),
        Node::Unary(u) => Err(ExpressionError::type_error(format!(
            "Unable to inverse unary operator {}",
            u.op
        ))),
        Node::Binary(b) => {
            let Some(op) = b.op.inverse() else {
                // `like` and `in` have no complement operator.
                if b.op.is_boolean() {
                    return Ok(Node::unary(UnaryOp::Not, node.clone()));
                }
                return Err(ExpressionError::type_error(format!(
                    "Unable to inverse binary operator {}",
                    b.symbol
                )));
            };
            let (left, right) = if op.is_logical() {
                (invert_operand(&b.left)?, invert_operand(&b.right)?)
            } else {
                ((*b.left).clone(), (*b.right).clone())
            };
            Ok(Node::Binary(BinaryNode {
                op,
                symbol: op.symbol().to_string(),
                left: Box::new(left),
                right: Box::new(right),
                is_entity: b.is_entity,
                case_sensitivity: b.case_sensitivity,
            }))
        }
        other => Ok(Node::unary(UnaryOp::Not, other.clone())),
    }
}

fn invert_operand(node: &Node) -> ExpressionResult<Node> {
    if node.is_boolean_expression() || node.is_literal() {
        invert(node)
    } else {
        Ok(Node::unary(UnaryOp::Not, node.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::BinaryOp;

    fn x() -> Node {
        Node::variable("x")
    }

    #[test]
    fn folds_constant_subtrees() {
        // x + (2 * 3)
        let node = Node::binary(
            BinaryOp::Add,
            x(),
            Node::binary(BinaryOp::Mul, Node::literal(2.0), Node::literal(3.0)),
        );
        assert_eq!(reduce(&node).unwrap().to_string(), "x + 6");
    }

    #[test]
    fn unary_simplifications() {
        let neg = Node::unary(UnaryOp::Minus, Node::unary(UnaryOp::Minus, x()));
        assert_eq!(reduce(&neg).unwrap(), x());
        let plus = Node::unary(UnaryOp::Plus, x());
        assert_eq!(reduce(&plus).unwrap(), x());
        let not = Node::unary(UnaryOp::Not, Node::literal(true));
        assert_eq!(reduce(&not).unwrap(), Node::literal(false));
    }

    #[test]
    fn inversion() {
        let cmp = Node::binary(BinaryOp::Lt, x(), Node::literal(1.0));
        assert_eq!(invert(&cmp).unwrap().to_string(), "x >= 1");

        let and = Node::binary(
            BinaryOp::And,
            cmp.clone(),
            Node::binary(BinaryOp::Eq, Node::variable("y"), Node::literal(2.0)),
        );
        assert_eq!(invert(&and).unwrap().to_string(), "x >= 1 or y <> 2");

        let mixed = Node::binary(BinaryOp::Or, cmp, Node::variable("flag"));
        assert_eq!(invert(&mixed).unwrap().to_string(), "x >= 1 and !flag");

        let arithmetic = Node::binary(BinaryOp::Add, x(), Node::literal(1.0));
        assert!(invert(&arithmetic).is_err());
        assert!(invert(&Node::unary(UnaryOp::Minus, x())).is_err());
    }

    #[test]
    fn like_and_in_are_negated_in_place() {
        let like = Node::binary(BinaryOp::Like, Node::variable("name"), Node::literal("A%"));
        let and = Node::binary(
            BinaryOp::And,
            Node::binary(BinaryOp::Gt, x(), Node::literal(1.0)),
            like.clone(),
        );
        assert_eq!(invert(&and).unwrap().to_string(), "x <= 1 or !(name like 'A%')");

        let member = Node::binary(
            BinaryOp::In,
            x(),
            Node::Array(vec![Node::literal(1.0), Node::literal(2.0)]),
        );
        assert_eq!(invert(&member).unwrap(), Node::unary(UnaryOp::Not, member.clone()));
        assert_eq!(invert(&invert(&like).unwrap()).unwrap(), like);
    }

    #[test]
    fn double_inversion_restores_comparisons() {
        let cmp = Node::binary(BinaryOp::Ge, x(), Node::literal(3.0));
        assert_eq!(invert(&invert(&cmp).unwrap()).unwrap(), cmp);
    }
}
