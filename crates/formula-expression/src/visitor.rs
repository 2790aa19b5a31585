//! Read-only traversal of expression trees.

use crate::ast::{BinaryNode, BuiltinNode, ConstantNode, FunctionNode, Node, UnaryNode, VariableNode};
use crate::value::Value;

/// Hooks called for each node kind. Every default descends into the
/// children, so an implementation overrides only what it inspects.
pub trait Visitor {
    fn visit_node(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_literal(&mut self, _value: &Value) {}

    fn visit_binary(&mut self, node: &BinaryNode) {
        self.visit_node(&node.left);
        self.visit_node(&node.right);
    }

    fn visit_unary(&mut self, node: &UnaryNode) {
        self.visit_node(&node.operand);
    }

    fn visit_array(&mut self, items: &[Node]) {
        for item in items {
            self.visit_node(item);
        }
    }

    fn visit_function(&mut self, node: &FunctionNode) {
        for arg in &node.args {
            self.visit_node(arg);
        }
    }

    fn visit_builtin(&mut self, node: &BuiltinNode) {
        for arg in &node.args {
            self.visit_node(arg);
        }
    }

    fn visit_variable(&mut self, _node: &VariableNode) {}

    fn visit_constant(&mut self, _node: &ConstantNode) {}
}

/// Dispatches `node` to the matching hook.
pub fn walk_node<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) {
    match node {
        Node::Literal(v) => visitor.visit_literal(v),
        Node::Binary(b) => visitor.visit_binary(b),
        Node::Unary(u) => visitor.visit_unary(u),
        Node::Array(items) => visitor.visit_array(items),
        Node::Function(f) => visitor.visit_function(f),
        Node::Builtin(f) => visitor.visit_builtin(f),
        Node::Variable(v) => visitor.visit_variable(v),
        Node::Constant(c) => visitor.visit_constant(c),
    }
}

#[derive(Default)]
struct NameCollector {
    variables: Vec<String>,
    functions: Vec<String>,
}

impl Visitor for NameCollector {
    fn visit_variable(&mut self, node: &VariableNode) {
        if !self.variables.contains(&node.name) {
            self.variables.push(node.name.clone());
        }
    }

    fn visit_function(&mut self, node: &FunctionNode) {
        if !self.functions.contains(&node.name) {
            self.functions.push(node.name.clone());
        }
        for arg in &node.args {
            self.visit_node(arg);
        }
    }
}

impl Node {
    /// Variables referenced by the tree, in order of first appearance.
    pub fn variable_names(&self) -> Vec<String> {
        let mut collector = NameCollector::default();
        collector.visit_node(self);
        collector.variables
    }

    /// Declared functions called by the tree, in order of first appearance.
    pub fn function_names(&self) -> Vec<String> {
        let mut collector = NameCollector::default();
        collector.visit_node(self);
        collector.functions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::BinaryOp;

    struct LiteralCounter(usize);

    impl Visitor for LiteralCounter {
        fn visit_literal(&mut self, _value: &Value) {
            self.0 += 1;
        }
    }

    #[test]
    fn walks_every_node() {
        let node = Node::binary(
            BinaryOp::Add,
            Node::Array(vec![Node::literal(1.0), Node::literal(2.0)]),
            Node::Function(FunctionNode {
                name: "f".into(),
                args: vec![Node::literal(3.0), Node::variable("x")],
            }),
        );
        let mut counter = LiteralCounter(0);
        counter.visit_node(&node);
        assert_eq!(counter.0, 3);
        assert_eq!(node.variable_names(), vec!["x".to_string()]);
        assert_eq!(node.function_names(), vec!["f".to_string()]);
    }
}
