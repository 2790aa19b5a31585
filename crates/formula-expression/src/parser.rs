//! Precedence tree builder.
//!
//! Tokens are consumed left to right. Operands fill the rightmost open slot
//! of the tree under construction; a binary operator either rotates into the
//! right spine, when it binds tighter than the nodes there, or takes the
//! whole tree as its left operand. Parenthesized groups are parsed
//! recursively and inserted as single operands.

use crate::ast::{BinaryNode, BuiltinNode, ConstantNode, FunctionNode, Node, UnaryNode, VariableNode};
use crate::error::{ExpressionError, ExpressionResult};
use crate::expression::ExpressionOptions;
use crate::lexer::{split_top_level, Lexer, TokenKind};
use crate::operators::functions::Builtin;
use crate::operators::{BinaryOp, UnaryOp};
use crate::symbols::{CaseSensitivity, FrozenSymbols};
use crate::value::Value;
use std::ops::Range;

/// Parses `text` into a tree.
///
/// Errors carry the byte offset and length of the offending text.
#[tracing::instrument(level = "debug", skip(symbols, options), err)]
pub fn parse(text: &str, symbols: &FrozenSymbols, options: &ExpressionOptions) -> ExpressionResult<Node> {
    let parser = Parser { symbols, options };
    parser.build(text, 0)
}

struct Parser<'a> {
    symbols: &'a FrozenSymbols,
    options: &'a ExpressionOptions,
}

impl Parser<'_> {
    fn build(&self, text: &str, depth: usize) -> ExpressionResult<Node> {
        if depth > self.options.max_depth {
            return Err(too_deep(0, text.len()));
        }
        let lexer = Lexer::new(text, self.symbols);
        let mut tree = TreeBuilder::new(self.symbols.case_sensitivity());
        let mut pos = 0;
        let mut expect_operand = true;
        loop {
            pos = lexer.skip_trivia(pos);
            if pos >= text.len() {
                break;
            }
            let token = lexer.next_token(pos, expect_operand)?;
            let span = token.start..token.end;
            expect_operand = false;
            let node = match token.kind {
                TokenKind::Group(inner) => {
                    let mut node = self.nested(text, inner, depth)?;
                    if let Node::Binary(b) = &mut node {
                        b.is_entity = true;
                    }
                    node
                }
                TokenKind::Array(inner) => Node::Array(self.list(text, inner, depth)?),
                TokenKind::Hex(n) => Node::Literal(Value::UInt(n)),
                TokenKind::Bool(b) => Node::Literal(Value::Bool(b)),
                TokenKind::Date(d) => Node::Literal(Value::DateTime(d)),
                TokenKind::Number(n) => Node::Literal(Value::Number(n)),
                TokenKind::String(s) => Node::Literal(Value::String(s)),
                TokenKind::Constant { name, power } => {
                    let value = self.symbols.constant_value(&name).cloned().ok_or_else(|| {
                        ExpressionError::syntax(format!("Unknown constant {}", name), span.start, span.len())
                    })?;
                    Node::Constant(ConstantNode { name, value, power })
                }
                TokenKind::Variable { name, power } => Node::Variable(VariableNode { name, power }),
                TokenKind::Function { name, args } => {
                    let args = self.list(text, args, depth)?;
                    match Builtin::from_name(&name) {
                        Some(function) => Node::Builtin(BuiltinNode { function, args }),
                        None => Node::Function(FunctionNode { name, args }),
                    }
                }
                TokenKind::Unary(op) => {
                    tree.push_unary(op).map_err(|_| invalid_construction(text, &span))?;
                    self.check_height(&tree, &span)?;
                    expect_operand = true;
                    pos = token.end;
                    continue;
                }
                TokenKind::Binary(symbol) => {
                    let op = BinaryOp::from_symbol(&symbol, self.options.operator_type)
                        .ok_or_else(|| invalid_construction(text, &span))?;
                    tree.push_binary(op, symbol).map_err(|_| missing_arguments(text))?;
                    self.check_height(&tree, &span)?;
                    expect_operand = true;
                    pos = token.end;
                    continue;
                }
            };
            tree.push_operand(node).map_err(|_| invalid_construction(text, &span))?;
            self.check_height(&tree, &span)?;
            pos = token.end;
        }
        tree.finish().map_err(|_| missing_arguments(text))
    }

    // Flat operator chains grow the tree as much as nested groups do.
    fn check_height(&self, tree: &TreeBuilder, span: &Range<usize>) -> ExpressionResult<()> {
        if tree.height() > self.options.max_depth {
            return Err(too_deep(span.start, span.len()));
        }
        Ok(())
    }

    fn nested(&self, text: &str, inner: Range<usize>, depth: usize) -> ExpressionResult<Node> {
        let start = inner.start;
        self.build(&text[inner], depth + 1).map_err(|e| e.with_offset(start))
    }

    // Comma separated items of an array literal or argument list. Only a
    // list with no items at all may be blank.
    fn list(&self, text: &str, inner: Range<usize>, depth: usize) -> ExpressionResult<Vec<Node>> {
        let body = &text[inner.clone()];
        split_top_level(body)
            .into_iter()
            .map(|part| {
                let range = inner.start + part.start..inner.start + part.end;
                if text[range.clone()].trim().is_empty() {
                    return Err(ExpressionError::syntax("Empty list item", range.start, range.len().max(1)));
                }
                self.nested(text, range, depth)
            })
            .collect()
    }
}

fn too_deep(index: usize, length: usize) -> ExpressionError {
    ExpressionError::syntax("Expression nesting too deep", index, length)
}

fn invalid_construction(text: &str, span: &Range<usize>) -> ExpressionError {
    ExpressionError::syntax(
        format!("Invalid expression construction: \"{}\".", text),
        span.start,
        span.len(),
    )
}

fn missing_arguments(text: &str) -> ExpressionError {
    ExpressionError::syntax("Missing arguments", text.len(), 1)
}

// ---------------------------------------------------------- Tree builder

/// A tree whose rightmost slots may still be empty. Finished operands
/// carry their height.
enum Partial {
    Done(Node, usize),
    Binary {
        op: BinaryOp,
        symbol: String,
        left: Box<Partial>,
        right: Option<Box<Partial>>,
    },
    Unary {
        op: UnaryOp,
        operand: Option<Box<Partial>>,
    },
}

impl Partial {
    fn binds_looser_than(&self, op: BinaryOp) -> bool {
        matches!(self, Partial::Binary { op: mine, .. } if mine.priority() > op.priority())
    }

    fn height(&self) -> usize {
        match self {
            Partial::Done(_, height) => *height,
            Partial::Binary { left, right, .. } => 1 + left.height().max(right.as_ref().map_or(0, |r| r.height())),
            Partial::Unary { operand, .. } => 1 + operand.as_ref().map_or(0, |o| o.height()),
        }
    }
}

/// Marker error, mapped to a located syntax error by the caller.
struct Misplaced;

struct TreeBuilder {
    root: Option<Partial>,
    // Height of `root`, kept up to date on every push.
    height: usize,
    case: CaseSensitivity,
}

impl TreeBuilder {
    fn new(case: CaseSensitivity) -> Self {
        TreeBuilder {
            root: None,
            height: 0,
            case,
        }
    }

    fn height(&self) -> usize {
        self.height
    }

    fn push_operand(&mut self, node: Node) -> Result<(), Misplaced> {
        let height = node.height();
        self.place(Partial::Done(node, height))
    }

    fn push_unary(&mut self, op: UnaryOp) -> Result<(), Misplaced> {
        self.place(Partial::Unary { op, operand: None })
    }

    fn place(&mut self, item: Partial) -> Result<(), Misplaced> {
        let item_height = item.height();
        match &mut self.root {
            None => {
                self.root = Some(item);
                self.height = item_height;
            }
            Some(root) => {
                let (slot, depth) = open_slot(root, 1).ok_or(Misplaced)?;
                *slot = Some(Box::new(item));
                self.height = self.height.max(depth - 1 + item_height);
            }
        }
        Ok(())
    }

    fn push_binary(&mut self, op: BinaryOp, symbol: String) -> Result<(), Misplaced> {
        let mut root = self.root.take().ok_or(Misplaced)?;
        if root.binds_looser_than(op) {
            let Some(reach) = attach(&mut root, 1, op, symbol) else {
                self.root = Some(root);
                return Err(Misplaced);
            };
            self.height = self.height.max(reach);
            self.root = Some(root);
        } else {
            self.root = Some(Partial::Binary {
                op,
                symbol,
                left: Box::new(root),
                right: None,
            });
            self.height += 1;
        }
        Ok(())
    }

    fn finish(self) -> Result<Node, Misplaced> {
        match self.root {
            // Empty text, `()` or an empty list item.
            None => Ok(Node::Literal(Value::Null)),
            Some(root) => complete(root, self.case),
        }
    }
}

// Walks the right spine while it binds looser than `op`, then makes the
// operand found there the left side of the new node. `depth` is the 1-based
// depth of `node`; returns the length of the longest path through the new
// node.
fn attach(node: &mut Partial, depth: usize, op: BinaryOp, symbol: String) -> Option<usize> {
    let Partial::Binary { right, .. } = node else {
        return None;
    };
    if let Some(child) = right.as_deref_mut() {
        if child.binds_looser_than(op) {
            return attach(child, depth + 1, op, symbol);
        }
    }
    let left = right.take()?;
    let reach = depth + 1 + left.height();
    *right = Some(Box::new(Partial::Binary {
        op,
        symbol,
        left,
        right: None,
    }));
    Some(reach)
}

// Rightmost empty operand slot below `node`, with the depth an item placed
// there would have.
fn open_slot(node: &mut Partial, depth: usize) -> Option<(&mut Option<Box<Partial>>, usize)> {
    match node {
        Partial::Done(..) => None,
        Partial::Binary { right: slot, .. } | Partial::Unary { operand: slot, .. } => {
            if slot.is_none() {
                Some((slot, depth + 1))
            } else {
                slot.as_deref_mut().and_then(|child| open_slot(child, depth + 1))
            }
        }
    }
}

fn complete(partial: Partial, case: CaseSensitivity) -> Result<Node, Misplaced> {
    match partial {
        Partial::Done(node, _) => Ok(node),
        Partial::Binary { op, symbol, left, right } => {
            let right = right.ok_or(Misplaced)?;
            Ok(Node::Binary(BinaryNode {
                op,
                symbol,
                left: Box::new(complete(*left, case)?),
                right: Box::new(complete(*right, case)?),
                is_entity: false,
                case_sensitivity: case,
            }))
        }
        Partial::Unary { op, operand } => {
            let operand = operand.ok_or(Misplaced)?;
            Ok(Node::Unary(UnaryNode {
                op,
                operand: Box::new(complete(*operand, case)?),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::OperatorType;
    use crate::symbols::SymbolTable;

    fn parse_with(text: &str, table: &SymbolTable, options: &ExpressionOptions) -> ExpressionResult<Node> {
        let symbols = table.freeze(options.case_sensitivity).unwrap();
        parse(text, &symbols, options)
    }

    fn polish(text: &str) -> String {
        let mut table = SymbolTable::new();
        for v in ["a", "b", "c", "x", "y"] {
            table.add_variable(v).unwrap();
        }
        parse_with(text, &table, &ExpressionOptions::default())
            .unwrap()
            .to_polish_string()
    }

    #[test]
    fn precedence() {
        assert_eq!(polish("1+3*4"), "+ 1 * 3 4");
        assert_eq!(polish("1*3+4"), "+ * 1 3 4");
        assert_eq!(polish("(1+3)*4"), "* + 1 3 4");
        assert_eq!(polish("a - b - c"), "- - a b c");
        assert_eq!(polish("a or b and c"), "or a and b c");
        assert_eq!(polish("a < 1 + 2 * b ^ 2"), "< a + 1 * 2 ^ b 2");
        assert_eq!(polish("a = 1 or b = 2 and c"), "or = a 1 and = b 2 c");
    }

    #[test]
    fn unary_operands() {
        assert_eq!(polish("-a * 2"), "* - a 2");
        assert_eq!(polish("2 * -a"), "* 2 - a");
        assert_eq!(polish("!(a < b)"), "! < a b");
    }

    #[test]
    fn groups_are_entities() {
        let node = parse_with("(1 + 2)", &SymbolTable::new(), &ExpressionOptions::default()).unwrap();
        match node {
            Node::Binary(b) => assert!(b.is_entity),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn caret_follows_operator_type() {
        let options = ExpressionOptions::default().with_operator_type(OperatorType::Binary);
        let node = parse_with("1 | 2 ^ 3 & 4", &SymbolTable::new(), &options).unwrap();
        assert_eq!(node.to_polish_string(), "| 1 ^ 2 & 3 4");
    }

    #[test]
    fn lists() {
        assert_eq!(polish("[1, a, 'x,y']"), "[1, a, 'x,y']");
        assert_eq!(polish("[]"), "[]");
        assert_eq!(polish("upper('a')"), "upper('a')");
    }

    #[test]
    fn errors() {
        let table = SymbolTable::new();
        let options = ExpressionOptions::default();

        let err = parse_with("1 +", &table, &options).unwrap_err();
        assert_eq!(err.message, "Missing arguments");

        let err = parse_with("1 2", &table, &options).unwrap_err();
        assert_eq!(err.message, "Invalid expression construction: \"1 2\".");
        assert_eq!(err.index, 2);

        let err = parse_with("(1 + $)", &table, &options).unwrap_err();
        assert!(err.is_syntax());
        assert_eq!(err.index, 5);
    }

    #[test]
    fn nesting_is_bounded() {
        let options = ExpressionOptions::default().with_max_depth(3);
        assert!(parse_with("((((1))))", &SymbolTable::new(), &options).is_err());
        assert!(parse_with("((1))", &SymbolTable::new(), &options).is_ok());
    }

    #[test]
    fn flat_chains_are_bounded() {
        let table = SymbolTable::new();
        let options = ExpressionOptions::default();

        let err = parse_with(&vec!["1"; 10_000].join("+"), &table, &options).unwrap_err();
        assert!(err.is_syntax());
        assert_eq!(err.message, "Expression nesting too deep");

        let err = parse_with(&format!("0+{}", vec!["2"; 500].join("*")), &table, &options).unwrap_err();
        assert_eq!(err.message, "Expression nesting too deep");

        assert!(parse_with(&vec!["1"; 100].join("+"), &table, &options).is_ok());
    }

    #[test]
    fn tree_height_includes_groups() {
        let options = ExpressionOptions::default().with_max_depth(4);
        let table = SymbolTable::new();
        assert_eq!(parse_with("1+2+3+4", &table, &options).unwrap().height(), 4);
        assert!(parse_with("1+2+3+4+5", &table, &options).is_err());
        assert!(parse_with("1+(2+(3+(4+5)))", &table, &options).is_err());
        assert!(parse_with("1*2+3*4", &table, &options).is_ok());
    }

    #[test]
    fn blank_list_items_are_rejected() {
        let table = SymbolTable::new();
        let options = ExpressionOptions::default();

        let err = parse_with("[1,]", &table, &options).unwrap_err();
        assert_eq!(err.message, "Empty list item");
        assert_eq!(err.index, 3);

        let err = parse_with("upper('a',,'b')", &table, &options).unwrap_err();
        assert_eq!(err.message, "Empty list item");
        assert_eq!(err.index, 10);

        assert!(parse_with("[ ]", &table, &options).is_ok());
    }
}
