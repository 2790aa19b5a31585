use thiserror::Error;

/// Broad category of an [`ExpressionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Raised while tokenizing or building the tree. Always reported before
    /// any evaluation happens.
    Syntax,
    /// Illegal operator for the operand types, array length mismatch,
    /// unresolvable name, `case` without default, ...
    Type,
    /// Raised by a host resolver or custom operand.
    Host,
}

/// The single error type of the crate.
///
/// `index` and `length` locate the offending text relative to the top-level
/// expression. Evaluation errors that have no meaningful location carry
/// `0, 0`.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ExpressionError {
    pub kind: ErrorKind,
    pub message: String,
    pub index: usize,
    pub length: usize,
}

pub type ExpressionResult<T> = Result<T, ExpressionError>;

impl ExpressionError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, index: usize, length: usize) -> Self {
        ExpressionError {
            kind,
            message: message.into(),
            index,
            length,
        }
    }

    pub fn syntax(message: impl Into<String>, index: usize, length: usize) -> Self {
        Self::new(ErrorKind::Syntax, message, index, length)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message, 0, 0)
    }

    pub fn host(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Host, message, 0, 0)
    }

    /// Moves the error location by `delta`, used when a nested group reports
    /// an error relative to its own start.
    pub fn with_offset(mut self, delta: usize) -> Self {
        if self.kind == ErrorKind::Syntax {
            self.index += delta;
        }
        self
    }

    pub fn is_syntax(&self) -> bool {
        self.kind == ErrorKind::Syntax
    }

    // Shared messages

    pub(crate) fn unresolved(name: &str) -> Self {
        Self::type_error(format!("Unable to evaluate expression {}", name))
    }

    pub(crate) fn invalid_operator(op: &str, operand: &str) -> Self {
        Self::type_error(format!("Operator '{}' invalid for {}.", op, operand))
    }

    pub(crate) fn array_length() -> Self {
        Self::type_error("Array length invalid.")
    }
}
