use crate::ast::Node;
use crate::error::{ExpressionError, ExpressionResult};
use crate::eval_ctx::EvalCtx;
use chrono::{NaiveDateTime, TimeDelta};
use std::fmt;
use std::sync::Arc;

/// Runtime value produced by evaluation or supplied by the host.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    /// Every literal number and every arithmetic result.
    Number(f64),
    /// Result of `%`, `<<` and `>>`.
    Int(i64),
    /// Hex literals and bitwise results.
    UInt(u64),
    String(String),
    DateTime(NaiveDateTime),
    /// Difference of two date-times.
    Duration(TimeDelta),
    Array(Vec<Value>),
    /// Host value that takes over operator semantics, see [`CustomOperand`].
    Custom(Arc<dyn CustomOperand>),
}

/// A host value which intercepts the binary operators it takes part in.
///
/// When either operand of a binary operator resolves to a custom operand the
/// built-in coercion rules are bypassed and the handler decides the result.
pub trait CustomOperand: fmt::Debug + Send + Sync {
    /// `is_left` tells on which side of `operator` this operand stands.
    fn handle_operation(
        &self,
        operator: &str,
        other: OtherOperand<'_>,
        is_left: bool,
    ) -> ExpressionResult<Value>;
}

/// The operand facing a [`CustomOperand`].
///
/// When the custom operand is on the left the right side has not been
/// evaluated yet and is handed over as [`OtherOperand::Pending`].
pub enum OtherOperand<'a> {
    Evaluated(Value),
    Pending(PendingOperand<'a>),
}

impl OtherOperand<'_> {
    /// Returns the operand value, evaluating it first if still pending.
    pub fn resolve(self) -> ExpressionResult<Value> {
        match self {
            OtherOperand::Evaluated(v) => Ok(v),
            OtherOperand::Pending(p) => p.evaluate(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, OtherOperand::Pending(_))
    }
}

/// An unevaluated operand bound to the evaluation that produced it.
pub struct PendingOperand<'a> {
    node: &'a Node,
    ctx: &'a EvalCtx<'a>,
}

impl<'a> PendingOperand<'a> {
    pub(crate) fn new(node: &'a Node, ctx: &'a EvalCtx<'a>) -> Self {
        PendingOperand { node, ctx }
    }

    pub fn node(&self) -> &Node {
        self.node
    }

    /// Evaluates the operand with the resolver and correlation id of the
    /// enclosing evaluation.
    pub fn evaluate(&self) -> ExpressionResult<Value> {
        crate::evaluate::evaluate(self.node, self.ctx)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Custom(a), Value::Custom(b)) => Arc::ptr_eq(a, b),
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (a, b) if a.is_numeric() && b.is_numeric() => a.numeric() == b.numeric(),
            _ => false,
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Number(_) | Value::Int(_) | Value::UInt(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn custom(operand: impl CustomOperand + 'static) -> Self {
        Value::Custom(Arc::new(operand))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) | Value::Int(_) | Value::UInt(_) => "number",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::Duration(_) => "duration",
            Value::Array(_) => "array",
            Value::Custom(_) => "custom operand",
        }
    }

    // Lossy view used by equality; only meaningful for numeric variants.
    fn numeric(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Int(i) => *i as f64,
            Value::UInt(u) => *u as f64,
            _ => f64::NAN,
        }
    }

    /// Numeric coercion: numbers as-is, booleans as 0/1, null as 0 and
    /// numeric strings parsed.
    pub fn as_f64(&self) -> ExpressionResult<f64> {
        match self {
            Value::Null => Ok(0.0),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Number(_) | Value::Int(_) | Value::UInt(_) => Ok(self.numeric()),
            Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
                ExpressionError::type_error(format!("Unable to convert '{}' to a number.", s))
            }),
            other => Err(ExpressionError::type_error(format!(
                "Unable to convert {} to a number.",
                other.type_name()
            ))),
        }
    }

    pub fn as_i64(&self) -> ExpressionResult<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::UInt(u) => i64::try_from(*u)
                .map_err(|_| ExpressionError::type_error("Value out of range for a signed integer.")),
            other => {
                let n = other.as_f64()?.round();
                if n.is_finite() && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
                    Ok(n as i64)
                } else {
                    Err(ExpressionError::type_error("Value out of range for a signed integer."))
                }
            }
        }
    }

    pub fn as_u64(&self) -> ExpressionResult<u64> {
        match self {
            Value::UInt(u) => Ok(*u),
            Value::Int(i) => u64::try_from(*i)
                .map_err(|_| ExpressionError::type_error("Value out of range for an unsigned integer.")),
            other => {
                let n = other.as_f64()?.round();
                if n.is_finite() && n >= 0.0 && n <= u64::MAX as f64 {
                    Ok(n as u64)
                } else {
                    Err(ExpressionError::type_error("Value out of range for an unsigned integer."))
                }
            }
        }
    }

    /// Boolean coercion: null is false, numbers are true when non-zero.
    pub fn as_bool(&self) -> ExpressionResult<bool> {
        match self {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::Number(_) | Value::Int(_) | Value::UInt(_) => Ok(self.numeric() != 0.0),
            Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Ok(false),
            other => Err(ExpressionError::type_error(format!(
                "Unable to convert {} to a boolean.",
                other.type_name()
            ))),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Converts to JSON. Dates become `YYYY-MM-DDTHH:MM:SS` strings,
    /// durations a number of seconds, non-finite numbers and custom operands
    /// `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null | Value::Custom(_) => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n).map(Json::Number).unwrap_or(Json::Null),
            Value::Int(i) => Json::Number((*i).into()),
            Value::UInt(u) => Json::Number((*u).into()),
            Value::String(s) => Json::String(s.clone()),
            Value::DateTime(d) => Json::String(d.format("%Y-%m-%dT%H:%M:%S").to_string()),
            Value::Duration(d) => serde_json::Number::from_f64(duration_seconds(d))
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
        }
    }
}

pub(crate) fn duration_seconds(d: &TimeDelta) -> f64 {
    d.num_milliseconds() as f64 / 1000.0
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Int(i) => write!(f, "{}", i),
            Value::UInt(u) => write!(f, "{}", u),
            Value::String(s) => f.write_str(s),
            Value::DateTime(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
            Value::Duration(d) => {
                let total = d.num_seconds();
                let sign = if total < 0 { "-" } else { "" };
                let total = total.abs();
                let (days, rest) = (total / 86_400, total % 86_400);
                write!(f, "{}{}.{:02}:{:02}:{:02}", sign, days, rest / 3600, (rest % 3600) / 60, rest % 60)
            }
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Custom(c) => write!(f, "{:?}", c),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::UInt(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::DateTime(d)
    }
}

impl From<TimeDelta> for Value {
    fn from(d: TimeDelta) -> Self {
        Value::Duration(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match v {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            // Objects have no counterpart, hand them over as their JSON text.
            obj @ Json::Object(_) => Value::String(obj.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn numeric_variants_compare_by_value() {
        assert_eq!(Value::Number(10.0), Value::UInt(10));
        assert_eq!(Value::Int(-3), Value::Number(-3.0));
        assert_ne!(Value::Number(1.0), Value::Bool(true));
        assert_ne!(Value::String("1".into()), Value::Number(1.0));
    }

    #[test]
    fn coercions() {
        assert_eq!(Value::from(" 2.5 ").as_f64().unwrap(), 2.5);
        assert_eq!(Value::Null.as_f64().unwrap(), 0.0);
        assert!(Value::from("abc").as_f64().is_err());
        assert!(Value::from("TRUE").as_bool().unwrap());
        assert!(!Value::Null.as_bool().unwrap());
        assert!(Value::from("yes").as_bool().is_err());
        assert_eq!(Value::Number(7.6).as_u64().unwrap(), 8);
        assert!(Value::Number(-1.0).as_u64().is_err());
    }

    #[test]
    fn display() {
        assert_eq!(Value::Number(55.0).to_string(), "55");
        assert_eq!(Value::Number(5.8).to_string(), "5.8");
        let d = NaiveDate::from_ymd_opt(2022, 1, 20).unwrap().and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(Value::DateTime(d).to_string(), "2022-01-20 12:00:00");
        assert_eq!(Value::Duration(TimeDelta::hours(36)).to_string(), "1.12:00:00");
        assert_eq!(
            Value::Array(vec![1.into(), "a".into()]).to_string(),
            "[1, a]"
        );
    }

    #[test]
    fn json_interop() {
        let v = Value::from(json!([1, "two", null, true]));
        assert_eq!(
            v,
            Value::Array(vec![1.into(), "two".into(), Value::Null, true.into()])
        );
        assert_eq!(v.to_json(), json!([1.0, "two", null, true]));
        assert_eq!(Value::Number(f64::NAN).to_json(), json!(null));
    }
}
