//! Built-in functions.
//!
//! Built-ins are always matched case-insensitively and take precedence over
//! declared functions of the same name.

use crate::error::{ExpressionError, ExpressionResult};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// `lower(s)`
    Lower,
    /// `upper(s)`
    Upper,
    /// `case(v, k1, v1, k2, v2, ..., [default])`
    Case,
    /// `replace(s, old, new)`
    Replace,
}

impl Builtin {
    pub const ALL: [Builtin; 4] = [Builtin::Lower, Builtin::Upper, Builtin::Case, Builtin::Replace];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Lower => "lower",
            Builtin::Upper => "upper",
            Builtin::Case => "case",
            Builtin::Replace => "replace",
        }
    }

    pub fn from_name(name: &str) -> Option<Builtin> {
        Self::ALL.into_iter().find(|b| b.name().eq_ignore_ascii_case(name))
    }

    fn min_args(self) -> usize {
        match self {
            Builtin::Lower | Builtin::Upper => 1,
            Builtin::Case | Builtin::Replace => 3,
        }
    }
}

pub fn call(function: Builtin, args: &[Value]) -> ExpressionResult<Value> {
    if args.len() < function.min_args() {
        return Err(ExpressionError::type_error(format!(
            "Invalid number of arguments {}",
            function.name()
        )));
    }
    match function {
        Builtin::Lower => Ok(map_text(&args[0], str::to_lowercase)),
        Builtin::Upper => Ok(map_text(&args[0], str::to_uppercase)),
        Builtin::Case => case(args),
        Builtin::Replace => {
            let (from, to) = (args[1].to_string(), args[2].to_string());
            Ok(map_text(&args[0], |s| s.replace(&from, &to)))
        }
    }
}

fn map_text(value: &Value, f: impl FnOnce(&str) -> String) -> Value {
    if value.is_null() {
        Value::Null
    } else {
        Value::String(f(&value.to_string()))
    }
}

// Pairs are tried in order; an odd trailing argument is the default.
fn case(args: &[Value]) -> ExpressionResult<Value> {
    let subject = &args[0];
    let mut rest = &args[1..];
    while let [key, value, tail @ ..] = rest {
        if subject == key {
            return Ok(value.clone());
        }
        rest = tail;
    }
    match rest {
        [default] => Ok(default.clone()),
        _ => Err(ExpressionError::type_error("No default value case")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_ignore_case() {
        assert_eq!(Builtin::from_name("UPPER"), Some(Builtin::Upper));
        assert_eq!(Builtin::from_name("trim"), None);
    }

    #[test]
    fn case_picks_first_match_or_default() {
        let args: Vec<Value> = vec![9.into(), 1.into(), "one".into(), 9.into(), "nine".into(), "other".into()];
        assert_eq!(call(Builtin::Case, &args).unwrap(), Value::from("nine"));

        let args: Vec<Value> = vec![5.into(), 1.into(), "one".into(), "other".into()];
        assert_eq!(call(Builtin::Case, &args).unwrap(), Value::from("other"));

        let args: Vec<Value> = vec![5.into(), 1.into(), "one".into()];
        let err = call(Builtin::Case, &args).unwrap_err();
        assert_eq!(err.message, "No default value case");

        assert!(call(Builtin::Case, &[1.into(), 2.into()]).is_err());
    }

    #[test]
    fn text_functions() {
        assert_eq!(call(Builtin::Upper, &["abc".into()]).unwrap(), Value::from("ABC"));
        assert_eq!(call(Builtin::Lower, &[Value::Null]).unwrap(), Value::Null);
        assert_eq!(
            call(Builtin::Replace, &["a-b-c".into(), "-".into(), "+".into()]).unwrap(),
            Value::from("a+b+c")
        );
        let err = call(Builtin::Replace, &["a".into()]).unwrap_err();
        assert_eq!(err.message, "Invalid number of arguments replace");
    }
}
