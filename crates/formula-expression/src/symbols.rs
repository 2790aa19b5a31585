//! Declared names and the case policy used to match them.
//!
//! A [`SymbolTable`] holds three disjoint sets of names: variables (resolved
//! by the host at evaluation time), functions (called on the host) and
//! constants (whose values are known at declaration time). The tokenizer never
//! sees the table directly; it works on a [`FrozenSymbols`] snapshot which
//! owns the compiled name patterns.

use crate::error::{ExpressionError, ExpressionResult};
use crate::operators::functions::Builtin;
use crate::value::Value;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::{BitOr, BitOrAssign};

// ------------------------------------------------------------ Case policy

/// Bitset selecting which name categories (and string comparisons) are
/// case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseSensitivity(u8);

impl CaseSensitivity {
    pub const NONE: CaseSensitivity = CaseSensitivity(0);
    pub const VARIABLES: CaseSensitivity = CaseSensitivity(0x01);
    pub const CONSTANTS: CaseSensitivity = CaseSensitivity(0x02);
    pub const FUNCTIONS: CaseSensitivity = CaseSensitivity(0x04);
    pub const STRINGS: CaseSensitivity = CaseSensitivity(0x08);
    pub const ALL: CaseSensitivity = CaseSensitivity(0x0f);

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Unknown bits are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        CaseSensitivity(bits & Self::ALL.0)
    }

    pub const fn contains(self, other: CaseSensitivity) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for CaseSensitivity {
    type Output = CaseSensitivity;

    fn bitor(self, rhs: Self) -> Self::Output {
        CaseSensitivity(self.0 | rhs.0)
    }
}

impl BitOrAssign for CaseSensitivity {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

// ----------------------------------------------------------- Symbol table

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Variable,
    Function,
    Constant,
}

impl Category {
    fn label(self) -> &'static str {
        match self {
            Category::Variable => "variable",
            Category::Function => "function",
            Category::Constant => "constant",
        }
    }
}

/// Mutable registry of declared names.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    variables: Vec<String>,
    functions: Vec<String>,
    constants: Vec<(String, Value)>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, name: impl Into<String>) -> ExpressionResult<()> {
        let name = name.into();
        if self.check(&name, Category::Variable)? {
            self.variables.push(name);
        }
        Ok(())
    }

    pub fn add_function(&mut self, name: impl Into<String>) -> ExpressionResult<()> {
        let name = name.into();
        if self.check(&name, Category::Function)? {
            self.functions.push(name);
        }
        Ok(())
    }

    /// Declares a constant, replacing the value of an existing one.
    pub fn add_constant(&mut self, name: impl Into<String>, value: impl Into<Value>) -> ExpressionResult<()> {
        let name = name.into();
        let value = value.into();
        if self.check(&name, Category::Constant)? {
            self.constants.push((name, value));
        } else if let Some(slot) = self.constants.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        }
        Ok(())
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn functions(&self) -> &[String] {
        &self.functions
    }

    pub fn constants(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.constants.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.functions.is_empty() && self.constants.is_empty()
    }

    /// Returns `true` when `name` is new to `category`, `false` when it is
    /// already declared there, and an error when it is empty or declared in
    /// another category.
    fn check(&self, name: &str, category: Category) -> ExpressionResult<bool> {
        if name.trim().is_empty() {
            return Err(ExpressionError::type_error(format!(
                "A {} name can not be empty.",
                category.label()
            )));
        }
        let owner = if self.variables.iter().any(|n| n == name) {
            Some(Category::Variable)
        } else if self.functions.iter().any(|n| n == name) {
            Some(Category::Function)
        } else if self.constants.iter().any(|(n, _)| n == name) {
            Some(Category::Constant)
        } else {
            None
        };
        match owner {
            None => Ok(true),
            Some(c) if c == category => Ok(false),
            Some(c) => Err(ExpressionError::type_error(format!(
                "Name '{}' is already declared as a {}.",
                name,
                c.label()
            ))),
        }
    }

    /// Compiles the name patterns for the given case policy.
    pub fn freeze(&self, case: CaseSensitivity) -> ExpressionResult<FrozenSymbols> {
        let variables = compile_names(
            self.variables.iter().map(|n| (n.as_str(), case.contains(CaseSensitivity::VARIABLES))),
            r"(?P<power>[0-9]+)?",
        )?;
        let constants = compile_names(
            self.constants.iter().map(|(n, _)| (n.as_str(), case.contains(CaseSensitivity::CONSTANTS))),
            r"(?P<power>[0-9]+)?",
        )?;
        let user_sensitive = case.contains(CaseSensitivity::FUNCTIONS);
        let functions = compile_names(
            self.functions
                .iter()
                .map(|n| (n.as_str(), user_sensitive))
                .chain(Builtin::ALL.iter().map(|b| (b.name(), false))),
            r"\s*\(",
        )?;
        Ok(FrozenSymbols {
            case,
            variables,
            constants,
            functions,
            constant_values: self.constants.clone(),
        })
    }
}

// Builds `(?P<name>longest|...|shortest)<suffix>`. Names are escaped, the
// case-insensitive ones wrapped in `(?i:...)`.
fn compile_names<'a>(
    names: impl Iterator<Item = (&'a str, bool)>,
    suffix: &str,
) -> ExpressionResult<Option<Regex>> {
    let mut names: Vec<(&str, bool)> = names.collect();
    if names.is_empty() {
        return Ok(None);
    }
    names.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));
    let alternatives: Vec<String> = names
        .iter()
        .map(|(name, sensitive)| {
            let escaped = regex::escape(name);
            if *sensitive {
                escaped
            } else {
                format!("(?i:{})", escaped)
            }
        })
        .collect();
    let pattern = format!("(?P<name>{}){}", alternatives.join("|"), suffix);
    Regex::new(&pattern)
        .map(Some)
        .map_err(|e| ExpressionError::type_error(format!("Invalid symbol pattern: {}", e)))
}

/// Immutable snapshot of a [`SymbolTable`] with its compiled patterns.
///
/// Shared freely between threads once built.
#[derive(Debug, Clone)]
pub struct FrozenSymbols {
    case: CaseSensitivity,
    variables: Option<Regex>,
    constants: Option<Regex>,
    functions: Option<Regex>,
    constant_values: Vec<(String, Value)>,
}

impl FrozenSymbols {
    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.case
    }

    pub(crate) fn variable_pattern(&self) -> Option<&Regex> {
        self.variables.as_ref()
    }

    pub(crate) fn constant_pattern(&self) -> Option<&Regex> {
        self.constants.as_ref()
    }

    pub(crate) fn function_pattern(&self) -> Option<&Regex> {
        self.functions.as_ref()
    }

    /// Value of the constant matching `name` under the constant case policy.
    pub fn constant_value(&self, name: &str) -> Option<&Value> {
        let sensitive = self.case.contains(CaseSensitivity::CONSTANTS);
        self.constant_values
            .iter()
            .find(|(n, _)| n == name)
            .or_else(|| {
                if sensitive {
                    None
                } else {
                    let lower = name.to_lowercase();
                    self.constant_values.iter().find(|(n, _)| n.to_lowercase() == lower)
                }
            })
            .map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_sensitivity_bits() {
        let cs = CaseSensitivity::VARIABLES | CaseSensitivity::STRINGS;
        assert!(cs.contains(CaseSensitivity::VARIABLES));
        assert!(!cs.contains(CaseSensitivity::CONSTANTS));
        assert!(CaseSensitivity::ALL.contains(cs));
        assert_eq!(CaseSensitivity::from_bits(0xff), CaseSensitivity::ALL);
        assert_eq!(CaseSensitivity::default(), CaseSensitivity::NONE);
    }

    #[test]
    fn case_sensitivity_serializes_as_bits() {
        let cs = CaseSensitivity::FUNCTIONS | CaseSensitivity::STRINGS;
        assert_eq!(serde_json::to_string(&cs).unwrap(), "12");
    }

    #[test]
    fn categories_are_disjoint() {
        let mut table = SymbolTable::new();
        table.add_variable("x").unwrap();
        table.add_variable("x").unwrap();
        assert_eq!(table.variables(), ["x".to_string()]);
        assert!(table.add_function("x").is_err());
        assert!(table.add_constant("x", 1).is_err());
        assert!(table.add_variable("  ").is_err());
    }

    #[test]
    fn redeclared_constant_takes_the_new_value() {
        let mut table = SymbolTable::new();
        table.add_constant("PI", 3.0).unwrap();
        let stale = table.freeze(CaseSensitivity::NONE).unwrap();
        table.add_constant("PI", std::f64::consts::PI).unwrap();
        assert_eq!(table.constants().count(), 1);
        assert_eq!(stale.constant_value("PI"), Some(&Value::Number(3.0)));
        let fresh = table.freeze(CaseSensitivity::NONE).unwrap();
        assert_eq!(fresh.constant_value("PI"), Some(&Value::Number(std::f64::consts::PI)));
    }

    #[test]
    fn longest_name_wins() {
        let mut table = SymbolTable::new();
        table.add_variable("var").unwrap();
        table.add_variable("var1").unwrap();
        let frozen = table.freeze(CaseSensitivity::NONE).unwrap();
        let caps = frozen.variable_pattern().unwrap().captures("var12").unwrap();
        assert_eq!(&caps["name"], "var1");
        assert_eq!(&caps["power"], "2");
    }

    #[test]
    fn case_policy_applies_per_category() {
        let mut table = SymbolTable::new();
        table.add_variable("Total").unwrap();
        table.add_constant("Pi", 3.0).unwrap();

        let frozen = table.freeze(CaseSensitivity::VARIABLES).unwrap();
        assert!(frozen.variable_pattern().unwrap().find("total").is_none());
        assert!(frozen.constant_pattern().unwrap().find("PI").is_some());
        assert_eq!(frozen.constant_value("PI"), Some(&Value::Number(3.0)));

        let frozen = table.freeze(CaseSensitivity::CONSTANTS).unwrap();
        assert!(frozen.variable_pattern().unwrap().find("TOTAL").is_some());
        assert_eq!(frozen.constant_value("PI"), None);
    }

    #[test]
    fn builtins_are_always_matched() {
        let frozen = SymbolTable::new().freeze(CaseSensitivity::ALL).unwrap();
        let caps = frozen.function_pattern().unwrap().captures("UPPER ('a')").unwrap();
        assert_eq!(&caps["name"], "UPPER");
    }
}
