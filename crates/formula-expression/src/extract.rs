//! Name discovery on raw text, before any symbol is declared.

use regex::Regex;
use std::ops::BitOr;
use std::sync::OnceLock;

/// Which names [`extract_names`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameKinds(u8);

impl NameKinds {
    pub const VARIABLES: NameKinds = NameKinds(0x01);
    pub const FUNCTIONS: NameKinds = NameKinds(0x02);
    pub const ALL: NameKinds = NameKinds(0x03);

    pub const fn contains(self, other: NameKinds) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for NameKinds {
    type Output = NameKinds;

    fn bitor(self, rhs: Self) -> Self::Output {
        NameKinds(self.0 | rhs.0)
    }
}

fn scan_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)//[^\n]*|/\*.*?\*/|'(?:[^']|'')*'|@[dD]\([^)]*\)|\b0[xX][0-9a-fA-F]+|[0-9]*\.?[0-9]+(?:[eE][-+]?[0-9]+)?|(?P<ident>[A-Za-z_$][A-Za-z0-9_$.]*)(?P<call>\s*\()?",
        )
        .expect("static name pattern")
    })
}

fn is_keyword(word: &str) -> bool {
    ["and", "or", "like", "in", "true", "false"]
        .iter()
        .any(|k| k.eq_ignore_ascii_case(word))
}

/// Lists the identifiers in `text` without parsing it.
///
/// An identifier followed by `(` is a function, anything else a variable.
/// String, date and number literals, comments and keyword operators are
/// skipped. Names come out de-duplicated, in order of first appearance.
pub fn extract_names(text: &str, kinds: NameKinds) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in scan_regex().captures_iter(text) {
        let Some(ident) = caps.name("ident") else {
            continue;
        };
        let name = ident.as_str();
        if is_keyword(name) {
            continue;
        }
        let kind = if caps.name("call").is_some() {
            NameKinds::FUNCTIONS
        } else {
            NameKinds::VARIABLES
        };
        if kinds.contains(kind) && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
