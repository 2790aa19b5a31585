//! Tokenizer.
//!
//! At each position every token category is searched from that position on;
//! the match starting earliest wins, ties going to the category listed first.
//! A winning match that does not start exactly at the cursor means the text
//! in between is not a token.
//!
//! Category order: parenthesized group, bracketed group, unary operator, hex,
//! boolean, date, number, string, binary operator, constant, variable,
//! function. Whitespace and comments are skipped before each token.

use crate::error::{ExpressionError, ExpressionResult};
use crate::operators::UnaryOp;
use crate::symbols::FrozenSymbols;
use chrono::{NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};
use std::ops::Range;
use std::sync::OnceLock;

// -------------------------------------------------------------- Patterns

fn static_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static token pattern"))
}

fn trivia_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(&RE, r"(?ms)\A(?:\s+|//.*?$|/\*.*?\*/)")
}

fn hex_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(&RE, r"\b0[xX](?P<digits>[0-9a-fA-F]+)\b")
}

fn bool_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(&RE, r"(?i)\b(?:true|false)\b")
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(
        &RE,
        r"(?i)@D\((?P<y>\d{4})-(?P<mo>\d{1,2})-(?P<d>\d{1,2})(?:\s+(?P<h>\d{1,2}):(?P<mi>\d{2})(?::(?P<s>\d{2}))?\s*(?P<ampm>AM|PM)?)?\s*\)",
    )
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(&RE, r"(?:[0-9]+(?:\.[0-9]+)?|\.[0-9]+)(?:[eE][-+]?[0-9]+)?\b")
}

fn string_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(&RE, r"'(?P<s>[^']*(?:''[^']*)*)'")
}

fn binary_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(
        &RE,
        r"(?i)<<|>>|<>|<=|>=|==|!=|&&|\|\||\+|-|\*|/|%|&|\||\^|=|<|>|\band\b|\bor\b|\blike\b|\bin\b",
    )
}

// ---------------------------------------------------------------- Tokens

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `( ... )`, range of the inner text.
    Group(Range<usize>),
    /// `[ ... ]`, range of the inner text.
    Array(Range<usize>),
    Unary(UnaryOp),
    Hex(u64),
    Bool(bool),
    Date(NaiveDateTime),
    Number(f64),
    String(String),
    /// Operator as written.
    Binary(String),
    Constant { name: String, power: Option<f64> },
    Variable { name: String, power: Option<f64> },
    /// `name( ... )`, range of the argument text.
    Function { name: String, args: Range<usize> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

struct Candidate {
    start: usize,
    end: usize,
    kind: CandidateKind,
}

impl Candidate {
    fn is_name(&self) -> bool {
        matches!(self.kind, CandidateKind::Named { .. } | CandidateKind::Function { .. })
    }
}

enum CandidateKind {
    Ready(TokenKind),
    Hex(String),
    Date(usize),
    Number(String),
    Named { category: Named, name: String, power: Option<String> },
    Function { name: String, args: Range<usize> },
}

#[derive(Clone, Copy)]
enum Named {
    Constant,
    Variable,
}

pub struct Lexer<'a> {
    text: &'a str,
    symbols: &'a FrozenSymbols,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str, symbols: &'a FrozenSymbols) -> Self {
        Lexer { text, symbols }
    }

    /// Skips whitespace and comments starting at `pos`.
    pub fn skip_trivia(&self, mut pos: usize) -> usize {
        while pos < self.text.len() {
            match trivia_regex().find(&self.text[pos..]) {
                Some(m) if m.end() > 0 => pos += m.end(),
                _ => break,
            }
        }
        pos
    }

    /// Reads the token at `pos`. `expect_operand` is true when an operand
    /// (or prefix operator) is due, false when a binary operator is.
    pub fn next_token(&self, pos: usize, expect_operand: bool) -> ExpressionResult<Token> {
        let text = self.text;
        let mut best: Option<Candidate> = None;

        if expect_operand {
            offer(self.group(pos, '(', ')'), &mut best);
            offer(self.group(pos, '[', ']'), &mut best);
            offer(self.unary(pos), &mut best);
        }
        if !settled(&best, pos) {
            offer(find(hex_regex(), text, pos, |c| CandidateKind::Hex(c["digits"].to_string())), &mut best);
        }
        if !settled(&best, pos) {
            offer(
                find(bool_regex(), text, pos, |c| {
                    CandidateKind::Ready(TokenKind::Bool(c[0].eq_ignore_ascii_case("true")))
                }),
                &mut best,
            );
        }
        if !settled(&best, pos) {
            offer(find(date_regex(), text, pos, |c| CandidateKind::Date(c.get(0).map_or(0, |m| m.start()))), &mut best);
        }
        if !settled(&best, pos) {
            offer(find(number_regex(), text, pos, |c| CandidateKind::Number(c[0].to_string())), &mut best);
        }
        if !settled(&best, pos) {
            offer(
                find(string_regex(), text, pos, |c| {
                    CandidateKind::Ready(TokenKind::String(c["s"].replace("''", "'")))
                }),
                &mut best,
            );
        }
        if !expect_operand && !settled(&best, pos) {
            offer(
                find(binary_regex(), text, pos, |c| CandidateKind::Ready(TokenKind::Binary(c[0].to_string()))),
                &mut best,
            );
        }
        // Names keep competing at the cursor so that `fn(` is not cut short
        // by a variable `f`.
        if !settled(&best, pos) || is_name(&best) {
            if let Some(re) = self.symbols.constant_pattern() {
                offer(find(re, text, pos, |c| named(c, Named::Constant)), &mut best);
            }
            if let Some(re) = self.symbols.variable_pattern() {
                offer(find(re, text, pos, |c| named(c, Named::Variable)), &mut best);
            }
            if let Some(re) = self.symbols.function_pattern() {
                offer(self.function(re, pos), &mut best);
            }
        }

        let Some(candidate) = best else {
            return Err(ExpressionError::syntax(
                format!("Invalid expression construction: \"{}\".", text),
                pos,
                text.len() - pos,
            ));
        };
        if candidate.start != pos {
            return Err(ExpressionError::syntax(
                format!("Invalid token in expression: [{}]", text[pos..candidate.start].trim()),
                pos,
                candidate.start - pos,
            ));
        }
        let kind = self.finish(candidate.kind, pos)?;
        Ok(Token {
            kind,
            start: candidate.start,
            end: candidate.end,
        })
    }

    fn finish(&self, kind: CandidateKind, pos: usize) -> ExpressionResult<TokenKind> {
        let kind = match kind {
            CandidateKind::Ready(kind) => kind,
            CandidateKind::Hex(digits) => {
                let n = u64::from_str_radix(&digits, 16).map_err(|_| {
                    ExpressionError::syntax(format!("Hex literal 0x{} is too large.", digits), pos, digits.len() + 2)
                })?;
                TokenKind::Hex(n)
            }
            CandidateKind::Date(start) => TokenKind::Date(self.date_at(start)?),
            CandidateKind::Number(raw) => {
                let n = raw
                    .parse::<f64>()
                    .map_err(|_| ExpressionError::syntax(format!("Invalid number {}", raw), pos, raw.len()))?;
                TokenKind::Number(n)
            }
            CandidateKind::Named { category, name, power } => {
                let power = match power {
                    Some(p) => Some(p.parse::<f64>().map_err(|_| {
                        ExpressionError::syntax(format!("Invalid power {}", p), pos, p.len())
                    })?),
                    None => None,
                };
                match category {
                    Named::Constant => TokenKind::Constant { name, power },
                    Named::Variable => TokenKind::Variable { name, power },
                }
            }
            CandidateKind::Function { name, args } => TokenKind::Function { name, args },
        };
        Ok(kind)
    }

    fn date_at(&self, start: usize) -> ExpressionResult<NaiveDateTime> {
        let invalid = |len: usize| ExpressionError::syntax("Invalid date literal.", start, len);
        let caps = date_regex().captures_at(self.text, start).ok_or_else(|| invalid(1))?;
        let len = caps.get(0).map_or(1, |m| m.len());
        let num = |key: &str| -> ExpressionResult<u32> {
            caps.name(key)
                .map_or(Ok(0), |m| m.as_str().parse::<u32>())
                .map_err(|_| invalid(len))
        };
        let year = caps["y"].parse::<i32>().map_err(|_| invalid(len))?;
        let (month, day) = (num("mo")?, num("d")?);
        let (mut hour, minute, second) = (num("h")?, num("mi")?, num("s")?);
        match caps.name("ampm").map(|m| m.as_str().to_ascii_uppercase()).as_deref() {
            Some("PM") if hour < 12 => hour += 12,
            Some("AM") if hour == 12 => hour = 0,
            _ => {}
        }
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, second))
            .ok_or_else(|| invalid(len))
    }

    // Groups are only recognized at the cursor.
    fn group(&self, pos: usize, open: char, close: char) -> Option<Candidate> {
        if !self.text[pos..].starts_with(open) {
            return None;
        }
        let end = balanced_end(self.text, pos, open, close)?;
        let inner = pos + 1..end - 1;
        let kind = if open == '(' {
            TokenKind::Group(inner)
        } else {
            TokenKind::Array(inner)
        };
        Some(Candidate {
            start: pos,
            end,
            kind: CandidateKind::Ready(kind),
        })
    }

    // A prefix operator must touch its operand.
    fn unary(&self, pos: usize) -> Option<Candidate> {
        let mut chars = self.text[pos..].chars();
        let op = UnaryOp::from_char(chars.next()?)?;
        let next = chars.next()?;
        if !(next.is_alphanumeric() || matches!(next, '_' | '(' | '.' | '[' | '\'' | '@')) {
            return None;
        }
        Some(Candidate {
            start: pos,
            end: pos + 1,
            kind: CandidateKind::Ready(TokenKind::Unary(op)),
        })
    }

    fn function(&self, re: &Regex, pos: usize) -> Option<Candidate> {
        let mut from = pos;
        while let Some(caps) = re.captures_at(self.text, from) {
            let m = caps.get(0)?;
            // The pattern ends on the opening parenthesis.
            let open = m.end() - 1;
            if let Some(end) = balanced_end(self.text, open, '(', ')') {
                return Some(Candidate {
                    start: m.start(),
                    end,
                    kind: CandidateKind::Function {
                        name: caps["name"].to_string(),
                        args: open + 1..end - 1,
                    },
                });
            }
            from = m.start() + 1;
            while !self.text.is_char_boundary(from) {
                from += 1;
            }
        }
        None
    }
}

fn settled(best: &Option<Candidate>, pos: usize) -> bool {
    best.as_ref().is_some_and(|b| b.start == pos)
}

fn is_name(best: &Option<Candidate>) -> bool {
    best.as_ref().is_some_and(Candidate::is_name)
}

// Earliest start wins; between two names starting together the longer one.
fn offer(candidate: Option<Candidate>, best: &mut Option<Candidate>) {
    let Some(c) = candidate else { return };
    let better = match best {
        None => true,
        Some(b) => c.start < b.start || (c.start == b.start && c.is_name() && b.is_name() && c.end > b.end),
    };
    if better {
        *best = Some(c);
    }
}

fn find(re: &Regex, text: &str, pos: usize, kind: impl FnOnce(&Captures<'_>) -> CandidateKind) -> Option<Candidate> {
    let caps = re.captures_at(text, pos)?;
    let m = caps.get(0)?;
    if m.is_empty() {
        return None;
    }
    Some(Candidate {
        start: m.start(),
        end: m.end(),
        kind: kind(&caps),
    })
}

fn named(caps: &Captures<'_>, category: Named) -> CandidateKind {
    CandidateKind::Named {
        category,
        name: caps["name"].to_string(),
        power: caps.name("power").map(|m| m.as_str().to_string()),
    }
}

/// End (exclusive) of the group opened at `open_at`, counting only `open` and
/// `close` and ignoring them inside quoted strings.
pub(crate) fn balanced_end(text: &str, open_at: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    for (i, c) in text[open_at..].char_indices() {
        if c == '\'' {
            in_string = !in_string;
        } else if in_string {
            continue;
        } else if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(open_at + i + c.len_utf8());
            }
        }
    }
    None
}

/// Splits `text` on commas at nesting depth zero, outside strings. Returns
/// the byte ranges of the parts. Blank text has no parts.
pub(crate) fn split_top_level(text: &str) -> Vec<Range<usize>> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '\'' => in_string = !in_string,
            _ if in_string => {}
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(start..i);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(start..text.len());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{CaseSensitivity, SymbolTable};

    fn symbols() -> FrozenSymbols {
        let mut table = SymbolTable::new();
        table.add_variable("x").unwrap();
        table.add_variable("prm.value").unwrap();
        table.add_constant("PI", std::f64::consts::PI).unwrap();
        table.add_function("fn").unwrap();
        table.freeze(CaseSensitivity::NONE).unwrap()
    }

    fn kinds(text: &str) -> Vec<TokenKind> {
        let symbols = symbols();
        let lexer = Lexer::new(text, &symbols);
        let mut pos = 0;
        let mut expect_operand = true;
        let mut out = Vec::new();
        loop {
            pos = lexer.skip_trivia(pos);
            if pos >= text.len() {
                break;
            }
            let token = lexer.next_token(pos, expect_operand).unwrap();
            expect_operand = matches!(token.kind, TokenKind::Binary(_) | TokenKind::Unary(_));
            pos = token.end;
            out.push(token.kind);
        }
        out
    }

    #[test]
    fn numbers_strings_and_operators() {
        assert_eq!(
            kinds("1.5e2 + 'it''s' <= .5"),
            vec![
                TokenKind::Number(150.0),
                TokenKind::Binary("+".into()),
                TokenKind::String("it's".into()),
                TokenKind::Binary("<=".into()),
                TokenKind::Number(0.5),
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("1 // one\n + /* two */ 2"),
            vec![TokenKind::Number(1.0), TokenKind::Binary("+".into()), TokenKind::Number(2.0)]
        );
    }

    #[test]
    fn unary_needs_an_adjacent_operand() {
        assert_eq!(kinds("-x")[0], TokenKind::Unary(UnaryOp::Minus));
        assert_eq!(kinds("x - 1")[1], TokenKind::Binary("-".into()));
    }

    #[test]
    fn literals() {
        assert_eq!(kinds("0xFF"), vec![TokenKind::Hex(255)]);
        assert_eq!(kinds("TRUE"), vec![TokenKind::Bool(true)]);
        let date = NaiveDate::from_ymd_opt(2022, 1, 20).unwrap().and_hms_opt(15, 30, 0).unwrap();
        assert_eq!(kinds("@D(2022-01-20 3:30 PM)"), vec![TokenKind::Date(date)]);
    }

    #[test]
    fn names() {
        assert_eq!(
            kinds("X2 * pi + prm.value"),
            vec![
                TokenKind::Variable { name: "X".into(), power: Some(2.0) },
                TokenKind::Binary("*".into()),
                TokenKind::Constant { name: "pi".into(), power: None },
                TokenKind::Binary("+".into()),
                TokenKind::Variable { name: "prm.value".into(), power: None },
            ]
        );
    }

    #[test]
    fn groups_and_calls() {
        assert_eq!(kinds("(1 + (2))"), vec![TokenKind::Group(1..8)]);
        assert_eq!(kinds("[1, ')']"), vec![TokenKind::Array(1..7)]);
        assert_eq!(
            kinds("fn (x, ')')"),
            vec![TokenKind::Function { name: "fn".into(), args: 4..10 }]
        );
    }

    #[test]
    fn unknown_text_is_reported() {
        let symbols = symbols();
        let lexer = Lexer::new("y + 1", &symbols);
        let err = lexer.next_token(0, true).unwrap_err();
        assert_eq!(err.message, "Invalid token in expression: [y +]");
        assert_eq!((err.index, err.length), (0, 4));

        let lexer = Lexer::new("#", &symbols);
        let err = lexer.next_token(0, true).unwrap_err();
        assert_eq!(err.message, "Invalid expression construction: \"#\".");
    }

    #[test]
    fn splitting_ignores_nested_commas() {
        let text = "1, f(a, b), '[,]', [2, 3]";
        let parts: Vec<&str> = split_top_level(text).into_iter().map(|r| text[r].trim()).collect();
        assert_eq!(parts, vec!["1", "f(a, b)", "'[,]'", "[2, 3]"]);
        assert!(split_top_level("  ").is_empty());
    }
}
