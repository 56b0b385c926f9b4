//! Parser for the sandboxed handler script language.
//!
//! Compiles `x-on:*` / `x-run` attribute bodies into a [`Script`] AST.
//! The language is statements separated by `;`:
//!
//! - `path = expr` — assign into the store
//! - `delete path` — remove a store entry
//!
//! Expressions cover literals, store paths, `el.<prop>`, `event.<field>`,
//! `not`/unary `-`, and the binary operators
//! `or and == != < > <= >= + - * / %`. Comparisons do not chain.

use thiserror::Error;
use xtra_types::script::{BinOp, Script, ScriptExpr, ScriptStmt, UnOp};
use xtra_types::{Path, Seg, Value};

/// Script compilation failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptParseError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unexpected token '{0}'")]
    Unexpected(String),
    #[error("unexpected end of script")]
    UnexpectedEof,
    #[error("invalid assignment target '{0}'")]
    BadTarget(String),
    #[error("comparison operators cannot be chained; use 'and'")]
    ChainedComparison,
}

type ScriptResult<T> = Result<T, ScriptParseError>;

// ─────────────────────────────────────────────────────────────────────
// Tokens
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Num(f64),
    Str(String),
    Assign,
    EqEq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Semi,
    Eof,
}

impl std::fmt::Display for Tok {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tok::Ident(s) => write!(f, "{s}"),
            Tok::Num(n) => write!(f, "{n}"),
            Tok::Str(s) => write!(f, "{s:?}"),
            Tok::Assign => write!(f, "="),
            Tok::EqEq => write!(f, "=="),
            Tok::NotEq => write!(f, "!="),
            Tok::Lt => write!(f, "<"),
            Tok::Gt => write!(f, ">"),
            Tok::Le => write!(f, "<="),
            Tok::Ge => write!(f, ">="),
            Tok::Plus => write!(f, "+"),
            Tok::Minus => write!(f, "-"),
            Tok::Star => write!(f, "*"),
            Tok::Slash => write!(f, "/"),
            Tok::Percent => write!(f, "%"),
            Tok::LParen => write!(f, "("),
            Tok::RParen => write!(f, ")"),
            Tok::LBracket => write!(f, "["),
            Tok::RBracket => write!(f, "]"),
            Tok::Dot => write!(f, "."),
            Tok::Semi => write!(f, ";"),
            Tok::Eof => write!(f, "<eof>"),
        }
    }
}

fn tokenize(src: &str) -> ScriptResult<Vec<Tok>> {
    let bytes = src.as_bytes();
    let mut toks = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let ch = bytes[i];
        match ch {
            b if b.is_ascii_whitespace() => i += 1,
            b'=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    toks.push(Tok::EqEq);
                    i += 2;
                } else {
                    toks.push(Tok::Assign);
                    i += 1;
                }
            }
            b'!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    toks.push(Tok::NotEq);
                    i += 2;
                } else {
                    return Err(ScriptParseError::UnexpectedChar('!'));
                }
            }
            b'<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    toks.push(Tok::Le);
                    i += 2;
                } else {
                    toks.push(Tok::Lt);
                    i += 1;
                }
            }
            b'>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    toks.push(Tok::Ge);
                    i += 2;
                } else {
                    toks.push(Tok::Gt);
                    i += 1;
                }
            }
            b'+' => {
                toks.push(Tok::Plus);
                i += 1;
            }
            b'-' => {
                toks.push(Tok::Minus);
                i += 1;
            }
            b'*' => {
                toks.push(Tok::Star);
                i += 1;
            }
            b'/' => {
                toks.push(Tok::Slash);
                i += 1;
            }
            b'%' => {
                toks.push(Tok::Percent);
                i += 1;
            }
            b'(' => {
                toks.push(Tok::LParen);
                i += 1;
            }
            b')' => {
                toks.push(Tok::RParen);
                i += 1;
            }
            b'[' => {
                toks.push(Tok::LBracket);
                i += 1;
            }
            b']' => {
                toks.push(Tok::RBracket);
                i += 1;
            }
            b'.' => {
                toks.push(Tok::Dot);
                i += 1;
            }
            b';' => {
                toks.push(Tok::Semi);
                i += 1;
            }
            b'\'' | b'"' => {
                let quote = ch;
                i += 1;
                let mut s = String::new();
                loop {
                    match bytes.get(i) {
                        None => return Err(ScriptParseError::UnterminatedString),
                        Some(&b) if b == quote => {
                            i += 1;
                            break;
                        }
                        Some(&b'\\') => {
                            i += 1;
                            match bytes.get(i) {
                                None => return Err(ScriptParseError::UnterminatedString),
                                Some(&b'n') => {
                                    s.push('\n');
                                    i += 1;
                                }
                                Some(&b't') => {
                                    s.push('\t');
                                    i += 1;
                                }
                                Some(&b) if b.is_ascii() => {
                                    s.push(b as char);
                                    i += 1;
                                }
                                Some(_) => {
                                    let ch = next_char(src, i);
                                    s.push(ch);
                                    i += ch.len_utf8();
                                }
                            }
                        }
                        Some(&b) if b.is_ascii() => {
                            s.push(b as char);
                            i += 1;
                        }
                        Some(_) => {
                            // Multibyte scalar: take the whole character,
                            // not its lead byte.
                            let ch = next_char(src, i);
                            s.push(ch);
                            i += ch.len_utf8();
                        }
                    }
                }
                toks.push(Tok::Str(s));
            }
            b if b.is_ascii_digit() => {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if i < bytes.len()
                    && bytes[i] == b'.'
                    && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)
                {
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let text = &src[start..i];
                let n = text
                    .parse::<f64>()
                    .map_err(|_| ScriptParseError::Unexpected(text.to_string()))?;
                toks.push(Tok::Num(n));
            }
            b if b.is_ascii_alphabetic() || b == b'_' || b == b'$' => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'$')
                {
                    i += 1;
                }
                toks.push(Tok::Ident(src[start..i].to_string()));
            }
            other if other.is_ascii() => {
                return Err(ScriptParseError::UnexpectedChar(other as char))
            }
            _ => return Err(ScriptParseError::UnexpectedChar(next_char(src, i))),
        }
    }

    toks.push(Tok::Eof);
    Ok(toks)
}

/// The character starting at byte offset `i`. The cursor only ever lands
/// on character boundaries, so the decode cannot fail.
fn next_char(src: &str, i: usize) -> char {
    src[i..].chars().next().unwrap_or('\u{FFFD}')
}

// ─────────────────────────────────────────────────────────────────────
// Parser
// ─────────────────────────────────────────────────────────────────────

struct ScriptParser {
    toks: Vec<Tok>,
    pos: usize,
}

/// A parsed reference: store path or enumerated context access.
enum RefExpr {
    Store(Path),
    El(String),
    Event(String),
}

impl ScriptParser {
    fn peek(&self) -> &Tok {
        self.toks.get(self.pos).unwrap_or(&Tok::Eof)
    }

    fn advance(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.toks.len() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == tok {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self) -> ScriptResult<String> {
        match self.advance() {
            Tok::Ident(name) => Ok(name),
            Tok::Eof => Err(ScriptParseError::UnexpectedEof),
            other => Err(ScriptParseError::Unexpected(other.to_string())),
        }
    }

    // ── Statements ────────────────────────────────────────────────

    fn parse_script(&mut self) -> ScriptResult<Script> {
        let mut stmts = Vec::new();
        loop {
            while self.eat(&Tok::Semi) {}
            if self.peek() == &Tok::Eof {
                break;
            }
            stmts.push(self.parse_stmt()?);
            match self.peek() {
                Tok::Semi | Tok::Eof => {}
                other => return Err(ScriptParseError::Unexpected(other.to_string())),
            }
        }
        Ok(Script { stmts })
    }

    fn parse_stmt(&mut self) -> ScriptResult<ScriptStmt> {
        if matches!(self.peek(), Tok::Ident(name) if name == "delete") {
            self.advance();
            return match self.parse_reference()? {
                RefExpr::Store(path) => Ok(ScriptStmt::Delete(path)),
                RefExpr::El(_) => Err(ScriptParseError::BadTarget("el".into())),
                RefExpr::Event(_) => Err(ScriptParseError::BadTarget("event".into())),
            };
        }

        let target = match self.parse_reference()? {
            RefExpr::Store(path) => path,
            RefExpr::El(_) => return Err(ScriptParseError::BadTarget("el".into())),
            RefExpr::Event(_) => return Err(ScriptParseError::BadTarget("event".into())),
        };
        if !self.eat(&Tok::Assign) {
            return Err(ScriptParseError::Unexpected(self.peek().to_string()));
        }
        let value = self.parse_expr()?;
        Ok(ScriptStmt::Assign { target, value })
    }

    // ── Expressions (precedence chain, lowest first) ──────────────

    fn parse_expr(&mut self) -> ScriptResult<ScriptExpr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ScriptResult<ScriptExpr> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            let right = self.parse_and()?;
            left = binary(left, BinOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ScriptResult<ScriptExpr> {
        let mut left = self.parse_comparison()?;
        while self.eat_keyword("and") {
            let right = self.parse_comparison()?;
            left = binary(left, BinOp::And, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> ScriptResult<ScriptExpr> {
        let mut left = self.parse_add()?;
        if let Some(op) = self.comparison_op() {
            self.advance();
            let right = self.parse_add()?;
            left = binary(left, op, right);
            if self.comparison_op().is_some() {
                return Err(ScriptParseError::ChainedComparison);
            }
        }
        Ok(left)
    }

    fn comparison_op(&self) -> Option<BinOp> {
        match self.peek() {
            Tok::EqEq => Some(BinOp::Eq),
            Tok::NotEq => Some(BinOp::Ne),
            Tok::Lt => Some(BinOp::Lt),
            Tok::Gt => Some(BinOp::Gt),
            Tok::Le => Some(BinOp::Le),
            Tok::Ge => Some(BinOp::Ge),
            _ => None,
        }
    }

    fn parse_add(&mut self) -> ScriptResult<ScriptExpr> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Tok::Plus => BinOp::Add,
                Tok::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_mul()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_mul(&mut self) -> ScriptResult<ScriptExpr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Tok::Star => BinOp::Mul,
                Tok::Slash => BinOp::Div,
                Tok::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ScriptResult<ScriptExpr> {
        if self.eat_keyword("not") {
            let expr = self.parse_unary()?;
            return Ok(ScriptExpr::Unary {
                op: UnOp::Not,
                expr: Box::new(expr),
            });
        }
        if self.eat(&Tok::Minus) {
            let expr = self.parse_unary()?;
            return Ok(ScriptExpr::Unary {
                op: UnOp::Neg,
                expr: Box::new(expr),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ScriptResult<ScriptExpr> {
        match self.peek().clone() {
            Tok::Num(n) => {
                self.advance();
                Ok(ScriptExpr::Lit(Value::Num(n)))
            }
            Tok::Str(s) => {
                self.advance();
                Ok(ScriptExpr::Lit(Value::Str(s)))
            }
            Tok::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                if !self.eat(&Tok::RParen) {
                    return Err(ScriptParseError::Unexpected(self.peek().to_string()));
                }
                Ok(expr)
            }
            Tok::Ident(name) => match name.as_str() {
                "true" => {
                    self.advance();
                    Ok(ScriptExpr::Lit(Value::Bool(true)))
                }
                "false" => {
                    self.advance();
                    Ok(ScriptExpr::Lit(Value::Bool(false)))
                }
                "null" => {
                    self.advance();
                    Ok(ScriptExpr::Lit(Value::Null))
                }
                _ => Ok(match self.parse_reference()? {
                    RefExpr::Store(path) => ScriptExpr::Store(path),
                    RefExpr::El(prop) => ScriptExpr::El(prop),
                    RefExpr::Event(field) => ScriptExpr::Event(field),
                }),
            },
            Tok::Eof => Err(ScriptParseError::UnexpectedEof),
            other => Err(ScriptParseError::Unexpected(other.to_string())),
        }
    }

    /// Parse a reference: `el.<prop>`, `event.<field>`, or a store path.
    /// `el` and `event` are reserved roots with exactly one property hop.
    fn parse_reference(&mut self) -> ScriptResult<RefExpr> {
        let root = self.expect_ident()?;

        if root == "el" || root == "event" {
            if !self.eat(&Tok::Dot) {
                return Err(ScriptParseError::Unexpected(self.peek().to_string()));
            }
            let prop = self.expect_ident()?;
            return Ok(if root == "el" {
                RefExpr::El(prop)
            } else {
                RefExpr::Event(prop)
            });
        }

        let mut segs = vec![Seg::Key(root)];
        loop {
            if self.eat(&Tok::Dot) {
                segs.push(Seg::Key(self.expect_ident()?));
            } else if self.eat(&Tok::LBracket) {
                let idx = match self.advance() {
                    Tok::Num(n) if n.fract() == 0.0 && n >= 0.0 => n as usize,
                    other => return Err(ScriptParseError::Unexpected(other.to_string())),
                };
                if !self.eat(&Tok::RBracket) {
                    return Err(ScriptParseError::Unexpected(self.peek().to_string()));
                }
                segs.push(Seg::Index(idx));
            } else {
                break;
            }
        }
        let path = Path::new(segs).ok_or(ScriptParseError::UnexpectedEof)?;
        Ok(RefExpr::Store(path))
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if matches!(self.peek(), Tok::Ident(name) if name == kw) {
            self.advance();
            true
        } else {
            false
        }
    }
}

/// Parse a handler script attribute body.
pub fn parse_script(src: &str) -> ScriptResult<Script> {
    let toks = tokenize(src)?;
    ScriptParser { toks, pos: 0 }.parse_script()
}

fn binary(left: ScriptExpr, op: BinOp, right: ScriptExpr) -> ScriptExpr {
    ScriptExpr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_with_arithmetic() {
        let script = parse_script("count = count + 1").unwrap();
        assert_eq!(script.stmts.len(), 1);
        match &script.stmts[0] {
            ScriptStmt::Assign { target, value } => {
                assert_eq!(target.top_key(), "count");
                assert!(matches!(value, ScriptExpr::Binary { op: BinOp::Add, .. }));
            }
            other => panic!("expected assign, got {other:?}"),
        }
    }

    #[test]
    fn multiple_statements_and_delete() {
        let script = parse_script("a = 1; delete user.tmp; b = 'x'").unwrap();
        assert_eq!(script.stmts.len(), 3);
        assert!(matches!(&script.stmts[1], ScriptStmt::Delete(p) if p.top_key() == "user"));
    }

    #[test]
    fn context_roots() {
        let script = parse_script("query = el.value; key = event.key").unwrap();
        match &script.stmts[0] {
            ScriptStmt::Assign { value, .. } => {
                assert_eq!(value, &ScriptExpr::El("value".into()));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_ascii_string_literals_survive() {
        let script = parse_script("msg = 'héllo wörld ✓'").unwrap();
        match &script.stmts[0] {
            ScriptStmt::Assign { value, .. } => {
                assert_eq!(value, &ScriptExpr::Lit(Value::Str("héllo wörld ✓".into())));
            }
            other => panic!("unexpected {other:?}"),
        }

        let script = parse_script(r"a = 'caf\é'").unwrap();
        match &script.stmts[0] {
            ScriptStmt::Assign { value, .. } => {
                assert_eq!(value, &ScriptExpr::Lit(Value::Str("café".into())));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn el_is_not_assignable() {
        assert_eq!(
            parse_script("el.value = 1"),
            Err(ScriptParseError::BadTarget("el".into()))
        );
    }

    #[test]
    fn chained_comparison_rejected() {
        assert_eq!(
            parse_script("a = 1 < b < 3"),
            Err(ScriptParseError::ChainedComparison)
        );
    }

    #[test]
    fn precedence() {
        // a = 1 + 2 * 3  →  Add(1, Mul(2, 3))
        let script = parse_script("a = 1 + 2 * 3").unwrap();
        match &script.stmts[0] {
            ScriptStmt::Assign { value, .. } => match value {
                ScriptExpr::Binary { op: BinOp::Add, right, .. } => {
                    assert!(matches!(**right, ScriptExpr::Binary { op: BinOp::Mul, .. }));
                }
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }
}
