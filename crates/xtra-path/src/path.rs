//! Path parsing: `user.name`, `items[0].qty`.
//!
//! Grammar: `ident ("." ident | "[" digits "]")*` with whitespace allowed
//! between tokens. `ident` matches `[A-Za-z_$][A-Za-z0-9_$]*`; indices are
//! unsigned integer literals. Anything else — operators, calls, string
//! literals — makes the whole expression invalid.

use xtra_types::{Path, Seg};

/// Byte cursor over a path expression.
struct Cursor<'src> {
    src: &'src [u8],
    pos: usize,
}

impl<'src> Cursor<'src> {
    fn new(src: &'src str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn skip_ws(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Scan an identifier, or `None` if the cursor is not at an ident start.
    fn ident(&mut self) -> Option<&'src str> {
        let start = self.pos;
        match self.peek() {
            Some(ch) if is_ident_start(ch) => self.pos += 1,
            _ => return None,
        }
        while let Some(ch) = self.peek() {
            if is_ident_part(ch) {
                self.pos += 1;
            } else {
                break;
            }
        }
        // Safety of the slice: ident bytes are ASCII, so the range lies on
        // char boundaries.
        std::str::from_utf8(&self.src[start..self.pos]).ok()
    }

    /// Scan an unsigned integer literal.
    fn digits(&mut self) -> Option<usize> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return None;
        }
        std::str::from_utf8(&self.src[start..self.pos])
            .ok()?
            .parse()
            .ok()
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_' || ch == b'$'
}

fn is_ident_part(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'$'
}

/// Parse a path expression. Returns `None` on any deviation from the
/// restricted grammar.
pub fn parse_path(expr: &str) -> Option<Path> {
    let mut cur = Cursor::new(expr.trim());
    cur.skip_ws();

    let first = cur.ident()?;
    let mut segs = vec![Seg::Key(first.to_string())];
    cur.skip_ws();

    while !cur.at_end() {
        match cur.peek() {
            Some(b'.') => {
                cur.pos += 1;
                cur.skip_ws();
                let id = cur.ident()?;
                segs.push(Seg::Key(id.to_string()));
                cur.skip_ws();
            }
            Some(b'[') => {
                cur.pos += 1;
                cur.skip_ws();
                let idx = cur.digits()?;
                cur.skip_ws();
                if cur.peek() != Some(b']') {
                    return None;
                }
                cur.pos += 1;
                segs.push(Seg::Index(idx));
                cur.skip_ws();
            }
            _ => return None,
        }
    }

    Path::new(segs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_and_nested() {
        assert_eq!(parse_path("count"), Some(Path::key("count")));
        let p = parse_path("items[0].qty").unwrap();
        assert_eq!(p.top_key(), "items");
        assert_eq!(
            p.segs(),
            &[
                Seg::Key("items".into()),
                Seg::Index(0),
                Seg::Key("qty".into())
            ]
        );
    }

    #[test]
    fn whitespace_tolerated() {
        assert_eq!(parse_path("  user . name  "), parse_path("user.name"));
        assert_eq!(parse_path("items [ 2 ]"), parse_path("items[2]"));
    }

    #[test]
    fn rejects_non_path_syntax() {
        for bad in [
            "", "  ", "1abc", "a.b(", "fn()", "a + b", "a['x']", "a[-1]", "a[]", "a[1",
            "a..b", ".a", "a.'b'",
        ] {
            assert_eq!(parse_path(bad), None, "expected invalid: {bad:?}");
        }
    }
}
