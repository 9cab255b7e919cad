//! Stored setting values that may be native JSON or serialized literal text.
//!
//! Older records keep tuple lists as text, e.g.
//! `"[(None, 1.0, 0.75), (0.75, 1.0, None)]"` or `"0,16,56"`; newer ones keep
//! JSON arrays. Both are resolved once, at ingestion, into a [`Setting`].

use serde_json::Value;

use super::error::{TransformError, TransformResult};

/// Parsed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
}

impl Literal {
    /// Parse literal text. A bare top-level `a, b, c` reads as a tuple.
    pub fn parse(text: &str) -> Result<Literal, String> {
        let mut parser = Parser { src: text.as_bytes(), pos: 0, depth: 0 };
        let first = parser.value()?;
        parser.skip_ws();
        if parser.eat(b',') {
            let mut items = vec![first];
            loop {
                parser.skip_ws();
                if parser.at_end() {
                    break;
                }
                items.push(parser.value()?);
                parser.skip_ws();
                if !parser.eat(b',') {
                    break;
                }
            }
            parser.skip_ws();
            if !parser.at_end() {
                return Err(format!("unexpected trailing input at byte {}", parser.pos));
            }
            return Ok(Literal::Tuple(items));
        }
        if !parser.at_end() {
            return Err(format!("unexpected trailing input at byte {}", parser.pos));
        }
        Ok(first)
    }

    pub fn from_json(value: &Value) -> Literal {
        match value {
            Value::Null => Literal::None,
            Value::Bool(b) => Literal::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Literal::Int(i),
                None => Literal::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Literal::Str(s.clone()),
            Value::Array(items) => Literal::List(items.iter().map(Literal::from_json).collect()),
            Value::Object(_) => Literal::Str(value.to_string()),
        }
    }

    /// Items of a list or tuple.
    pub fn items(&self) -> Option<&[Literal]> {
        match self {
            Literal::List(items) | Literal::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Number as f64; numeric text is accepted.
    pub fn as_f64(&self, field: &str) -> TransformResult<f64> {
        match self {
            Literal::Int(i) => Ok(*i as f64),
            Literal::Float(f) => Ok(*f),
            Literal::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| TransformError::coercion(field, s)),
            other => Err(TransformError::coercion(field, format!("{:?}", other))),
        }
    }

    /// Number or `None`.
    pub fn as_opt_f64(&self, field: &str) -> TransformResult<Option<f64>> {
        match self {
            Literal::None => Ok(None),
            other => other.as_f64(field).map(Some),
        }
    }
}

/// A stored setting value, resolved once.
#[derive(Debug, Clone, PartialEq)]
pub enum Setting {
    /// Text that is not a parseable literal
    Raw(String),
    Parsed(Literal),
}

impl Setting {
    pub fn from_json(value: &Value) -> Setting {
        match value {
            Value::String(s) => match Literal::parse(s) {
                Ok(lit) => Setting::Parsed(lit),
                Err(e) => {
                    log::debug!("keeping raw setting text {:?}: {}", s, e);
                    Setting::Raw(s.clone())
                }
            },
            other => Setting::Parsed(Literal::from_json(other)),
        }
    }

    /// Items of a parsed list/tuple, or a formatted-string error naming `field`.
    pub fn items(&self, field: &str) -> TransformResult<&[Literal]> {
        match self {
            Setting::Parsed(lit) => lit
                .items()
                .ok_or_else(|| TransformError::malformed(field, format!("expected a list, got {:?}", lit))),
            Setting::Raw(text) => Err(TransformError::malformed(
                field,
                format!("not a literal list: {:?}", text),
            )),
        }
    }
}

/// Deepest list/tuple nesting accepted
const MAX_DEPTH: usize = 64;

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Result<Literal, String> {
        self.skip_ws();
        match self.peek() {
            None => Err("unexpected end of input".to_string()),
            Some(b'[') => {
                let (items, _) = self.nested(b']')?;
                Ok(Literal::List(items))
            }
            Some(b'(') => {
                let (mut items, trailing_comma) = self.nested(b')')?;
                // `(x)` is a parenthesized value, `(x,)` a tuple
                if items.len() == 1 && !trailing_comma {
                    Ok(items.remove(0))
                } else {
                    Ok(Literal::Tuple(items))
                }
            }
            Some(q @ (b'\'' | b'"')) => self.string(q),
            Some(c) if c == b'-' || c == b'+' || c == b'.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_ascii_alphabetic() => self.word(),
            Some(c) => Err(format!("unexpected character {:?} at byte {}", c as char, self.pos)),
        }
    }

    /// Step past an opening bracket and read its items, bounded by [`MAX_DEPTH`].
    fn nested(&mut self, close: u8) -> Result<(Vec<Literal>, bool), String> {
        if self.depth >= MAX_DEPTH {
            return Err(format!("nesting deeper than {} at byte {}", MAX_DEPTH, self.pos));
        }
        self.pos += 1;
        self.depth += 1;
        let result = self.sequence(close);
        self.depth -= 1;
        result
    }

    /// Comma-separated items up to `close`. Returns whether the last item had a trailing comma.
    fn sequence(&mut self, close: u8) -> Result<(Vec<Literal>, bool), String> {
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            self.skip_ws();
            if self.eat(close) {
                return Ok((items, trailing_comma));
            }
            items.push(self.value()?);
            self.skip_ws();
            trailing_comma = self.eat(b',');
            if !trailing_comma {
                self.skip_ws();
                if self.eat(close) {
                    return Ok((items, false));
                }
                return Err(format!("expected ',' or '{}' at byte {}", close as char, self.pos));
            }
        }
    }

    fn string(&mut self, quote: u8) -> Result<Literal, String> {
        self.pos += 1;
        let mut out = Vec::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == quote {
                return String::from_utf8(out)
                    .map(Literal::Str)
                    .map_err(|e| e.to_string());
            }
            if c == b'\\' {
                match self.peek() {
                    Some(b'n') => out.push(b'\n'),
                    Some(b't') => out.push(b'\t'),
                    Some(other) => out.push(other),
                    None => break,
                }
                self.pos += 1;
            } else {
                out.push(c);
            }
        }
        Err("unterminated string".to_string())
    }

    fn number(&mut self) -> Result<Literal, String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || matches!(c, b'-' | b'+' | b'.' | b'e' | b'E')) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).map_err(|e| e.to_string())?;
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Literal::Int(i));
        }
        text.parse::<f64>()
            .map(Literal::Float)
            .map_err(|_| format!("invalid number {:?}", text))
    }

    fn word(&mut self) -> Result<Literal, String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.pos += 1;
        }
        match &self.src[start..self.pos] {
            b"None" | b"null" => Ok(Literal::None),
            b"True" | b"true" => Ok(Literal::Bool(true)),
            b"False" | b"false" => Ok(Literal::Bool(false)),
            other => Err(format!("unknown name {:?}", String::from_utf8_lossy(other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_tuple_list() {
        let lit = Literal::parse("[(None, 1.0, 0.75), (0.75, 1.0, None)]").unwrap();
        assert_eq!(
            lit,
            Literal::List(vec![
                Literal::Tuple(vec![Literal::None, Literal::Float(1.0), Literal::Float(0.75)]),
                Literal::Tuple(vec![Literal::Float(0.75), Literal::Float(1.0), Literal::None]),
            ])
        );
    }

    #[test]
    fn test_parse_bare_comma_list_as_tuple() {
        let lit = Literal::parse("0,16, 56").unwrap();
        assert_eq!(
            lit,
            Literal::Tuple(vec![Literal::Int(0), Literal::Int(16), Literal::Int(56)])
        );
    }

    #[test]
    fn test_parenthesized_value_vs_single_tuple() {
        assert_eq!(Literal::parse("(3)").unwrap(), Literal::Int(3));
        assert_eq!(Literal::parse("(3,)").unwrap(), Literal::Tuple(vec![Literal::Int(3)]));
        assert_eq!(Literal::parse("()").unwrap(), Literal::Tuple(vec![]));
    }

    #[test]
    fn test_parse_strings_and_words() {
        assert_eq!(Literal::parse("'a, b'").unwrap(), Literal::Str("a, b".into()));
        assert_eq!(Literal::parse("[true, False, null]").unwrap(), Literal::List(vec![
            Literal::Bool(true),
            Literal::Bool(false),
            Literal::None,
        ]));
        assert_eq!(Literal::parse("-2.5e1").unwrap(), Literal::Float(-25.0));
    }

    #[test]
    fn test_parse_failures() {
        assert!(Literal::parse("[1, 2").is_err());
        assert!(Literal::parse("hello world").is_err());
        assert!(Literal::parse("").is_err());
        assert!(Literal::parse("[1] 2").is_err());
    }

    #[test]
    fn test_nesting_depth_limit() {
        let ok = format!("{}1{}", "[".repeat(32), "]".repeat(32));
        assert!(Literal::parse(&ok).is_ok());

        let at_limit = format!("{}{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert!(Literal::parse(&at_limit).is_ok());
        let over = format!("{}{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        assert!(Literal::parse(&over).is_err());

        let deep = "[".repeat(100_000);
        assert!(Literal::parse(&deep).is_err());
        assert!(matches!(Setting::from_json(&json!(deep)), Setting::Raw(_)));
    }

    #[test]
    fn test_setting_resolution() {
        let native = Setting::from_json(&json!([0, 16, 56]));
        assert_eq!(native.items("d").unwrap().len(), 3);

        let text = Setting::from_json(&json!("[0, 16, 56]"));
        assert_eq!(text.items("d").unwrap()[2], Literal::Int(56));

        let raw = Setting::from_json(&json!("not a list {"));
        assert!(matches!(raw, Setting::Raw(_)));
        assert!(matches!(
            raw.items("d").unwrap_err(),
            TransformError::MalformedFormattedString { .. }
        ));
    }

    #[test]
    fn test_literal_numbers() {
        assert_eq!(Literal::Str("2.5".into()).as_f64("x").unwrap(), 2.5);
        assert_eq!(Literal::None.as_opt_f64("x").unwrap(), None);
        assert!(Literal::Bool(true).as_f64("x").is_err());
    }
}
