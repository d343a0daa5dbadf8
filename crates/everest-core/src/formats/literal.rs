//! A parser for JavaScript object literals.
//!
//! Covers what documentation builders emit: objects with bare or quoted
//! keys, arrays, single- or double-quoted strings, numbers, `true`, `false`
//! and `null`. Trailing commas are accepted. JSON is a subset.

use crate::EverestError;
use crate::constants::MAX_LITERAL_DEPTH;
use serde_json::{Map, Number, Value};

/// Parse a complete literal into a JSON value.
pub fn parse_literal(src: &str) -> Result<Value, EverestError> {
    let mut parser = Parser { src, pos: 0, depth: 0 };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos != src.len() {
        return Err(parser.error("trailing characters after literal"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: &str) -> EverestError {
        EverestError::DeserializationError(format!("{} at byte {}", message, self.pos))
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), EverestError> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(&format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(&format!("expected '{}', found end of input", expected))),
        }
    }

    fn value(&mut self) -> Result<Value, EverestError> {
        self.skip_ws();
        match self.peek() {
            Some('{') => self.nested(Self::object),
            Some('[') => self.nested(Self::array),
            Some('"' | '\'') => self.string().map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if is_ident_start(c) => match self.identifier() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "null" => Ok(Value::Null),
                other => Err(self.error(&format!("unexpected identifier '{}'", other))),
            },
            Some(c) => Err(self.error(&format!("unexpected character '{}'", c))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Value, EverestError>,
    ) -> Result<Value, EverestError> {
        self.depth += 1;
        if self.depth > MAX_LITERAL_DEPTH {
            return Err(self.error(&format!(
                "nesting deeper than {} levels",
                MAX_LITERAL_DEPTH
            )));
        }
        let value = parse(self)?;
        self.depth -= 1;
        Ok(value)
    }

    fn object(&mut self) -> Result<Value, EverestError> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(Value::Object(map));
            }
            let key = self.key()?;
            self.expect(':')?;
            let value = self.value()?;
            map.insert(key, value);

            self.skip_ws();
            match self.bump() {
                Some(',') => {}
                Some('}') => return Ok(Value::Object(map)),
                _ => return Err(self.error("expected ',' or '}' in object")),
            }
        }
    }

    fn key(&mut self) -> Result<String, EverestError> {
        self.skip_ws();
        match self.peek() {
            Some('"' | '\'') => self.string(),
            Some(c) if is_ident_start(c) => Ok(self.identifier().to_string()),
            Some(c) if c.is_ascii_digit() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
                Ok(self.src[start..self.pos].to_string())
            }
            _ => Err(self.error("expected object key")),
        }
    }

    fn array(&mut self) -> Result<Value, EverestError> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(']') {
                self.bump();
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);

            self.skip_ws();
            match self.bump() {
                Some(',') => {}
                Some(']') => return Ok(Value::Array(items)),
                _ => return Err(self.error("expected ',' or ']' in array")),
            }
        }
    }

    fn identifier(&mut self) -> &'a str {
        let src = self.src;
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        &src[start..self.pos]
    }

    fn string(&mut self) -> Result<String, EverestError> {
        let quote = self.bump().ok_or_else(|| self.error("expected string"))?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => out.push(self.escape()?),
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self) -> Result<char, EverestError> {
        match self.bump() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('b') => Ok('\u{8}'),
            Some('f') => Ok('\u{c}'),
            Some('0') => Ok('\0'),
            Some('u') => {
                let high = self.hex4()?;
                if !(0xD800..0xDC00).contains(&high) {
                    return char::from_u32(high).ok_or_else(|| self.error("invalid \\u escape"));
                }
                // Surrogate pair.
                if self.bump() != Some('\\') || self.bump() != Some('u') {
                    return Err(self.error("unpaired surrogate in \\u escape"));
                }
                let low = self.hex4()?;
                if !(0xDC00..0xE000).contains(&low) {
                    return Err(self.error("invalid low surrogate in \\u escape"));
                }
                let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                char::from_u32(code).ok_or_else(|| self.error("invalid \\u escape"))
            }
            Some(c) => Ok(c),
            None => Err(self.error("unterminated escape")),
        }
    }

    fn hex4(&mut self) -> Result<u32, EverestError> {
        let end = self.pos + 4;
        let digits = self
            .src
            .get(self.pos..end)
            .ok_or_else(|| self.error("truncated \\u escape"))?;
        let code =
            u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid \\u escape"))?;
        self.pos = end;
        Ok(code)
    }

    fn number(&mut self) -> Result<Value, EverestError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        {
            self.bump();
        }
        let text = self.src[start..self.pos].trim_start_matches('+');
        if let Ok(n) = text.parse::<i64>() {
            return Ok(Value::Number(n.into()));
        }
        if let Ok(n) = text.parse::<u64>() {
            return Ok(Value::Number(n.into()));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| self.error(&format!("invalid number '{}'", text)))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_keys_and_nesting() {
        let value =
            parse_literal(r#"{docnames:["api","k2"],objects:{"everest3.k2":{name:[5,1,1,""]}}}"#)
                .unwrap();
        assert_eq!(
            value,
            json!({"docnames": ["api", "k2"], "objects": {"everest3.k2": {"name": [5, 1, 1, ""]}}})
        );
    }

    #[test]
    fn numeric_keys_and_trailing_commas() {
        let value = parse_literal(r#"{0: "py:module", 1: 'py:data',}"#).unwrap();
        assert_eq!(value, json!({"0": "py:module", "1": "py:data"}));
        assert_eq!(parse_literal("[1, 2,]").unwrap(), json!([1, 2]));
    }

    #[test]
    fn keys_keep_document_order() {
        let value = parse_literal("{b:1,a:2}").unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn scalars() {
        assert_eq!(parse_literal("-3").unwrap(), json!(-3));
        assert_eq!(parse_literal("2.5e1").unwrap(), json!(25.0));
        assert_eq!(parse_literal("true").unwrap(), json!(true));
        assert_eq!(parse_literal("null").unwrap(), Value::Null);
        assert_eq!(parse_literal(r#""a\"bé""#).unwrap(), json!("a\"bé"));
        assert_eq!(parse_literal(r#""\ud83d\ude00""#).unwrap(), json!("\u{1F600}"));
    }

    #[test]
    fn malformed_input_rejected() {
        for src in ["{a:1", "[1 2]", "{a 1}", "\"open", "{a:undefined}", "1 2", ""] {
            assert!(
                matches!(parse_literal(src), Err(EverestError::DeserializationError(_))),
                "accepted {:?}",
                src
            );
        }
    }

    #[test]
    fn depth_limited() {
        let deep = "[".repeat(MAX_LITERAL_DEPTH + 1) + &"]".repeat(MAX_LITERAL_DEPTH + 1);
        assert!(parse_literal(&deep).is_err());
        let ok = "[".repeat(MAX_LITERAL_DEPTH) + &"]".repeat(MAX_LITERAL_DEPTH);
        assert!(parse_literal(&ok).is_ok());
    }
}
