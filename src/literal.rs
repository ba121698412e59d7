//! Restricted literal-expression parser.
//!
//! Directive comments and `tsconfig.json` files both contain JavaScript-flavoured data
//! literals: quoted or bare keys, single/double/backtick strings, trailing commas and comments.
//! This module parses exactly that data subset into a [`serde_json::Value`]. Anything that
//! would require evaluation (identifiers other than the keyword literals, calls, operators other
//! than a numeric sign, `${}` substitutions) is rejected with a [`LiteralError`].

use serde_json::{Map, Number, Value};
use std::fmt;

/// Error produced when the input is not a pure data literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralError {
    pub position: usize,
    pub message: String,
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (at offset {})", self.message, self.position)
    }
}

impl std::error::Error for LiteralError {}

/// Parses a complete literal expression. Trailing input other than whitespace, comments or a
/// single `;` is an error.
pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let mut parser = LiteralParser {
        chars: input.char_indices().collect(),
        pos: 0,
        len: input.len(),
    };
    let value = parser.parse_value()?;
    parser.skip_trivia()?;
    if parser.peek() == Some(';') {
        parser.pos += 1;
        parser.skip_trivia()?;
    }
    if parser.pos < parser.chars.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

/// Resolves JavaScript escape sequences in the body of a string literal
pub fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => out.push_str(&hex),
                }
            }
            Some('u') => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|&c| c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => out.push_str(&hex),
                }
            }
            // line continuation
            Some('\n') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

struct LiteralParser {
    chars: Vec<(usize, char)>,
    pos: usize,
    len: usize,
}

impl LiteralParser {
    fn offset(&self) -> usize {
        self.chars.get(self.pos).map(|(o, _)| *o).unwrap_or(self.len)
    }

    fn error(&self, message: &str) -> LiteralError {
        LiteralError {
            position: self.offset(),
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|(_, c)| *c)
    }

    fn skip_trivia(&mut self) -> Result<(), LiteralError> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => self.pos += 1,
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.pos += 2;
                                break;
                            }
                            (Some(_), _) => self.pos += 1,
                            (None, _) => return Err(self.error("unterminated comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value, LiteralError> {
        self.skip_trivia()?;
        match self.peek() {
            Some('{') => self.parse_object(),
            Some('[') => self.parse_array(),
            Some('"') | Some('\'') | Some('`') => Ok(Value::String(self.parse_string()?)),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.parse_number(),
            Some(c) if is_ident_start(c) => {
                let word = self.parse_identifier();
                match word.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" | "undefined" => Ok(Value::Null),
                    _ => Err(self.error(&format!("identifier `{}` is not a literal", word))),
                }
            }
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_object(&mut self) -> Result<Value, LiteralError> {
        // consume '{'
        self.pos += 1;
        let mut map = Map::new();
        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some('}') => {
                    self.pos += 1;
                    return Ok(Value::Object(map));
                }
                None => return Err(self.error("unterminated object")),
                _ => {}
            }

            let key = match self.peek() {
                Some('"') | Some('\'') | Some('`') => self.parse_string()?,
                Some(c) if is_ident_start(c) => self.parse_identifier(),
                Some(c) if c.is_ascii_digit() => match self.parse_number()? {
                    Value::Number(n) => n.to_string(),
                    _ => return Err(self.error("invalid numeric key")),
                },
                _ => return Err(self.error("expected object key")),
            };

            self.skip_trivia()?;
            if self.peek() != Some(':') {
                return Err(self.error("expected `:` after object key"));
            }
            self.pos += 1;
            let value = self.parse_value()?;
            map.insert(key, value);

            self.skip_trivia()?;
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {}
                _ => return Err(self.error("expected `,` or `}` in object")),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Value, LiteralError> {
        // consume '['
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            match self.peek() {
                Some(']') => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                None => return Err(self.error("unterminated array")),
                _ => {}
            }
            items.push(self.parse_value()?);
            self.skip_trivia()?;
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {}
                _ => return Err(self.error("expected `,` or `]` in array")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, LiteralError> {
        let quote = self.peek().ok_or_else(|| self.error("expected string"))?;
        let start = self.pos;
        self.pos += 1;
        let mut body = String::new();
        loop {
            match self.peek() {
                None => {
                    self.pos = start;
                    return Err(self.error("unterminated string"));
                }
                Some('\\') => {
                    body.push('\\');
                    self.pos += 1;
                    if let Some(c) = self.peek() {
                        body.push(c);
                        self.pos += 1;
                    }
                }
                Some('$') if quote == '`' && self.peek_at(1) == Some('{') => {
                    return Err(self.error("template substitutions are not literals"));
                }
                Some('\n') if quote != '`' => {
                    return Err(self.error("newline in string literal"));
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(unescape(&body));
                }
                Some(c) => {
                    body.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_number(&mut self) -> Result<Value, LiteralError> {
        let start = self.offset();
        let mut text = String::new();
        let mut negative = false;
        match self.peek() {
            Some('-') => {
                negative = true;
                self.pos += 1;
            }
            Some('+') => self.pos += 1,
            _ => {}
        }

        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            self.pos += 2;
            while let Some(c) = self.peek() {
                if c.is_ascii_hexdigit() || c == '_' {
                    if c != '_' {
                        text.push(c);
                    }
                    self.pos += 1;
                } else {
                    break;
                }
            }
            let value = i64::from_str_radix(&text, 16).map_err(|_| LiteralError {
                position: start,
                message: "invalid hexadecimal number".to_string(),
            })?;
            return Ok(Value::Number(Number::from(if negative { -value } else { value })));
        }

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || c == '_' {
                if c != '_' {
                    text.push(c);
                }
                self.pos += 1;
            } else if (c == '-' || c == '+') && text.ends_with(['e', 'E']) {
                text.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }

        let invalid = || LiteralError {
            position: start,
            message: format!("invalid number `{}`", text),
        };
        if text.is_empty() {
            return Err(invalid());
        }

        if !text.contains(['.', 'e', 'E']) {
            if let Ok(int) = text.parse::<i64>() {
                return Ok(Value::Number(Number::from(if negative { -int } else { int })));
            }
        }
        let float: f64 = text.parse().map_err(|_| invalid())?;
        let float = if negative { -float } else { float };
        Number::from_f64(float).map(Value::Number).ok_or_else(invalid)
    }

    fn parse_identifier(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if is_ident_part(c) {
                word.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        word
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse_literal("true").unwrap(), json!(true));
        assert_eq!(parse_literal("null").unwrap(), Value::Null);
        assert_eq!(parse_literal("undefined").unwrap(), Value::Null);
        assert_eq!(parse_literal("42").unwrap(), json!(42));
        assert_eq!(parse_literal("-1.5").unwrap(), json!(-1.5));
        assert_eq!(parse_literal("0x1F").unwrap(), json!(31));
        assert_eq!(parse_literal("'single'").unwrap(), json!("single"));
        assert_eq!(parse_literal("`tick`").unwrap(), json!("tick"));
    }

    #[test]
    fn test_parse_js_object_literal() {
        let value = parse_literal(
            "{ bearerAuth: [], 'x-key': \"a\\\"b\", 201: { description: 'Created', }, }",
        )
        .unwrap();
        assert_eq!(
            value,
            json!({
                "bearerAuth": [],
                "x-key": "a\"b",
                "201": { "description": "Created" }
            })
        );
    }

    #[test]
    fn test_parse_array_with_trailing_comma_and_semicolon() {
        assert_eq!(parse_literal("[\"Public\", 'Users',];").unwrap(), json!(["Public", "Users"]));
    }

    #[test]
    fn test_parse_with_comments() {
        let value = parse_literal(
            r#"{
                // base directory
                "baseUrl": ".", /* inline */
                "paths": { "common": ["../common/index.ts"] }
            }"#,
        )
        .unwrap();
        assert_eq!(value["baseUrl"], json!("."));
        assert_eq!(value["paths"]["common"][0], json!("../common/index.ts"));
    }

    #[test]
    fn test_rejects_code() {
        assert!(parse_literal("process.exit(1)").is_err());
        assert!(parse_literal("[1, 2] + 3").is_err());
        assert!(parse_literal("`${danger}`").is_err());
        assert!(parse_literal("{ a: foo }").is_err());
        assert!(parse_literal("").is_err());
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\nb"), "a\nb");
        assert_eq!(unescape(r"A\x42"), "AB");
        assert_eq!(unescape(r"\u{1F600}"), "\u{1F600}");
        assert_eq!(unescape(r"it\'s"), "it's");
    }
}
