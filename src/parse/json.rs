//! Parse the relaxed object notation used in timeline files.
//!
//! Timeline fragments are written in JSON5 style: keys may be unquoted, strings may use single
//! quotes, trailing commas are allowed and comments may appear anywhere whitespace may. The
//! result is a plain `serde_json::Value` because no location information is needed beyond the
//! offset of the first error.

use std::iter::Peekable;
use std::str::CharIndices;

use serde_json::{Map, Number, Value};

/// What went wrong, and the char offset into the fragment where it went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub offset: usize,
    pub msg: String,
}

impl ParseError {
    fn new<S: Into<String>>(offset: usize, msg: S) -> Self {
        ParseError { offset, msg: msg.into() }
    }
}

struct Parser<'a> {
    text: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

/// Parse one complete value. Anything other than whitespace and comments after the value is an
/// error.
pub fn parse_json5(text: &str) -> Result<Value, ParseError> {
    let mut parser = Parser { text, chars: text.char_indices().peekable() };
    let value = parser.value()?;
    parser.skip_blank()?;
    if let Some(&(offset, c)) = parser.chars.peek() {
        return Err(ParseError::new(offset, format!("unexpected `{c}` after value")));
    }
    Ok(value)
}

impl Parser<'_> {
    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.text.len(), |&(i, _)| i)
    }

    fn eof(&self) -> ParseError {
        ParseError::new(self.text.len(), "unexpected end of text")
    }

    /// Skip whitespace, `//` line comments and `/* */` block comments.
    fn skip_blank(&mut self) -> Result<(), ParseError> {
        while let Some(&(offset, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else if c == '/' {
                self.chars.next();
                match self.chars.next() {
                    Some((_, '/')) => {
                        for (_, c) in self.chars.by_ref() {
                            if c == '\n' {
                                break;
                            }
                        }
                    }
                    Some((_, '*')) => {
                        let mut prev = ' ';
                        loop {
                            match self.chars.next() {
                                Some((_, '/')) if prev == '*' => break,
                                Some((_, c)) => prev = c,
                                None => return Err(ParseError::new(offset, "unterminated comment")),
                            }
                        }
                    }
                    _ => return Err(ParseError::new(offset, "unexpected `/`")),
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        self.skip_blank()?;
        let Some(&(offset, c)) = self.chars.peek() else {
            return Err(self.eof());
        };
        match c {
            '{' => self.object(),
            '[' => self.array(),
            '"' | '\'' => self.string().map(Value::String),
            '-' | '+' | '.' | '0'..='9' => self.number(),
            c if is_ident_start(c) => {
                let word = self.identifier();
                match word.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" => Ok(Value::Null),
                    "Infinity" | "NaN" => Ok(Value::Null),
                    _ => Err(ParseError::new(offset, format!("unexpected word `{word}`"))),
                }
            }
            c => Err(ParseError::new(offset, format!("unexpected `{c}`"))),
        }
    }

    fn object(&mut self) -> Result<Value, ParseError> {
        self.chars.next();
        let mut map = Map::new();
        loop {
            self.skip_blank()?;
            let Some(&(offset, c)) = self.chars.peek() else {
                return Err(self.eof());
            };
            let key = match c {
                '}' => {
                    self.chars.next();
                    return Ok(Value::Object(map));
                }
                '"' | '\'' => self.string()?,
                c if is_ident_start(c) => self.identifier(),
                c => return Err(ParseError::new(offset, format!("expected key, found `{c}`"))),
            };
            self.skip_blank()?;
            match self.chars.next() {
                Some((_, ':')) => (),
                Some((offset, c)) => {
                    return Err(ParseError::new(offset, format!("expected `:`, found `{c}`")));
                }
                None => return Err(self.eof()),
            }
            let value = self.value()?;
            map.insert(key, value);
            if !self.separator('}')? {
                self.chars.next();
                return Ok(Value::Object(map));
            }
        }
    }

    fn array(&mut self) -> Result<Value, ParseError> {
        self.chars.next();
        let mut vec = Vec::new();
        loop {
            self.skip_blank()?;
            match self.chars.peek() {
                Some((_, ']')) => {
                    self.chars.next();
                    return Ok(Value::Array(vec));
                }
                Some(_) => (),
                None => return Err(self.eof()),
            }
            vec.push(self.value()?);
            if !self.separator(']')? {
                self.chars.next();
                return Ok(Value::Array(vec));
            }
        }
    }

    /// After a member: consume a comma and return true, or leave the closing bracket in place
    /// and return false.
    fn separator(&mut self, close: char) -> Result<bool, ParseError> {
        self.skip_blank()?;
        match self.chars.peek() {
            Some(&(_, ',')) => {
                self.chars.next();
                Ok(true)
            }
            Some(&(_, c)) if c == close => Ok(false),
            Some(&(offset, c)) => {
                Err(ParseError::new(offset, format!("expected `,` or `{close}`, found `{c}`")))
            }
            None => Err(self.eof()),
        }
    }

    fn string(&mut self) -> Result<String, ParseError> {
        let Some((start, quote)) = self.chars.next() else {
            return Err(self.eof());
        };
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some((_, c)) if c == quote => return Ok(s),
                Some((offset, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => s.push('\n'),
                    Some((_, 'r')) => s.push('\r'),
                    Some((_, 't')) => s.push('\t'),
                    Some((_, 'b')) => s.push('\u{8}'),
                    Some((_, 'f')) => s.push('\u{c}'),
                    Some((_, '0')) => s.push('\0'),
                    Some((_, 'u')) => s.push(self.unicode_escape(offset)?),
                    // line continuation
                    Some((_, '\n')) => (),
                    Some((_, c)) => s.push(c),
                    None => return Err(ParseError::new(start, "unterminated string")),
                },
                Some((offset, '\n')) => return Err(ParseError::new(offset, "newline in string")),
                Some((_, c)) => s.push(c),
                None => return Err(ParseError::new(start, "unterminated string")),
            }
        }
    }

    fn unicode_escape(&mut self, offset: usize) -> Result<char, ParseError> {
        let mut code = 0;
        for _ in 0..4 {
            let digit = self.chars.next().and_then(|(_, c)| c.to_digit(16));
            let Some(digit) = digit else {
                return Err(ParseError::new(offset, "bad unicode escape"));
            };
            code = code * 16 + digit;
        }
        Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    fn identifier(&mut self) -> String {
        let mut word = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if is_ident_start(c) || c.is_ascii_digit() {
                word.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        word
    }

    fn number(&mut self) -> Result<Value, ParseError> {
        let start = self.offset();
        let mut text = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.') {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        parse_number(&text)
            .ok_or_else(|| ParseError::new(start, format!("invalid number `{text}`")))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn parse_number(text: &str) -> Option<Value> {
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    if digits == "Infinity" || digits == "NaN" {
        return Some(Value::Null);
    }
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        let n = i64::from_str_radix(hex, 16).ok()?;
        return Some(Value::from(if negative { -n } else { n }));
    }
    if !digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if let Ok(n) = digits.parse::<i64>() {
        return Some(Value::from(if negative { -n } else { n }));
    }
    let f = digits.parse::<f64>().ok()?;
    Number::from_f64(if negative { -f } else { f }).map(Value::Number)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_relaxed_object() {
        let text =
            "{ id: 'P4S Hell\\'s Sting', source: \"Hesperos\", window: [10, 2.5,], // comment\n }";
        let value = parse_json5(text).unwrap();
        let expected = json!({"id": "P4S Hell's Sting", "source": "Hesperos", "window": [10, 2.5]});
        assert_eq!(value, expected);
    }

    #[test]
    fn test_nested_and_comments() {
        let text = "/* lead */ { a: { b: [true, false, null] }, 'c': -0x10, d: +.5 }";
        let value = parse_json5(text).unwrap();
        assert_eq!(value, json!({"a": {"b": [true, false, null]}, "c": -16, "d": 0.5}));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_json5("{ source: }").unwrap_err().offset, 10);
        assert!(parse_json5("{ source: 'x' ").is_err());
        assert!(parse_json5("{ 'a' 1 }").is_err());
        assert!(parse_json5("{} trailing").is_err());
        assert!(parse_json5("'unterminated").is_err());
    }
}
