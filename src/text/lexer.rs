//! Tokenizer for the protobuf text format.

use std::fmt;

use super::error::{ParseError, ParseErrorKind, Position};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `[A-Za-z_][A-Za-z0-9_]*`
    Ident(String),
    /// A quoted string with escapes already resolved. Not necessarily UTF-8.
    String(Vec<u8>),
    /// The raw text of an unsigned numeric literal; a leading `-` is a separate token.
    Number(String),
    Punct(u8),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "identifier '{name}'"),
            TokenKind::String(_) => f.write_str("string literal"),
            TokenKind::Number(text) => write!(f, "number '{text}'"),
            TokenKind::Punct(c) => write!(f, "'{}'", *c as char),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

pub struct Lexer<'a> {
    input: &'a [u8],
    position: Position,
    peeked: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            position: Position::start(),
            peeked: None,
        }
    }

    /// Look at the next token without consuming it.
    pub fn peek(&mut self) -> Result<&Token, ParseError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.lex()?,
        };
        Ok(self.peeked.insert(token))
    }

    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.lex(),
        }
    }

    /// Consume the next token if it is the punctuation `c`.
    pub fn eat(&mut self, c: u8) -> Result<bool, ParseError> {
        if self.peek()?.kind == TokenKind::Punct(c) {
            self.next_token()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Consume the punctuation `c` or fail.
    pub fn expect(&mut self, c: u8) -> Result<Position, ParseError> {
        let token = self.next_token()?;
        if token.kind == TokenKind::Punct(c) {
            Ok(token.position)
        } else {
            Err(ParseError::new(
                ParseErrorKind::UnexpectedToken {
                    expected: format!("'{}'", c as char),
                    found: token.kind.to_string(),
                },
                token.position,
            ))
        }
    }

    fn current(&self) -> Option<u8> {
        self.input.get(self.position.offset).copied()
    }

    fn lookahead(&self, n: usize) -> Option<u8> {
        self.input.get(self.position.offset + n).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.current()?;
        self.position.offset += 1;
        if byte == b'\n' {
            self.position.line += 1;
            self.position.column = 1;
        } else {
            self.position.column += 1;
        }
        Some(byte)
    }

    fn skip_trivia(&mut self) {
        while let Some(byte) = self.current() {
            match byte {
                b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => {
                    self.bump();
                }
                b'#' => {
                    while let Some(byte) = self.bump() {
                        if byte == b'\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn lex(&mut self) -> Result<Token, ParseError> {
        self.skip_trivia();
        let position = self.position;
        let kind = match self.current() {
            None => TokenKind::Eof,
            Some(b'"' | b'\'') => TokenKind::String(self.lex_string()?),
            Some(byte) if byte.is_ascii_alphabetic() || byte == b'_' => {
                TokenKind::Ident(self.take_while(|b| b.is_ascii_alphanumeric() || b == b'_'))
            }
            Some(byte)
                if byte.is_ascii_digit()
                    || (byte == b'.' && self.lookahead(1).is_some_and(|b| b.is_ascii_digit())) =>
            {
                TokenKind::Number(self.lex_number())
            }
            Some(byte @ (b'{' | b'}' | b'<' | b'>' | b'[' | b']' | b':' | b',' | b';' | b'/' | b'.' | b'-')) => {
                self.bump();
                TokenKind::Punct(byte)
            }
            Some(byte) => {
                let end = (position.offset + 4).min(self.input.len());
                let c = String::from_utf8_lossy(&self.input[position.offset..end])
                    .chars()
                    .next()
                    .unwrap_or(byte as char);
                return Err(ParseError::new(ParseErrorKind::UnexpectedCharacter(c), position));
            }
        };
        Ok(Token { kind, position })
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> String {
        let start = self.position.offset;
        while self.current().is_some_and(&pred) {
            self.bump();
        }
        String::from_utf8_lossy(&self.input[start..self.position.offset]).into_owned()
    }

    /// Numbers are lexed loosely and validated against the field type by the parser.
    fn lex_number(&mut self) -> String {
        let start = self.position.offset;
        let hex = self.current() == Some(b'0') && matches!(self.lookahead(1), Some(b'x' | b'X'));
        while let Some(byte) = self.current() {
            let exponent_sign = !hex
                && matches!(byte, b'+' | b'-')
                && matches!(self.input.get(self.position.offset - 1), Some(b'e' | b'E'));
            if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'.' || exponent_sign {
                self.bump();
            } else {
                break;
            }
        }
        String::from_utf8_lossy(&self.input[start..self.position.offset]).into_owned()
    }

    fn lex_string(&mut self) -> Result<Vec<u8>, ParseError> {
        let open = self.position;
        let Some(quote) = self.bump() else {
            return Err(ParseError::new(ParseErrorKind::UnterminatedString, open));
        };
        let mut out = Vec::new();
        loop {
            let escape_start = self.position;
            match self.bump() {
                None | Some(b'\n') => {
                    return Err(ParseError::new(ParseErrorKind::UnterminatedString, open));
                }
                Some(byte) if byte == quote => return Ok(out),
                Some(b'\\') => self.lex_escape(escape_start, &mut out)?,
                Some(byte) => out.push(byte),
            }
        }
    }

    fn lex_escape(&mut self, start: Position, out: &mut Vec<u8>) -> Result<(), ParseError> {
        let invalid = |lexer: &Self| {
            let end = lexer.position.offset.min(lexer.input.len());
            let text = String::from_utf8_lossy(&lexer.input[start.offset..end]).into_owned();
            ParseError::new(ParseErrorKind::InvalidEscape(text), start)
        };
        let Some(byte) = self.bump() else {
            return Err(invalid(self));
        };
        match byte {
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'v' => out.push(0x0b),
            b'\\' | b'\'' | b'"' | b'?' => out.push(byte),
            b'0'..=b'7' => {
                let mut value = u32::from(byte - b'0');
                for _ in 0..2 {
                    match self.current() {
                        Some(digit @ b'0'..=b'7') => {
                            self.bump();
                            value = value * 8 + u32::from(digit - b'0');
                        }
                        _ => break,
                    }
                }
                let value = u8::try_from(value).map_err(|_| invalid(self))?;
                out.push(value);
            }
            b'x' | b'X' => {
                let digits = self.hex_digits(2);
                if digits.is_empty() {
                    return Err(invalid(self));
                }
                let value = u8::from_str_radix(&digits, 16).map_err(|_| invalid(self))?;
                out.push(value);
            }
            b'u' | b'U' => {
                let width = if byte == b'u' { 4 } else { 8 };
                let digits = self.hex_digits(width);
                if digits.len() != width {
                    return Err(invalid(self));
                }
                let mut code = u32::from_str_radix(&digits, 16).map_err(|_| invalid(self))?;
                // A high surrogate must be followed by `\u` and a low surrogate.
                if byte == b'u' && (0xD800..0xDC00).contains(&code) {
                    if self.current() != Some(b'\\') || self.lookahead(1) != Some(b'u') {
                        return Err(invalid(self));
                    }
                    self.bump();
                    self.bump();
                    let low_digits = self.hex_digits(4);
                    let low = match u32::from_str_radix(&low_digits, 16) {
                        Ok(low) if low_digits.len() == 4 && (0xDC00..0xE000).contains(&low) => low,
                        _ => return Err(invalid(self)),
                    };
                    code = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                }
                let c = char::from_u32(code).ok_or_else(|| invalid(self))?;
                let mut utf8 = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            }
            _ => return Err(invalid(self)),
        }
        Ok(())
    }

    fn hex_digits(&mut self, max: usize) -> String {
        let mut digits = String::new();
        while digits.len() < max {
            match self.current() {
                Some(byte) if byte.is_ascii_hexdigit() => {
                    self.bump();
                    digits.push(byte as char);
                }
                _ => break,
            }
        }
        digits
    }
}
