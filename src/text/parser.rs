//! Recursive descent parser building a [`DynamicMessage`] from text format tokens.

use std::sync::Arc;

use bytes::Bytes;
use protomon_reflect::codec::encode_message;
use protomon_reflect::{
    Cardinality, DescriptorPool, DynamicMessage, FieldDescriptor, Kind, MapKey,
    MessageDescriptor, Value,
};

use super::error::{ParseError, ParseErrorKind, Position};
use super::lexer::{Lexer, Token, TokenKind};
use super::DecodeLimits;

const ANY_TYPE: &str = "google.protobuf.Any";

/// The delimiter that ends the message body currently being parsed.
struct Close<'f> {
    byte: u8,
    field: &'f str,
    open_line: usize,
}

pub(super) struct Parser<'a> {
    lexer: Lexer<'a>,
    pool: &'a DescriptorPool,
    limits: &'a DecodeLimits,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub(super) fn new(input: &'a [u8], pool: &'a DescriptorPool, limits: &'a DecodeLimits) -> Self {
        Self {
            lexer: Lexer::new(input),
            pool,
            limits,
            depth: 0,
        }
    }

    /// Parse the whole input as the body of one `descriptor` message.
    pub(super) fn parse_document(
        mut self,
        descriptor: &Arc<MessageDescriptor>,
    ) -> Result<DynamicMessage, ParseError> {
        let mut message = DynamicMessage::new(Arc::clone(descriptor));
        self.parse_fields(&mut message, None)?;
        Ok(message)
    }

    fn parse_fields(
        &mut self,
        message: &mut DynamicMessage,
        close: Option<Close<'_>>,
    ) -> Result<(), ParseError> {
        loop {
            let token = self.lexer.next_token()?;
            match token.kind {
                TokenKind::Eof => {
                    return match close {
                        None => Ok(()),
                        Some(close) => Err(ParseError::new(
                            ParseErrorKind::UnterminatedBody {
                                field: close.field.to_string(),
                                open_line: close.open_line,
                                close: close.byte as char,
                            },
                            token.position,
                        )),
                    };
                }
                TokenKind::Punct(c) if close.as_ref().is_some_and(|close| close.byte == c) => {
                    return Ok(());
                }
                TokenKind::Punct(b'[') => self.parse_extension(message, token.position)?,
                TokenKind::Ident(ref name) => self.parse_field(message, name, token.position)?,
                _ => return Err(unexpected("field name", &token)),
            }
            if !self.lexer.eat(b',')? {
                self.lexer.eat(b';')?;
            }
        }
    }

    fn parse_field(
        &mut self,
        message: &mut DynamicMessage,
        name: &str,
        position: Position,
    ) -> Result<(), ParseError> {
        let descriptor = Arc::clone(message.descriptor());
        let field = descriptor.get_field_by_name(name).ok_or_else(|| {
            ParseError::new(
                ParseErrorKind::UnknownField {
                    message: descriptor.full_name().to_string(),
                    field: name.to_string(),
                },
                position,
            )
        })?;
        check_presence(message, &descriptor, field, position)?;

        if field.kind() == Kind::Message {
            // The colon is optional before a message value.
            self.lexer.eat(b':')?;
            if field.cardinality() != Cardinality::Singular && self.lexer.eat(b'[')? {
                if !self.lexer.eat(b']')? {
                    loop {
                        self.parse_message_value(message, field)?;
                        if self.lexer.eat(b']')? {
                            break;
                        }
                        self.lexer.expect(b',')?;
                    }
                }
                return Ok(());
            }
            return self.parse_message_value(message, field);
        }

        self.lexer.expect(b':')?;
        if field.is_list() && self.lexer.eat(b'[')? {
            if self.lexer.eat(b']')? {
                return Ok(());
            }
            loop {
                let position = self.lexer.peek()?.position;
                let value = self.parse_scalar(field)?;
                message.push_value(field, value).map_err(schema_error(position))?;
                if self.lexer.eat(b']')? {
                    return Ok(());
                }
                self.lexer.expect(b',')?;
            }
        }

        let position = self.lexer.peek()?.position;
        let value = self.parse_scalar(field)?;
        let stored = if field.is_list() {
            message.push_value(field, value)
        } else {
            message.set_field(field, value)
        };
        stored.map_err(schema_error(position))
    }

    /// Parse one `{ ... }` value of a message, repeated message or map field.
    fn parse_message_value(
        &mut self,
        message: &mut DynamicMessage,
        field: &FieldDescriptor,
    ) -> Result<(), ParseError> {
        let type_name = field.type_name().unwrap_or_default();
        let position = self.lexer.peek()?.position;
        let descriptor = self
            .pool
            .expect_message(type_name)
            .map_err(schema_error(position))?;
        let nested = self.parse_body(descriptor, field.name())?;

        let stored = match field.cardinality() {
            Cardinality::Singular => message.set_field(field, Value::Message(nested)),
            Cardinality::Repeated => message.push_value(field, Value::Message(nested)),
            Cardinality::Map => {
                let (key, value) = self.map_entry(field, nested, position)?;
                message.insert_map_entry(field, key, value).map(|_| ())
            }
        };
        stored.map_err(schema_error(position))
    }

    /// Parse a delimited message body, `{ ... }` or `< ... >`.
    fn parse_body(
        &mut self,
        descriptor: Arc<MessageDescriptor>,
        field: &str,
    ) -> Result<DynamicMessage, ParseError> {
        let open = self.lexer.next_token()?;
        let close = match open.kind {
            TokenKind::Punct(b'{') => b'}',
            TokenKind::Punct(b'<') => b'>',
            _ => return Err(unexpected("'{' or '<'", &open)),
        };

        self.depth += 1;
        if self.depth > self.limits.max_depth {
            return Err(ParseError::new(
                ParseErrorKind::NestingTooDeep(self.limits.max_depth),
                open.position,
            ));
        }
        let mut nested = DynamicMessage::new(descriptor);
        self.parse_fields(
            &mut nested,
            Some(Close {
                byte: close,
                field,
                open_line: open.position.line,
            }),
        )?;
        self.depth -= 1;
        Ok(nested)
    }

    /// Collapse a parsed `{ key: ... value: ... }` entry into a map key and value.
    fn map_entry(
        &self,
        field: &FieldDescriptor,
        entry: DynamicMessage,
        position: Position,
    ) -> Result<(MapKey, Value), ParseError> {
        let info = field.map_entry().ok_or_else(|| {
            ParseError::new(
                ParseErrorKind::Schema(protomon_reflect::Error::InvalidMapEntry(
                    field.full_name().to_string(),
                )),
                position,
            )
        })?;
        let key = match entry.get_field(&info.key) {
            Some(key) => MapKey::from_value(key.clone()),
            None => MapKey::default_for_kind(info.key.kind()),
        };
        let key = key.ok_or_else(|| {
            ParseError::new(
                ParseErrorKind::Schema(protomon_reflect::Error::InvalidMapEntry(
                    field.full_name().to_string(),
                )),
                position,
            )
        })?;
        let value = match entry.get_field(&info.value) {
            Some(value) => value.clone(),
            None => Value::default_for_kind(info.value.kind(), info.value.type_name(), self.pool)
                .map_err(schema_error(position))?,
        };
        Ok((key, value))
    }

    /// `[type.googleapis.com/pkg.Msg] { ... }` inside a `google.protobuf.Any`.
    fn parse_extension(
        &mut self,
        message: &mut DynamicMessage,
        open: Position,
    ) -> Result<(), ParseError> {
        let name = self.parse_bracketed_name()?;
        let descriptor = Arc::clone(message.descriptor());
        if descriptor.full_name() != ANY_TYPE || !name.contains('/') {
            return Err(ParseError::new(ParseErrorKind::UnsupportedExtension(name), open));
        }
        if !message.is_empty() {
            return Err(ParseError::new(
                ParseErrorKind::DuplicateField("type_url".to_string()),
                open,
            ));
        }

        let type_name = name.rsplit('/').next().unwrap_or_default();
        let payload_type = self.pool.get_message(type_name).ok_or_else(|| {
            ParseError::new(ParseErrorKind::UnknownAnyType(name.clone()), open)
        })?;
        self.lexer.eat(b':')?;
        let payload = self.parse_body(payload_type, &name)?;

        let value = Bytes::from(encode_message(&payload));
        message
            .set_field_by_name("type_url", Value::String(name))
            .and_then(|()| message.set_field_by_name("value", Value::Bytes(value)))
            .map_err(schema_error(open))
    }

    /// The name between `[` and `]`, with the opening bracket already consumed.
    fn parse_bracketed_name(&mut self) -> Result<String, ParseError> {
        let mut name = String::new();
        loop {
            let token = self.lexer.next_token()?;
            match &token.kind {
                TokenKind::Ident(part) => name.push_str(part),
                TokenKind::Punct(c @ (b'.' | b'/')) => name.push(*c as char),
                TokenKind::Punct(b']') if !name.is_empty() => return Ok(name),
                _ => return Err(unexpected("type name", &token)),
            }
        }
    }

    fn parse_scalar(&mut self, field: &FieldDescriptor) -> Result<Value, ParseError> {
        match field.kind() {
            Kind::String | Kind::Bytes => self.parse_string(field),
            Kind::Bool => self.parse_bool(),
            Kind::Float | Kind::Double => self.parse_float(field.kind()),
            Kind::Enum => self.parse_enum(field),
            Kind::Message => {
                let token = self.lexer.next_token()?;
                Err(unexpected("'{'", &token))
            }
            kind => self.parse_integer(kind),
        }
    }

    fn parse_string(&mut self, field: &FieldDescriptor) -> Result<Value, ParseError> {
        let token = self.lexer.next_token()?;
        let TokenKind::String(mut bytes) = token.kind else {
            return Err(unexpected("string literal", &token));
        };
        // Adjacent literals concatenate.
        while matches!(self.lexer.peek()?.kind, TokenKind::String(_)) {
            if let TokenKind::String(more) = self.lexer.next_token()?.kind {
                bytes.extend(more);
            }
        }

        if field.kind() == Kind::Bytes {
            return Ok(Value::Bytes(Bytes::from(bytes)));
        }
        String::from_utf8(bytes).map(Value::String).map_err(|_| {
            ParseError::new(
                ParseErrorKind::InvalidUtf8(field.name().to_string()),
                token.position,
            )
        })
    }

    fn parse_bool(&mut self) -> Result<Value, ParseError> {
        let token = self.lexer.next_token()?;
        let text = match &token.kind {
            TokenKind::Ident(text) | TokenKind::Number(text) => text.as_str(),
            _ => return Err(unexpected("boolean", &token)),
        };
        match text {
            "true" | "True" | "t" | "1" => Ok(Value::Bool(true)),
            "false" | "False" | "f" | "0" => Ok(Value::Bool(false)),
            _ => Err(invalid_literal("bool", text, token.position)),
        }
    }

    /// A `-` token, if present, followed by the literal it negates.
    fn signed_token(&mut self) -> Result<(bool, Token), ParseError> {
        let negative = self.lexer.eat(b'-')?;
        Ok((negative, self.lexer.next_token()?))
    }

    fn parse_float(&mut self, kind: Kind) -> Result<Value, ParseError> {
        let (negative, token) = self.signed_token()?;
        let value = match &token.kind {
            TokenKind::Ident(name) => match name.to_ascii_lowercase().as_str() {
                "inf" | "infinity" => f64::INFINITY,
                "nan" => f64::NAN,
                _ => return Err(invalid_literal(kind.name(), name, token.position)),
            },
            TokenKind::Number(text) => parse_float_literal(text)
                .ok_or_else(|| invalid_literal(kind.name(), text, token.position))?,
            _ => return Err(unexpected("number", &token)),
        };
        let value = if negative { -value } else { value };
        Ok(match kind {
            Kind::Float => Value::F32(value as f32),
            _ => Value::F64(value),
        })
    }

    fn parse_integer(&mut self, kind: Kind) -> Result<Value, ParseError> {
        let (negative, token) = self.signed_token()?;
        let TokenKind::Number(text) = &token.kind else {
            return Err(unexpected("integer", &token));
        };
        let magnitude = parse_int_literal(text, kind.name(), token.position)?;
        integer_value(kind, negative, magnitude).ok_or_else(|| {
            let text = if negative { format!("-{text}") } else { text.clone() };
            ParseError::new(
                ParseErrorKind::IntegerOutOfRange {
                    kind: kind.name(),
                    text,
                },
                token.position,
            )
        })
    }

    fn parse_enum(&mut self, field: &FieldDescriptor) -> Result<Value, ParseError> {
        let position = self.lexer.peek()?.position;
        let enum_name = field.type_name().unwrap_or_default();
        let enum_type = self.pool.get_enum(enum_name).ok_or_else(|| {
            ParseError::new(
                ParseErrorKind::Schema(protomon_reflect::Error::UnresolvedType {
                    field: field.full_name().to_string(),
                    type_name: enum_name.to_string(),
                }),
                position,
            )
        })?;
        let unknown = |value: String| {
            ParseError::new(
                ParseErrorKind::UnknownEnumValue {
                    enum_name: enum_type.full_name().to_string(),
                    value,
                },
                position,
            )
        };

        let ident = match &self.lexer.peek()?.kind {
            TokenKind::Ident(name) => Some(name.clone()),
            _ => None,
        };
        if let Some(name) = ident {
            let number = enum_type
                .get_value_by_name(&name)
                .map(|value| value.number())
                .ok_or_else(|| unknown(name))?;
            self.lexer.next_token()?;
            return Ok(Value::EnumNumber(number));
        }

        let Value::I32(number) = self.parse_integer(Kind::Int32)? else {
            return Err(unknown(String::new()));
        };
        if enum_type.is_closed() && enum_type.get_value(number).is_none() {
            return Err(unknown(number.to_string()));
        }
        Ok(Value::EnumNumber(number))
    }
}

/// Reject a second value for a singular field or a second member of a oneof.
fn check_presence(
    message: &DynamicMessage,
    descriptor: &MessageDescriptor,
    field: &FieldDescriptor,
    position: Position,
) -> Result<(), ParseError> {
    if field.cardinality() == Cardinality::Singular && message.has_field(field) {
        return Err(ParseError::new(
            ParseErrorKind::DuplicateField(field.name().to_string()),
            position,
        ));
    }
    if let Some(oneof) = descriptor.real_oneof_of(field) {
        if let Some(previous) = message.oneof_case(oneof) {
            if previous.number() != field.number() {
                return Err(ParseError::new(
                    ParseErrorKind::OneofAlreadySet {
                        oneof: oneof.name().to_string(),
                        field: field.name().to_string(),
                        previous: previous.name().to_string(),
                    },
                    position,
                ));
            }
        }
    }
    Ok(())
}

/// Parse an unsigned integer literal: `0x` hex, leading-zero octal or decimal.
fn parse_int_literal(text: &str, kind: &'static str, position: Position) -> Result<u64, ParseError> {
    let (digits, radix) = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(invalid_literal(kind, text, position));
    }
    u64::from_str_radix(digits, radix).map_err(|_| {
        ParseError::new(
            ParseErrorKind::IntegerOutOfRange {
                kind,
                text: text.to_string(),
            },
            position,
        )
    })
}

fn parse_float_literal(text: &str) -> Option<f64> {
    if text.starts_with("0x") || text.starts_with("0X") {
        return u64::from_str_radix(&text[2..], 16).ok().map(|v| v as f64);
    }
    let text = text
        .strip_suffix('f')
        .or_else(|| text.strip_suffix('F'))
        .unwrap_or(text);
    text.parse().ok()
}

/// Range-check an integer literal against the width and signedness of `kind`.
fn integer_value(kind: Kind, negative: bool, magnitude: u64) -> Option<Value> {
    let signed = if negative {
        -i128::from(magnitude)
    } else {
        i128::from(magnitude)
    };
    match kind {
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => i32::try_from(signed).ok().map(Value::I32),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => i64::try_from(signed).ok().map(Value::I64),
        Kind::Uint32 | Kind::Fixed32 => u32::try_from(signed).ok().map(Value::U32),
        Kind::Uint64 | Kind::Fixed64 => u64::try_from(signed).ok().map(Value::U64),
        _ => None,
    }
}

fn unexpected(expected: &str, token: &Token) -> ParseError {
    ParseError::new(
        ParseErrorKind::UnexpectedToken {
            expected: expected.to_string(),
            found: token.kind.to_string(),
        },
        token.position,
    )
}

fn invalid_literal(kind: &'static str, text: &str, position: Position) -> ParseError {
    ParseError::new(
        ParseErrorKind::InvalidLiteral {
            kind,
            text: text.to_string(),
        },
        position,
    )
}

fn schema_error(position: Position) -> impl FnOnce(protomon_reflect::Error) -> ParseError {
    move |err| ParseError::new(ParseErrorKind::Schema(err), position)
}
