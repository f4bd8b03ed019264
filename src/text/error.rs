use std::fmt;

/// A location in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset from the start of the input.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in bytes.
    pub column: usize,
}

impl Position {
    pub(crate) fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {} (byte {})", self.line, self.column, self.offset)
    }
}

/// A text format document could not be decoded.
///
/// Decoding stops at the first error; no partially decoded message is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} at line {line}, column {column} (byte {offset})")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, position: Position) -> Self {
        Self {
            kind,
            offset: position.offset,
            line: position.line,
            column: position.column,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("unexpected character {0:?}")]
    UnexpectedCharacter(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated body of '{field}' opened on line {open_line}, expected '{close}'")]
    UnterminatedBody {
        field: String,
        open_line: usize,
        close: char,
    },
    #[error("invalid escape sequence '{0}'")]
    InvalidEscape(String),
    #[error("invalid {kind} literal '{text}'")]
    InvalidLiteral { kind: &'static str, text: String },
    #[error("integer '{text}' is out of range for {kind}")]
    IntegerOutOfRange { kind: &'static str, text: String },
    #[error("message '{message}' has no field named '{field}'")]
    UnknownField { message: String, field: String },
    #[error("enum '{enum_name}' has no value '{value}'")]
    UnknownEnumValue { enum_name: String, value: String },
    #[error("non-repeated field '{0}' is set more than once")]
    DuplicateField(String),
    #[error("field '{field}' conflicts with '{previous}', already set in oneof '{oneof}'")]
    OneofAlreadySet {
        oneof: String,
        field: String,
        previous: String,
    },
    #[error("string field '{0}' is not valid UTF-8")]
    InvalidUtf8(String),
    #[error("Any type '{0}' is not in the schema")]
    UnknownAnyType(String),
    #[error("extension '[{0}]' is not supported")]
    UnsupportedExtension(String),
    #[error("input is {size} bytes, larger than the {limit} byte limit")]
    InputTooLarge { size: usize, limit: usize },
    #[error("messages nested deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error(transparent)]
    Schema(#[from] protomon_reflect::Error),
}
