/// A record could not be rendered as JSON.
///
/// `path` locates the offending value from the document root, for example
/// `test[0].bindings["x"].value`.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("{path}: expected {expected}, found {found}")]
    SchemaMismatch {
        path: String,
        expected: String,
        found: &'static str,
    },
    #[error("{path}: {number} is not a value of enum {enum_name}")]
    UnknownEnumValue {
        path: String,
        enum_name: String,
        number: i32,
    },
    #[error("{path}: invalid {type_name}: {reason}")]
    InvalidWellKnown {
        path: String,
        type_name: &'static str,
        reason: String,
    },
    #[error("{path}: Any type '{type_url}' is not in the schema")]
    UnknownAnyType { path: String, type_url: String },
    #[error("{path}: malformed Any payload")]
    Wire {
        path: String,
        #[source]
        source: protomon_reflect::Error,
    },
    #[error("failed to format JSON")]
    Format(#[from] serde_json::Error),
}
