/// Errors raised while encoding or decoding realm values.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// No registered type describes the value.
    #[error("don't know how to encode {0}")]
    UnsupportedType(String),

    /// A function appeared where live references are not allowed
    /// (call arguments and return values).
    #[error("cannot encode functions outside of exports")]
    FunctionOutsideExports,

    /// The payload names a type the registry does not know.
    #[error("don't know how to decode type {0:?}")]
    UnknownType(String),

    /// The payload does not have the shape its type requires.
    #[error("malformed {type_name} payload: {reason}")]
    Malformed { type_name: String, reason: String },

    /// A descriptor was handed a value its predicate should have rejected.
    #[error("type {descriptor} cannot encode a {actual} value")]
    TypeMismatch {
        descriptor: String,
        actual: &'static str,
    },

    /// A back-reference points at a value that has not been decoded yet.
    #[error("reference {0} does not name an earlier value")]
    DanglingReference(u64),

    /// A composite contains itself.
    #[error("value contains itself")]
    Cycle,

    /// A custom conversion kept producing further custom values.
    #[error("custom conversion did not settle after {0} steps")]
    ConversionLimit(usize),

    /// The registry definition is inconsistent.
    #[error("invalid type registry: {0}")]
    InvalidRegistry(String),

    /// Context wrapper for a failed top-level encode.
    #[error("exception while encoding {value}: {source}")]
    Encode {
        value: String,
        #[source]
        source: Box<CodecError>,
    },
}

impl CodecError {
    /// The innermost error, skipping context wrappers.
    pub fn root(&self) -> &CodecError {
        match self {
            CodecError::Encode { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn malformed(type_name: &str, reason: impl Into<String>) -> Self {
        CodecError::Malformed {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
