//! Error types for descwire marshalling

use thiserror::Error;

/// descwire error types
#[derive(Debug, Error)]
pub enum WireError {
    /// Value is not a supported array container.
    #[error("Invalid array object: {0}")]
    InvalidArrayObject(String),
    /// Computed array depth is zero.
    #[error("Invalid array dimension")]
    InvalidDimension,
    /// Declared dimension count differs from the nesting depth of the value.
    #[error(
        "Dimension count declared in IDL ({declared}) is inconsistent with actual dimension count of the array ({actual})"
    )]
    DimensionCountMismatch {
        /// Dimension count taken from the declaration.
        declared: usize,
        /// Depth computed from the value.
        actual: usize,
    },
    /// Declared bounds string differs from the rendered bounds of the value.
    #[error("Bounds of passed in array ({actual}) are inconsistent with those specified in IDL ({declared})")]
    DimensionBoundsMismatch {
        /// Bounds text taken from the declaration.
        declared: String,
        /// Bounds rendered from the value.
        actual: String,
    },
    /// Declared dimension text could not be interpreted.
    #[error("Invalid declared dimensions: {0:?}")]
    InvalidDeclaredDimensions(String),
    /// Integer does not fit the legal interval of its wire type.
    #[error("Integer {value} out of range for wire type {type_code}")]
    IntegerRangeError {
        /// Offending value.
        value: i128,
        /// Name of the wire type code.
        type_code: &'static str,
    },
    /// Leaf element has no mapping to the configured wire type.
    #[error("Unsupported element type {found} for wire type {type_code}")]
    UnsupportedElementType {
        /// Name of the wire type code.
        type_code: &'static str,
        /// Name of the element kind that was found.
        found: &'static str,
    },
    /// Unknown wire type code byte.
    #[error("Unknown wire type code: {0}")]
    UnknownTypeCode(u8),
    /// Unknown wire class code byte.
    #[error("Unknown wire class code: {0}")]
    UnknownClassCode(u8),
    /// Encountered unexpected end of input.
    #[error("Unexpected end of buffer")]
    UnexpectedEof,
    /// String cannot be represented in the 8-bit wire character set.
    #[error("Invalid string: {0}")]
    InvalidString(String),
    /// Decimal text or wire image is malformed.
    #[error("Invalid decimal: {0}")]
    InvalidDecimal(String),
    /// Decimal does not fit the declared precision and scale.
    #[error("Decimal overflow: {0}")]
    DecimalOverflow(String),
    /// Operation needs an array header that has not been written or read.
    #[error("No array header in progress")]
    MissingArrayHeader,
    /// A configured limit was exceeded.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
    /// JSON configuration could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Internal invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, WireError>;
