//! Error types for datum decoding.

use thiserror::Error;

/// Malformed CBOR on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CborError {
    #[error("Unexpected end of input at offset {0}")]
    UnexpectedEof(usize),

    #[error("Trailing bytes after item: {0}")]
    TrailingBytes(usize),

    #[error("Invalid additional info {0} for major type {1}")]
    InvalidAdditionalInfo(u8, u8),

    #[error("Unsupported major type {0}")]
    UnsupportedMajorType(u8),

    #[error("Unsupported tag {0}")]
    UnsupportedTag(u64),

    #[error("Invalid chunk in indefinite-length byte string")]
    InvalidChunk,

    #[error("Length {0} exceeds remaining input")]
    LengthOverflow(u64),

    #[error("Integer does not fit in 128 bits")]
    IntegerOverflow,

    #[error("Nesting deeper than {0} levels")]
    NestingTooDeep(usize),

    #[error("Constructor fields must be a list")]
    ConstrFieldsNotList,
}

/// Errors that can occur while decoding an auction record or redeemer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Expected {expected} fields, found {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("Field `{field}` has wrong type: expected {expected}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Unknown status tag {0}")]
    UnknownStatusTag(u64),

    #[error("Unknown redeemer tag {0}")]
    UnknownRedeemerTag(u64),

    #[error("Unexpected constructor: expected {expected}, found {found}")]
    UnexpectedConstructor { expected: u64, found: u64 },

    #[error("Field `{field}` has length {found}, expected {expected}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Field `{field}` is out of range")]
    IntegerOutOfRange { field: &'static str },

    #[error("Malformed CBOR: {0}")]
    Cbor(#[from] CborError),
}
