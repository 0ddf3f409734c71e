//! Errors shared by the serializer and the parser

use core::fmt;

use serde::{de, ser};

/// Conversion result
pub type Result<T> = core::result::Result<T, Error>;

/// The three kinds of failure a conversion can run into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The JSON text is malformed, or the value graph nests too deeply.
    Structural,
    /// The text is well-formed but cannot be bound to the requested type.
    TypeBinding,
    /// A member of a record could not be read while serializing.
    Access,
}

/// This type represents all possible errors that can occur when converting to or from JSON
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// EOF while parsing a list.
    #[error("EOF while parsing a list")]
    EofWhileParsingList,

    /// EOF while parsing an object.
    #[error("EOF while parsing an object")]
    EofWhileParsingObject,

    /// EOF while parsing a string.
    #[error("EOF while parsing a string")]
    EofWhileParsingString,

    /// EOF while parsing a JSON value.
    #[error("EOF while parsing a JSON value")]
    EofWhileParsingValue,

    /// Expected this character to be a `':'`.
    #[error("expected `:`")]
    ExpectedColon,

    /// Expected this character to be either a `','` or a `']'`.
    #[error("expected `,` or `]`")]
    ExpectedListCommaOrEnd,

    /// Expected this character to be either a `','` or a `'}'`.
    #[error("expected `,` or `}}`")]
    ExpectedObjectCommaOrEnd,

    /// Expected to parse either a `true`, `false`, or a `null`.
    #[error("expected `true`, `false` or `null`")]
    ExpectedSomeIdent,

    /// Expected this character to start a JSON value.
    #[error("expected a JSON value")]
    ExpectedSomeValue,

    /// Expected a string, such as an object member name.
    #[error("expected a string")]
    ExpectedString,

    /// Invalid escape sequence inside a string.
    #[error("invalid escape sequence")]
    InvalidEscape,

    /// Invalid unicode code point.
    #[error("invalid unicode code point")]
    InvalidUnicodeCodePoint,

    /// A raw control character appeared inside a string (strict policy only).
    #[error("control character inside a string")]
    ControlCharacterInString,

    /// JSON has non-whitespace trailing characters after the value.
    #[error("trailing characters after the JSON value")]
    TrailingCharacters,

    /// JSON has a comma after the last value in an array or map (strict policy only).
    #[error("trailing comma")]
    TrailingComma,

    /// The value nests deeper than the configured limit.
    #[error("recursion limit exceeded")]
    RecursionLimitExceeded,

    /// Invalid number for the requested numeric type.
    #[error("invalid number")]
    InvalidNumber,

    /// The JSON value does not have the shape the target type expects.
    #[error("invalid type")]
    InvalidType,

    /// An object member the target record does not declare (strict policy only).
    #[error("unknown field `{0}`")]
    UnknownField(String),

    /// Map keys must serialize as strings.
    #[error("object key must be a string")]
    KeyMustBeAString,

    /// NaN or an infinity was serialized under the strict policy.
    #[error("non-finite float")]
    NonFiniteFloat,

    /// A record member could not be read while serializing.
    #[error("member cannot be read: {0}")]
    Access(String),

    /// Any other error reported by a type's `Deserialize` implementation.
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Which of the three failure kinds this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidNumber
            | Error::InvalidType
            | Error::UnknownField(_)
            | Error::KeyMustBeAString
            | Error::NonFiniteFloat
            | Error::Custom(_) => ErrorCategory::TypeBinding,
            Error::Access(_) => ErrorCategory::Access,
            _ => ErrorCategory::Structural,
        }
    }
}

impl ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Error::Access(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Error::Custom(msg.to_string())
    }

    fn unknown_field(field: &str, _expected: &'static [&'static str]) -> Self {
        Error::UnknownField(field.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorCategory};

    #[test]
    fn categories() {
        assert_eq!(Error::TrailingComma.category(), ErrorCategory::Structural);
        assert_eq!(
            Error::RecursionLimitExceeded.category(),
            ErrorCategory::Structural
        );
        assert_eq!(Error::InvalidNumber.category(), ErrorCategory::TypeBinding);
        assert_eq!(
            Error::Custom("missing field `id`".into()).category(),
            ErrorCategory::TypeBinding
        );
        assert_eq!(
            Error::Access("already mutably borrowed".into()).category(),
            ErrorCategory::Access
        );
    }

    #[test]
    fn display() {
        assert_eq!(
            Error::UnknownField("mystery".into()).to_string(),
            "unknown field `mystery`"
        );
        assert_eq!(Error::ExpectedObjectCommaOrEnd.to_string(), "expected `,` or `}`");
    }
}
