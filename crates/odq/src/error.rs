use derive_more::Display;
use odq_core::{
    chain::QueryError,
    config::ConfigError,
    error::{ErrorClass, ErrorOrigin as CoreErrorOrigin, InternalError},
    eval::EvalError,
    literal::DecodeError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Debug, Deserialize, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        // internal failures keep their class in the message for diagnostics
        match err.class {
            ErrorClass::Unsupported => Self::new(
                ErrorKind::Query(QueryErrorKind::Unsupported),
                err.origin.into(),
                err.message,
            ),
            ErrorClass::InvariantViolation | ErrorClass::Internal => {
                Self::new(ErrorKind::Internal, err.origin.into(), err.display_with_class())
            }
        }
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Chain(_) | QueryError::UnknownOperator { .. } => Self::new(
                ErrorKind::Query(QueryErrorKind::Invalid),
                ErrorOrigin::Chain,
                err.to_string(),
            ),

            QueryError::NotSupported { .. } => Self::new(
                ErrorKind::Query(QueryErrorKind::Unsupported),
                ErrorOrigin::Compile,
                err.to_string(),
            ),

            QueryError::Internal(err) => err.into(),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorKind::Config, ErrorOrigin::Config, err.to_string())
    }
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        Self::new(ErrorKind::Decode, ErrorOrigin::Literal, err.to_string())
    }
}

impl From<EvalError> for Error {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::Compiled => Self::new(ErrorKind::Internal, ErrorOrigin::Eval, err.to_string()),
            _ => Self::new(ErrorKind::Evaluation, ErrorOrigin::Eval, err.to_string()),
        }
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    Query(QueryErrorKind),

    /// Configuration could not be read or failed validation.
    Config,

    /// A wire literal could not be decoded into a value.
    Decode,

    /// The local half of a split projection failed on a row.
    Evaluation,

    /// The caller cannot remediate this.
    Internal,
}

///
/// QueryErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum QueryErrorKind {
    /// Operator chain is malformed (order, arguments, unknown operators).
    Invalid,

    /// The chain is valid but uses a construct with no wire form.
    Unsupported,
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Chain,
    Compile,
    Config,
    Eval,
    Literal,
    Partition,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Chain => Self::Chain,
            CoreErrorOrigin::Compile => Self::Compile,
            CoreErrorOrigin::Config => Self::Config,
            CoreErrorOrigin::Eval => Self::Eval,
            CoreErrorOrigin::Literal => Self::Literal,
            CoreErrorOrigin::Partition => Self::Partition,
        }
    }
}

///
/// TESTS
///
