use thiserror::Error;

#[derive(Error, Debug)]
pub enum FactoryError {
    #[error("Invalid message data: {0}")]
    InvalidInput(String),

    #[error("Invalid factory configuration: {0}")]
    Config(String),
}

/// Failure raised while a decorator computes its field.
///
/// These never escape `MessageFactory::construct`; they are reported to the
/// diagnostics sink and the field degrades to `AuxiliaryField::Absent`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecoratorError {
    #[error("Malformed `{field}`: {reason}")]
    Malformed { field: String, reason: String },

    #[error("Field `{0}` is a base message field")]
    Reserved(String),

    #[error("Decorator panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

pub type FactoryResult<T> = Result<T, FactoryError>;
