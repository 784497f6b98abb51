use thiserror::Error;

use crate::datatype::{DataType, join_types};

#[derive(Error, Debug)]
pub enum LazymapError {
    #[error("Invalid input: expected a record but got {found}")]
    InvalidInput { found: String },
    #[error("Type mismatch: {attribute} expected {} but got {found} ({value})", join_types(.expected))]
    TypeMismatch {
        attribute: String,
        expected: Vec<DataType>,
        found: String,
        value: String,
    },
    #[error("Missing mapper: no coercion for {attribute} of type {} with value {value}", join_types(.data_type))]
    MissingMapper {
        attribute: String,
        data_type: Vec<DataType>,
        value: String,
    },
    #[error("Coercion error: {attribute}: {message}")]
    Coercion { attribute: String, message: String },
    #[error("Unknown attribute: {model} declares no attribute named {attribute}")]
    UnknownAttribute { model: String, attribute: String },
    #[error("Recursive evaluation: {attribute} of {model} was read while being computed")]
    Recursive { model: String, attribute: String },
    #[error("Config error: {0}")]
    Config(String),
}

impl LazymapError {
    /// A coercion failure raised from inside a mapper, which does not know
    /// which attribute it is serving. The evaluator fills the name in.
    pub fn coercion(message: impl Into<String>) -> Self {
        Self::Coercion {
            attribute: String::new(),
            message: message.into(),
        }
    }
    pub(crate) fn for_attribute(self, name: &str) -> Self {
        match self {
            Self::Coercion { attribute, message } if attribute.is_empty() => Self::Coercion {
                attribute: name.to_string(),
                message,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, LazymapError>;

// Helper conversions
impl From<config::ConfigError> for LazymapError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
