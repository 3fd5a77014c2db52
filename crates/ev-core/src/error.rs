use crate::types::CommandLocation;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{code}: {message}")]
pub struct EventError {
    pub code: String,
    pub message: String,
    pub location: Option<CommandLocation>,
}

impl EventError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            location: None,
        }
    }

    pub fn at(
        code: impl Into<String>,
        message: impl Into<String>,
        location: CommandLocation,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            location: Some(location),
        }
    }
}
