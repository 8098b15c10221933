use thiserror::Error;

use crate::domain::collection::{CollectionKey, CollectionShape};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("collection `{key}` must hold {expected} but holds a JSON {found}")]
    ShapeMismatch { key: CollectionKey, expected: CollectionShape, found: &'static str },
    #[error("collection `{key}` is not valid JSON for its shape: {message}")]
    Malformed { key: CollectionKey, message: String },
    #[error("`{raw}` is not a valid item number (expected 1..={len})")]
    InvalidPosition { raw: String, len: usize },
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("checklist `{0}` does not exist")]
    UnknownChecklist(String),
}

/// Failure of one command invocation. Every variant is turned into a reply at
/// the router boundary, never propagated to the event loop.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
}

impl CommandError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage",
            Self::UnknownCommand(_) => "unknown_command",
        }
    }

    /// Reply text safe to show in the channel. Storage details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) => format!("Invalid arguments: {message}"),
            Self::NotFound(message) => format!("Nothing found: {message}"),
            Self::Storage(_) => {
                "Something went wrong while reading or saving data. Please try again later."
                    .to_owned()
            }
            Self::UnknownCommand(name) => format!("Unknown command `{name}`."),
        }
    }
}

impl From<DomainError> for CommandError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::InvalidPosition { .. } | DomainError::MissingArgument(_) => {
                Self::Validation(value.to_string())
            }
            DomainError::UnknownChecklist(_) => Self::NotFound(value.to_string()),
            DomainError::ShapeMismatch { .. } | DomainError::Malformed { .. } => {
                Self::Storage(value.to_string())
            }
        }
    }
}
