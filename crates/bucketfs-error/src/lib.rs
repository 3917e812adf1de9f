use std::io;

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serde_json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid UTF-8 sequence: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("system error: {0}")]
    System(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Method '{0}' not found")]
    MethodNotFound(String),

    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("file '{file_id}' not found")]
    NotFound { file_id: String },

    #[error("failed to convert {format} content: {message}")]
    Conversion { format: String, message: String },

    #[error("{operation} failed{}: {message}", file_suffix(.file_id))]
    Transport {
        operation: String,
        file_id: Option<String>,
        message: String,
    },
}

impl Error {
    /// Builds a [`Error::Conversion`] for a decoder failure on `format`.
    pub fn conversion(format: impl Into<String>, message: impl ToString) -> Self {
        Error::Conversion {
            format: format.into(),
            message: message.to_string(),
        }
    }

    pub fn transport(
        operation: impl Into<String>,
        file_id: Option<&str>,
        message: impl ToString,
    ) -> Self {
        Error::Transport {
            operation: operation.into(),
            file_id: file_id.map(str::to_string),
            message: message.to_string(),
        }
    }
}

fn file_suffix(file_id: &Option<String>) -> String {
    match file_id {
        Some(id) => format!(" for file '{id}'"),
        None => String::new(),
    }
}

pub type Result<T> = core::result::Result<T, Error>;

pub type BoxError = Box<dyn std::error::Error + Sync + Send>;
