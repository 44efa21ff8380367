use std::error::Error as StdError;
use std::io;
use thiserror::Error;

/// Library error carried as the source of a [`SheetError::Transport`]
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors surfaced by every sheetstream component
#[derive(Error, Debug)]
pub enum SheetError {
    /// The named sheet does not exist in the spreadsheet
    #[error("sheet '{name}' does not exist in spreadsheet '{container}'")]
    NotFound { container: String, name: String },

    /// Exclusive create against a sheet that already exists
    #[error("sheet '{name}' already exists in spreadsheet '{container}'")]
    AlreadyExists { container: String, name: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The remote answered 2xx but the payload broke the API contract
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Any non-2xx answer. The body keeps the structured error detail.
    #[error("remote request failed with {status_code} {status_text}: {body}")]
    RemoteRequestFailed {
        status_code: u16,
        status_text: String,
        body: String,
    },

    /// A text-table chunk could not be parsed into rows
    #[error("could not decode row {row}: {reason}")]
    Decode { row: u64, reason: String },

    /// The request never produced a response. The underlying client error,
    /// if any, stays reachable through `source()`.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SheetError {
    pub fn not_found(container: impl Into<String>, name: impl Into<String>) -> Self {
        SheetError::NotFound {
            container: container.into(),
            name: name.into(),
        }
    }

    pub fn already_exists(container: impl Into<String>, name: impl Into<String>) -> Self {
        SheetError::AlreadyExists {
            container: container.into(),
            name: name.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        SheetError::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Transport failure caused by a lower-level client error
    pub fn transport_caused_by(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        SheetError::Transport {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// HTTP status of a failed remote request, if that is what this is
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SheetError::RemoteRequestFailed { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

impl From<SheetError> for io::Error {
    fn from(err: SheetError) -> Self {
        let kind = match &err {
            SheetError::NotFound { .. } => io::ErrorKind::NotFound,
            SheetError::AlreadyExists { .. } => io::ErrorKind::AlreadyExists,
            SheetError::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            SheetError::Decode { .. } | SheetError::MalformedResponse(_) => {
                io::ErrorKind::InvalidData
            }
            SheetError::RemoteRequestFailed { status_code: 404, .. } => io::ErrorKind::NotFound,
            SheetError::RemoteRequestFailed { status_code: 403, .. } => {
                io::ErrorKind::PermissionDenied
            }
            SheetError::RemoteRequestFailed { .. }
            | SheetError::Transport { .. }
            | SheetError::Serialization(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
