use thiserror::Error;

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors that can occur while storing or reassembling chunked files
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("File not found: {id}")]
    NotFound { id: String },

    #[error("Invalid request: {message}")]
    Invalid { message: String },

    #[error("Requested range not satisfiable for size {file_size}")]
    RangeNotSatisfiable { file_size: u64 },

    /// The remote part host rejected or failed a request.
    #[error("Upstream error: {reason}")]
    Upstream {
        reason: String,
        status: Option<u16>,
        payload: Option<serde_json::Value>,
    },

    #[error("Manifest store error: {reason}")]
    Persist { reason: String },

    #[error("Corrupt manifest {id}: {reason}")]
    CorruptManifest { id: String, reason: String },

    /// The consumer of a reassembled stream went away.
    #[error("Output closed by consumer")]
    Disconnected,

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl RelayError {
    /// Create an invalid request error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(id: S) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create an upstream error without status or payload
    pub fn upstream<S: Into<String>>(reason: S) -> Self {
        Self::Upstream {
            reason: reason.into(),
            status: None,
            payload: None,
        }
    }

    /// Create an upstream error carrying the remote status and response body
    pub fn upstream_response<S: Into<String>>(
        reason: S,
        status: u16,
        payload: Option<serde_json::Value>,
    ) -> Self {
        Self::Upstream {
            reason: reason.into(),
            status: Some(status),
            payload,
        }
    }

    /// Create a manifest store error
    pub fn persist<S: Into<String>>(reason: S) -> Self {
        Self::Persist {
            reason: reason.into(),
        }
    }

    /// Create a corrupt manifest error
    pub fn corrupt<I: Into<String>, S: Into<String>>(id: I, reason: S) -> Self {
        Self::CorruptManifest {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the caller rather than the relay or its collaborators
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Invalid { .. } | Self::RangeNotSatisfiable { .. }
        )
    }
}
