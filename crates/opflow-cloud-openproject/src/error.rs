//! OpenProject provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenProjectError {
    /// Connection failure, timeout or broken body stream. Always retryable.
    #[error("error contacting OpenProject: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to create user: status {status}{}", suffix(.message))]
    CreateFailed { status: u16, message: String },

    #[error("failed to read user (status {status}): {body}")]
    ReadFailed { status: u16, body: String },

    #[error("failed to delete user (status {status}): {message}")]
    DeleteFailed { status: u16, message: String },

    #[error("import failed: {0}")]
    ImportFailed(#[from] ImportError),

    /// Response arrived but its body did not match the expected schema
    #[error("error decoding response (status {status}): {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// 201 without a usable `id` field
    #[error("create response (status {status}) did not contain a user id")]
    MissingIdentity { status: u16 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid user spec: {0}")]
    InvalidSpec(String),
}

/// Reasons an import can fail
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("missing identifier")]
    MissingIdentifier,

    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),

    #[error("user {0} does not exist")]
    NotFound(String),

    #[error("error reading user during import: {0}")]
    Read(#[source] Box<OpenProjectError>),
}

fn suffix(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {}", message)
    }
}

impl OpenProjectError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            OpenProjectError::CreateFailed { status, .. }
            | OpenProjectError::ReadFailed { status, .. }
            | OpenProjectError::DeleteFailed { status, .. }
            | OpenProjectError::Decode { status, .. }
            | OpenProjectError::MissingIdentity { status } => Some(*status),
            OpenProjectError::Transport(e) => e.status().map(|s| s.as_u16()),
            OpenProjectError::ImportFailed(ImportError::Read(inner)) => inner.status(),
            _ => None,
        }
    }

    /// Whether the host may simply re-run the same operation
    pub fn is_retryable(&self) -> bool {
        match self {
            OpenProjectError::Transport(_) => true,
            OpenProjectError::ImportFailed(ImportError::Read(inner)) => inner.is_retryable(),
            _ => false,
        }
    }
}

impl From<OpenProjectError> for opflow_cloud::CloudError {
    fn from(e: OpenProjectError) -> Self {
        match e {
            OpenProjectError::InvalidConfig(msg) | OpenProjectError::InvalidSpec(msg) => {
                opflow_cloud::CloudError::InvalidConfig(msg)
            }
            other => opflow_cloud::CloudError::Provider(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, OpenProjectError>;
