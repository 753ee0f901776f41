use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("input directory {} does not exist or is not a directory", .0.display())]
    InvalidInputDir(PathBuf),
    #[error("failed to create output directory {}: {source}", path.display())]
    CreateOutputDir { path: PathBuf, source: io::Error },
    #[error("failed to list directory {}: {source}", path.display())]
    ReadDir { path: PathBuf, source: io::Error },
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("failed to write overlay {}: {source}", path.display())]
    WriteOverlay {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// Failures of the text recognition collaborator.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("no Vision credentials configured")]
    MissingCredentials,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("service error {code}: {message}")]
    Service { code: i32, message: String },
    #[error("malformed response: {0}")]
    InvalidResponse(String),
    #[error("no stored annotation for {}", .0.display())]
    NotFound(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

// google.rpc.Code values worth another attempt.
const RPC_DEADLINE_EXCEEDED: i32 = 4;
const RPC_RESOURCE_EXHAUSTED: i32 = 8;
const RPC_INTERNAL: i32 = 13;
const RPC_UNAVAILABLE: i32 = 14;

impl OcrError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            OcrError::Transport(err) => {
                err.is_timeout()
                    || err.is_connect()
                    || err.is_request()
                    || err
                        .status()
                        .is_some_and(|status| status.as_u16() == 429 || status.is_server_error())
            }
            OcrError::Status { status, .. } => *status == 429 || *status >= 500,
            OcrError::Service { code, .. } => matches!(
                *code,
                RPC_DEADLINE_EXCEEDED | RPC_RESOURCE_EXHAUSTED | RPC_INTERNAL | RPC_UNAVAILABLE
            ),
            OcrError::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
            ),
            OcrError::MissingCredentials
            | OcrError::InvalidResponse(_)
            | OcrError::NotFound(_)
            | OcrError::Json(_) => false,
        }
    }
}
