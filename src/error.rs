//! Error types
//!
//! [`Error`] is the classified failure of a single stage (submit, poll,
//! resolve). [`LifecycleError`] is what the lifecycle driver surfaces: the
//! same classification plus the stage and the identifier involved.

use crate::ids::ParseError;
use crate::payload::ErrorDetail;
use crate::transport::{Response, TransportError};
use std::fmt;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input that doesn't name a resource of the expected type; never retried
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(#[from] ParseError),

    /// Network failures or retryable statuses that persisted past the retry budget
    #[error("transient transport failure after {attempts} attempt(s): {source}")]
    TransientTransport {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// The remote system reported a definitive failure for an accepted operation
    #[error("remote operation failed: {0}")]
    RemoteOperationFailed(ErrorDetail),

    /// The overall deadline passed while waiting for the operation
    #[error("gave up waiting after {waited:?}")]
    Timeout { waited: Duration },

    /// Cancelled by the caller
    #[error("operation was canceled")]
    Canceled,

    #[error("resource was not found")]
    NotFound,

    #[error("access to the resource was forbidden")]
    Forbidden,

    /// A non-retryable status returned when submitting, e.g. a 409 from a concurrent change
    #[error("request was rejected with status {status}: {detail}")]
    Rejected { status: u16, detail: ErrorDetail },

    #[error("{id} already exists and must be imported rather than created")]
    AlreadyExists { id: String },

    /// The resource exists but exposes no data-plane endpoint
    #[error("no endpoint was returned for {id}")]
    MissingEndpoint { id: String },

    #[error("decoding response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// Whether retrying the whole operation later could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::TransientTransport { .. } | Error::Timeout { .. } => true,
            Error::Rejected { status, .. } => *status == 409,
            _ => false,
        }
    }

    /// Classify a response that was not a success
    pub fn from_response(response: &Response) -> Self {
        if response.is_transient() {
            return Error::TransientTransport {
                attempts: 1,
                source: TransportError::from_response(response),
            };
        }
        match response.status.as_u16() {
            404 => Error::NotFound,
            403 => Error::Forbidden,
            status => Error::Rejected {
                status,
                detail: response.error_detail(),
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    /// Not-found and forbidden responses are skipped rather than raised during cache sweeps
    pub fn is_skippable(&self) -> bool {
        matches!(self, Error::NotFound | Error::Forbidden)
    }
}

/// Which step of the lifecycle failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Submit,
    Poll,
    Resolve,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Stage::Parse => "parsing",
            Stage::Submit => "submitting",
            Stage::Poll => "polling",
            Stage::Resolve => "resolving",
        };
        f.write_str(stage)
    }
}

/// A classified failure tagged with the stage and resource it occurred at
#[derive(Debug, thiserror::Error)]
#[error("{stage} {resource}: {source}")]
pub struct LifecycleError {
    pub stage: Stage,
    pub resource: String,
    #[source]
    pub source: Error,
}

impl LifecycleError {
    pub fn new(stage: Stage, resource: impl Into<String>, source: Error) -> Self {
        Self {
            stage,
            resource: resource.into(),
            source,
        }
    }

    pub fn error(&self) -> &Error {
        &self.source
    }
}
