//! Error types for the ObjectSet operator
//!
//! Object store failures keep the underlying kube-rs error attached so the
//! reconcilers can classify them (not found, conflict) without string matching.

use thiserror::Error;

use crate::package::ValidationErrors;

/// Main error type for ObjectSet operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("{context}: {source}")]
    Kube {
        /// Operation that was being performed (e.g. "creating ObjectSetPhase")
        context: String,
        /// The underlying kube-rs error
        source: kube::Error,
    },

    /// The desired state of a resource could not be constructed
    #[error("constructing {kind}: {message}")]
    Construction {
        /// Kind of the resource being constructed
        kind: String,
        /// Description of what failed
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// Package content failed validation
    #[error(transparent)]
    PackageValidation(#[from] ValidationErrors),

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Context where the error occurred
        context: String,
        /// Description of what failed
        message: String,
    },
}

impl From<kube::Error> for Error {
    fn from(source: kube::Error) -> Self {
        Self::Kube {
            context: "kubernetes error".to_string(),
            source,
        }
    }
}

impl Error {
    /// Wrap a kube-rs error with the operation that produced it
    pub fn kube(context: impl Into<String>, source: kube::Error) -> Self {
        Self::Kube {
            context: context.into(),
            source,
        }
    }

    /// Create a construction error for the given resource kind
    pub fn construction(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Construction {
            kind: kind.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            context: context.into(),
            message: msg.into(),
        }
    }

    /// Re-wrap a kube error with a new operation context, leaving other
    /// variants untouched.
    pub fn context(self, context: impl Into<String>) -> Self {
        match self {
            Self::Kube { source, .. } => Self::kube(context, source),
            other => other,
        }
    }

    /// HTTP status code of the underlying API error, if any
    pub fn api_code(&self) -> Option<u16> {
        match self {
            Self::Kube {
                source: kube::Error::Api(ae),
                ..
            } => Some(ae.code),
            _ => None,
        }
    }

    /// True if the object store reported that the object does not exist
    pub fn is_not_found(&self) -> bool {
        self.api_code() == Some(404)
    }

    /// True if the object store rejected a write due to a stale resource version
    pub fn is_conflict(&self) -> bool {
        self.api_code() == Some(409)
    }
}

/// Build a kube API error response, used by fakes and tests that stand in for
/// the API server.
pub fn api_error(code: u16, reason: &str, message: impl Into<String>) -> kube::Error {
    kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: message.into(),
        reason: reason.to_string(),
        code,
    })
}
