//! Typed errors for the relay client.
//!
//! The dispatcher, attachment manager, and transcript each have a small typed
//! taxonomy so callers can branch on the failure mode without string
//! matching. The controller collapses every `DispatchError` into one fixed
//! user-safe transcript message and logs the detail.

use thiserror::Error;
use uuid::Uuid;

/// Failures from the request dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Transport-level failure (DNS, connect, TLS, broken body).
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// No response within the deadline. The underlying call is aborted so a
    /// late response can never resolve an already-failed placeholder.
    #[error("request timed out after {elapsed_secs}s")]
    Timeout { elapsed_secs: u64 },
}

/// Failures from the attachment manager.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AttachmentError {
    /// The selected file is not an image. The current attachment, if any,
    /// is left untouched.
    #[error("not an image file (got {mime:?})")]
    InvalidAttachment { mime: String },
}

/// Failures from the transcript store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptError {
    /// Resolve targeted an id that does not exist or is no longer pending.
    /// Inside the controller this is the late-response guard firing, which
    /// is logged and swallowed; anywhere else it is a programming error.
    #[error("no pending message with id {id}")]
    NotFound { id: Uuid },
}
