//! Error types for page rendering and props resolution
//!
//! None of these errors are turned into HTTP responses here. The request
//! boundary decides what the user sees; this crate only guarantees that a
//! failed render never produces a half-built page.

use thiserror::Error;

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, InertiaError>;

/// Errors that abort a render or a props extraction.
#[derive(Error, Debug)]
pub enum InertiaError {
    /// A lazy prop computation failed.
    #[error("inertia: failed to resolve prop {key:?}: {source}")]
    Resolve {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// The request was cancelled while a prop was being resolved.
    #[error("inertia: resolution of prop {key:?} was cancelled")]
    Cancelled { key: String },

    /// A value could not be encoded as JSON.
    #[error("inertia: failed to encode {what}: {source}")]
    Serialize {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("inertia: failed to render SSR data: {0}")]
    Ssr(#[from] SsrError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// The handler asked for a renderer but the middleware was never mounted.
    #[error(
        "inertia: renderer not found in request extensions - did you forget to use the middleware?"
    )]
    MissingRenderer,

    /// The flash store could not save or load validation errors.
    #[error("inertia: flash store failed: {0}")]
    Flash(#[source] anyhow::Error),

    #[error("inertia: invalid header value {0:?}")]
    InvalidHeaderValue(String),

    #[error("inertia: i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl InertiaError {
    /// Returns true if the error was caused by request cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            InertiaError::Cancelled { .. } | InertiaError::Ssr(SsrError::Cancelled)
        )
    }
}

/// Errors raised while turning a record into a set of props.
///
/// Extraction happens before rendering starts, so none of these leave a
/// partially built props set behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The input did not describe a record with named fields.
    #[error("inertia: props input must be a record with named fields, got {0}")]
    NotARecord(&'static str),

    #[error("inertia: unknown field kind {kind:?} on field {field:?}")]
    UnknownKind { field: String, kind: String },

    #[error("inertia: cannot use group {group:?} on non-deferred field {field:?}")]
    GroupOnNonDeferred { field: String, group: String },

    /// An optional or deferred field did not hold a lazy computation.
    #[error("inertia: field {field:?} must hold a lazy value to be {kind}")]
    InvalidLazy { field: String, kind: &'static str },

    /// A plain or always field held a lazy computation.
    #[error("inertia: field {field:?} holds a lazy value but is not optional or deferred")]
    UnexpectedLazy { field: String },
}

/// Errors from the HTML template layer.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("inertia: failed to parse template: {0}")]
    Parse(String),

    #[error("inertia: failed to execute HTML template: {0}")]
    Execute(String),

    #[error("inertia: failed to read template {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from a server-side rendering backend.
#[derive(Error, Debug)]
pub enum SsrError {
    #[error("failed to make HTTP request: {0}")]
    Request(String),

    #[error("unexpected HTTP status code: {0}")]
    Status(u16),

    #[error("failed to decode JSON response: {0}")]
    Decode(String),

    #[error("request was cancelled")]
    Cancelled,
}
