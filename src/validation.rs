//! Validation errors and the flash hand-off between requests
//!
//! A failed form submission is not an error for the protocol: the handler
//! stores the field errors in a [`FlashStore`], redirects back, and the next
//! render picks them up through [`RenderContext::flash`](crate::RenderContext::flash).

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::header::{RequestInfo, DEFAULT_ERROR_BAG};
use crate::props::Prop;
use crate::InertiaError;

/// Key of the errors prop for the default bag.
pub const ERRORS_KEY: &str = "errors";

/// A single field error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Anything that can report field errors.
pub trait ValidationErrorer: Send + Sync {
    fn validation_errors(&self) -> Vec<ValidationError>;

    fn len(&self) -> usize {
        self.validation_errors().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ValidationErrorer for ValidationError {
    fn validation_errors(&self) -> Vec<ValidationError> {
        vec![self.clone()]
    }

    fn len(&self) -> usize {
        1
    }
}

/// An ordered list of field errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(ValidationError::new(field, message));
    }
}

impl ValidationErrorer for ValidationErrors {
    fn validation_errors(&self) -> Vec<ValidationError> {
        self.0.clone()
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

impl ValidationErrorer for BTreeMap<String, String> {
    fn validation_errors(&self) -> Vec<ValidationError> {
        self.iter()
            .map(|(field, message)| ValidationError::new(field.clone(), message.clone()))
            .collect()
    }

    fn len(&self) -> usize {
        BTreeMap::len(self)
    }
}

impl<E: ValidationErrorer + ?Sized> ValidationErrorer for Box<E> {
    fn validation_errors(&self) -> Vec<ValidationError> {
        (**self).validation_errors()
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

/// Build the always-present errors prop.
///
/// The default bag renders as `errors: {field: message}`. A named bag renders
/// as `<bag>: {errors: {field: message}}`. A field reported twice keeps the
/// last message.
pub(crate) fn errors_prop(error_bag: &str, errorers: &[Box<dyn ValidationErrorer>]) -> Prop {
    let mut m = Map::new();
    for errorer in errorers {
        for err in errorer.validation_errors() {
            m.insert(err.field, Value::String(err.message));
        }
    }

    if error_bag != DEFAULT_ERROR_BAG {
        let mut bag = Map::new();
        bag.insert(ERRORS_KEY.to_string(), Value::Object(m));
        return Prop::always(error_bag, Value::Object(bag));
    }

    Prop::always(ERRORS_KEY, Value::Object(m))
}

// ─────────────────────────────────────────────────────────────────────────────
// Flash
// ─────────────────────────────────────────────────────────────────────────────

/// Validation state carried across the redirect that follows a failed submit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub error_bag: String,
    pub errors: ValidationErrors,
    /// Page to send the user back to.
    pub path: Option<String>,
}

/// Per-client storage for a [`Flash`], read back exactly once.
///
/// `client` is whatever identifies the visitor (session id, cookie value).
#[async_trait]
pub trait FlashStore: Send + Sync {
    async fn store(&self, client: &str, flash: Flash) -> anyhow::Result<()>;

    /// Remove and return the pending flash, if any.
    async fn take(&self, client: &str) -> anyhow::Result<Option<Flash>>;
}

/// Process-local flash store.
#[derive(Debug, Default)]
pub struct MemoryFlashStore {
    entries: Mutex<HashMap<String, Flash>>,
}

impl MemoryFlashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlashStore for MemoryFlashStore {
    async fn store(&self, client: &str, flash: Flash) -> anyhow::Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("flash store lock poisoned"))?;
        entries.insert(client.to_string(), flash);
        Ok(())
    }

    async fn take(&self, client: &str) -> anyhow::Result<Option<Flash>> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("flash store lock poisoned"))?;
        Ok(entries.remove(client))
    }
}

/// Store `errors` for `client` and redirect back to the referring page.
///
/// The stored bag is the one the client named in `X-Inertia-Error-Bag`.
pub async fn fail_validation(
    request: &RequestInfo,
    store: &dyn FlashStore,
    client: &str,
    errors: &dyn ValidationErrorer,
    fallback: &str,
) -> crate::Result<Response> {
    let path = request.referer.clone();
    debug!(
        client,
        count = errors.len(),
        error_bag = %request.error_bag,
        "Validation failed, redirecting back"
    );

    store
        .store(
            client,
            Flash {
                error_bag: request.error_bag.clone(),
                errors: ValidationErrors(errors.validation_errors()),
                path: path.clone(),
            },
        )
        .await
        .map_err(InertiaError::Flash)?;

    let target = path.as_deref().unwrap_or(fallback);
    crate::middleware::redirect(&request.method, target)
}
