//! Page properties and their resolution policies
//!
//! A [`Prop`] is a named value plus a [`PropKind`] that decides when the
//! value is computed and whether partial-reload filtering may drop it:
//!
//! | Kind       | Computed on first load | Filterable | Deferred manifest |
//! |------------|------------------------|------------|-------------------|
//! | `Plain`    | yes                    | yes        | no                |
//! | `Always`   | yes                    | no         | no                |
//! | `Optional` | no                     | yes        | no                |
//! | `Deferred` | no                     | yes        | yes               |
//!
//! Lazy values are computed at most once per request and the result is
//! cached on the prop.

mod extract;
mod map;
mod resolver;

pub use extract::{extract_props, Field, FieldValue, JsonRecord, Record, UntaggedPolicy};
pub use map::PropsMap;
pub use resolver::{resolve, Resolution};
pub use resolver::DeferredGroups;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::error::{InertiaError, Result};
use crate::header::RequestInfo;

/// Group name used for deferred props that do not name one.
pub const DEFAULT_GROUP: &str = "default";

// ─────────────────────────────────────────────────────────────────────────────
// Resolution Context
// ─────────────────────────────────────────────────────────────────────────────

/// Request-scoped context handed to every lazy computation.
#[derive(Debug, Clone, Default)]
pub struct PropContext {
    cancel: CancellationToken,
    request: Arc<RequestInfo>,
}

impl PropContext {
    pub fn new(request: RequestInfo, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            request: Arc::new(request),
        }
    }

    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lazy Values
// ─────────────────────────────────────────────────────────────────────────────

/// A computation that produces a prop value on demand.
#[async_trait]
pub trait Lazy: Send + Sync {
    async fn resolve(&self, ctx: &PropContext) -> anyhow::Result<Value>;
}

/// Shared handle to a lazy computation.
pub type LazyValue = Arc<dyn Lazy>;

struct LazyFn<F>(F);

#[async_trait]
impl<F, Fut, T> Lazy for LazyFn<F>
where
    F: Fn(PropContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<T>> + Send,
    T: Serialize,
{
    async fn resolve(&self, ctx: &PropContext) -> anyhow::Result<Value> {
        let value = (self.0)(ctx.clone()).await?;
        Ok(serde_json::to_value(value)?)
    }
}

struct SyncFn<F>(F);

#[async_trait]
impl<F, T> Lazy for SyncFn<F>
where
    F: Fn() -> anyhow::Result<T> + Send + Sync,
    T: Serialize,
{
    async fn resolve(&self, _ctx: &PropContext) -> anyhow::Result<Value> {
        let value = (self.0)()?;
        Ok(serde_json::to_value(value)?)
    }
}

/// Wrap an async closure taking the request context.
pub fn lazy<F, Fut, T>(f: F) -> LazyValue
where
    F: Fn(PropContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Serialize + 'static,
{
    Arc::new(LazyFn(f))
}

/// Wrap a synchronous zero-argument closure.
pub fn lazy_fn<F, T>(f: F) -> LazyValue
where
    F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    T: Serialize + 'static,
{
    Arc::new(SyncFn(f))
}

// ─────────────────────────────────────────────────────────────────────────────
// Prop Kinds
// ─────────────────────────────────────────────────────────────────────────────

/// Resolution policy of a prop.
///
/// Deferred props are always filterable, so a deferred "always" prop cannot
/// be expressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropKind {
    Plain {
        mergeable: bool,
    },
    Always,
    Optional,
    Deferred {
        group: String,
        mergeable: bool,
        concurrent: bool,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PropOptions {
    /// Merge the value into the client's existing value instead of replacing it.
    pub merge: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DeferredOptions {
    /// Group fetched together by the client; `None` means [`DEFAULT_GROUP`].
    pub group: Option<String>,
    pub merge: bool,
    /// Hint that this prop may be resolved independently of its group.
    pub concurrent: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Prop
// ─────────────────────────────────────────────────────────────────────────────

enum Source {
    Value(Value),
    /// Eager value that failed to encode; surfaced when the prop is resolved.
    Unencodable(String),
    Lazy(LazyValue),
}

/// A single named page property.
pub struct Prop {
    key: String,
    kind: PropKind,
    source: Source,
    resolved: OnceCell<Value>,
}

impl Prop {
    /// Eager, filterable prop.
    pub fn new(key: impl Into<String>, value: impl Serialize) -> Self {
        Self::new_with(key, value, PropOptions::default())
    }

    pub fn new_with(key: impl Into<String>, value: impl Serialize, opts: PropOptions) -> Self {
        Self::eager(
            key.into(),
            PropKind::Plain {
                mergeable: opts.merge,
            },
            value,
        )
    }

    /// Eager prop included regardless of partial-reload filtering.
    pub fn always(key: impl Into<String>, value: impl Serialize) -> Self {
        Self::eager(key.into(), PropKind::Always, value)
    }

    /// Filterable prop computed only when a partial reload selects it.
    pub fn optional(key: impl Into<String>, value: LazyValue) -> Self {
        Self::deferrable(key.into(), PropKind::Optional, value)
    }

    /// Filterable prop fetched by the client after the first load.
    pub fn deferred(key: impl Into<String>, value: LazyValue, opts: DeferredOptions) -> Self {
        let group = opts
            .group
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| DEFAULT_GROUP.to_string());

        Self::deferrable(
            key.into(),
            PropKind::Deferred {
                group,
                mergeable: opts.merge,
                concurrent: opts.concurrent,
            },
            value,
        )
    }

    fn eager(key: String, kind: PropKind, value: impl Serialize) -> Self {
        let source = match serde_json::to_value(value) {
            Ok(v) => Source::Value(v),
            Err(e) => Source::Unencodable(e.to_string()),
        };

        Self {
            key,
            kind,
            source,
            resolved: OnceCell::new(),
        }
    }

    fn deferrable(key: String, kind: PropKind, value: LazyValue) -> Self {
        Self {
            key,
            kind,
            source: Source::Lazy(value),
            resolved: OnceCell::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> &PropKind {
        &self.kind
    }

    /// Lazy props are never computed on a first load.
    pub fn is_lazy(&self) -> bool {
        matches!(self.kind, PropKind::Optional | PropKind::Deferred { .. })
    }

    /// False only for "always" props.
    pub fn is_ignorable(&self) -> bool {
        !matches!(self.kind, PropKind::Always)
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.kind, PropKind::Deferred { .. })
    }

    pub fn is_mergeable(&self) -> bool {
        matches!(
            self.kind,
            PropKind::Plain { mergeable: true } | PropKind::Deferred { mergeable: true, .. }
        )
    }

    pub fn is_concurrent(&self) -> bool {
        matches!(self.kind, PropKind::Deferred { concurrent: true, .. })
    }

    /// Deferred group, if this prop is deferred.
    pub fn group(&self) -> Option<&str> {
        match &self.kind {
            PropKind::Deferred { group, .. } => Some(group),
            _ => None,
        }
    }

    /// Resolve the prop, computing a lazy value at most once.
    ///
    /// Cancellation of `ctx` aborts a pending computation with
    /// [`InertiaError::Cancelled`].
    pub async fn value(&self, ctx: &PropContext) -> Result<Value> {
        let lazy = match &self.source {
            Source::Value(v) => return Ok(v.clone()),
            Source::Unencodable(msg) => {
                return Err(InertiaError::Serialize {
                    what: format!("prop {:?}", self.key),
                    source: <serde_json::Error as serde::ser::Error>::custom(msg),
                })
            }
            Source::Lazy(lazy) => lazy,
        };

        let value = self
            .resolved
            .get_or_try_init(|| async {
                if ctx.is_cancelled() {
                    return Err(InertiaError::Cancelled {
                        key: self.key.clone(),
                    });
                }

                tracing::trace!(key = %self.key, "resolving lazy prop");

                tokio::select! {
                    biased;
                    _ = ctx.cancel.cancelled() => Err(InertiaError::Cancelled {
                        key: self.key.clone(),
                    }),
                    res = lazy.resolve(ctx) => res.map_err(|e| self.resolve_error(e)),
                }
            })
            .await?;

        Ok(value.clone())
    }

    fn resolve_error(&self, err: anyhow::Error) -> InertiaError {
        match err.downcast::<serde_json::Error>() {
            Ok(source) => InertiaError::Serialize {
                what: format!("prop {:?}", self.key),
                source,
            },
            Err(source) => InertiaError::Resolve {
                key: self.key.clone(),
                source,
            },
        }
    }
}

impl fmt::Debug for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prop")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("resolved", &self.resolved.initialized())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Collections
// ─────────────────────────────────────────────────────────────────────────────

/// Anything that can produce an ordered set of props.
pub trait Proper {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Produce all props, in declaration order.
    fn into_props(self) -> Vec<Prop>;
}

/// Ordered list of props.
#[derive(Debug, Default)]
pub struct Props(Vec<Prop>);

impl Props {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, prop: Prop) {
        self.0.push(prop);
    }

    /// Builder-style push.
    pub fn with(mut self, prop: Prop) -> Self {
        self.0.push(prop);
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Prop> {
        self.0.iter()
    }
}

impl Proper for Props {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn into_props(self) -> Vec<Prop> {
        self.0
    }
}

impl Proper for Vec<Prop> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn into_props(self) -> Vec<Prop> {
        self
    }
}

impl From<Vec<Prop>> for Props {
    fn from(props: Vec<Prop>) -> Self {
        Self(props)
    }
}

impl FromIterator<Prop> for Props {
    fn from_iter<I: IntoIterator<Item = Prop>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Props {
    type Item = Prop;
    type IntoIter = std::vec::IntoIter<Prop>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(calls: Arc<AtomicUsize>) -> LazyValue {
        lazy(move |_ctx| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>("computed")
            }
        })
    }

    #[tokio::test]
    async fn test_new_prop() {
        let prop = Prop::new("key", "val");
        assert_eq!(prop.key(), "key");
        assert_eq!(prop.value(&PropContext::default()).await.unwrap(), json!("val"));
        assert!(!prop.is_lazy());
        assert!(prop.is_ignorable());
        assert!(!prop.is_deferred());
        assert!(!prop.is_mergeable());

        let merged = Prop::new_with("key", "val", PropOptions { merge: true });
        assert!(merged.is_mergeable());
        assert!(!merged.is_concurrent());
    }

    #[tokio::test]
    async fn test_always_prop() {
        let prop = Prop::always("key", json!({"a": 1}));
        assert_eq!(
            prop.value(&PropContext::default()).await.unwrap(),
            json!({"a": 1})
        );
        assert!(!prop.is_lazy());
        assert!(!prop.is_ignorable());
        assert!(!prop.is_deferred());
        assert!(!prop.is_mergeable());
    }

    #[tokio::test]
    async fn test_optional_prop() {
        let prop = Prop::optional("key", lazy_fn(|| Ok("val")));
        assert!(prop.is_lazy());
        assert!(prop.is_ignorable());
        assert!(!prop.is_deferred());
        assert!(!prop.is_concurrent());
        assert!(prop.group().is_none());
        assert_eq!(prop.value(&PropContext::default()).await.unwrap(), json!("val"));
    }

    #[test]
    fn test_deferred_defaults_to_default_group() {
        let prop = Prop::deferred("key", lazy_fn(|| Ok(1)), DeferredOptions::default());
        assert_eq!(prop.group(), Some(DEFAULT_GROUP));
        assert!(prop.is_lazy());
        assert!(prop.is_ignorable());
        assert!(prop.is_deferred());
        assert!(!prop.is_mergeable());

        let empty_group = Prop::deferred(
            "key",
            lazy_fn(|| Ok(1)),
            DeferredOptions {
                group: Some(String::new()),
                ..Default::default()
            },
        );
        assert_eq!(empty_group.group(), Some(DEFAULT_GROUP));
    }

    #[test]
    fn test_deferred_options() {
        let prop = Prop::deferred(
            "key",
            lazy_fn(|| Ok(1)),
            DeferredOptions {
                group: Some("custom".into()),
                merge: true,
                concurrent: true,
            },
        );
        assert_eq!(prop.group(), Some("custom"));
        assert!(prop.is_mergeable());
        assert!(prop.is_concurrent());
    }

    #[tokio::test]
    async fn test_lazy_value_is_computed_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let prop = Prop::optional("key", counting(calls.clone()));
        let ctx = PropContext::default();

        let first = prop.value(&ctx).await.unwrap();
        let second = prop.value(&ctx).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lazy_failure_propagates() {
        let prop = Prop::optional("users", lazy_fn(|| -> anyhow::Result<()> {
            anyhow::bail!("db down")
        }));

        let err = prop.value(&PropContext::default()).await.unwrap_err();
        assert!(matches!(err, InertiaError::Resolve { ref key, .. } if key == "users"));
    }

    #[tokio::test]
    async fn test_cancelled_context_skips_computation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let prop = Prop::optional("key", counting(calls.clone()));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let ctx = PropContext::new(RequestInfo::default(), cancel);

        let err = prop.value(&ctx).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_pending_computation() {
        let prop = Prop::optional(
            "slow",
            lazy(|_ctx| async {
                tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                Ok::<_, anyhow::Error>("late")
            }),
        );

        let cancel = CancellationToken::new();
        let ctx = PropContext::new(RequestInfo::default(), cancel.clone());
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            cancel.cancel();
        });

        let err = prop.value(&ctx).await.unwrap_err();
        assert!(matches!(err, InertiaError::Cancelled { ref key } if key == "slow"));
    }

    #[tokio::test]
    async fn test_unencodable_value_is_serialize_error() {
        use std::collections::HashMap;

        // Non-string map keys cannot be encoded as a JSON object.
        let mut bad = HashMap::new();
        bad.insert((1, 2), "x");

        let prop = Prop::new("bad", bad);
        let err = prop.value(&PropContext::default()).await.unwrap_err();
        assert!(matches!(err, InertiaError::Serialize { .. }));
    }

    #[test]
    fn test_props_collection() {
        let props = Props::new()
            .with(Prop::new("key1", "val1"))
            .with(Prop::new("key2", "val2"));

        assert_eq!(props.len(), 2);
        let keys: Vec<_> = props.into_props().iter().map(|p| p.key().to_string()).collect();
        assert_eq!(keys, vec!["key1", "key2"]);
    }
}
