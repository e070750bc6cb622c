//! Props resolution: filtering, deferred manifest and merge list
//!
//! Input order is observable in every output: the props object keeps
//! insertion order, deferred groups appear in first-seen order and the merge
//! list follows declaration order.

use std::fmt;

use futures::StreamExt;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::{Prop, PropContext};
use crate::error::Result;
use crate::header::RequestInfo;

/// Resolved payload fields for one response.
#[derive(Debug, Default)]
pub struct Resolution {
    pub props: Map<String, Value>,
    /// `None` on partial reloads; the client already holds the manifest.
    pub deferred: Option<DeferredGroups>,
    pub merge: Vec<String>,
}

/// Resolve `props` for a render of `component`.
///
/// Props are resolved in order. With `concurrency > 1`, selected props
/// flagged `concurrent` are resolved ahead of the rest through a bounded
/// stream; the first failure in input order aborts the render and drops the
/// outstanding work.
pub async fn resolve(
    props: &[Prop],
    component: &str,
    request: &RequestInfo,
    ctx: &PropContext,
    concurrency: usize,
) -> Result<Resolution> {
    Ok(Resolution {
        props: make_props(props, component, request, ctx, concurrency).await?,
        deferred: make_deferred_props(props, component, request),
        merge: make_merge_props(props, &request.reset),
    })
}

/// Select the props a response should carry.
pub(crate) fn select<'a>(
    props: &'a [Prop],
    component: &str,
    request: &RequestInfo,
) -> Vec<&'a Prop> {
    if request.is_partial_for(component) {
        let whitelist = &request.partial_data;
        let blacklist = &request.partial_except;

        props
            .iter()
            .filter(|p| {
                if !p.is_ignorable() {
                    return true;
                }
                let key = p.key().to_string();
                (whitelist.is_empty() || whitelist.contains(&key))
                    && !(!blacklist.is_empty() && blacklist.contains(&key))
            })
            .collect()
    } else {
        // Lazy props are never resolved on the first render.
        props.iter().filter(|p| !p.is_lazy()).collect()
    }
}

async fn make_props(
    props: &[Prop],
    component: &str,
    request: &RequestInfo,
    ctx: &PropContext,
    concurrency: usize,
) -> Result<Map<String, Value>> {
    let selected = select(props, component, request);
    let mut early: Vec<Option<Value>> = vec![None; selected.len()];

    if concurrency > 1 {
        let jobs = selected
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_concurrent())
            .map(|(i, p)| async move { p.value(ctx).await.map(|v| (i, v)) });

        // Boxed so the render future stays `Send` for axum handlers.
        let mut stream = futures::stream::iter(jobs).buffered(concurrency).boxed();
        while let Some(res) = stream.next().await {
            let (i, value) = res?;
            early[i] = Some(value);
        }
    }

    let mut m = Map::with_capacity(selected.len());
    for (i, prop) in selected.into_iter().enumerate() {
        let value = match early[i].take() {
            Some(v) => v,
            None => prop.value(ctx).await?,
        };
        // Duplicate keys: last write wins.
        m.insert(prop.key().to_string(), value);
    }

    Ok(m)
}

/// Group deferred props for a full load. Returns `None` on partial reloads.
pub(crate) fn make_deferred_props(
    props: &[Prop],
    component: &str,
    request: &RequestInfo,
) -> Option<DeferredGroups> {
    if request.is_partial_for(component) {
        return None;
    }

    let mut groups = DeferredGroups::default();
    for prop in props {
        if let Some(group) = prop.group() {
            groups.push(group, prop.key());
        }
    }

    Some(groups)
}

/// Keys of mergeable props, minus those the client asked to reset.
pub(crate) fn make_merge_props(props: &[Prop], reset: &[String]) -> Vec<String> {
    props
        .iter()
        .filter(|p| p.is_mergeable())
        .map(|p| p.key().to_string())
        .filter(|key| !reset.contains(key))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Deferred Groups
// ─────────────────────────────────────────────────────────────────────────────

/// Group name to prop keys, in first-seen group order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeferredGroups(Vec<(String, Vec<String>)>);

impl DeferredGroups {
    pub fn push(&mut self, group: &str, key: &str) {
        match self.0.iter_mut().find(|(g, _)| g == group) {
            Some((_, keys)) => keys.push(key.to_string()),
            None => self.0.push((group.to_string(), vec![key.to_string()])),
        }
    }

    pub fn get(&self, group: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(g, _)| g == group)
            .map(|(_, keys)| keys.as_slice())
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(g, _)| g.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Serialize for DeferredGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (group, keys) in &self.0 {
            map.serialize_entry(group, keys)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for DeferredGroups {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = DeferredGroups;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of group names to prop keys")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut groups = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((group, keys)) = access.next_entry::<String, Vec<String>>()? {
                    groups.push((group, keys));
                }
                Ok(DeferredGroups(groups))
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}
