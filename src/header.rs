//! Protocol headers and request classification
//!
//! Header names follow https://inertiajs.com/the-protocol. Every inbound
//! header is read once into a [`RequestInfo`], which the resolver and the
//! renderer consult instead of touching the raw header map.

use std::borrow::Cow;

use axum::extract::OriginalUri;
use axum::http::{request::Parts, Extensions, HeaderMap, HeaderName, Method, Uri};

/// Header name constants (lowercase, as `http` stores them).
pub mod names {
    use axum::http::HeaderName;

    /// Marks a request or response as protocol-aware (client/server).
    pub const X_INERTIA: HeaderName = HeaderName::from_static("x-inertia");
    /// Asset version cached by the client.
    pub const X_INERTIA_VERSION: HeaderName = HeaderName::from_static("x-inertia-version");
    /// Forced full-page navigation target (server).
    pub const X_INERTIA_LOCATION: HeaderName = HeaderName::from_static("x-inertia-location");
    /// Whitelist of prop keys for a partial reload.
    pub const X_INERTIA_PARTIAL_DATA: HeaderName =
        HeaderName::from_static("x-inertia-partial-data");
    /// Blacklist of prop keys for a partial reload.
    pub const X_INERTIA_PARTIAL_EXCEPT: HeaderName =
        HeaderName::from_static("x-inertia-partial-except");
    /// Component targeted by a partial reload.
    pub const X_INERTIA_PARTIAL_COMPONENT: HeaderName =
        HeaderName::from_static("x-inertia-partial-component");
    /// Prop keys the client wants replaced instead of merged.
    pub const X_INERTIA_RESET: HeaderName = HeaderName::from_static("x-inertia-reset");
    /// Error bag the client expects validation errors under.
    pub const X_INERTIA_ERROR_BAG: HeaderName = HeaderName::from_static("x-inertia-error-bag");
}

/// The error bag used when the client does not name one.
pub const DEFAULT_ERROR_BAG: &str = "";

/// Protocol view of an inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub method: Method,
    /// Path and query, echoed into `Page.url`.
    pub url: String,
    pub inertia: bool,
    pub version: Option<String>,
    pub partial_component: Option<String>,
    pub partial_data: Vec<String>,
    pub partial_except: Vec<String>,
    pub reset: Vec<String>,
    pub error_bag: String,
    pub referer: Option<String>,
}

impl RequestInfo {
    /// Classify a request from its head.
    pub fn from_parts(parts: &Parts) -> Self {
        let url = request_url(&parts.extensions, &parts.uri);
        Self::from_headers(parts.method.clone(), url, &parts.headers)
    }

    pub fn from_headers(method: Method, url: String, headers: &HeaderMap) -> Self {
        Self {
            method,
            url,
            inertia: is_inertia_request(headers),
            version: header_str(headers, &names::X_INERTIA_VERSION).map(Cow::into_owned),
            partial_component: header_str(headers, &names::X_INERTIA_PARTIAL_COMPONENT)
                .map(Cow::into_owned),
            partial_data: header_list(headers, &names::X_INERTIA_PARTIAL_DATA),
            partial_except: header_list(headers, &names::X_INERTIA_PARTIAL_EXCEPT),
            reset: header_list(headers, &names::X_INERTIA_RESET),
            error_bag: header_str(headers, &names::X_INERTIA_ERROR_BAG)
                .map(Cow::into_owned)
                .unwrap_or_else(|| DEFAULT_ERROR_BAG.to_string()),
            referer: header_str(headers, &axum::http::header::REFERER).map(Cow::into_owned),
        }
    }

    /// True when this is a partial reload of exactly `component` (case-sensitive).
    pub fn is_partial_for(&self, component: &str) -> bool {
        self.partial_component.as_deref() == Some(component)
    }
}

/// Path and query the client asked for.
///
/// Nested routers strip their prefix from the request URI; the original one
/// is kept in the extensions.
pub(crate) fn request_url(extensions: &Extensions, uri: &Uri) -> String {
    let uri = extensions.get::<OriginalUri>().map(|o| &o.0).unwrap_or(uri);
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}

/// Check if the request was made by the client-side runtime.
pub fn is_inertia_request(headers: &HeaderMap) -> bool {
    header_str(headers, &names::X_INERTIA).as_deref() == Some("true")
}

/// Split a comma-separated header value, trimming each entry.
///
/// An empty header yields an empty list. Order is kept and entries are not
/// deduplicated; empty entries between commas survive as empty strings.
pub fn extract_header_value_list(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }

    value.split(',').map(|f| f.trim().to_string()).collect()
}

/// Header value as text; bytes outside UTF-8 are replaced, never dropped.
fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<Cow<'a, str>> {
    headers.get(name).map(|v| String::from_utf8_lossy(v.as_bytes()))
}

fn header_list(headers: &HeaderMap, name: &HeaderName) -> Vec<String> {
    header_str(headers, name)
        .map(|value| extract_header_value_list(&value))
        .unwrap_or_default()
}
