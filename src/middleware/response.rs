//! Outbound response handling: redirects and the draft/commit step

use axum::body::{Body, HttpBody};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::Response;
use tracing::debug;

use super::MiddlewareConfig;
use crate::error::{InertiaError, Result};
use crate::header::{names, RequestInfo};

/// Methods whose 302 responses are upgraded to 303.
///
/// https://inertiajs.com/redirects#303-response-code
const SEE_OTHER_METHODS: [Method; 3] = [Method::PATCH, Method::PUT, Method::DELETE];

/// A downstream response that has not been committed yet.
///
/// Status decisions made by the handler can still be revised here. The draft
/// is consumed by [`Draft::commit`], so it is committed exactly once.
#[derive(Debug)]
pub(crate) struct Draft {
    response: Response,
}

impl Draft {
    pub(crate) fn new(response: Response) -> Self {
        Self { response }
    }

    /// A plain 200 without a single body byte: the handler never wrote.
    fn is_empty(&self) -> bool {
        self.response.status() == StatusCode::OK
            && self.response.body().size_hint().exact() == Some(0)
    }

    pub(crate) fn commit(mut self, request: &RequestInfo, config: &MiddlewareConfig) -> Response {
        if self.response.status() == StatusCode::FOUND
            && SEE_OTHER_METHODS.contains(&request.method)
        {
            debug!(method = %request.method, url = %request.url, "Upgrading 302 redirect to 303");
            *self.response.status_mut() = StatusCode::SEE_OTHER;
        }

        if self.is_empty() {
            debug!(url = %request.url, "Handler produced an empty response");
            return (config.empty_response)(request);
        }

        self.response
    }
}

/// Default handler for empty responses: `204 No Content`.
pub(crate) fn no_content(_request: &RequestInfo) -> Response {
    let mut res = Response::new(Body::empty());
    *res.status_mut() = StatusCode::NO_CONTENT;
    res
}

/// Force a full-page visit to `url`.
///
/// Protocol requests get `409 Conflict` with `X-Inertia-Location`; the client
/// runtime turns it into `window.location` navigation. Anything else gets a
/// plain `302 Found`.
pub fn location(request: &RequestInfo, url: &str) -> Result<Response> {
    let value = header_value(url)?;

    if request.inertia {
        return Ok(with_header(StatusCode::CONFLICT, names::X_INERTIA_LOCATION, value));
    }

    Ok(with_header(StatusCode::FOUND, header::LOCATION, value))
}

/// Redirect after a request: `302` for GET, `303` for everything else.
pub fn redirect(method: &Method, url: &str) -> Result<Response> {
    let status = if method == Method::GET {
        StatusCode::FOUND
    } else {
        StatusCode::SEE_OTHER
    };

    debug!("Redirecting to {} with status code {}", url, status.as_u16());
    Ok(with_header(status, header::LOCATION, header_value(url)?))
}

/// Redirect to the referring page, or `fallback` without a `Referer`.
pub fn redirect_back(request: &RequestInfo, fallback: &str) -> Result<Response> {
    let target = request.referer.as_deref().unwrap_or(fallback);
    redirect(&request.method, target)
}

/// True for responses produced by [`location`] on a protocol request.
pub(crate) fn is_location(response: &Response) -> bool {
    response.status() == StatusCode::CONFLICT
        && response.headers().contains_key(names::X_INERTIA_LOCATION)
}

fn header_value(url: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(url).map_err(|_| InertiaError::InvalidHeaderValue(url.to_string()))
}

fn with_header(status: StatusCode, name: header::HeaderName, value: HeaderValue) -> Response {
    let mut res = Response::new(Body::empty());
    *res.status_mut() = status;
    res.headers_mut().insert(name, value);
    res
}
