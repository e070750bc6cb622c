//! Protocol middleware
//!
//! Per request, in order:
//! 1. attach the renderer and the request scope to the request extensions;
//! 2. pass plain navigations straight through;
//! 3. answer an outdated client version with a forced full reload;
//! 4. run the handler and commit its response as a [`Draft`]: 302 becomes 303
//!    for PATCH/PUT/DELETE, and an empty response is replaced.
//!
//! `X-Inertia` is appended to `Vary` on every response except location responses.

mod extract;
mod response;

pub use extract::{Inertia, MissingRenderer};
pub use response::{location, redirect, redirect_back};

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::Route;
use tokio_util::sync::CancellationToken;
use tower::{Layer, Service};
use tracing::{debug, warn};

use self::response::Draft;
use crate::header::{request_url, RequestInfo};
use crate::render::Renderer;

/// Builds a response for a request the middleware answers itself.
pub type ResponseHandler = Arc<dyn Fn(&RequestInfo) -> Response + Send + Sync>;

/// Hooks for the responses the middleware produces on its own.
#[derive(Clone)]
pub struct MiddlewareConfig {
    /// Called when the handler produced an empty 200. Defaults to `204`.
    pub empty_response: ResponseHandler,
    /// Called on a version mismatch. Defaults to a location response to the
    /// request URL.
    pub on_version_mismatch: ResponseHandler,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            empty_response: Arc::new(response::no_content),
            on_version_mismatch: Arc::new(reload),
        }
    }
}

impl fmt::Debug for MiddlewareConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareConfig").finish_non_exhaustive()
    }
}

fn reload(request: &RequestInfo) -> Response {
    match location(request, &request.url) {
        Ok(res) => res,
        Err(e) => {
            warn!("Failed to build reload response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Request-scoped state shared with the [`Inertia`] extractor.
#[derive(Debug, Clone)]
pub(crate) struct RequestScope {
    pub(crate) request: Arc<RequestInfo>,
    pub(crate) cancel: CancellationToken,
}

async fn inertia_middleware_handler(
    State(layer): State<InertiaLayer>,
    req: Request,
    next: Next,
) -> Response {
    layer.handle(req, next).await
}

/// The protocol middleware, bound to one renderer.
#[derive(Clone, Debug)]
pub struct InertiaLayer {
    renderer: Arc<Renderer>,
    config: MiddlewareConfig,
}

impl InertiaLayer {
    pub fn new(renderer: Arc<Renderer>) -> Self {
        Self::with_config(renderer, MiddlewareConfig::default())
    }

    pub fn with_config(renderer: Arc<Renderer>, config: MiddlewareConfig) -> Self {
        Self { renderer, config }
    }

    pub fn renderer(&self) -> &Arc<Renderer> {
        &self.renderer
    }

    /// The tower layer to mount on a router.
    pub fn middleware(
        &self,
    ) -> impl Layer<
        Route,
        Service = impl Service<
            Request,
            Response = Response,
            Error = Infallible,
            Future = impl Send + 'static,
        > + Clone + Send + Sync + 'static,
    > + Clone {
        axum::middleware::from_fn_with_state(self.clone(), inertia_middleware_handler)
    }

    async fn handle(&self, mut req: Request, next: Next) -> Response {
        let url = request_url(req.extensions(), req.uri());
        let request = Arc::new(RequestInfo::from_headers(
            req.method().clone(),
            url,
            req.headers(),
        ));

        // Cancelled if the handler future is dropped before it completes.
        let cancel = CancellationToken::new();
        let guard = cancel.clone().drop_guard();

        req.extensions_mut().insert(self.renderer.clone());
        req.extensions_mut().insert(RequestScope {
            request: request.clone(),
            cancel,
        });

        if !request.inertia {
            let res = next.run(req).await;
            guard.disarm();
            return with_vary(res);
        }

        if let Some(version) = request.version.as_deref() {
            if version != self.renderer.version() {
                debug!(
                    client = version,
                    server = self.renderer.version(),
                    url = %request.url,
                    "Asset version mismatch, forcing reload"
                );
                guard.disarm();
                return with_vary((self.config.on_version_mismatch)(&*request));
            }
        }

        let draft = Draft::new(next.run(req).await);
        guard.disarm();
        with_vary(draft.commit(&request, &self.config))
    }
}

/// Append `X-Inertia` to `Vary`, keeping whatever the handler listed.
fn with_vary(mut res: Response) -> Response {
    if response::is_location(&res) {
        return res;
    }

    let listed = res.headers().get_all(header::VARY).iter().any(|value| {
        String::from_utf8_lossy(value.as_bytes())
            .split(',')
            .map(str::trim)
            .any(|token| token == "*" || token.eq_ignore_ascii_case("x-inertia"))
    });
    if !listed {
        res.headers_mut()
            .append(header::VARY, HeaderValue::from_static("X-Inertia"));
    }
    res
}
