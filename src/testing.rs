//! Request builder for tests, mirroring the protocol headers.

use axum::body::Body;
use axum::http::{request::Parts, HeaderName, HeaderValue, Method, Request};

use crate::header::{names, RequestInfo};

pub(crate) struct TestRequest {
    method: Method,
    uri: String,
    headers: Vec<(HeaderName, String)>,
}

impl TestRequest {
    pub(crate) fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            headers: Vec::new(),
        }
    }

    pub(crate) fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub(crate) fn header(mut self, name: HeaderName, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }

    pub(crate) fn inertia(self) -> Self {
        self.header(names::X_INERTIA, "true")
    }

    pub(crate) fn version(self, version: &str) -> Self {
        self.header(names::X_INERTIA_VERSION, version)
    }

    pub(crate) fn partial(self, component: &str) -> Self {
        self.header(names::X_INERTIA_PARTIAL_COMPONENT, component)
    }

    pub(crate) fn only(self, keys: &[&str]) -> Self {
        let value = keys.join(",");
        self.header(names::X_INERTIA_PARTIAL_DATA, &value)
    }

    pub(crate) fn except(self, keys: &[&str]) -> Self {
        let value = keys.join(",");
        self.header(names::X_INERTIA_PARTIAL_EXCEPT, &value)
    }

    pub(crate) fn reset(self, keys: &[&str]) -> Self {
        let value = keys.join(",");
        self.header(names::X_INERTIA_RESET, &value)
    }

    pub(crate) fn error_bag(self, bag: &str) -> Self {
        self.header(names::X_INERTIA_ERROR_BAG, bag)
    }

    pub(crate) fn request(self) -> Request<Body> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        for (name, value) in self.headers {
            builder = builder.header(name, HeaderValue::from_str(&value).unwrap());
        }
        builder.body(Body::empty()).unwrap()
    }

    pub(crate) fn parts(self) -> Parts {
        self.request().into_parts().0
    }

    pub(crate) fn info(self) -> RequestInfo {
        RequestInfo::from_parts(&self.parts())
    }
}

/// Read a response body to a string.
pub(crate) async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
