//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Extensions, Method};
use serde::de::DeserializeOwned;

/// An incoming HTTP request with its body fully collected.
///
/// Middleware hangs per-request values (the authenticated
/// [`Identity`](crate::auth::Identity), for one) off
/// [`extensions`](Request::extensions). They live exactly as long as the
/// request does.
pub struct Request {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
    extensions: Extensions,
}

impl Request {
    /// A bodiless request with no headers. Chain [`header`](Request::header_value)
    /// and [`body`](Request::with_body) setters to fill it in; mostly useful
    /// for driving a [`Router`](crate::Router) in-process.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: HashMap::new(),
            extensions: Extensions::new(),
        }
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            headers: parts.headers,
            body,
            params: HashMap::new(),
            extensions: parts.extensions,
        }
    }

    /// Adds a header. Names or values that are not valid HTTP are dropped.
    pub fn header_value(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Header lookup. Names are case-insensitive; non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub(crate) fn set_body(&mut self, body: Bytes) {
        self.body = body;
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::new(Method::GET, "/").header_value("Authorization", "Bearer abc");
        assert_eq!(req.header("authorization"), Some("Bearer abc"));
        assert_eq!(req.header("AUTHORIZATION"), Some("Bearer abc"));
    }

    #[test]
    fn invalid_header_is_dropped() {
        let req = Request::new(Method::GET, "/").header_value("bad header", "x");
        assert!(req.headers().is_empty());
    }

    #[test]
    fn json_body_parses() {
        #[derive(serde::Deserialize)]
        struct Login { email: String }

        let req = Request::new(Method::POST, "/login").with_body(r#"{"email":"a@b.c"}"#);
        let login: Login = req.json().unwrap();
        assert_eq!(login.email, "a@b.c");
    }
}
