//! Incoming HTTP request type.
//!
//! The server collects the whole body before dispatch, so a [`Request`] is a
//! body-caching wrapper by construction: middleware can read the URL, the
//! parameter mapping and the raw bytes, and the handler still sees all of
//! them afterwards.

use std::collections::HashMap;
use std::sync::OnceLock;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// An incoming HTTP request with a fully buffered body.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) parameters: OnceLock<Parameters>,
}

impl Request {
    pub(crate) fn new(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            params: HashMap::new(),
            parameters: OnceLock::new(),
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query(&self) -> Option<&str> { self.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }

    /// The buffered body. Reading it never consumes it.
    pub fn body(&self) -> &Bytes { &self.body }

    /// Header lookup; `None` when absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Query-string and form-body parameters, in first-appearance order.
    ///
    /// Decoded on first use and cached for the rest of the request.
    pub fn parameters(&self) -> &Parameters {
        self.parameters
            .get_or_init(|| Parameters::parse(self.uri.query(), &self.headers, &self.body))
    }

    /// The request URL without its query string.
    ///
    /// Built from the absolute request target when the client sent one,
    /// otherwise from the `Host` header. Falls back to the bare path.
    pub fn url(&self) -> String {
        let path = self.uri.path();
        let authority = self
            .uri
            .authority()
            .map(|a| a.as_str())
            .or_else(|| self.header("host"));

        match authority {
            Some(authority) => {
                let scheme = self.uri.scheme_str().unwrap_or("http");
                format!("{scheme}://{authority}{path}")
            }
            None => path.to_owned(),
        }
    }

    pub(crate) fn with_route_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts, body)
    }
}

// ── Parameters ────────────────────────────────────────────────────────────────

/// The decoded parameter mapping of a request.
///
/// Mirrors a servlet container's parameter map: query-string pairs first, then
/// pairs from an `application/x-www-form-urlencoded` body. Keys keep the order
/// they first appeared in; repeated keys accumulate their values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Parameters {
    entries: Vec<(String, Vec<String>)>,
    index: HashMap<String, usize>,
}

impl Parameters {
    fn parse(query: Option<&str>, headers: &HeaderMap, body: &[u8]) -> Self {
        let mut parameters = Self::default();
        if let Some(query) = query {
            parameters.extend(query.as_bytes());
        }
        if is_form(headers) {
            parameters.extend(body);
        }
        parameters
    }

    fn extend(&mut self, input: &[u8]) {
        for (key, value) in url::form_urlencoded::parse(input) {
            self.push(key.into_owned(), value.into_owned());
        }
    }

    fn push(&mut self, key: String, value: String) {
        match self.index.get(&key) {
            Some(&at) => self.entries[at].1.push(value),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, vec![value]));
            }
        }
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }

    /// Every value for `key`, in arrival order.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.index
            .get(key)
            .map(|&at| self.entries[at].1.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_URLENCODED))
}
