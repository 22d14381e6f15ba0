//! Opaque collaborators the runtime calls into: network and geolocation.
//!
//! Transports are out of scope; applications (and tests) supply
//! implementations of these traits and pass them down explicitly.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Client settings: base URL, default headers and default query parameters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub headers: BTreeMap<String, String>,
    pub params: BTreeMap<String, String>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Absolute URL for `path`, with the default params appended.
    pub fn url(&self, path: &str) -> String {
        let mut url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let mut sep = if url.contains('?') { '&' } else { '?' };
        for (k, v) in &self.params {
            url.push(sep);
            url.push_str(&format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)));
            sep = '&';
        }
        url
    }
}

/// `path` with `pairs` appended as a percent-encoded query string.
pub fn with_query(path: &str, pairs: &[(&str, &str)]) -> String {
    let mut out = path.to_string();
    let mut sep = if path.contains('?') { '&' } else { '?' };
    for (k, v) in pairs {
        out.push(sep);
        out.push_str(&format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)));
        sep = '&';
    }
    out
}

/// Decoded value of `name` in a query string; `None` when absent or not
/// valid UTF-8 once decoded.
pub fn query_param(query: &str, name: &str) -> Option<String> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| urlencoding::decode(k).is_ok_and(|k| k == name))
        .and_then(|(_, v)| urlencoding::decode(v).ok())
        .map(|v| v.into_owned())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub status: u16,
    pub data: Value,
}

impl Response {
    pub fn ok(data: Value) -> Self {
        Self { status: 200, data }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("{method:?} {path} failed with status {status}")]
    Status {
        method: Method,
        path: String,
        status: u16,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type HttpFuture = LocalBoxFuture<'static, Result<Response, HttpError>>;

/// REST client. Implementations resolve paths against their [`ClientConfig`].
pub trait Http {
    fn config(&self) -> &ClientConfig;

    fn request(&self, method: Method, path: &str, body: Option<Value>) -> HttpFuture;

    fn get(&self, path: &str) -> HttpFuture {
        self.request(Method::Get, path, None)
    }

    fn post(&self, path: &str, body: Value) -> HttpFuture {
        self.request(Method::Post, path, Some(body))
    }

    fn patch(&self, path: &str, body: Value) -> HttpFuture {
        self.request(Method::Patch, path, Some(body))
    }

    fn delete(&self, path: &str) -> HttpFuture {
        self.request(Method::Delete, path, None)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, PartialEq, Error)]
#[error("{message}")]
pub struct GeoError {
    pub message: String,
}

impl GeoError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One-shot position lookup. Exactly one of the callbacks is called, at
/// most once, possibly after the call returns.
pub trait Geolocation {
    fn get_current_position(
        &self,
        on_success: Box<dyn FnOnce(Position)>,
        on_error: Box<dyn FnOnce(GeoError)>,
    );
}

/// Shared collaborator handle usable as a prop: equality is identity.
pub struct Service<T: ?Sized>(Rc<T>);

impl<T: ?Sized> Service<T> {
    pub fn from_rc(inner: Rc<T>) -> Self {
        Self(inner)
    }
}

impl<T> Service<T> {
    pub fn new(inner: T) -> Self {
        Self(Rc::new(inner))
    }
}

impl<T: ?Sized> Clone for Service<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: ?Sized> PartialEq for Service<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> Deref for Service<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized> fmt::Debug for Service<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_path_and_default_params() {
        let cfg = ClientConfig::new("https://api.test/v3/")
            .param("part", "snippet")
            .param("maxResults", "5");
        assert_eq!(
            cfg.url("/search?q=cats"),
            "https://api.test/v3/search?q=cats&maxResults=5&part=snippet"
        );
        assert_eq!(
            ClientConfig::new("http://localhost:3001").url("streams"),
            "http://localhost:3001/streams"
        );
    }

    #[test]
    fn query_values_are_percent_encoded() {
        let cfg = ClientConfig::new("https://api.test").param("key", "a&b=c");
        let path = with_query("/search", &[("q", "rock & roll #1")]);
        assert_eq!(path, "/search?q=rock%20%26%20roll%20%231");
        let url = cfg.url(&path);
        assert_eq!(url, "https://api.test/search?q=rock%20%26%20roll%20%231&key=a%26b%3Dc");

        let query = url.split_once('?').map(|(_, q)| q).unwrap();
        assert_eq!(query_param(query, "q").as_deref(), Some("rock & roll #1"));
        assert_eq!(query_param(query, "key").as_deref(), Some("a&b=c"));
        assert_eq!(query_param(query, "missing"), None);
    }

    #[test]
    fn config_deserialises_with_defaults() {
        let cfg: ClientConfig =
            serde_json::from_str(r#"{ "base_url": "http://localhost:3001" }"#).unwrap();
        assert_eq!(cfg, ClientConfig::new("http://localhost:3001"));
    }

    #[test]
    fn decode_errors_surface_as_http_errors() {
        let r = Response::ok(serde_json::json!({ "id": "x" }));
        #[derive(Debug, Deserialize)]
        struct Post {
            #[allow(dead_code)]
            id: u32,
        }
        assert!(matches!(r.json::<Post>(), Err(HttpError::Decode(_))));
    }
}
