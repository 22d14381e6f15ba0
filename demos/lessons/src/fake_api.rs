//! In-memory REST backend. Collections of JSON objects keyed by `id`,
//! answering the same verbs a json-server would.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::ready;
use serde_json::{Map, Value};
use trellis_core::prelude::*;

#[derive(Default)]
struct Backend {
    collections: BTreeMap<String, Vec<Value>>,
    requests: Vec<String>,
    failures: BTreeMap<String, u16>,
    envelopes: BTreeMap<String, String>,
    required_headers: BTreeMap<String, String>,
    offline: bool,
}

#[derive(Clone)]
pub struct FakeApi {
    config: ClientConfig,
    backend: Rc<RefCell<Backend>>,
}

fn id_of(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

impl FakeApi {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            backend: Rc::default(),
        }
    }

    /// Replaces a collection's contents.
    pub fn seed(&self, collection: &str, items: Vec<Value>) {
        self.backend
            .borrow_mut()
            .collections
            .insert(collection.to_string(), items);
    }

    pub fn with(self, collection: &str, items: Vec<Value>) -> Self {
        self.seed(collection, items);
        self
    }

    pub fn collection(&self, name: &str) -> Vec<Value> {
        self.backend
            .borrow()
            .collections
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Every request seen so far, as `"Get /posts"`.
    pub fn requests(&self) -> Vec<String> {
        self.backend.borrow().requests.clone()
    }

    /// The next request for `path` (query excluded) answers `status`.
    pub fn fail_next(&self, path: &str, status: u16) {
        self.backend
            .borrow_mut()
            .failures
            .insert(path.to_string(), status);
    }

    /// Lists of `collection` come back as `{ "<field>": [...], "total": n }`.
    pub fn enveloped(self, collection: &str, field: &str) -> Self {
        self.backend
            .borrow_mut()
            .envelopes
            .insert(collection.to_string(), field.to_string());
        self
    }

    /// Requests whose client config lacks this header answer 401.
    pub fn require_header(self, name: &str, value: &str) -> Self {
        self.backend
            .borrow_mut()
            .required_headers
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.backend.borrow_mut().offline = offline;
    }

    pub fn service(&self) -> Service<dyn Http> {
        Service::from_rc(Rc::new(self.clone()) as Rc<dyn Http>)
    }

    fn handle(&self, method: Method, path: &str, body: Option<Value>) -> Result<Response, HttpError> {
        let mut backend = self.backend.borrow_mut();
        backend.requests.push(format!("{method:?} {path}"));
        log::debug!("{method:?} {}", self.config.url(path));
        if backend.offline {
            return Err(HttpError::Transport("network unreachable".into()));
        }
        let (route, query) = path.split_once('?').unwrap_or((path, ""));
        let status_err = |status| HttpError::Status {
            method,
            path: route.to_string(),
            status,
        };
        let authorized = backend
            .required_headers
            .iter()
            .all(|(name, value)| self.config.headers.get(name) == Some(value));
        if !authorized {
            return Err(status_err(401));
        }
        if let Some(status) = backend.failures.remove(route) {
            return Err(status_err(status));
        }

        // a collection may be named by a nested path such as `search/photos`
        let trimmed = route.trim_matches('/');
        let (name, id) = if backend.collections.contains_key(trimmed) {
            (trimmed, None)
        } else {
            let mut parts = trimmed.split('/');
            (parts.next().unwrap_or_default(), parts.next())
        };
        let envelope = backend.envelopes.get(name).cloned();
        let items = backend
            .collections
            .get_mut(name)
            .ok_or_else(|| status_err(404))?;

        match (method, id) {
            (Method::Get, None) => {
                let term = query_param(query, "q")
                    .or_else(|| query_param(query, "query"))
                    .map(|t| t.to_lowercase());
                let found: Vec<Value> = items
                    .iter()
                    .filter(|item| match &term {
                        Some(t) => ["title", "description"].iter().any(|field| {
                            item.get(*field)
                                .and_then(Value::as_str)
                                .is_some_and(|text| text.to_lowercase().contains(t.as_str()))
                        }),
                        None => true,
                    })
                    .cloned()
                    .collect();
                let data = match envelope {
                    Some(field) => {
                        let total = found.len();
                        let mut body = Map::new();
                        body.insert(field, Value::Array(found));
                        body.insert("total".into(), Value::from(total));
                        Value::Object(body)
                    }
                    None => Value::Array(found),
                };
                Ok(Response::ok(data))
            }
            (Method::Get, Some(id)) => items
                .iter()
                .find(|item| id_of(item).as_deref() == Some(id))
                .cloned()
                .map(Response::ok)
                .ok_or_else(|| status_err(404)),
            (Method::Post, None) => {
                let Some(Value::Object(mut fields)) = body else {
                    return Err(status_err(400));
                };
                let next = items
                    .iter()
                    .filter_map(|item| item.get("id").and_then(Value::as_u64))
                    .max()
                    .unwrap_or(0)
                    + 1;
                fields.insert("id".into(), Value::from(next));
                let created = Value::Object(fields);
                items.push(created.clone());
                Ok(Response {
                    status: 201,
                    data: created,
                })
            }
            (Method::Patch, Some(id)) => {
                let Some(Value::Object(changes)) = body else {
                    return Err(status_err(400));
                };
                let item = items
                    .iter_mut()
                    .find(|item| id_of(item).as_deref() == Some(id))
                    .ok_or_else(|| status_err(404))?;
                if let Value::Object(fields) = &mut *item {
                    merge(fields, changes);
                }
                Ok(Response::ok(item.clone()))
            }
            (Method::Delete, Some(id)) => {
                let before = items.len();
                items.retain(|item| id_of(item).as_deref() != Some(id));
                if items.len() == before {
                    return Err(status_err(404));
                }
                Ok(Response::ok(Value::Null))
            }
            _ => Err(status_err(405)),
        }
    }
}

fn merge(fields: &mut Map<String, Value>, changes: Map<String, Value>) {
    for (k, v) in changes {
        if k != "id" {
            fields.insert(k, v);
        }
    }
}

impl Http for FakeApi {
    fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str, body: Option<Value>) -> HttpFuture {
        ready(self.handle(method, path, body)).boxed_local()
    }
}
