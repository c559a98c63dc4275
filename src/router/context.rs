//! Per-request context.
//!
//! A [`Context`] owns the request being dispatched and the response being
//! built. The dispatcher writes parameters and the base URL into it before
//! each handler runs; handlers use it to read those, write the response,
//! pass data downstream, and decide whether the chain continues.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use bytes::Bytes;

use crate::http::request::{Method, Request};
use crate::http::response::{Response, StatusCode};
use crate::router::error::RouteError;
use crate::router::params::Params;

/// What a handler asked for when it returned.
#[derive(Debug, Default)]
pub(crate) enum Flow {
    /// End the chain here.
    #[default]
    Stop,
    /// Resume matching at the next node, optionally carrying an error.
    Next(Option<RouteError>),
}

pub struct Context {
    request: Request,
    response: Response,
    params: Params,
    base_url: String,
    finished: bool,
    values: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    flow: Flow,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Response::default(),
            params: Params::new(),
            base_url: String::new(),
            finished: false,
            values: HashMap::new(),
            flow: Flow::Stop,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    pub fn method(&self) -> Method {
        self.request.method
    }

    pub fn path(&self) -> &str {
        &self.request.path
    }

    /// Named route parameter of the node currently running.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Positional capture, e.g. the remainder matched by a wildcard.
    pub fn wildcard(&self, index: usize) -> Option<&str> {
        self.params.positional(index)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The request path prefix consumed by the mounts above the running
    /// node. Empty for nodes registered directly on the dispatching router.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    pub fn into_response(self) -> Response {
        self.response
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.response.status = status;
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.response.headers.insert(key.into(), value.into());
    }

    /// Writes status and body and marks the response finished.
    pub fn send(&mut self, status: StatusCode, body: impl Into<Bytes>) {
        self.response.status = status;
        self.response.set_body(body);
        self.finished = true;
    }

    /// Sends a `200 OK` plain-text body.
    pub fn text(&mut self, body: impl Into<Bytes>) {
        self.set_header("Content-Type", "text/plain; charset=utf-8");
        self.send(StatusCode::OK, body);
    }

    /// Whether some handler already produced the response.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Stores a request-scoped value, one per type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.values
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Continues with the next matching node once this handler returns.
    pub fn next(&mut self) {
        self.flow = Flow::Next(None);
    }

    /// Continues with the next matching error handler, passing `err`.
    pub fn next_with(&mut self, err: RouteError) {
        self.flow = Flow::Next(Some(err));
    }

    pub(crate) fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    pub(crate) fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    pub(crate) fn take_flow(&mut self) -> Flow {
        std::mem::take(&mut self.flow)
    }
}
