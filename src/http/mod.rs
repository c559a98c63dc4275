//! HTTP message types.
//!
//! The router never touches a socket. It consumes a [`request::Request`]
//! and produces a [`response::Response`]; whatever transport sits in front
//! of it converts to and from these.
//!
//! - **`request`**: method, path/query split and header lookup
//! - **`response`**: status codes, response builder and HTTP/1.1 serialization

pub mod request;
pub mod response;

pub use request::{Method, Request, RequestBuilder};
pub use response::{Response, ResponseBuilder, StatusCode};
