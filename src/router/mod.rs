//! Middleware-chain routing.
//!
//! # Architecture
//!
//! - **`pattern`**: compiles route templates (`/users/:id`, `/files/(.*)`) into matchers
//! - **`path`**: template normalization and mount-prefix composition
//! - **`node`**: one compiled entry: matcher, tokens, kind, handler
//! - **`registry`**: the [`Router`]: registration, mounting, parameter hooks
//! - **`dispatch`**: the per-request loop that walks the nodes
//! - **`context`**: what handlers see: request, response, params, base URL
//! - **`params`**: named and positional captures
//! - **`handler`**: handler signatures and `attach` targets
//! - **`error`**: setup-time and request-time errors
//!
//! # Example
//!
//! ```
//! use waypoint::http::{Method, Request, StatusCode};
//! use waypoint::router::{Router, Target};
//!
//! let mut users = Router::new();
//! users.get("/:id", |ctx| {
//!     let body = format!("user {} under {}", ctx.param("id").unwrap_or("?"), ctx.base_url());
//!     ctx.text(body);
//!     Ok(())
//! });
//!
//! let mut app = Router::new();
//! app.attach(Target::middleware(|ctx| {
//!     ctx.set_header("X-Served-By", "waypoint");
//!     ctx.next();
//!     Ok(())
//! }));
//! app.attach_at("/users", users);
//!
//! let res = app.dispatch(Request::new(Method::GET, "/users/42"));
//! assert_eq!(res.status, StatusCode::OK);
//! assert_eq!(res.body_text(), "user 42 under /users");
//!
//! let res = app.dispatch(Request::new(Method::GET, "/nope"));
//! assert_eq!(res.status, StatusCode::NOT_FOUND);
//! ```

pub mod context;
mod dispatch;
pub mod error;
pub mod handler;
pub mod node;
pub mod params;
pub mod path;
pub mod pattern;
pub mod registry;

pub use context::Context;
pub use error::{PatternError, RouteError};
pub use handler::{ErrorHandlerFn, HandlerFn, ParamHookFn, Target};
pub use node::{MethodFilter, Node, NodeKind};
pub use params::Params;
pub use pattern::{Pattern, PatternOptions, Token};
pub use registry::Router;
