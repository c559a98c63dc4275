//! Handler capabilities and `attach` targets.

use std::sync::Arc;

use crate::router::context::Context;
use crate::router::error::RouteError;
use crate::router::registry::Router;

/// Middleware and route handlers.
///
/// Returning `Err` hands the error to the next matching error handler,
/// exactly like calling [`Context::next_with`].
pub type HandlerFn = Arc<dyn Fn(&mut Context) -> Result<(), RouteError> + Send + Sync>;

/// Error handlers receive the pending error. They resolve it by writing a
/// response, or pass it on with [`Context::next_with`] (or clear it with
/// [`Context::next`]).
pub type ErrorHandlerFn =
    Arc<dyn Fn(RouteError, &mut Context) -> Result<(), RouteError> + Send + Sync>;

/// Parameter hooks receive the captured value of the parameter they were
/// registered for.
pub type ParamHookFn = Arc<dyn Fn(&mut Context, &str) -> Result<(), RouteError> + Send + Sync>;

/// What [`Router::attach`] can register.
///
/// The kind is fixed here, at registration, and never inspected again
/// while serving.
pub enum Target {
    Middleware(HandlerFn),
    ErrorHandler(ErrorHandlerFn),
    /// Mounted by copying its routes; see [`Router::attach_at`].
    Router(Router),
}

impl Target {
    pub fn middleware<F>(handler: F) -> Self
    where
        F: Fn(&mut Context) -> Result<(), RouteError> + Send + Sync + 'static,
    {
        Target::Middleware(Arc::new(handler))
    }

    pub fn error_handler<F>(handler: F) -> Self
    where
        F: Fn(RouteError, &mut Context) -> Result<(), RouteError> + Send + Sync + 'static,
    {
        Target::ErrorHandler(Arc::new(handler))
    }
}

impl From<Router> for Target {
    fn from(router: Router) -> Self {
        Target::Router(router)
    }
}

/// Mounting by reference takes a snapshot of the router's current routes.
impl From<&Router> for Target {
    fn from(router: &Router) -> Self {
        Target::Router(router.clone())
    }
}
