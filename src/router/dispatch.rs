//! The per-request dispatch loop.
//!
//! A [`Dispatcher`] walks the router's nodes with an explicit cursor. Each
//! handler decides, through its [`Context`], whether the walk continues and
//! whether it continues with an error. The walk is a flat loop, so long
//! chains cost no stack.
//!
//! ```text
//!   cursor ──► node matches path? ── no ──► advance
//!                    │ yes
//!                    ▼
//!           error pending? ── yes ──► error handler? ── no ──► advance
//!                    │ no                 │ yes
//!                    ▼                    ▼
//!     middleware / method matches?    run handler(err)
//!          │ yes          │ no            │
//!          ▼              └──► advance    │
//!     param hooks, run handler            │
//!          │                              │
//!          ▼                              ▼
//!     next() / next_with(e) / Err / panic ──► advance (with error)
//!     return without next ──────────────────► done
//!
//!   end of list ──► pending error ? default error response : 404
//! ```

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, debug_span, error, trace, warn};

use crate::http::response::StatusCode;
use crate::router::context::{Context, Flow};
use crate::router::error::RouteError;
use crate::router::handler::HandlerFn;
use crate::router::node::{Endpoint, Hit, Node};
use crate::router::registry::{HookScope, Router};

const GENERIC_ERROR: &str = "Internal Server Error";

/// State for dispatching one request. Never shared between requests.
pub(crate) struct Dispatcher<'r> {
    router: &'r Router,
    cursor: usize,
    /// Last value each named parameter had when a registry's hooks for it
    /// ran.
    seen: HashMap<(HookScope, String), String>,
    pending: Option<RouteError>,
}

impl<'r> Dispatcher<'r> {
    pub(crate) fn new(router: &'r Router) -> Self {
        Self {
            router,
            cursor: 0,
            seen: HashMap::new(),
            pending: None,
        }
    }

    pub(crate) fn run(mut self, ctx: &mut Context) {
        let path = ctx.path().to_string();
        let method = ctx.method();
        let _span = debug_span!("dispatch", %method, path = %path).entered();

        let router = self.router;
        let nodes = router.nodes();
        while let Some(node) = nodes.get(self.cursor) {
            self.cursor += 1;

            let Some(hit) = node.matches(&path) else {
                continue;
            };

            let flow = match (self.pending.take(), node.endpoint()) {
                (Some(err), Endpoint::Error(handler)) => {
                    trace!(route = node.route(), error = %err, "error handler matched");
                    self.bind(ctx, node, &hit);
                    self.guard(ctx, |_, ctx| handler(err, ctx))
                }
                (Some(err), _) => {
                    self.pending = Some(err);
                    continue;
                }
                (None, Endpoint::Middleware(handler)) => self.invoke(ctx, node, &hit, handler),
                (None, Endpoint::Route(filter, handler)) if filter.allows(method) => {
                    self.invoke(ctx, node, &hit, handler)
                }
                (None, _) => continue,
            };

            match flow {
                Flow::Stop => return,
                Flow::Next(err) => self.pending = err,
            }
        }

        self.finish(ctx);
    }

    fn invoke(&mut self, ctx: &mut Context, node: &Node, hit: &Hit, handler: &HandlerFn) -> Flow {
        trace!(route = node.route(), kind = ?node.kind(), "node matched");
        let named = self.bind(ctx, node, hit);
        self.guard(ctx, |this, ctx| {
            this.run_hooks(ctx, node.scope(), named)?;
            handler(ctx)
        })
    }

    /// Writes the node's parameters and base URL into the context and
    /// returns the named values it captured.
    fn bind(&self, ctx: &mut Context, node: &Node, hit: &Hit) -> Vec<(String, String)> {
        let extracted = node.extract(hit);
        node.apply(ctx.params_mut(), &extracted);
        ctx.set_base_url(node.base_url(&hit.path).unwrap_or_default());
        extracted.named
    }

    /// Runs the hooks `scope` registered for every parameter whose value
    /// changed since those hooks last ran in this request.
    fn run_hooks(
        &mut self,
        ctx: &mut Context,
        scope: HookScope,
        named: Vec<(String, String)>,
    ) -> Result<(), RouteError> {
        let router = self.router;
        for (name, value) in named {
            let hooks = router.hooks_for(scope, &name);
            if hooks.is_empty() {
                continue;
            }
            let key = (scope, name);
            if self.seen.get(&key) == Some(&value) {
                continue;
            }
            for hook in hooks {
                hook(ctx, &value)?;
            }
            self.seen.insert(key, value);
        }
        Ok(())
    }

    /// Calls into user code, turning `Err` returns and panics into a
    /// pending error for the next node.
    fn guard<F>(&mut self, ctx: &mut Context, call: F) -> Flow
    where
        F: FnOnce(&mut Self, &mut Context) -> Result<(), RouteError>,
    {
        // clear whatever an earlier handler left behind
        ctx.take_flow();

        let result = panic::catch_unwind(AssertUnwindSafe(|| call(self, ctx)));
        let flow = ctx.take_flow();

        match result {
            Ok(Ok(())) => flow,
            Ok(Err(err)) => {
                debug!(error = %err, "handler returned an error");
                Flow::Next(Some(err))
            }
            Err(payload) => {
                let err = RouteError::from_panic(payload);
                warn!(error = %err, "handler panicked");
                Flow::Next(Some(err))
            }
        }
    }

    fn finish(self, ctx: &mut Context) {
        match self.pending {
            Some(err) => respond_error(ctx, err),
            None if !ctx.is_finished() => {
                debug!("no route matched");
                write_text(ctx, StatusCode::NOT_FOUND, "Not Found");
            }
            None => {}
        }
    }
}

/// Default answer for an error nobody handled.
fn respond_error(ctx: &mut Context, err: RouteError) {
    let status = err.status_code();
    if status.is_server_error() {
        error!(status = status.as_u16(), error = %err, "unhandled error");
    } else {
        debug!(status = status.as_u16(), error = %err, "unhandled error");
    }

    match err {
        RouteError::Status { message, .. } => write_text(ctx, status, message),
        RouteError::Opaque(_) => write_text(ctx, status, GENERIC_ERROR),
    }
}

fn write_text(ctx: &mut Context, status: StatusCode, body: impl Into<bytes::Bytes>) {
    ctx.set_header("Content-Type", "text/plain; charset=utf-8");
    ctx.send(status, body);
}
