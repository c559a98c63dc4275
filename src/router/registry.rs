//! The route registry.
//!
//! A [`Router`] is an ordered, append-only list of [`Node`]s plus the
//! parameter hooks keyed by name. It is built during setup and then only
//! read; share it across workers with `Arc<Router>`.
//!
//! Hooks belong to the router they were registered on. Every node records
//! the [`HookScope`] of its registry, and mounting carries the child's hooks
//! along under fresh scopes, so they only ever run for the child's nodes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::config::{Config, Mode, RouterOptions};
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::router::context::Context;
use crate::router::dispatch::Dispatcher;
use crate::router::error::{PatternError, RouteError};
use crate::router::handler::{HandlerFn, ParamHookFn, Target};
use crate::router::node::{Endpoint, MethodFilter, Node, NodeKind};

/// Identifies the registry whose parameter hooks apply to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct HookScope(u64);

impl HookScope {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        HookScope(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

type HookTable = HashMap<String, Vec<ParamHookFn>>;

#[derive(Clone)]
pub struct Router {
    nodes: Vec<Node>,
    param_hooks: HashMap<HookScope, HookTable>,
    options: RouterOptions,
    mode: Mode,
    scope: HookScope,
}

impl Default for Router {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            param_hooks: HashMap::new(),
            options: RouterOptions::default(),
            mode: Mode::default(),
            scope: HookScope::fresh(),
        }
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RouterOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            options: config.router,
            mode: config.mode,
            ..Self::default()
        }
    }

    pub fn route_options(&self) -> RouterOptions {
        self.options
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// `(method, route, kind)` for every node, in dispatch order.
    pub fn routes(&self) -> Vec<(Option<MethodFilter>, &str, NodeKind)> {
        self.nodes
            .iter()
            .map(|node| (node.method(), node.route(), node.kind()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Attaches middleware, an error handler or a router at the root.
    pub fn attach(&mut self, target: impl Into<Target>) -> &mut Self {
        self.attach_at("/", target)
    }

    /// Attaches middleware, an error handler or a router under `path`.
    ///
    /// Middleware and error handlers match `path` and everything below it.
    /// A router is mounted: each of its current nodes is copied here with
    /// its route rebased under `path`, and its parameter hooks are appended
    /// to this router's. Later changes to that router are not seen here.
    ///
    /// # Panics
    ///
    /// Panics if a route cannot be compiled. See [`Router::try_attach_at`].
    pub fn attach_at(&mut self, path: &str, target: impl Into<Target>) -> &mut Self {
        self.try_attach_at(path, target)
            .unwrap_or_else(|e| panic!("failed to attach at `{path}`: {e}"))
    }

    pub fn try_attach_at(
        &mut self,
        path: &str,
        target: impl Into<Target>,
    ) -> Result<&mut Self, PatternError> {
        match target.into() {
            Target::Middleware(handler) => self.push(path, Endpoint::Middleware(handler))?,
            Target::ErrorHandler(handler) => self.push(path, Endpoint::Error(handler))?,
            Target::Router(child) => self.mount(path, child)?,
        }
        Ok(self)
    }

    /// Registers a handler for `method` requests to `path`.
    ///
    /// # Panics
    ///
    /// Panics if `path` cannot be compiled. See [`Router::try_handle`].
    pub fn handle<F>(&mut self, method: Method, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> Result<(), RouteError> + Send + Sync + 'static,
    {
        self.route(MethodFilter::Only(method), path, handler)
    }

    pub fn try_handle(
        &mut self,
        filter: MethodFilter,
        path: &str,
        handler: HandlerFn,
    ) -> Result<&mut Self, PatternError> {
        self.push(path, Endpoint::Route(filter, handler))?;
        Ok(self)
    }

    pub fn get<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> Result<(), RouteError> + Send + Sync + 'static,
    {
        self.handle(Method::GET, path, handler)
    }

    pub fn head<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> Result<(), RouteError> + Send + Sync + 'static,
    {
        self.handle(Method::HEAD, path, handler)
    }

    pub fn post<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> Result<(), RouteError> + Send + Sync + 'static,
    {
        self.handle(Method::POST, path, handler)
    }

    pub fn put<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> Result<(), RouteError> + Send + Sync + 'static,
    {
        self.handle(Method::PUT, path, handler)
    }

    pub fn patch<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> Result<(), RouteError> + Send + Sync + 'static,
    {
        self.handle(Method::PATCH, path, handler)
    }

    pub fn delete<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> Result<(), RouteError> + Send + Sync + 'static,
    {
        self.handle(Method::DELETE, path, handler)
    }

    pub fn options<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> Result<(), RouteError> + Send + Sync + 'static,
    {
        self.handle(Method::OPTIONS, path, handler)
    }

    /// Registers a handler for every method.
    pub fn all<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> Result<(), RouteError> + Send + Sync + 'static,
    {
        self.route(MethodFilter::Any, path, handler)
    }

    /// Registers a hook for the named parameter `name`.
    ///
    /// Hooks for one name run in registration order, before the handler of
    /// the first node that captures a new value for that name. A value seen
    /// again later in the same request does not re-run them.
    ///
    /// Hooks apply to this router's own routes, including those registered
    /// before the hook. Routers mounted here keep their own hooks.
    pub fn param<F>(&mut self, name: &str, hook: F) -> &mut Self
    where
        F: Fn(&mut Context, &str) -> Result<(), RouteError> + Send + Sync + 'static,
    {
        self.param_hooks
            .entry(self.scope)
            .or_default()
            .entry(name.to_string())
            .or_default()
            .push(Arc::new(hook));
        self
    }

    pub(crate) fn hooks_for(&self, scope: HookScope, name: &str) -> &[ParamHookFn] {
        self.param_hooks
            .get(&scope)
            .and_then(|table| table.get(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Runs `request` through the chain and returns the response.
    pub fn dispatch(&self, request: Request) -> Response {
        let mut ctx = Context::new(request);
        self.handle_context(&mut ctx);
        ctx.into_response()
    }

    /// Runs the chain against a caller-owned context.
    pub fn handle_context(&self, ctx: &mut Context) {
        Dispatcher::new(self).run(ctx);
    }

    fn route<F>(&mut self, filter: MethodFilter, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) -> Result<(), RouteError> + Send + Sync + 'static,
    {
        self.try_handle(filter, path, Arc::new(handler))
            .unwrap_or_else(|e| panic!("failed to register `{path}`: {e}"))
    }

    fn push(&mut self, path: &str, endpoint: Endpoint) -> Result<(), PatternError> {
        let node = Node::new(path, endpoint, self.options, self.scope)?;
        if self.mode == Mode::Debug {
            debug!(
                kind = ?node.kind(),
                method = ?node.method(),
                route = node.route(),
                "registered route"
            );
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Copies `child`'s nodes under `prefix`. Nothing is added unless every
    /// node rebases cleanly.
    ///
    /// Each scope found in the child gets a fresh scope here, so two mounts
    /// of the same router never share hook tables.
    fn mount(&mut self, prefix: &str, child: Router) -> Result<(), PatternError> {
        let mut remap: HashMap<HookScope, HookScope> = HashMap::new();
        let rebased = child
            .nodes
            .iter()
            .map(|node| {
                let scope = *remap.entry(node.scope()).or_insert_with(HookScope::fresh);
                node.rebase(prefix, scope)
            })
            .collect::<Result<Vec<_>, _>>()?;

        if self.mode == Mode::Debug {
            debug!(prefix, routes = rebased.len(), "mounted router");
        }
        self.nodes.extend(rebased);

        for (scope, table) in child.param_hooks {
            if let Some(fresh) = remap.get(&scope) {
                self.param_hooks.insert(*fresh, table);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("nodes", &self.nodes)
            .field(
                "param_hooks",
                &self
                    .param_hooks
                    .get(&self.scope)
                    .map(|table| table.keys().collect::<Vec<_>>())
                    .unwrap_or_default(),
            )
            .field("options", &self.options)
            .field("mode", &self.mode)
            .finish()
    }
}
