//! One compiled registry entry.

use std::fmt;

use crate::config::RouterOptions;
use crate::http::request::Method;
use crate::router::error::PatternError;
use crate::router::handler::{ErrorHandlerFn, HandlerFn};
use crate::router::params::Params;
use crate::router::path;
use crate::router::pattern::{self, BaseMatcher, Pattern, Token};
use crate::router::registry::HookScope;

/// Which request methods a route handler answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodFilter {
    Any,
    Only(Method),
}

impl MethodFilter {
    pub fn allows(&self, method: Method) -> bool {
        match self {
            MethodFilter::Any => true,
            MethodFilter::Only(m) => *m == method,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Middleware,
    Handler,
    ErrorHandler,
}

#[derive(Clone)]
pub(crate) enum Endpoint {
    Middleware(HandlerFn),
    Route(MethodFilter, HandlerFn),
    Error(ErrorHandlerFn),
}

impl Endpoint {
    fn kind(&self) -> NodeKind {
        match self {
            Endpoint::Middleware(_) => NodeKind::Middleware,
            Endpoint::Route(..) => NodeKind::Handler,
            Endpoint::Error(_) => NodeKind::ErrorHandler,
        }
    }
}

/// A successful match of a request path against a node.
#[derive(Debug)]
pub(crate) struct Hit {
    /// The path that matched; the request path plus `/` when the node only
    /// matched after the slash retry.
    pub path: String,
    pub captures: Vec<Option<String>>,
}

/// Parameters pulled out of a [`Hit`].
#[derive(Debug, Default)]
pub(crate) struct Extracted {
    pub named: Vec<(String, String)>,
    pub positional: Vec<String>,
}

/// A compiled route: matcher, capture tokens, kind and handler.
///
/// Nodes never change once they are in a router. Mounting creates new
/// nodes via [`Node::rebase`].
#[derive(Clone)]
pub struct Node {
    route: String,
    original_route: String,
    pattern: Pattern,
    original_tokens: Vec<Token>,
    base: Option<BaseMatcher>,
    appended_wildcard: bool,
    options: RouterOptions,
    scope: HookScope,
    endpoint: Endpoint,
}

impl Node {
    pub(crate) fn new(
        template: &str,
        endpoint: Endpoint,
        options: RouterOptions,
        scope: HookScope,
    ) -> Result<Self, PatternError> {
        let normalized = path::normalize(template);
        let appended_wildcard =
            endpoint.kind() != NodeKind::Handler && !path::ends_with_wildcard(&normalized);
        let route = if appended_wildcard {
            path::with_wildcard(&normalized)
        } else {
            normalized
        };

        let pattern = Pattern::compile(&route, options.into())?;
        pattern::ensure_unique_names(&route, pattern.tokens())?;

        Ok(Self {
            original_route: route.clone(),
            original_tokens: pattern.tokens().to_vec(),
            route,
            pattern,
            base: None,
            appended_wildcard,
            options,
            scope,
            endpoint,
        })
    }

    /// Copies this node under `prefix`, recompiling its matcher.
    ///
    /// The copy keeps the original route and tokens, the options it was
    /// registered with, and shares the handler. When the rebased route
    /// differs from the original, its base matcher is the rebased route
    /// without the trailing wildcard, so repeated rebasing nests correctly.
    pub(crate) fn rebase(&self, prefix: &str, scope: HookScope) -> Result<Self, PatternError> {
        let opts = self.options.into();
        let route = path::join(prefix, &self.route);
        let pattern = Pattern::compile(&route, opts)?;

        let base = if route != self.original_route {
            Some(BaseMatcher::compile(path::strip_wildcard(&route), opts)?)
        } else {
            None
        };

        Ok(Self {
            route,
            original_route: self.original_route.clone(),
            pattern,
            original_tokens: self.original_tokens.clone(),
            base,
            appended_wildcard: self.appended_wildcard,
            options: self.options,
            scope,
            endpoint: self.endpoint.clone(),
        })
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// The route as registered, before any mount prefix was applied.
    pub fn original_route(&self) -> &str {
        &self.original_route
    }

    pub fn kind(&self) -> NodeKind {
        self.endpoint.kind()
    }

    /// `None` for middleware and error handlers.
    pub fn method(&self) -> Option<MethodFilter> {
        match &self.endpoint {
            Endpoint::Route(filter, _) => Some(*filter),
            _ => None,
        }
    }

    pub fn tokens(&self) -> &[Token] {
        self.pattern.tokens()
    }

    pub fn original_tokens(&self) -> &[Token] {
        &self.original_tokens
    }

    pub fn appended_wildcard(&self) -> bool {
        self.appended_wildcard
    }

    /// Template of the base matcher, when this node came from a mount.
    pub fn base_template(&self) -> Option<&str> {
        self.base.as_ref().map(BaseMatcher::prefix)
    }

    pub fn options(&self) -> RouterOptions {
        self.options
    }

    /// Which registry's parameter hooks apply to this node.
    pub(crate) fn scope(&self) -> HookScope {
        self.scope
    }

    pub(crate) fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Middleware and error handlers also match `path + "/"`, so that
    /// `/v2` reaches middleware compiled as `/v2/(.*)`.
    pub(crate) fn matches(&self, path: &str) -> Option<Hit> {
        if let Some(captures) = self.pattern.captures(path) {
            return Some(Hit {
                path: path.to_string(),
                captures,
            });
        }

        if self.kind() != NodeKind::Handler && !path::has_trailing_slash(path) {
            let retry = format!("{path}/");
            if let Some(captures) = self.pattern.captures(&retry) {
                return Some(Hit {
                    path: retry,
                    captures,
                });
            }
        }
        None
    }

    /// Pulls named and positional values out of a hit.
    ///
    /// Without `merge_params` only the node's own tokens are reported; they
    /// are the trailing groups of a rebased pattern. With it, every group is
    /// reported, and a later (deeper) name wins over an earlier one.
    pub(crate) fn extract(&self, hit: &Hit) -> Extracted {
        let (tokens, captures) = if self.options.merge_params {
            (self.pattern.tokens(), hit.captures.as_slice())
        } else {
            let skip = hit.captures.len().saturating_sub(self.original_tokens.len());
            (self.original_tokens.as_slice(), &hit.captures[skip..])
        };

        let mut out = Extracted::default();
        for (token, value) in tokens.iter().zip(captures) {
            match token {
                Token::Named(name) => {
                    if let Some(value) = value {
                        out.named.retain(|(n, _)| n != name);
                        out.named.push((name.clone(), value.clone()));
                    }
                }
                Token::Positional(_) => {
                    out.positional.push(value.clone().unwrap_or_default());
                }
            }
        }
        out
    }

    /// Applies extracted values to the request's params.
    ///
    /// Reset mode replaces the whole set; merge mode layers the new values
    /// over what earlier nodes captured.
    pub(crate) fn apply(&self, params: &mut Params, extracted: &Extracted) {
        if !self.options.merge_params {
            *params = Params::new();
        }
        for (name, value) in &extracted.named {
            params.insert(name.clone(), value.clone());
        }
        params.set_positional(extracted.positional.clone());
    }

    /// The prefix consumed by ancestor mounts for the matched path, if any.
    ///
    /// `path` is [`Hit::path`], so middleware matched through the slash
    /// retry sees its own prefix.
    pub(crate) fn base_url(&self, path: &str) -> Option<String> {
        self.base.as_ref()?.consumed(path).map(str::to_string)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("route", &self.route)
            .field("original_route", &self.original_route)
            .field("kind", &self.kind())
            .field("method", &self.method())
            .field("base", &self.base_template())
            .finish()
    }
}
