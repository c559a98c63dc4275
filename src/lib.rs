//! Waypoint - middleware-chain HTTP router
//!
//! Matches requests against an ordered list of routes, middleware and error
//! handlers, and runs the matching ones as a chain where each step decides
//! whether the next one runs.

pub mod config;
pub mod http;
pub mod logging;
pub mod router;

pub use config::{Config, Mode, RouterOptions};
pub use router::{Context, RouteError, Router, Target};
