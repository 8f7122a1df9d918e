//! Regex-based route matching for litespeed.
//!
//! Every route path compiles to one anchored regex; literal paths are just
//! regexes without capture groups. Routes resolve in registration order,
//! with method filtering, trailing-slash policy, and per-route CORS carried
//! alongside the pattern.

#![forbid(unsafe_code)]

mod pattern;
mod registry;

pub use pattern::{PatternError, RoutePattern};
pub use registry::{
    CorsPolicy, MatchResult, MethodFilter, Route, RouteDef, RouteRegistry, RegistryError,
};
