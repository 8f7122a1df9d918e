//! Route definitions and the ordered route registry.

use crate::pattern::{PatternError, RoutePattern};
use litespeed_core::{Handler, HandlerOutcome, Method, PathArgs, Request};
use std::sync::Arc;

// ============================================================================
// Method filters and CORS
// ============================================================================

/// Which methods a route accepts.
#[derive(Debug, Clone)]
pub enum MethodFilter {
    /// Every method.
    Any,
    /// An explicit allow list.
    Only(Vec<Method>),
}

impl MethodFilter {
    /// Whether `method` passes the filter.
    #[must_use]
    pub fn allows(&self, method: Method) -> bool {
        match self {
            Self::Any => true,
            Self::Only(methods) => methods.contains(&method),
        }
    }

    /// Format as an HTTP header value (`Allow` / CORS allow-methods).
    #[must_use]
    pub fn header_value(&self) -> String {
        match self {
            Self::Any => "*".to_string(),
            Self::Only(methods) => {
                let mut out = String::new();
                for (idx, method) in methods.iter().enumerate() {
                    if idx > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(method.as_str());
                }
                out
            }
        }
    }
}

/// Per-route CORS headers.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    /// `Access-Control-Allow-Origin` value.
    pub origin: String,
    /// `Access-Control-Allow-Methods` value and the methods CORS headers
    /// are attached for.
    pub methods: MethodFilter,
}

// ============================================================================
// Route definition (builder) and compiled routes
// ============================================================================

/// A route under construction. The path defaults to the route name, with
/// `index` mapping to the root.
pub struct RouteDef {
    name: String,
    path: Option<String>,
    methods: MethodFilter,
    no_end_slash: bool,
    cors: Option<CorsPolicy>,
    handler: Handler,
}

impl RouteDef {
    /// Start a route with a unique name and its handler.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Request, &PathArgs) -> HandlerOutcome + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            path: None,
            methods: MethodFilter::Any,
            no_end_slash: false,
            cors: None,
            handler: Arc::new(handler),
        }
    }

    /// Explicit path spec (literal or regex, no surrounding slashes needed).
    #[must_use]
    pub fn path(mut self, spec: impl Into<String>) -> Self {
        self.path = Some(spec.into());
        self
    }

    /// Restrict the route to the given methods.
    #[must_use]
    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.methods = MethodFilter::Only(methods.into_iter().collect());
        self
    }

    /// Opt out of the trailing-slash redirect for this route.
    #[must_use]
    pub fn no_end_slash(mut self) -> Self {
        self.no_end_slash = true;
        self
    }

    /// Attach CORS headers for the given origin and methods.
    #[must_use]
    pub fn cors(mut self, origin: impl Into<String>, methods: MethodFilter) -> Self {
        self.cors = Some(CorsPolicy {
            origin: origin.into(),
            methods,
        });
        self
    }

    fn path_spec(&self) -> String {
        match &self.path {
            Some(spec) => spec.trim_matches('/').to_string(),
            None if self.name == "index" => String::new(),
            None => self.name.clone(),
        }
    }
}

/// A registered route.
pub struct Route {
    name: String,
    raw_spec: String,
    pattern: RoutePattern,
    methods: MethodFilter,
    no_end_slash: bool,
    cors: Option<CorsPolicy>,
    handler: Handler,
}

impl Route {
    /// The unique route name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The normalized path spec (no surrounding slashes).
    #[must_use]
    pub fn spec(&self) -> &str {
        &self.raw_spec
    }

    /// The method filter.
    #[must_use]
    pub fn methods(&self) -> &MethodFilter {
        &self.methods
    }

    /// Whether the trailing-slash redirect is disabled.
    #[must_use]
    pub fn no_end_slash(&self) -> bool {
        self.no_end_slash
    }

    /// The CORS policy, if any.
    #[must_use]
    pub fn cors(&self) -> Option<&CorsPolicy> {
        self.cors.as_ref()
    }

    /// The route handler.
    #[must_use]
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// The canonical request path for this route: leading slash, trailing
    /// slash unless opted out. Useful for listings and links.
    #[must_use]
    pub fn canonical_path(&self) -> String {
        if self.raw_spec.is_empty() {
            "/".to_string()
        } else if self.no_end_slash {
            format!("/{}", self.raw_spec)
        } else {
            format!("/{}/", self.raw_spec)
        }
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("spec", &self.raw_spec)
            .field("no_end_slash", &self.no_end_slash)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Registration failure. The registry is left unchanged.
#[derive(Debug)]
pub enum RegistryError {
    /// A route with this name already exists.
    Duplicate { name: String },
    /// The path spec failed to compile.
    Pattern(PatternError),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Duplicate { name } => write!(f, "duplicate route name {name:?}"),
            Self::Pattern(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Duplicate { .. } => None,
            Self::Pattern(e) => Some(e),
        }
    }
}

impl From<PatternError> for RegistryError {
    fn from(e: PatternError) -> Self {
        Self::Pattern(e)
    }
}

/// Result of resolving a request path and method against the registry.
#[derive(Debug)]
pub enum MatchResult<'a> {
    /// A route matched structurally and by method.
    Matched {
        route: &'a Route,
        args: PathArgs,
        /// The raw path lacked the trailing slash the route expects.
        needs_redirect: bool,
    },
    /// Some route matched structurally, but none accepted the method.
    MethodNotAllowed {
        /// `Allow` header value from the first structurally matching route.
        allowed: String,
    },
    /// No route matched the path.
    NoMatch,
}

/// Ordered route registry. Routes match in registration order; the first
/// structural-and-method match wins.
#[derive(Default)]
pub struct RouteRegistry {
    routes: Vec<Route>,
}

impl RouteRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route.
    ///
    /// # Errors
    /// [`RegistryError::Duplicate`] for a reused name and
    /// [`RegistryError::Pattern`] for an uncompilable path spec; in both
    /// cases the registry is unchanged.
    pub fn register(&mut self, def: RouteDef) -> Result<(), RegistryError> {
        if self.routes.iter().any(|r| r.name == def.name) {
            return Err(RegistryError::Duplicate { name: def.name });
        }
        let raw_spec = def.path_spec();
        let pattern = RoutePattern::compile(&raw_spec)?;
        self.routes.push(Route {
            name: def.name,
            raw_spec,
            pattern,
            methods: def.methods,
            no_end_slash: def.no_end_slash,
            cors: def.cors,
            handler: def.handler,
        });
        Ok(())
    }

    /// Resolve a raw request path and method.
    ///
    /// A structural match with a rejected method does not stop the scan: a
    /// later route may accept both. The 405 answer is produced only when no
    /// route satisfies path and method together.
    #[must_use]
    pub fn resolve(&self, path: &str, method: Method) -> MatchResult<'_> {
        let mut rejected: Option<&Route> = None;
        for route in &self.routes {
            let Some(args) = route.pattern.matches(path) else {
                continue;
            };
            if route.methods.allows(method) {
                let needs_redirect = !route.no_end_slash && !path.ends_with('/');
                return MatchResult::Matched {
                    route,
                    args,
                    needs_redirect,
                };
            }
            rejected.get_or_insert(route);
        }
        match rejected {
            Some(route) => MatchResult::MethodNotAllowed {
                allowed: route.methods.header_value(),
            },
            None => MatchResult::NoMatch,
        }
    }

    /// Iterate over all routes in registration order. Restartable.
    pub fn list(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True when no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
