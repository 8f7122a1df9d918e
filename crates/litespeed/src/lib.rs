//! litespeed: a minimal HTTP routing and response-dispatch engine with a
//! WebSocket hub.
//!
//! Routes are plain synchronous functions registered against literal paths
//! or regexes. The dispatcher resolves each request, normalizes whatever the
//! handler returns into a complete response, and layers on trailing-slash
//! redirects, per-status error pages, and per-route CORS. A WebSocket hub
//! with `new` / `message` / `left` handlers rides on the same serving loop.
//!
//! ```no_run
//! use litespeed::prelude::*;
//! use std::sync::Arc;
//!
//! fn hello(_req: &Request, _args: &PathArgs) -> HandlerOutcome {
//!     Ok("Hello, World!".into())
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = App::builder()
//!         .route(RouteDef::new("index", hello))
//!         .build()?;
//!     Server::bind("127.0.0.1:8000")?.run(Arc::new(app))?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod app;
mod dispatch;
mod server;
pub mod testing;

pub use app::{App, AppBuilder, ErrorPageRegistry};
pub use dispatch::dispatch;
pub use server::Server;

pub use litespeed_core::{
    logging, ClientConnection, EventHandlers, FileServer, Handler, HandlerError, HandlerOutcome,
    HandlerResult, Headers, LogConfig, LogLevel, Method, PathArgs, Payload, QueryParams, Renderer,
    Request, Response, WebSocketHub, WsTransport,
};
pub use litespeed_router::{CorsPolicy, MethodFilter, Route, RouteDef, RegistryError};

/// The common imports for applications.
pub mod prelude {
    pub use crate::app::App;
    pub use crate::server::Server;
    pub use litespeed_core::{
        HandlerError, HandlerOutcome, HandlerResult, Method, PathArgs, Request,
    };
    pub use litespeed_router::{MethodFilter, RouteDef};
}
