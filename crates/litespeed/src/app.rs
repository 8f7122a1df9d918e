//! Application assembly.
//!
//! An [`App`] is built once, up front, and is immutable afterwards: routes,
//! error pages, and WebSocket event handlers all go through the
//! [`AppBuilder`]. Registration failures surface at `build()`, before the
//! server ever accepts a connection.

use litespeed_core::{
    ClientConnection, EventHandlers, Handler, HandlerOutcome, PathArgs, Request, WebSocketHub,
};
use litespeed_router::{RegistryError, RouteDef, RouteRegistry};
use std::collections::HashMap;
use std::sync::Arc;

/// Custom response pages keyed by status code.
#[derive(Default)]
pub struct ErrorPageRegistry {
    pages: HashMap<u16, Handler>,
}

impl ErrorPageRegistry {
    /// The page handler for a status, if one is registered.
    #[must_use]
    pub fn get(&self, status: u16) -> Option<&Handler> {
        self.pages.get(&status)
    }

    /// Number of registered pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// True when no pages are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// The assembled application: route registry, error pages, WebSocket hub.
pub struct App {
    routes: RouteRegistry,
    error_pages: ErrorPageRegistry,
    hub: WebSocketHub,
}

impl App {
    /// Start building an application.
    #[must_use]
    pub fn builder() -> AppBuilder {
        AppBuilder::default()
    }

    /// The route registry.
    #[must_use]
    pub fn routes(&self) -> &RouteRegistry {
        &self.routes
    }

    /// The error-page registry.
    #[must_use]
    pub fn error_pages(&self) -> &ErrorPageRegistry {
        &self.error_pages
    }

    /// The WebSocket session hub.
    #[must_use]
    pub fn hub(&self) -> &WebSocketHub {
        &self.hub
    }
}

/// Builder for [`App`].
#[derive(Default)]
pub struct AppBuilder {
    defs: Vec<RouteDef>,
    pages: HashMap<u16, Handler>,
    ws_handlers: EventHandlers,
}

impl AppBuilder {
    /// Add a route.
    #[must_use]
    pub fn route(mut self, def: RouteDef) -> Self {
        self.defs.push(def);
        self
    }

    /// Register a page handler for a status code. Registering the same code
    /// twice replaces the earlier handler.
    #[must_use]
    pub fn error_page<F>(mut self, status: u16, handler: F) -> Self
    where
        F: Fn(&Request, &PathArgs) -> HandlerOutcome + Send + Sync + 'static,
    {
        self.pages.insert(status, Arc::new(handler));
        self
    }

    /// WebSocket `new` handler: a client finished the handshake.
    #[must_use]
    pub fn on_connect<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ClientConnection, &WebSocketHub) + Send + Sync + 'static,
    {
        self.ws_handlers = self.ws_handlers.on_new(handler);
        self
    }

    /// WebSocket `message` handler: a text message arrived.
    #[must_use]
    pub fn on_message<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ClientConnection, &WebSocketHub, &str) + Send + Sync + 'static,
    {
        self.ws_handlers = self.ws_handlers.on_message(handler);
        self
    }

    /// WebSocket `left` handler: a client was unregistered.
    #[must_use]
    pub fn on_disconnect<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ClientConnection, &WebSocketHub) + Send + Sync + 'static,
    {
        self.ws_handlers = self.ws_handlers.on_left(handler);
        self
    }

    /// Assemble the application.
    ///
    /// # Errors
    /// [`RegistryError`] for a duplicate route name or an uncompilable path
    /// spec.
    pub fn build(self) -> Result<App, RegistryError> {
        let mut routes = RouteRegistry::new();
        for def in self.defs {
            routes.register(def)?;
        }
        Ok(App {
            routes,
            error_pages: ErrorPageRegistry { pages: self.pages },
            hub: WebSocketHub::new(self.ws_handlers),
        })
    }
}
