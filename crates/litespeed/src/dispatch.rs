//! Request dispatch.
//!
//! One pure function from an application and a request to a response. The
//! sequence is fixed: resolve the route, redirect or reject, invoke the
//! handler with panic containment, normalize the result, consult the
//! error-page registry at most once, and attach CORS headers for matched
//! routes. A 307 redirect never consults error pages; a 405 never carries
//! CORS headers.

use crate::app::App;
use litespeed_core::{logging, Handler, PathArgs, Request, Response};
use litespeed_router::{MatchResult, Route};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Dispatch a request to a complete response. Never panics: handler and
/// error-page panics are contained and answered with 500.
#[must_use]
pub fn dispatch(app: &App, request: &Request) -> Response {
    match app.routes().resolve(request.path(), request.method()) {
        MatchResult::NoMatch => apply_error_page(app, request, Response::empty(404)),
        MatchResult::MethodNotAllowed { allowed } => {
            let response = Response::empty(405).header("allow", allowed);
            apply_error_page(app, request, response)
        }
        MatchResult::Matched {
            route,
            args,
            needs_redirect,
        } => {
            if needs_redirect {
                let response = Response::empty(307)
                    .header("location", format!("{}/", request.path()));
                return attach_cors(route, request, response);
            }
            let response = invoke(route.handler(), request, &args);
            let response = apply_error_page(app, request, response);
            attach_cors(route, request, response)
        }
    }
}

/// Run a handler with panic containment and normalize its outcome.
fn invoke(handler: &Handler, request: &Request, args: &PathArgs) -> Response {
    match catch_unwind(AssertUnwindSafe(|| handler(request, args))) {
        Ok(Ok(result)) => result.into_response(),
        Ok(Err(e)) => {
            logging::warn(&format!(
                "handler error on {} {}: {e}",
                request.method(),
                request.path()
            ));
            Response::empty(e.status())
        }
        Err(_) => {
            logging::error(&format!(
                "handler panicked on {} {}",
                request.method(),
                request.path()
            ));
            Response::empty(500)
        }
    }
}

/// Replace a response with its registered error page, keeping the
/// triggering status code. Consulted exactly once per dispatch; a failing
/// page handler falls back to the original response.
fn apply_error_page(app: &App, request: &Request, response: Response) -> Response {
    let status = response.status();
    let Some(page) = app.error_pages().get(status) else {
        return response;
    };
    match catch_unwind(AssertUnwindSafe(|| page(request, &PathArgs::empty()))) {
        Ok(Ok(result)) => {
            let mut replaced = result.into_response();
            replaced.set_status(status);
            replaced
        }
        Ok(Err(e)) => {
            logging::warn(&format!("error page for {status} failed: {e}"));
            response
        }
        Err(_) => {
            logging::error(&format!("error page for {status} panicked"));
            response
        }
    }
}

/// Attach CORS headers when the route carries a policy covering the request
/// method.
fn attach_cors(route: &Route, request: &Request, mut response: Response) -> Response {
    if let Some(cors) = route.cors() {
        if cors.methods.allows(request.method()) {
            response.push_header("access-control-allow-origin", cors.origin.clone());
            response.push_header("access-control-allow-methods", cors.methods.header_value());
        }
    }
    response
}
