//! Demo application exercising the whole surface: name-derived and regex
//! routes, method filters, trailing-slash policy, CORS, file serving with
//! `Range` support, template rendering, error pages, and a WebSocket echo.
//!
//! Run with `cargo run --example demo`, then visit <http://127.0.0.1:8000/>.

use litespeed::prelude::*;
use litespeed::{logging, App, FileServer, HandlerResult, LogConfig, LogLevel, Renderer};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

static APP: OnceLock<Arc<App>> = OnceLock::new();

// /test/
fn test(_req: &Request, _args: &PathArgs) -> HandlerOutcome {
    Ok("Testing".into())
}

// /example2/ with an extra header
fn other(_req: &Request, _args: &PathArgs) -> HandlerOutcome {
    Ok(HandlerResult::BodyStatusHeaders(
        "Other".into(),
        200,
        vec![("testing".to_string(), "Header".to_string())],
    ))
}

// /other/txt/, POST only, answers 204
fn another(_req: &Request, _args: &PathArgs) -> HandlerOutcome {
    Ok(HandlerResult::BodyStatus("Txt".into(), 204))
}

// /json/ echoes the request as JSON
fn json(req: &Request, _args: &PathArgs) -> HandlerOutcome {
    Ok(HandlerResult::Structured(req.to_json()))
}

// /[two digits]/ and /num/[any number]/
fn test2(_req: &Request, args: &PathArgs) -> HandlerOutcome {
    let num: i64 = args.parse(0)?;
    Ok(format!("Test2 [{num}]").into())
}

// / lists every registered route
fn index(_req: &Request, _args: &PathArgs) -> HandlerOutcome {
    let Some(app) = APP.get() else {
        return Ok("starting up".into());
    };
    Ok(HandlerResult::Fragments(
        app.routes()
            .list()
            .map(|route| {
                format!(
                    "<a href=\"{}\">{}</a><br>",
                    route.canonical_path(),
                    route.name()
                )
            })
            .collect(),
    ))
}

// /[four-digit year]/[article]/
fn article(_req: &Request, args: &PathArgs) -> HandlerOutcome {
    let year: i64 = args.parse_named("year")?;
    let article: i64 = args.parse_named("article")?;
    Ok(format!("This is article {article} from year {year}").into())
}

// /readme/ serves a file
fn readme(_req: &Request, _args: &PathArgs) -> HandlerOutcome {
    FileServer::new(".").serve("README.md", None)
}

// /render_example/?test=... substitutes ~~test~~ in the readme
fn render_example(req: &Request, _args: &PathArgs) -> HandlerOutcome {
    let mut vars = HashMap::new();
    vars.insert(
        "test".to_string(),
        req.query().get("test").unwrap_or("").to_string(),
    );
    Renderer::new(".").render("README.md", &vars)
}

// /not_implemented/ answers 501, dressed up by the 501 error page
fn not_implemented(_req: &Request, _args: &PathArgs) -> HandlerOutcome {
    Ok(HandlerResult::BodyStatus("".into(), 501))
}

fn error_501(_req: &Request, _args: &PathArgs) -> HandlerOutcome {
    Ok("This is a 501 error".into())
}

// /media/[file], byte-range aware
fn media(req: &Request, args: &PathArgs) -> HandlerOutcome {
    let file = args
        .get(0)
        .ok_or_else(|| HandlerError::Failed("missing file argument".to_string()))?;
    FileServer::new("assets/media").serve(file, req.headers().get("range"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init(LogConfig::new(LogLevel::Debug));

    let app = App::builder()
        .route(RouteDef::new("index", index))
        .route(RouteDef::new("test", test))
        .route(RouteDef::new("other", other).path("example2"))
        .route(
            RouteDef::new("another", another)
                .path("other/txt")
                .methods([Method::Post]),
        )
        .route(RouteDef::new("json", json))
        .route(RouteDef::new("test2", test2).path(r"(\d{2})"))
        .route(RouteDef::new("num", test2).path(r"num/(?P<num>\d+)"))
        .route(
            RouteDef::new("article", article).path(r"(?P<year>\d{4})/(?P<article>\d+)"),
        )
        .route(RouteDef::new("readme", readme))
        .route(
            RouteDef::new("render_example", render_example)
                .cors("*", MethodFilter::Only(vec![Method::Get])),
        )
        .route(
            RouteDef::new("not_implemented", not_implemented).methods([Method::Get]),
        )
        .route(
            RouteDef::new("media", media)
                .path(r"media/([\w\s./]+)")
                .methods([Method::Get])
                .no_end_slash(),
        )
        .error_page(501, error_501)
        .on_connect(|conn, _hub| {
            logging::info(&format!("websocket client {} joined", conn.id()));
        })
        .on_message(|conn, hub, msg| {
            let payload = serde_json::json!({ "id": conn.id(), "msg": msg });
            // either form works: through the hub (prunes dead peers)...
            hub.send_json(conn, &payload);
            // ...or directly on the connection
            let _ = conn.send_json(&payload);
        })
        .on_disconnect(|conn, _hub| {
            logging::info(&format!("websocket client {} left", conn.id()));
        })
        .build()?;

    let app = Arc::new(app);
    let _ = APP.set(Arc::clone(&app));
    Server::bind("127.0.0.1:8000")?.run(app)?;
    Ok(())
}
