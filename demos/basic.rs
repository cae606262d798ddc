//! Minimal strata example — a middleware chain, a mounted sub-app, and an
//! error handler.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/
//!   curl http://localhost:3000/api/users
//!   curl http://localhost:3000/api/boom
//!   curl http://localhost:3000/healthz
//!   curl http://localhost:3000/nowhere

use strata::{App, Fault, Flow, Request, Response, Server, StatusCode, health, middleware};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // The /api sub-app. Its stack knows nothing about the outer one; the
    // fault raised under /api/boom bubbles out and lands in render_error.
    let api = App::new()
        .at("/users", list_users)
        .at("/boom", |_req: Request| async { Flow::fail("the demo fault") });

    let app = App::new()
        .with(middleware::trace)
        .at("/healthz", health::liveness)
        .at("/readyz", health::readiness)
        .mount("/api", api)
        .with(home)
        .catch(render_error);

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /api/users
//
// Response::json takes Vec<u8> — pass bytes from your serialiser:
//   serde_json:  Response::json(serde_json::to_vec(&users)?)
//   hand-built:  Response::json(format!(...).into_bytes())
async fn list_users(_req: Request) -> Response {
    Response::json(br#"[{"id":1,"name":"alice"}]"#.to_vec())
}

// Registered with `with`, so this layer sees every path that gets this far.
// Anything it does not recognise is passed along — and falls out as a 404.
async fn home(req: Request) -> Flow {
    if req.path() != "/" {
        return Flow::Next;
    }
    Flow::Respond(Response::text("hello from strata"))
}

// Any fault that reaches here — signaled, panicked, or bubbled out of the
// /api sub-app — is rendered as a JSON error body.
async fn render_error(fault: Fault, _req: Request) -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .json(format!(r#"{{"error":"{fault}"}}"#).into_bytes())
}
