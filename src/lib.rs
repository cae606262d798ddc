//! # strata
//!
//! A minimal middleware-dispatch engine for HTTP services.
//! An ordered stack. Two tracks. Nothing else.
//!
//! ## The contract
//!
//! You register layers against path prefixes; strata walks each request
//! through the matching ones in registration order. The walk runs on two
//! tracks — normal middleware and error middleware — and a single fault
//! anywhere flips the request onto the error track, skipping every normal
//! layer until an error handler settles it. Whole apps nest inside other
//! apps: what a mounted stack leaves unhandled bubbles up to its parent.
//!
//! What strata intentionally ignores, because it belongs to a router or a
//! proxy, not a middleware engine:
//!
//! - **Verb routing** — every layer sees every method; check `req.method()`
//! - **Path parameters and wildcards** — prefixes only, split at `/`
//! - **TLS, rate limiting, body-size limits** — nginx / ingress territory
//!
//! What's left:
//!
//! - Prefix dispatch — segment-boundary matching, registration order preserved
//! - Two-phase traversal — faults divert to error middleware, panics included
//! - Mounting — nest an [`App`] in an [`App`]; misses and faults bubble up
//! - Async I/O — tokio + hyper, graceful SIGTERM / Ctrl-C drain
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use strata::{App, Fault, Flow, Request, Response, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = App::new()
//!         .with(log_request)       // every request passes through
//!         .at("/api", api)         // only /api and below
//!         .catch(render_error);    // only once something has failed
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn log_request(req: Request) -> Flow {
//!     println!("{} {}", req.method(), req.path());
//!     Flow::Next
//! }
//!
//! async fn api(req: Request) -> Flow {
//!     if req.path() == "/api/fail" {
//!         return Flow::fail("somebody asked for it");
//!     }
//!     Flow::Respond(Response::json(br#"{"ok":true}"#.to_vec()))
//! }
//!
//! async fn render_error(fault: Fault, _req: Request) -> Response {
//!     Response::builder()
//!         .status(StatusCode::INTERNAL_SERVER_ERROR)
//!         .text(format!("error: {fault}"))
//! }
//! ```
//!
//! Anything the stack never answers is a `404`; a fault no error middleware
//! consumes is a `500`.

mod app;
mod error;
mod flow;
mod handler;
mod layer;
mod request;
mod response;
mod server;

pub mod health;
pub mod middleware;

pub use app::App;
pub use error::Error;
pub use flow::{Fault, Flow, IntoFlow};
pub use handler::{Catcher, Handler};
pub use request::Request;
pub use response::{ContentType, Response};
pub use server::Server;

/// Re-exported from the [`http`] crate — the status vocabulary handlers and
/// responses speak.
pub use http::StatusCode;
