//! The dispatcher: an ordered middleware stack and its traversal.
//!
//! # The two-phase walk
//!
//! An [`App`] owns layers in registration order. Each request gets one pass
//! over that stack, front to back, with a cursor that only moves forward —
//! no layer is ever revisited, so a traversal always terminates after at
//! most `stack.len()` handler invocations.
//!
//! The pass runs in one of two phases at any moment:
//!
//! | phase | pending fault | visible layers |
//! |---|---|---|
//! | normal | none | normal middleware, mounts |
//! | error | set | error middleware |
//!
//! A [`Flow::Fail`] (or a handler panic) flips the walk into the error phase
//! from the *next* layer onward. An error middleware that returns
//! [`Flow::Next`] clears the fault and flips it back. Layers whose mount
//! prefix does not match the request path are skipped in either phase.
//!
//! # Mounting
//!
//! [`App::mount`] embeds one dispatcher inside another. The sub-app is
//! traversed in place of a normal middleware; whatever its own stack could
//! not settle — an unmatched request, an unconsumed fault — falls through to
//! the parent's remaining layers. An error raised deep inside a mounted app
//! can therefore be rendered by an error middleware registered after the
//! mount point in the parent.
//!
//! # Terminal defaults
//!
//! When the outermost stack is exhausted, [`App::handle`] answers `404 Not
//! Found` if no fault is pending and `500 Internal Server Error` if one is.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::StatusCode;

use crate::flow::{Fault, Flow};
use crate::handler::{Catcher, Handler};
use crate::layer::{Kind, Layer};
use crate::request::Request;
use crate::response::Response;

/// The application object: an ordered stack of middleware layers.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each registration call consumes and returns `self`, so chains read
/// top-to-bottom in execution order:
///
/// ```rust,no_run
/// # use strata::{App, Flow, Request, Response};
/// # async fn log_request(_: Request) -> Flow { Flow::Next }
/// # async fn api(_: Request) -> Response { Response::text("") }
/// # async fn render_error(_: strata::Fault, _: Request) -> Response { Response::text("") }
/// let app = App::new()
///     .with(log_request)          // every request
///     .at("/api", api)            // only under /api
///     .catch(render_error);       // only once a fault is pending
/// ```
///
/// Ownership makes the setup/traffic split airtight: `serve` takes the `App`
/// by value and shares it immutably, so there is no way to register a layer
/// while requests are in flight.
pub struct App {
    stack: Vec<Layer>,
}

/// How one traversal ended.
pub(crate) enum Outcome {
    /// A layer produced a response.
    Responded(Response),
    /// Stack exhausted with no fault pending.
    Unhandled,
    /// Stack exhausted with an unconsumed fault.
    Failed(Fault),
}

impl App {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// Registers normal middleware at the root mount `"/"` — it sees every
    /// request. Returns `self` for chaining.
    pub fn with(self, handler: impl Handler) -> Self {
        self.at("/", handler)
    }

    /// Registers normal middleware under a path prefix.
    ///
    /// The prefix matches at segment boundaries only: `at("/foo", …)` runs
    /// for `/foo` and `/foo/bar`, never for `/foobar`.
    pub fn at(mut self, path: &str, handler: impl Handler) -> Self {
        self.stack.push(Layer::new(path, Kind::Normal(handler.into_boxed_handler())));
        self
    }

    /// Registers error middleware at the root mount `"/"`.
    ///
    /// Error middleware is invisible during normal flow and runs only once a
    /// preceding layer has failed. Register it after the layers whose faults
    /// it should render.
    pub fn catch(self, catcher: impl Catcher) -> Self {
        self.catch_at("/", catcher)
    }

    /// Registers error middleware under a path prefix.
    pub fn catch_at(mut self, path: &str, catcher: impl Catcher) -> Self {
        self.stack.push(Layer::new(path, Kind::Catch(catcher.into_boxed_catcher())));
        self
    }

    /// Mounts `app` as a sub-dispatcher under a path prefix.
    ///
    /// The sub-app runs in place of a normal middleware. A request its stack
    /// leaves unhandled continues at this app's next layer; a fault its stack
    /// leaves unconsumed continues here as the pending fault, where a later
    /// [`catch`](App::catch) can render it.
    pub fn mount(mut self, path: &str, app: App) -> Self {
        self.stack.push(Layer::new(path, Kind::Mount(Arc::new(app))));
        self
    }

    /// Routes one request through the stack and produces the response.
    ///
    /// This is the per-request entry point the server registers. Exhausting
    /// the stack answers `404`; exhausting it with an unconsumed fault
    /// answers `500` with the fault rendered in a plain-text body.
    pub async fn handle(&self, req: Request) -> Response {
        match self.traverse(req).await {
            Outcome::Responded(response) => response,
            Outcome::Unhandled => Response::status(StatusCode::NOT_FOUND),
            Outcome::Failed(fault) => Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .text(format!("internal server error: {fault}")),
        }
    }

    /// One pass over the stack. Boxed because mounted apps recurse through it.
    ///
    /// The `(kind, pending)` match below is the whole phase table: the three
    /// invoking arms are the visible combinations, everything else is a skip.
    pub(crate) fn traverse(&self, req: Request) -> Pin<Box<dyn Future<Output = Outcome> + Send + '_>> {
        Box::pin(async move {
            let mut pending: Option<Fault> = None;

            for layer in &self.stack {
                if layer.matched(req.path()).is_none() {
                    continue;
                }

                let flow = match (&layer.kind, pending.take()) {
                    (Kind::Normal(handler), None) => handler.call(req.clone()).await,
                    (Kind::Catch(catcher), Some(fault)) => catcher.call(fault, req.clone()).await,
                    (Kind::Mount(sub), None) => match sub.traverse(req.clone()).await {
                        Outcome::Responded(response) => Flow::Respond(response),
                        Outcome::Unhandled => Flow::Next,
                        Outcome::Failed(fault) => Flow::Fail(fault),
                    },
                    // Kind incompatible with the current phase: restore the
                    // fault (if any) and skip the layer.
                    (_, taken) => {
                        pending = taken;
                        continue;
                    }
                };

                match flow {
                    Flow::Next => {}
                    Flow::Fail(fault) => pending = Some(fault),
                    Flow::Respond(response) => return Outcome::Responded(response),
                }
            }

            match pending {
                Some(fault) => Outcome::Failed(fault),
                None => Outcome::Unhandled,
            }
        })
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Shared visit log so tests can assert who ran, in which order.
    type Log = Arc<Mutex<Vec<String>>>;

    fn log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn taken(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    fn req(path: &str) -> Request {
        Request::new(http::Method::GET, path, Vec::new(), Vec::new())
    }

    /// Normal middleware that records its name and passes the request along.
    fn visit(log: &Log, name: &'static str) -> impl Handler {
        let log = Arc::clone(log);
        move |_req: Request| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(name.to_owned());
                Flow::Next
            }
        }
    }

    /// Normal middleware that signals a fault.
    fn fail_with(message: &'static str) -> impl Handler {
        move |_req: Request| async move { Flow::fail(message) }
    }

    /// Normal middleware that terminates with a text response.
    fn respond_with(body: &'static str) -> impl Handler {
        move |_req: Request| async move { Flow::Respond(Response::text(body)) }
    }

    /// Error middleware that records the fault it received and responds.
    fn render(log: &Log) -> impl Catcher {
        let log = Arc::clone(log);
        move |fault: Fault, _req: Request| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("caught:{fault}"));
                Flow::Respond(Response::text("rendered"))
            }
        }
    }

    /// Error middleware that clears the fault and resumes normal flow.
    fn swallow(log: &Log) -> impl Catcher {
        let log = Arc::clone(log);
        move |fault: Fault, _req: Request| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(format!("cleared:{fault}"));
                Flow::Next
            }
        }
    }

    async fn handled(app: &App, path: &str) -> Response {
        app.handle(req(path)).await
    }

    // ── Ordering and terminal defaults ────────────────────────────────────────

    #[tokio::test]
    async fn empty_stack_answers_not_found() {
        let app = App::new();
        let response = handled(&app, "/anything").await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn layers_run_in_registration_order() {
        let trail = log();
        let app = App::new()
            .with(visit(&trail, "a"))
            .with(visit(&trail, "b"))
            .with(visit(&trail, "c"));

        let response = handled(&app, "/").await;

        assert_eq!(taken(&trail), ["a", "b", "c"]);
        // Nobody wrote a response, so the walk falls out as a 404.
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn respond_stops_the_walk() {
        let trail = log();
        let app = App::new()
            .with(visit(&trail, "a"))
            .with(respond_with("done"))
            .with(visit(&trail, "never"));

        let response = handled(&app, "/").await;

        assert_eq!(taken(&trail), ["a"]);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, b"done");
    }

    // ── Prefix matching ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn layers_match_by_prefix_at_segment_boundaries() {
        let trail = log();
        let app = App::new()
            .at("/foo", visit(&trail, "foo"))
            .with(visit(&trail, "root"));

        handled(&app, "/").await;
        assert_eq!(taken(&trail), ["root"]);

        trail.lock().unwrap().clear();
        handled(&app, "/foo").await;
        assert_eq!(taken(&trail), ["foo", "root"]);

        trail.lock().unwrap().clear();
        handled(&app, "/foo/bar").await;
        assert_eq!(taken(&trail), ["foo", "root"]);

        trail.lock().unwrap().clear();
        handled(&app, "/foobar").await;
        assert_eq!(taken(&trail), ["root"]);
    }

    // ── Error phase ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn fail_skips_normals_and_reaches_the_nearest_catcher() {
        let trail = log();
        let app = App::new()
            .with(fail_with("boom"))
            .with(visit(&trail, "skipped"))
            .catch(render(&trail));

        let response = handled(&app, "/").await;

        assert_eq!(taken(&trail), ["caught:boom"]);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, b"rendered");
    }

    #[tokio::test]
    async fn unconsumed_fault_answers_internal_server_error() {
        let app = App::new().with(fail_with("boom"));
        let response = handled(&app, "/").await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = String::from_utf8(response.body.clone()).unwrap();
        assert!(body.contains("boom"), "500 body should name the fault: {body}");
    }

    #[tokio::test]
    async fn catchers_are_invisible_during_normal_flow() {
        let trail = log();
        let app = App::new()
            .catch(render(&trail))
            .with(respond_with("fine"));

        let response = handled(&app, "/").await;

        assert!(taken(&trail).is_empty());
        assert_eq!(response.body, b"fine");
    }

    #[tokio::test]
    async fn catcher_must_match_the_request_path() {
        let trail = log();
        let app = App::new()
            .with(fail_with("boom"))
            .catch_at("/admin", render(&trail));

        let response = handled(&app, "/other").await;

        assert!(taken(&trail).is_empty());
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn clearing_a_fault_restores_normal_visibility() {
        let trail = log();
        let app = App::new()
            .with(fail_with("boom"))
            .with(visit(&trail, "skipped"))
            .catch(swallow(&trail))
            .with(visit(&trail, "after"));

        let response = handled(&app, "/").await;

        assert_eq!(taken(&trail), ["cleared:boom", "after"]);
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn a_catcher_can_rearm_with_a_new_fault() {
        let trail = log();
        let rethrow = |fault: Fault, _req: Request| async move {
            Flow::fail(format!("wrapped: {fault}"))
        };
        let app = App::new()
            .with(fail_with("boom"))
            .catch(rethrow)
            .catch(render(&trail));

        let response = handled(&app, "/").await;

        assert_eq!(taken(&trail), ["caught:wrapped: boom"]);
        assert_eq!(response.body, b"rendered");
    }

    // ── Panics as faults ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn a_panicking_handler_behaves_like_a_fail() {
        async fn explode(_req: Request) -> Flow {
            panic!("kaboom")
        }

        let trail = log();
        let app = App::new()
            .with(explode)
            .with(visit(&trail, "skipped"))
            .catch(render(&trail));

        let response = handled(&app, "/").await;

        assert_eq!(taken(&trail), ["caught:kaboom"]);
        assert_eq!(response.body, b"rendered");
    }

    #[tokio::test]
    async fn an_uncaught_panic_answers_internal_server_error() {
        async fn explode(_req: Request) -> Flow {
            panic!("kaboom")
        }

        let app = App::new().with(explode);
        let response = handled(&app, "/").await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = String::from_utf8(response.body.clone()).unwrap();
        assert!(body.contains("kaboom"));
    }

    #[tokio::test]
    async fn a_panicking_catcher_keeps_the_error_phase() {
        async fn explode_catcher(_fault: Fault, _req: Request) -> Flow {
            panic!("worse")
        }

        let trail = log();
        let app = App::new()
            .with(fail_with("boom"))
            .catch(explode_catcher)
            .catch(render(&trail));

        let response = handled(&app, "/").await;

        assert_eq!(taken(&trail), ["caught:worse"]);
        assert_eq!(response.body, b"rendered");
    }

    // ── Result-returning handlers ─────────────────────────────────────────────

    #[tokio::test]
    async fn err_returns_are_signaled_as_faults() {
        async fn flaky(_req: Request) -> Result<Flow, std::io::Error> {
            Err(std::io::Error::other("disk on fire"))
        }

        let trail = log();
        let app = App::new().with(flaky).catch(render(&trail));

        let response = handled(&app, "/").await;

        assert_eq!(taken(&trail), ["caught:disk on fire"]);
        assert_eq!(response.body, b"rendered");
    }

    // ── Mounting ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn mounted_app_handles_matching_requests() {
        let inner = App::new().at("/users", respond_with("from inner"));
        let app = App::new().mount("/api", inner);

        let response = handled(&app, "/api/users").await;
        assert_eq!(response.body, b"from inner");
    }

    #[tokio::test]
    async fn unhandled_requests_fall_through_the_mount() {
        let trail = log();
        let inner = App::new().with(visit(&trail, "inner"));
        let app = App::new()
            .mount("/", inner)
            .with(respond_with("fallback"));

        let response = handled(&app, "/missing").await;

        assert_eq!(taken(&trail), ["inner"]);
        assert_eq!(response.body, b"fallback");
    }

    #[tokio::test]
    async fn faults_bubble_out_of_a_mounted_app() {
        let trail = log();
        let inner = App::new().with(fail_with("inner boom"));
        let app = App::new()
            .mount("/", inner)
            .with(visit(&trail, "skipped"))
            .catch(render(&trail));

        let response = handled(&app, "/").await;

        assert_eq!(taken(&trail), ["caught:inner boom"]);
        assert_eq!(response.body, b"rendered");
    }

    #[tokio::test]
    async fn inner_catchers_run_before_the_fault_can_bubble() {
        let trail = log();
        let inner = App::new()
            .with(fail_with("inner boom"))
            .catch(render(&trail));
        let outer_trail = log();
        let app = App::new().mount("/", inner).catch(render(&outer_trail));

        let response = handled(&app, "/").await;

        assert_eq!(taken(&trail), ["caught:inner boom"]);
        assert!(taken(&outer_trail).is_empty());
        assert_eq!(response.body, b"rendered");
    }

    #[tokio::test]
    async fn mounts_are_skipped_while_a_fault_is_pending() {
        let trail = log();
        let inner = App::new().with(visit(&trail, "inner"));
        let app = App::new()
            .with(fail_with("boom"))
            .mount("/", inner)
            .catch(render(&trail));

        handled(&app, "/").await;

        assert_eq!(taken(&trail), ["caught:boom"]);
    }

    #[tokio::test]
    async fn mount_prefix_gates_the_whole_sub_app() {
        let trail = log();
        let inner = App::new().with(visit(&trail, "inner"));
        let app = App::new()
            .mount("/admin", inner)
            .with(respond_with("public"));

        let response = handled(&app, "/adminpanel").await;

        assert!(taken(&trail).is_empty());
        assert_eq!(response.body, b"public");
    }

    // ── Deferred continuation ─────────────────────────────────────────────────

    #[tokio::test]
    async fn a_handler_may_resume_the_walk_after_awaiting() {
        let trail = log();
        let slow = {
            let log = Arc::clone(&trail);
            move |_req: Request| {
                let log = Arc::clone(&log);
                async move {
                    tokio::task::yield_now().await;
                    log.lock().unwrap().push("slow".to_owned());
                    Flow::Next
                }
            }
        };
        let app = App::new().with(slow).with(respond_with("eventually"));

        let response = handled(&app, "/").await;

        assert_eq!(taken(&trail), ["slow"]);
        assert_eq!(response.body, b"eventually");
    }
}
