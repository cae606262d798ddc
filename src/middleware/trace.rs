//! Request-arrival trace middleware.

use tracing::info;

use crate::flow::Flow;
use crate::request::Request;

/// Logs method and path for every request entering the stack, then passes
/// the request along.
///
/// Register it first so it sees every request before any layer can respond:
///
/// ```rust,no_run
/// use strata::{App, middleware};
///
/// let app = App::new().with(middleware::trace);
/// ```
///
/// The matching completion line — with status — is written by the server
/// once the stack has settled; this middleware marks arrival.
pub async fn trace(req: Request) -> Flow {
    info!(method = %req.method(), path = req.path(), "request");
    Flow::Next
}
