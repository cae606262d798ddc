//! Built-in middleware.
//!
//! Middleware intercepts requests on their way through the stack and is the
//! right place for cross-cutting concerns: structured tracing, request-id
//! injection, and authentication-header inspection.
//!
//! Ships today:
//! - [`trace`] — logs method and path for every request entering the stack

mod trace;

pub use trace::trace;
