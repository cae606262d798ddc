//! Traversal flow control: what a handler tells the dispatcher.
//!
//! Every handler invocation resolves to a [`Flow`]. The dispatcher reads it
//! and either keeps walking the stack, diverts to error middleware, or stops
//! and ships the response. There is no `next()` callback to forget to call —
//! the return value *is* the continuation.

use crate::response::Response;

/// An in-flight error value, as signaled by a handler.
///
/// Anything that converts into a boxed error works, strings included:
///
/// ```rust
/// use strata::Flow;
///
/// Flow::fail("user lookup failed");
/// Flow::fail(std::io::Error::other("downstream unreachable"));
/// ```
pub type Fault = Box<dyn std::error::Error + Send + Sync + 'static>;

/// What one handler invocation tells the dispatcher to do next.
pub enum Flow {
    /// Keep walking the stack. From an error handler this also clears the
    /// pending fault, making normal middleware visible again.
    Next,
    /// Divert to error middleware. Normal middleware is skipped until some
    /// error handler consumes or clears the fault.
    Fail(Fault),
    /// Stop the traversal and send this response.
    Respond(Response),
}

impl Flow {
    /// Shorthand for `Flow::Fail(fault.into())`.
    pub fn fail(fault: impl Into<Fault>) -> Self {
        Self::Fail(fault.into())
    }
}

// ── IntoFlow ──────────────────────────────────────────────────────────────────

/// Conversion into a [`Flow`].
///
/// Lets handlers return the natural thing for their job:
///
/// - a [`Flow`], for middleware that decides between passing and failing;
/// - a [`Response`] or a bare [`StatusCode`](http::StatusCode), for terminal
///   handlers that always answer;
/// - a `Result<T, E>`, where an `Err` is signaled as a fault — `?` inside a
///   handler routes straight into the error track.
pub trait IntoFlow {
    fn into_flow(self) -> Flow;
}

impl IntoFlow for Flow {
    fn into_flow(self) -> Flow {
        self
    }
}

impl IntoFlow for Response {
    fn into_flow(self) -> Flow {
        Flow::Respond(self)
    }
}

/// Return a status directly from a handler: `return StatusCode::NO_CONTENT`.
impl IntoFlow for http::StatusCode {
    fn into_flow(self) -> Flow {
        Flow::Respond(Response::status(self))
    }
}

impl<T, E> IntoFlow for Result<T, E>
where
    T: IntoFlow,
    E: Into<Fault>,
{
    fn into_flow(self) -> Flow {
        match self {
            Ok(value) => value.into_flow(),
            Err(fault) => Flow::Fail(fault.into()),
        }
    }
}
