//! Handler traits and type erasure.
//!
//! # How async handlers are stored
//!
//! The dispatcher holds handlers of *different* concrete types in one
//! `Vec<Layer>`. Rust collections can only hold one concrete type, so we use
//! **trait objects** (`dyn ErasedHandler` / `dyn ErasedCatcher`) to hide each
//! handler behind a common interface and store everything uniformly.
//!
//! The chain from user code to vtable call is:
//!
//! ```text
//! async fn auth(req: Request) -> Flow { … }        ← user writes this
//!        ↓ app.with(auth)
//! auth.into_boxed_handler()                        ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(auth))                        ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req)  at traversal time             ← one vtable dispatch
//!        ↓
//! Box::pin(async { auth(req).await.into_flow() })  ← BoxFuture
//! ```
//!
//! There are two handler flavors, fixed at registration time: [`Handler`]
//! for normal middleware and [`Catcher`] for error middleware. The kind is
//! carried by which registration method you call (`with`/`at` versus
//! `catch`/`catch_at`), never guessed from the function itself.
//!
//! # Panic trapping
//!
//! `call` guards both the closure invocation and every poll of the future it
//! produces. A panicking handler resolves to [`Flow::Fail`] with the panic
//! payload as the fault — the same outcome as returning the error — so an
//! unwind never crosses the dispatcher and never tears down the connection
//! task.

use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::flow::{Fault, Flow, IntoFlow};
use crate::request::Request;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Flow`].
///
/// `Pin<Box<…>>` is required because the async runtime must be able to poll
/// the future in-place — it cannot move it in memory after the first poll.
/// `Send + 'static` let tokio move the future across threads safely.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Flow> + Send + 'static>>;

/// Internal dispatch interface for normal middleware.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
/// External crates cannot usefully interact with this trait.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// Internal dispatch interface for error middleware. The pending fault is
/// handed over by value: the dispatcher has already taken it out of the
/// traversal state, and only a `Flow::Fail` puts one back.
#[doc(hidden)]
pub trait ErasedCatcher {
    fn call(&self, fault: Fault, req: Request) -> BoxFuture;
}

#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

#[doc(hidden)]
pub type BoxedCatcher = Arc<dyn ErasedCatcher + Send + Sync + 'static>;

// ── Public traits ─────────────────────────────────────────────────────────────

/// Implemented for every valid normal middleware.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoFlow
/// ```
///
/// The trait is **sealed** (via a private supertrait): only the blanket impl
/// below can satisfy it.
pub trait Handler: private::SealedHandler + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

/// Implemented for every valid error middleware:
///
/// ```text
/// async fn name(fault: Fault, req: Request) -> impl IntoFlow
/// ```
///
/// Sealed, like [`Handler`].
pub trait Catcher: private::SealedCatcher + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_catcher(self) -> BoxedCatcher;
}

/// The sealing module. Because these traits are private, external crates
/// cannot name them and therefore cannot implement `Handler` or `Catcher` on
/// their own types.
mod private {
    pub trait SealedHandler {}
    pub trait SealedCatcher {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::SealedHandler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFlow + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFlow + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

impl<F, Fut, R> private::SealedCatcher for F
where
    F: Fn(Fault, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFlow + Send + 'static,
{
}

impl<F, Fut, R> Catcher for F
where
    F: Fn(Fault, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFlow + Send + 'static,
{
    fn into_boxed_catcher(self) -> BoxedCatcher {
        Arc::new(FnCatcher(self))
    }
}

// ── Concrete wrappers ─────────────────────────────────────────────────────────

/// Newtype wrapper that holds a concrete normal middleware `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFlow + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        trap(|| {
            let fut = (self.0)(req);
            Box::pin(async move { fut.await.into_flow() })
        })
    }
}

struct FnCatcher<F>(F);

impl<F, Fut, R> ErasedCatcher for FnCatcher<F>
where
    F: Fn(Fault, Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoFlow + Send + 'static,
{
    fn call(&self, fault: Fault, req: Request) -> BoxFuture {
        trap(|| {
            let fut = (self.0)(fault, req);
            Box::pin(async move { fut.await.into_flow() })
        })
    }
}

// ── Panic trapping ────────────────────────────────────────────────────────────

/// Runs `make` and wraps the future it produces so that a panic anywhere —
/// while building the future or during any later poll — resolves to
/// [`Flow::Fail`] carrying the panic payload.
fn trap(make: impl FnOnce() -> BoxFuture) -> BoxFuture {
    match catch_unwind(AssertUnwindSafe(make)) {
        Ok(inner) => Box::pin(Trap { inner }),
        Err(payload) => Box::pin(std::future::ready(Flow::Fail(fault_of(payload)))),
    }
}

struct Trap {
    inner: BoxFuture,
}

impl Future for Trap {
    type Output = Flow;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Flow> {
        // `Pin<Box<…>>` is Unpin, so plain projection through `get_mut` works.
        let inner = &mut self.get_mut().inner;
        match catch_unwind(AssertUnwindSafe(|| inner.as_mut().poll(cx))) {
            Ok(poll) => poll,
            Err(payload) => Poll::Ready(Flow::Fail(fault_of(payload))),
        }
    }
}

/// Extracts a printable message from a panic payload. `panic!("…")` carries a
/// `&str` or a formatted `String`; anything else gets a generic message.
fn fault_of(payload: Box<dyn Any + Send>) -> Fault {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).into()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone().into()
    } else {
        "handler panicked".into()
    }
}
