//! Stack layers and mount-path matching.
//!
//! A [`Layer`] is one entry in an [`App`](crate::App)'s stack: a normalized
//! path prefix plus a handler of a fixed kind. Matching and kind are
//! independent — a request can match a layer whose kind is wrong for the
//! current traversal phase; the dispatcher then skips it without invoking it.

use std::sync::Arc;

use crate::app::App;
use crate::handler::{BoxedCatcher, BoxedHandler};

/// What a layer holds, decided at registration and fixed for its lifetime.
pub(crate) enum Kind {
    /// Normal middleware — visible only while no fault is pending.
    Normal(BoxedHandler),
    /// Error middleware — visible only while a fault is pending.
    Catch(BoxedCatcher),
    /// A nested dispatcher, traversed like a normal middleware.
    Mount(Arc<App>),
}

pub(crate) struct Layer {
    pub(crate) mount: String,
    pub(crate) kind: Kind,
}

impl Layer {
    pub(crate) fn new(path: &str, kind: Kind) -> Self {
        Self { mount: normalize(path), kind }
    }

    /// Returns the matched portion of `path` — the mount prefix itself — when
    /// `path` begins with the mount at a segment boundary.
    ///
    /// The prefix must be followed by end-of-string or a `/` separator:
    /// a layer at `"/foo"` matches `"/foo"` and `"/foo/bar"` but not
    /// `"/foobar"`. The root mount `"/"` matches every path.
    pub(crate) fn matched(&self, path: &str) -> Option<&str> {
        if self.mount == "/" {
            return Some(&self.mount);
        }
        let rest = path.strip_prefix(self.mount.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(&self.mount)
        } else {
            None
        }
    }
}

/// Normalizes a mount path: a leading `/` is enforced, trailing `/` stripped,
/// and the empty path becomes the root mount `"/"`.
fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_owned()
    } else if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}
