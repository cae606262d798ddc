//! Incoming HTTP request type.

use std::sync::Arc;

use http::Method;

/// An incoming HTTP request.
///
/// Every layer in the chain receives the same request by value. Cloning is
/// cheap — the record is shared behind an `Arc`, so a clone is one refcount
/// bump, not a copy of the body.
#[derive(Clone)]
pub struct Request {
    inner: Arc<Inner>,
}

struct Inner {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: impl Into<String>,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner { method, path: path.into(), headers, body }),
        }
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.inner.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.inner.body
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::new(
            Method::GET,
            "/",
            vec![("Content-Type".to_owned(), "application/json".to_owned())],
            Vec::new(),
        );
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(req.header("accept"), None);
    }

    #[test]
    fn clones_share_the_same_record() {
        let req = Request::new(Method::POST, "/submit", Vec::new(), b"payload".to_vec());
        let twin = req.clone();
        assert_eq!(twin.path(), "/submit");
        assert_eq!(twin.body(), b"payload");
        assert!(std::ptr::eq(req.path(), twin.path()));
    }
}
