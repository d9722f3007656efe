use crate::mock::RecordedRequest;
use http::header::HeaderName;
use std::fmt::Debug;
use std::time::Duration;

/// Fluent checks over one recorded request; every failure panics with the URL.
pub struct RequestAssert<'a> {
    req: &'a RecordedRequest,
}

pub fn assert_request(req: &RecordedRequest) -> RequestAssert<'_> {
    RequestAssert { req }
}

impl<'a> RequestAssert<'a> {
    fn check<T: PartialEq + Debug>(self, what: &str, expected: T, got: T) -> Self {
        if expected != got {
            panic!(
                "{what} mismatch\n  expected: {expected:?}\n  got: {got:?}\n  url: {}",
                self.req.url
            );
        }
        self
    }

    pub fn method(self, expected: http::Method) -> Self {
        let got = self.req.method.clone();
        self.check("method", expected, got)
    }

    /// 1-based attempt number stamped by the retry loop.
    pub fn attempt(self, expected: u32) -> Self {
        let got = self.req.meta.attempt;
        self.check("attempt", expected, got)
    }

    pub fn host(self, expected: &str) -> Self {
        let req = self.req;
        let got = req.url.host_str().unwrap_or("");
        self.check("host", expected, got)
    }

    pub fn path(self, expected: &str) -> Self {
        let req = self.req;
        let got = req.url.path();
        self.check("path", expected, got)
    }

    pub fn timeout(self, expected: Option<Duration>) -> Self {
        let got = self.req.timeout;
        self.check("timeout", expected, got)
    }

    pub fn body_absent(self) -> Self {
        let got = self.req.body.as_ref().map(|b| b.len());
        self.check("body length", None, got)
    }

    pub fn header(self, name: impl IntoHeaderName, expected: &str) -> Self {
        let name = name.into_header_name();
        let req = self.req;
        let got = req.headers.get(&name).and_then(|v| v.to_str().ok());
        self.check(name.as_str(), Some(expected), got)
    }

    pub fn header_absent(self, name: impl IntoHeaderName) -> Self {
        let name = name.into_header_name();
        let req = self.req;
        let got = req.headers.get(&name).and_then(|v| v.to_str().ok());
        self.check(name.as_str(), None, got)
    }

    pub fn query_has(self, key: &str, expected: &str) -> Self {
        let values = self.query_values_of(key);
        if !values.iter().any(|v| v == expected) {
            panic!(
                "missing query pair {key}={expected}\n  values for key: {values:?}\n  url: {}",
                self.req.url
            );
        }
        self
    }

    /// Every value of `key`, in order.
    pub fn query_values(self, key: &str, expected: &[&str]) -> Self {
        let got = self.query_values_of(key);
        let expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
        self.check(&format!("query {key:?}"), expected, got)
    }

    fn query_values_of(&self, key: &str) -> Vec<String> {
        self.req
            .url
            .query_pairs()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .collect()
    }
}

pub trait IntoHeaderName {
    fn into_header_name(self) -> HeaderName;
}

impl IntoHeaderName for HeaderName {
    fn into_header_name(self) -> HeaderName {
        self
    }
}

impl IntoHeaderName for &'static str {
    fn into_header_name(self) -> HeaderName {
        HeaderName::from_bytes(self.as_bytes())
            .unwrap_or_else(|_| panic!("invalid header name literal: {self:?}"))
    }
}
