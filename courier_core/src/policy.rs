use core::time::Duration;
use http::header::{ACCEPT, HeaderName};
use http::{HeaderMap, HeaderValue};

use crate::transport::OutgoingRequest;

/// Pipeline-wide request defaults.
///
/// Applied to every attempt after the endpoint built it: anything the
/// endpoint already set wins.
#[derive(Clone, Debug, Default)]
pub struct Policy {
    headers: HeaderMap,
    query: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    #[inline]
    pub fn set_timeout(&mut self, d: Duration) {
        self.timeout = Some(d);
    }

    #[inline]
    pub fn clear_timeout(&mut self) {
        self.timeout = None;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn remove_header(&mut self, name: HeaderName) {
        let _ = self.headers.remove(name);
    }

    /// Append (allow duplicates).
    pub fn push_query(&mut self, key: &str, value: impl Into<String>) {
        self.query.push((key.to_string(), value.into()));
    }

    /// Override-by-key: remove existing entries with same key, then insert.
    pub fn set_query(&mut self, key: &str, value: impl Into<String>) {
        self.remove_query(key);
        self.query.push((key.to_string(), value.into()));
    }

    pub fn remove_query(&mut self, key: &str) {
        self.query.retain(|(k, _)| k != key);
    }

    /// Fills in headers and timeout the request lacks and appends query pairs
    /// whose key the URL does not carry yet.
    pub fn apply(&self, req: &mut OutgoingRequest) {
        for (name, value) in self.headers.iter() {
            if !req.headers.contains_key(name) {
                req.headers.insert(name.clone(), value.clone());
            }
        }
        if req.timeout.is_none() {
            req.timeout = self.timeout;
        }
        if self.query.is_empty() {
            return;
        }
        let present: Vec<String> = req.url.query_pairs().map(|(k, _)| k.into_owned()).collect();
        let missing: Vec<&(String, String)> = self
            .query
            .iter()
            .filter(|(k, _)| !present.iter().any(|p| p == k))
            .collect();
        if missing.is_empty() {
            return;
        }
        let mut qp = req.url.query_pairs_mut();
        for (k, v) in missing {
            qp.append_pair(k, v);
        }
    }
}

/// Decoder-driven Accept injection. An Accept header set by the endpoint or
/// the pipeline defaults is left alone.
pub fn ensure_accept(headers: &mut HeaderMap, ct: &'static str) {
    if ct.is_empty() || headers.contains_key(ACCEPT) {
        return;
    }
    headers.insert(ACCEPT, HeaderValue::from_static(ct));
}
