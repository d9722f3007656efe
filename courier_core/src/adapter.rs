use http::header::{AUTHORIZATION, HeaderName, HeaderValue};
use http::HeaderMap;

use crate::error::FxError;
use crate::secret::SecretString;
use crate::transport::OutgoingRequest;

/// Rewrites a request right before dispatch.
///
/// Runs once per attempt on a freshly built request. An error aborts the
/// call without consulting the retrier.
pub trait Adapter: Send + Sync + 'static {
    fn adapt(&self, req: OutgoingRequest) -> Result<OutgoingRequest, FxError>;
}

impl<F> Adapter for F
where
    F: Fn(OutgoingRequest) -> Result<OutgoingRequest, FxError> + Send + Sync + 'static,
{
    fn adapt(&self, req: OutgoingRequest) -> Result<OutgoingRequest, FxError> {
        self(req)
    }
}

/// `Authorization: Bearer <token>`, replacing whatever the endpoint set.
#[derive(Clone, Debug)]
pub struct BearerAuthAdapter {
    token: SecretString,
}

impl BearerAuthAdapter {
    pub fn new(token: impl Into<SecretString>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Adapter for BearerAuthAdapter {
    fn adapt(&self, mut req: OutgoingRequest) -> Result<OutgoingRequest, FxError> {
        let value = self.token.header_value("Bearer ")?;
        req.headers.insert(AUTHORIZATION, value);
        Ok(req)
    }
}

/// Static headers, inserted over the request's own values.
#[derive(Clone, Debug, Default)]
pub struct HeaderAdapter {
    headers: HeaderMap,
}

impl HeaderAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl Adapter for HeaderAdapter {
    fn adapt(&self, mut req: OutgoingRequest) -> Result<OutgoingRequest, FxError> {
        for (name, value) in self.headers.iter() {
            req.headers.insert(name.clone(), value.clone());
        }
        Ok(req)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use http::Method;
    use url::Url;

    fn req() -> OutgoingRequest {
        OutgoingRequest::new(Method::GET, Url::parse("https://api.example.com/me").unwrap())
    }

    #[test]
    fn bearer_adapter_sets_sensitive_authorization() {
        let out = BearerAuthAdapter::new("t0k").adapt(req()).unwrap();
        let v = &out.headers[AUTHORIZATION];
        assert_eq!(v, "Bearer t0k");
        assert!(v.is_sensitive());
    }

    #[test]
    fn bearer_adapter_rejects_unencodable_token() {
        assert!(BearerAuthAdapter::new("a\r\nb").adapt(req()).is_err());
    }

    #[test]
    fn header_adapter_overrides_request_values() {
        let mut r = req();
        r.headers
            .insert(HeaderName::from_static("x-app"), HeaderValue::from_static("old"));
        let out = HeaderAdapter::new()
            .header(HeaderName::from_static("x-app"), HeaderValue::from_static("new"))
            .adapt(r)
            .unwrap();
        assert_eq!(out.headers["x-app"], "new");
    }

    #[test]
    fn closures_are_adapters() {
        let deny = |_: OutgoingRequest| -> Result<OutgoingRequest, FxError> { Err("denied".into()) };
        assert_eq!(deny.adapt(req()).unwrap_err().to_string(), "denied");
    }
}
