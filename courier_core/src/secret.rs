use core::fmt;
use http::HeaderValue;
use http::header::InvalidHeaderValue;

/// Credential wrapper that never reveals its contents in Debug/Display.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    #[inline]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Explicit escape hatch for code that must put the secret on the wire.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// `{prefix}{secret}` as a header value flagged sensitive, so debug sinks
    /// and `http` itself keep it out of logs.
    pub fn header_value(&self, prefix: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut v = HeaderValue::from_str(&format!("{prefix}{}", self.0))?;
        v.set_sensitive(true);
        Ok(v)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<secret>")
    }
}
impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<secret>")
    }
}

impl<T: Into<String>> From<T> for SecretString {
    #[inline]
    fn from(v: T) -> Self {
        Self::new(v)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn secret_is_hidden_but_usable() {
        let s = SecretString::from("tok");
        assert_eq!(format!("{s:?} {s}"), "<secret> <secret>");
        let v = s.header_value("Bearer ").unwrap();
        assert!(v.is_sensitive());
        assert_eq!(v, "Bearer tok");
        assert!(SecretString::new("bad\nvalue").header_value("").is_err());
    }
}
