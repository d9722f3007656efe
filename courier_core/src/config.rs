use http::header::{HeaderName, HeaderValue};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::debug::DebugLevel;
use crate::error::BuildError;
use crate::policy::Policy;

pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Pipeline settings, typically read from a config file section.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Per-attempt timeout for requests that set none; `0` disables it.
    pub timeout_ms: u64,
    /// Sent on every request that does not set the header itself.
    pub default_headers: BTreeMap<String, String>,
    pub debug_level: DebugLevel,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            default_headers: BTreeMap::new(),
            debug_level: DebugLevel::None,
        }
    }
}

impl PipelineConfig {
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    pub fn to_policy(&self) -> Result<Policy, BuildError> {
        let mut policy = Policy::new();
        if let Some(t) = self.timeout() {
            policy.set_timeout(t);
        }
        for (name, value) in self.default_headers.iter() {
            let invalid = || BuildError::InvalidHeader { name: name.clone() };
            let n = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let v = HeaderValue::from_str(value).map_err(|_| invalid())?;
            policy.insert_header(n, v);
        }
        Ok(policy)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_use_ten_second_timeout() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(cfg.to_policy().unwrap().timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn deserializes_partial_sections() {
        let cfg: PipelineConfig = serde_json::from_str(
            r#"{"timeout_ms": 0, "default_headers": {"user-agent": "courier/0.1"}, "debug_level": "vv"}"#,
        )
        .unwrap();
        assert_eq!(cfg.timeout(), None);
        assert_eq!(cfg.debug_level, DebugLevel::VV);
        let policy = cfg.to_policy().unwrap();
        assert_eq!(policy.headers()["user-agent"], "courier/0.1");
        assert_eq!(policy.timeout(), None);
    }

    #[test]
    fn invalid_default_header_is_reported() {
        let mut cfg = PipelineConfig::default();
        cfg.default_headers.insert("bad name".into(), "v".into());
        assert!(matches!(
            cfg.to_policy(),
            Err(BuildError::InvalidHeader { .. })
        ));
    }
}
