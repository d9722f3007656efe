use rand::Rng;
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::FxError;
use crate::transport::{OutgoingRequest, RawResponse, TransportError, TransportErrorKind};

/// What one completed attempt produced, as seen by a [`Retrier`].
#[derive(Debug)]
pub struct RetryContext<'a> {
    pub request: &'a OutgoingRequest,
    pub outcome: Result<&'a RawResponse, &'a TransportError>,
    /// 1-based.
    pub attempt: u32,
}

impl RetryContext<'_> {
    #[inline]
    pub fn status(&self) -> Option<http::StatusCode> {
        self.outcome.ok().map(|r| r.status)
    }
}

#[derive(Debug)]
pub enum RetryDecision {
    /// Surface this attempt's outcome to the caller unchanged.
    Proceed,
    /// Run the whole build/adapt/dispatch cycle again.
    Retry,
    /// Stop and fail the call with this error.
    Abort(FxError),
}

/// Decides, once per completed attempt, whether the call goes on.
///
/// The pipeline imposes no attempt cap: a retrier that never stops retrying
/// keeps the call alive forever.
pub trait Retrier: Send + Sync + 'static {
    fn decide<'a>(
        &'a self,
        ctx: RetryContext<'a>,
    ) -> Pin<Box<dyn Future<Output = RetryDecision> + Send + 'a>>;
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Total attempts, first one included.
    pub max: u32,
    pub base_ms: u64,
    pub factor: f64,
    /// ±50% random spread on every delay.
    pub jitter: bool,
    /// Also retry failed non-idempotent requests that may have reached the server.
    pub retry_non_idempotent: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max: 3,
            base_ms: 300,
            factor: 1.5,
            jitter: true,
            retry_non_idempotent: false,
        }
    }
}

/// Exponential backoff: `base_ms * factor^retry_idx`, `retry_idx` starting at 0.
pub fn backoff_delay(cfg: &BackoffConfig, retry_idx: u32) -> Duration {
    let pow = cfg.factor.powi(retry_idx as i32);
    let base = (cfg.base_ms as f64 * pow).round() as u64;
    if !cfg.jitter {
        return Duration::from_millis(base);
    }
    let low = (base as f64 * 0.5) as u64;
    let high = (base as f64 * 1.5) as u64;
    if low >= high {
        Duration::from_millis(base)
    } else {
        Duration::from_millis(rand::thread_rng().gen_range(low..=high))
    }
}

/// Retries transport failures and 408 / 429 / 5xx responses up to `max` attempts.
#[derive(Clone, Debug, Default)]
pub struct BackoffRetrier {
    cfg: BackoffConfig,
}

impl BackoffRetrier {
    pub fn new(cfg: BackoffConfig) -> Self {
        Self { cfg }
    }

    #[inline]
    pub fn config(&self) -> &BackoffConfig {
        &self.cfg
    }

    fn is_retryable(&self, ctx: &RetryContext<'_>) -> bool {
        match ctx.outcome {
            Err(e) => {
                // A connect failure never reached the server.
                ctx.request.meta.idempotent
                    || self.cfg.retry_non_idempotent
                    || e.kind() == TransportErrorKind::Connect
            }
            Ok(resp) => {
                let s = resp.status.as_u16();
                let transient = s == 408 || s == 429 || (500..=599).contains(&s);
                transient && (ctx.request.meta.idempotent || self.cfg.retry_non_idempotent)
            }
        }
    }
}

impl Retrier for BackoffRetrier {
    fn decide<'a>(
        &'a self,
        ctx: RetryContext<'a>,
    ) -> Pin<Box<dyn Future<Output = RetryDecision> + Send + 'a>> {
        Box::pin(async move {
            if !self.is_retryable(&ctx) || ctx.attempt >= self.cfg.max {
                return RetryDecision::Proceed;
            }
            let delay = backoff_delay(&self.cfg, ctx.attempt.saturating_sub(1));
            tracing::debug!(
                target: "courier::retry",
                call = %ctx.request.meta.call_id,
                attempt = ctx.attempt,
                status = ?ctx.status(),
                delay_ms = delay.as_millis() as u64,
                "retrying"
            );
            tokio::time::sleep(delay).await;
            RetryDecision::Retry
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode};
    use url::Url;

    fn plan(max: u32) -> BackoffConfig {
        BackoffConfig {
            max,
            base_ms: 0,
            factor: 2.0,
            jitter: false,
            retry_non_idempotent: false,
        }
    }

    fn request(method: Method, idempotent: bool) -> OutgoingRequest {
        let mut r = OutgoingRequest::new(method, Url::parse("https://api.example.com/x").unwrap());
        r.meta.idempotent = idempotent;
        r
    }

    fn response(req: &OutgoingRequest, status: u16) -> RawResponse {
        RawResponse {
            meta: req.meta.clone(),
            url: req.url.clone(),
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    #[test]
    fn backoff_is_exponential_without_jitter() {
        let p = BackoffConfig {
            base_ms: 100,
            ..plan(3)
        };
        assert_eq!(backoff_delay(&p, 0), Duration::from_millis(100));
        assert_eq!(backoff_delay(&p, 1), Duration::from_millis(200));
        assert_eq!(backoff_delay(&p, 2), Duration::from_millis(400));
    }

    #[test]
    fn jitter_stays_within_half_spread() {
        let p = BackoffConfig {
            base_ms: 100,
            jitter: true,
            ..plan(3)
        };
        for _ in 0..50 {
            let d = backoff_delay(&p, 0).as_millis();
            assert!((50..=150).contains(&d));
        }
    }

    #[tokio::test]
    async fn retries_server_errors_until_max() {
        let r = BackoffRetrier::new(plan(3));
        let req = request(Method::GET, true);
        let resp = response(&req, 503);
        for attempt in 1..3 {
            let ctx = RetryContext {
                request: &req,
                outcome: Ok(&resp),
                attempt,
            };
            assert!(matches!(r.decide(ctx).await, RetryDecision::Retry));
        }
        let ctx = RetryContext {
            request: &req,
            outcome: Ok(&resp),
            attempt: 3,
        };
        assert!(matches!(r.decide(ctx).await, RetryDecision::Proceed));
    }

    #[tokio::test]
    async fn client_errors_proceed_immediately() {
        let r = BackoffRetrier::new(plan(5));
        let req = request(Method::GET, true);
        for status in [400, 401, 404] {
            let resp = response(&req, status);
            let ctx = RetryContext {
                request: &req,
                outcome: Ok(&resp),
                attempt: 1,
            };
            assert!(matches!(r.decide(ctx).await, RetryDecision::Proceed));
        }
    }

    #[tokio::test]
    async fn non_idempotent_only_retries_connect_failures() {
        let r = BackoffRetrier::new(plan(5));
        let req = request(Method::POST, false);
        let resp = response(&req, 502);
        let ctx = RetryContext {
            request: &req,
            outcome: Ok(&resp),
            attempt: 1,
        };
        assert!(matches!(r.decide(ctx).await, RetryDecision::Proceed));

        let timeout = TransportError::timeout("slow");
        let ctx = RetryContext {
            request: &req,
            outcome: Err(&timeout),
            attempt: 1,
        };
        assert!(matches!(r.decide(ctx).await, RetryDecision::Proceed));

        let refused = TransportError::with_kind(TransportErrorKind::Connect, "refused");
        let ctx = RetryContext {
            request: &req,
            outcome: Err(&refused),
            attempt: 1,
        };
        assert!(matches!(r.decide(ctx).await, RetryDecision::Retry));
    }
}
