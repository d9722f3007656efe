use courier_core::prelude::*;
use courier_test_support::*;

pub const BASE: &str = "https://api.example.com";

#[allow(unused)]
pub fn fast_backoff(max: u32) -> BackoffRetrier {
    BackoffRetrier::new(BackoffConfig {
        max,
        base_ms: 0,
        factor: 1.0,
        jitter: false,
        retry_non_idempotent: false,
    })
}

#[allow(unused)]
pub fn pipeline(t: MockTransport) -> RequestPipeline<MockTransport> {
    RequestPipeline::builder(t).debug_sink(NoopDebugSink).build()
}

#[allow(unused)]
pub fn retrying(t: MockTransport, max: u32) -> RequestPipeline<MockTransport> {
    RequestPipeline::builder(t)
        .retrier(fast_backoff(max))
        .debug_sink(NoopDebugSink)
        .build()
}
