mod common;
use common::*;

use courier_core::prelude::*;
use courier_test_support::*;
use http::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use http::{HeaderValue, StatusCode};
use std::time::Duration;

#[tokio::test]
async fn default_policy_applies_ten_second_timeout() {
    let (t, h) = mock()
        .replies([
            MockReply::status(StatusCode::OK),
            MockReply::status(StatusCode::OK),
            MockReply::status(StatusCode::OK),
            MockReply::status(StatusCode::OK),
        ])
        .build();
    let p = pipeline(t);

    p.execute(Route::get(BASE)).await.unwrap();
    p.request(Route::get(BASE)).timeout(Duration::from_secs(2)).await.unwrap();
    p.request(Route::get(BASE)).clear_timeout().await.unwrap();
    p.execute(Route::get(BASE).timeout(Duration::from_secs(1))).await.unwrap();

    let reqs = h.recorded();
    assert_request(&reqs[0]).timeout(Some(Duration::from_secs(10)));
    assert_request(&reqs[1]).timeout(Some(Duration::from_secs(2)));
    assert_request(&reqs[2]).timeout(None);
    assert_request(&reqs[3]).timeout(Some(Duration::from_secs(1)));
    h.finish();
}

#[tokio::test]
async fn configured_defaults_fill_only_missing_parts() {
    let cfg: PipelineConfig = serde_json::from_value(serde_json::json!({
        "timeout_ms": 2500,
        "default_headers": { "user-agent": "courier-tests/1.0", "x-tenant": "acme" }
    }))
    .unwrap();
    let (t, h) = mock()
        .replies([MockReply::status(StatusCode::OK), MockReply::status(StatusCode::OK)])
        .build();
    let p = RequestPipeline::builder(t)
        .config(&cfg)
        .unwrap()
        .debug_sink(NoopDebugSink)
        .build();

    p.execute(Route::get(BASE)).await.unwrap();
    p.execute(Route::get(BASE).header("x-tenant", "globex")).await.unwrap();

    let reqs = h.recorded();
    assert_request(&reqs[0])
        .header(USER_AGENT, "courier-tests/1.0")
        .header("x-tenant", "acme")
        .timeout(Some(Duration::from_millis(2500)));
    assert_request(&reqs[1]).header("x-tenant", "globex");
    h.finish();
}

#[tokio::test]
async fn policy_query_is_appended_unless_present() {
    let mut policy = Policy::new();
    policy.push_query("api_key", "k1");
    policy.push_query("lang", "en");
    let (t, h) = mock().reply(MockReply::status(StatusCode::OK)).build();
    let p = RequestPipeline::builder(t)
        .policy(policy)
        .debug_sink(NoopDebugSink)
        .build();

    p.execute(Route::get(BASE).path("search").query("lang", "fr"))
        .await
        .unwrap();

    assert_request(&h.recorded()[0])
        .query_has("api_key", "k1")
        .query_values("lang", &["fr"]);
    h.finish();
}

#[tokio::test]
async fn accept_is_injected_but_never_overridden() {
    let (t, h) = mock()
        .replies([
            MockReply::ok_json("{}".into()),
            MockReply::ok_json("{}".into()),
            MockReply::status(StatusCode::OK),
        ])
        .build();
    let p = pipeline(t);

    let _: Option<serde_json::Value> = p.execute_typed(Route::get(BASE)).await.unwrap();
    let _: Option<serde_json::Value> = p
        .execute_typed(Route::get(BASE).header("accept", "application/vnd.api+json"))
        .await
        .unwrap();
    p.execute(Route::new(http::Method::HEAD, BASE)).await.unwrap();

    let reqs = h.recorded();
    assert_request(&reqs[0]).header(ACCEPT, "application/json");
    assert_request(&reqs[1]).header(ACCEPT, "application/vnd.api+json");
    assert_request(&reqs[2]).header_absent(ACCEPT);
    h.finish();
}

#[tokio::test]
async fn bearer_adapter_runs_on_every_attempt() {
    let (t, h) = mock()
        .replies([
            MockReply::status(StatusCode::SERVICE_UNAVAILABLE),
            MockReply::status(StatusCode::OK),
        ])
        .build();
    let p = RequestPipeline::builder(t)
        .adapter(BearerAuthAdapter::new("s3cr3t"))
        .retrier(fast_backoff(2))
        .debug_sink(NoopDebugSink)
        .build();

    p.execute(Route::get(BASE).header("authorization", "Basic old"))
        .await
        .unwrap();

    for r in h.recorded().iter() {
        assert_request(r).header(AUTHORIZATION, "Bearer s3cr3t");
    }
    h.assert_recorded_len(2);
    h.finish();
}

#[tokio::test]
async fn header_adapter_overrides_endpoint_values() {
    let (t, h) = mock().reply(MockReply::status(StatusCode::OK)).build();
    let p = RequestPipeline::builder(t)
        .adapter(HeaderAdapter::new().header(USER_AGENT, HeaderValue::from_static("courier")))
        .debug_sink(NoopDebugSink)
        .build();

    p.execute(Route::get(BASE).header("user-agent", "curl")).await.unwrap();
    assert_request(&h.recorded()[0]).header(USER_AGENT, "courier");
    h.finish();
}
