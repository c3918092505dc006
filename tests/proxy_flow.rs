//! End-to-end tests for `/raw` forwarding and upstream backoff.

use axum::http::StatusCode;
use cors_proxy::config::HostKeyMode;

mod common;

use common::{get_raw, start_fixed_upstream, start_proxy, test_config, MockReply};

fn retry_after(res: &reqwest::Response) -> u64 {
    res.headers()["retry-after"].to_str().unwrap().parse().unwrap()
}

async fn detail(res: reqwest::Response) -> String {
    let body: serde_json::Value = serde_json::from_str(&res.text().await.unwrap()).unwrap();
    body["detail"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_missing_url_is_bad_request() {
    let (proxy, shutdown) = start_proxy(test_config()).await;
    let client = common::client();

    let res = client.get(format!("http://{proxy}/raw")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail(res).await, "missing url");

    let res = client.get(format!("http://{proxy}/raw?url=")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    shutdown.trigger();
}

#[tokio::test]
async fn test_non_http_scheme_is_bad_request() {
    let (proxy, shutdown) = start_proxy(test_config()).await;

    let res = get_raw(proxy, "ftp://host/file").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(detail(res).await, "scheme/host required");

    let res = get_raw(proxy, "//host/relative").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    shutdown.trigger();
}

#[tokio::test]
async fn test_success_is_forwarded_with_sanitized_headers() {
    let upstream = start_fixed_upstream(
        MockReply::new(200, "<rss version=\"2.0\"/>")
            .header("Content-Type", "application/rss+xml")
            .header("X-Feed-Id", "42")
            .header("Keep-Alive", "timeout=5")
            .header("Proxy-Authenticate", "Basic"),
    )
    .await;
    let (proxy, shutdown) = start_proxy(test_config()).await;

    let res = get_raw(proxy, &upstream.url("/feed.xml")).await;
    assert_eq!(res.status(), StatusCode::OK);

    let headers = res.headers();
    assert_eq!(headers["content-type"], "application/rss+xml");
    assert_eq!(headers["x-feed-id"], "42");
    assert!(headers.get("keep-alive").is_none());
    assert!(headers.get("proxy-authenticate").is_none());
    assert!(headers.get("retry-after").is_none());
    assert!(headers.get("x-request-id").is_some());
    assert_eq!(res.text().await.unwrap(), "<rss version=\"2.0\"/>");

    let seen = &upstream.requests()[0];
    assert!(seen.starts_with("get /feed.xml http/1.1"));
    assert!(seen.contains("user-agent: mozilla/5.0"));
    assert!(seen.contains("accept: application/rss+xml"));
    assert!(seen.contains(&format!("referer: {}", upstream.url("/feed.xml"))));

    shutdown.trigger();
}

#[tokio::test]
async fn test_caller_identity_headers_are_preferred() {
    let upstream = start_fixed_upstream(MockReply::new(200, "ok")).await;
    let (proxy, shutdown) = start_proxy(test_config()).await;

    common::client()
        .get(format!("http://{proxy}/raw"))
        .query(&[("url", upstream.url("/"))])
        .header("User-Agent", "FeedReader/1.0")
        .header("Referer", "https://app.example/")
        .header("Cookie", "session=secret")
        .send()
        .await
        .unwrap();

    let seen = &upstream.requests()[0];
    assert!(seen.contains("user-agent: feedreader/1.0"));
    assert!(seen.contains("referer: https://app.example/"));
    assert!(!seen.contains("session=secret"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_consecutive_429s_throttle_the_host() {
    let upstream = start_fixed_upstream(
        MockReply::new(429, "slow down").header("Retry-After", "5"),
    )
    .await;
    let (proxy, shutdown) = start_proxy(test_config()).await;

    let res = get_raw(proxy, &upstream.url("/a")).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(retry_after(&res), 30);
    assert_eq!(res.text().await.unwrap(), "slow down");

    let res = get_raw(proxy, &upstream.url("/b")).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!((29..=30).contains(&retry_after(&res)));
    assert_eq!(detail(res).await, "Backoff in effect for upstream host");

    assert_eq!(upstream.hits(), 1, "throttled request must not reach upstream");
    shutdown.trigger();
}

#[tokio::test]
async fn test_long_backoff_status_is_passed_through() {
    let upstream = start_fixed_upstream(MockReply::new(404, "no such feed")).await;
    let (proxy, shutdown) = start_proxy(test_config()).await;

    let res = get_raw(proxy, &upstream.url("/missing")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(retry_after(&res), 86_400);
    assert_eq!(res.text().await.unwrap(), "no such feed");

    let res = get_raw(proxy, &upstream.url("/other")).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!((86_399..=86_400).contains(&retry_after(&res)));
    assert_eq!(upstream.hits(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_other_upstream_errors_do_not_back_off() {
    let upstream = start_fixed_upstream(MockReply::new(502, "bad gateway upstream")).await;
    let (proxy, shutdown) = start_proxy(test_config()).await;

    for _ in 0..3 {
        let res = get_raw(proxy, &upstream.url("/")).await;
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
        assert!(res.headers().get("retry-after").is_none());
    }
    assert_eq!(upstream.hits(), 3);

    shutdown.trigger();
}

#[tokio::test]
async fn test_connection_failure_is_502_then_throttled() {
    let dead = common::closed_port().await;
    let (proxy, shutdown) = start_proxy(test_config()).await;
    let target = format!("http://{dead}/feed");

    let res = get_raw(proxy, &target).await;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(retry_after(&res), 30);
    assert!(detail(res).await.starts_with("Upstream connection failed"));

    let res = get_raw(proxy, &target).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!((29..=30).contains(&retry_after(&res)));

    shutdown.trigger();
}

#[tokio::test]
async fn test_slow_upstream_is_502_then_throttled() {
    let upstream = common::start_programmable_upstream(|| async {
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        MockReply::new(200, "late")
    })
    .await;

    let mut config = test_config();
    config.listener.request_timeout_secs = 5;
    config.upstream.timeout_secs = 0.5;
    let (proxy, shutdown) = start_proxy(config).await;

    let res = get_raw(proxy, &upstream.url("/slow")).await;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(retry_after(&res), 30);

    let res = get_raw(proxy, &upstream.url("/slow")).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(upstream.hits(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_success_clears_backoff() {
    let counter = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let upstream = common::start_programmable_upstream(move || {
        let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        async move {
            if n == 0 {
                MockReply::new(429, "busy")
            } else {
                MockReply::new(200, "fresh")
            }
        }
    })
    .await;

    let mut config = test_config();
    config.backoff.base_secs = 1;
    config.backoff.max_secs = 1;
    let (proxy, shutdown) = start_proxy(config).await;

    let res = get_raw(proxy, &upstream.url("/")).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(retry_after(&res), 1);

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    let res = get_raw(proxy, &upstream.url("/")).await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = get_raw(proxy, &upstream.url("/")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(upstream.hits(), 3);

    shutdown.trigger();
}

#[tokio::test]
async fn test_backoff_is_shared_across_ports_by_default() {
    let throttled = start_fixed_upstream(MockReply::new(429, "busy")).await;
    let healthy = start_fixed_upstream(MockReply::new(200, "ok")).await;
    let (proxy, shutdown) = start_proxy(test_config()).await;

    get_raw(proxy, &throttled.url("/")).await;
    let res = get_raw(proxy, &healthy.url("/")).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(healthy.hits(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_host_port_keys_separate_ports() {
    let throttled = start_fixed_upstream(MockReply::new(429, "busy")).await;
    let healthy = start_fixed_upstream(MockReply::new(200, "ok")).await;

    let mut config = test_config();
    config.upstream.host_key = HostKeyMode::HostPort;
    let (proxy, shutdown) = start_proxy(config).await;

    get_raw(proxy, &throttled.url("/")).await;
    let res = get_raw(proxy, &healthy.url("/")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(healthy.hits(), 1);

    let res = get_raw(proxy, &throttled.url("/")).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(throttled.hits(), 1);

    shutdown.trigger();
}
