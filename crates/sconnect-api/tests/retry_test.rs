#![allow(clippy::unwrap_used)]
// Integration tests for the retrying executor using wiremock.

use std::time::{Duration, Instant};

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sconnect_api::{CancellationToken, Error, RetryPolicy, send_with_retry};

// ── Helpers ─────────────────────────────────────────────────────────

fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(1),
        max_jitter: Duration::ZERO,
    }
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

// ── Retry behavior ──────────────────────────────────────────────────

#[tokio::test]
async fn test_recovers_after_n_server_errors() {
    for n in 0..=3_u32 {
        let server = MockServer::start().await;

        if n > 0 {
            Mock::given(method("GET"))
                .and(path("/flaky"))
                .respond_with(ResponseTemplate::new(503))
                .up_to_n_times(u64::from(n))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let url = format!("{}/flaky", server.uri());
        let resp = send_with_retry(&fast_policy(n), &CancellationToken::new(), || {
            http.get(&url)
        })
        .await
        .unwrap();

        assert_eq!(resp.status(), 200, "n = {n}");
        assert_eq!(resp.text().await.unwrap(), "ok");
        assert_eq!(
            request_count(&server).await,
            usize::try_from(n).unwrap() + 1,
            "expected exactly {n} retries"
        );
    }
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .expect(1)
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let url = format!("{}/missing", server.uri());
    let resp = send_with_retry(&fast_policy(5), &CancellationToken::new(), || {
        http.get(&url)
    })
    .await
    .unwrap();

    assert_eq!(resp.status(), 404);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let url = format!("{}/auth", server.uri());
    let resp = send_with_retry(&fast_policy(3), &CancellationToken::new(), || {
        http.post(&url)
    })
    .await
    .unwrap();

    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_rate_limit_exhausts_budget_and_returns_last_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let url = format!("{}/busy", server.uri());
    let resp = send_with_retry(&fast_policy(2), &CancellationToken::new(), || {
        http.get(&url)
    })
    .await
    .expect("exhausted retries should hand back the response, not an error");

    assert_eq!(resp.status(), 429);
    assert_eq!(resp.text().await.unwrap(), "slow down");
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_zero_budget_sends_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let http = reqwest::Client::new();
    let url = format!("{}/down", server.uri());
    let resp = send_with_retry(&fast_policy(0), &CancellationToken::new(), || {
        http.get(&url)
    })
    .await
    .unwrap();

    assert_eq!(resp.status(), 500);
}

#[tokio::test]
async fn test_transport_error_is_terminal() {
    // Bind then drop a listener to get a port nothing is serving.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = format!("http://127.0.0.1:{port}/nowhere");

    let http = reqwest::Client::new();
    let started = Instant::now();
    let policy = RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_secs(5),
        max_jitter: Duration::ZERO,
    };
    let result = send_with_retry(&policy, &CancellationToken::new(), || http.get(&url)).await;

    assert!(
        matches!(result, Err(Error::Transport(_))),
        "expected Transport error, got: {result:?}"
    );
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "transport errors must not back off"
    );
}

// ── Cancellation ────────────────────────────────────────────────────

#[tokio::test]
async fn test_cancel_during_backoff() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let policy = RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_secs(30),
        max_jitter: Duration::ZERO,
    };
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let http = reqwest::Client::new();
    let url = format!("{}/slow", server.uri());
    let started = Instant::now();
    let result = send_with_retry(&policy, &cancel, || http.get(&url)).await;

    assert!(
        matches!(result, Err(Error::Cancelled)),
        "expected Cancelled, got: {result:?}"
    );
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_already_cancelled_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let http = reqwest::Client::new();
    let url = format!("{}/never", server.uri());
    let result = send_with_retry(&fast_policy(3), &cancel, || http.get(&url)).await;

    assert!(matches!(result, Err(Error::Cancelled)));
}

#[tokio::test]
async fn test_cancel_while_waiting_for_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let http = reqwest::Client::new();
    let url = format!("{}/hang", server.uri());
    let started = Instant::now();
    let result = send_with_retry(&fast_policy(0), &cancel, || http.get(&url)).await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(10));
}
