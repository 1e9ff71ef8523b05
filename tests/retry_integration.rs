//! Retry, backoff, and endpoint-fallback behavior against mock servers.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use cpf_lookup::{Endpoint, LookupClient, LookupConfig};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

const VALID_CPF: &str = "11144477735";

const RECORD_HTML: &str =
    r#"<div class="nome">Maria da Silva</div><span class="data-nascimento">12/03/1985</span>"#;

fn test_config(endpoints: Vec<Endpoint>, max_attempts: u32) -> LookupConfig {
    LookupConfig::default()
        .with_endpoints(endpoints)
        .with_max_attempts(max_attempts)
        .with_timeout(Duration::from_secs(5))
        .with_backoff(Duration::ZERO, Duration::ZERO)
}

fn form_endpoint(server: &MockServer, query_path: &str) -> Endpoint {
    Endpoint::form(Url::parse(&format!("{}{query_path}", server.uri())).expect("valid url"))
}

/// Responder that fails with a given status a fixed number of times, then
/// serves the record.
struct FlakyResponder {
    failures: u32,
    failure_status: u16,
    seen: AtomicU32,
}

impl FlakyResponder {
    fn new(failures: u32, failure_status: u16) -> Self {
        Self {
            failures,
            failure_status,
            seen: AtomicU32::new(0),
        }
    }
}

impl Respond for FlakyResponder {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let n = self.seen.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            ResponseTemplate::new(self.failure_status).set_body_string("not yet")
        } else {
            ResponseTemplate::new(200).set_body_string(RECORD_HTML)
        }
    }
}

#[tokio::test]
async fn test_transient_failures_are_retried_on_same_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/consulta"))
        .respond_with(FlakyResponder::new(2, 500))
        .expect(3)
        .mount(&server)
        .await;

    let config = test_config(vec![form_endpoint(&server, "/consulta")], 3);
    let client = LookupClient::new(config).expect("client builds");

    let result = client.lookup(VALID_CPF).await;

    assert!(result.success, "expected success: {:?}", result.message);
    assert_eq!(result.diagnostics.attempts, 3);
    assert_eq!(result.diagnostics.endpoint_index, Some(0));
}

#[tokio::test]
async fn test_exhausted_endpoint_falls_over_to_next() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/up"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RECORD_HTML))
        .expect(1)
        .mount(&server)
        .await;

    let endpoints = vec![form_endpoint(&server, "/down"), form_endpoint(&server, "/up")];
    let client = LookupClient::new(test_config(endpoints, 2)).expect("client builds");

    let result = client.lookup(VALID_CPF).await;

    assert!(result.success);
    assert_eq!(result.diagnostics.endpoint_index, Some(1));
    assert_eq!(result.diagnostics.attempts, 3, "2 on the dead endpoint + 1");
}

#[tokio::test]
async fn test_rate_limited_endpoint_is_surfaced_as_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("too many requests"))
        .expect(2)
        .mount(&server)
        .await;

    let config = test_config(vec![form_endpoint(&server, "/consulta")], 2);
    let client = LookupClient::new(config).expect("client builds");

    let result = client.lookup(VALID_CPF).await;

    assert!(!result.success);
    assert_eq!(result.diagnostics.attempts, 2);
    assert_eq!(result.diagnostics.http_status, Some(429));
    assert!(result.message.expect("message").contains("blocked"));
}

#[tokio::test]
async fn test_unreachable_endpoint_falls_over_to_healthy_one() {
    // Nothing listens on port 1; every transport fails at the connection
    // level, which classifies as transient and moves on.
    let dead = Endpoint::form(Url::parse("http://127.0.0.1:1/consulta").expect("valid url"));

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/consulta"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RECORD_HTML))
        .expect(1)
        .mount(&server)
        .await;

    let endpoints = vec![dead, form_endpoint(&server, "/consulta")];
    let client = LookupClient::new(test_config(endpoints, 1)).expect("client builds");

    let result = client.lookup(VALID_CPF).await;

    assert!(result.success, "expected success: {:?}", result.message);
    assert_eq!(result.diagnostics.endpoint_index, Some(1));
}

#[tokio::test]
async fn test_retry_bound_never_exceeds_attempts_times_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .expect(8) // exactly N * E, never more
        .mount(&server)
        .await;

    let endpoints = vec![
        form_endpoint(&server, "/a"),
        form_endpoint(&server, "/b"),
    ];
    let client = LookupClient::new(test_config(endpoints, 4)).expect("client builds");

    let result = client.lookup(VALID_CPF).await;

    assert!(!result.success);
    assert_eq!(result.diagnostics.attempts, 8);
    assert!(result.message.expect("message").contains("unreachable"));
}
