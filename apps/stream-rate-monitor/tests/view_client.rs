//! View Client Integration Tests
//!
//! Tests the Aptos view client against a mock fullnode, covering response
//! decoding, retry behavior, and error classification.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stream_rate_monitor::{
    AccountAddress, AptosClientConfig, AptosViewClient, LedgerQueryError, LedgerQueryPort,
    RetryConfig,
};

fn test_config(endpoint: &str) -> AptosClientConfig {
    AptosClientConfig::new(endpoint, "0xcafe", "pay_stream")
        .with_timeout(Duration::from_secs(2))
        .with_retry(RetryConfig {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
            multiplier: 2.0,
            jitter_factor: 0.0,
        })
}

fn client(server: &MockServer) -> AptosViewClient {
    AptosViewClient::new(test_config(&server.uri())).unwrap()
}

#[tokio::test]
async fn test_sender_streams_decode_columns() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/view"))
        .and(body_partial_json(json!({
            "function": "0xcafe::pay_stream::get_senders_streams",
            "arguments": ["0xaaa"],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ["0xbbb", "0xccc"],
            ["1000", "0"],
            ["3600000", "60000"],
            ["360000000000", "100000000"],
            ["1", "2"],
        ])))
        .mount(&server)
        .await;

    let account = AccountAddress::new("0xAAA");
    let streams = client(&server).sender_streams(&account).await.unwrap();

    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].sender, account);
    assert_eq!(streams[0].recipient, AccountAddress::new("0xbbb"));
    assert_eq!(streams[0].start_time_ms, 1_000);
    assert_eq!(streams[0].duration_ms, 3_600_000);
    assert!((streams[0].amount_apt - 3_600.0).abs() < 1e-9);
    assert_eq!(streams[1].stream_id, 2);
    assert!(!streams[1].has_started());
}

#[tokio::test]
async fn test_receiver_streams_swap_roles() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/view"))
        .and(body_partial_json(json!({
            "function": "0xcafe::pay_stream::get_receivers_streams",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ["0xbbb"],
            ["1000"],
            ["60000"],
            ["50000000"],
            ["7"],
        ])))
        .mount(&server)
        .await;

    let account = AccountAddress::new("0xaaa");
    let streams = client(&server).receiver_streams(&account).await.unwrap();

    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].sender, AccountAddress::new("0xbbb"));
    assert_eq!(streams[0].recipient, account);
    assert!((streams[0].amount_apt - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_empty_response_yields_no_streams() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/view"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([[], [], [], [], []])),
        )
        .mount(&server)
        .await;

    let account = AccountAddress::new("0xaaa");
    let streams = client(&server).sender_streams(&account).await.unwrap();

    assert!(streams.is_empty());
}

#[tokio::test]
async fn test_short_response_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/view"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([["0xbbb"], ["1000"]])),
        )
        .mount(&server)
        .await;

    let account = AccountAddress::new("0xaaa");
    let err = client(&server).sender_streams(&account).await.unwrap_err();

    assert!(err.is_malformed());
    assert!(matches!(err, LedgerQueryError::MalformedResponse { .. }));
}

#[tokio::test]
async fn test_rejection_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/view"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({
                "message": "bad account",
                "error_code": "invalid_input",
            })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let account = AccountAddress::new("0xaaa");
    let err = client(&server).sender_streams(&account).await.unwrap_err();

    match err {
        LedgerQueryError::Rejected { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "bad account");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let server = MockServer::start().await;

    // First two attempts fail, the third succeeds.
    Mock::given(method("POST"))
        .and(path("/v1/view"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/view"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([
                ["0xbbb"],
                ["1000"],
                ["60000"],
                ["100000000"],
                ["1"],
            ])),
        )
        .mount(&server)
        .await;

    let account = AccountAddress::new("0xaaa");
    let streams = client(&server).sender_streams(&account).await.unwrap();

    assert_eq!(streams.len(), 1);
}

#[tokio::test]
async fn test_exhausted_retries_surface_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/view"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let account = AccountAddress::new("0xaaa");
    let err = client(&server).sender_streams(&account).await.unwrap_err();

    assert!(matches!(err, LedgerQueryError::Transport { .. }));
    assert!(!err.is_malformed());
}
