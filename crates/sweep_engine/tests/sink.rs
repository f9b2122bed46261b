use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use sweep_core::{Source, SubdomainRecord, SyncOutcome};
use sweep_engine::{HttpSink, RemoteSink, SinkAck, SinkError, SinkSettings};
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sink_for(server: &MockServer) -> HttpSink {
    sink_with(server, SinkSettings::default())
}

fn sink_with(server: &MockServer, settings: SinkSettings) -> HttpSink {
    let endpoint = Url::parse(&format!("{}/exec", server.uri())).unwrap();
    HttpSink::new(&SinkSettings {
        endpoint: Some(endpoint),
        ..settings
    })
    .unwrap()
}

fn records() -> Vec<SubdomainRecord> {
    vec![
        SubdomainRecord::new("api.example.com", Source::JavaScript, 1_700_000_000_000)
            .with_origin(Some("www.example.com".to_string())),
        SubdomainRecord::new("cdn.example.net", Source::Url, 1_700_000_000_001),
    ]
}

#[tokio::test]
async fn posts_batch_and_reads_full_ack() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/exec"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "action": "add_subdomains",
            "subdomains": [
                {
                    "domain": "api.example.com",
                    "source": "JavaScript",
                    "timestamp": 1_700_000_000_000u64,
                    "origin": "www.example.com"
                },
                {
                    "domain": "cdn.example.net",
                    "source": "URL",
                    "timestamp": 1_700_000_000_001u64
                }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "added": 2,
            "total_requested": 2,
            "timestamp": "2023-11-14T22:13:20.000Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ack = sink_for(&server).add_subdomains(&records()).await.unwrap();
    assert_eq!(
        ack,
        SinkAck {
            added: 2,
            total_requested: 2,
            timestamp: Some("2023-11-14T22:13:20.000Z".to_string()),
        }
    );
}

#[tokio::test]
async fn partial_ack_is_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "added": 1,
            "total_requested": 2
        })))
        .mount(&server)
        .await;

    let ack = sink_for(&server).add_subdomains(&records()).await.unwrap();
    assert_eq!(ack.added, 1);
    assert_eq!(ack.total_requested, 2);
    assert_eq!(ack.timestamp, None);
}

#[tokio::test]
async fn non_2xx_with_text_body_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let err = sink_for(&server)
        .add_subdomains(&records())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SinkError::Status {
            status: 502,
            body: "<html>Bad Gateway</html>".to_string()
        }
    );
}

#[tokio::test]
async fn malformed_success_body_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let err = sink_for(&server)
        .add_subdomains(&records())
        .await
        .unwrap_err();
    assert!(matches!(err, SinkError::Protocol(_)), "{err:?}");
}

#[tokio::test]
async fn success_without_added_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let err = sink_for(&server)
        .add_subdomains(&records())
        .await
        .unwrap_err();
    assert!(matches!(err, SinkError::Protocol(_)), "{err:?}");
}

#[tokio::test]
async fn explicit_failure_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "Invalid action"
        })))
        .mount(&server)
        .await;

    let err = sink_for(&server)
        .add_subdomains(&records())
        .await
        .unwrap_err();
    assert_eq!(err, SinkError::Rejected("Invalid action".to_string()));
    assert_eq!(
        err.into_outcome(),
        SyncOutcome::Failed {
            reason: "sink rejected batch: Invalid action".to_string()
        }
    );
}

#[tokio::test]
async fn slow_sink_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(300))
                .set_body_json(json!({ "success": true, "added": 2, "total_requested": 2 })),
        )
        .mount(&server)
        .await;

    let sink = sink_with(
        &server,
        SinkSettings {
            request_timeout: Duration::from_millis(50),
            ..SinkSettings::default()
        },
    );
    let err = sink.add_subdomains(&records()).await.unwrap_err();
    assert_eq!(err, SinkError::Timeout);
}

#[tokio::test]
async fn health_check_reads_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/exec"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Subdomain API is running",
            "timestamp": "2024-01-01T00:00:00.000Z"
        })))
        .mount(&server)
        .await;

    let health = sink_for(&server).health().await.unwrap();
    assert_eq!(health.status, "Subdomain API is running");
    assert_eq!(health.timestamp.as_deref(), Some("2024-01-01T00:00:00.000Z"));
}

#[tokio::test]
async fn unconfigured_sink_fails_without_network() {
    let sink = HttpSink::new(&SinkSettings::default()).unwrap();
    assert_eq!(
        sink.add_subdomains(&records()).await.unwrap_err(),
        SinkError::NotConfigured
    );
}
