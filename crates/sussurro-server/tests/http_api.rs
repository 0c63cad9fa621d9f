//! End-to-end tests over a real HTTP listener.

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;
use sussurro_server::config::ServerConfig;
use sussurro_server::server::SussurroServer;
use sussurro_transcription::transcriber::{MockFailure, MockTranscriber};
use tokio::time::timeout;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Boot a test server on an ephemeral port and return its base URL.
async fn boot_server(
    engine: Arc<MockTranscriber>,
) -> (String, SussurroServer, tokio::task::JoinHandle<()>) {
    let config = ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        ..ServerConfig::default()
    };
    let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
    let server = SussurroServer::new(config, engine, metrics_handle);
    let (addr, task) = server.listen().await.unwrap();
    (format!("http://{addr}"), server, task)
}

fn wav_part(bytes: &[u8], filename: &str) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(bytes.to_vec())
        .file_name(filename.to_string())
        .mime_str("audio/wav")
        .unwrap();
    reqwest::multipart::Form::new().part("file", part)
}

#[tokio::test]
async fn e2e_health_endpoint() {
    let engine = Arc::new(MockTranscriber::new("base").with_text("hi"));
    let (url, server, _task) = boot_server(engine).await;

    let resp = reqwest::get(format!("{url}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);

    let parsed: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["model"], "base");
    assert_eq!(parsed["engine_ready"], true);

    server.shutdown();
}

#[tokio::test]
async fn e2e_transcribe_roundtrip() {
    let engine = Arc::new(MockTranscriber::new("base").with_text("the quick brown fox"));
    let (url, server, _task) = boot_server(engine.clone()).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{url}/transcribe"))
        .multipart(wav_part(b"fake wav bytes", "clip.wav"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let parsed: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(parsed["text"], "the quick brown fox");
    assert_eq!(parsed["model"], "base");
    assert!(parsed["processing_time_ms"].is_number());

    // The staged upload must be gone once the response is out.
    for path in engine.seen_paths() {
        assert!(!path.exists(), "leftover staging file: {}", path.display());
    }

    server.shutdown();
}

#[tokio::test]
async fn e2e_error_responses_have_error_field() {
    let engine = Arc::new(MockTranscriber::new("base").with_failure(MockFailure::Inference));
    let (url, server, _task) = boot_server(engine.clone()).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{url}/transcribe"))
        .multipart(wav_part(b"bytes", "clip.wav"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);

    let parsed: serde_json::Value = resp.json().await.unwrap();
    assert!(parsed["error"].is_string());
    assert_eq!(parsed["code"], "INFERENCE_FAILED");

    // Failure path also cleans up its staging file.
    for path in engine.seen_paths() {
        assert!(!path.exists(), "leftover staging file: {}", path.display());
    }

    server.shutdown();
}

#[tokio::test]
async fn e2e_metrics_endpoint() {
    let engine = Arc::new(MockTranscriber::new("base"));
    let (url, server, _task) = boot_server(engine).await;

    let resp = reqwest::get(format!("{url}/metrics")).await.unwrap();
    assert_eq!(resp.status(), 200);

    server.shutdown();
}

#[tokio::test]
async fn e2e_concurrent_uploads_are_isolated() {
    let engine = Arc::new(MockTranscriber::new("base").echoing_file());
    let (url, server, _task) = boot_server(engine).await;

    let client = reqwest::Client::new();
    let first = client
        .post(format!("{url}/transcribe"))
        .multipart(wav_part(b"first recording", "a.wav"))
        .send();
    let second = client
        .post(format!("{url}/transcribe"))
        .multipart(wav_part(b"second recording", "b.wav"))
        .send();

    let (first, second) = tokio::join!(first, second);
    let first: serde_json::Value = first.unwrap().json().await.unwrap();
    let second: serde_json::Value = second.unwrap().json().await.unwrap();

    assert_eq!(first["text"], "first recording");
    assert_eq!(second["text"], "second recording");

    server.shutdown();
}

#[tokio::test]
async fn e2e_graceful_shutdown() {
    let engine = Arc::new(MockTranscriber::new("base").with_text("hi"));
    let (url, server, task) = boot_server(engine).await;

    // Server answers before shutdown.
    let resp = reqwest::get(format!("{url}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);

    server.shutdown();
    timeout(TIMEOUT, task)
        .await
        .expect("server did not stop in time")
        .unwrap();

    // New connections are refused once the listener is gone.
    assert!(reqwest::get(format!("{url}/health")).await.is_err());
}
