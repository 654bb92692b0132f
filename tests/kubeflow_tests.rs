//! Kubeflow Pipelines client tests against a mock HTTP server.

use ai_operator::crd::AkamaiKnowledgeBaseSpec;
use ai_operator::error::OperatorError;
use ai_operator::services::{KubeflowPipelinesService, PipelineService};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service(server: &MockServer) -> KubeflowPipelinesService {
    KubeflowPipelinesService::new(Some(server.uri())).unwrap()
}

fn sample_kb() -> AkamaiKnowledgeBaseSpec {
    serde_json::from_value(json!({
        "pipelineName": "test-pipeline",
        "pipelineParameters": {
            "url": "https://example.com/kb-data",
            "embedding_model_name": "e5-mistral-7b",
        },
    }))
    .unwrap()
}

async fn mount_pipeline_lookup(server: &MockServer, pipelines: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/apis/v2beta1/pipelines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "pipelines": pipelines })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn run_pipeline_submits_parameters_and_returns_run_id() {
    let server = MockServer::start().await;
    mount_pipeline_lookup(&server, json!([{"pipeline_id": "pipeline-123"}])).await;
    Mock::given(method("POST"))
        .and(path("/apis/v2beta1/runs"))
        .and(body_partial_json(json!({
            "pipeline_version_reference": {"pipeline_id": "pipeline-123"},
            "runtime_config": {"parameters": {
                "url": "https://example.com/kb-data",
                "embedding_model_name": "e5-mistral-7b",
            }},
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"run_id": "run-abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let run_id = service(&server)
        .run_pipeline("test-namespace", "test-kb", &sample_kb())
        .await
        .unwrap();
    assert_eq!(run_id, "run-abc");
}

#[tokio::test]
async fn run_pipeline_requires_a_pipeline_name() {
    let server = MockServer::start().await;
    let mut kb = sample_kb();
    kb.pipeline_name = String::new();

    let err = service(&server)
        .run_pipeline("test-namespace", "test-kb", &kb)
        .await
        .unwrap_err();
    assert!(matches!(err, OperatorError::Domain(_)));
    assert!(err.to_string().contains("No pipeline specified"));
    // No request reached the server
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn run_pipeline_reports_unknown_pipeline() {
    let server = MockServer::start().await;
    mount_pipeline_lookup(&server, json!([])).await;

    let err = service(&server)
        .run_pipeline("test-namespace", "test-kb", &sample_kb())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("'test-pipeline' not found"));
}

#[tokio::test]
async fn upload_creates_version_for_existing_pipeline() {
    let server = MockServer::start().await;
    mount_pipeline_lookup(&server, json!([{"pipeline_id": "pipeline-123"}])).await;
    Mock::given(method("POST"))
        .and(path("/apis/v2beta1/pipelines/upload_version"))
        .and(query_param("name", "test-pipeline 1.0.0"))
        .and(query_param("pipelineid", "pipeline-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pipeline_id": "pipeline-123",
            "pipeline_version_id": "ver-456",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let package = dir.path().join("compiled.yaml");
    std::fs::write(&package, "pipelineInfo:\n  name: test-pipeline\n").unwrap();

    let result = service(&server)
        .upload_pipeline_version(&package, "test-pipeline 1.0.0", Some("test-pipeline"))
        .await
        .unwrap();
    assert_eq!(
        result,
        ("pipeline-123".to_string(), Some("ver-456".to_string()))
    );
}

#[tokio::test]
async fn upload_registers_unknown_pipeline() {
    let server = MockServer::start().await;
    mount_pipeline_lookup(&server, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/apis/v2beta1/pipelines/upload"))
        .and(query_param("name", "test-pipeline"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"pipeline_id": "pipeline-789"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let package = dir.path().join("compiled.yaml");
    std::fs::write(&package, "pipelineInfo:\n  name: test-pipeline\n").unwrap();

    let result = service(&server)
        .upload_pipeline_version(&package, "test-pipeline 1.0.0", Some("test-pipeline"))
        .await
        .unwrap();
    assert_eq!(result, ("pipeline-789".to_string(), None));
}

#[tokio::test]
async fn upload_failure_surfaces_http_status() {
    let server = MockServer::start().await;
    mount_pipeline_lookup(&server, json!([{"pipeline_id": "pipeline-123"}])).await;
    Mock::given(method("POST"))
        .and(path("/apis/v2beta1/pipelines/upload_version"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let package = dir.path().join("compiled.yaml");
    std::fs::write(&package, "pipelineInfo:\n  name: test-pipeline\n").unwrap();

    let err = service(&server)
        .upload_pipeline_version(&package, "test-pipeline 1.0.0", Some("test-pipeline"))
        .await
        .unwrap_err();
    assert!(matches!(err, OperatorError::Http(500)));
}

#[tokio::test]
async fn wait_returns_completed_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/apis/v2beta1/runs/run-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "run_id": "run-abc",
            "state": "SUCCEEDED",
            "created_at": "2024-01-01T12:00:00Z",
            "finished_at": "2024-01-01T12:30:00Z",
        })))
        .mount(&server)
        .await;

    let run = service(&server)
        .wait_for_run_completion("run-abc", Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(run.state.as_deref(), Some("SUCCEEDED"));
    assert_eq!(run.finished_at.as_deref(), Some("2024-01-01T12:30:00Z"));
}

#[tokio::test]
async fn wait_times_out_on_never_finishing_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/apis/v2beta1/runs/run-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "run_id": "run-abc",
            "state": "RUNNING",
        })))
        .mount(&server)
        .await;

    let err = service(&server)
        .wait_for_run_completion("run-abc", Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Timed out"));
}
