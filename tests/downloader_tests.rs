//! Pipeline downloader tests against a mock HTTP server.
//!
//! Cover conditional requests, authentication headers, size limits, and
//! zip package extraction.

use ai_operator::error::OperatorError;
use ai_operator::pipelines::{
    PipelineDownloadConfig, PipelineDownloader, PipelineFetch, PipelineSourceAuth,
    PipelineSourceConfig,
};
use std::io::Write;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn download_config(local_path: &std::path::Path) -> PipelineDownloadConfig {
    PipelineDownloadConfig {
        local_path: local_path.to_path_buf(),
        max_size: 1024,
        chunk_size: 256,
        timeout: Duration::from_secs(5),
        max_idle_connections_per_host: 2,
    }
}

fn source_config(url: String) -> PipelineSourceConfig {
    PipelineSourceConfig {
        url,
        version: None,
        auth_type: PipelineSourceAuth::None,
        auth_token: None,
    }
}

fn zip_body(members: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, content) in members {
        writer
            .start_file(name.to_string(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn fetches_single_file_with_validators() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/myfile.yaml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("test-content")
                .insert_header("ETag", "etag")
                .insert_header("Last-Modified", "last-modified"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = PipelineDownloader::new(download_config(dir.path())).unwrap();
    let (modified, response) = downloader
        .fetch(
            "default",
            &source_config(format!("{}/myfile.yaml", server.uri())),
            None,
            None,
        )
        .await
        .unwrap();

    assert!(modified);
    let response = response.unwrap();
    assert_eq!(response.etag.as_deref(), Some("etag"));
    assert_eq!(response.last_modified.as_deref(), Some("last-modified"));
    let expected = dir.path().join("default/pipeline.yaml");
    assert_eq!(response.file_paths, vec![expected.clone()]);
    assert_eq!(std::fs::read_to_string(expected).unwrap(), "test-content");
}

#[tokio::test]
async fn uses_content_disposition_filename() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("test-content")
                .insert_header("Content-Disposition", "attachment; filename=\"emb.yaml\""),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = PipelineDownloader::new(download_config(dir.path())).unwrap();
    let (_, response) = downloader
        .fetch(
            "default",
            &source_config(format!("{}/download", server.uri())),
            None,
            None,
        )
        .await
        .unwrap();

    assert_eq!(
        response.unwrap().file_paths,
        vec![dir.path().join("default/emb.yaml")]
    );
}

#[tokio::test]
async fn sends_basic_auth_header_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/myfile.yaml"))
        .and(header("Authorization", "Basic dGVzdA=="))
        .respond_with(ResponseTemplate::new(200).set_body_string("test-content"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = PipelineDownloader::new(download_config(dir.path())).unwrap();
    let config = PipelineSourceConfig {
        auth_type: PipelineSourceAuth::Basic,
        auth_token: Some("dGVzdA==".to_string()),
        ..source_config(format!("{}/myfile.yaml", server.uri()))
    };
    let (modified, _) = downloader
        .fetch("default", &config, None, None)
        .await
        .unwrap();
    assert!(modified);
}

#[tokio::test]
async fn sends_bearer_auth_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/myfile.yaml"))
        .and(header("Authorization", "Bearer test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("test-content"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = PipelineDownloader::new(download_config(dir.path())).unwrap();
    let config = PipelineSourceConfig {
        auth_type: PipelineSourceAuth::Bearer,
        auth_token: Some("test".to_string()),
        ..source_config(format!("{}/myfile.yaml", server.uri()))
    };
    downloader
        .fetch("default", &config, None, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn not_modified_sends_validators_and_downloads_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/myfile.yaml"))
        .and(header("If-None-Match", "etag"))
        .and(header("If-Modified-Since", "last-modified"))
        .respond_with(ResponseTemplate::new(304))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = PipelineDownloader::new(download_config(dir.path())).unwrap();
    let (modified, response) = downloader
        .fetch(
            "default",
            &source_config(format!("{}/myfile.yaml", server.uri())),
            Some("etag"),
            Some("last-modified"),
        )
        .await
        .unwrap();

    assert!(!modified);
    assert!(response.is_none());
    assert!(!dir.path().join("default").exists());
}

#[tokio::test]
async fn http_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/myfile.yaml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = PipelineDownloader::new(download_config(dir.path())).unwrap();
    let err = downloader
        .fetch(
            "default",
            &source_config(format!("{}/myfile.yaml", server.uri())),
            None,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OperatorError::Http(404)));
}

#[tokio::test]
async fn unexpected_success_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/myfile.yaml"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = PipelineDownloader::new(download_config(dir.path())).unwrap();
    let err = downloader
        .fetch(
            "default",
            &source_config(format!("{}/myfile.yaml", server.uri())),
            None,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OperatorError::UnexpectedResponse(204)));
}

#[tokio::test]
async fn oversized_body_is_rejected_and_discarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/myfile.yaml"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2048]))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = PipelineDownloader::new(download_config(dir.path())).unwrap();
    let err = downloader
        .fetch(
            "default",
            &source_config(format!("{}/myfile.yaml", server.uri())),
            None,
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OperatorError::SizeExceeded(_)));
    // No file survives a size violation
    let produced: Vec<_> = std::fs::read_dir(dir.path().join("default"))
        .map(|entries| entries.map(|entry| entry.unwrap().path()).collect())
        .unwrap_or_default();
    assert!(produced.is_empty(), "partial output left behind: {produced:?}");
}

#[tokio::test]
async fn zip_response_extracts_only_safe_yaml_members() {
    let body = zip_body(&[
        ("good.yaml", "test-content"),
        ("../evil.yaml", "nope"),
        ("/abs.yaml", "nope"),
        ("other.py", "print()"),
    ]);
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/package.zip"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body)
                .insert_header("Content-Type", "application/zip")
                .insert_header("ETag", "etag"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = PipelineDownloader::new(download_config(dir.path())).unwrap();
    let (modified, response) = downloader
        .fetch(
            "default",
            &source_config(format!("{}/package.zip", server.uri())),
            None,
            None,
        )
        .await
        .unwrap();

    assert!(modified);
    let response = response.unwrap();
    let expected = dir.path().join("default/good.yaml");
    assert_eq!(response.file_paths, vec![expected.clone()]);
    assert_eq!(std::fs::read_to_string(expected).unwrap(), "test-content");

    // The rejected members were not written anywhere near the target
    let produced: Vec<_> = std::fs::read_dir(dir.path().join("default"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(produced, vec![std::ffi::OsString::from("good.yaml")]);
    assert!(!dir.path().join("evil.yaml").exists());
    assert!(!dir.path().join("default/other.py").exists());
}

#[tokio::test]
async fn second_fetch_with_validators_round_trips() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/myfile.yaml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("test-content")
                .insert_header("ETag", "etag")
                .insert_header("Last-Modified", "last-modified"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/myfile.yaml"))
        .and(header("If-None-Match", "etag"))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = PipelineDownloader::new(download_config(dir.path())).unwrap();
    let config = source_config(format!("{}/myfile.yaml", server.uri()));

    let (modified, response) = downloader.fetch("default", &config, None, None).await.unwrap();
    assert!(modified);
    let response = response.unwrap();

    let (modified, second) = downloader
        .fetch(
            "default",
            &config,
            response.etag.as_deref(),
            response.last_modified.as_deref(),
        )
        .await
        .unwrap();
    assert!(!modified);
    assert!(second.is_none());
}
