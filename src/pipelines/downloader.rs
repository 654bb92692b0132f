//! # Pipeline Downloader
//!
//! Conditional HTTP fetcher for pipeline packages. Emits cache validators
//! from previous responses, enforces a size limit before and during
//! streaming, and extracts zip packages with a member filter: only regular
//! `.yaml` members with safe relative names are written under the source's
//! per-name directory.

use crate::constants;
use crate::error::{OperatorError, Result};
use crate::pipelines::config::{PipelineSourceAuth, PipelineSourceConfig};
use async_trait::async_trait;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest::header::{self, HeaderMap};
use reqwest::StatusCode;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use zip::ZipArchive;

/// Downloader configuration
#[derive(Debug, Clone)]
pub struct PipelineDownloadConfig {
    /// Root directory for per-source download directories
    pub local_path: PathBuf,
    /// Maximum accepted package size in bytes
    pub max_size: u64,
    /// Buffer size for archive extraction
    pub chunk_size: usize,
    /// Total timeout per request
    pub timeout: Duration,
    /// Idle connection cap per source host
    pub max_idle_connections_per_host: usize,
}

impl Default for PipelineDownloadConfig {
    fn default() -> Self {
        Self {
            local_path: PathBuf::from("/tmp"),
            max_size: constants::DEFAULT_MAX_DOWNLOAD_SIZE,
            chunk_size: constants::DEFAULT_CHUNK_SIZE,
            timeout: Duration::from_secs(constants::DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            max_idle_connections_per_host: constants::DEFAULT_MAX_IDLE_CONNECTIONS_PER_HOST,
        }
    }
}

impl PipelineDownloadConfig {
    /// Root from `PIPELINE_SOURCE_ROOT`, falling back to `TMPDIR`, then
    /// `/tmp`.
    pub fn from_env() -> Self {
        let root = std::env::var("PIPELINE_SOURCE_ROOT")
            .or_else(|_| std::env::var("TMPDIR"))
            .unwrap_or_else(|_| "/tmp".to_string());
        Self {
            local_path: PathBuf::from(root).join("pipeline-sources"),
            ..Self::default()
        }
    }
}

/// Result of a successful fetch
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineFileResponse {
    /// Files produced under the source's directory, in archive order
    pub file_paths: Vec<PathBuf>,
    /// `ETag` echo from the server, if any
    pub etag: Option<String>,
    /// `Last-Modified` echo from the server, if any
    pub last_modified: Option<String>,
}

/// Fetch contract between the updater and the downloader
#[async_trait]
pub trait PipelineFetch: Send + Sync {
    /// Fetch a source if modified since the supplied validators.
    ///
    /// Returns `(false, None)` when the server reports the content
    /// unchanged, `(true, Some(response))` otherwise.
    async fn fetch(
        &self,
        name: &str,
        source_config: &PipelineSourceConfig,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<(bool, Option<PipelineFileResponse>)>;
}

/// Downloads files from configured locations, checking them for updates.
///
/// Through configuration, enforces certain size limits. The HTTP connection
/// pool lives as long as this value.
pub struct PipelineDownloader {
    config: PipelineDownloadConfig,
    client: reqwest::Client,
}

impl PipelineDownloader {
    pub fn new(config: PipelineDownloadConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.max_idle_connections_per_host)
            .build()?;
        Ok(Self { config, client })
    }

    /// Pre-check the declared content length. An absent or unparsable header
    /// is not an error; the streamed size check still applies.
    fn verify_content_length(&self, headers: &HeaderMap) -> Result<Option<u64>> {
        let Some(raw) = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
        else {
            return Ok(None);
        };
        let Ok(content_length) = raw.parse::<u64>() else {
            return Ok(None);
        };
        if content_length > self.config.max_size {
            return Err(OperatorError::SizeExceeded(format!(
                "Reported file size {content_length} exceeds limit ({}).",
                self.config.max_size
            )));
        }
        Ok(Some(content_length))
    }

    async fn process_response(
        &self,
        response: reqwest::Response,
        path_prefix: &Path,
    ) -> Result<PipelineFileResponse> {
        let headers = response.headers().clone();
        self.verify_content_length(&headers)?;

        let etag = header_value(&headers, header::ETAG);
        let last_modified = header_value(&headers, header::LAST_MODIFIED);
        let body = Box::pin(response.bytes_stream().map_err(OperatorError::from));

        let file_paths = if is_zip(&headers) {
            let spool = tempfile::tempfile()?;
            let mut file = tokio::fs::File::from_std(spool);
            copy_stream_capped(body, &mut file, self.config.max_size).await?;
            file.flush().await?;
            let spool = file.into_std().await;

            let prefix = path_prefix.to_path_buf();
            let chunk_size = self.config.chunk_size;
            tokio::task::spawn_blocking(move || extract_files(&prefix, spool, chunk_size))
                .await
                .map_err(|err| {
                    OperatorError::Domain(format!("archive extraction task failed: {err}"))
                })??
        } else {
            let file_name = content_disposition_filename(&headers)
                .unwrap_or_else(|| constants::DEFAULT_PIPELINE_FILE_NAME.to_string());
            let target = path_prefix.join(file_name);
            let mut file = tokio::fs::File::create(&target).await?;
            match copy_stream_capped(body, &mut file, self.config.max_size).await {
                Ok(_) => {
                    file.flush().await?;
                    vec![target]
                }
                Err(err) => {
                    // Discard partial output
                    drop(file);
                    let _ = tokio::fs::remove_file(&target).await;
                    return Err(err);
                }
            }
        };

        Ok(PipelineFileResponse {
            file_paths,
            etag,
            last_modified,
        })
    }
}

#[async_trait]
impl PipelineFetch for PipelineDownloader {
    async fn fetch(
        &self,
        name: &str,
        source_config: &PipelineSourceConfig,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<(bool, Option<PipelineFileResponse>)> {
        let mut request = self.client.get(&source_config.url);
        if let Some(etag) = etag {
            request = request.header(header::IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = last_modified {
            request = request.header(header::IF_MODIFIED_SINCE, last_modified);
        }
        if let Some(token) = &source_config.auth_token {
            match source_config.auth_type {
                PipelineSourceAuth::Basic => {
                    request = request.header(header::AUTHORIZATION, format!("Basic {token}"));
                }
                PipelineSourceAuth::Bearer => {
                    request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
                }
                PipelineSourceAuth::None => {}
            }
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            debug!("File at {} unchanged.", source_config.url);
            return Ok((false, None));
        }
        if status.is_client_error() || status.is_server_error() {
            return Err(OperatorError::Http(status.as_u16()));
        }
        if status != StatusCode::OK {
            return Err(OperatorError::UnexpectedResponse(status.as_u16()));
        }

        info!("Reading file from {}.", source_config.url);
        let path = self.config.local_path.join(name);
        tokio::fs::create_dir_all(&path).await?;
        let file_response = self.process_response(response, &path).await?;
        Ok((true, Some(file_response)))
    }
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn is_zip(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|content_type| {
            content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .ends_with("zip")
        })
        .unwrap_or(false)
}

/// Extract the filename parameter from a Content-Disposition header.
///
/// Only the final path component is used, so a hostile filename cannot
/// escape the per-source directory.
fn content_disposition_filename(headers: &HeaderMap) -> Option<String> {
    let disposition = headers
        .get(header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())?;
    let file_name = disposition.split(';').find_map(|part| {
        let part = part.trim();
        part.strip_prefix("filename=")
            .map(|name| name.trim_matches('"').to_string())
    })?;
    Path::new(&file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Stream a response body into `file`, enforcing the size cap on the
/// cumulative byte count. Returns the number of bytes written.
async fn copy_stream_capped<S, B>(
    mut stream: S,
    file: &mut tokio::fs::File,
    max_size: u64,
) -> Result<u64>
where
    S: Stream<Item = Result<B>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut read_total: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        read_total += chunk.as_ref().len() as u64;
        if read_total > max_size {
            return Err(OperatorError::SizeExceeded(format!(
                "Processed file size {read_total} exceeds limit ({max_size})."
            )));
        }
        file.write_all(chunk.as_ref()).await?;
    }
    Ok(read_total)
}

/// Extract acceptable members of a zip archive below `path_prefix`.
///
/// Members are skipped silently unless their name is relative (no leading
/// `/`), free of `..` segments, and ends in `.yaml`.
fn extract_files(
    path_prefix: &Path,
    mut spool: std::fs::File,
    chunk_size: usize,
) -> Result<Vec<PathBuf>> {
    spool.seek(SeekFrom::Start(0))?;
    let mut archive = ZipArchive::new(spool)?;
    let mut written = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let member = entry.name().to_string();
        if member.starts_with('/') || member.contains("..") || !member.ends_with(".yaml") {
            continue;
        }

        let target = path_prefix.join(&member);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut output = std::fs::File::create(&target)?;
        let mut buffer = vec![0u8; chunk_size];
        loop {
            let read = entry.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            output.write_all(&buffer[..read])?;
        }
        written.push(target);
    }
    Ok(written)
}
