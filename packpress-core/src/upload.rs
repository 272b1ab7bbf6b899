//! Authenticated upload client: multipart file upload with retry and
//! exponential backoff, bounded-concurrency batch upload, post submission
//! and a lightweight connectivity probe.
//!
//! Success for every call means transport status 200/201 AND a body-level
//! result code of 0 or 200. A non-success body code on a healthy transport
//! (a "business error") counts as a failed attempt inside the retry loop.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::post::PostRequest;
use log::{debug, error, info, warn};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde_json::Value;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Fixed user agent sent with every request.
const CLIENT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Retry behavior for `upload_file`. The delay before attempt `n + 1` is
/// `base_delay * 2^n`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Descriptor of a successfully uploaded file, the first element of the
/// response's data array.
#[derive(Debug, Clone)]
pub struct UploadedAsset {
    pub url: String,
    pub id: Option<String>,
    pub raw: Value,
}

/// HTTP client for upload and publish requests.
///
/// Construction validates the auth configuration; this is the only
/// fatal-at-construction check in the core, and the CLI turns it into a
/// process-level abort. The header map sits behind a mutex so
/// `update_token` is safe on a client shared across upload workers.
pub struct UploadClient {
    client: Client,
    upload_url: String,
    create_url: String,
    headers: Mutex<HeaderMap>,
    retry: RetryPolicy,
}

impl UploadClient {
    pub fn new(config: &Config) -> CoreResult<Self> {
        validate_auth(config)?;

        let client = Client::builder()
            .build()
            .map_err(|e| CoreError::Upload(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            upload_url: config.url.upload.clone(),
            create_url: config.url.create.clone(),
            headers: Mutex::new(build_headers(config)?),
            retry: RetryPolicy::default(),
        })
    }

    /// Overrides the retry policy; used by tests to shrink the backoff.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the bearer token on a live client.
    pub fn update_token(&self, new_token: &str) {
        let value = format!("Bearer {new_token}");
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                self.headers
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .insert(AUTHORIZATION, value);
                info!("auth token updated");
            }
            Err(e) => error!("rejected new token: {e}"),
        }
    }

    fn current_headers(&self) -> HeaderMap {
        self.headers.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    /// Uploads a single file, retrying on timeout, transport failure and
    /// business errors. Exhausted retries drop the file (logged) rather
    /// than failing the surrounding job.
    pub fn upload_file(&self, path: &Path) -> Option<UploadedAsset> {
        let metadata = std::fs::metadata(path).ok();
        if !metadata.as_ref().is_some_and(|m| m.is_file() && m.len() > 0) {
            warn!("skipping invalid or empty file '{}'", path.display());
            return None;
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("cannot read '{}': {e}", path.display());
                return None;
            }
        };
        let mime = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("image/jpeg");

        for attempt in 0..self.retry.max_attempts {
            match self.try_upload(&file_name, bytes.clone(), mime) {
                Ok(asset) => {
                    info!("uploaded '{file_name}'");
                    return Some(asset);
                }
                Err(e) => warn!(
                    "upload attempt {} of {} failed for '{file_name}': {e}",
                    attempt + 1,
                    self.retry.max_attempts
                ),
            }

            if attempt + 1 < self.retry.max_attempts {
                std::thread::sleep(self.retry.delay_for_attempt(attempt));
            }
        }

        error!(
            "dropping '{file_name}' after {} failed attempts",
            self.retry.max_attempts
        );
        None
    }

    fn try_upload(&self, file_name: &str, bytes: Vec<u8>, mime: &str) -> CoreResult<UploadedAsset> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|e| CoreError::Upload(format!("invalid mime type: {e}")))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.upload_url)
            .headers(self.current_headers())
            .multipart(form)
            .timeout(UPLOAD_TIMEOUT)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::Upload("timed out".to_string())
                } else {
                    CoreError::Upload(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if !matches!(status, 200 | 201) {
            return Err(CoreError::Upload(format!("HTTP status {status}")));
        }

        let body: Value = response
            .json()
            .map_err(|e| CoreError::Upload(format!("invalid response body: {e}")))?;
        if !is_success_code(&body) {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown business error");
            return Err(CoreError::Upload(format!("business error: {message}")));
        }

        parse_asset(&body)
            .ok_or_else(|| CoreError::Upload("response carried no asset descriptor".to_string()))
    }

    /// Uploads every non-empty file directly under `folder`.
    ///
    /// Sequential in sorted order when `concurrency <= 1`, otherwise a
    /// bounded pool of scoped workers drains a shared queue; result order
    /// is unspecified in concurrent mode. Only successes are aggregated.
    pub fn upload_files(&self, folder: &Path, concurrency: usize) -> CoreResult<Vec<UploadedAsset>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(folder)?
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                let size = path.metadata().ok()?.len();
                (path.is_file() && size > 0).then_some(path)
            })
            .collect();
        files.sort();

        if files.is_empty() {
            warn!("no valid files to upload in '{}'", folder.display());
            return Ok(Vec::new());
        }
        let total = files.len();

        let uploaded = if concurrency <= 1 {
            files.iter().filter_map(|path| self.upload_file(path)).collect()
        } else {
            let queue = Mutex::new(files.into_iter().collect::<VecDeque<_>>());
            let results = Mutex::new(Vec::new());
            let workers = concurrency.min(total);

            std::thread::scope(|scope| {
                for _ in 0..workers {
                    scope.spawn(|| loop {
                        let path = queue.lock().unwrap_or_else(std::sync::PoisonError::into_inner).pop_front();
                        let Some(path) = path else { break };
                        if let Some(asset) = self.upload_file(&path) {
                            results.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(asset);
                        }
                    });
                }
            });

            results.into_inner().unwrap_or_else(std::sync::PoisonError::into_inner)
        };

        info!("uploaded {}/{} files", uploaded.len(), total);
        Ok(uploaded)
    }

    /// Submits the publish request. Returns the business success flag and
    /// the parsed response body when one was readable.
    pub fn submit_post(&self, post: &PostRequest) -> (bool, Option<Value>) {
        let response = self
            .client
            .post(&self.create_url)
            .headers(self.current_headers())
            .json(post)
            .timeout(SUBMIT_TIMEOUT)
            .send();

        match response {
            Ok(response) => {
                let status = response.status().as_u16();
                if !matches!(status, 200 | 201) {
                    error!("post submission failed with HTTP status {status}");
                    return (false, None);
                }
                match response.json::<Value>() {
                    Ok(body) if is_success_code(&body) => {
                        info!("post submitted");
                        (true, Some(body))
                    }
                    Ok(body) => {
                        let message = body
                            .get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown business error");
                        error!("post submission rejected: {message}");
                        (false, Some(body))
                    }
                    Err(e) => {
                        error!("post submission returned unreadable body: {e}");
                        (false, None)
                    }
                }
            }
            Err(e) => {
                error!("post submission failed: {e}");
                (false, None)
            }
        }
    }

    /// Header-only reachability probe against the upload URL. All errors
    /// collapse to `false`.
    pub fn test_connection(&self) -> bool {
        self.client
            .head(&self.upload_url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .map(|response| response.status().as_u16() < 400)
            .unwrap_or(false)
    }
}

fn validate_auth(config: &Config) -> CoreResult<()> {
    let fields = [
        ("token", &config.auth.token),
        ("did", &config.auth.did),
        ("d_name", &config.auth.d_name),
        ("d_type", &config.auth.d_type),
    ];
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(CoreError::Config(format!(
                "auth field '{name}' must not be empty"
            )));
        }
    }
    if config.auth.token.len() < 10 {
        warn!("auth token is unusually short ({} chars)", config.auth.token.len());
    }
    Ok(())
}

/// Builds the request header set from the auth fields; blank values are
/// dropped from the set.
fn build_headers(config: &Config) -> CoreResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let pairs = [
        (AUTHORIZATION, format!("Bearer {}", config.auth.token)),
        (HeaderName::from_static("device-id"), config.auth.did.clone()),
        (HeaderName::from_static("device-name"), config.auth.d_name.clone()),
        (HeaderName::from_static("device-type"), config.auth.d_type.clone()),
        (USER_AGENT, CLIENT_USER_AGENT.to_string()),
    ];

    for (name, value) in pairs {
        if value.trim().is_empty() {
            continue;
        }
        let value = HeaderValue::from_str(&value)
            .map_err(|e| CoreError::Config(format!("invalid header value for {name}: {e}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn is_success_code(body: &Value) -> bool {
    matches!(body.get("code").and_then(Value::as_i64), Some(0) | Some(200))
}

fn parse_asset(body: &Value) -> Option<UploadedAsset> {
    let first = body.get("data")?.as_array()?.first()?;
    let url = first.get("url")?.as_str()?.to_string();
    let id = first.get("id").map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    });
    debug!("uploaded asset url: {url}");
    Some(UploadedAsset {
        url,
        id,
        raw: first.clone(),
    })
}
