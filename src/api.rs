use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{COOKIE, REFERER};
use reqwest::multipart::{Form, Part};
use reqwest::redirect::Policy;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use tokio::sync::OnceCell;

use crate::client::driver::Backend;
use crate::csrf::{CSRF_HEADER, read_csrf_token};
use crate::errors::{CliError, redact_secret, with_debug_hint};
use crate::models::{Reply, Submission, Thread, ThreadId, Turn};
use crate::parse::response::{extract_error_message, extract_reply, extract_threads, extract_turns};

pub const THREADS_PATH: &str = "/api/threads";
pub const INDEX_PATH: &str = "/";
pub const PROMPT_FIELD: &str = "prompt-text";
pub const FILE_FIELD: &str = "prompt-file";

pub fn thread_path(id: ThreadId) -> String {
    format!("/api/thread/{id}")
}

pub fn delete_thread_path(id: ThreadId) -> String {
    format!("/api/thread/{id}/delete")
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    cookie: Option<String>,
    csrf: Arc<OnceCell<Option<String>>>,
    debug: bool,
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub elapsed_ms: u128,
    pub json: Value,
}

impl ApiClient {
    pub fn new(
        base_url: String,
        cookie: Option<String>,
        timeout_ms: u64,
        debug: bool,
    ) -> Result<Self, CliError> {
        let timeout = Duration::from_millis(timeout_ms.max(1));
        // The backend answers an expired session with a redirect to its login page.
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()?;
        Ok(Self {
            client,
            base_url,
            cookie,
            csrf: Arc::new(OnceCell::new()),
            debug,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get_json(&self, path: &str) -> Result<ApiResponse, CliError> {
        self.request_json(Method::GET, path, None).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, CliError> {
        self.request_json(Method::DELETE, path, None).await
    }

    pub async fn post_multipart(&self, path: &str, form: Form) -> Result<ApiResponse, CliError> {
        self.request_json(Method::POST, path, Some(form)).await
    }

    /// CSRF token for mutating calls: the cookie if configured, else the meta tag
    /// of the backend's index page. Resolved once per client.
    pub async fn csrf_token(&self) -> Option<String> {
        self.csrf
            .get_or_init(|| async {
                if let Some(token) = read_csrf_token(self.cookie.as_deref(), None) {
                    return Some(token);
                }
                match self.fetch_page(INDEX_PATH).await {
                    Ok(html) => read_csrf_token(None, Some(&html)),
                    Err(err) => {
                        tracing::warn!(error = %err, "could not load index page for CSRF token");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    async fn fetch_page(&self, path: &str) -> Result<String, CliError> {
        let mut request = self.client.get(join_url(&self.base_url, path));
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie);
        }
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(CliError::Generic(format!(
                "Index page returned status {}",
                resp.status().as_u16()
            )));
        }
        Ok(resp.text().await?)
    }

    pub async fn request_json(
        &self,
        method: Method,
        path: &str,
        form: Option<Form>,
    ) -> Result<ApiResponse, CliError> {
        let url = join_url(&self.base_url, path);
        let mutating = method != Method::GET;
        let started = Instant::now();

        let mut request = self.client.request(method.clone(), url);
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie);
        }
        if mutating {
            if let Some(token) = self.csrf_token().await {
                request = request.header(CSRF_HEADER, token);
            }
            request = request.header(REFERER, self.base_url.clone());
        }
        if let Some(form) = form {
            request = request.multipart(form);
        }

        tracing::debug!(%method, path, "sending request");
        let resp = request.send().await.map_err(|err| {
            let message = if err.is_timeout() {
                "Request timed out.".to_string()
            } else {
                format!("Network request failed: {err}")
            };
            CliError::Network(with_debug_hint(&message, self.debug))
        })?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        let parsed = if text.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str::<Value>(&text).unwrap_or_else(|_| json!({ "raw": text }))
        };

        if status.is_success() {
            return Ok(ApiResponse {
                elapsed_ms: started.elapsed().as_millis(),
                json: parsed,
            });
        }

        Err(self.http_error(status, parsed))
    }

    fn http_error(&self, status: StatusCode, payload: Value) -> CliError {
        let mut details = extract_error_message(&payload)
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

        if self.debug {
            let mut payload_text = payload.to_string();
            if let Some(cookie) = &self.cookie {
                payload_text = payload_text.replace(cookie, &redact_secret(cookie));
            }
            details.push_str(&format!(" payload={payload_text}"));
        } else {
            details = with_debug_hint(&details, false);
        }

        match status.as_u16() {
            300..=399 => CliError::Auth(
                "Session is missing or expired. Set one with `resumax config set session <id>`."
                    .to_string(),
            ),
            400 => CliError::Usage(details),
            401 | 403 => CliError::Auth(details),
            404 => CliError::NotFound(details),
            429 => CliError::RateLimited(details),
            500..=599 => CliError::Server(details),
            _ => CliError::Generic(details),
        }
    }
}

impl Backend for ApiClient {
    async fn list_threads(&self) -> Result<Vec<Thread>, CliError> {
        let res = self.get_json(THREADS_PATH).await?;
        extract_threads(&res.json)
            .ok_or_else(|| CliError::Parse("Thread list response has no `threads` array.".to_string()))
    }

    async fn fetch_conversation(&self, id: ThreadId) -> Result<Vec<Turn>, CliError> {
        let res = self.get_json(&thread_path(id)).await?;
        extract_turns(&res.json).ok_or_else(|| {
            CliError::Parse("Thread response has no `conversations` array.".to_string())
        })
    }

    async fn submit(&self, id: ThreadId, submission: &Submission) -> Result<Reply, CliError> {
        let res = self
            .post_multipart(&thread_path(id), submission_form(submission)?)
            .await?;
        tracing::info!(thread = %id, elapsed_ms = res.elapsed_ms, "prompt answered");
        extract_reply(&res.json)
            .ok_or_else(|| CliError::Parse("Reply has no `response` text.".to_string()))
    }

    async fn delete_thread(&self, id: ThreadId) -> Result<(), CliError> {
        self.delete(&delete_thread_path(id)).await.map(|_| ())
    }
}

/// One text field for the prompt and one file part per attachment.
pub fn submission_form(submission: &Submission) -> Result<Form, CliError> {
    let mut form = Form::new().text(PROMPT_FIELD, submission.prompt.clone());
    for file in &submission.files {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(mime_for(&file.name))
            .map_err(|e| CliError::Generic(format!("Invalid attachment type: {e}")))?;
        form = form.part(FILE_FIELD, part);
    }
    Ok(form)
}

fn mime_for(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("txt" | "md") => "text/plain",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
