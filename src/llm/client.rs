//! Core [`InferenceClient`] trait and the [`OllamaClient`] implementation.
//!
//! `OllamaClient` posts a single non-streaming request to the local
//! `/api/generate` endpoint and returns the trimmed `response` field.  There
//! is no retry: a timeout or an HTTP error goes straight back to the caller.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::InferenceConfig;

// ---------------------------------------------------------------------------
// InferenceError
// ---------------------------------------------------------------------------

/// Errors that can occur during a generate call.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The service answered with a non-2xx status.
    #[error("inference service returned HTTP {status}")]
    Http { status: u16 },

    /// The request did not complete within the configured timeout.
    #[error("inference request timed out")]
    Timeout,

    /// HTTP transport or connection error.
    #[error("inference request failed: {0}")]
    Request(String),

    /// The response body was not valid JSON.
    #[error("failed to parse inference response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            InferenceError::Timeout
        } else if let Some(status) = e.status() {
            InferenceError::Http {
                status: status.as_u16(),
            }
        } else {
            InferenceError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// GenerateRequest
// ---------------------------------------------------------------------------

/// One generate call: which model, what prompt, and how to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub system: Option<String>,
    /// Ask the service to keep every layer off the GPU (`num_gpu = 0`).
    pub force_cpu: bool,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            force_cpu: false,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn force_cpu(mut self, force_cpu: bool) -> Self {
        self.force_cpu = force_cpu;
        self
    }

    /// Wire body for `POST /api/generate`.
    pub fn to_body(&self) -> GenerateBody<'_> {
        GenerateBody {
            model: &self.model,
            prompt: &self.prompt,
            stream: false,
            options: GenerateOptions {
                num_gpu: self.force_cpu.then_some(0),
            },
            system: self.system.as_deref().filter(|s| !s.is_empty()),
        }
    }
}

/// Serialised form of [`GenerateRequest`].
#[derive(Debug, Serialize)]
pub struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    num_gpu: Option<u32>,
}

/// Pull the generated text out of a response body.
///
/// A missing or non-string `response` field counts as an empty answer.
pub fn extract_response(json: &serde_json::Value) -> String {
    json.get("response")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// InferenceClient trait
// ---------------------------------------------------------------------------

/// Async seam over the local inference service.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn InferenceClient>` between the orchestrator and the translator.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, InferenceError>;
}

// ---------------------------------------------------------------------------
// OllamaClient
// ---------------------------------------------------------------------------

/// Talks to a local Ollama instance over its native REST API.
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OllamaClient {
    /// Build a client from application config.
    ///
    /// The HTTP client carries the whole-request timeout from
    /// `config.timeout_secs`.  A default client is used if the builder fails.
    pub fn from_config(config: &InferenceConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            // The service is local; never route it through a system proxy.
            .no_proxy()
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint: format!("{}/api/generate", config.base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl InferenceClient for OllamaClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, InferenceError> {
        log::debug!(
            "inference: model={} force_cpu={} prompt_len={}",
            request.model,
            request.force_cpu,
            request.prompt.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request.to_body())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InferenceError::Http {
                status: status.as_u16(),
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| InferenceError::Parse(e.to_string()))?;

        Ok(extract_response(&json))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accept one connection, capture the request body, answer with `status`
    /// and `body`.  Returns the base URL and a handle yielding the request body.
    async fn one_shot_server(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            // Read headers, then exactly Content-Length bytes of body.
            let body_start = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let headers = String::from_utf8_lossy(&buf[..body_start]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while buf.len() < body_start + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
            }

            let reply = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            String::from_utf8_lossy(&buf[body_start..body_start + content_length]).into_owned()
        });

        (format!("http://{addr}"), handle)
    }

    fn client_for(base_url: String) -> OllamaClient {
        OllamaClient::from_config(&InferenceConfig {
            base_url,
            timeout_secs: 5,
        })
    }

    #[test]
    fn body_without_system_or_cpu() {
        let req = GenerateRequest::new("m1", "hello");
        let value = serde_json::to_value(req.to_body()).unwrap();
        assert_eq!(
            value,
            json!({"model": "m1", "prompt": "hello", "stream": false, "options": {}})
        );
    }

    #[test]
    fn body_with_system_and_force_cpu() {
        let req = GenerateRequest::new("m1", "hello")
            .with_system("be brief")
            .force_cpu(true);
        let value = serde_json::to_value(req.to_body()).unwrap();
        assert_eq!(value["options"], json!({"num_gpu": 0}));
        assert_eq!(value["system"], "be brief");
        assert_eq!(value["stream"], false);
    }

    #[test]
    fn extract_response_trims_and_defaults_to_empty() {
        assert_eq!(extract_response(&json!({"response": "  hi there \n"})), "hi there");
        assert_eq!(extract_response(&json!({"done": true})), "");
        assert_eq!(extract_response(&json!({"response": 42})), "");
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let client = client_for("http://localhost:11434/".into());
        assert_eq!(client.endpoint(), "http://localhost:11434/api/generate");
    }

    #[test]
    fn client_is_object_safe() {
        let client: Box<dyn InferenceClient> = Box::new(client_for("http://localhost:1".into()));
        drop(client);
    }

    #[tokio::test]
    async fn generate_returns_trimmed_response_field() {
        let (url, server) = one_shot_server("200 OK", r#"{"response":"  hi there  ","done":true}"#).await;
        let client = client_for(url);

        let text = client
            .generate(&GenerateRequest::new("m1", "hello").force_cpu(true))
            .await
            .unwrap();
        assert_eq!(text, "hi there");

        let sent: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(sent["model"], "m1");
        assert_eq!(sent["prompt"], "hello");
        assert_eq!(sent["options"]["num_gpu"], 0);
        assert!(sent.get("system").is_none());
    }

    #[tokio::test]
    async fn non_2xx_maps_to_http_error() {
        let (url, server) = one_shot_server("404 Not Found", r#"{"error":"model not found"}"#).await;
        let client = client_for(url);

        let err = client
            .generate(&GenerateRequest::new("missing", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Http { status: 404 }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn silent_server_maps_to_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold the connection without ever answering.
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let client = OllamaClient::from_config(&InferenceConfig {
            base_url: format!("http://{addr}"),
            timeout_secs: 1,
        });
        let err = client
            .generate(&GenerateRequest::new("m1", "hello"))
            .await
            .unwrap_err();

        assert!(matches!(err, InferenceError::Timeout), "got {err:?}");
        server.abort();
    }

    #[tokio::test]
    async fn connection_refused_is_a_request_error() {
        // Bind then drop to get a port nobody listens on.
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let client = client_for(format!("http://{addr}"));
        let err = client
            .generate(&GenerateRequest::new("m1", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Request(_)));
    }
}
