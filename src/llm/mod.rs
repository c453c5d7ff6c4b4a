//! Local language-model inference.
//!
//! This module provides:
//! * [`InferenceClient`] — async trait implemented by every inference backend.
//! * [`OllamaClient`] — single-shot `POST /api/generate` against a local Ollama.
//! * [`GenerateRequest`] — model, prompt, optional system prompt, force-CPU flag.
//! * [`InferenceError`] — HTTP status, timeout, transport and parse failures.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use cow_cockpit::config::AppConfig;
//! use cow_cockpit::llm::{GenerateRequest, InferenceClient, OllamaClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let client = OllamaClient::from_config(&config.inference);
//!
//!     let request = GenerateRequest::new("mistral-nemo", "Why is the sky blue?").force_cpu(true);
//!     let answer = client.generate(&request).await.unwrap();
//!     println!("{answer}");
//! }
//! ```

pub mod client;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{extract_response, GenerateRequest, InferenceClient, InferenceError, OllamaClient};
