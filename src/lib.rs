//! Cow Cockpit — a desktop chat front-end for local Ollama models.
//!
//! A message goes through optional translation to English, the thinker
//! model, optional translation back to Japanese, and finally `cowsay`.
//! Alongside the chat the cockpit lists and stops running models and hands
//! the session transcript to the `cow-manager` helper for saving.

pub mod app;
pub mod config;
pub mod export;
pub mod history;
pub mod llm;
pub mod logbook;
pub mod models;
pub mod pipeline;
pub mod process;
pub mod render;
pub mod translate;
