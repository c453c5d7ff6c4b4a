//! Translation adapter.
//!
//! One call signature, two mechanisms:
//!
//! | Backend                     | Mechanism                                         |
//! |-----------------------------|---------------------------------------------------|
//! | [`TranslatorBackend::ExternalTool`] | `trans -b :<lang> <text>` via [`ProcessRunner`](crate::process::ProcessRunner) |
//! | [`TranslatorBackend::Model`]        | inference call with a fixed translator system prompt |

pub mod adapter;

pub use adapter::{
    TargetLanguage, TranslateError, Translator, TranslatorBackend, TranslatorTool,
    TRANSLATOR_SYSTEM_PROMPT,
};
