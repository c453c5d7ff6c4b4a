//! Pipeline state machine.
//!
//! [`PipelineState`] drives the orchestrator's state machine.  The UI mirrors
//! it from [`PipelineEvent::StateChanged`](super::PipelineEvent) to show the
//! transient status line and to keep the input disabled while a run is in
//! flight.

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// States of one pipeline run.
///
/// ```text
/// Idle ──submit──▶ TranslatingIn ──▶ Thinking ──▶ TranslatingOut ──▶ Rendering ──▶ Idle
///          │                           ▲      │                          ▲
///          └── input translation off ──┘      └── output translation off ┘
/// any stage ──error──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Waiting for a message; the input control is enabled.
    #[default]
    Idle,

    /// The user's message is being translated to English.
    TranslatingIn,

    /// The thinker model is generating the answer.
    Thinking,

    /// The answer is being translated to Japanese.
    TranslatingOut,

    /// The answer is being drawn by the text-art renderer.
    Rendering,
}

impl PipelineState {
    /// Returns `true` while a run is in flight.
    ///
    /// ```
    /// use cow_cockpit::pipeline::PipelineState;
    ///
    /// assert!(!PipelineState::Idle.is_busy());
    /// assert!(PipelineState::TranslatingIn.is_busy());
    /// assert!(PipelineState::Thinking.is_busy());
    /// assert!(PipelineState::TranslatingOut.is_busy());
    /// assert!(PipelineState::Rendering.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        !matches!(self, PipelineState::Idle)
    }

    /// Transient status line text.  Empty when idle.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Idle => "",
            PipelineState::TranslatingIn | PipelineState::TranslatingOut => "Translation...",
            PipelineState::Thinking => "Thinking...",
            PipelineState::Rendering => "Rendering...",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pipeline_state_is_idle() {
        assert_eq!(PipelineState::default(), PipelineState::Idle);
    }

    #[test]
    fn idle_label_is_empty() {
        assert_eq!(PipelineState::Idle.label(), "");
    }

    #[test]
    fn both_translation_steps_share_a_label() {
        assert_eq!(PipelineState::TranslatingIn.label(), "Translation...");
        assert_eq!(PipelineState::TranslatingOut.label(), "Translation...");
    }

    #[test]
    fn label_thinking() {
        assert_eq!(PipelineState::Thinking.label(), "Thinking...");
    }
}
