//! Cow Cockpit window — egui/eframe application.
//!
//! # Architecture
//!
//! [`CockpitApp`] is the top-level [`eframe::App`].  It owns only view state
//! and two channel endpoints:
//!
//! * `command_tx` — sends [`PipelineCommand`] to the orchestrator.
//! * `event_rx`   — receives [`PipelineEvent`] from the orchestrator.
//!
//! The session history lives in the orchestrator; the transcript shown here
//! is built from events.
//!
//! # Layout
//!
//! | Area      | Contents |
//! |-----------|----------|
//! | Sidebar   | interpreter / thinker pickers, CPU switches, status monitor, stop-all, save log |
//! | Centre    | transcript, transient status line, input + send |
//! | Bottom    | notice bar (auto-hides after a few seconds) |
//!
//! # Closing
//!
//! A close request is cancelled and turned into [`PipelineCommand::Shutdown`].
//! The window closes on [`PipelineEvent::ShutdownComplete`], or after a grace
//! period if the orchestrator is still busy with a long run.

use std::time::{Duration, Instant};

use eframe::egui;
use tokio::sync::mpsc;

use crate::config::{AppConfig, PipelineConfig};
use crate::models::{choose_default_thinker, StopReport};
use crate::pipeline::{Notice, NoticeLevel, PipelineCommand, PipelineEvent, PipelineState};
use crate::translate::TranslatorBackend;

const NOTICE_TTL: Duration = Duration::from_secs(4);
const CLOSE_GRACE: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

/// One visible row of the chat transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptItem {
    User(String),
    /// Rendered text art.
    Cow(String),
    Error(String),
}

// ---------------------------------------------------------------------------
// CockpitApp
// ---------------------------------------------------------------------------

pub struct CockpitApp {
    // ── Chat ─────────────────────────────────────────────────────────────
    transcript: Vec<TranscriptItem>,
    input: String,
    /// A run is in flight; the input is disabled.
    busy: bool,
    pipeline_state: PipelineState,
    focus_input: bool,

    // ── Sidebar ──────────────────────────────────────────────────────────
    /// Options handed to the orchestrator with every message.
    pipeline: PipelineConfig,
    installed_models: Vec<String>,
    status_monitor: String,
    /// Last lifecycle message ("All models stopped.").
    status_line: String,
    stopping: bool,
    notice: Option<(Notice, Instant)>,

    // ── Shutdown ─────────────────────────────────────────────────────────
    close_deadline: Option<Instant>,
    may_close: bool,
    shutdown_timeout: Duration,

    // ── Channels ─────────────────────────────────────────────────────────
    command_tx: mpsc::Sender<PipelineCommand>,
    event_rx: mpsc::Receiver<PipelineEvent>,
}

impl CockpitApp {
    /// Create the app.
    ///
    /// * `installed_models` — result of the startup model listing; seeds the
    ///   thinker and translator pickers.
    pub fn new(
        command_tx: mpsc::Sender<PipelineCommand>,
        event_rx: mpsc::Receiver<PipelineEvent>,
        config: &AppConfig,
        installed_models: Vec<String>,
    ) -> Self {
        let mut pipeline = config.pipeline.clone();
        if pipeline.thinker_model.is_empty() {
            pipeline.thinker_model =
                choose_default_thinker(&installed_models, &config.models.preferred_thinker);
        }

        Self {
            transcript: Vec::new(),
            input: String::new(),
            busy: false,
            pipeline_state: PipelineState::Idle,
            focus_input: true,
            pipeline,
            installed_models,
            status_monitor: "Checking...".into(),
            status_line: String::new(),
            stopping: false,
            notice: None,
            close_deadline: None,
            may_close: false,
            shutdown_timeout: Duration::from_secs(config.lifecycle.shutdown_timeout_secs),
            command_tx,
            event_rx,
        }
    }

    pub fn transcript(&self) -> &[TranscriptItem] {
        &self.transcript
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    // ── Commands ─────────────────────────────────────────────────────────

    fn send(&mut self, command: PipelineCommand) -> bool {
        match self.command_tx.try_send(command) {
            Ok(()) => true,
            Err(e) => {
                log::error!("ui: pipeline command not delivered: {e}");
                self.show_notice(Notice::error("Pipeline is not responding"));
                false
            }
        }
    }

    /// Send the current input.  Ignored while busy or when blank.
    pub fn submit(&mut self) {
        if self.busy || self.input.trim().is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.input);
        let config = self.pipeline.clone();
        self.busy = self.send(PipelineCommand::Submit { text, config });
    }

    fn stop_all(&mut self) {
        if !self.stopping {
            self.stopping = self.send(PipelineCommand::StopAllModels);
        }
    }

    fn show_notice(&mut self, notice: Notice) {
        self.notice = Some((notice, Instant::now()));
    }

    // ── Events ───────────────────────────────────────────────────────────

    /// Apply one orchestrator event.  Returns `true` when the window may
    /// close.
    pub fn handle_event(&mut self, event: PipelineEvent) -> bool {
        match event {
            PipelineEvent::StateChanged(state) => {
                self.pipeline_state = state;
                if state == PipelineState::Idle {
                    self.busy = false;
                    self.focus_input = true;
                }
            }
            PipelineEvent::UserMessage(text) => {
                self.transcript.push(TranscriptItem::User(text));
            }
            PipelineEvent::Reply { rendered, .. } => {
                self.transcript.push(TranscriptItem::Cow(rendered));
            }
            PipelineEvent::RunFailed { message } => {
                self.transcript.push(TranscriptItem::Error(message));
            }
            PipelineEvent::Status(status) => {
                self.status_monitor = status;
            }
            PipelineEvent::ModelsStopped(report) => {
                self.stopping = false;
                self.status_line = stop_summary(&report);
            }
            PipelineEvent::Notice(notice) => self.show_notice(notice),
            PipelineEvent::ShutdownComplete => {
                self.may_close = true;
                return true;
            }
        }
        false
    }

    fn poll_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.event_rx.try_recv() {
            if self.handle_event(event) {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
    }

    /// Turn a window close into a cleanup request; let it through once done.
    fn intercept_close(&mut self, ctx: &egui::Context) {
        if let Some(deadline) = self.close_deadline {
            if !self.may_close && Instant::now() >= deadline {
                log::warn!("ui: shutdown cleanup still pending, closing anyway");
                self.may_close = true;
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }

        if !ctx.input(|i| i.viewport().close_requested()) || self.may_close {
            return;
        }

        ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
        if self.close_deadline.is_none() {
            log::info!("ui: close requested, stopping models first");
            self.close_deadline = Some(Instant::now() + self.shutdown_timeout + CLOSE_GRACE);
            if !self.send(PipelineCommand::Shutdown) {
                self.may_close = true;
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
    }

    // ── Sidebar ──────────────────────────────────────────────────────────

    fn draw_sidebar(&mut self, ui: &mut egui::Ui) {
        ui.heading("Cow Cockpit");
        ui.separator();

        ui.label(egui::RichText::new("Interpreter").strong());
        egui::ComboBox::from_id_salt("translator")
            .selected_text(self.pipeline.translator.to_string())
            .width(ui.available_width())
            .show_ui(ui, |ui| {
                ui.selectable_value(
                    &mut self.pipeline.translator,
                    TranslatorBackend::ExternalTool,
                    TranslatorBackend::ExternalTool.to_string(),
                );
                for model in &self.installed_models {
                    ui.selectable_value(
                        &mut self.pipeline.translator,
                        TranslatorBackend::Model(model.clone()),
                        model.as_str(),
                    );
                }
            });
        ui.horizontal(|ui| {
            ui.checkbox(&mut self.pipeline.translate_input, "Input (JP->EN)");
            ui.checkbox(&mut self.pipeline.translate_output, "Output (EN->JP)");
        });
        ui.checkbox(&mut self.pipeline.force_cpu_translator, "Force CPU");
        ui.separator();

        ui.label(egui::RichText::new("Thinker").strong());
        egui::ComboBox::from_id_salt("thinker")
            .selected_text(self.pipeline.thinker_model.as_str())
            .width(ui.available_width())
            .show_ui(ui, |ui| {
                for model in &self.installed_models {
                    ui.selectable_value(&mut self.pipeline.thinker_model, model.clone(), model.as_str());
                }
            });
        ui.checkbox(&mut self.pipeline.force_cpu_thinker, "Force CPU");
        ui.separator();

        ui.horizontal(|ui| {
            ui.label("Status");
            if ui.small_button("🔄").on_hover_text("Refresh").clicked() {
                self.send(PipelineCommand::RefreshStatus);
            }
        });
        egui::Frame::new()
            .fill(egui::Color32::from_rgba_premultiplied(0, 0, 0, 140))
            .inner_margin(egui::Margin::same(5))
            .corner_radius(egui::CornerRadius::same(5))
            .show(ui, |ui| {
                ui.label(egui::RichText::new(&self.status_monitor).monospace().size(12.0));
            });
        ui.separator();

        let stop_label = if self.stopping { "Cleaning..." } else { "Stop all models" };
        let stop = egui::Button::new(egui::RichText::new(stop_label).color(egui::Color32::WHITE))
            .fill(egui::Color32::from_rgb(127, 29, 29));
        if ui.add_enabled(!self.stopping, stop).clicked() {
            self.stop_all();
        }
        if !self.status_line.is_empty() {
            ui.label(egui::RichText::new(&self.status_line).size(11.0));
        }
        ui.separator();

        let save = egui::Button::new(egui::RichText::new("Save log").color(egui::Color32::WHITE))
            .fill(egui::Color32::from_rgb(17, 94, 89));
        if ui.add(save).clicked() {
            self.send(PipelineCommand::ExportLog);
        }
    }

    // ── Chat area ────────────────────────────────────────────────────────

    fn draw_transcript(&self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .stick_to_bottom(true)
            .max_height(ui.available_height() - 110.0)
            .show(ui, |ui| {
                for item in &self.transcript {
                    match item {
                        TranscriptItem::User(text) => {
                            ui.with_layout(egui::Layout::right_to_left(egui::Align::TOP), |ui| {
                                bubble(ui, egui::Color32::from_gray(66), |ui| {
                                    ui.label(egui::RichText::new(format!("You: {text}")).size(16.0));
                                });
                            });
                        }
                        TranscriptItem::Cow(art) => {
                            bubble(ui, egui::Color32::from_rgb(20, 83, 45), |ui| {
                                ui.label(egui::RichText::new(art).monospace().size(14.0));
                            });
                        }
                        TranscriptItem::Error(message) => {
                            ui.label(
                                egui::RichText::new(format!("Error: {message}"))
                                    .color(egui::Color32::from_rgb(239, 68, 68)),
                            );
                        }
                    }
                    ui.add_space(10.0);
                }
            });
    }

    fn draw_input(&mut self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new(self.pipeline_state.label()).color(egui::Color32::YELLOW));

        let input_id = egui::Id::new("chat_input");
        let has_focus = ui.ctx().memory(|m| m.has_focus(input_id));
        // Enter sends, Shift+Enter inserts a newline.
        let enter = has_focus
            && !self.busy
            && ui.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Enter));

        let mut send_clicked = false;
        ui.horizontal(|ui| {
            let edit = egui::TextEdit::multiline(&mut self.input)
                .id(input_id)
                .hint_text("Ask the Cow...")
                .desired_rows(2)
                .desired_width(ui.available_width() - 60.0);
            let response = ui.add_enabled(!self.busy, edit);
            if self.focus_input && !self.busy {
                response.request_focus();
                self.focus_input = false;
            }
            send_clicked = ui
                .add_enabled(!self.busy, egui::Button::new("Send"))
                .on_hover_text("Send")
                .clicked();
        });

        if enter || send_clicked {
            self.submit();
        }
    }

    fn draw_notice(&mut self, ctx: &egui::Context) {
        if let Some((_, shown)) = &self.notice {
            if shown.elapsed() >= NOTICE_TTL {
                self.notice = None;
            }
        }
        let Some((notice, _)) = &self.notice else {
            return;
        };

        let fill = match notice.level {
            NoticeLevel::Info => egui::Color32::from_rgb(17, 94, 89),
            NoticeLevel::Error => egui::Color32::from_rgb(153, 27, 27),
        };
        egui::TopBottomPanel::bottom("notice")
            .frame(egui::Frame::new().fill(fill).inner_margin(egui::Margin::same(8)))
            .show(ctx, |ui| {
                ui.label(egui::RichText::new(&notice.message).color(egui::Color32::WHITE));
            });
    }
}

fn bubble(ui: &mut egui::Ui, fill: egui::Color32, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::new()
        .fill(fill)
        .inner_margin(egui::Margin::same(10))
        .corner_radius(egui::CornerRadius::same(10))
        .show(ui, add_contents);
}

fn stop_summary(report: &StopReport) -> String {
    if let Some(error) = &report.error {
        format!("Stop failed: {error}")
    } else if report.is_clean() {
        "All models stopped.".into()
    } else {
        format!(
            "Stopped {} model(s); failed: {}",
            report.stopped.len(),
            report.failed.join(", ")
        )
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for CockpitApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_events(ctx);
        self.intercept_close(ctx);

        // Events arrive from another thread; keep polling.
        let interval = if self.busy || self.stopping || self.close_deadline.is_some() {
            Duration::from_millis(100)
        } else {
            Duration::from_millis(250)
        };
        ctx.request_repaint_after(interval);

        self.draw_notice(ctx);

        egui::SidePanel::left("sidebar")
            .exact_width(320.0)
            .show(ctx, |ui| self.draw_sidebar(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.close_deadline.is_some() {
                ui.label(
                    egui::RichText::new("Cleaning up models before exit...")
                        .color(egui::Color32::YELLOW),
                );
            }
            self.draw_transcript(ui);
            ui.separator();
            self.draw_input(ui);
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("Cow Cockpit window closing");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with(
        installed: &[&str],
    ) -> (
        CockpitApp,
        mpsc::Receiver<PipelineCommand>,
        mpsc::Sender<PipelineEvent>,
    ) {
        let (command_tx, command_rx) = mpsc::channel(8);
        let (event_tx, event_rx) = mpsc::channel(8);
        let app = CockpitApp::new(
            command_tx,
            event_rx,
            &AppConfig::default(),
            installed.iter().map(|s| s.to_string()).collect(),
        );
        (app, command_rx, event_tx)
    }

    #[test]
    fn thinker_defaults_to_preferred_model() {
        let (app, _rx, _tx) = app_with(&["llama3", "mistral-nemo"]);
        assert_eq!(app.pipeline.thinker_model, "mistral-nemo");

        let (app, _rx, _tx) = app_with(&["llama3"]);
        assert_eq!(app.pipeline.thinker_model, "llama3");
    }

    #[test]
    fn submit_sends_input_and_disables_until_idle() {
        let (mut app, mut rx, _tx) = app_with(&["m1"]);
        app.input = "hello".into();

        app.submit();

        assert!(app.is_busy());
        assert!(app.input.is_empty());
        match rx.try_recv().unwrap() {
            PipelineCommand::Submit { text, config } => {
                assert_eq!(text, "hello");
                assert_eq!(config.thinker_model, "m1");
            }
            other => panic!("unexpected command: {other:?}"),
        }

        // A second submission while busy goes nowhere.
        app.input = "again".into();
        app.submit();
        assert!(rx.try_recv().is_err());

        app.handle_event(PipelineEvent::StateChanged(PipelineState::Idle));
        assert!(!app.is_busy());
    }

    #[test]
    fn blank_input_is_not_sent() {
        let (mut app, mut rx, _tx) = app_with(&[]);
        app.input = "   ".into();
        app.submit();
        assert!(!app.is_busy());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn events_build_the_transcript() {
        let (mut app, _rx, _tx) = app_with(&[]);
        app.handle_event(PipelineEvent::UserMessage("hello".into()));
        app.handle_event(PipelineEvent::Reply {
            text: "hi there".into(),
            rendered: "< hi there >".into(),
        });
        app.handle_event(PipelineEvent::RunFailed {
            message: "Thinking failed".into(),
        });

        assert_eq!(
            app.transcript(),
            &[
                TranscriptItem::User("hello".into()),
                TranscriptItem::Cow("< hi there >".into()),
                TranscriptItem::Error("Thinking failed".into()),
            ]
        );
    }

    #[test]
    fn shutdown_complete_allows_close() {
        let (mut app, _rx, _tx) = app_with(&[]);
        assert!(!app.handle_event(PipelineEvent::Status("No active models".into())));
        assert!(app.handle_event(PipelineEvent::ShutdownComplete));
        assert!(app.may_close);
    }

    #[test]
    fn stop_summary_mentions_failures() {
        assert_eq!(stop_summary(&StopReport::default()), "All models stopped.");
        let report = StopReport {
            stopped: vec!["a".into()],
            failed: vec!["b".into()],
            error: None,
        };
        assert_eq!(stop_summary(&report), "Stopped 1 model(s); failed: b");
    }

    #[test]
    fn stop_summary_does_not_claim_success_when_listing_failed() {
        let report = StopReport {
            error: Some("could not list running models: not found".into()),
            ..StopReport::default()
        };
        assert_eq!(
            stop_summary(&report),
            "Stop failed: could not list running models: not found"
        );
    }
}
