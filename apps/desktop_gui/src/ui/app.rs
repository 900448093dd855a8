use std::{collections::VecDeque, sync::Arc, time::Duration};

use chrono::Local;
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::{dictionary::CommandDictionary, protocol::SequenceEvent};

use crate::backend_bridge::commands::BackendCommand;
use crate::config::StartupConfig;
use crate::controller::{
    browser::CommandBrowser,
    configurator::Configurator,
    events::{err_label, UiError, UiErrorContext, UiEvent, ValidationVerdict},
    orchestration::{dispatch_backend_command, dispatch_field_change, dispatch_validation_request},
    selection::CommandSelection,
};
use crate::ui::panels::{
    browser::show_browser_panel,
    configurator::{show_configurator_panel, ConfiguratorAction},
};

const ACTIVITY_LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
struct ActivityEntry {
    at: String,
    message: String,
}

pub struct SeqEditApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,

    server_url: String,
    dictionary: Option<Arc<CommandDictionary>>,
    selection: CommandSelection,
    browser: CommandBrowser,
    configurator: Configurator,

    status: String,
    status_banner: Option<UiError>,
    /// Kept apart from `status` so a feed outage never hides validator feedback.
    event_feed_error: Option<String>,
    activity: VecDeque<ActivityEntry>,
}

impl SeqEditApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        startup: &StartupConfig,
    ) -> Self {
        let mut app = Self {
            cmd_tx,
            ui_rx,
            server_url: startup.server_url.clone(),
            dictionary: None,
            selection: CommandSelection::default(),
            browser: CommandBrowser::default(),
            configurator: Configurator::new(startup.enum_label_mode),
            status: "Starting".to_string(),
            status_banner: None,
            event_feed_error: None,
            activity: VecDeque::with_capacity(ACTIVITY_LOG_CAPACITY),
        };
        app.queue(BackendCommand::LoadDictionary);
        app
    }

    fn queue(&mut self, cmd: BackendCommand) {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status);
        self.raise_if_backend_lost();
    }

    fn raise_if_backend_lost(&mut self) {
        if self.status.contains("disconnected") {
            self.status_banner = Some(UiError::from_message(
                UiErrorContext::General,
                self.status.clone(),
            ));
        }
    }

    fn record(&mut self, message: impl Into<String>) {
        if self.activity.len() == ACTIVITY_LOG_CAPACITY {
            self.activity.pop_front();
        }
        self.activity.push_back(ActivityEntry {
            at: Local::now().format("%H:%M:%S").to_string(),
            message: message.into(),
        });
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::DictionaryLoaded(dictionary) => {
                    self.status = format!(
                        "Loaded {} commands in {} subsystems",
                        dictionary.len(),
                        dictionary.by_subsystem().len()
                    );
                    if self
                        .status_banner
                        .as_ref()
                        .map(UiError::offers_reload)
                        .unwrap_or(false)
                    {
                        self.status_banner = None;
                    }
                    self.dictionary = Some(dictionary);
                }
                UiEvent::ValidationFinished { revision, verdict } => {
                    let applied = self
                        .configurator
                        .validation_finished(revision, verdict.is_valid());
                    if !applied {
                        tracing::debug!(revision, "dropping superseded validation verdict");
                        continue;
                    }
                    match verdict {
                        ValidationVerdict::Accepted => {}
                        ValidationVerdict::Rejected(reason) => {
                            self.status = format!("Command rejected: {reason}");
                        }
                        ValidationVerdict::Unreachable(reason) => {
                            self.status = format!("Validation unavailable: {reason}");
                        }
                    }
                }
                UiEvent::CommandAppended { command_line } => {
                    self.record(format!("Appended: {command_line}"));
                }
                UiEvent::Sequence(event) => {
                    self.configurator.apply_sequence_event(event);
                    let message = match event {
                        SequenceEvent::ExecStart => "Sequence execution started",
                        SequenceEvent::ExecDone => "Sequence execution finished",
                        SequenceEvent::ExecError => "Sequence execution failed",
                    };
                    self.status = message.to_string();
                    self.record(message);
                }
                UiEvent::EventFeedRestored => {
                    self.event_feed_error = None;
                    self.record("Event feed reconnected");
                }
                UiEvent::Error(err) if err.context() == UiErrorContext::EventFeed => {
                    self.record(format!("Event feed unavailable: {}", err.message()));
                    self.event_feed_error = Some(err.message().to_string());
                }
                UiEvent::Error(err) => {
                    self.status = format!("{} error: {}", err_label(err.category()), err.message());
                    if matches!(
                        err.context(),
                        UiErrorContext::BackendStartup | UiErrorContext::DictionaryLoad
                    ) {
                        self.status_banner = Some(err);
                    }
                }
            }
        }
    }

    fn sync_configurator(&mut self) {
        if let Some(request) = self.configurator.sync_selection(&self.selection) {
            dispatch_validation_request(&self.cmd_tx, request, &mut self.status);
            self.raise_if_backend_lost();
        }
    }

    fn handle_configurator_action(&mut self, action: ConfiguratorAction) {
        match action {
            ConfiguratorAction::None => {}
            ConfiguratorAction::FieldChanged => {
                dispatch_field_change(&self.cmd_tx, &mut self.configurator, &mut self.status);
                self.raise_if_backend_lost();
            }
            ConfiguratorAction::Submit => {
                if let Some(command_line) = self.configurator.submit(&mut self.selection) {
                    tracing::info!(command = %command_line, "submitting command");
                    self.status = format!("Submitted {command_line}");
                    self.queue(BackendCommand::AppendToSequence { command_line });
                }
            }
        }
    }

    fn show_status_banner(&mut self, ui: &mut egui::Ui) {
        let Some(banner) = self.status_banner.clone() else {
            return;
        };
        egui::Frame::NONE
            .fill(egui::Color32::from_rgb(111, 53, 53))
            .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)))
            .corner_radius(8.0)
            .inner_margin(egui::Margin::symmetric(10, 8))
            .show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    ui.label(
                        egui::RichText::new(format!(
                            "{}: {}",
                            err_label(banner.category()),
                            banner.message()
                        ))
                        .color(egui::Color32::WHITE),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Dismiss").clicked() {
                            self.status_banner = None;
                        }
                        if banner.offers_reload() && ui.button("Reload dictionary").clicked() {
                            self.status_banner = None;
                            self.queue(BackendCommand::LoadDictionary);
                        }
                    });
                });
            });
    }

    fn show_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("Sequence editor");
                ui.separator();
                ui.label(egui::RichText::new(&self.server_url).monospace().weak());
                if let Some(form) = self.configurator.form() {
                    ui.separator();
                    ui.label(format!("Editing {}", form.command().name));
                }
                if self.configurator.submissions_disabled() {
                    ui.separator();
                    ui.label(
                        egui::RichText::new("Sequence executing")
                            .color(ui.visuals().warn_fg_color),
                    );
                }
                if let Some(feed_error) = &self.event_feed_error {
                    ui.separator();
                    ui.label(egui::RichText::new("Event feed offline").weak())
                        .on_hover_text(feed_error);
                }
            });
            self.show_status_banner(ui);
        });
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(&self.status).small());
            });
        });
    }

    fn show_activity_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("activity_log")
            .resizable(true)
            .default_height(110.0)
            .show(ctx, |ui| {
                ui.label(egui::RichText::new("Activity").strong());
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for entry in &self.activity {
                            ui.label(
                                egui::RichText::new(format!("{}  {}", entry.at, entry.message))
                                    .monospace()
                                    .small(),
                            );
                        }
                    });
            });
    }
}

impl eframe::App for SeqEditApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.sync_configurator();

        self.show_top_bar(ctx);
        self.show_status_bar(ctx);
        self.show_activity_panel(ctx);

        egui::SidePanel::left("command_browser")
            .resizable(true)
            .default_width(320.0)
            .min_width(220.0)
            .show(ctx, |ui| {
                show_browser_panel(
                    ui,
                    &mut self.browser,
                    self.dictionary.as_deref(),
                    &mut self.selection,
                );
            });

        // A press in the browser this frame must rebuild the form before it is drawn.
        self.sync_configurator();

        let action = egui::CentralPanel::default()
            .show(ctx, |ui| show_configurator_panel(ui, &mut self.configurator))
            .inner;
        self.handle_configurator_action(action);

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
