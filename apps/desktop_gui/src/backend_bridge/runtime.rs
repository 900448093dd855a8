//! Runtime bridge between UI command queue and backend event intake.

use std::{sync::Arc, thread, time::Duration};

use client_core::{ClientEvent, CommandBackend, Debouncer, SeqEditClient, ValidationOutcome};
use crossbeam_channel::{Receiver, Sender};
use tokio::sync::broadcast::error::RecvError;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{
    classify_dictionary_failure, UiError, UiErrorContext, UiEvent, ValidationVerdict,
};

#[derive(Debug, Clone, Copy)]
pub struct BridgeSettings {
    pub validation_debounce: Duration,
    pub event_poll_interval: Duration,
}

pub fn launch(
    client: Arc<SeqEditClient>,
    settings: BridgeSettings,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    spawn_backend_thread(client, settings, cmd_rx, ui_tx);
}

/// Executes backend commands on the tokio runtime and reports back as [`UiEvent`]s.
pub struct BackendWorker<B: CommandBackend + 'static> {
    backend: Arc<B>,
    ui_tx: Sender<UiEvent>,
    validation: Debouncer,
}

impl<B: CommandBackend + 'static> BackendWorker<B> {
    pub fn new(backend: Arc<B>, ui_tx: Sender<UiEvent>, validation_debounce: Duration) -> Self {
        Self {
            backend,
            ui_tx,
            validation: Debouncer::new(validation_debounce),
        }
    }

    /// Must be called from within the worker's tokio runtime.
    pub fn handle(&mut self, cmd: BackendCommand) {
        let backend = Arc::clone(&self.backend);
        let ui_tx = self.ui_tx.clone();
        match cmd {
            BackendCommand::LoadDictionary => {
                tokio::spawn(async move {
                    let event = match backend.load_dictionary().await {
                        Ok(dictionary) => UiEvent::DictionaryLoaded(Arc::new(dictionary)),
                        Err(err) => {
                            let message = format!("{err:#}");
                            tracing::error!("failed to load command dictionary: {message}");
                            UiEvent::Error(UiError::from_message(
                                UiErrorContext::DictionaryLoad,
                                classify_dictionary_failure(&message),
                            ))
                        }
                    };
                    let _ = ui_tx.try_send(event);
                });
            }
            BackendCommand::ScheduleValidation {
                revision,
                command_line,
            } => {
                self.validation.schedule(async move {
                    let verdict = match backend.validate_command(&command_line).await {
                        Ok(ValidationOutcome::Valid) => ValidationVerdict::Accepted,
                        Ok(ValidationOutcome::Rejected { status, reason }) => {
                            tracing::debug!(revision, status, "validation rejected");
                            if reason.trim().is_empty() {
                                ValidationVerdict::Rejected(format!("rejected with status {status}"))
                            } else {
                                ValidationVerdict::Rejected(reason)
                            }
                        }
                        Err(err) => {
                            tracing::warn!(revision, "validation request failed: {err:#}");
                            ValidationVerdict::Unreachable(format!("{err:#}"))
                        }
                    };
                    let _ = ui_tx.try_send(UiEvent::ValidationFinished { revision, verdict });
                });
            }
            BackendCommand::CancelValidation => self.validation.cancel(),
            BackendCommand::AppendToSequence { command_line } => {
                // Not awaited by the UI; a failed append is only logged.
                tokio::spawn(async move {
                    match backend.append_to_sequence(&command_line).await {
                        Ok(()) => {
                            let _ = ui_tx.try_send(UiEvent::CommandAppended { command_line });
                        }
                        Err(err) => {
                            tracing::warn!(command = %command_line, "sequence append failed: {err:#}");
                        }
                    }
                });
            }
        }
    }
}

fn spawn_backend_thread(
    client: Arc<SeqEditClient>,
    settings: BridgeSettings,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let mut events = client.subscribe_events();
            let poller = client.start_event_polling(settings.event_poll_interval);
            let event_ui_tx = ui_tx.clone();
            let forwarder = tokio::spawn(async move {
                loop {
                    let evt = match events.recv().await {
                        Ok(ClientEvent::Sequence(event)) => UiEvent::Sequence(event),
                        Ok(ClientEvent::FeedRestored) => UiEvent::EventFeedRestored,
                        Ok(ClientEvent::Error(err)) => {
                            UiEvent::Error(UiError::from_message(UiErrorContext::EventFeed, err))
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event forwarder lagged behind");
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };
                    let _ = event_ui_tx.try_send(evt);
                }
            });

            let mut worker = BackendWorker::new(
                Arc::clone(&client),
                ui_tx.clone(),
                settings.validation_debounce,
            );
            let _ = ui_tx.try_send(UiEvent::Info(format!(
                "Backend worker ready ({})",
                client.server_url()
            )));

            while let Ok(cmd) = cmd_rx.recv() {
                worker.handle(cmd);
            }

            poller.abort();
            forwarder.abort();
            tracing::info!("ui command queue closed; backend worker stopping");
        });
    });
}
