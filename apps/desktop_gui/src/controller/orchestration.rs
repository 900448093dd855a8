//! Command orchestration helpers from UI actions to backend command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::configurator::{Configurator, ValidationRequest};

pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) -> bool {
    let cmd_name = match &cmd {
        BackendCommand::LoadDictionary => "load_dictionary",
        BackendCommand::ScheduleValidation { .. } => "schedule_validation",
        BackendCommand::CancelValidation => "cancel_validation",
        BackendCommand::AppendToSequence { .. } => "append_to_sequence",
    };

    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            true
        }
        Err(TrySendError::Full(_)) => {
            tracing::warn!(command = cmd_name, "ui command queue full");
            *status = "UI command queue is full; please retry".to_string();
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            *status =
                "Backend command processor disconnected (possible startup/runtime failure); restart the app"
                    .to_string();
            false
        }
    }
}

pub fn dispatch_validation_request(
    cmd_tx: &Sender<BackendCommand>,
    request: ValidationRequest,
    status: &mut String,
) -> bool {
    let cmd = match request {
        ValidationRequest::Cancel => BackendCommand::CancelValidation,
        ValidationRequest::Schedule {
            revision,
            command_line,
        } => BackendCommand::ScheduleValidation {
            revision,
            command_line,
        },
    };
    dispatch_backend_command(cmd_tx, cmd, status)
}

/// Forwards a field edit to the validator. A check that cannot be queued leaves
/// the form invalid rather than waiting on a verdict that will never arrive.
pub fn dispatch_field_change(
    cmd_tx: &Sender<BackendCommand>,
    configurator: &mut Configurator,
    status: &mut String,
) {
    let Some(request) = configurator.field_changed() else {
        return;
    };
    let revision = match &request {
        ValidationRequest::Schedule { revision, .. } => Some(*revision),
        ValidationRequest::Cancel => None,
    };
    if !dispatch_validation_request(cmd_tx, request, status) {
        if let Some(revision) = revision {
            configurator.validation_finished(revision, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crossbeam_channel::bounded;
    use shared::dictionary::CommandDictionary;

    use super::*;
    use crate::controller::{
        configurator::{EnumLabelMode, FieldInput, Validity},
        selection::CommandSelection,
    };

    fn configurator_with_typed_target(target: &str) -> Configurator {
        let dictionary = CommandDictionary::from_json(
            r#"{"HTR_SET_TEMP": {"name": "HTR_SET_TEMP", "arguments": {"target": {"bytes": 0}}}}"#,
        )
        .expect("dictionary");
        let mut selection = CommandSelection::default();
        selection.select(Arc::clone(dictionary.get("HTR_SET_TEMP").expect("command")));
        let mut configurator = Configurator::new(EnumLabelMode::Key);
        configurator.sync_selection(&selection);
        if let Some(FieldInput::Text { value }) = configurator
            .form_mut()
            .and_then(|form| form.fields_mut().first_mut())
            .map(|field| &mut field.input)
        {
            value.push_str(target);
        }
        configurator
    }

    #[test]
    fn validation_requests_map_onto_backend_commands() {
        let (cmd_tx, cmd_rx) = bounded(4);
        let mut status = String::new();

        dispatch_validation_request(
            &cmd_tx,
            ValidationRequest::Schedule {
                revision: 7,
                command_line: "NOOP".to_string(),
            },
            &mut status,
        );
        dispatch_validation_request(&cmd_tx, ValidationRequest::Cancel, &mut status);

        assert!(matches!(
            cmd_rx.try_recv(),
            Ok(BackendCommand::ScheduleValidation { revision: 7, .. })
        ));
        assert!(matches!(
            cmd_rx.try_recv(),
            Ok(BackendCommand::CancelValidation)
        ));
        assert!(status.is_empty());
    }

    #[test]
    fn reports_disconnected_backend_in_status() {
        let (cmd_tx, cmd_rx) = bounded(1);
        drop(cmd_rx);
        let mut status = String::new();
        dispatch_backend_command(&cmd_tx, BackendCommand::LoadDictionary, &mut status);
        assert!(status.contains("disconnected"));
    }

    #[test]
    fn unqueued_validation_leaves_form_invalid() {
        let mut configurator = configurator_with_typed_target("40");

        let (cmd_tx, _cmd_rx) = bounded(1);
        cmd_tx
            .try_send(BackendCommand::LoadDictionary)
            .expect("fill queue");
        let mut status = String::new();
        dispatch_field_change(&cmd_tx, &mut configurator, &mut status);

        assert!(status.contains("full"));
        assert_eq!(
            configurator.form().expect("form").validity(),
            Validity::Invalid
        );
    }

    #[test]
    fn queued_validation_keeps_form_validating() {
        let mut configurator = configurator_with_typed_target("40");

        let (cmd_tx, cmd_rx) = bounded(4);
        let mut status = String::new();
        dispatch_field_change(&cmd_tx, &mut configurator, &mut status);

        assert!(matches!(
            cmd_rx.try_recv(),
            Ok(BackendCommand::ScheduleValidation { command_line, .. }) if command_line == "HTR_SET_TEMP 40"
        ));
        assert_eq!(
            configurator.form().expect("form").validity(),
            Validity::Validating
        );
    }

    #[test]
    fn reports_full_queue_in_status() {
        let (cmd_tx, _cmd_rx) = bounded(1);
        let mut status = String::new();
        dispatch_backend_command(&cmd_tx, BackendCommand::LoadDictionary, &mut status);
        dispatch_backend_command(&cmd_tx, BackendCommand::LoadDictionary, &mut status);
        assert!(status.contains("full"));
    }
}
