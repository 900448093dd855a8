//! Argument form for the selected command and its validity state machine.

use std::sync::Arc;

use clap::ValueEnum;
use serde::Deserialize;
use shared::{
    dictionary::{ArgumentDefinition, ArgumentKind, CommandDescriptor},
    protocol::SequenceEvent,
};

use super::selection::CommandSelection;

/// How enumerated options are labelled in choice inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EnumLabelMode {
    #[default]
    Key,
    KeyAndLabel,
}

impl EnumLabelMode {
    pub fn option_text(self, key: &str, label: &str) -> String {
        match self {
            Self::Key => key.to_string(),
            Self::KeyAndLabel => format!("{key} ({label})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub key: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldInput {
    Choice {
        options: Vec<ChoiceOption>,
        selected: usize,
    },
    Text {
        value: String,
    },
}

impl FieldInput {
    fn for_argument(argument: &ArgumentDefinition, mode: EnumLabelMode) -> Self {
        match argument.kind() {
            ArgumentKind::Enumerated(options) if !options.is_empty() => Self::Choice {
                options: options
                    .iter()
                    .map(|(key, label)| ChoiceOption {
                        key: key.clone(),
                        text: mode.option_text(key, label),
                    })
                    .collect(),
                selected: 0,
            },
            // Fixed arguments never reach the form; an enum without options can
            // only be typed in.
            _ => Self::Text {
                value: String::new(),
            },
        }
    }

    /// Value placed in the command line: the selected option key, or the typed
    /// text with surrounding whitespace trimmed.
    pub fn value(&self) -> &str {
        match self {
            Self::Choice { options, selected } => options
                .get(*selected)
                .map(|option| option.key.as_str())
                .unwrap_or(""),
            Self::Text { value } => value.trim(),
        }
    }

    pub fn is_free_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }
}

#[derive(Debug, Clone)]
pub struct FormField {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub unit_label: Option<String>,
    pub input: FieldInput,
}

impl FormField {
    fn new(argument: &ArgumentDefinition, mode: EnumLabelMode) -> Self {
        Self {
            name: argument.name.clone(),
            display_name: argument.display_name(),
            description: argument.desc.clone().filter(|desc| !desc.trim().is_empty()),
            unit_label: argument.unit_label().map(str::to_string),
            input: FieldInput::for_argument(argument, mode),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// Only choice inputs; nothing the backend could reject.
    AssumedValid,
    Invalid,
    Validating,
    Valid,
}

impl Validity {
    pub fn allows_submit(self) -> bool {
        matches!(self, Self::AssumedValid | Self::Valid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationRequest {
    Cancel,
    Schedule { revision: u64, command_line: String },
}

#[derive(Debug)]
pub struct CommandForm {
    command: Arc<CommandDescriptor>,
    fields: Vec<FormField>,
    validity: Validity,
    revision: u64,
}

impl CommandForm {
    fn build(command: Arc<CommandDescriptor>, mode: EnumLabelMode, revision: u64) -> Self {
        let fields: Vec<FormField> = command
            .form_arguments()
            .into_iter()
            .map(|argument| FormField::new(argument, mode))
            .collect();
        let validity = if fields.iter().any(|field| field.input.is_free_text()) {
            Validity::Invalid
        } else {
            Validity::AssumedValid
        };
        Self {
            command,
            fields,
            validity,
            revision,
        }
    }

    pub fn command(&self) -> &Arc<CommandDescriptor> {
        &self.command
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [FormField] {
        &mut self.fields
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    pub fn command_line(&self) -> String {
        compose_command_line(
            &self.command.name,
            self.fields.iter().map(|field| field.input.value()),
        )
    }

    fn has_empty_field(&self) -> bool {
        self.fields
            .iter()
            .any(|field| field.input.value().is_empty())
    }
}

pub fn compose_command_line<'a>(name: &str, values: impl IntoIterator<Item = &'a str>) -> String {
    let mut line = name.to_string();
    for value in values {
        line.push(' ');
        line.push_str(value);
    }
    line
}

#[derive(Debug)]
pub struct Configurator {
    label_mode: EnumLabelMode,
    form: Option<CommandForm>,
    synced_generation: u64,
    last_revision: u64,
    sequence_running: bool,
}

impl Configurator {
    pub fn new(label_mode: EnumLabelMode) -> Self {
        Self {
            label_mode,
            form: None,
            synced_generation: 0,
            last_revision: 0,
            sequence_running: false,
        }
    }

    pub fn form(&self) -> Option<&CommandForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut CommandForm> {
        self.form.as_mut()
    }

    fn next_revision(&mut self) -> u64 {
        self.last_revision += 1;
        self.last_revision
    }

    /// Rebuilds the form when a different selection generation is observed.
    pub fn sync_selection(&mut self, selection: &CommandSelection) -> Option<ValidationRequest> {
        if selection.generation() == self.synced_generation {
            return None;
        }
        self.synced_generation = selection.generation();
        let revision = self.next_revision();
        let mode = self.label_mode;
        self.form = selection
            .current()
            .map(|command| CommandForm::build(Arc::clone(command), mode, revision));
        if let Some(form) = &self.form {
            tracing::debug!(
                command = %form.command.name,
                fields = form.fields.len(),
                validity = ?form.validity,
                "configuring command"
            );
        }
        Some(ValidationRequest::Cancel)
    }

    /// Call after any input of the current form changed value.
    pub fn field_changed(&mut self) -> Option<ValidationRequest> {
        let revision = self.next_revision();
        let form = self.form.as_mut()?;
        form.revision = revision;
        if form.has_empty_field() {
            form.validity = Validity::Invalid;
            return Some(ValidationRequest::Cancel);
        }
        form.validity = Validity::Validating;
        Some(ValidationRequest::Schedule {
            revision,
            command_line: form.command_line(),
        })
    }

    /// Applies a remote verdict; verdicts for superseded revisions are dropped.
    pub fn validation_finished(&mut self, revision: u64, valid: bool) -> bool {
        match self.form.as_mut() {
            Some(form) if form.revision == revision && form.validity == Validity::Validating => {
                form.validity = if valid {
                    Validity::Valid
                } else {
                    Validity::Invalid
                };
                true
            }
            _ => false,
        }
    }

    pub fn apply_sequence_event(&mut self, event: SequenceEvent) {
        self.sequence_running = event.sequence_running();
    }

    pub fn submissions_disabled(&self) -> bool {
        self.sequence_running
    }

    pub fn can_submit(&self) -> bool {
        !self.sequence_running
            && self
                .form
                .as_ref()
                .map(|form| form.validity.allows_submit())
                .unwrap_or(false)
    }

    /// Takes the composed command line and releases the selection.
    pub fn submit(&mut self, selection: &mut CommandSelection) -> Option<String> {
        if !self.can_submit() {
            return None;
        }
        let form = self.form.take()?;
        if selection.clear_submitted(self.synced_generation) {
            self.synced_generation = selection.generation();
        }
        Some(form.command_line())
    }
}
