//! UI/backend events and error modeling for the desktop GUI controller.

use std::sync::Arc;

use shared::{dictionary::CommandDictionary, protocol::SequenceEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationVerdict {
    Accepted,
    Rejected(String),
    Unreachable(String),
}

impl ValidationVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

#[derive(Debug)]
pub enum UiEvent {
    Info(String),
    DictionaryLoaded(Arc<CommandDictionary>),
    ValidationFinished {
        revision: u64,
        verdict: ValidationVerdict,
    },
    CommandAppended {
        command_line: String,
    },
    Sequence(SequenceEvent),
    EventFeedRestored,
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Dictionary,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    DictionaryLoad,
    EventFeed,
    General,
}

pub fn classify_dictionary_failure(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    if lower.contains("failed to connect")
        || lower.contains("connection refused")
        || lower.contains("dns")
        || lower.contains("timed out")
    {
        "Sequencing server unreachable; check the server URL and retry.".to_string()
    } else if lower.contains("malformed") || lower.contains("does not match") {
        format!("Command dictionary could not be read: {message}")
    } else {
        format!("Command dictionary unavailable: {message}")
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("malformed")
            || message_lower.contains("dictionary key")
            || message_lower.contains("does not match")
        {
            UiErrorCategory::Dictionary
        } else if message_lower.contains("invalid")
            || message_lower.contains("rejected")
            || message_lower.contains("unsupported")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("connect")
            || message_lower.contains("network")
            || message_lower.contains("unavailable")
            || message_lower.contains("unreachable")
            || message_lower.contains("disconnect")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    /// Whether reloading the dictionary is a sensible recovery.
    pub fn offers_reload(&self) -> bool {
        self.context == UiErrorContext::DictionaryLoad
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Transport => "Transport",
        UiErrorCategory::Dictionary => "Dictionary",
        UiErrorCategory::Validation => "Validation",
        UiErrorCategory::Unknown => "Unexpected",
    }
}
