//! The single "command being configured" slot shared by the browser and the configurator.

use std::sync::Arc;

use shared::dictionary::CommandDescriptor;

/// Holds at most one selected command, by reference into the dictionary.
///
/// The browser writes through [`CommandSelection::select`]; the configurator may only
/// clear the slot for the generation it configured, so a selection made in between
/// is never lost.
#[derive(Debug, Default)]
pub struct CommandSelection {
    current: Option<Arc<CommandDescriptor>>,
    generation: u64,
}

impl CommandSelection {
    pub fn current(&self) -> Option<&Arc<CommandDescriptor>> {
        self.current.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_selected(&self, command: &Arc<CommandDescriptor>) -> bool {
        self.current
            .as_ref()
            .map(|current| Arc::ptr_eq(current, command))
            .unwrap_or(false)
    }

    pub fn select(&mut self, command: Arc<CommandDescriptor>) -> u64 {
        tracing::debug!(command = %command.name, "command selected");
        self.current = Some(command);
        self.generation += 1;
        self.generation
    }

    pub fn clear_submitted(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.current = None;
        self.generation += 1;
        true
    }
}
