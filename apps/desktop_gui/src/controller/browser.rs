//! Filtering, grouping and expansion state of the command browser.

use std::sync::Arc;

use shared::dictionary::{CommandDescriptor, CommandDictionary};

use super::selection::CommandSelection;

#[derive(Debug)]
pub struct CommandGroup<'a> {
    pub subsystem: &'a str,
    pub commands: Vec<&'a Arc<CommandDescriptor>>,
}

#[derive(Debug)]
pub struct CommandBrowser {
    filter: String,
    pointer_inside: bool,
    pending_expansion: Option<bool>,
    focus_search: bool,
}

impl Default for CommandBrowser {
    fn default() -> Self {
        Self {
            filter: String::new(),
            pointer_inside: false,
            // Nothing is selected yet, so start in browsing mode.
            pending_expansion: Some(true),
            focus_search: false,
        }
    }
}

impl CommandBrowser {
    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut String {
        &mut self.filter
    }

    pub fn filter_active(&self) -> bool {
        !self.filter.is_empty()
    }

    /// Groups to display: subsystems in lexical order, commands in lexical order,
    /// empty groups dropped.
    pub fn visible_groups<'a>(&self, dictionary: &'a CommandDictionary) -> Vec<CommandGroup<'a>> {
        let needle = self.filter.to_lowercase();
        let mut groups: Vec<CommandGroup<'a>> = dictionary
            .by_subsystem()
            .iter()
            .filter_map(|(subsystem, commands)| {
                let mut commands: Vec<&Arc<CommandDescriptor>> = commands
                    .iter()
                    .filter(|command| {
                        needle.is_empty() || command.name.to_lowercase().contains(&needle)
                    })
                    .collect();
                if commands.is_empty() {
                    return None;
                }
                commands.sort_by(|a, b| a.name.cmp(&b.name));
                Some(CommandGroup {
                    subsystem: subsystem.as_str(),
                    commands,
                })
            })
            .collect();
        groups.sort_by(|a, b| a.subsystem.cmp(b.subsystem));
        groups
    }

    /// Clears the filter; the search field is refocused on the next frame, once the
    /// unfiltered list has been rendered.
    pub fn reset_filter(&mut self) {
        self.filter.clear();
        self.focus_search = true;
    }

    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_search)
    }

    pub fn update_pointer(&mut self, inside: bool, has_selection: bool) {
        if inside == self.pointer_inside {
            return;
        }
        self.pointer_inside = inside;
        if inside {
            self.pointer_entered(has_selection);
        } else {
            self.pointer_left(has_selection);
        }
    }

    fn pointer_entered(&mut self, has_selection: bool) {
        if !has_selection || self.filter_active() {
            self.pending_expansion = Some(true);
        }
    }

    fn pointer_left(&mut self, has_selection: bool) {
        if has_selection && !self.filter_active() {
            self.pending_expansion = Some(false);
        }
    }

    /// Expansion to force onto every group header this frame, if any.
    pub fn take_expansion(&mut self) -> Option<bool> {
        self.pending_expansion.take()
    }
}

/// Selects `command` on the frame the primary button goes down over its row.
/// A release alone never selects.
pub fn select_on_press(
    selection: &mut CommandSelection,
    command: &Arc<CommandDescriptor>,
    hovered: bool,
    primary_pressed: bool,
) -> bool {
    if !(hovered && primary_pressed) {
        return false;
    }
    selection.select(Arc::clone(command));
    true
}
