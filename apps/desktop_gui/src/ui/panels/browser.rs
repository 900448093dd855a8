//! Searchable accordion of dictionary commands grouped by subsystem.

use eframe::egui;
use shared::dictionary::CommandDictionary;

use crate::controller::{
    browser::{select_on_press, CommandBrowser},
    selection::CommandSelection,
};

pub fn show_browser_panel(
    ui: &mut egui::Ui,
    browser: &mut CommandBrowser,
    dictionary: Option<&CommandDictionary>,
    selection: &mut CommandSelection,
) {
    let pointer_inside = ui.rect_contains_pointer(ui.max_rect());
    browser.update_pointer(pointer_inside, selection.current().is_some());

    ui.horizontal(|ui| {
        let search = ui.add(
            egui::TextEdit::singleline(browser.filter_mut())
                .hint_text("Search commands")
                .desired_width(ui.available_width() - 56.0),
        );
        if browser.take_focus_request() {
            search.request_focus();
        }
        if ui.button("Reset").clicked() {
            browser.reset_filter();
            ui.ctx().request_repaint();
        }
    });

    let Some(dictionary) = dictionary else {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label("Loading command dictionary...");
        });
        return;
    };

    let groups = browser.visible_groups(dictionary);
    let shown: usize = groups.iter().map(|group| group.commands.len()).sum();
    ui.label(
        egui::RichText::new(format!("{shown} of {} commands", dictionary.len()))
            .small()
            .weak(),
    );
    ui.separator();

    // Consumed even when nothing is shown, so a hover edge never applies late.
    let forced_open = browser.take_expansion();
    if groups.is_empty() && browser.filter_active() {
        ui.label(egui::RichText::new(format!("No commands match '{}'", browser.filter())).weak());
        return;
    }

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for group in &groups {
                egui::CollapsingHeader::new(egui::RichText::new(group.subsystem).strong())
                    .id_salt(("subsystem", group.subsystem))
                    .open(forced_open)
                    .show(ui, |ui| {
                        for command in &group.commands {
                            let mut response =
                                ui.selectable_label(selection.is_selected(command), &command.name);
                            if !command.desc.is_empty() {
                                response = response.on_hover_text(&command.desc);
                            }
                            let pressed = ui.input(|i| i.pointer.primary_pressed());
                            select_on_press(selection, command, response.hovered(), pressed);
                        }
                    });
            }
        });
}

#[cfg(test)]
mod tests {
    use shared::dictionary::CommandDescriptor;

    use super::*;

    fn render(browser: &mut CommandBrowser, dictionary: &CommandDictionary) {
        let ctx = egui::Context::default();
        let mut selection = CommandSelection::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                show_browser_panel(ui, browser, Some(dictionary), &mut selection);
            });
        });
    }

    #[test]
    fn pending_expansion_is_consumed_when_filter_matches_nothing() {
        let dictionary = CommandDictionary::from_descriptors([CommandDescriptor {
            name: "NOOP".to_string(),
            desc: String::new(),
            subsystem: Some("CORE".to_string()),
            arguments: Default::default(),
        }]);
        let mut browser = CommandBrowser::default();
        browser.filter_mut().push_str("no such command");

        render(&mut browser, &dictionary);

        assert_eq!(browser.take_expansion(), None);
    }
}
