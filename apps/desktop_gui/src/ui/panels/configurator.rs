//! Argument form for the selected command.

use eframe::egui;

use crate::controller::configurator::{Configurator, FieldInput, Validity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfiguratorAction {
    None,
    FieldChanged,
    Submit,
}

pub fn show_configurator_panel(
    ui: &mut egui::Ui,
    configurator: &mut Configurator,
) -> ConfiguratorAction {
    let submissions_disabled = configurator.submissions_disabled();
    let can_submit = configurator.can_submit();
    let Some(form) = configurator.form_mut() else {
        ui.vertical_centered(|ui| {
            ui.add_space(48.0);
            ui.heading("No command selected");
            ui.label(
                egui::RichText::new(
                    "Pick a command from the browser on the left to configure its arguments \
                     and add it to the sequence.",
                )
                .weak(),
            );
        });
        return ConfiguratorAction::None;
    };

    let mut action = ConfiguratorAction::None;

    ui.heading(&form.command().name);
    if !form.command().desc.is_empty() {
        ui.label(egui::RichText::new(&form.command().desc).weak());
    }
    ui.separator();

    if form.fields().is_empty() {
        ui.label(egui::RichText::new("This command takes no arguments.").italics());
    } else {
        egui::Grid::new("argument_form")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .striped(true)
            .show(ui, |ui| {
                for (index, field) in form.fields_mut().iter_mut().enumerate() {
                    let label = ui.label(&field.display_name);
                    if let Some(description) = &field.description {
                        label.on_hover_text(description);
                    }
                    ui.horizontal(|ui| {
                        match &mut field.input {
                            FieldInput::Choice { options, selected } => {
                                let before = *selected;
                                let selected_text = options
                                    .get(*selected)
                                    .map(|option| option.text.clone())
                                    .unwrap_or_default();
                                egui::ComboBox::from_id_salt(("argument", index))
                                    .selected_text(selected_text)
                                    .show_ui(ui, |ui| {
                                        for (option_index, option) in options.iter().enumerate() {
                                            ui.selectable_value(
                                                selected,
                                                option_index,
                                                option.text.as_str(),
                                            );
                                        }
                                    });
                                if *selected != before {
                                    action = ConfiguratorAction::FieldChanged;
                                }
                            }
                            FieldInput::Text { value } => {
                                // Reports every keystroke, not only on focus loss.
                                if ui.text_edit_singleline(value).changed() {
                                    action = ConfiguratorAction::FieldChanged;
                                }
                            }
                        }
                        if let Some(units) = &field.unit_label {
                            ui.label(egui::RichText::new(units).weak());
                        }
                    });
                    ui.end_row();
                }
            });
    }

    ui.separator();
    ui.label(egui::RichText::new(form.command_line()).monospace());
    ui.add_space(6.0);

    ui.horizontal(|ui| {
        let submit = ui.add_enabled(can_submit, egui::Button::new("Add to sequence"));
        if submit.clicked() {
            action = ConfiguratorAction::Submit;
        }
        match form.validity() {
            Validity::Validating => {
                ui.spinner();
                ui.label("Validating");
            }
            Validity::Invalid => {
                ui.label(
                    egui::RichText::new("Fill in every argument with a value the server accepts")
                        .weak(),
                );
            }
            Validity::Valid | Validity::AssumedValid => {}
        }
        if submissions_disabled {
            ui.label(
                egui::RichText::new("Sequence executing; submission disabled")
                    .color(ui.visuals().warn_fg_color),
            );
        }
    });

    action
}
