use std::{path::PathBuf, time::Duration};

mod backend_bridge;
mod config;
mod controller;
mod ui;

use anyhow::{anyhow, Context};
use clap::Parser;
use client_core::SeqEditClient;
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use crate::backend_bridge::{
    commands::BackendCommand,
    runtime::{launch, BridgeSettings},
};
use crate::config::{load_startup_config, StartupConfig};
use crate::controller::{configurator::EnumLabelMode, events::UiEvent};
use crate::ui::SeqEditApp;

#[derive(Debug, Parser)]
#[command(name = "seqedit-gui", about = "Browse, configure and append sequence commands")]
struct Args {
    /// Config file to load instead of searching the default locations.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    /// How enumerated argument choices are labelled.
    #[arg(long, value_enum)]
    enum_labels: Option<EnumLabelMode>,
    #[arg(long)]
    validation_debounce_ms: Option<u64>,
}

impl Args {
    fn apply(self, config: &mut StartupConfig) {
        if let Some(url) = self.server_url {
            config.server_url = url;
        }
        if let Some(mode) = self.enum_labels {
            config.enum_label_mode = mode;
        }
        if let Some(ms) = self.validation_debounce_ms {
            config.validation_debounce = Duration::from_millis(ms);
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let mut startup = load_startup_config(args.config.as_deref())?;
    args.apply(&mut startup);

    let client = SeqEditClient::new(&startup.server_url)
        .with_context(|| format!("invalid server url '{}'", startup.server_url))?;
    tracing::info!(server = %client.server_url(), "starting sequence editor");

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    launch(
        client,
        BridgeSettings {
            validation_debounce: startup.validation_debounce,
            event_poll_interval: startup.event_poll_interval,
        },
        cmd_rx,
        ui_tx,
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Sequence Editor")
            .with_inner_size([1100.0, 720.0])
            .with_min_inner_size([760.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        "seqedit",
        options,
        Box::new(move |_cc| Ok(Box::new(SeqEditApp::new(cmd_tx, ui_rx, &startup)))),
    )
    .map_err(|err| anyhow!("failed to run desktop gui: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_loaded_config() {
        let args = Args::parse_from([
            "seqedit-gui",
            "--server-url",
            "http://flight:7000",
            "--enum-labels",
            "key-and-label",
            "--validation-debounce-ms",
            "125",
        ]);
        let mut config = StartupConfig::default();
        args.apply(&mut config);

        assert_eq!(config.server_url, "http://flight:7000");
        assert_eq!(config.enum_label_mode, EnumLabelMode::KeyAndLabel);
        assert_eq!(config.validation_debounce, Duration::from_millis(125));
        assert_eq!(config.event_poll_interval, Duration::from_millis(1000));
    }

    #[test]
    fn no_flags_leave_config_untouched() {
        let args = Args::parse_from(["seqedit-gui"]);
        let mut config = StartupConfig::default();
        args.apply(&mut config);
        assert_eq!(config, StartupConfig::default());
    }
}
