use std::{fmt::Write as _, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{ClientEvent, CommandBackend, SeqEditClient, ValidationOutcome};
use shared::dictionary::{ArgumentKind, CommandDescriptor, CommandDictionary};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "seqedit", about = "Inspect the command dictionary and edit the sequence")]
struct Cli {
    #[arg(long, env = "SEQEDIT_SERVER_URL", default_value = "http://127.0.0.1:8080")]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List commands grouped by subsystem.
    List {
        /// Case-insensitive substring of the command name.
        #[arg(long)]
        filter: Option<String>,
    },
    /// Describe one command and its arguments.
    Show { name: String },
    /// Ask the server whether a command line is acceptable.
    Validate {
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },
    /// Append a command line to the sequence being edited.
    Add {
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },
    /// Print sequence execution events until interrupted.
    Watch {
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();
    let cli = Cli::parse();
    let client = SeqEditClient::new(&cli.server_url)
        .with_context(|| format!("invalid server url '{}'", cli.server_url))?;

    match cli.command {
        Command::List { filter } => {
            let dictionary = client.load_dictionary().await?;
            print!("{}", render_listing(&dictionary, filter.as_deref()));
        }
        Command::Show { name } => {
            let dictionary = client.load_dictionary().await?;
            let Some(command) = dictionary.get(&name) else {
                bail!("no command named '{name}' in the dictionary");
            };
            print!("{}", render_command(command));
        }
        Command::Validate { words } => {
            let line = words.join(" ");
            match client.validate_command(&line).await? {
                ValidationOutcome::Valid => println!("valid: {line}"),
                ValidationOutcome::Rejected { status, reason } => {
                    bail!("rejected ({status}): {}", reason.trim())
                }
            }
        }
        Command::Add { words } => {
            let line = words.join(" ");
            client.append_to_sequence(&line).await?;
            println!("appended: {line}");
        }
        Command::Watch { interval_ms } => {
            let mut events = client.subscribe_events();
            let poller = client.start_event_polling(Duration::from_millis(interval_ms));
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    received = events.recv() => match received {
                        Ok(ClientEvent::Sequence(event)) => println!("{}", event.name()),
                        Ok(ClientEvent::Error(err)) => eprintln!("event feed error: {err}"),
                        Ok(ClientEvent::FeedRestored) => eprintln!("event feed restored"),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "dropped events while printing");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            poller.abort();
        }
    }

    Ok(())
}

fn render_listing(dictionary: &CommandDictionary, filter: Option<&str>) -> String {
    let needle = filter.map(str::to_lowercase).unwrap_or_default();
    let mut out = String::new();
    for (subsystem, commands) in dictionary.by_subsystem() {
        let mut names: Vec<&CommandDescriptor> = commands
            .iter()
            .map(|command| command.as_ref())
            .filter(|command| needle.is_empty() || command.name.to_lowercase().contains(&needle))
            .collect();
        if names.is_empty() {
            continue;
        }
        names.sort_by(|a, b| a.name.cmp(&b.name));
        let _ = writeln!(out, "{subsystem}");
        for command in names {
            if command.desc.is_empty() {
                let _ = writeln!(out, "  {}", command.name);
            } else {
                let _ = writeln!(out, "  {:<24} {}", command.name, command.desc);
            }
        }
    }
    out
}

fn render_command(command: &CommandDescriptor) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", command.name, command.subsystem_key());
    if !command.desc.is_empty() {
        let _ = writeln!(out, "  {}", command.desc);
    }
    let arguments = command.form_arguments();
    if arguments.is_empty() {
        let _ = writeln!(out, "  (no arguments)");
        return out;
    }
    for argument in arguments {
        let units = argument
            .unit_label()
            .map(|units| format!(" [{units}]"))
            .unwrap_or_default();
        let _ = writeln!(out, "  {}{units}", argument.name);
        if let ArgumentKind::Enumerated(options) = argument.kind() {
            for (key, label) in options {
                let _ = writeln!(out, "    {key}  {label}");
            }
        }
        if let Some(desc) = argument.desc.as_deref().filter(|desc| !desc.is_empty()) {
            let _ = writeln!(out, "    {desc}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DICTIONARY: &str = r#"{
        "SET_POWER": {
            "name": "SET_POWER",
            "desc": "Set transmitter power",
            "subsystem": "RADIO",
            "arguments": {
                "opcode": {"bytes": 0, "fixed": true},
                "mode": {"bytes": 1, "enum": {"0": "off", "1": "on"}},
                "level": {"bytes": [2, 3], "units": "percent", "desc": "Output level"}
            }
        },
        "NOOP": {"name": "NOOP", "subsystem": "CORE"},
        "PING": {"name": "PING"}
    }"#;

    #[test]
    fn listing_groups_and_filters_by_name() {
        let dictionary = CommandDictionary::from_json(DICTIONARY).expect("dictionary");

        let all = render_listing(&dictionary, None);
        assert_eq!(
            all,
            "CORE\n  NOOP\nRADIO\n  SET_POWER                Set transmitter power\nother\n  PING\n"
        );

        let filtered = render_listing(&dictionary, Some("power"));
        assert_eq!(
            filtered,
            "RADIO\n  SET_POWER                Set transmitter power\n"
        );
        assert!(render_listing(&dictionary, Some("missing")).is_empty());
    }

    #[test]
    fn show_lists_form_arguments_only() {
        let dictionary = CommandDictionary::from_json(DICTIONARY).expect("dictionary");
        let rendered = render_command(dictionary.get("SET_POWER").expect("command"));

        assert!(rendered.starts_with("SET_POWER [RADIO]\n  Set transmitter power\n"));
        assert!(!rendered.contains("opcode"));
        assert!(rendered.contains("  mode\n    0  off\n    1  on\n"));
        assert!(rendered.contains("  level [percent]\n    Output level\n"));
    }

    #[test]
    fn show_marks_commands_without_arguments() {
        let dictionary = CommandDictionary::from_json(DICTIONARY).expect("dictionary");
        let rendered = render_command(dictionary.get("PING").expect("command"));
        assert_eq!(rendered, "PING [other]\n  (no arguments)\n");
    }

    #[test]
    fn validate_requires_words() {
        assert!(Cli::try_parse_from(["seqedit", "validate"]).is_err());
        let cli = Cli::try_parse_from(["seqedit", "add", "SET_POWER", "1", "75"]).expect("parse");
        assert!(matches!(cli.command, Command::Add { words } if words == ["SET_POWER", "1", "75"]));
    }
}
