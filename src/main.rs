use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crm_forms::config::Config;
use crm_forms::crm;
use crm_forms::form::{
    save_fn, DiscardSave, FormData, FormOptions, FormStep, MultiStepForm, SaveHandler,
    SubmitOutcome,
};
use crm_forms::logging;
use crm_forms::persistence::FileStore;

#[derive(Parser)]
#[command(name = "crm-forms")]
#[command(about = "Multi-step CRM wizards with resumable sessions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List built-in wizards
    Wizards,

    /// Show the steps of a wizard
    Steps {
        /// Wizard name (organization, contact)
        wizard: String,
    },

    /// Validate a data file against every step of a wizard
    Validate {
        wizard: String,

        /// JSON or YAML file with the form values
        #[arg(long)]
        data: PathBuf,
    },

    /// Resume a session, apply edits, validate and save the snapshot
    Edit {
        wizard: String,

        /// Session key used for the snapshot
        #[arg(short, long)]
        key: String,

        /// Step to make active before applying edits
        #[arg(short, long)]
        step: Option<usize>,

        /// Field assignment, `field=value`; values parse as JSON when possible
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, Value)>,
    },

    /// Resume a session and submit it, writing the data to a file
    Submit {
        wizard: String,

        #[arg(short, long)]
        key: String,

        /// Output file for the submitted data
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Throw away the snapshot for a session
    Discard {
        wizard: String,

        #[arg(short, long)]
        key: String,
    },
}

/// Parse `field=value`, reading the value as JSON and falling back to a string
fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{raw}'"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((field.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;
    let logging_handle = logging::init_logging(&config, cli.debug)?;

    let result = match cli.command {
        Commands::Wizards => {
            cmd_wizards();
            Ok(ExitCode::SUCCESS)
        }
        Commands::Steps { wizard } => cmd_steps(&wizard).map(|()| ExitCode::SUCCESS),
        Commands::Validate { wizard, data } => cmd_validate(&config, &wizard, &data)
            .await
            .map(|valid| if valid { ExitCode::SUCCESS } else { ExitCode::FAILURE }),
        Commands::Edit {
            wizard,
            key,
            step,
            set,
        } => cmd_edit(&config, &wizard, &key, step, set)
            .await
            .map(|()| ExitCode::SUCCESS),
        Commands::Submit { wizard, key, out } => cmd_submit(&config, &wizard, &key, out)
            .await
            .map(|()| ExitCode::SUCCESS),
        Commands::Discard { wizard, key } => {
            cmd_discard(&config, &wizard, &key).map(|()| ExitCode::SUCCESS)
        }
    };

    // Dropping the handle flushes buffered file logs
    let log_file_path = logging_handle.log_file_path.clone();
    drop(logging_handle);
    if let Some(log_path) = log_file_path {
        if log_path.metadata().is_ok_and(|m| m.len() > 0) {
            eprintln!("Session log: {}", log_path.display());
        }
    }

    result
}

fn load_wizard(name: &str) -> Result<Vec<FormStep>> {
    match crm::wizard(name) {
        Some(steps) => Ok(steps),
        None => bail!(
            "Unknown wizard '{}' (available: {})",
            name,
            crm::WIZARDS.join(", ")
        ),
    }
}

/// Form session for `wizard`, persisting under `key` when given
fn open_form(
    config: &Config,
    wizard: &str,
    key: Option<&str>,
    on_save: impl SaveHandler + 'static,
) -> Result<MultiStepForm> {
    let steps = load_wizard(wizard)?;

    let mut options =
        FormOptions::from_config(&config.forms).key_prefix(&config.persistence.key_prefix);
    if let Some(key) = key {
        let store = Arc::new(FileStore::new(config.snapshots_path()));
        options = options.persist(store, format!("{wizard}-{key}"));
        options.enable_persistence = config.persistence.enabled;
    }

    Ok(MultiStepForm::new(
        steps,
        FormData::new(),
        on_save,
        options,
    )?)
}

fn read_data_file(path: &Path) -> Result<FormData> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read data file {}", path.display()))?;

    let is_yaml = path
        .extension()
        .is_some_and(|e| e == "yaml" || e == "yml");
    let data: FormData = if is_yaml {
        serde_yaml::from_str(&contents).context("Failed to parse YAML data file")?
    } else {
        serde_json::from_str(&contents).context("Failed to parse JSON data file")?
    };
    Ok(data)
}

fn cmd_wizards() {
    for name in crm::WIZARDS {
        let steps = crm::wizard(name).unwrap_or_default();
        println!("{:<14} {} steps", name, steps.len());
    }
}

fn cmd_steps(wizard: &str) -> Result<()> {
    let steps = load_wizard(wizard)?;

    println!("{} ({} steps)", wizard, steps.len());
    println!("{}", "─".repeat(60));
    for (i, step) in steps.iter().enumerate() {
        let marker = if step.required { "*" } else { " " };
        println!("{}{} {:<10} {}", i, marker, step.id, step.label);
        if !step.description.is_empty() {
            println!("     {}", step.description);
        }
        let watched: Vec<_> = step.watched_fields.iter().map(String::as_str).collect();
        println!("     fields: {}", watched.join(", "));
    }
    println!();
    println!("* required");
    Ok(())
}

fn print_session(form: &MultiStepForm) {
    let session = form.session();

    println!("{}", "─".repeat(60));
    for (i, (step, state)) in form.steps().iter().zip(&session.step_states).enumerate() {
        let status = if state.completed {
            "done"
        } else if !state.is_valid {
            "errors"
        } else if state.has_changes {
            "edited"
        } else {
            "-"
        };
        let active = if i == session.active_step { ">" } else { " " };
        println!(
            "{} {:<10} {:<8} errors: {}  warnings: {}",
            active, step.id, status, state.error_count, state.warning_count
        );
    }

    if !session.validation_errors.is_empty() {
        println!();
        for (field, message) in &session.validation_errors {
            println!("  {field}: {message}");
        }
    }

    println!();
    println!(
        "Steps completed: {:.0}%  Position: {:.0}%  Ready to submit: {}",
        form.step_progress(),
        form.overall_progress(),
        if form.can_submit() { "yes" } else { "no" }
    );
}

/// True when every step passes
async fn cmd_validate(config: &Config, wizard: &str, data_path: &Path) -> Result<bool> {
    let data = read_data_file(data_path)?;
    let form = open_form(config, wizard, None, DiscardSave)?;

    form.update_form_data(data);
    let valid = form.validate_all_steps().await;

    print_session(&form);
    Ok(valid)
}

async fn cmd_edit(
    config: &Config,
    wizard: &str,
    key: &str,
    step: Option<usize>,
    set: Vec<(String, Value)>,
) -> Result<()> {
    let form = open_form(config, wizard, Some(key), DiscardSave)?;
    if form.persist_key().is_none() {
        eprintln!("Warning: persistence is disabled, edits will not be kept");
    }

    if form.restore() {
        println!("Resumed session '{key}'");
    } else {
        println!("Started session '{key}'");
    }

    if let Some(step) = step {
        if !form.go_to_step(step) {
            eprintln!(
                "Cannot move to step {} (out of range or earlier required steps incomplete)",
                step
            );
        }
    }

    if !set.is_empty() {
        form.update_form_data(set.into_iter().collect());
    }
    form.validate_step(form.active_step()).await;
    form.persist();

    print_session(&form);
    Ok(())
}

async fn cmd_submit(config: &Config, wizard: &str, key: &str, out: PathBuf) -> Result<()> {
    let target = out.clone();
    let on_save = save_fn(move |data: FormData| {
        let target = target.clone();
        async move {
            let json = serde_json::to_string_pretty(&data)?;
            tokio::fs::write(&target, json)
                .await
                .with_context(|| format!("Failed to write {}", target.display()))
        }
    });

    let form = open_form(config, wizard, Some(key), on_save)?;
    if !form.restore() {
        bail!("No saved session '{key}' for wizard '{wizard}'");
    }

    match form.submit_form().await? {
        SubmitOutcome::Saved => {
            println!("Submitted '{}' to {}", key, out.display());
            Ok(())
        }
        SubmitOutcome::Blocked => {
            print_session(&form);
            bail!("Session '{key}' is not ready to submit");
        }
        SubmitOutcome::Invalid => {
            print_session(&form);
            bail!("Session '{key}' failed validation");
        }
    }
}

fn cmd_discard(config: &Config, wizard: &str, key: &str) -> Result<()> {
    let form = open_form(config, wizard, Some(key), DiscardSave)?;
    form.clear_snapshot();
    println!("Discarded session '{key}'");
    Ok(())
}
