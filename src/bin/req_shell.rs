//! Interactive requisition shell
//!
//! Loads a YAML command catalog and shows how each typed line is
//! understood: per-character status markup, hints, assignments, and the
//! output when executed.
//!
//! # Usage
//!
//! ```bash
//! # Interactive shell over config/commands.yaml
//! req_shell
//!
//! # Inspect one line as JSON
//! req_shell --format json check "tslong hello -n 3"
//!
//! # Execute one line
//! REQUISITION_CONFIG_DIR=./config req_shell exec "echo hi"
//! ```
//!
//! In the shell, a line ending in `?` is inspected instead of executed and
//! a line ending in a tab character is completed.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use requisition::{
    CatalogLoader, CommandCatalog, ExecOptions, HandlerRegistry, Output, Reply, Session, Status,
    StatusSpan, Value,
};

#[derive(Parser)]
#[command(name = "req_shell")]
#[command(version = "0.1.0")]
#[command(about = "Type commands against a YAML catalog and watch them being understood")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config directory holding commands.yaml or commands/
    #[arg(long, short = 'c', env = "REQUISITION_CONFIG_DIR")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,

    /// Seconds to wait for deferred commands
    #[arg(long, global = true, default_value_t = 5)]
    timeout: u64,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive shell (default)
    Shell,
    /// Show how a line is understood without running it
    Check { line: String },
    /// Run a line and print its output
    Exec { line: String },
    /// List the commands in the catalog
    Commands,
}

// =============================================================================
// MAIN
// =============================================================================

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let loader = match &cli.config {
        Some(dir) => CatalogLoader::new(dir),
        None => CatalogLoader::from_env(),
    };
    let catalog = loader
        .load_catalog(&builtin_handlers())
        .with_context(|| format!("Failed to load catalog from {}", loader.config_dir().display()))?;
    let catalog = Arc::new(catalog);
    let timeout = Duration::from_secs(cli.timeout);

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => shell(catalog, cli.format, timeout),
        Commands::Check { line } => {
            let mut session = Session::new(catalog);
            session.set_input(&line, None);
            print_check(&session, cli.format)?;
            Ok(status_code(session.status()))
        }
        Commands::Exec { line } => {
            let mut session = Session::new(catalog);
            let output = session.exec_typed(&line, ExecOptions::hidden());
            let failed = print_output(&output, cli.format, timeout)?;
            Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
        Commands::Commands => {
            list_commands(&catalog);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn status_code(status: Status) -> ExitCode {
    if status.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// Handlers YAML catalogs may refer to
fn builtin_handlers() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();

    registry.register("echo", |args, _| Ok(Reply::Value(Value::from(args.clone()))));

    registry.register("text", |args, _| {
        let parts: Vec<String> = args
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(_, v)| v.to_string())
            .collect();
        Ok(Reply::value(parts.join(" ")))
    });

    registry.register("fail", |args, _| {
        let reason = args.get_str("reason").unwrap_or("failed on request");
        anyhow::bail!("{}", reason)
    });

    registry.register("later", |args, ctx| {
        let delay = args.get_number("ms").unwrap_or(500.0).max(0.0) as u64;
        let value = Value::from(args.clone());
        let completer = ctx.defer();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(delay));
            completer.complete(value);
        });
        Ok(Reply::Deferred)
    });

    registry
}

// =============================================================================
// SHELL
// =============================================================================

fn shell(catalog: Arc<CommandCatalog>, format: OutputFormat, timeout: Duration) -> Result<ExitCode> {
    let mut editor = DefaultEditor::new().context("Failed to start line editor")?;
    let mut session = Session::new(catalog);

    println!(
        "{}",
        "Type a command. End with '?' to inspect, tab to complete, Ctrl-D to quit.".dimmed()
    );

    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        let _ = editor.add_history_entry(line.as_str());

        if let Some(line) = line.strip_suffix('?') {
            session.set_input(line, None);
            print_check(&session, format)?;
            continue;
        }

        if let Some(line) = line.strip_suffix('\t') {
            session.set_input(line, None);
            if session.tab() {
                println!("{}", session.input());
            } else {
                println!("{}", "(no completion)".dimmed());
            }
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        session.set_input(&line, None);
        if !session.status().is_valid() {
            print_check(&session, format)?;
            continue;
        }
        let output = session.exec(ExecOptions::visible());
        print_output(&output, format, timeout)?;
    }

    Ok(ExitCode::SUCCESS)
}

// =============================================================================
// PRINTING
// =============================================================================

fn print_check(session: &Session, format: OutputFormat) -> Result<()> {
    let snapshot = session.snapshot();
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("{}{}", colored_markup(&session.markup_spans()), session.hints().dimmed());
    println!("  status: {}", colored_status(snapshot.status));
    if let Some(command) = &snapshot.command {
        println!("  command: {}", command.cyan());
        println!("  canonical: {}", session.requisition().to_canonical());
    }
    for a in snapshot.assignments.iter().chain(&snapshot.unassigned) {
        let value = a.value.as_ref().map(Value::to_string).unwrap_or_default();
        print!("  {} = {:?} [{}]", a.name.bold(), value, colored_status(a.status));
        if !a.message.is_empty() {
            print!(" {}", a.message.red());
        }
        println!();
    }
    if !snapshot.predictions.is_empty() {
        println!("  predictions: {}", snapshot.predictions.join(", ").dimmed());
    }
    Ok(())
}

/// Print an output, waiting for deferred completion. Returns whether it failed.
fn print_output(output: &Output, format: OutputFormat, timeout: Duration) -> Result<bool> {
    if !output.completed() {
        let (tx, rx) = mpsc::channel();
        output.on_complete(move |_| {
            let _ = tx.send(());
        });
        if rx.recv_timeout(timeout).is_err() {
            println!("{}", "(still running)".yellow());
            return Ok(false);
        }
    }

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&output.record())?);
        return Ok(output.error().is_some());
    }

    match output.error() {
        Some(err) => {
            println!("{} {}", "✗".red(), err.to_string().red());
            Ok(true)
        }
        None => {
            let text = output.render().to_plain();
            if !text.is_empty() {
                println!("{}", text);
            }
            Ok(false)
        }
    }
}

fn colored_markup(spans: &[StatusSpan]) -> String {
    spans
        .iter()
        .map(|span| match span.status {
            Status::Valid => span.text.normal().to_string(),
            Status::Incomplete => span.text.yellow().to_string(),
            Status::Error => span.text.red().underline().to_string(),
        })
        .collect()
}

fn colored_status(status: Status) -> String {
    match status {
        Status::Valid => status.to_string().green().to_string(),
        Status::Incomplete => status.to_string().yellow().to_string(),
        Status::Error => status.to_string().red().to_string(),
    }
}

fn list_commands(catalog: &CommandCatalog) {
    for command in catalog.commands().filter(|c| !c.hidden) {
        let params: Vec<String> = command
            .params
            .iter()
            .map(|p| {
                if p.required {
                    format!("<{}>", p.name)
                } else {
                    format!("[{}]", p.name)
                }
            })
            .collect();
        println!(
            "{} {} {}",
            command.name.bold(),
            params.join(" ").dimmed(),
            command.description
        );
    }
}
