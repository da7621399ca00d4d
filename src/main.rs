//! stemsplit CLI entry point

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use stemsplit::acquire::WebDriverBackend;
use stemsplit::config::{Cli, Command, Settings};
use stemsplit::logging;
use stemsplit::separation::{SpleeterCliEngine, StemEngine};
use stemsplit::status::StatusSink;
use stemsplit::types::{AcquiredFile, AcquisitionRequest, SeparationReport};
use stemsplit::workspace::{Workspace, WorkspaceLayout};
use stemsplit::{Result, SplitError};
use tracing::{error, info};

/// What a finished command produced
enum Outcome {
    Acquired(AcquiredFile),
    Separated {
        acquired: Option<AcquiredFile>,
        report: SeparationReport,
    },
}

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Build settings from CLI
    let settings = Settings::from_cli(&cli);
    let layout = WorkspaceLayout::new(&settings.base_dir);

    // Initialize logging; the guard flushes the log file on exit
    let _log_guard = logging::init(&cli, &layout);
    info!("=== Application started ===");

    let code = run(cli, settings);

    info!("=== Application exited ===");
    code
}

fn run(cli: Cli, settings: Settings) -> ExitCode {
    if let Err(e) = settings.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let engine = SpleeterCliEngine::new(&settings.engine_command);
    if cli.command.needs_engine() && !engine.is_available() {
        let err = SplitError::EngineUnavailable {
            reason: format!("'{}' could not be started", engine.program().display()),
        };
        error!("Fatal startup error: {}", err.summary());
        eprintln!("Error: {}", err);
        return ExitCode::FAILURE;
    }

    let backend = WebDriverBackend::new(settings.webdriver_url.clone());
    let show_progress = settings.show_progress;

    let workspace = match Workspace::new(settings, Arc::new(backend), Arc::new(engine)) {
        Ok(ws) => Arc::new(ws),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // The worker owns the status sender; the channel closes when it finishes
    let command = cli.command;
    let (handle, rx) = workspace.spawn(move |ws, status| execute(ws, command, status));

    if show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        for line in rx {
            pb.println(&line);
            pb.set_message(line);
        }
        pb.finish_and_clear();
    } else {
        for line in rx {
            println!("{}", line);
        }
    }

    match handle.join() {
        Ok(Ok(outcome)) => {
            print_summary(&outcome);
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            if e.is_validation() {
                info!("Stopped on invalid input: {}", e.summary());
            } else {
                error!("Command failed: {}", e.summary());
            }
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
        Err(panic_info) => {
            // Extract panic message if possible
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            error!("Worker thread panicked: {}", panic_msg);
            eprintln!("Fatal error: worker thread panicked: {}", panic_msg);
            ExitCode::FAILURE
        }
    }
}

fn execute(ws: &Workspace, command: Command, status: &dyn StatusSink) -> Result<Outcome> {
    match command {
        Command::Fetch { url } => ws
            .acquire(&AcquisitionRequest::Remote(url), status)
            .map(Outcome::Acquired),
        Command::Local { path } => ws
            .acquire(&AcquisitionRequest::Local(path), status)
            .map(Outcome::Acquired),
        Command::Separate { file, stems } => {
            let report = ws.separate_file(&file, stems, status)?;
            Ok(Outcome::Separated {
                acquired: None,
                report,
            })
        }
        Command::Split { source, stems } => {
            let acquired = ws.acquire(&AcquisitionRequest::parse(&source), status)?;
            let report = ws.separate(stems, status)?;
            Ok(Outcome::Separated {
                acquired: Some(acquired),
                report,
            })
        }
    }
}

fn print_summary(outcome: &Outcome) {
    println!();
    match outcome {
        Outcome::Acquired(file) => {
            println!("Ready: {}", file.path.display());
        }
        Outcome::Separated { acquired, report } => {
            if let Some(file) = acquired {
                println!("Input: {}", file.path.display());
            }
            println!(
                "Summary: {} stems ({}) written to {}",
                report.files.len(),
                report.stems.describe(),
                report.output_dir.display()
            );
            for path in &report.files {
                println!("  {}", path.display());
            }
        }
    }
}
