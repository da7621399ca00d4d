//! CLI argument parsing

use crate::types::StemCount;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// stemsplit - fetch a track and split it into stems
///
/// Acquires an audio file from local disk or through a web conversion
/// service, then separates it into vocals, drums, bass and more.
#[derive(Parser, Debug)]
#[command(name = "stemsplit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Base directory holding input/, output/ and the log files
    #[arg(long, value_name = "DIR", global = true)]
    pub base_dir: Option<PathBuf>,

    /// WebDriver endpoint (a running chromedriver)
    #[arg(long, value_name = "URL", global = true)]
    pub webdriver_url: Option<String>,

    /// Page of the conversion service to drive
    #[arg(long, value_name = "URL", global = true)]
    pub converter_url: Option<String>,

    /// Separation tool executable
    #[arg(long, value_name = "PROGRAM", global = true)]
    pub engine_command: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress the status spinner)
    #[arg(short, long, default_value = "false", global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download an MP3 for a YouTube link through the conversion service
    Fetch {
        /// YouTube link (watch?v=... or youtu.be/...)
        url: String,
    },
    /// Copy a local audio file into the working input directory
    Local {
        /// Audio file (mp3, wav, flac, ogg, m4a)
        path: PathBuf,
    },
    /// Separate an audio file into stems
    Separate {
        /// Audio file to separate
        file: PathBuf,

        /// Number of stems: 2, 4 or 5
        #[arg(short, long, default_value = "2", value_parser = parse_stems)]
        stems: StemCount,
    },
    /// Acquire a link or local file, then separate it
    Split {
        /// YouTube link or local audio file
        source: String,

        /// Number of stems: 2, 4 or 5
        #[arg(short, long, default_value = "2", value_parser = parse_stems)]
        stems: StemCount,
    },
}

impl Command {
    /// Whether this command ends in a separation (and so needs the engine)
    pub fn needs_engine(&self) -> bool {
        matches!(self, Command::Separate { .. } | Command::Split { .. })
    }
}

fn parse_stems(value: &str) -> Result<StemCount, String> {
    value
        .trim()
        .parse::<u8>()
        .ok()
        .and_then(StemCount::from_count)
        .ok_or_else(|| format!("'{}' is not a valid stem count (choose 2, 4 or 5)", value))
}

impl Cli {
    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
