use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

/// Log level options for the CLI's own tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser)]
#[command(name = "arc")]
#[command(about = "Arcanum - a personal learning assistant over a local markdown vault")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the vault directory (defaults to config file value, then `./vault`)
    #[arg(short = 'V', long, global = true)]
    pub vault: Option<PathBuf>,

    /// Path to a TOML config file overlaying the built-in defaults
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Set log level
    #[arg(short = 'l', long, global = true, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a new learning session and run the five-stage pipeline to completion,
    /// printing progress events as they arrive.
    Learn {
        /// Free-text query describing what to learn, e.g. "Learn about Markov chains"
        query: String,
    },

    /// Print the current state of a session (stage statuses, results so far).
    Status {
        session_id: Uuid,
    },

    /// Advance a single named stage of a session explicitly (mainly useful
    /// to supply answers to the Justice stage's comprehension questions).
    Advance {
        session_id: Uuid,
        stage: String,
        /// Free-text query/answers for that stage; Justice treats each line as one answer.
        #[arg(default_value = "")]
        query: String,
    },

    /// Cancel a running session.
    Cancel {
        session_id: Uuid,
    },

    /// List every note slug currently in the vault.
    List,
}
