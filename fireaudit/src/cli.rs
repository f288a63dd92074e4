use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// fireaudit - Audit Firestore security rules with an LLM
#[derive(Parser, Debug)]
#[command(name = "fireaudit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Firestore project ID
    #[arg(short, long, value_name = "PROJECT", env = "FIREAUDIT_PROJECT")]
    pub project: Option<String>,

    /// Path to a local Firestore security rules file (skips remote fetch)
    #[arg(short, long, value_name = "RULES_FILE")]
    pub rules_file: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Set the logging level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Enable file logging and specify the log file path
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Write the audit report to a file (plain text, no styling)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Return a free-text analysis instead of the structured report
    #[arg(long, default_value = "false")]
    pub text: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    /// Accepted for compatibility; treated as `error`.
    Fatal,
}

impl LogLevel {
    /// Tracing filter directive for this level.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error | LogLevel::Fatal => "error",
        }
    }
}
