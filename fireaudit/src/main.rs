mod cli;
mod observability;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info};

use fireaudit_core::audit::{Analyzer, AuditMode, AuditOutcome, AuditRequest, LlmAnalyzer};
use fireaudit_core::config::LlmConfig;
use fireaudit_core::{report, rules};

use cli::Cli;

fn main() {
    let cli = Cli::parse();
    observability::init_tracing(&cli);

    info!("Starting Firestore security rules audit...");

    let Some(project) = cli.project.clone() else {
        error!("Project ID is required. Use --project or -p option.");
        std::process::exit(1);
    };

    if cli.verbose {
        debug!("Verbose mode enabled");
        debug!(options = ?cli, "CLI options");
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create async runtime: {}", e);
            std::process::exit(1);
        }
    };

    match rt.block_on(run(&cli, &project)) {
        Ok(()) => {
            info!("Audit completed successfully!");
        }
        Err(e) => {
            if cli.verbose {
                error!("{:#}", e);
            } else {
                error!("{}", e);
            }
            std::process::exit(1);
        }
    }
}

/// Linear pipeline: resolve rules, audit, render, optionally persist.
async fn run(cli: &Cli, project: &str) -> Result<()> {
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;

    let document = match cli.rules_file.as_deref() {
        Some(path) => rules::load_rules_file(path)?,
        None => {
            info!("No rules file provided, will attempt to fetch rules from project");
            rules::fetch_rules_from_project(project, &http).await?
        }
    };
    debug!(bytes = document.byte_len(), origin = ?document.origin, "Rules resolved");

    let llm = LlmConfig::from_env();
    if llm.api_key.is_empty() {
        anyhow::bail!("API key required. Set FIREAUDIT_API_KEY or OPENAI_API_KEY.");
    }
    let analyzer = LlmAnalyzer::new(&llm)?;

    let request = AuditRequest::new(document.text, Some(project.to_string()));
    let mode = if cli.text {
        AuditMode::Text
    } else {
        AuditMode::Structured
    };

    match analyzer.analyze(&request, mode).await? {
        AuditOutcome::Structured(result) => {
            report::print_report(&result);
            if let Some(ref path) = cli.output {
                report::write_report(&result, path)?;
            }
        }
        AuditOutcome::Text(text) => {
            println!("{}", text);
            if let Some(ref path) = cli.output {
                report::write_text(&text, path)?;
            }
        }
    }

    Ok(())
}
