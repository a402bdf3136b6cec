// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lesewerk: local image-to-text extraction.
//
// Entry point. Initialises logging, parses arguments, then runs one extraction
// or one history command and prints the outcome (or a human-readable error).

mod cli;
mod services;

use std::process::ExitCode;

use clap::Parser;
use lesewerk_core::error::Result;
use lesewerk_core::human_errors::humanize_error;
use lesewerk_history::HistoryEntry;
use tracing::{error, info};

use cli::{Action, Cli, ExtractArgs, HistoryArgs};
use services::app_services::AppServices;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only the extracted text.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let action = match Cli::parse().action() {
        Ok(action) => action,
        Err(e) => e.exit(),
    };

    match run(action).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            let human = humanize_error(&err);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(action: Action) -> Result<()> {
    let services = AppServices::init().await?;
    match action {
        Action::Extract(args) => extract(&services, &args).await,
        Action::History(args) => history(&services, &args),
    }
}

async fn extract(services: &AppServices, args: &ExtractArgs) -> Result<()> {
    let result = services.extract(args).await?;

    if let Some(path) = &args.output {
        tokio::fs::write(path, &result.text).await?;
        info!(path = %path.display(), "text saved");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.text);
    }
    Ok(())
}

fn history(services: &AppServices, args: &HistoryArgs) -> Result<()> {
    if args.clear {
        let removed = services.clear_history()?;
        println!("Removed {removed} history entries.");
        return Ok(());
    }

    let entries = services.recent_history(args.limit)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("No extractions recorded yet.");
    } else {
        for entry in &entries {
            println!("{}", summary_line(entry));
        }
    }
    Ok(())
}

/// One line per entry: when, how, how sure, and the start of the text.
fn summary_line(entry: &HistoryEntry) -> String {
    let confidence = match entry.confidence {
        Some(c) => format!("{c:.0}%"),
        None => "n/a".to_string(),
    };
    let preview: String = entry
        .text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(60)
        .collect();
    format!(
        "{:>5}  {}  {:<8}  {:>4}  {:>6} chars  {}",
        entry.id,
        entry.timestamp,
        entry.method.as_str(),
        confidence,
        entry.characters,
        preview
    )
}
