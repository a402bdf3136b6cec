// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments.
//
// `lesewerk <image>` extracts text; `lesewerk history` shows or clears what
// earlier extractions recorded. An image literally named `history` needs a
// path prefix (`./history`).

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};

/// Extract text from an image. A fast OCR engine runs first; when its result
/// is missing or low-confidence a neural engine is tried once.
#[derive(Debug, Parser)]
#[command(name = "lesewerk", version)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Image file to read (PNG, JPEG, WebP, BMP or TIFF)
    #[arg(required = true, value_name = "IMAGE")]
    image: Option<PathBuf>,

    /// Preprocessing preset: none, document, photo, low-light
    #[arg(long, value_name = "NAME")]
    profile: Option<String>,

    /// Also save the extracted text to FILE
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print the full result as JSON instead of plain text
    #[arg(long)]
    json: bool,

    /// Do not record this extraction in the local history
    #[arg(long)]
    no_history: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show or clear the local extraction history
    History(HistoryArgs),
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct HistoryArgs {
    /// Number of most recent entries to show
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..))]
    pub limit: u32,

    /// Delete every stored entry
    #[arg(long, conflicts_with = "limit")]
    pub clear: bool,

    /// Print entries as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractArgs {
    pub image: PathBuf,
    pub profile: Option<String>,
    pub output: Option<PathBuf>,
    pub json: bool,
    pub no_history: bool,
}

/// What one invocation asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Extract(ExtractArgs),
    History(HistoryArgs),
}

impl Cli {
    pub fn action(self) -> Result<Action, clap::Error> {
        match (self.command, self.image) {
            (Some(Command::History(args)), _) => Ok(Action::History(args)),
            (None, Some(image)) => Ok(Action::Extract(ExtractArgs {
                image,
                profile: self.profile,
                output: self.output,
                json: self.json,
                no_history: self.no_history,
            })),
            (None, None) => Err(Cli::command().error(
                ErrorKind::MissingRequiredArgument,
                "an image path or a subcommand is required",
            )),
        }
    }
}
