use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use crate::jobs::CycleOptions;

/// Monthly coffee catchup pairing
#[derive(Debug, Parser)]
#[command(name = "coffee-match", version, about)]
pub struct Cli {
    /// Settings file, instead of config/default.toml and config/local.toml
    #[arg(long, global = true, env = "COFFEE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pair this month's members, record the meetings and post the announcement
    Run(RunArgs),

    /// Post the success message for a completed meeting
    Announce {
        /// Meeting to celebrate
        meeting_id: Uuid,

        /// Read members and meetings from a TOML fixture instead of PostgreSQL
        #[arg(long)]
        fixture: Option<PathBuf>,
    },
}

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// Print the announcement without writing meetings or posting it
    #[arg(long)]
    pub dry_run: bool,

    /// Record the meetings but do not post to the webhook
    #[arg(long)]
    pub no_notify: bool,

    /// Seed the odd member pick for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Read members and meetings from a TOML fixture instead of PostgreSQL
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// Print the matches as JSON instead of the announcement
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn cycle_options(&self) -> CycleOptions {
        CycleOptions {
            dry_run: self.dry_run,
            notify: !self.no_notify,
            seed: self.seed,
        }
    }
}

impl Cli {
    /// The requested command, a plain `run` when none was given
    pub fn command_or_default(self) -> Command {
        self.command.unwrap_or_else(|| Command::Run(RunArgs::default()))
    }
}
