//! Binary entry point for promptgraph.
//!
//! This binary provides the CLI interface for the promptgraph keyword graph.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use commands::{GenreAction, ProjectAction, UserAction};
use promptgraph::config::PromptGraphConfig;
use promptgraph::observability::{self, InitOptions};
use promptgraph::services::ServiceContainer;
use std::path::PathBuf;
use std::process::ExitCode;

/// Promptgraph - keyword co-occurrence graph and next-keyword suggestions for music prompts.
#[derive(Parser)]
#[command(name = "promptgraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Manage users.
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage genres.
    Genre {
        #[command(subcommand)]
        action: GenreAction,
    },

    /// Submit a rated prompt.
    Submit {
        /// Submitting user's name.
        #[arg(short, long)]
        user: String,

        /// Genre name.
        #[arg(short, long)]
        genre: String,

        /// Rating of the generated track.
        #[arg(short, long)]
        rating: f64,

        /// Optional project title.
        #[arg(short, long)]
        title: Option<String>,

        /// Keep the project private.
        #[arg(long)]
        private: bool,

        /// Comma-separated prompt.
        prompt: String,
    },

    /// Suggest next keywords for a partial prompt.
    Suggest {
        /// Requesting user's name.
        #[arg(short, long)]
        user: String,

        /// Genre name.
        #[arg(short, long)]
        genre: String,

        /// Include every user's keywords.
        #[arg(long)]
        community: bool,

        /// What has been typed so far.
        #[arg(default_value = "")]
        partial: String,
    },

    /// Inspect or delete projects.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// List keyword nodes in a genre.
    Keywords {
        /// User whose keywords to list.
        #[arg(short, long)]
        user: String,

        /// Genre name.
        #[arg(short, long)]
        genre: String,

        /// List every user's keywords.
        #[arg(long)]
        community: bool,
    },

    /// Show status.
    Status,
}

/// Main entry point.
fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match PromptGraphConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let _observability = match observability::init_from_config(
        &config,
        InitOptions {
            verbose: cli.verbose,
        },
    ) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: &PromptGraphConfig) -> Result<(), Box<dyn std::error::Error>> {
    if matches!(cli.command, Commands::Status) {
        return commands::cmd_status(config);
    }

    let services = ServiceContainer::from_config(config)?;

    match cli.command {
        Commands::User { action } => commands::cmd_user(&services, action),

        Commands::Genre { action } => commands::cmd_genre(&services, action),

        Commands::Submit {
            user,
            genre,
            rating,
            title,
            private,
            prompt,
        } => commands::cmd_submit(
            &services,
            &commands::SubmitArgs {
                user,
                genre,
                rating,
                title,
                private,
                prompt,
            },
        ),

        Commands::Suggest {
            user,
            genre,
            community,
            partial,
        } => commands::cmd_suggest(&services, &user, &genre, community, &partial),

        Commands::Project { action } => commands::cmd_project(&services, action),

        Commands::Keywords {
            user,
            genre,
            community,
        } => commands::cmd_keywords(&services, &user, &genre, community),

        Commands::Status => commands::cmd_status(config),
    }
}
