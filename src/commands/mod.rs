//! Command handlers module.
//!
//! This module organizes the CLI command implementations into separate files:
//! - `catalog.rs`: User and genre management
//! - `submit.rs`: Prompt submission
//! - `suggest.rs`: Suggestions and keyword listings
//! - `projects.rs`: Project inspection and deletion
//! - `status.rs`: Configuration and database status

mod catalog;
mod projects;
mod status;
mod submit;
mod suggest;

use clap::Subcommand;

// Re-export command functions
pub use catalog::{cmd_genre, cmd_user};
pub use projects::cmd_project;
pub use status::cmd_status;
pub use submit::{SubmitArgs, cmd_submit};
pub use suggest::{cmd_keywords, cmd_suggest};

/// User subcommands.
#[derive(Subcommand)]
pub enum UserAction {
    /// Register a user.
    Add {
        /// Username.
        name: String,
    },

    /// Delete a user with all of their projects and keywords.
    Remove {
        /// Username.
        name: String,
    },
}

/// Genre subcommands.
#[derive(Subcommand)]
pub enum GenreAction {
    /// Register a genre.
    Add {
        /// Genre name.
        name: String,

        /// Owning user's name.
        #[arg(long)]
        owner: Option<String>,
    },

    /// List genres.
    List,

    /// Remove a user's projects and keywords from a genre.
    Remove {
        /// Genre name.
        name: String,

        /// User whose data is removed.
        #[arg(short, long)]
        user: String,
    },

    /// Delete a genre with every user's projects and keywords in it.
    Delete {
        /// Genre name.
        name: String,
    },
}

/// Project subcommands.
#[derive(Subcommand)]
pub enum ProjectAction {
    /// Show a project.
    Show {
        /// Project id.
        id: String,
    },

    /// List a user's projects.
    List {
        /// Owner's name.
        #[arg(short, long)]
        user: String,

        /// Only projects in this genre.
        #[arg(short, long)]
        genre: Option<String>,
    },

    /// Delete a project and retract its keywords.
    Delete {
        /// Project id.
        id: String,

        /// Owner's name.
        #[arg(short, long)]
        user: String,
    },
}

/// Formats a Unix timestamp as a full datetime string.
pub fn format_timestamp(ts: u64) -> String {
    chrono::DateTime::from_timestamp(i64::try_from(ts).unwrap_or(0), 0).map_or_else(
        || "unknown".to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}
