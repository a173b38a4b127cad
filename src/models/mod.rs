//! Data models for promptgraph.
//!
//! This module contains the core data structures used throughout the system.

mod catalog;
mod ids;
mod keyword;
mod project;
mod suggestion;

pub use catalog::{Genre, User};
pub use ids::{GenreId, KeywordId, ProjectId, UserId};
pub use keyword::{Keyword, KeywordStats, Scope, name_key};
pub use project::{Project, SubmissionRequest};
pub use suggestion::{Suggestion, SuggestionRequest, SuggestionResponse};
