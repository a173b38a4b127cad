//! User and genre commands.

use super::{GenreAction, UserAction, format_timestamp};
use promptgraph::services::{CascadeSummary, ServiceContainer};

/// User command.
pub fn cmd_user(
    services: &ServiceContainer,
    action: UserAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = services.catalog();
    match action {
        UserAction::Add { name } => {
            let user = catalog.register_user(&name)?;
            println!("User registered:");
            println!("  ID: {}", user.id);
            println!("  Name: {}", user.username);
        },
        UserAction::Remove { name } => {
            let user = catalog.find_user(&name)?;
            let summary = catalog.delete_user(&user.id)?;
            println!("User '{}' deleted", user.username);
            print_cascade(summary);
        },
    }
    Ok(())
}

/// Genre command.
pub fn cmd_genre(
    services: &ServiceContainer,
    action: GenreAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = services.catalog();
    match action {
        GenreAction::Add { name, owner } => {
            let owner = owner
                .map(|o| catalog.find_user(&o))
                .transpose()?
                .map(|u| u.id);
            let genre = catalog.register_genre(&name, owner)?;
            println!("Genre registered:");
            println!("  ID: {}", genre.id);
            println!("  Name: {}", genre.name);
        },
        GenreAction::List => {
            let genres = catalog.list_genres()?;
            if genres.is_empty() {
                println!("No genres registered");
                return Ok(());
            }
            println!("{:<24} {:<38} CREATED", "NAME", "ID");
            for genre in genres {
                println!(
                    "{:<24} {:<38} {}",
                    genre.name,
                    genre.id,
                    format_timestamp(genre.created_at)
                );
            }
        },
        GenreAction::Remove { name, user } => {
            let genre = catalog.find_genre(&name)?;
            let user = catalog.find_user(&user)?;
            let summary = catalog.remove_genre_for_user(&user.id, &genre.id)?;
            println!("Removed '{}' data from genre '{}'", user.username, genre.name);
            print_cascade(summary);
        },
        GenreAction::Delete { name } => {
            let genre = catalog.find_genre(&name)?;
            let summary = catalog.delete_genre(&genre.id)?;
            println!("Genre '{}' deleted", genre.name);
            print_cascade(summary);
        },
    }
    Ok(())
}

fn print_cascade(summary: CascadeSummary) {
    println!("  Projects deleted: {}", summary.projects);
    println!("  Keywords deleted: {}", summary.keywords);
}
