//! Project commands.

use super::{ProjectAction, format_timestamp};
use promptgraph::services::ServiceContainer;
use promptgraph::{Project, ProjectId};

/// Project command.
pub fn cmd_project(
    services: &ServiceContainer,
    action: ProjectAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let submissions = services.submissions();
    match action {
        ProjectAction::Show { id } => {
            let project = submissions.get_project(&ProjectId::new(id))?;
            print_project(&project);
        },
        ProjectAction::List { user, genre } => {
            let catalog = services.catalog();
            let user = catalog.find_user(&user)?;
            let genre = genre.map(|g| catalog.find_genre(&g)).transpose()?;
            let projects = submissions.list_projects(&user.id, genre.as_ref().map(|g| &g.id))?;
            if projects.is_empty() {
                println!("No projects found");
                return Ok(());
            }
            for project in &projects {
                println!(
                    "{}  {}  {:>5}  {}",
                    project.id,
                    format_timestamp(project.created_at),
                    project.rating,
                    project.title.as_deref().unwrap_or(&project.prompt)
                );
            }
        },
        ProjectAction::Delete { id, user } => {
            let user = services.catalog().find_user(&user)?;
            let project = submissions.delete_project(&user.id, &ProjectId::new(id))?;
            println!("Project {} deleted", project.id);
        },
    }
    Ok(())
}

fn print_project(project: &Project) {
    println!("Project: {}", project.id);
    if let Some(title) = &project.title {
        println!("  Title: {title}");
    }
    println!("  Owner: {}", project.owner);
    println!("  Genre: {}", project.genre);
    println!("  Prompt: {}", project.prompt);
    println!("  Rating: {}", project.rating);
    println!(
        "  Visibility: {}",
        if project.is_public { "public" } else { "private" }
    );
    println!("  Keywords linked: {}", project.keywords.len());
    println!("  Created: {}", format_timestamp(project.created_at));
}
