//! Submit command.

use promptgraph::SubmissionRequest;
use promptgraph::services::ServiceContainer;

/// Arguments of the submit command.
pub struct SubmitArgs {
    /// Username.
    pub user: String,
    /// Genre name.
    pub genre: String,
    /// Rating.
    pub rating: f64,
    /// Optional title.
    pub title: Option<String>,
    /// Whether the project is private.
    pub private: bool,
    /// Prompt text.
    pub prompt: String,
}

/// Submit command.
pub fn cmd_submit(
    services: &ServiceContainer,
    args: &SubmitArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = services.catalog();
    let user = catalog.find_user(&args.user)?;
    let genre = catalog.find_genre(&args.genre)?;

    let mut request = SubmissionRequest::new(genre.id, args.prompt.as_str(), args.rating, user.id)
        .with_public(!args.private);
    if let Some(title) = &args.title {
        request = request.with_title(title.as_str());
    }

    let project = services.submissions().submit(request)?;

    println!("Project saved:");
    println!("  ID: {}", project.id);
    if let Some(title) = &project.title {
        println!("  Title: {title}");
    }
    println!("  Prompt: {}", project.prompt);
    println!("  Rating: {}", project.rating);
    println!("  Keywords linked: {}", project.keywords.len());
    Ok(())
}
