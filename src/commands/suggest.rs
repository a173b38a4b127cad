//! Suggestion and keyword listing commands.

use promptgraph::services::ServiceContainer;
use promptgraph::{Scope, SuggestionRequest};

/// Suggest command.
///
/// Prints the response as JSON (`totalScore`, `suggestionsList`).
pub fn cmd_suggest(
    services: &ServiceContainer,
    user: &str,
    genre: &str,
    community: bool,
    partial: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = services.catalog();
    let user = catalog.find_user(user)?;
    let genre = catalog.find_genre(genre)?;

    let request = SuggestionRequest::new(genre.id, partial, user.id).with_community(community);
    let response = services.suggestions().suggest(&request)?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Keywords command.
pub fn cmd_keywords(
    services: &ServiceContainer,
    user: &str,
    genre: &str,
    community: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = services.catalog();
    let user = catalog.find_user(user)?;
    let genre = catalog.find_genre(genre)?;

    let scope = Scope::for_request(user.id, community);
    let nodes = services.suggestions().list_keywords(&scope, &genre.id)?;
    if nodes.is_empty() {
        println!("No keywords in '{}' ({})", genre.name, scope.as_str());
        return Ok(());
    }

    println!("{:<28} {:>10} {:>10} {:>8}", "KEYWORD", "ITERATIONS", "AVG", "RELATED");
    for node in nodes {
        println!(
            "{:<28} {:>10} {:>10.2} {:>8}",
            node.name,
            node.iterations,
            node.average_rating,
            node.related_keywords.len()
        );
    }
    Ok(())
}
