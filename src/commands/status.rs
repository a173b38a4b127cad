//! Status command.

use promptgraph::config::PromptGraphConfig;
use promptgraph::services::ServiceContainer;

/// Status command.
pub fn cmd_status(config: &PromptGraphConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Promptgraph Status");
    println!("==================");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    if config.config_sources.is_empty() {
        println!("Config: defaults (no config file found)");
    } else {
        for source in &config.config_sources {
            println!("Config: {}", source.display());
        }
    }

    let data_status = if config.data_dir.exists() {
        "Configured"
    } else {
        "Will be created on first use"
    };
    println!("Data Directory: {data_status}");
    println!("  Path: {}", config.data_dir.display());

    let database = config.database_path();
    if database.exists() {
        println!("Database: Available");
        println!("  Path: {}", database.display());
        let services = ServiceContainer::from_config(config)?;
        println!("  Genres: {}", services.catalog().list_genres()?.len());
    } else {
        println!("Database: Not initialized");
        println!("  Path: {}", database.display());
    }

    println!();
    println!("Ranking:");
    println!("  Rating weight: {}", config.ranking.rating_weight);
    println!("  Iterations weight: {}", config.ranking.iterations_weight);
    println!("  Max suggestions: {}", config.ranking.max_suggestions);

    Ok(())
}
