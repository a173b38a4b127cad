//! Configuration management.
//!
//! Configuration is read from a TOML file and then overridden by
//! environment variables:
//!
//! ```toml
//! data_dir = "/var/lib/promptgraph"
//!
//! [ranking]
//! rating_weight = 0.7
//! iterations_weight = 0.3
//! max_suggestions = 10
//!
//! [logging]
//! format = "json"
//! level = "debug"
//!
//! [metrics]
//! enabled = true
//! port = 9090
//! ```

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name of the default `SQLite` database inside the data directory.
pub const DEFAULT_DATABASE_FILE: &str = "promptgraph.db";

/// Main configuration for promptgraph.
#[derive(Debug, Clone)]
pub struct PromptGraphConfig {
    /// Directory holding the database and other state.
    pub data_dir: PathBuf,
    /// Explicit database path; defaults to `data_dir/promptgraph.db`.
    pub database_path: Option<PathBuf>,
    /// Suggestion scoring.
    pub ranking: RankingConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Metrics settings.
    pub metrics: MetricsSettings,
    /// Config files that were loaded, in load order.
    pub config_sources: Vec<PathBuf>,
}

/// Suggestion scoring weights and limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingConfig {
    /// Weight of a related keyword's average rating.
    pub rating_weight: f64,
    /// Weight of `log10` of a related keyword's iterations.
    pub iterations_weight: f64,
    /// Maximum number of ranked suggestions returned.
    pub max_suggestions: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            rating_weight: 0.7,
            iterations_weight: 0.3,
            max_suggestions: 10,
        }
    }
}

impl RankingConfig {
    /// Checks that weights are finite and non-negative and that at least
    /// one suggestion may be returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("rating_weight", self.rating_weight),
            ("iterations_weight", self.iterations_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::InvalidInput(format!(
                    "ranking.{name} must be a finite, non-negative number (got {weight})"
                )));
            }
        }
        if self.max_suggestions == 0 {
            return Err(Error::InvalidInput(
                "ranking.max_suggestions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging section of the config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Output format: `pretty` or `json`.
    pub format: Option<String>,
    /// Filter directive, e.g. `info` or `promptgraph=debug`.
    pub level: Option<String>,
    /// Optional log file; logs go to stderr otherwise.
    pub file: Option<PathBuf>,
}

/// Metrics section of the config file.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub struct MetricsSettings {
    /// Whether the Prometheus exporter is installed.
    pub enabled: Option<bool>,
    /// Port for the scrape listener.
    pub port: Option<u16>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Database path.
    pub database_path: Option<String>,
    /// Ranking section.
    pub ranking: Option<ConfigFileRanking>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
    /// Metrics section.
    pub metrics: Option<MetricsSettings>,
}

/// Ranking section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileRanking {
    /// Rating weight.
    pub rating_weight: Option<f64>,
    /// Iterations weight.
    pub iterations_weight: Option<f64>,
    /// Maximum suggestions.
    pub max_suggestions: Option<usize>,
}

impl Default for PromptGraphConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_path: None,
            ranking: RankingConfig::default(),
            logging: LoggingSettings::default(),
            metrics: MetricsSettings::default(),
            config_sources: Vec::new(),
        }
    }
}

impl PromptGraphConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration the way the binary does.
    ///
    /// The first existing source wins:
    /// 1. `explicit` (from `--config`)
    /// 2. `PROMPTGRAPH_CONFIG_PATH`
    /// 3. the default locations, see [`Self::load_default`]
    ///
    /// Environment overrides are applied afterwards and the result is
    /// validated.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be read or
    /// parsed, or if the resulting configuration is invalid.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("PROMPTGRAPH_CONFIG_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let mut config = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::load_default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let mut config = Self::from_config_file(file);
        config.config_sources.push(path.to_path_buf());
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/promptgraph/` on macOS)
    /// 2. XDG config dir (`~/.config/promptgraph/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("promptgraph").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("promptgraph")
                .join("config.toml"),
        ];
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                },
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `PromptGraphConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(database_path) = file.database_path {
            config.database_path = Some(PathBuf::from(database_path));
        }
        if let Some(ranking) = file.ranking {
            if let Some(v) = ranking.rating_weight {
                config.ranking.rating_weight = v;
            }
            if let Some(v) = ranking.iterations_weight {
                config.ranking.iterations_weight = v;
            }
            if let Some(v) = ranking.max_suggestions {
                config.ranking.max_suggestions = v;
            }
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }
        if let Some(metrics) = file.metrics {
            config.metrics = metrics;
        }

        config
    }

    /// Applies `PROMPTGRAPH_*` overrides read through `lookup`.
    ///
    /// - `PROMPTGRAPH_DATA_DIR`
    /// - `PROMPTGRAPH_DATABASE`
    /// - `PROMPTGRAPH_LOG_FORMAT`
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(dir) = read("PROMPTGRAPH_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = read("PROMPTGRAPH_DATABASE") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(format) = read("PROMPTGRAPH_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the ranking section is invalid.
    pub fn validate(&self) -> Result<()> {
        self.ranking.validate()
    }

    /// Returns the database file to open.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DEFAULT_DATABASE_FILE))
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets the ranking configuration.
    #[must_use]
    pub const fn with_ranking(mut self, ranking: RankingConfig) -> Self {
        self.ranking = ranking;
        self
    }
}

/// Platform data directory, or `.promptgraph` when none is available.
fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "promptgraph")
        .map_or_else(|| PathBuf::from(".promptgraph"), |dirs| dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    #[test]
    fn test_defaults_match_documented_weights() {
        let config = PromptGraphConfig::default();
        assert!((config.ranking.rating_weight - 0.7).abs() < f64::EPSILON);
        assert!((config.ranking.iterations_weight - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.ranking.max_suggestions, 10);
        assert!(config.validate().is_ok());
        assert!(config.database_path().ends_with(DEFAULT_DATABASE_FILE));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
                data_dir = "/tmp/pg"

                [ranking]
                rating_weight = 1.0
                max_suggestions = 5

                [logging]
                format = "json"

                [metrics]
                enabled = true
                port = 9191
            "#,
        )
        .unwrap();

        let config = PromptGraphConfig::load_from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/pg"));
        assert!((config.ranking.rating_weight - 1.0).abs() < f64::EPSILON);
        assert!((config.ranking.iterations_weight - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.ranking.max_suggestions, 5);
        assert_eq!(config.logging.format.as_deref(), Some("json"));
        assert_eq!(config.metrics.port, Some(9191));
        assert_eq!(config.config_sources, vec![path]);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/pg/promptgraph.db"));
    }

    #[test]
    fn test_load_from_file_rejects_bad_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "data_dir = [").unwrap();
        let err = PromptGraphConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, Error::OperationFailed { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PROMPTGRAPH_DATA_DIR", "/data"),
            ("PROMPTGRAPH_DATABASE", " /db/graph.sqlite "),
            ("PROMPTGRAPH_LOG_FORMAT", ""),
        ]
        .into();
        let mut config = PromptGraphConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert_eq!(config.database_path(), PathBuf::from("/db/graph.sqlite"));
        assert_eq!(config.logging.format, None);
    }

    #[test_case(-0.1, 0.3, 10; "negative rating weight")]
    #[test_case(0.7, f64::NAN, 10; "nan iterations weight")]
    #[test_case(f64::INFINITY, 0.3, 10; "infinite rating weight")]
    #[test_case(0.7, 0.3, 0; "zero suggestions")]
    fn test_invalid_ranking(rating_weight: f64, iterations_weight: f64, max_suggestions: usize) {
        let ranking = RankingConfig {
            rating_weight,
            iterations_weight,
            max_suggestions,
        };
        assert!(matches!(ranking.validate(), Err(Error::InvalidInput(_))));
    }
}
