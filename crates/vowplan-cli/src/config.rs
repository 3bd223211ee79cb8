//! Configuration file management for vowplan.
//!
//! Provides a TOML-based config file at `~/.config/vowplan/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use vowplan_core::budget::FallbackConfig;
use vowplan_core::pipeline::{PipelineSettings, PlacesSettings};
use vowplan_core::vendors::EnrichmentConfig;
use vowplan_core::vendors::places::DEFAULT_BASE_URL;
use vowplan_db::config::DbConfig;

pub const ENV_DATABASE_URL: &str = "VOWPLAN_DATABASE_URL";
pub const ENV_GENERATION_URL: &str = "VOWPLAN_GENERATION_URL";
pub const ENV_TODO_URL: &str = "VOWPLAN_TODO_URL";
pub const ENV_PLACES_API_KEY: &str = "VOWPLAN_PLACES_API_KEY";
pub const ENV_PLACES_BASE_URL: &str = "VOWPLAN_PLACES_BASE_URL";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    pub services: ServicesSection,
    pub places: PlacesSection,
    pub fallback: FallbackConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: DbConfig::DEFAULT_URL.to_string(),
            max_connections: DbConfig::DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesSection {
    /// Plan-generation service endpoint.
    pub generation_url: Option<String>,
    /// Todo-generation service endpoint.
    pub todo_url: Option<String>,
    /// Per-call timeout for every external service.
    pub timeout_secs: u64,
}

impl Default for ServicesSection {
    fn default() -> Self {
        Self {
            generation_url: None,
            todo_url: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacesSection {
    /// Vendor enrichment is skipped without a key.
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub max_results: usize,
    pub detail_concurrency: usize,
    pub max_in_flight: usize,
}

impl Default for PlacesSection {
    fn default() -> Self {
        let defaults = EnrichmentConfig::default();
        Self {
            api_key: None,
            base_url: None,
            max_results: defaults.max_results,
            detail_concurrency: defaults.detail_concurrency,
            max_in_flight: defaults.max_in_flight,
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the vowplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/vowplan` or `~/.config/vowplan`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("vowplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("vowplan")
}

/// Return the path to the vowplan config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns `Ok(None)` if it does not exist.
pub fn load_config() -> Result<Option<ConfigFile>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(Some(config))
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    // The file may hold the places API key.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct VowplanConfig {
    pub db_config: DbConfig,
    pub pipeline: PipelineSettings,
}

impl VowplanConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `VOWPLAN_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Service URLs: `VOWPLAN_GENERATION_URL` / `VOWPLAN_TODO_URL` > `[services]` > unset
    /// - Places: `VOWPLAN_PLACES_API_KEY` / `VOWPLAN_PLACES_BASE_URL` > `[places]` > disabled
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file = load_config()?.unwrap_or_default();

        let db_url = cli_db_url
            .map(str::to_string)
            .or_else(|| env_value(ENV_DATABASE_URL))
            .unwrap_or(file.database.url);
        let db_config = DbConfig::new(db_url).with_max_connections(file.database.max_connections);

        let generation_url = env_value(ENV_GENERATION_URL).or(file.services.generation_url);
        let todo_url = env_value(ENV_TODO_URL).or(file.services.todo_url);

        let api_key = env_value(ENV_PLACES_API_KEY).or(file.places.api_key);
        let base_url = env_value(ENV_PLACES_BASE_URL)
            .or(file.places.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let places = api_key.map(|api_key| PlacesSettings { api_key, base_url });

        file.fallback
            .validate()
            .context("invalid [fallback] section in config file")?;

        let pipeline = PipelineSettings {
            generation_url,
            todo_url,
            timeout: Duration::from_secs(file.services.timeout_secs.max(1)),
            places,
            enrichment: EnrichmentConfig {
                max_results: file.places.max_results,
                detail_concurrency: file.places.detail_concurrency,
                max_in_flight: file.places.max_in_flight,
                ..EnrichmentConfig::default()
            },
            fallback: file.fallback,
        };

        Ok(Self {
            db_config,
            pipeline,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ENV: [&str; 5] = [
        ENV_DATABASE_URL,
        ENV_GENERATION_URL,
        ENV_TODO_URL,
        ENV_PLACES_API_KEY,
        ENV_PLACES_BASE_URL,
    ];

    /// Point the config dir at a fresh temp dir and clear vowplan env vars.
    /// Runs `f`, then restores `XDG_CONFIG_HOME`.
    fn with_clean_env<T>(f: impl FnOnce(&std::path::Path) -> T) -> T {
        let _lock = crate::test_util::lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let orig_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };
        for name in ALL_ENV {
            unsafe { std::env::remove_var(name) };
        }

        let result = f(tmp.path());

        for name in ALL_ENV {
            unsafe { std::env::remove_var(name) };
        }
        match orig_xdg {
            Some(x) => unsafe { std::env::set_var("XDG_CONFIG_HOME", x) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }
        result
    }

    fn write_config(dir: &std::path::Path, contents: &str) {
        let dir = dir.join("vowplan");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), contents).unwrap();
    }

    #[test]
    fn defaults_when_nothing_configured() {
        let config = with_clean_env(|_| VowplanConfig::resolve(None).unwrap());
        assert_eq!(config.db_config.database_url, DbConfig::DEFAULT_URL);
        assert_eq!(config.db_config.max_connections, DbConfig::DEFAULT_MAX_CONNECTIONS);
        assert!(config.pipeline.generation_url.is_none());
        assert!(config.pipeline.todo_url.is_none());
        assert!(config.pipeline.places.is_none());
        assert_eq!(config.pipeline.timeout, Duration::from_secs(30));
        assert_eq!(config.pipeline.fallback, FallbackConfig::default());
    }

    #[test]
    fn config_file_values_are_used() {
        let config = with_clean_env(|dir| {
            write_config(
                dir,
                r#"
[database]
url = "postgresql://filehost:5432/filedb"
max_connections = 4

[services]
generation_url = "http://gen.internal/plan"
timeout_secs = 7

[places]
api_key = "file-key"
detail_concurrency = 2

[fallback]
budget_ceiling = 40000.0
default_venue_name = "Somewhere Lovely"

[[fallback.budget_split]]
name = "Venue"
percentage = 60.0

[[fallback.budget_split]]
name = "Everything else"
percentage = 40.0
"#,
            );
            VowplanConfig::resolve(None).unwrap()
        });

        assert_eq!(config.db_config.database_url, "postgresql://filehost:5432/filedb");
        assert_eq!(config.db_config.max_connections, 4);
        assert_eq!(config.pipeline.generation_url.as_deref(), Some("http://gen.internal/plan"));
        assert_eq!(config.pipeline.timeout, Duration::from_secs(7));
        let places = config.pipeline.places.unwrap();
        assert_eq!(places.api_key, "file-key");
        assert_eq!(places.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.pipeline.enrichment.detail_concurrency, 2);
        assert_eq!(config.pipeline.enrichment.max_results, 5);
        assert_eq!(config.pipeline.fallback.budget_ceiling, 40_000.0);
        assert_eq!(config.pipeline.fallback.budget_split.len(), 2);
    }

    #[test]
    fn env_overrides_file_and_cli_overrides_env() {
        let config = with_clean_env(|dir| {
            write_config(
                dir,
                "[database]\nurl = \"postgresql://filehost:5432/filedb\"\n\n[services]\ntodo_url = \"http://file/todos\"\n",
            );
            unsafe { std::env::set_var(ENV_DATABASE_URL, "postgresql://env:5432/envdb") };
            unsafe { std::env::set_var(ENV_TODO_URL, "http://env/todos") };
            unsafe { std::env::set_var(ENV_PLACES_API_KEY, "env-key") };
            unsafe { std::env::set_var(ENV_PLACES_BASE_URL, "http://places.local") };

            let from_env = VowplanConfig::resolve(None).unwrap();
            let from_cli = VowplanConfig::resolve(Some("postgresql://cli:5432/clidb")).unwrap();
            (from_env, from_cli)
        });

        let (from_env, from_cli) = config;
        assert_eq!(from_env.db_config.database_url, "postgresql://env:5432/envdb");
        assert_eq!(from_env.pipeline.todo_url.as_deref(), Some("http://env/todos"));
        let places = from_env.pipeline.places.unwrap();
        assert_eq!(places.api_key, "env-key");
        assert_eq!(places.base_url, "http://places.local");
        assert_eq!(from_cli.db_config.database_url, "postgresql://cli:5432/clidb");
    }

    #[test]
    fn invalid_fallback_split_is_rejected() {
        let result = with_clean_env(|dir| {
            write_config(
                dir,
                "[[fallback.budget_split]]\nname = \"Venue\"\npercentage = 80.0\n\n[[fallback.budget_split]]\nname = \"Catering\"\npercentage = 30.0\n",
            );
            VowplanConfig::resolve(None)
        });
        let msg = format!("{:#}", result.unwrap_err());
        assert!(msg.contains("fallback"), "unexpected error: {msg}");
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let result = with_clean_env(|dir| {
            write_config(dir, "this is = = not toml");
            VowplanConfig::resolve(None)
        });
        assert!(result.is_err());
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let loaded = with_clean_env(|_| {
            let mut original = ConfigFile::default();
            original.database.url = "postgresql://testhost:5432/testdb".to_string();
            original.places.api_key = Some("secret".to_string());
            save_config(&original).unwrap();
            load_config().unwrap().unwrap()
        });
        assert_eq!(loaded.database.url, "postgresql://testhost:5432/testdb");
        assert_eq!(loaded.places.api_key.as_deref(), Some("secret"));
        assert_eq!(loaded.fallback, FallbackConfig::default());
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let mode = with_clean_env(|_| {
            save_config(&ConfigFile::default()).unwrap();
            std::fs::metadata(config_path()).unwrap().permissions().mode()
        });
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("vowplan/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
