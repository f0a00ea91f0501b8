use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the shared upstream API key.
const API_KEY_ENV: &str = "COSMOCACHE_API_KEY";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  pub port: u16,
  /// Directory holding the JSON caches and the CSV export
  pub data_dir: PathBuf,
  /// Optional directory for a daily-rolling log file
  pub log_dir: Option<PathBuf>,
  /// Shared secret forwarded as the `API-KEY` header. Prefer the environment variable.
  pub api_key: Option<String>,
  /// Pause after every remote request, in milliseconds
  pub request_delay_ms: u64,
  /// How long a full catalog refresh stays valid
  pub cache_ttl_hours: i64,
  pub stars: StarsConfig,
  pub pokemon: PokemonConfig,
  pub starwars: StarWarsConfig,
  pub oracle: OracleConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StarsConfig {
  pub base_url: String,
  /// The stars resource does not report its page count
  pub total_pages: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PokemonConfig {
  pub base_url: String,
  /// Widest span `/pokemon/range` will walk in one request
  pub max_range: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StarWarsConfig {
  pub base_url: String,
  /// Upper bound of the people walk (the people catalog has gaps)
  pub max_people: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
  pub base_url: String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      port: 3000,
      data_dir: PathBuf::from("data"),
      log_dir: None,
      api_key: None,
      request_delay_ms: 1000,
      cache_ttl_hours: 24,
      stars: StarsConfig::default(),
      pokemon: PokemonConfig::default(),
      starwars: StarWarsConfig::default(),
      oracle: OracleConfig::default(),
    }
  }
}

impl Default for StarsConfig {
  fn default() -> Self {
    Self {
      base_url: "https://makers-challenge.altscore.ai/v1/s1/e2/resources/stars".to_string(),
      total_pages: 34,
    }
  }
}

impl Default for PokemonConfig {
  fn default() -> Self {
    Self {
      base_url: "https://pokeapi.co/api/v2/pokemon".to_string(),
      max_range: 100,
    }
  }
}

impl Default for StarWarsConfig {
  fn default() -> Self {
    Self {
      base_url: "https://swapi.dev/api".to_string(),
      max_people: 83,
    }
  }
}

impl Default for OracleConfig {
  fn default() -> Self {
    Self {
      base_url: "https://makers-challenge.altscore.ai/v1/s1/e3/resources/oracle-rolodex"
        .to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./cosmocache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/cosmocache/config.yaml
  ///
  /// Falls back to built-in defaults when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("cosmocache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("cosmocache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    // An empty document deserializes to unit, not to a mapping
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Get the shared API key.
  ///
  /// Checks COSMOCACHE_API_KEY first, then the `api_key` config entry.
  pub fn get_api_key(&self) -> Option<String> {
    std::env::var(API_KEY_ENV)
      .ok()
      .filter(|key| !key.is_empty())
      .or_else(|| self.api_key.clone())
  }

  /// Resolve the listening port: CLI flag, then `PORT`, then the config file.
  pub fn resolve_port(&self, cli_port: Option<u16>) -> u16 {
    cli_port
      .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
      .unwrap_or(self.port)
  }

  pub fn request_delay(&self) -> Duration {
    Duration::from_millis(self.request_delay_ms)
  }

  pub fn cache_ttl(&self) -> chrono::Duration {
    chrono::Duration::hours(self.cache_ttl_hours)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_match_upstream_constants() {
    let config = Config::default();
    assert_eq!(config.port, 3000);
    assert_eq!(config.stars.total_pages, 34);
    assert_eq!(config.starwars.max_people, 83);
    assert_eq!(config.request_delay(), Duration::from_secs(1));
    assert_eq!(config.cache_ttl(), chrono::Duration::hours(24));
  }

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let config = Config::from_yaml(
      "request_delay_ms: 0\nstarwars:\n  max_people: 5\npokemon:\n  base_url: http://localhost:9000/pokemon\n",
    )
    .unwrap();
    assert_eq!(config.request_delay_ms, 0);
    assert_eq!(config.starwars.max_people, 5);
    assert_eq!(config.starwars.base_url, "https://swapi.dev/api");
    assert_eq!(config.pokemon.base_url, "http://localhost:9000/pokemon");
    assert_eq!(config.pokemon.max_range, 100);
    assert_eq!(config.port, 3000);
  }

  #[test]
  fn test_empty_yaml_is_default() {
    let config = Config::from_yaml("  \n").unwrap();
    assert_eq!(config.data_dir, PathBuf::from("data"));
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    let result = Config::load(Some(Path::new("/nonexistent/cosmocache.yaml")));
    assert!(result.is_err());
  }

  #[test]
  fn test_cli_port_wins() {
    let config = Config::default();
    assert_eq!(config.resolve_port(Some(8080)), 8080);
  }
}
