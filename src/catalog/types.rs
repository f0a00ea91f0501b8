use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A star from the paged stars resource. Only `resonance` is interpreted;
/// every other field is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Star {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub resonance: Option<f64>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Essential Pokémon data kept in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pokemon {
  pub name: String,
  /// Decimeters, as reported upstream
  pub height: u32,
  /// Type names only (e.g., "fire")
  pub types: Vec<String>,
}

/// A Star Wars character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
  pub name: String,
  #[serde(default)]
  pub height: String,
  #[serde(default)]
  pub mass: String,
  #[serde(default)]
  pub gender: String,
  #[serde(default)]
  pub birth_year: String,
  /// URL of the home planet, matches `Planet::url`
  #[serde(default)]
  pub homeworld: String,
  #[serde(default)]
  pub url: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub oracle_data: Option<OracleRecord>,
}

/// A Star Wars planet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
  pub name: String,
  #[serde(default)]
  pub climate: String,
  #[serde(default)]
  pub terrain: String,
  #[serde(default)]
  pub population: String,
  #[serde(default)]
  pub url: String,
}

/// Force alignment read from the oracle notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
  Light,
  Dark,
}

/// Decoded oracle notes for one character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleRecord {
  pub name: String,
  #[serde(rename = "oracle_notes")]
  pub notes: String,
  /// `None` when the notes mention neither side
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub side: Option<Side>,
}
