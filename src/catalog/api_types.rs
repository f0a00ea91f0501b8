//! Serde-deserializable types matching upstream API responses.
//!
//! These types are separate from domain types where the upstream shape is
//! richer than what the cache keeps.

use serde::Deserialize;

use super::types::Pokemon;

// ============================================================================
// PokéAPI
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiTypeRef {
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiPokemonType {
  #[serde(rename = "type")]
  pub type_ref: ApiTypeRef,
}

#[derive(Debug, Deserialize)]
pub struct ApiPokemon {
  pub name: String,
  #[serde(default)]
  pub height: u32,
  #[serde(default)]
  pub types: Vec<ApiPokemonType>,
}

impl From<ApiPokemon> for Pokemon {
  fn from(api: ApiPokemon) -> Self {
    Pokemon {
      name: api.name,
      height: api.height,
      types: api.types.into_iter().map(|t| t.type_ref.name).collect(),
    }
  }
}

// ============================================================================
// Oracle rolodex
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiOracleResponse {
  /// Base64 encoded text
  #[serde(default)]
  pub oracle_notes: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_pokemon_keeps_type_names_only() {
    let api: ApiPokemon = serde_json::from_value(json!({
      "id": 6,
      "name": "charizard",
      "height": 17,
      "weight": 905,
      "types": [
        {"slot": 1, "type": {"name": "fire", "url": "https://pokeapi.co/api/v2/type/10/"}},
        {"slot": 2, "type": {"name": "flying", "url": "https://pokeapi.co/api/v2/type/3/"}}
      ]
    }))
    .unwrap();

    let pokemon = Pokemon::from(api);
    assert_eq!(pokemon.name, "charizard");
    assert_eq!(pokemon.height, 17);
    assert_eq!(pokemon.types, vec!["fire", "flying"]);
  }
}
