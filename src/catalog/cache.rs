//! Caching implementations for catalog types.

use crate::cache::{Cacheable, CsvExport};

use super::types::{OracleRecord, Person, Planet, Pokemon, Star};

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for Star {
  fn entity_type() -> &'static str {
    "stars"
  }
}

impl Cacheable for Pokemon {
  fn entity_type() -> &'static str {
    "pokemon"
  }
}

impl Cacheable for Person {
  fn entity_type() -> &'static str {
    "people"
  }
}

impl Cacheable for Planet {
  fn entity_type() -> &'static str {
    "planets"
  }
}

impl Cacheable for OracleRecord {
  fn entity_type() -> &'static str {
    "oracle"
  }
}

// ============================================================================
// Exports
// ============================================================================

/// Flattened Pokémon export: `id,name,height,types` with pipe-joined types.
pub fn pokemon_csv(path: std::path::PathBuf) -> CsvExport<Pokemon> {
  CsvExport {
    path,
    header: "id,name,height,types",
    row: |id, pokemon| {
      format!(
        "{},{},{},{}",
        id,
        pokemon.name,
        pokemon.height,
        pokemon.types.join("|")
      )
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_pokemon_csv_row() {
    let export = pokemon_csv("pokemon.csv".into());
    let row = (export.row)(
      "1",
      &Pokemon {
        name: "bulbasaur".to_string(),
        height: 7,
        types: vec!["grass".to_string(), "poison".to_string()],
      },
    );
    assert_eq!(row, "1,bulbasaur,7,grass|poison");
  }
}
