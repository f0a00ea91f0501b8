//! Summary statistics over fetched catalogs. Pure functions, no I/O.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::catalog::types::{Person, Planet, Pokemon, Side, Star};

/// The type categories reported by the heights summary
pub const POKEMON_TYPES: [&str; 18] = [
  "bug", "dark", "dragon", "electric", "fairy", "fighting", "fire", "flying", "ghost", "grass",
  "ground", "ice", "normal", "poison", "psychic", "rock", "steel", "water",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resonance {
  pub total: f64,
  pub average: f64,
}

/// Total and mean resonance; missing values count as zero.
pub fn resonance(stars: &[Star]) -> Resonance {
  let total: f64 = stars.iter().map(|s| s.resonance.unwrap_or(0.0)).sum();
  let average = if stars.is_empty() {
    0.0
  } else {
    total / stars.len() as f64
  };
  Resonance { total, average }
}

/// Mean height per known type, rounded to 3 decimals.
///
/// A Pokémon counts toward each of its types. Types nobody has report 0.
pub fn average_heights_by_type(pokemon: &[Pokemon]) -> BTreeMap<&'static str, f64> {
  let mut sums: HashMap<&str, (f64, u32)> = HashMap::new();
  for p in pokemon {
    for type_name in &p.types {
      let entry = sums.entry(type_name.as_str()).or_default();
      entry.0 += f64::from(p.height);
      entry.1 += 1;
    }
  }

  POKEMON_TYPES
    .iter()
    .map(|&type_name| {
      let average = match sums.get(type_name) {
        Some(&(sum, count)) if count > 0 => round3(sum / f64::from(count)),
        _ => 0.0,
      };
      (type_name, average)
    })
    .collect()
}

fn round3(value: f64) -> f64 {
  (value * 1000.0).round() / 1000.0
}

/// Ideological balance factor: (light - dark) / residents, 0 without residents.
pub fn ibf(light: u32, dark: u32, residents: usize) -> f64 {
  if residents == 0 {
    return 0.0;
  }
  (f64::from(light) - f64::from(dark)) / residents as f64
}

fn side_of(person: &Person) -> Option<Side> {
  person.oracle_data.as_ref().and_then(|o| o.side)
}

/// Light and dark counts over people with oracle notes.
pub fn side_counts(people: &[Person]) -> (u32, u32) {
  people.iter().fold((0, 0), |(light, dark), person| match side_of(person) {
    Some(Side::Light) => (light + 1, dark),
    Some(Side::Dark) => (light, dark + 1),
    None => (light, dark),
  })
}

/// A planet joined with the people born there
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanetAggregate {
  #[serde(flatten)]
  pub planet: Planet,
  pub residents: Vec<Person>,
  pub light_side_count: u32,
  pub dark_side_count: u32,
  pub ibf: f64,
}

/// Attach every person to the planet whose URL matches their homeworld.
///
/// Planets keep their input order; people with an unknown homeworld are dropped.
pub fn organize_people_by_planet(people: &[Person], planets: &[Planet]) -> Vec<PlanetAggregate> {
  let mut aggregates: Vec<PlanetAggregate> = Vec::with_capacity(planets.len());
  let mut by_url: HashMap<&str, usize> = HashMap::new();

  for planet in planets {
    if let Some(&index) = by_url.get(planet.url.as_str()) {
      // Same URL twice: the later record wins, the position stays
      aggregates[index].planet = planet.clone();
      continue;
    }
    by_url.insert(planet.url.as_str(), aggregates.len());
    aggregates.push(PlanetAggregate {
      planet: planet.clone(),
      residents: Vec::new(),
      light_side_count: 0,
      dark_side_count: 0,
      ibf: 0.0,
    });
  }

  for person in people {
    let Some(&index) = by_url.get(person.homeworld.as_str()) else {
      continue;
    };
    let aggregate = &mut aggregates[index];
    match side_of(person) {
      Some(Side::Light) => aggregate.light_side_count += 1,
      Some(Side::Dark) => aggregate.dark_side_count += 1,
      None => {}
    }
    aggregate.residents.push(person.clone());
  }

  for aggregate in &mut aggregates {
    aggregate.ibf = ibf(
      aggregate.light_side_count,
      aggregate.dark_side_count,
      aggregate.residents.len(),
    );
  }

  aggregates
}

pub fn planets_with_residents(planets: Vec<PlanetAggregate>) -> Vec<PlanetAggregate> {
  planets
    .into_iter()
    .filter(|p| !p.residents.is_empty())
    .collect()
}
