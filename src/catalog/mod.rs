//! Upstream catalogs: stars, Pokémon, Star Wars people and planets, and the oracle.

pub mod api_types;
pub mod cache;
pub mod client;
pub mod oracle;
pub mod pokemon;
pub mod starwars;
pub mod stars;
pub mod types;
