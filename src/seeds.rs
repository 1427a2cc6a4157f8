//! Seed management for map synthesis
//!
//! Each generated layer gets its own seed derived from a master seed, so the
//! terrain can be re-rolled without changing the coastline shape, and so on.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Seeds for all synthesis layers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapSeeds {
    /// Master seed (used for display/reference)
    pub master: u64,
    /// Terrain height field
    pub terrain: u64,
    /// Moisture field blended into the terrain
    pub moisture: u64,
    /// Land/water shape field
    pub shape: u64,
    /// Block selection while quilting textures
    pub textures: u64,
}

impl MapSeeds {
    /// Create seeds from a master seed, deriving all sub-seeds deterministically.
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            terrain: derive_seed(master, "terrain"),
            moisture: derive_seed(master, "moisture"),
            shape: derive_seed(master, "shape"),
            textures: derive_seed(master, "textures"),
        }
    }

    /// Create a builder for customizing individual seeds
    pub fn builder(master: u64) -> MapSeedsBuilder {
        MapSeedsBuilder {
            seeds: MapSeeds::from_master(master),
        }
    }

    /// Seeded generator for one layer.
    pub fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    /// Seed for a named texture, e.g. a biome or the world ocean.
    pub fn texture(&self, name: &str) -> u64 {
        derive_seed(self.textures, name)
    }
}

impl Default for MapSeeds {
    fn default() -> Self {
        Self::from_master(rand::random())
    }
}

/// Builder for customizing individual seeds while deriving others from master
pub struct MapSeedsBuilder {
    seeds: MapSeeds,
}

impl MapSeedsBuilder {
    pub fn terrain(mut self, seed: u64) -> Self {
        self.seeds.terrain = seed;
        self
    }

    pub fn moisture(mut self, seed: u64) -> Self {
        self.seeds.moisture = seed;
        self
    }

    pub fn shape(mut self, seed: u64) -> Self {
        self.seeds.shape = seed;
        self
    }

    pub fn textures(mut self, seed: u64) -> Self {
        self.seeds.textures = seed;
        self
    }

    pub fn build(self) -> MapSeeds {
        self.seeds
    }
}

/// Derive a sub-seed from a master seed and a layer name.
pub fn derive_seed(master: u64, layer: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    master.hash(&mut hasher);
    layer.hash(&mut hasher);
    hasher.finish()
}

impl std::fmt::Display for MapSeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MapSeeds {{ master: {}, terrain: {}, moisture: {}, shape: {}, textures: {} }}",
            self.master, self.terrain, self.moisture, self.shape, self.textures,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_derivation() {
        let seeds1 = MapSeeds::from_master(12345);
        let seeds2 = MapSeeds::from_master(12345);
        assert_eq!(seeds1, seeds2);
        assert_eq!(seeds1.texture("ocean"), seeds2.texture("ocean"));
    }

    #[test]
    fn test_different_layers_get_different_seeds() {
        let seeds = MapSeeds::from_master(12345);
        assert_ne!(seeds.terrain, seeds.moisture);
        assert_ne!(seeds.moisture, seeds.shape);
        assert_ne!(seeds.shape, seeds.textures);
        assert_ne!(seeds.texture("grass"), seeds.texture("sand"));
    }

    #[test]
    fn test_builder_override() {
        let seeds = MapSeeds::builder(12345).shape(99999).build();
        assert_eq!(seeds.shape, 99999);

        let default_seeds = MapSeeds::from_master(12345);
        assert_eq!(seeds.terrain, default_seeds.terrain);
        assert_eq!(seeds.textures, default_seeds.textures);
    }
}
