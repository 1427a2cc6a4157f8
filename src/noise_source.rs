//! Seeded 2D coherent noise primitive.

use noise::{NoiseFn, OpenSimplex, Perlin};
use serde::{Deserialize, Serialize};

/// Which gradient noise backs a source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    #[default]
    OpenSimplex,
    Perlin,
}

enum Backend {
    OpenSimplex(OpenSimplex),
    Perlin(Perlin),
}

/// Deterministic coherent noise: one value in [-1, 1] per (x, y).
///
/// Holds no state beyond the seeded permutation table, so the same seed always
/// yields the same value for the same coordinates.
pub struct GradientNoise {
    seed: u32,
    backend: Backend,
}

impl GradientNoise {
    pub fn new(kind: NoiseKind, seed: u32) -> Self {
        let backend = match kind {
            NoiseKind::OpenSimplex => Backend::OpenSimplex(OpenSimplex::new(seed)),
            NoiseKind::Perlin => Backend::Perlin(Perlin::new(seed)),
        };
        Self { seed, backend }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    #[inline]
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let v = match &self.backend {
            Backend::OpenSimplex(n) => n.get([x, y]),
            Backend::Perlin(n) => n.get([x, y]),
        };
        v.clamp(-1.0, 1.0)
    }

    /// Sample remapped from [-1, 1] to [0, 1].
    #[inline]
    pub fn sample_unit(&self, x: f64, y: f64) -> f64 {
        (self.sample(x, y) + 1.0) * 0.5
    }
}
