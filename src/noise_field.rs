//! Multi-octave coherent noise fields normalized to [0, 1].
//!
//! A field is built by summing octaves of [`GradientNoise`]. Octave `n` samples
//! at `frequency = 2^n / scale` with `amplitude = 1 / frequency`, so the low
//! frequencies dominate the shape and the higher ones add detail. Every octave
//! is backed by its own seeded source.
//!
//! After accumulation the field is divided by the summed amplitudes, raised to
//! the `flatness` exponent, and renormalized so its minimum is exactly 0 and its
//! maximum exactly 1. A constant field (zero octaves, or every sample equal) is
//! left as-is instead of dividing by a zero range.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classification::ClassificationMap;
use crate::error::{MapError, Result};
use crate::mask::circular_mask;
use crate::noise_source::{GradientNoise, NoiseKind};
use crate::tilemap::Tilemap;

/// Divisor `C` in `frequency = 2^n / C`.
pub const DEFAULT_SCALE: f64 = 100.0;

/// Ranges narrower than this are treated as a constant field.
const FLAT_RANGE: f32 = 1e-9;

/// Parameters for field generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    /// Number of octaves; `None` uses `floor(log2(width))`
    pub octaves: Option<u32>,
    /// Exponent applied after averaging (< 1 flattens plains, > 1 sharpens peaks)
    pub flatness: f32,
    /// Frequency divisor; larger values give larger features
    pub scale: f64,
    /// Backing gradient noise
    pub kind: NoiseKind,
    /// Keep each octave's [0, 1] layer for diagnostic export
    pub keep_components: bool,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            octaves: None,
            flatness: 1.0,
            scale: DEFAULT_SCALE,
            kind: NoiseKind::OpenSimplex,
            keep_components: false,
        }
    }
}

impl NoiseParams {
    pub fn with_flatness(flatness: f32) -> Self {
        Self { flatness, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.flatness.is_finite() || self.flatness <= 0.0 {
            return Err(MapError::config(format!("flatness must be positive, got {}", self.flatness)));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(MapError::config(format!("noise scale must be positive, got {}", self.scale)));
        }
        Ok(())
    }
}

/// `floor(log2(width))`, or 0 for an empty width.
pub fn default_octaves(width: usize) -> u32 {
    if width == 0 { 0 } else { width.ilog2() }
}

/// A normalized scalar field (terrain height, moisture, or land shape).
#[derive(Clone, Debug)]
pub struct NoiseField {
    values: Tilemap<f32>,
    octaves: u32,
    components: Vec<Tilemap<f32>>,
}

impl NoiseField {
    /// Generate a field. Per-octave seeds are drawn from `rng`.
    pub fn generate<R: Rng>(
        width: usize,
        height: usize,
        params: &NoiseParams,
        rng: &mut R,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MapError::config(format!("field size must be non-zero, got {}x{}", width, height)));
        }
        params.validate()?;

        let octaves = params.octaves.unwrap_or_else(|| default_octaves(width));
        let _span = tracing::debug_span!("noise_field", width, height, octaves).entered();

        let mut sum = vec![0.0f64; width * height];
        let mut divisor = 0.0f64;
        let mut components = Vec::new();

        for n in 0..octaves {
            let source = GradientNoise::new(params.kind, rng.gen());
            let frequency = 2f64.powi(n as i32) / params.scale;
            let amplitude = 1.0 / frequency;
            divisor += amplitude;
            debug!(octave = n, seed = source.seed(), frequency, "accumulating octave");

            let layer = sample_layer(&source, width, height, frequency);
            sum.par_iter_mut()
                .zip(layer.par_iter())
                .for_each(|(s, &v)| *s += v as f64 * amplitude);

            if params.keep_components {
                components.push(Tilemap::from_vec(width, height, layer)?);
            }
        }

        let values: Vec<f32> = if divisor > 0.0 {
            sum.iter()
                .map(|&s| ((s / divisor) as f32).powf(params.flatness))
                .collect()
        } else {
            vec![0.0; width * height]
        };

        let mut field = Self {
            values: Tilemap::from_vec(width, height, values)?,
            octaves,
            components,
        };
        field.normalize();
        Ok(field)
    }

    /// Wrap precomputed values without renormalizing them.
    pub fn from_values(values: Tilemap<f32>) -> Self {
        Self { values, octaves: 0, components: Vec::new() }
    }

    pub fn width(&self) -> usize {
        self.values.width
    }

    pub fn height(&self) -> usize {
        self.values.height
    }

    pub fn octaves(&self) -> u32 {
        self.octaves
    }

    pub fn values(&self) -> &Tilemap<f32> {
        &self.values
    }

    /// Per-octave layers, empty unless `keep_components` was set.
    pub fn components(&self) -> &[Tilemap<f32>] {
        &self.components
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        *self.values.get(x, y)
    }

    /// True when every value is the same (normalization was skipped).
    pub fn is_constant(&self) -> bool {
        let (min_v, max_v) = self.values.min_max();
        max_v - min_v <= FLAT_RANGE
    }

    /// Shift and scale so the field spans exactly [0, 1].
    pub fn normalize(&mut self) {
        let (min_v, max_v) = self.values.min_max();
        let range = max_v - min_v;
        if !(range > FLAT_RANGE) {
            warn!(value = min_v, "constant field, skipping normalization");
            for v in self.values.data_mut() {
                *v = v.clamp(0.0, 1.0);
            }
            return;
        }
        for v in self.values.data_mut() {
            *v = (*v - min_v) / range;
        }
    }

    /// `field = field * (1 - weight) + mask * weight`, then renormalize.
    pub fn apply_mask(&mut self, mask: &Tilemap<f32>, weight: f32) -> Result<()> {
        self.check_same_size(mask)?;
        if !(0.0..=1.0).contains(&weight) {
            return Err(MapError::config(format!("mask weight must be in [0, 1], got {}", weight)));
        }

        self.values
            .data_mut()
            .par_iter_mut()
            .zip(mask.data().par_iter())
            .for_each(|(v, &m)| *v = *v * (1.0 - weight) + m * weight);
        self.normalize();
        Ok(())
    }

    /// Blend another field in as a mask (e.g. moisture into terrain).
    pub fn apply_field(&mut self, other: &NoiseField, weight: f32) -> Result<()> {
        self.apply_mask(other.values(), weight)
    }

    /// Pull the borders toward 0 with a radial falloff.
    pub fn apply_circular_mask(&mut self, weight: f32, exponent: f32) -> Result<()> {
        if !exponent.is_finite() || exponent <= 0.0 {
            return Err(MapError::config(format!("mask exponent must be positive, got {}", exponent)));
        }
        let mask = circular_mask(self.width(), self.height(), exponent);
        self.apply_mask(&mask, weight)
    }

    /// Turn the field into a binary land/water shape: 1 above `level`, else 0.
    pub fn threshold(&mut self, level: f32) {
        for v in self.values.data_mut() {
            *v = if *v > level { 1.0 } else { 0.0 };
        }
    }

    /// Elementwise product, e.g. terrain cut out by a binary shape.
    pub fn multiply(&mut self, other: &Tilemap<f32>) -> Result<()> {
        self.check_same_size(other)?;
        for (v, &o) in self.values.data_mut().iter_mut().zip(other.data()) {
            *v *= o;
        }
        Ok(())
    }

    pub fn classify<V: Clone>(&self, table: &ClassificationMap<V>) -> Tilemap<V> {
        table.classify(&self.values)
    }

    /// Upsample to `(size - 1) * factor + 1` per axis with bilinear filling.
    /// Original values are kept exactly at multiples of `factor`.
    pub fn resize(&self, factor: usize) -> Result<NoiseField> {
        if factor == 0 {
            return Err(MapError::config("resize factor must be at least 1"));
        }
        Ok(Self {
            values: self.values.upscale_linear(factor),
            octaves: self.octaves,
            components: Vec::new(),
        })
    }

    pub fn to_gray_image(&self) -> image::GrayImage {
        self.values.to_gray_image()
    }

    fn check_same_size(&self, other: &Tilemap<f32>) -> Result<()> {
        if !self.values.same_size(other) {
            return Err(MapError::Dimensions {
                expected: self.values.dimensions(),
                actual: other.dimensions(),
            });
        }
        Ok(())
    }
}

/// One octave remapped to [0, 1], rows sampled in parallel. Row index `i`
/// feeds the first noise coordinate, column `j` the second.
fn sample_layer(source: &GradientNoise, width: usize, height: usize, frequency: f64) -> Vec<f32> {
    let mut layer = vec![0.0f32; width * height];
    layer
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(i, row)| {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = source.sample_unit(frequency * i as f64, frequency * j as f64) as f32;
            }
        });
    debug_assert_eq!(layer.len(), width * height);
    layer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::{Color, ColorTable};
    use crate::tilemap::Rgb;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn field(width: usize, height: usize, octaves: u32, seed: u64) -> NoiseField {
        let params = NoiseParams { octaves: Some(octaves), ..NoiseParams::default() };
        NoiseField::generate(width, height, &params, &mut ChaCha8Rng::seed_from_u64(seed)).unwrap()
    }

    fn assert_unit_range(f: &NoiseField) {
        let (min_v, max_v) = f.values().min_max();
        assert_eq!(min_v, 0.0);
        assert_eq!(max_v, 1.0);
        assert!(f.values().data().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_generated_field_spans_unit_range() {
        for seed in [1, 2, 3] {
            let f = field(40, 30, 4, seed);
            assert_eq!((f.width(), f.height()), (40, 30));
            assert_unit_range(&f);
        }
    }

    #[test]
    fn test_same_seed_same_field() {
        let a = field(32, 32, 3, 99);
        let b = field(32, 32, 3, 99);
        assert_eq!(a.values(), b.values());

        let c = field(32, 32, 3, 100);
        assert_ne!(a.values(), c.values());
    }

    #[test]
    fn test_default_octaves_from_width() {
        assert_eq!(default_octaves(200), 7);
        assert_eq!(default_octaves(256), 8);
        assert_eq!(default_octaves(1), 0);

        let f = NoiseField::generate(64, 8, &NoiseParams::default(), &mut ChaCha8Rng::seed_from_u64(5)).unwrap();
        assert_eq!(f.octaves(), 6);
    }

    #[test]
    fn test_zero_octaves_is_constant_not_nan() {
        let f = field(16, 16, 0, 1);
        assert!(f.is_constant());
        assert!(f.values().data().iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_flatness_keeps_unit_range() {
        for flatness in [0.5, 2.0] {
            let params = NoiseParams { octaves: Some(3), flatness, ..NoiseParams::default() };
            let f = NoiseField::generate(30, 30, &params, &mut ChaCha8Rng::seed_from_u64(8)).unwrap();
            assert_unit_range(&f);
        }
    }

    #[test]
    fn test_rejects_bad_params() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(NoiseField::generate(0, 10, &NoiseParams::default(), &mut rng).is_err());
        assert!(NoiseField::generate(10, 10, &NoiseParams::with_flatness(0.0), &mut rng).is_err());
        assert!(NoiseField::generate(10, 10, &NoiseParams::with_flatness(f32::NAN), &mut rng).is_err());
    }

    #[test]
    fn test_components_kept_on_request() {
        let params = NoiseParams { octaves: Some(3), keep_components: true, ..NoiseParams::default() };
        let f = NoiseField::generate(20, 10, &params, &mut ChaCha8Rng::seed_from_u64(3)).unwrap();
        assert_eq!(f.components().len(), 3);
        for layer in f.components() {
            assert_eq!(layer.dimensions(), (20, 10));
            assert!(layer.data().iter().all(|v| (0.0..=1.0).contains(v)));
        }
        assert!(field(20, 10, 3, 3).components().is_empty());
    }

    #[test]
    fn test_apply_mask_blends_and_renormalizes() {
        let mut f = field(24, 24, 3, 11);
        let mask = circular_mask(24, 24, 1.0);
        f.apply_mask(&mask, 1.0).unwrap();

        // Full weight leaves the normalized mask.
        let (min_m, max_m) = mask.min_max();
        for (x, y, &v) in f.values().iter() {
            let expected = (*mask.get(x, y) - min_m) / (max_m - min_m);
            assert!((v - expected).abs() < 1e-5);
        }
        assert_unit_range(&f);
    }

    #[test]
    fn test_apply_mask_rejects_mismatch() {
        let mut f = field(10, 10, 2, 1);
        assert!(f.apply_mask(&Tilemap::new_with(9, 10, 0.5), 0.5).is_err());
        assert!(f.apply_mask(&Tilemap::new_with(10, 10, 0.5), 1.5).is_err());
    }

    #[test]
    fn test_apply_field_blends_other_field() {
        let mut terrain = field(20, 20, 3, 1);
        let moisture = field(20, 20, 3, 2);
        terrain.apply_field(&moisture, 0.3).unwrap();
        assert_unit_range(&terrain);
    }

    #[test]
    fn test_full_circular_mask_zeroes_corners() {
        let mut f = field(50, 50, 3, 21);
        f.apply_circular_mask(1.0, 1.25).unwrap();
        assert_eq!(f.get(0, 0), 0.0);
        assert_eq!(f.get(49, 0), 0.0);
        assert_eq!(f.get(0, 49), 0.0);
        assert_eq!(f.get(49, 49), 0.0);
    }

    #[test]
    fn test_threshold_and_multiply() {
        let mut shape = NoiseField::from_values(Tilemap::from_vec(3, 1, vec![0.1f32, 0.3, 0.9]).unwrap());
        shape.threshold(0.3);
        assert_eq!(shape.values().data(), &[0.0, 0.0, 1.0]);

        let mut terrain = NoiseField::from_values(Tilemap::from_vec(3, 1, vec![0.5f32, 0.6, 0.7]).unwrap());
        terrain.multiply(shape.values()).unwrap();
        assert_eq!(terrain.values().data(), &[0.0, 0.0, 0.7]);
    }

    #[test]
    fn test_resize_keeps_grid_points() {
        let f = field(12, 9, 3, 4);
        let k = 3;
        let big = f.resize(k).unwrap();
        assert_eq!((big.width(), big.height()), (11 * k + 1, 8 * k + 1));
        for y in 0..9 {
            for x in 0..12 {
                assert_eq!(big.get(x * k, y * k), f.get(x, y));
            }
        }
        assert!(f.resize(0).is_err());
        assert_eq!(f.resize(1).unwrap().values(), f.values());
    }

    #[test]
    fn test_masked_island_classifies_to_rgb() {
        const OCEAN: Color = Color([19, 90, 212]);
        const LAND: Color = Color([10, 221, 8]);

        let mut f = field(50, 50, 3, 2024);
        f.apply_circular_mask(0.5, 1.25).unwrap();

        let table = ColorTable::new(vec![(0.3, OCEAN), (1.0, LAND)]).unwrap();
        let classes = f.classify(&table);
        assert_eq!(classes.dimensions(), (50, 50));
        assert!(classes.data().iter().all(|c| *c == OCEAN || *c == LAND));

        let raster: Tilemap<Rgb> = crate::classification::colorize(f.values(), &table);
        let img = raster.to_rgb_image();
        assert_eq!(img.dimensions(), (50, 50));

        // The corner mask is exactly 0, but at weight 0.5 a corner still keeps
        // half its noise value, so after renormalizing it can land above the
        // ocean threshold. Only the ordering of rim and middle is guaranteed.
        let corners = [f.get(0, 0), f.get(49, 0), f.get(0, 49), f.get(49, 49)];
        let corner_mean = corners.iter().sum::<f32>() / 4.0;
        let center = f.values().crop(20, 20, 10, 10);
        let center_mean = center.data().iter().sum::<f32>() / center.data().len() as f32;
        assert!(corner_mean < center_mean);
    }
}
