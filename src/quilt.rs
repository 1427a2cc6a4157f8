//! Overlap-add texture quilting.
//!
//! Blocks drawn at random from a [`SampleTexture`] are laid on a grid with a
//! stride of `block_size / overlap_factor`. Each placement is weighted by a 2D
//! Hann window; the weighted blocks and the windows are summed into two
//! buffers and the result is `sum / weight`. Periodic Hann windows at a hop
//! that divides the block size sum to a constant, so block edges dissolve
//! into their neighbours.
//!
//! The grid is laid over a canvas padded by `block_size - hop` on every side
//! and the padding is cropped afterwards. Without it the outermost pixels would
//! only be reached by the tapered tail of a single window.

use std::f32::consts::PI;

use rand::Rng;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{MapError, Result};
use crate::texture::SampleTexture;
use crate::tilemap::{Rgb, Tilemap};

/// Floor for the weight buffer so unreachable pixels never divide by zero.
pub const WEIGHT_EPSILON: f32 = 1e-10;

/// Periodic Hann window of length `len`: `0.5 - 0.5 cos(2 pi n / len)`.
pub fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / len as f32).cos())
        .collect()
}

/// Synthesizes seamless rasters of any size from one sample texture.
pub struct Quilter<'a> {
    texture: &'a SampleTexture,
    overlap_factor: usize,
    hop: usize,
    window: Vec<f32>,
}

impl<'a> Quilter<'a> {
    pub fn new(texture: &'a SampleTexture, overlap_factor: usize) -> Result<Self> {
        if overlap_factor == 0 {
            return Err(MapError::config("overlap_factor must be at least 1"));
        }
        if texture.block_count() == 0 {
            return Err(MapError::config(format!("texture {:?} has no blocks", texture.name())));
        }

        let block_size = texture.block_size();
        let hop = (block_size / overlap_factor).max(1);
        // Without overlap there is nothing to blend, and a Hann window would
        // leave the first row and column of every block at zero weight.
        let window = if hop < block_size {
            hann_window(block_size)
        } else {
            vec![1.0; block_size]
        };

        Ok(Self { texture, overlap_factor, hop, window })
    }

    /// Grid stride between block placements.
    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Padding cropped from each side of the synthesis canvas.
    pub fn padding(&self) -> usize {
        self.texture.block_size() - self.hop
    }

    /// The 2D window: outer product of the 1D window with itself.
    pub fn window(&self) -> Tilemap<f32> {
        let n = self.window.len();
        let mut w = Tilemap::new_with(n, n, 0.0f32);
        for (x, y, v) in w.iter_mut() {
            *v = self.window[y] * self.window[x];
        }
        w
    }

    /// Side length of a square texture made of `blocks` placements per axis.
    pub fn size_for_blocks(&self, blocks: usize) -> usize {
        let block_size = self.texture.block_size();
        let inc = if self.overlap_factor > 1 {
            block_size - block_size / self.overlap_factor
        } else {
            block_size
        };
        blocks * inc
    }

    /// Quilt a `width x height` raster. One block is drawn from `rng` per grid
    /// position, row by row, before any pixels are blended.
    pub fn quilt<R: Rng>(&self, width: usize, height: usize, rng: &mut R) -> Result<Tilemap<Rgb>> {
        self.quilt_with_weights(width, height, rng).map(|(raster, _)| raster)
    }

    /// Like [`Quilter::quilt`], also returning the summed window weight of
    /// every output pixel.
    pub fn quilt_with_weights<R: Rng>(
        &self,
        width: usize,
        height: usize,
        rng: &mut R,
    ) -> Result<(Tilemap<Rgb>, Tilemap<f32>)> {
        if width == 0 || height == 0 {
            return Err(MapError::config(format!("quilt size must be non-zero, got {}x{}", width, height)));
        }

        let block_size = self.texture.block_size();
        let pad = self.padding();
        let padded_w = width + 2 * pad;
        let padded_h = height + 2 * pad;
        let cols = padded_w.div_ceil(self.hop);
        let rows = padded_h.div_ceil(self.hop);

        let count = self.texture.block_count();
        let choices: Vec<usize> = (0..rows * cols).map(|_| rng.gen_range(0..count)).collect();
        debug!(
            texture = self.texture.name(),
            width, height, rows, cols, pad, hop = self.hop,
            "quilting"
        );

        let blocks = self.texture.blocks();
        let mut sum = vec![[0.0f32; 3]; width * height];
        let mut weight = vec![0.0f32; width * height];

        // Each output row only reads shared state, so rows blend independently.
        sum.par_chunks_mut(width)
            .zip(weight.par_chunks_mut(width))
            .enumerate()
            .for_each(|(oy, (sum_row, weight_row))| {
                let py = oy + pad;
                for r in placements_covering(py, block_size, self.hop, rows) {
                    let dy = py - r * self.hop;
                    let wy = self.window[dy];
                    for (ox, (acc, w_acc)) in sum_row.iter_mut().zip(weight_row.iter_mut()).enumerate() {
                        let px = ox + pad;
                        for c in placements_covering(px, block_size, self.hop, cols) {
                            let dx = px - c * self.hop;
                            let w = wy * self.window[dx];
                            let texel = blocks[choices[r * cols + c]].get(dx, dy);
                            acc[0] += w * texel[0];
                            acc[1] += w * texel[1];
                            acc[2] += w * texel[2];
                            *w_acc += w;
                        }
                    }
                }
            });

        let pixels = sum
            .iter()
            .zip(&weight)
            .map(|(s, &w)| {
                let w = w.max(WEIGHT_EPSILON);
                [s[0] / w, s[1] / w, s[2] / w]
            })
            .collect();

        Ok((
            Tilemap::from_vec(width, height, pixels)?,
            Tilemap::from_vec(width, height, weight)?,
        ))
    }
}

/// Grid indices whose block (starting at `index * hop`, `block_size` long)
/// covers canvas position `p`.
fn placements_covering(p: usize, block_size: usize, hop: usize, count: usize) -> std::ops::Range<usize> {
    let first = (p + 1).saturating_sub(block_size).div_ceil(hop);
    let last = (p / hop + 1).min(count);
    first..last.max(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn gradient_sample(width: usize, height: usize) -> Tilemap<Rgb> {
        let mut map = Tilemap::new_with(width, height, [0.0; 3]);
        for (x, y, px) in map.iter_mut() {
            *px = [x as f32 / width as f32, y as f32 / height as f32, 0.5];
        }
        map
    }

    fn noisy_sample(size: usize, seed: u64) -> Tilemap<Rgb> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut map = Tilemap::new_with(size, size, [0.0; 3]);
        for (_, _, px) in map.iter_mut() {
            *px = [rng.gen(), rng.gen(), rng.gen()];
        }
        map
    }

    #[test]
    fn test_hann_sums_to_constant_at_half_hop() {
        let w = hann_window(10);
        assert_eq!(w[0], 0.0);
        for n in 0..5 {
            assert!((w[n] + w[n + 5] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_window_is_outer_product() {
        let tex = SampleTexture::from_raster("noise", noisy_sample(20, 4), 8, 1).unwrap();
        let hann = hann_window(8);
        let window = Quilter::new(&tex, 2).unwrap().window();
        assert_eq!(window.dimensions(), (8, 8));
        for (x, y, &w) in window.iter() {
            assert_eq!(w, hann[y] * hann[x]);
        }

        // No overlap: flat box window.
        let boxed = Quilter::new(&tex, 1).unwrap().window();
        assert!(boxed.data().iter().all(|&w| w == 1.0));
    }

    #[test]
    fn test_placements_covering() {
        // block 10, hop 5: position 12 is covered by blocks at 5 and 10.
        assert_eq!(placements_covering(12, 10, 5, 100), 1..3);
        assert_eq!(placements_covering(0, 10, 5, 100), 0..1);
        assert_eq!(placements_covering(12, 10, 5, 2), 1..2);
    }

    #[test]
    fn test_output_has_requested_size() {
        let tex = SampleTexture::from_raster("noise", noisy_sample(30, 1), 10, 1).unwrap();
        let quilter = Quilter::new(&tex, 2).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        for (w, h) in [(1, 1), (3, 7), (10, 10), (57, 23), (100, 100)] {
            let out = quilter.quilt(w, h, &mut rng).unwrap();
            assert_eq!(out.dimensions(), (w, h));
            assert!(out.data().iter().flatten().all(|c| c.is_finite() && (-1e-5..=1.0 + 1e-5).contains(c)));
        }
        assert!(quilter.quilt(0, 5, &mut rng).is_err());
    }

    #[test]
    fn test_window_weights_are_constant() {
        let tex = SampleTexture::from_raster("noise", noisy_sample(40, 2), 10, 2).unwrap();
        let quilter = Quilter::new(&tex, 2).unwrap();
        assert_eq!(quilter.padding(), 5);

        let (_, weights) = quilter
            .quilt_with_weights(64, 48, &mut ChaCha8Rng::seed_from_u64(9))
            .unwrap();
        for (x, y, &w) in weights.iter() {
            assert!((w - 1.0).abs() < 1e-4, "weight {} at ({}, {})", w, x, y);
        }
    }

    #[test]
    fn test_uniform_sample_stays_uniform() {
        let sample = Tilemap::new_with(20, 20, [0.2, 0.4, 0.6]);
        let tex = SampleTexture::from_raster("flat", sample, 8, 1).unwrap();
        let quilter = Quilter::new(&tex, 4).unwrap();
        let out = quilter.quilt(33, 17, &mut ChaCha8Rng::seed_from_u64(0)).unwrap();
        for px in out.data() {
            for (c, expected) in px.iter().zip([0.2, 0.4, 0.6]) {
                assert!((c - expected).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_block_seams_are_blended() {
        // One 10x10 block; any hard seam would jump by most of the gradient.
        let tex = SampleTexture::from_raster("ramp", gradient_sample(10, 10), 10, 1).unwrap();
        let quilter = Quilter::new(&tex, 2).unwrap();
        let out = quilter.quilt(100, 100, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        assert_eq!(out.dimensions(), (100, 100));

        // Padded grid lines fall on output multiples of the hop.
        let hop = quilter.hop();
        for boundary in (hop..100 - 1).step_by(hop) {
            for y in [10usize, 47, 80] {
                for dy in 0..3 {
                    for dx in 0..2 {
                        let a = out.get(boundary - 1 + dx, y + dy - 1);
                        let b = out.get(boundary + dx, y + dy - 1);
                        for ch in 0..3 {
                            assert!((a[ch] - b[ch]).abs() < 0.1, "seam at x={} y={}", boundary, y);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_same_seed_same_quilt() {
        let tex = SampleTexture::from_raster("noise", noisy_sample(30, 4), 10, 2).unwrap();
        let quilter = Quilter::new(&tex, 2).unwrap();
        let a = quilter.quilt(40, 40, &mut ChaCha8Rng::seed_from_u64(77)).unwrap();
        let b = quilter.quilt(40, 40, &mut ChaCha8Rng::seed_from_u64(77)).unwrap();
        let c = quilter.quilt(40, 40, &mut ChaCha8Rng::seed_from_u64(78)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_without_overlap_blocks_tile() {
        let tex = SampleTexture::from_raster("flat", Tilemap::new_with(6, 6, [0.5; 3]), 6, 1).unwrap();
        let quilter = Quilter::new(&tex, 1).unwrap();
        assert_eq!(quilter.padding(), 0);
        let (out, weights) = quilter.quilt_with_weights(13, 5, &mut ChaCha8Rng::seed_from_u64(2)).unwrap();
        assert!(weights.data().iter().all(|&w| w == 1.0));
        assert!(out.data().iter().all(|px| *px == [0.5; 3]));
    }

    #[test]
    fn test_size_for_blocks() {
        let tex = SampleTexture::from_raster("noise", noisy_sample(60, 5), 50, 1).unwrap();
        assert_eq!(Quilter::new(&tex, 2).unwrap().size_for_blocks(30), 750);
        assert_eq!(Quilter::new(&tex, 1).unwrap().size_for_blocks(3), 150);
    }
}
