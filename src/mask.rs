//! Falloff masks: axis gradients, the radial island mask, and soft edge masks
//! used for seamless pasting.

use image::GrayImage;

use crate::tilemap::Tilemap;

/// Two-directional gradient along one axis: 0 at both ends, 1 in the middle,
/// shaped by `t^exponent`.
pub fn axis_gradient(len: usize, exponent: f32) -> Vec<f32> {
    if len <= 1 {
        return vec![1.0; len];
    }
    let last = (len - 1) as f32;
    (0..len)
        .map(|i| {
            let t = 1.0 - (2.0 * i as f32 / last - 1.0).abs();
            t.max(0.0).powf(exponent)
        })
        .collect()
}

/// Radially symmetric falloff: outer product of the row and column gradients.
pub fn circular_mask(width: usize, height: usize, exponent: f32) -> Tilemap<f32> {
    let rows = axis_gradient(height, exponent);
    let cols = axis_gradient(width, exponent);

    let mut mask = Tilemap::new_with(width, height, 0.0f32);
    for (x, y, v) in mask.iter_mut() {
        *v = rows[y] * cols[x];
    }
    mask
}

/// Inward ramp for a border strip: `d / edge_width` at distance `d` from the
/// border, 1.0 once `d >= edge_width`.
#[inline]
fn edge_ramp(distance: usize, edge_width: usize) -> f32 {
    if distance < edge_width {
        distance as f32 / edge_width as f32
    } else {
        1.0
    }
}

/// Per-pixel opacity that fades an image's border to zero.
///
/// Each of the four strips of width `edge_width` is multiplied by a linear ramp
/// running from 0 on the border to 1 inward, so corners receive the product of
/// both adjacent ramps. Strips wider than half the image simply overlap.
#[derive(Clone, Debug)]
pub struct EdgeMask {
    pub edge_width: usize,
    alpha: Tilemap<f32>,
}

impl EdgeMask {
    pub fn new(width: usize, height: usize, edge_width: usize) -> Self {
        let cols: Vec<f32> = (0..width)
            .map(|x| edge_ramp(x, edge_width) * edge_ramp(width - 1 - x, edge_width))
            .collect();
        let rows: Vec<f32> = (0..height)
            .map(|y| edge_ramp(y, edge_width) * edge_ramp(height - 1 - y, edge_width))
            .collect();

        let mut alpha = Tilemap::new_with(width, height, 1.0f32);
        for (x, y, v) in alpha.iter_mut() {
            *v = cols[x] * rows[y];
        }

        Self { edge_width, alpha }
    }

    pub fn alpha(&self, x: usize, y: usize) -> f32 {
        *self.alpha.get(x, y)
    }

    pub fn as_tilemap(&self) -> &Tilemap<f32> {
        &self.alpha
    }

    pub fn to_gray_image(&self) -> GrayImage {
        self.alpha.to_gray_image()
    }
}
