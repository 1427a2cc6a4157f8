//! The output canvas: rasters are pasted at signed offsets, optionally through
//! a soft alpha mask. Anything that falls outside the canvas is clipped.

use image::{RgbImage, RgbaImage};

use crate::error::{MapError, Result};
use crate::mask::EdgeMask;
use crate::tilemap::{Rgb, Tilemap};

#[derive(Clone, Debug)]
pub struct Canvas {
    pixels: Tilemap<Rgb>,
}

/// Overlap of a `src_w x src_h` rectangle at `(x, y)` with a `dst_w x dst_h`
/// canvas, as (first source column, first source row, destination x, destination y, width, height).
fn clip(
    x: i64,
    y: i64,
    src_w: usize,
    src_h: usize,
    dst_w: usize,
    dst_h: usize,
) -> Option<(usize, usize, usize, usize, usize, usize)> {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + src_w as i64).min(dst_w as i64);
    let y1 = (y + src_h as i64).min(dst_h as i64);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((
        (x0 - x) as usize,
        (y0 - y) as usize,
        x0 as usize,
        y0 as usize,
        (x1 - x0) as usize,
        (y1 - y0) as usize,
    ))
}

#[inline]
fn blend(bg: Rgb, fg: Rgb, alpha: f32) -> Rgb {
    [
        bg[0] * (1.0 - alpha) + fg[0] * alpha,
        bg[1] * (1.0 - alpha) + fg[1] * alpha,
        bg[2] * (1.0 - alpha) + fg[2] * alpha,
    ]
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        Self::filled(width, height, [0.0; 3])
    }

    pub fn filled(width: usize, height: usize, color: Rgb) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(MapError::config(format!("canvas size must be non-zero, got {}x{}", width, height)));
        }
        Ok(Self { pixels: Tilemap::new_with(width, height, color) })
    }

    pub fn from_raster(pixels: Tilemap<Rgb>) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> usize {
        self.pixels.width
    }

    pub fn height(&self) -> usize {
        self.pixels.height
    }

    pub fn pixels(&self) -> &Tilemap<Rgb> {
        &self.pixels
    }

    pub fn into_raster(self) -> Tilemap<Rgb> {
        self.pixels
    }

    pub fn to_image(&self) -> RgbImage {
        self.pixels.to_rgb_image()
    }

    /// Paste `src` with its top-left corner at `(x, y)`.
    ///
    /// Without a mask this is an opaque overwrite; with one, each pixel becomes
    /// `background * (1 - alpha) + source * alpha`. The mask must match `src`.
    pub fn paste(&mut self, src: &Tilemap<Rgb>, x: i64, y: i64, mask: Option<&Tilemap<f32>>) -> Result<()> {
        if let Some(mask) = mask {
            if !mask.same_size(src) {
                return Err(MapError::Dimensions {
                    expected: src.dimensions(),
                    actual: mask.dimensions(),
                });
            }
        }

        let Some((sx, sy, dx, dy, w, h)) = clip(x, y, src.width, src.height, self.width(), self.height()) else {
            return Ok(());
        };

        for row in 0..h {
            for col in 0..w {
                let fg = *src.get(sx + col, sy + row);
                let out = self.pixels.get_mut(dx + col, dy + row);
                *out = match mask {
                    Some(m) => blend(*out, fg, (*m.get(sx + col, sy + row)).clamp(0.0, 1.0)),
                    None => fg,
                };
            }
        }
        Ok(())
    }

    /// Paste artwork that carries its own alpha channel. The effective opacity
    /// is the artwork alpha times the optional mask.
    pub fn paste_rgba(&mut self, art: &RgbaImage, x: i64, y: i64, mask: Option<&Tilemap<f32>>) -> Result<()> {
        let (aw, ah) = (art.width() as usize, art.height() as usize);
        if let Some(mask) = mask {
            if mask.dimensions() != (aw, ah) {
                return Err(MapError::Dimensions {
                    expected: (aw, ah),
                    actual: mask.dimensions(),
                });
            }
        }

        let Some((sx, sy, dx, dy, w, h)) = clip(x, y, aw, ah, self.width(), self.height()) else {
            return Ok(());
        };

        for row in 0..h {
            for col in 0..w {
                let px = art.get_pixel((sx + col) as u32, (sy + row) as u32);
                let fg = [px[0] as f32 / 255.0, px[1] as f32 / 255.0, px[2] as f32 / 255.0];
                let mut alpha = px[3] as f32 / 255.0;
                if let Some(m) = mask {
                    alpha *= (*m.get(sx + col, sy + row)).clamp(0.0, 1.0);
                }
                let out = self.pixels.get_mut(dx + col, dy + row);
                *out = blend(*out, fg, alpha);
            }
        }
        Ok(())
    }

    /// Blend a canvas-sized raster in wherever `selection` is non-zero.
    pub fn paste_where(&mut self, src: &Tilemap<Rgb>, selection: &Tilemap<f32>) -> Result<()> {
        for map in [src.dimensions(), selection.dimensions()] {
            if map != self.pixels.dimensions() {
                return Err(MapError::Dimensions {
                    expected: self.pixels.dimensions(),
                    actual: map,
                });
            }
        }
        self.paste(src, 0, 0, Some(selection))
    }

    /// Cover the whole canvas with copies of `texture`.
    ///
    /// Tiles start at `-edge_width` and advance by `texture size - edge_width`,
    /// so each tile's soft edge overlaps its neighbour's. The canvas is first
    /// flooded with the texture's mean colour, which is what shows through
    /// where two fading edges meet.
    pub fn tile(&mut self, texture: &Tilemap<Rgb>, edge_width: usize) -> Result<()> {
        let (tw, th) = texture.dimensions();
        if tw <= edge_width || th <= edge_width {
            return Err(MapError::config(format!(
                "edge width {} leaves no room in a {}x{} tile",
                edge_width, tw, th
            )));
        }

        self.pixels.fill(mean_color(texture));

        let mask = (edge_width > 0).then(|| EdgeMask::new(tw, th, edge_width));
        let step_x = (tw - edge_width) as i64;
        let step_y = (th - edge_width) as i64;
        let start = -(edge_width as i64);

        let mut y = start;
        while y < self.height() as i64 {
            let mut x = start;
            while x < self.width() as i64 {
                self.paste(texture, x, y, mask.as_ref().map(EdgeMask::as_tilemap))?;
                x += step_x;
            }
            y += step_y;
        }
        Ok(())
    }
}

fn mean_color(raster: &Tilemap<Rgb>) -> Rgb {
    let n = raster.data().len().max(1) as f32;
    let mut acc = [0.0f32; 3];
    for px in raster.data() {
        acc[0] += px[0];
        acc[1] += px[1];
        acc[2] += px[2];
    }
    [acc[0] / n, acc[1] / n, acc[2] / n]
}
