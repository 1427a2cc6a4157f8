use image::{GrayImage, ImageBuffer, Luma, Rgb as ImageRgb, RgbImage};

use crate::error::{MapError, Result};

/// A linear RGB pixel with channels in 0.0-1.0.
pub type Rgb = [f32; 3];

/// A dense 2D grid of cells stored row-major.
///
/// `Tilemap<f32>` is a single-channel raster (fields, masks, window weights),
/// `Tilemap<Rgb>` a three-channel one. Indexing does not wrap; use
/// [`Tilemap::get_checked`] for coordinates that may fall outside the grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Tilemap<T> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Tilemap<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }
}

impl<T: Clone> Tilemap<T> {
    pub fn new_with(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Wrap an existing row-major buffer. Fails if the length doesn't match.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != width * height {
            return Err(MapError::Dimensions {
                expected: (width, height),
                actual: (data.len(), 1),
            });
        }
        Ok(Self { width, height, data })
    }

    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(
            x < self.width && y < self.height,
            "({}, {}) outside {}x{}",
            x,
            y,
            self.width,
            self.height
        );
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.index(x, y)]
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        let idx = self.index(x, y);
        &mut self.data[idx]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Bounds-checked access with signed coordinates.
    pub fn get_checked(&self, x: i64, y: i64) -> Option<&T> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(&self.data[y as usize * self.width + x as usize])
    }

    /// Fill the entire map with a value.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn same_size<U>(&self, other: &Tilemap<U>) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let width = self.width;
        self.data.iter().enumerate().map(move |(idx, val)| {
            let x = idx % width;
            let y = idx / width;
            (x, y, val)
        })
    }

    /// Iterate mutably over all cells with their coordinates.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, usize, &mut T)> {
        let width = self.width;
        self.data.iter_mut().enumerate().map(move |(idx, val)| {
            let x = idx % width;
            let y = idx / width;
            (x, y, val)
        })
    }

    /// Build a new map by applying `f` to every cell.
    pub fn map<U, F: Fn(&T) -> U>(&self, f: F) -> Tilemap<U> {
        Tilemap {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Copy the `width x height` window whose top-left corner is `(x, y)`.
    /// The window is clipped to the map, so the result may be smaller.
    pub fn crop(&self, x: usize, y: usize, width: usize, height: usize) -> Self {
        let x_end = (x + width).min(self.width);
        let y_end = (y + height).min(self.height);
        let w = x_end.saturating_sub(x);
        let h = y_end.saturating_sub(y);
        if w == 0 || h == 0 {
            return Self { width: w, height: h, data: Vec::new() };
        }

        let mut data = Vec::with_capacity(w * h);
        for row in y..y_end {
            let start = row * self.width + x;
            data.extend_from_slice(&self.data[start..start + w]);
        }

        Self { width: w, height: h, data }
    }
}

impl Tilemap<f32> {
    /// Smallest and largest value in the map.
    pub fn min_max(&self) -> (f32, f32) {
        let mut min_v = f32::MAX;
        let mut max_v = f32::MIN;
        for &v in &self.data {
            if v < min_v {
                min_v = v;
            }
            if v > max_v {
                max_v = v;
            }
        }
        (min_v, max_v)
    }

    /// Sample using bilinear interpolation. Coordinates are clamped to the grid.
    pub fn sample_bilinear(&self, x: f32, y: f32) -> f32 {
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        let x = x.clamp(0.0, max_x);
        let y = y.clamp(0.0, max_y);

        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let v00 = *self.get(x0, y0);
        let v10 = *self.get(x1, y0);
        let v01 = *self.get(x0, y1);
        let v11 = *self.get(x1, y1);

        let v0 = v00 * (1.0 - fx) + v10 * fx;
        let v1 = v01 * (1.0 - fx) + v11 * fx;
        v0 * (1.0 - fy) + v1 * fy
    }

    /// Upscale so the grid spacing shrinks by `factor`.
    ///
    /// The result is `(width - 1) * factor + 1` by `(height - 1) * factor + 1`.
    /// Source cells land exactly on multiples of `factor`; everything between is
    /// bilinear. `factor` must be at least 1.
    pub fn upscale_linear(&self, factor: usize) -> Self {
        debug_assert!(factor >= 1);
        if factor <= 1 {
            return self.clone();
        }

        let new_width = (self.width - 1) * factor + 1;
        let new_height = (self.height - 1) * factor + 1;
        let mut result = Tilemap::new_with(new_width, new_height, 0.0f32);

        for new_y in 0..new_height {
            let y0 = new_y / factor;
            let y1 = (y0 + 1).min(self.height - 1);
            let fy = (new_y % factor) as f32 / factor as f32;
            for new_x in 0..new_width {
                let x0 = new_x / factor;
                let x1 = (x0 + 1).min(self.width - 1);
                let fx = (new_x % factor) as f32 / factor as f32;

                let v0 = *self.get(x0, y0) * (1.0 - fx) + *self.get(x1, y0) * fx;
                let v1 = *self.get(x0, y1) * (1.0 - fx) + *self.get(x1, y1) * fx;
                result.set(new_x, new_y, v0 * (1.0 - fy) + v1 * fy);
            }
        }

        result
    }

    /// Quantize to an 8-bit grayscale image (values clamped to 0.0-1.0).
    pub fn to_gray_image(&self) -> GrayImage {
        ImageBuffer::from_fn(self.width as u32, self.height as u32, |x, y| {
            let v = *self.get(x as usize, y as usize);
            Luma([to_u8(v)])
        })
    }
}

impl Tilemap<Rgb> {
    pub fn from_rgb_image(img: &RgbImage) -> Self {
        let (w, h) = img.dimensions();
        let data = img
            .pixels()
            .map(|p| [p[0] as f32 / 255.0, p[1] as f32 / 255.0, p[2] as f32 / 255.0])
            .collect();
        Self {
            width: w as usize,
            height: h as usize,
            data,
        }
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        ImageBuffer::from_fn(self.width as u32, self.height as u32, |x, y| {
            let [r, g, b] = *self.get(x as usize, y as usize);
            ImageRgb([to_u8(r), to_u8(g), to_u8(b)])
        })
    }
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
