//! Sample textures: a small reference photo cut into square blocks that serve
//! as raw material for quilting.

use std::path::Path;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MapError, Result};
use crate::tilemap::{Rgb, Tilemap};

/// How a sample is cut up and re-assembled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureParams {
    /// Side of each square block in pixels
    pub block_size: usize,
    /// Extraction stride is `block_size / extraction_overlap`; > 1 yields more candidate blocks
    pub extraction_overlap: usize,
    /// Placement stride while quilting is `block_size / overlap_factor`
    pub overlap_factor: usize,
}

impl Default for TextureParams {
    fn default() -> Self {
        Self {
            block_size: 50,
            extraction_overlap: 1,
            overlap_factor: 2,
        }
    }
}

impl TextureParams {
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(MapError::config("block_size must be at least 1"));
        }
        if self.extraction_overlap == 0 || self.overlap_factor == 0 {
            return Err(MapError::config("overlap factors must be at least 1"));
        }
        Ok(())
    }
}

/// A reference raster and the blocks extracted from it. Read-only once built.
#[derive(Clone, Debug)]
pub struct SampleTexture {
    name: String,
    source: Tilemap<Rgb>,
    block_size: usize,
    blocks: Vec<Tilemap<Rgb>>,
}

impl SampleTexture {
    /// Cut `source` into `block_size` squares on a stride of
    /// `block_size / extraction_overlap` (at least 1) in both axes. Every
    /// window that fits entirely inside the source is kept.
    pub fn from_raster(
        name: impl Into<String>,
        source: Tilemap<Rgb>,
        block_size: usize,
        extraction_overlap: usize,
    ) -> Result<Self> {
        let name = name.into();
        if block_size == 0 || extraction_overlap == 0 {
            return Err(MapError::config("block_size and extraction_overlap must be at least 1"));
        }
        if block_size > source.width || block_size > source.height {
            return Err(MapError::config(format!(
                "block size {} does not fit sample {:?} ({}x{})",
                block_size, name, source.width, source.height
            )));
        }

        let stride = (block_size / extraction_overlap).max(1);
        let mut blocks = Vec::new();
        for y in (0..=source.height - block_size).step_by(stride) {
            for x in (0..=source.width - block_size).step_by(stride) {
                blocks.push(source.crop(x, y, block_size, block_size));
            }
        }
        debug!(texture = %name, blocks = blocks.len(), block_size, stride, "extracted blocks");

        Ok(Self { name, source, block_size, blocks })
    }

    /// Decode from memory. Alpha is discarded.
    pub fn from_image(name: impl Into<String>, img: &DynamicImage, params: &TextureParams) -> Result<Self> {
        params.validate()?;
        let source = Tilemap::from_rgb_image(&img.to_rgb8());
        Self::from_raster(name, source, params.block_size, params.extraction_overlap)
    }

    /// Load a sample from disk; the texture is named after the file stem.
    pub fn load(path: impl AsRef<Path>, params: &TextureParams) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let img = image::open(path)?;
        Self::from_image(name, &img, params)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Tilemap<Rgb> {
        &self.source
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn blocks(&self) -> &[Tilemap<Rgb>] {
        &self.blocks
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_sample(width: usize, height: usize) -> Tilemap<Rgb> {
        let mut map = Tilemap::new_with(width, height, [0.0; 3]);
        for (x, y, px) in map.iter_mut() {
            *px = [x as f32 / width as f32, y as f32 / height as f32, 0.5];
        }
        map
    }

    #[test]
    fn test_block_equal_to_sample_gives_one_block() {
        let tex = SampleTexture::from_raster("single", gradient_sample(10, 10), 10, 1).unwrap();
        assert_eq!(tex.block_count(), 1);
        assert_eq!(tex.blocks()[0], *tex.source());
    }

    #[test]
    fn test_extraction_stride() {
        // Positions 0, 10, 20 along x and 0, 10 along y.
        let tex = SampleTexture::from_raster("grid", gradient_sample(30, 20), 10, 1).unwrap();
        assert_eq!(tex.block_count(), 6);

        // Stride 5: positions 0..=20 step 5 -> 5 along x, 0..=10 step 5 -> 3 along y.
        let dense = SampleTexture::from_raster("dense", gradient_sample(30, 20), 10, 2).unwrap();
        assert_eq!(dense.block_count(), 15);

        for block in dense.blocks() {
            assert_eq!(block.dimensions(), (10, 10));
        }
        // Second block starts at x = 5.
        assert_eq!(*dense.blocks()[1].get(0, 0), *dense.source().get(5, 0));
    }

    #[test]
    fn test_oversized_block_is_config_error() {
        let err = SampleTexture::from_raster("tiny", gradient_sample(8, 20), 10, 1).unwrap_err();
        assert!(matches!(err, MapError::Config(_)));
        assert!(SampleTexture::from_raster("zero", gradient_sample(8, 8), 0, 1).is_err());
    }

    #[test]
    fn test_from_image_drops_alpha() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(12, 12, image::Rgba([255, 0, 0, 7])));
        let params = TextureParams { block_size: 6, ..TextureParams::default() };
        let tex = SampleTexture::from_image("red", &img, &params).unwrap();
        assert_eq!(tex.block_count(), 4);
        assert_eq!(*tex.blocks()[3].get(5, 5), [1.0, 0.0, 0.0]);
    }
}
