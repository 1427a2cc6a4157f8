use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageBuffer, Rgb as Pixel, RgbImage};
use tracing::info;

use crate::error::Result;
use crate::noise_field::NoiseField;
use crate::tilemap::{Rgb, Tilemap};

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Save an RGB raster as an 8-bit PNG (or whatever the extension says).
pub fn save_rgb(raster: &Tilemap<Rgb>, path: impl AsRef<Path>) -> Result<()> {
    save_image(&raster.to_rgb_image(), path)
}

pub fn save_image(img: &RgbImage, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    img.save(path)?;
    info!(path = %path.display(), width = img.width(), height = img.height(), "saved image");
    Ok(())
}

/// Save a [0, 1] map as 8-bit grayscale.
pub fn save_gray(map: &Tilemap<f32>, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    map.to_gray_image().save(path)?;
    Ok(())
}

/// Save a [0, 1] map with the spectral colormap.
pub fn save_spectral(map: &Tilemap<f32>, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    spectral_image(map).save(path)?;
    Ok(())
}

pub fn spectral_image(map: &Tilemap<f32>) -> RgbImage {
    let mut img: RgbImage = ImageBuffer::new(map.width as u32, map.height as u32);
    for (x, y, &val) in map.iter() {
        img.put_pixel(x as u32, y as u32, Pixel(spectral_colormap(val.clamp(0.0, 1.0))));
    }
    img
}

/// Spectral colormap (matplotlib style): dark blue -> cyan -> green -> yellow -> orange -> red
fn spectral_colormap(t: f32) -> [u8; 3] {
    let colors: [[f32; 3]; 11] = [
        [0.37, 0.31, 0.64],  // Dark blue/purple (low)
        [0.20, 0.53, 0.74],  // Blue
        [0.40, 0.76, 0.65],  // Teal
        [0.67, 0.87, 0.64],  // Light green
        [0.90, 0.96, 0.60],  // Yellow-green
        [1.00, 1.00, 0.75],  // Light yellow / white
        [1.00, 0.88, 0.55],  // Yellow
        [0.99, 0.68, 0.38],  // Light orange
        [0.96, 0.43, 0.26],  // Orange
        [0.84, 0.24, 0.31],  // Red
        [0.62, 0.00, 0.26],  // Dark red (high)
    ];

    let t_scaled = t * 10.0;
    let idx = (t_scaled as usize).min(9);
    let frac = t_scaled - idx as f32;

    let c1 = colors[idx];
    let c2 = colors[idx + 1];

    [
        ((c1[0] + (c2[0] - c1[0]) * frac) * 255.0) as u8,
        ((c1[1] + (c2[1] - c1[1]) * frac) * 255.0) as u8,
        ((c1[2] + (c2[2] - c1[2]) * frac) * 255.0) as u8,
    ]
}

/// Write each retained octave as `<prefix>_octave_<n>.png` into `dir`.
/// Returns the written paths; empty if the field kept no components.
pub fn export_components(field: &NoiseField, dir: impl AsRef<Path>, prefix: &str) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(field.components().len());
    for (n, layer) in field.components().iter().enumerate() {
        let path = dir.join(format!("{}_octave_{}.png", prefix, n));
        save_gray(layer, &path)?;
        written.push(path);
    }
    info!(dir = %dir.display(), count = written.len(), "exported octave layers");
    Ok(written)
}
