//! World map stitching: a quilted ocean with continent artwork laid on top.
//!
//! The canvas is always 16:9. Continents are pasted with their own alpha
//! combined with an [`EdgeMask`], so they fade into the ocean instead of
//! showing a hard rectangle.

use std::collections::HashMap;
use std::path::PathBuf;

use image::imageops::{self, FilterType};
use image::{RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::classification::Color;
use crate::compositor::Canvas;
use crate::error::{MapError, Result};
use crate::mask::EdgeMask;
use crate::quilt::Quilter;
use crate::seeds::MapSeeds;
use crate::texture::{SampleTexture, TextureParams};
use crate::tilemap::{Rgb, Tilemap};

/// Height of a 16:9 canvas `width` pixels wide.
pub fn height_for(width: usize) -> usize {
    width * 9 / 16
}

/// Where a continent goes. `coordinates` are absolute, or relative to the
/// continent named by `relative_to` (which must be listed earlier).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContinentSpec {
    pub name: String,
    pub path: PathBuf,
    pub coordinates: [i64; 2],
    #[serde(default)]
    pub relative_to: Option<String>,
}

/// Ocean background quilted from a sample and tiled across the canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OceanConfig {
    pub sample: PathBuf,
    pub texture: TextureParams,
    /// Quilted tile side, in blocks
    pub tile_blocks: usize,
    /// Soft overlap between neighbouring tiles
    pub tile_edge: usize,
}

impl Default for OceanConfig {
    fn default() -> Self {
        Self {
            sample: PathBuf::from("images/samples/ocean.png"),
            texture: TextureParams::default(),
            tile_blocks: 8,
            tile_edge: 25,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: usize,
    /// `None` leaves a flat `ocean_color` background
    pub ocean: Option<OceanConfig>,
    pub ocean_color: Color,
    pub continents: Vec<ContinentSpec>,
    /// Added to every continent position
    pub offset: [i64; 2],
    pub edge_width: usize,
    pub preview_width: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        let continent = |name: &str, file: &str, coordinates: [i64; 2], relative_to: Option<&str>| ContinentSpec {
            name: name.to_string(),
            path: PathBuf::from(format!("images/map/{}", file)),
            coordinates,
            relative_to: relative_to.map(str::to_string),
        };
        Self {
            width: 2000,
            ocean: Some(OceanConfig::default()),
            ocean_color: Color([19, 90, 212]),
            continents: vec![
                continent("Piskus", "piskus.png", [0, 500], None),
                continent("Erebos", "erebos.png", [350, -500], Some("Piskus")),
                continent("Orestes", "orestes.png", [625, 250], Some("Erebos")),
            ],
            offset: [50, 50],
            edge_width: 20,
            preview_width: 800,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<()> {
        if height_for(self.width) == 0 {
            return Err(MapError::config(format!("world width {} is too small", self.width)));
        }
        if let Some(ocean) = &self.ocean {
            ocean.texture.validate()?;
            if ocean.tile_blocks == 0 {
                return Err(MapError::config("ocean tile_blocks must be at least 1"));
            }
        }
        resolve_positions(&self.continents).map(|_| ())
    }
}

/// Absolute position of each continent, in order.
pub fn resolve_positions(specs: &[ContinentSpec]) -> Result<Vec<[i64; 2]>> {
    let mut placed: HashMap<&str, [i64; 2]> = HashMap::new();
    let mut positions = Vec::with_capacity(specs.len());
    for spec in specs {
        let base = match &spec.relative_to {
            None => [0, 0],
            Some(anchor) => *placed.get(anchor.as_str()).ok_or_else(|| {
                MapError::config(format!(
                    "continent {} is relative to {}, which is not placed before it",
                    spec.name, anchor
                ))
            })?,
        };
        let pos = [base[0] + spec.coordinates[0], base[1] + spec.coordinates[1]];
        placed.insert(spec.name.as_str(), pos);
        positions.push(pos);
    }
    Ok(positions)
}

/// Finished continent artwork ready to paste.
#[derive(Clone, Debug)]
pub struct Continent {
    pub name: String,
    pub art: RgbaImage,
    /// Top-left corner before the world offset
    pub coordinates: [i64; 2],
    mask: EdgeMask,
}

impl Continent {
    pub fn new(name: impl Into<String>, art: RgbaImage, coordinates: [i64; 2], edge_width: usize) -> Self {
        let mask = EdgeMask::new(art.width() as usize, art.height() as usize, edge_width);
        Self {
            name: name.into(),
            art,
            coordinates,
            mask,
        }
    }

    pub fn load(spec: &ContinentSpec, coordinates: [i64; 2], edge_width: usize) -> Result<Self> {
        info!(continent = %spec.name, path = %spec.path.display(), "loading continent");
        let art = image::open(&spec.path)?.to_rgba8();
        Ok(Self::new(spec.name.clone(), art, coordinates, edge_width))
    }
}

pub struct WorldMap {
    canvas: Canvas,
}

impl WorldMap {
    /// A blank 16:9 world.
    pub fn new(width: usize, background: Rgb) -> Result<Self> {
        Ok(Self {
            canvas: Canvas::filled(width, height_for(width), background)?,
        })
    }

    /// Load every asset named in `config` and stitch the map.
    pub fn build(config: &WorldConfig, seeds: &MapSeeds) -> Result<Self> {
        config.validate()?;
        let ocean = config
            .ocean
            .as_ref()
            .map(|o| SampleTexture::load(&o.sample, &o.texture))
            .transpose()?;
        let positions = resolve_positions(&config.continents)?;
        let continents = config
            .continents
            .iter()
            .zip(positions)
            .map(|(spec, pos)| Continent::load(spec, pos, config.edge_width))
            .collect::<Result<Vec<_>>>()?;
        Self::compose(config, ocean.as_ref(), &continents, seeds)
    }

    /// Stitch already-loaded assets. Continent positions come from the
    /// [`Continent`] values, not from `config.continents`.
    pub fn compose(
        config: &WorldConfig,
        ocean: Option<&SampleTexture>,
        continents: &[Continent],
        seeds: &MapSeeds,
    ) -> Result<Self> {
        let _span = info_span!("world", width = config.width, seed = seeds.master).entered();
        let mut world = Self::new(config.width, config.ocean_color.to_rgb())?;

        if let (Some(texture), Some(ocean)) = (ocean, config.ocean.as_ref()) {
            let quilter = Quilter::new(texture, ocean.texture.overlap_factor)?;
            let side = quilter.size_for_blocks(ocean.tile_blocks);
            info!(texture = %texture.name(), side, "quilting ocean tile");
            let tile = quilter.quilt(side, side, &mut MapSeeds::rng(seeds.texture(texture.name())))?;
            world.fill_ocean(&tile, ocean.tile_edge)?;
        }

        for continent in continents {
            world.place(continent, config.offset)?;
        }
        Ok(world)
    }

    /// Cover the whole map with copies of `tile`.
    pub fn fill_ocean(&mut self, tile: &Tilemap<Rgb>, edge_width: usize) -> Result<()> {
        self.canvas.tile(tile, edge_width)
    }

    pub fn place(&mut self, continent: &Continent, offset: [i64; 2]) -> Result<()> {
        let x = continent.coordinates[0] + offset[0];
        let y = continent.coordinates[1] + offset[1];
        info!(continent = %continent.name, x, y, "placing continent");
        self.canvas
            .paste_rgba(&continent.art, x, y, Some(continent.mask.as_tilemap()))
    }

    pub fn width(&self) -> usize {
        self.canvas.width()
    }

    pub fn height(&self) -> usize {
        self.canvas.height()
    }

    pub fn to_image(&self) -> RgbImage {
        self.canvas.to_image()
    }

    /// Downscaled 16:9 copy, `width` pixels wide.
    pub fn preview(&self, width: usize) -> Result<RgbImage> {
        let height = height_for(width);
        if height == 0 {
            return Err(MapError::config(format!("preview width {} is too small", width)));
        }
        Ok(imageops::resize(&self.to_image(), width as u32, height as u32, FilterType::Triangle))
    }
}
