//! Island assembly: noise fields, masks and classification put together into
//! a finished map image.
//!
//! The pipeline mirrors how the fields depend on each other:
//!
//! 1. terrain, moisture and shape fields are generated from their own seeds;
//! 2. the shape field is pushed towards a disc and thresholded into a 0/1
//!    land mask;
//! 3. the terrain is attenuated towards the borders, blended with moisture and
//!    multiplied by the shape mask;
//! 4. the result is classified, either straight to colours ([`OutputMode::Pixelized`])
//!    or to biomes whose sample textures are quilted and pasted where each
//!    biome was selected ([`OutputMode::Textured`]).

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use crate::biomes::BiomeSet;
use crate::classification::{colorize, BiomeTable, Color, ColorTable};
use crate::compositor::Canvas;
use crate::error::{MapError, Result};
use crate::noise_field::{NoiseField, NoiseParams};
use crate::quilt::Quilter;
use crate::seeds::MapSeeds;
use crate::tilemap::{Rgb, Tilemap};

/// A weighted circular attenuation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CircularMask {
    /// 0 leaves the field alone, 1 replaces it by the mask
    pub weight: f32,
    /// Exponent shaping the falloff
    pub exponent: f32,
}

impl CircularMask {
    fn validate(&self, what: &str) -> Result<()> {
        if !(0.0..=1.0).contains(&self.weight) {
            return Err(MapError::config(format!("{} mask weight must be in [0, 1], got {}", what, self.weight)));
        }
        if !self.exponent.is_finite() || self.exponent <= 0.0 {
            return Err(MapError::config(format!("{} mask exponent must be positive, got {}", what, self.exponent)));
        }
        Ok(())
    }
}

/// Moisture field blended into the terrain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoistureConfig {
    pub noise: NoiseParams,
    pub weight: f32,
}

impl Default for MoistureConfig {
    fn default() -> Self {
        Self {
            noise: NoiseParams::default(),
            weight: 0.3,
        }
    }
}

/// Land/water shape: a noise field, pushed to a disc, cut at `level`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    pub noise: NoiseParams,
    pub mask: CircularMask,
    pub level: f32,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            noise: NoiseParams::default(),
            mask: CircularMask { weight: 0.75, exponent: 1.25 },
            level: 0.3,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// One flat colour per classification bucket
    #[default]
    Pixelized,
    /// Quilted biome textures
    Textured,
}

/// Everything needed to render one island.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IslandConfig {
    pub width: usize,
    pub height: usize,
    pub terrain: NoiseParams,
    /// Attenuation applied to the terrain before blending
    pub terrain_mask: Option<CircularMask>,
    pub moisture: Option<MoistureConfig>,
    pub shape: Option<ShapeConfig>,
    pub mode: OutputMode,
    /// Used in pixelized mode
    pub colors: ColorTable,
    /// Used in textured mode; every name needs a texture in the [`BiomeSet`]
    pub biomes: Option<BiomeTable>,
    /// Placement stride while quilting biome textures is `block_size / overlap_factor`
    pub overlap_factor: usize,
}

/// 0.3 deep water, 0.4 shallows, 0.5 sand, 0.6 grass, 0.8 forest, 0.9 rock, 1.0 snow.
pub fn default_colors() -> ColorTable {
    let entries = vec![
        (0.3, Color([19, 90, 212])),
        (0.4, Color::from_hex(0x02CCFE)),
        (0.5, Color([207, 140, 54])),
        (0.6, Color::from_hex(0x0ADD08)),
        (0.8, Color::from_hex(0x228B22)),
        (0.9, Color::from_hex(0x516572)),
        (1.0, Color([255, 255, 255])),
    ];
    ColorTable::presorted(entries)
}

/// Biome names matching [`default_colors`] bucket for bucket.
pub fn default_biomes() -> BiomeTable {
    let entries = [
        (0.3, "deep_water"),
        (0.4, "shallow_water"),
        (0.5, "sand"),
        (0.6, "grass"),
        (0.8, "forest"),
        (0.9, "rock"),
        (1.0, "snow"),
    ]
    .into_iter()
    .map(|(t, name)| (t, name.to_string()))
    .collect();
    BiomeTable::presorted(entries)
}

impl Default for IslandConfig {
    fn default() -> Self {
        Self::island()
    }
}

impl IslandConfig {
    /// A small island: flat terrain, moisture, and a noisy disc-shaped coastline.
    pub fn island() -> Self {
        Self {
            width: 200,
            height: 200,
            terrain: NoiseParams::with_flatness(0.5),
            terrain_mask: Some(CircularMask { weight: 0.4, exponent: 1.25 }),
            moisture: Some(MoistureConfig::default()),
            shape: Some(ShapeConfig::default()),
            mode: OutputMode::Pixelized,
            colors: default_colors(),
            biomes: None,
            overlap_factor: 2,
        }
    }

    /// A continent: larger, no shape cut, and a lighter border falloff so the
    /// landmass reaches further towards the edges.
    pub fn continent() -> Self {
        Self {
            width: 400,
            height: 300,
            terrain: NoiseParams::with_flatness(0.8),
            terrain_mask: Some(CircularMask { weight: 0.3, exponent: 1.0 }),
            moisture: Some(MoistureConfig { weight: 0.2, ..MoistureConfig::default() }),
            shape: None,
            ..Self::island()
        }
    }

    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn textured(mut self, biomes: BiomeTable) -> Self {
        self.mode = OutputMode::Textured;
        self.biomes = Some(biomes);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MapError::config(format!("island size must be non-zero, got {}x{}", self.width, self.height)));
        }
        self.terrain.validate()?;
        if let Some(mask) = &self.terrain_mask {
            mask.validate("terrain")?;
        }
        if let Some(moisture) = &self.moisture {
            moisture.noise.validate()?;
            if !(0.0..=1.0).contains(&moisture.weight) {
                return Err(MapError::config(format!("moisture weight must be in [0, 1], got {}", moisture.weight)));
            }
        }
        if let Some(shape) = &self.shape {
            shape.noise.validate()?;
            shape.mask.validate("shape")?;
            if !(0.0..=1.0).contains(&shape.level) {
                return Err(MapError::config(format!("shape level must be in [0, 1], got {}", shape.level)));
            }
        }
        if self.overlap_factor == 0 {
            return Err(MapError::config("overlap_factor must be at least 1"));
        }
        if self.mode == OutputMode::Textured && self.biomes.is_none() {
            return Err(MapError::config("textured mode needs a biome table"));
        }
        Ok(())
    }
}

/// Intermediate fields, kept around for diagnostics.
#[derive(Clone, Debug)]
pub struct IslandFields {
    /// Final terrain after masking, blending and the shape cut
    pub terrain: NoiseField,
    pub moisture: Option<NoiseField>,
    /// 0/1 land mask
    pub shape: Option<NoiseField>,
}

/// An island generator bound to a validated config and a set of seeds.
#[derive(Clone, Debug)]
pub struct Island {
    config: IslandConfig,
    seeds: MapSeeds,
}

impl Island {
    pub fn new(config: IslandConfig, seeds: MapSeeds) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, seeds })
    }

    pub fn config(&self) -> &IslandConfig {
        &self.config
    }

    pub fn seeds(&self) -> &MapSeeds {
        &self.seeds
    }

    /// Run the field stages of the pipeline.
    pub fn generate_fields(&self) -> Result<IslandFields> {
        let cfg = &self.config;
        let (w, h) = (cfg.width, cfg.height);
        let _span = info_span!("island_fields", width = w, height = h, seed = self.seeds.master).entered();

        info!("generating terrain");
        let mut terrain = NoiseField::generate(w, h, &cfg.terrain, &mut MapSeeds::rng(self.seeds.terrain))?;

        let moisture = match &cfg.moisture {
            Some(m) => {
                info!("generating moisture");
                Some(NoiseField::generate(w, h, &m.noise, &mut MapSeeds::rng(self.seeds.moisture))?)
            }
            None => None,
        };

        let shape = match &cfg.shape {
            Some(s) => {
                info!("generating shape");
                let mut field = NoiseField::generate(w, h, &s.noise, &mut MapSeeds::rng(self.seeds.shape))?;
                field.apply_circular_mask(s.mask.weight, s.mask.exponent)?;
                field.threshold(s.level);
                Some(field)
            }
            None => None,
        };

        if let Some(mask) = &cfg.terrain_mask {
            terrain.apply_circular_mask(mask.weight, mask.exponent)?;
        }
        if let (Some(field), Some(m)) = (&moisture, &cfg.moisture) {
            terrain.apply_field(field, m.weight)?;
        }
        if let Some(field) = &shape {
            terrain.multiply(field.values())?;
        }

        Ok(IslandFields { terrain, moisture, shape })
    }

    /// Flat colour per bucket.
    pub fn render_pixelized(&self, fields: &IslandFields) -> Tilemap<Rgb> {
        colorize(fields.terrain.values(), &self.config.colors)
    }

    /// Quilt each biome that appears in the classification and paste it where
    /// that biome was selected.
    pub fn render_textured(&self, fields: &IslandFields, biomes: &BiomeSet) -> Result<Tilemap<Rgb>> {
        let table = self
            .config
            .biomes
            .as_ref()
            .ok_or_else(|| MapError::config("textured mode needs a biome table"))?;
        biomes.check_covers(table)?;

        let (w, h) = (self.config.width, self.config.height);
        let buckets = fields.terrain.values().map(|&v| table.bucket(v));
        let mut canvas = Canvas::new(w, h)?;

        for (index, (_, name)) in table.entries().iter().enumerate() {
            let selection = buckets.map(|&b| if b == index { 1.0f32 } else { 0.0 });
            if selection.data().iter().all(|&s| s == 0.0) {
                debug!(biome = %name, "biome not present, skipping");
                continue;
            }
            let texture = biomes
                .get(name)
                .ok_or_else(|| MapError::config(format!("no sample texture for biome {}", name)))?;

            info!(biome = %name, "quilting biome texture");
            let quilter = Quilter::new(texture, self.config.overlap_factor)?;
            let mut rng = MapSeeds::rng(self.seeds.texture(name));
            let quilted = quilter.quilt(w, h, &mut rng)?;
            canvas.paste_where(&quilted, &selection)?;
        }

        Ok(canvas.into_raster())
    }

    /// Full pipeline in the configured mode. `biomes` is required for textured output.
    pub fn render(&self, biomes: Option<&BiomeSet>) -> Result<Tilemap<Rgb>> {
        if self.config.mode == OutputMode::Textured {
            let (Some(set), Some(table)) = (biomes, self.config.biomes.as_ref()) else {
                return Err(MapError::config("textured mode needs a biome set and table"));
            };
            // Fail before any noise is generated.
            set.check_covers(table)?;
        }

        let fields = self.generate_fields()?;
        match (self.config.mode, biomes) {
            (OutputMode::Textured, Some(set)) => self.render_textured(&fields, set),
            _ => Ok(self.render_pixelized(&fields)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::SampleTexture;

    fn small_island() -> IslandConfig {
        IslandConfig::island().with_size(64, 48)
    }

    fn table_colors(table: &ColorTable) -> Vec<Rgb> {
        table.values().map(|c| c.to_rgb()).collect()
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(IslandConfig::island().validate().is_ok());
        assert!(IslandConfig::continent().validate().is_ok());
        assert!(IslandConfig::continent().shape.is_none());
        assert_eq!(
            IslandConfig::island().terrain_mask,
            Some(CircularMask { weight: 0.4, exponent: 1.25 })
        );
        assert_eq!(default_colors().entries().len(), default_biomes().entries().len());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = small_island();
        cfg.moisture = Some(MoistureConfig { weight: 1.5, ..MoistureConfig::default() });
        assert!(Island::new(cfg, MapSeeds::from_master(1)).is_err());

        let cfg = small_island().with_size(0, 10);
        assert!(Island::new(cfg, MapSeeds::from_master(1)).is_err());

        let mut cfg = small_island();
        cfg.mode = OutputMode::Textured;
        assert!(matches!(cfg.validate(), Err(MapError::Config(_))));
    }

    #[test]
    fn test_fields_have_expected_ranges() {
        let island = Island::new(small_island(), MapSeeds::from_master(42)).unwrap();
        let fields = island.generate_fields().unwrap();

        assert_eq!(fields.terrain.values().dimensions(), (64, 48));
        let shape = fields.shape.as_ref().unwrap();
        assert!(shape.values().data().iter().all(|&v| v == 0.0 || v == 1.0));

        // The shape cut zeroes the terrain wherever the shape is water.
        for ((_, _, t), s) in fields.terrain.values().iter().zip(shape.values().data()) {
            assert!((0.0..=1.0).contains(t));
            if *s == 0.0 {
                assert_eq!(*t, 0.0);
            }
        }
    }

    #[test]
    fn test_pixelized_uses_table_colors_and_is_deterministic() {
        let island = Island::new(small_island(), MapSeeds::from_master(7)).unwrap();
        let a = island.render(None).unwrap();
        let b = island.render(None).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dimensions(), (64, 48));

        let palette = table_colors(&island.config().colors);
        assert!(a.data().iter().all(|px| palette.contains(px)));

        let other = Island::new(small_island(), MapSeeds::from_master(8)).unwrap();
        assert_ne!(a, other.render(None).unwrap());
    }

    #[test]
    fn test_textured_with_flat_samples_matches_pixelized() {
        // A uniform sample quilts to its own colour, so the textured render must
        // reproduce the pixelized one.
        let colors = default_colors();
        let textures = default_biomes()
            .entries()
            .iter()
            .zip(colors.values())
            .map(|((_, name), color)| {
                SampleTexture::from_raster(name.clone(), Tilemap::new_with(16, 16, color.to_rgb()), 8, 1).unwrap()
            })
            .collect::<Vec<_>>();
        let set = BiomeSet::from_textures(textures);

        let seeds = MapSeeds::from_master(99);
        let flat = Island::new(small_island(), seeds.clone()).unwrap();
        let textured = Island::new(small_island().textured(default_biomes()), seeds).unwrap();

        let expected = flat.render(None).unwrap();
        let actual = textured.render(Some(&set)).unwrap();
        for (e, a) in expected.data().iter().zip(actual.data()) {
            for c in 0..3 {
                assert!((e[c] - a[c]).abs() < 1e-4, "{:?} vs {:?}", e, a);
            }
        }
    }

    #[test]
    fn test_missing_biome_texture_is_an_error() {
        let set = BiomeSet::from_textures([SampleTexture::from_raster(
            "sand",
            Tilemap::new_with(8, 8, [0.8, 0.6, 0.2]),
            8,
            1,
        )
        .unwrap()]);
        let island = Island::new(small_island().textured(default_biomes()), MapSeeds::from_master(3)).unwrap();
        let err = island.render(Some(&set)).unwrap_err();
        assert!(err.to_string().contains("deep_water"));
        assert!(island.render(None).is_err());
    }

    #[test]
    fn test_config_json_defaults() {
        let cfg: IslandConfig = serde_json::from_str(r#"{"width": 32, "height": 16, "shape": null}"#).unwrap();
        assert_eq!((cfg.width, cfg.height), (32, 16));
        assert!(cfg.shape.is_none());
        assert_eq!(cfg.colors, default_colors());

        let json = serde_json::to_string(&IslandConfig::continent()).unwrap();
        let back: IslandConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, IslandConfig::continent());
    }
}
