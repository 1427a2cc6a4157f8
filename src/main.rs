use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};

use pyrrhos_map::biomes::BiomeSet;
use pyrrhos_map::config::load_or;
use pyrrhos_map::error::Result;
use pyrrhos_map::export;
use pyrrhos_map::island::{default_biomes, Island, IslandConfig, OutputMode};
use pyrrhos_map::logging::init_logging;
use pyrrhos_map::noise_field::{NoiseField, NoiseParams};
use pyrrhos_map::quilt::Quilter;
use pyrrhos_map::seeds::MapSeeds;
use pyrrhos_map::texture::{SampleTexture, TextureParams};
use pyrrhos_map::world::{WorldConfig, WorldMap};

#[derive(Parser, Debug)]
#[command(name = "pyrrhos_map")]
#[command(about = "Generate fantasy island and world maps from noise and sample textures")]
struct Args {
    /// Log level for this crate (RUST_LOG overrides it)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single island or continent
    Island {
        /// JSON island config (defaults to the chosen variant)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Random seed (uses random seed if not specified)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Override the config's output mode
        #[arg(short, long)]
        mode: Option<Mode>,

        #[arg(short, long, value_enum, default_value = "island")]
        variant: Variant,

        /// Directory holding one `<biome>.png` sample per biome (textured mode)
        #[arg(long, default_value = "images/samples")]
        biome_dir: PathBuf,

        /// Block size used to cut biome samples
        #[arg(long, default_value = "50")]
        block_size: usize,

        #[arg(short, long, default_value = "island.png")]
        output: PathBuf,
    },

    /// Stitch the world map from ocean and continent artwork
    World {
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long)]
        seed: Option<u64>,

        #[arg(short, long, default_value = "world_map.png")]
        output: PathBuf,

        /// Also write a downscaled copy here
        #[arg(short, long)]
        preview: Option<PathBuf>,
    },

    /// Quilt a larger texture out of a sample image
    Quilt {
        #[arg(long)]
        sample: PathBuf,

        #[arg(short = 'W', long, default_value = "512")]
        width: usize,

        #[arg(short = 'H', long, default_value = "512")]
        height: usize,

        #[arg(short, long, default_value = "50")]
        block_size: usize,

        #[arg(long, default_value = "2")]
        overlap_factor: usize,

        #[arg(long, default_value = "1")]
        extraction_overlap: usize,

        #[arg(short, long)]
        seed: Option<u64>,

        #[arg(short, long, default_value = "quilted.png")]
        output: PathBuf,
    },

    /// Render a raw noise field
    Field {
        #[arg(short = 'W', long, default_value = "256")]
        width: usize,

        #[arg(short = 'H', long, default_value = "256")]
        height: usize,

        /// Octave count (defaults to floor(log2(width)))
        #[arg(long)]
        octaves: Option<u32>,

        #[arg(long, default_value = "1.0")]
        flatness: f32,

        #[arg(short, long)]
        seed: Option<u64>,

        #[arg(short, long, default_value = "field.png")]
        output: PathBuf,

        /// Write each octave as a grayscale PNG into this directory
        #[arg(long)]
        components: Option<PathBuf>,

        /// Use the spectral colormap instead of grayscale
        #[arg(long)]
        spectral: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Pixelized,
    Textured,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Variant {
    Island,
    Continent,
}

fn seeds_from(seed: Option<u64>) -> MapSeeds {
    let seeds = seed.map(MapSeeds::from_master).unwrap_or_default();
    info!("Using seed: {}", seeds.master);
    seeds
}

fn load_biomes(cfg: &IslandConfig, dir: &Path, block_size: usize) -> Result<BiomeSet> {
    let table = cfg.biomes.clone().unwrap_or_else(default_biomes);
    let paths: BTreeMap<String, PathBuf> = table
        .values()
        .map(|name| (name.clone(), dir.join(format!("{}.png", name))))
        .collect();
    let params = TextureParams { block_size, ..TextureParams::default() };
    BiomeSet::load(&paths, &params)
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Island { config, seed, mode, variant, biome_dir, block_size, output } => {
            let preset = match variant {
                Variant::Island => IslandConfig::island,
                Variant::Continent => IslandConfig::continent,
            };
            let mut cfg = load_or(config.as_deref(), preset)?;
            match mode {
                Some(Mode::Pixelized) => cfg.mode = OutputMode::Pixelized,
                Some(Mode::Textured) => {
                    let table = cfg.biomes.take().unwrap_or_else(default_biomes);
                    cfg = cfg.textured(table);
                }
                None => {}
            }

            info!("Rendering {:?} {}x{} ({:?})", variant, cfg.width, cfg.height, cfg.mode);
            let biomes = match cfg.mode {
                OutputMode::Textured => Some(load_biomes(&cfg, &biome_dir, block_size)?),
                OutputMode::Pixelized => None,
            };
            let island = Island::new(cfg, seeds_from(seed))?;
            let raster = island.render(biomes.as_ref())?;
            export::save_rgb(&raster, &output)
        }

        Command::World { config, seed, output, preview } => {
            let cfg: WorldConfig = load_or(config.as_deref(), WorldConfig::default)?;
            let world = WorldMap::build(&cfg, &seeds_from(seed))?;
            export::save_image(&world.to_image(), &output)?;
            if let Some(path) = preview {
                export::save_image(&world.preview(cfg.preview_width)?, &path)?;
            }
            Ok(())
        }

        Command::Quilt { sample, width, height, block_size, overlap_factor, extraction_overlap, seed, output } => {
            let params = TextureParams { block_size, extraction_overlap, overlap_factor };
            let texture = SampleTexture::load(&sample, &params)?;
            info!("Loaded {} blocks from {}", texture.block_count(), sample.display());
            let quilter = Quilter::new(&texture, overlap_factor)?;
            let seeds = seeds_from(seed);
            let raster = quilter.quilt(width, height, &mut MapSeeds::rng(seeds.texture(texture.name())))?;
            export::save_rgb(&raster, &output)
        }

        Command::Field { width, height, octaves, flatness, seed, output, components, spectral } => {
            let params = NoiseParams {
                octaves,
                flatness,
                keep_components: components.is_some(),
                ..NoiseParams::default()
            };
            let seeds = seeds_from(seed);
            let field = NoiseField::generate(width, height, &params, &mut MapSeeds::rng(seeds.terrain))?;
            info!("Generated {} octaves", field.octaves());
            if spectral {
                export::save_spectral(field.values(), &output)?;
            } else {
                export::save_gray(field.values(), &output)?;
            }
            if let Some(dir) = components {
                export::export_components(&field, &dir, "field")?;
            }
            Ok(())
        }
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    if let Err(e) = run(args.command) {
        error!("{}", e);
        std::process::exit(1);
    }
}
