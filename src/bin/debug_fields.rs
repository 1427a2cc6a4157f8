//! Debug script to dump the island pipeline's intermediate fields as PNGs

use std::path::PathBuf;

use tracing::{error, info};

use pyrrhos_map::error::Result;
use pyrrhos_map::export::{export_components, save_gray, save_rgb, save_spectral};
use pyrrhos_map::island::{Island, IslandConfig};
use pyrrhos_map::logging::init_logging;
use pyrrhos_map::mask::{circular_mask, EdgeMask};
use pyrrhos_map::seeds::MapSeeds;

fn run() -> Result<()> {
    let seed = 12345u64;
    let out = PathBuf::from("debug_fields");

    let mut config = IslandConfig::island();
    config.terrain.keep_components = true;
    let (width, height) = (config.width, config.height);
    let island = Island::new(config, MapSeeds::from_master(seed))?;

    info!("Dumping island fields for seed {} into {}", seed, out.display());
    let fields = island.generate_fields()?;

    save_spectral(fields.terrain.values(), out.join("terrain.png"))?;
    if let Some(moisture) = &fields.moisture {
        save_gray(moisture.values(), out.join("moisture.png"))?;
    }
    if let Some(shape) = &fields.shape {
        save_gray(shape.values(), out.join("shape.png"))?;
    }
    export_components(&fields.terrain, out.join("octaves"), "terrain")?;

    save_gray(&circular_mask(width, height, 1.25), out.join("circular_mask.png"))?;
    save_gray(EdgeMask::new(width, height, 20).as_tilemap(), out.join("edge_mask.png"))?;

    save_rgb(&island.render_pixelized(&fields), out.join("island.png"))?;
    Ok(())
}

fn main() {
    init_logging(Some("debug"));
    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }
}
