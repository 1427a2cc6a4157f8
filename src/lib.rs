//! Procedural fantasy map synthesis
//!
//! Re-exports modules for use by binaries and tools.

pub mod biomes;
pub mod classification;
pub mod compositor;
pub mod config;
pub mod error;
pub mod export;
pub mod island;
pub mod logging;
pub mod mask;
pub mod noise_field;
pub mod noise_source;
pub mod quilt;
pub mod seeds;
pub mod texture;
pub mod tilemap;
pub mod world;

pub use error::{MapError, Result};
