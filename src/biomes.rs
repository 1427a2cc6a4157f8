//! Biome texture sets for textured island rendering.
//!
//! A [`BiomeSet`] maps biome names (as used in a [`BiomeTable`]) to sample
//! textures. It is loaded once by the caller and handed to island assembly by
//! reference; nothing mutates it afterwards.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::info;

use crate::classification::BiomeTable;
use crate::error::{MapError, Result};
use crate::texture::{SampleTexture, TextureParams};

#[derive(Clone, Debug, Default)]
pub struct BiomeSet {
    textures: BTreeMap<String, SampleTexture>,
}

impl BiomeSet {
    /// Build from already-decoded textures, keyed by their names.
    pub fn from_textures(textures: impl IntoIterator<Item = SampleTexture>) -> Self {
        Self {
            textures: textures
                .into_iter()
                .map(|t| (t.name().to_string(), t))
                .collect(),
        }
    }

    /// Load one sample image per biome name.
    pub fn load(paths: &BTreeMap<String, PathBuf>, params: &TextureParams) -> Result<Self> {
        let mut textures = BTreeMap::new();
        for (name, path) in paths {
            info!(biome = %name, path = %path.display(), "loading biome sample");
            let img = image::open(path)?;
            textures.insert(name.clone(), SampleTexture::from_image(name.clone(), &img, params)?);
        }
        Ok(Self { textures })
    }

    pub fn get(&self, name: &str) -> Option<&SampleTexture> {
        self.textures.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.textures.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Every biome named by `table` must have a texture.
    pub fn check_covers(&self, table: &BiomeTable) -> Result<()> {
        let missing: Vec<&str> = table
            .values()
            .filter(|name| !self.textures.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MapError::config(format!("no sample texture for biome(s): {}", missing.join(", "))))
        }
    }
}
