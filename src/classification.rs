//! Threshold tables that turn a continuous [0, 1] field into discrete values.

use serde::{Deserialize, Serialize};

use crate::error::{MapError, Result};
use crate::tilemap::{Rgb, Tilemap};

/// Largest value a normalized field can hold. The last threshold must reach it.
pub const FIELD_MAX: f32 = 1.0;

/// One `{ "threshold": t, "value": v }` row of a table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassEntry<V> {
    pub threshold: f32,
    pub value: V,
}

/// An ascending threshold table. A field value maps to the value of the first
/// threshold that is >= it. Values above the top threshold (which can only come
/// from an unnormalized field) fall into the top bucket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<ClassEntry<V>>",
    into = "Vec<ClassEntry<V>>",
    bound(deserialize = "V: Deserialize<'de> + Clone", serialize = "V: Serialize + Clone")
)]
pub struct ClassificationMap<V> {
    entries: Vec<(f32, V)>,
}

impl<V: Clone> ClassificationMap<V> {
    /// Validate and build a table. Thresholds must be finite, strictly
    /// increasing, and the last one must be at least [`FIELD_MAX`].
    pub fn new(entries: Vec<(f32, V)>) -> Result<Self> {
        let Some(&(last, _)) = entries.last() else {
            return Err(MapError::Classification("table is empty".into()));
        };

        for (i, &(t, _)) in entries.iter().enumerate() {
            if !t.is_finite() {
                return Err(MapError::Classification(format!("threshold #{} is not finite", i)));
            }
            if i > 0 && t <= entries[i - 1].0 {
                return Err(MapError::Classification(format!(
                    "thresholds must be strictly increasing, got {} after {}",
                    t,
                    entries[i - 1].0
                )));
            }
        }

        if last < FIELD_MAX {
            return Err(MapError::Classification(format!(
                "last threshold {} is below the field maximum {}",
                last, FIELD_MAX
            )));
        }

        Ok(Self { entries })
    }

    /// Build a table that is ascending by construction.
    pub(crate) fn presorted(entries: Vec<(f32, V)>) -> Self {
        debug_assert!(Self::new(entries.clone()).is_ok());
        Self { entries }
    }

    pub fn entries(&self) -> &[(f32, V)] {
        &self.entries
    }

    /// Values in table order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn bucket(&self, value: f32) -> usize {
        self.entries
            .iter()
            .position(|&(t, _)| value <= t)
            .unwrap_or(self.entries.len() - 1)
    }

    pub fn lookup(&self, value: f32) -> &V {
        &self.entries[self.bucket(value)].1
    }

    pub fn classify(&self, field: &Tilemap<f32>) -> Tilemap<V> {
        field.map(|&v| self.lookup(v).clone())
    }
}

impl<V: Clone> TryFrom<Vec<ClassEntry<V>>> for ClassificationMap<V> {
    type Error = MapError;

    fn try_from(rows: Vec<ClassEntry<V>>) -> Result<Self> {
        Self::new(rows.into_iter().map(|e| (e.threshold, e.value)).collect())
    }
}

impl<V> From<ClassificationMap<V>> for Vec<ClassEntry<V>> {
    fn from(map: ClassificationMap<V>) -> Self {
        map.entries
            .into_iter()
            .map(|(threshold, value)| ClassEntry { threshold, value })
            .collect()
    }
}

/// 8-bit sRGB colour. Deserializes from `[r, g, b]`, `"#rrggbb"` or a packed
/// `0xRRGGBB` integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr", into = "String")]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const fn from_hex(packed: u32) -> Self {
        Color([(packed >> 16) as u8, (packed >> 8) as u8, packed as u8])
    }

    pub fn to_rgb(self) -> Rgb {
        [
            self.0[0] as f32 / 255.0,
            self.0[1] as f32 / 255.0,
            self.0[2] as f32 / 255.0,
        ]
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Channels([u8; 3]),
    Packed(u32),
    Hex(String),
}

impl TryFrom<ColorRepr> for Color {
    type Error = String;

    fn try_from(repr: ColorRepr) -> std::result::Result<Self, String> {
        match repr {
            ColorRepr::Channels(c) => Ok(Color(c)),
            ColorRepr::Packed(p) if p <= 0xFF_FFFF => Ok(Color::from_hex(p)),
            ColorRepr::Packed(p) => Err(format!("colour {:#x} exceeds 0xFFFFFF", p)),
            ColorRepr::Hex(s) => {
                let digits = s.trim_start_matches('#');
                if digits.len() != 6 {
                    return Err(format!("expected #rrggbb, got {:?}", s));
                }
                u32::from_str_radix(digits, 16)
                    .map(Color::from_hex)
                    .map_err(|e| format!("bad colour {:?}: {}", s, e))
            }
        }
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        format!("#{:02x}{:02x}{:02x}", c.0[0], c.0[1], c.0[2])
    }
}

/// Threshold -> flat colour, used by the pixelized island mode.
pub type ColorTable = ClassificationMap<Color>;

/// Threshold -> biome name, used by the textured island mode.
pub type BiomeTable = ClassificationMap<String>;

/// Classify straight to an RGB raster.
pub fn colorize(field: &Tilemap<f32>, table: &ColorTable) -> Tilemap<Rgb> {
    field.map(|&v| table.lookup(v).to_rgb())
}
