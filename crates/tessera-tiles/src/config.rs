//! TOML schema for declaring tile types.

use serde::Deserialize;
use tessera_geom::{Aabb, Vec3};

/// Root of a tile definition file.
#[derive(Debug, Clone, Deserialize)]
pub struct TilesConfig {
    #[serde(rename = "mod")]
    pub mod_def: ModDef,
    #[serde(default)]
    pub tiles: Vec<TileDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModDef {
    pub prefix: String,
    pub domain: String,
}

/// One declared tile type. Missing fields take the registration defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct TileDef {
    pub name: String,
    pub material: Option<String>,
    pub hardness: Option<f32>,
    pub resistance: Option<f32>,
    pub opaque: Option<bool>,
    pub emits_redstone: Option<bool>,
    pub step_sound: Option<String>,
    pub texture: Option<String>,
    pub render_pass: Option<u8>,
    pub render_standard: Option<bool>,
    pub bounds: Option<BoundsDef>,
}

/// Bounds are either a named shape or an explicit min/max pair.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BoundsDef {
    Named(String),
    MinMax { min: [f32; 3], max: [f32; 3] },
}

impl BoundsDef {
    pub fn to_aabb(&self) -> Result<Aabb, String> {
        match self {
            BoundsDef::Named(name) => match name.as_str() {
                "full" => Ok(Aabb::unit()),
                "slab" => Ok(Aabb::new(Vec3::ZERO, Vec3::new(1.0, 0.5, 1.0))),
                "carpet" => Ok(Aabb::new(Vec3::ZERO, Vec3::new(1.0, 0.0625, 1.0))),
                other => Err(format!("unknown bounds shape '{other}'")),
            },
            BoundsDef::MinMax { min, max } => {
                let aabb = Aabb::new(
                    Vec3::new(min[0], min[1], min[2]),
                    Vec3::new(max[0], max[1], max[2]),
                );
                if aabb.is_valid() {
                    Ok(aabb)
                } else {
                    Err(format!("inverted bounds: min {min:?} max {max:?}"))
                }
            }
        }
    }
}
