//! The tile type registry: assigns identities, completes descriptors, and
//! loads declarations from TOML.

use std::collections::HashMap;
use std::error::Error;
use std::path::Path;
use std::rc::Rc;

use crate::config::TilesConfig;
use crate::descriptor::{
    BlockId, MaterialKind, ModInfo, StepSound, TileType, TileTypeBuilder,
};
use crate::tile::basic_factory;

/// All registered tile types, addressable by identity or name.
#[derive(Default)]
pub struct TileRegistry {
    types: Vec<Rc<TileType>>,
    by_name: HashMap<String, BlockId>,
}

impl TileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one type: assigns the next identity, creates the stand-in,
    /// and resolves the capability table. Panics on a duplicate name; two
    /// types sharing a name is a setup error.
    pub fn register(&mut self, builder: TileTypeBuilder) -> BlockId {
        let ty = Rc::new(builder.build(basic_factory()));
        if self.by_name.contains_key(&ty.name) {
            panic!("tile type '{}' registered twice", ty.name);
        }
        let id = BlockId(self.types.len() as u16);
        ty.finish_registration();
        log::info!(
            target: "tiles",
            "registered tile type '{}' as id {} ({} capabilities)",
            ty.unlocalized_name(),
            id.0,
            ty.caps().len()
        );
        self.by_name.insert(ty.name.clone(), id);
        self.types.push(ty);
        id
    }

    pub fn get(&self, id: BlockId) -> Option<&Rc<TileType>> {
        self.types.get(id.0 as usize)
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Rc<TileType>> {
        self.id_by_name(name).and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &Rc<TileType>)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, ty)| (BlockId(i as u16), ty))
    }

    /// Builds a registry from parsed declarations. Config problems are data
    /// errors and come back as `Err`, not panics.
    pub fn from_configs(cfg: &TilesConfig) -> Result<Self, Box<dyn Error>> {
        let mod_info = ModInfo::new(cfg.mod_def.prefix.clone(), cfg.mod_def.domain.clone());
        let mut seen: HashMap<&str, ()> = HashMap::new();
        for def in &cfg.tiles {
            if def.name.is_empty() {
                return Err("tile declared with an empty name".into());
            }
            if seen.insert(def.name.as_str(), ()).is_some() {
                return Err(format!("tile '{}' declared twice", def.name).into());
            }
        }

        let mut reg = TileRegistry::new();
        for def in &cfg.tiles {
            let mut builder = TileTypeBuilder::new(def.name.clone(), mod_info.clone());
            if let Some(m) = &def.material {
                builder = builder.material(MaterialKind::from_key(m));
            }
            if let Some(h) = def.hardness {
                builder = builder.hardness(h);
            }
            if let Some(r) = def.resistance {
                builder = builder.resistance(r);
            }
            if let Some(o) = def.opaque {
                builder = builder.opaque(o);
            }
            if let Some(e) = def.emits_redstone {
                builder = builder.emits_redstone(e);
            }
            if let Some(s) = &def.step_sound {
                builder = builder.step_sound(StepSound::from_key(s));
            }
            if let Some(t) = &def.texture {
                builder = builder.texture(t.clone());
            }
            if let Some(p) = def.render_pass {
                builder = builder.render_pass(p);
            }
            if let Some(rs) = def.render_standard {
                builder = builder.render_standard(rs);
            }
            if let Some(b) = &def.bounds {
                let aabb = b
                    .to_aabb()
                    .map_err(|e| format!("tile '{}': {e}", def.name))?;
                builder = builder.bounds(aabb);
            }
            reg.register(builder);
        }
        log::info!(target: "tiles", "loaded {} tile types for mod '{}'", reg.len(), mod_info.prefix);
        Ok(reg)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: TilesConfig = toml::from_str(s)?;
        Self::from_configs(&cfg)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, Box<dyn Error>> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("read {}: {e}", path.display()))?;
        Self::from_toml_str(&text)
    }
}
