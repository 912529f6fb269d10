//! Per-type tile descriptors: the shared configuration record every
//! instance of a type points back to, plus the type's stand-in instance.

use std::cell::{Cell, OnceCell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use tessera_geom::Aabb;

use crate::capability::CapabilitySet;
use crate::grid::TileCell;

/// Unique identifier for a registered tile type.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct BlockId(pub u16);

/// The mod a type belongs to. `prefix` goes before resource names
/// ("demo:"), `domain` locates textures and localization ("demo/").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModInfo {
    pub prefix: String,
    pub domain: String,
}

impl ModInfo {
    pub fn new(prefix: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            domain: domain.into(),
        }
    }
}

/// Coarse material family used for solidity and sound defaults.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MaterialKind {
    Air,
    #[default]
    Clay,
    Stone,
    Wood,
    Glass,
    Cloth,
    Liquid,
}

impl MaterialKind {
    pub fn is_solid(self) -> bool {
        !matches!(self, MaterialKind::Air | MaterialKind::Liquid)
    }

    pub fn from_key(key: &str) -> MaterialKind {
        match key {
            "air" => MaterialKind::Air,
            "stone" => MaterialKind::Stone,
            "wood" => MaterialKind::Wood,
            "glass" => MaterialKind::Glass,
            "cloth" => MaterialKind::Cloth,
            "liquid" => MaterialKind::Liquid,
            _ => MaterialKind::Clay,
        }
    }
}

/// Step sound hint forwarded to the host audio layer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum StepSound {
    #[default]
    Stone,
    Wood,
    Gravel,
    Glass,
    Cloth,
}

impl StepSound {
    pub fn from_key(key: &str) -> StepSound {
        match key {
            "wood" => StepSound::Wood,
            "gravel" => StepSound::Gravel,
            "glass" => StepSound::Glass,
            "cloth" => StepSound::Cloth,
            _ => StepSound::Stone,
        }
    }
}

/// Opaque handle the rendering collaborator returns for a registered icon.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct IconHandle(pub u32);

/// Texture-atlas registration callback, invoked once per type during the
/// host's atlas build.
pub trait IconRegistrar {
    fn register_icon(&mut self, name: &str) -> IconHandle;
}

/// Creates a fresh instance for a type. The descriptor is injected into
/// every construction; there is no global type -> descriptor lookup.
pub type TileFactory = Box<dyn Fn(&Rc<TileType>, u8) -> TileCell>;

/// Shared, per-type configuration record. Identity and physical fields are
/// immutable after registration; the icon map is populated exactly once
/// during the atlas phase; `block` is back-filled by the first facade that
/// references this descriptor.
pub struct TileType {
    pub name: String,
    pub mod_info: ModInfo,
    pub material: MaterialKind,
    pub hardness: f32,
    pub resistance: f32,
    pub emits_redstone: bool,
    pub opaque: bool,
    pub step_sound: StepSound,
    pub bounds: Aabb,
    pub render_pass: u8,
    texture: Option<String>,
    render_standard: Cell<bool>,
    dynamic_render_failed: Cell<bool>,
    icons: RefCell<HashMap<String, IconHandle>>,
    block: OnceCell<BlockId>,
    standin: OnceCell<TileCell>,
    caps: Cell<CapabilitySet>,
    factory: TileFactory,
}

impl TileType {
    /// Resource name the host registers this type under.
    pub fn unlocalized_name(&self) -> String {
        format!("{}{}", self.mod_info.prefix, self.name)
    }

    /// Key used for the main texture. Falls back to a loud placeholder
    /// name so a missing texture is visible instead of silent.
    pub fn texture_key(&self) -> String {
        match &self.texture {
            Some(t) => format!("{}{}", self.mod_info.domain, t),
            None => format!(
                "MISSING_ICON_TILE_{}_{}",
                self.block.get().map(|b| b.0).unwrap_or(0),
                self.name
            ),
        }
    }

    pub fn render_standard(&self) -> bool {
        self.render_standard.get()
    }

    pub fn dynamic_render_failed(&self) -> bool {
        self.dynamic_render_failed.get()
    }

    /// Permanently falls back to standard-volume rendering for the rest of
    /// the session. Called after the first dynamic-render failure.
    pub fn downgrade_to_standard_render(&self) {
        self.dynamic_render_failed.set(true);
        self.render_standard.set(true);
    }

    pub fn icon(&self, name: &str) -> Option<IconHandle> {
        self.icons.borrow().get(name).copied()
    }

    /// Stores an icon resolved during the one-time atlas phase.
    pub fn put_icon(&self, name: impl Into<String>, handle: IconHandle) {
        self.icons.borrow_mut().insert(name.into(), handle);
    }

    /// One-time wiring performed by the first facade constructed for this
    /// descriptor. Must happen before any instance reads the identity.
    pub fn wire_block(&self, id: BlockId) {
        if self.block.set(id).is_err() {
            panic!(
                "tile type '{}' already wired to a block identity",
                self.name
            );
        }
    }

    pub fn block_id(&self) -> BlockId {
        *self.block.get().unwrap_or_else(|| {
            panic!(
                "tile type '{}' read before its facade wired the block identity",
                self.name
            )
        })
    }

    pub fn is_wired(&self) -> bool {
        self.block.get().is_some()
    }

    /// The shared stand-in instance answering type-level queries.
    pub fn standin(&self) -> &TileCell {
        self.standin
            .get()
            .unwrap_or_else(|| panic!("tile type '{}' used before registration", self.name))
    }

    /// Capabilities of the concrete instance type, resolved once at
    /// registration.
    pub fn caps(&self) -> CapabilitySet {
        self.caps.get()
    }

    pub fn create_instance(self: &Rc<Self>, variant: u8) -> TileCell {
        (self.factory)(self, variant)
    }

    /// Registration-time completion: creates the stand-in and resolves the
    /// capability table. Only the registry calls this, exactly once.
    pub(crate) fn finish_registration(self: &Rc<Self>) {
        let standin = self.create_instance(0);
        standin.borrow_mut().state_mut().mark_standin();
        let caps = CapabilitySet::probe(&mut *standin.borrow_mut());
        self.caps.set(caps);
        if self.standin.set(standin).is_err() {
            panic!("tile type '{}' registered twice", self.name);
        }
    }
}

/// Builder for descriptors. `build` enforces the registration-time
/// preconditions and panics on violation: a bad type definition is a
/// programming error, not a runtime condition.
pub struct TileTypeBuilder {
    name: String,
    mod_info: ModInfo,
    material: MaterialKind,
    hardness: f32,
    resistance: f32,
    emits_redstone: bool,
    opaque: bool,
    step_sound: StepSound,
    bounds: Aabb,
    render_pass: u8,
    render_standard: bool,
    texture: Option<String>,
    factory: Option<TileFactory>,
}

impl TileTypeBuilder {
    pub fn new(name: impl Into<String>, mod_info: ModInfo) -> Self {
        Self {
            name: name.into(),
            mod_info,
            material: MaterialKind::default(),
            hardness: 1.0,
            resistance: 1.0,
            emits_redstone: false,
            opaque: false,
            step_sound: StepSound::default(),
            bounds: Aabb::unit(),
            render_pass: 0,
            render_standard: true,
            texture: None,
            factory: None,
        }
    }

    pub fn material(mut self, material: MaterialKind) -> Self {
        self.material = material;
        self
    }

    pub fn hardness(mut self, hardness: f32) -> Self {
        self.hardness = hardness;
        self
    }

    pub fn resistance(mut self, resistance: f32) -> Self {
        self.resistance = resistance;
        self
    }

    pub fn emits_redstone(mut self, v: bool) -> Self {
        self.emits_redstone = v;
        self
    }

    pub fn opaque(mut self, v: bool) -> Self {
        self.opaque = v;
        self
    }

    pub fn step_sound(mut self, s: StepSound) -> Self {
        self.step_sound = s;
        self
    }

    pub fn bounds(mut self, bounds: Aabb) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn render_pass(mut self, pass: u8) -> Self {
        self.render_pass = pass;
        self
    }

    pub fn render_standard(mut self, v: bool) -> Self {
        self.render_standard = v;
        self
    }

    pub fn texture(mut self, name: impl Into<String>) -> Self {
        self.texture = Some(name.into());
        self
    }

    pub fn factory(mut self, factory: TileFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub(crate) fn build(self, default_factory: TileFactory) -> TileType {
        if self.name.is_empty() {
            panic!("tile type registered with an empty name");
        }
        if !self.bounds.is_valid() {
            panic!(
                "tile type '{}' registered with inverted bounds {:?}",
                self.name, self.bounds
            );
        }
        TileType {
            name: self.name,
            mod_info: self.mod_info,
            material: self.material,
            hardness: self.hardness,
            resistance: self.resistance,
            emits_redstone: self.emits_redstone,
            opaque: self.opaque,
            step_sound: self.step_sound,
            bounds: self.bounds,
            render_pass: self.render_pass,
            texture: self.texture,
            render_standard: Cell::new(self.render_standard),
            dynamic_render_failed: Cell::new(false),
            icons: RefCell::new(HashMap::new()),
            block: OnceCell::new(),
            standin: OnceCell::new(),
            caps: Cell::new(CapabilitySet::EMPTY),
            factory: self.factory.unwrap_or(default_factory),
        }
    }
}
