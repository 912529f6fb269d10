//! Optional behavior interfaces and the per-type dispatch table.
//!
//! A tile type opts into a behavior by overriding the matching `as_*_mut`
//! accessor on [`crate::tile::Tile`]. The registry probes the stand-in once
//! at registration and caches the result as a [`CapabilitySet`]; host-facing
//! dispatch consults the set instead of re-probing per call.

use tessera_geom::{Aabb, Vec3};

use crate::descriptor::{BlockId, IconHandle, IconRegistrar};
use crate::grid::TilePos;
use crate::items::{Agent, ItemStack};
use crate::tile::Tile;

/// Placement veto and placement-time hooks.
pub trait Placeable {
    /// Whether the tile may be placed at its currently bound location.
    fn can_place_here(&mut self) -> bool {
        true
    }

    /// Whether the tile may be placed against the given face.
    fn can_place_on_side(&mut self, _side: i32) -> bool {
        self.can_place_here()
    }

    /// Invoked after the placing agent's stack has been applied.
    fn on_placed_by(&mut self, _agent: &Agent, _stack: &ItemStack) {}

    /// Invoked once the grid has committed the placement.
    fn on_post_placed(&mut self, _variant: u8) {}
}

/// Left-click (attack) handling.
pub trait LeftClick {
    fn on_left_click(&mut self, agent: &mut Agent);
}

/// Right-click (use) handling. Returns whether the interaction was consumed.
pub trait Activatable {
    fn on_activated(&mut self, agent: &mut Agent, side: i32, hit: Vec3) -> bool;
}

/// Reactions to changes in neighboring cells.
pub trait NeighborAware {
    fn on_neighbor_block_changed(&mut self, _block: BlockId) {}
    fn on_neighbor_tile_changed(&mut self, _pos: TilePos) {}
}

/// Per-instance explosion behavior.
pub trait ExplosionAware {
    /// Resistance against an explosion originating at `source`.
    fn explosion_resistance(&mut self, source: Vec3) -> f32;

    fn on_destroyed_by_explosion(&mut self) {}
}

/// Redstone power emission.
pub trait RedstoneSource {
    fn weak_power(&mut self, _side: i32) -> u8 {
        0
    }

    fn strong_power(&mut self, _side: i32) -> u8 {
        0
    }
}

/// Per-side, per-variant icon selection and atlas registration.
pub trait Textured {
    fn icon(&mut self, side: i32, variant: u8) -> Option<IconHandle>;

    fn register_icons(&mut self, _reg: &mut dyn IconRegistrar) {}
}

/// Custom collision volumes.
pub trait Collidable {
    /// Pushes every collision box intersecting `clip`, in world space.
    fn add_collision_boxes(&mut self, clip: Aabb, out: &mut Vec<Aabb>);
}

/// Render color multiplier.
pub trait Tinted {
    fn color_multiplier(&mut self) -> u32;
}

/// Cosmetic ticking on the viewing side.
pub trait DisplayTicking {
    fn random_display_tick(&mut self);
}

/// Bounds that depend on instance state.
pub trait DynamicBounds {
    /// Recomputed local-space bounds for the current state.
    fn recompute_bounds(&mut self) -> Aabb;
}

/// Custom pick-block result.
pub trait Pickable {
    fn pick_item(&mut self) -> Option<ItemStack>;
}

/// Rain accumulation.
pub trait RainAware {
    fn fill_with_rain(&mut self);
}

/// One bit per optional behavior.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Capability {
    Placeable = 0,
    LeftClick = 1,
    Activatable = 2,
    NeighborAware = 3,
    ExplosionAware = 4,
    RedstoneSource = 5,
    Textured = 6,
    Collidable = 7,
    Tinted = 8,
    DisplayTicking = 9,
    DynamicBounds = 10,
    Pickable = 11,
    RainAware = 12,
}

impl Capability {
    pub const ALL: [Capability; 13] = [
        Capability::Placeable,
        Capability::LeftClick,
        Capability::Activatable,
        Capability::NeighborAware,
        Capability::ExplosionAware,
        Capability::RedstoneSource,
        Capability::Textured,
        Capability::Collidable,
        Capability::Tinted,
        Capability::DisplayTicking,
        Capability::DynamicBounds,
        Capability::Pickable,
        Capability::RainAware,
    ];

    #[inline]
    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Bit mask of the capabilities one tile type implements.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CapabilitySet(u16);

impl CapabilitySet {
    pub const EMPTY: CapabilitySet = CapabilitySet(0);

    #[inline]
    pub fn has(self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    #[inline]
    pub fn with(self, cap: Capability) -> Self {
        CapabilitySet(self.0 | cap.bit())
    }

    pub fn len(self) -> u32 {
        self.0.count_ones()
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Resolves the set by asking each accessor once. Run against the
    /// stand-in at registration; capabilities are a property of the type,
    /// not of individual instances.
    pub fn probe(tile: &mut dyn Tile) -> CapabilitySet {
        let mut set = CapabilitySet::EMPTY;
        if tile.as_placeable_mut().is_some() {
            set = set.with(Capability::Placeable);
        }
        if tile.as_left_click_mut().is_some() {
            set = set.with(Capability::LeftClick);
        }
        if tile.as_activatable_mut().is_some() {
            set = set.with(Capability::Activatable);
        }
        if tile.as_neighbor_aware_mut().is_some() {
            set = set.with(Capability::NeighborAware);
        }
        if tile.as_explosion_aware_mut().is_some() {
            set = set.with(Capability::ExplosionAware);
        }
        if tile.as_redstone_source_mut().is_some() {
            set = set.with(Capability::RedstoneSource);
        }
        if tile.as_textured_mut().is_some() {
            set = set.with(Capability::Textured);
        }
        if tile.as_collidable_mut().is_some() {
            set = set.with(Capability::Collidable);
        }
        if tile.as_tinted_mut().is_some() {
            set = set.with(Capability::Tinted);
        }
        if tile.as_display_ticking_mut().is_some() {
            set = set.with(Capability::DisplayTicking);
        }
        if tile.as_dynamic_bounds_mut().is_some() {
            set = set.with(Capability::DynamicBounds);
        }
        if tile.as_pickable_mut().is_some() {
            set = set.with(Capability::Pickable);
        }
        if tile.as_rain_aware_mut().is_some() {
            set = set.with(Capability::RainAware);
        }
        set
    }
}
