//! Host-facing block facade. One `TileBlock` stands between the host
//! engine and all instances of one tile type: it resolves each call to the
//! placed instance at the coordinates, or temporarily binds the type's
//! stand-in when no matching instance is there.
#![forbid(unsafe_code)]

use std::cell::RefMut;
use std::rc::Rc;

use tessera_geom::{Aabb, Vec3};
use tessera_tiles::{
    Agent, BlockId, Capability, CapabilitySet, Collidable, DisplayTicking, DynamicBounds,
    ExplosionAware, GridCell, IconHandle, IconRegistrar, ItemStack, LeftClick, NeighborAware,
    PacketSink, Pickable, Placeable, RainAware, RedstoneSource, Textured, Tile, TileCell,
    TilePos, TileType, Tinted, WorldRef, dispatch_activation, run_scheduled_update,
    send_description,
};

pub use tessera_geom::{Point2, face_point};

/// Scope guard around one resolved dispatch target. Holding one for a
/// stand-in means the stand-in carries borrowed coordinates; dropping it
/// releases them on every exit path, including unwinding.
pub struct BoundTile {
    cell: TileCell,
    release: bool,
}

impl BoundTile {
    /// The resolved instance. Panics if something is already borrowing it;
    /// overlapping dispatch through one cell is a framework misuse.
    pub fn tile_mut(&self) -> RefMut<'_, dyn Tile> {
        match self.cell.try_borrow_mut() {
            Ok(tile) => tile,
            Err(_) => panic!("tile instance is already borrowed during dispatch"),
        }
    }

    /// Whether this dispatch landed on the type's stand-in.
    pub fn is_standin(&self) -> bool {
        self.release
    }
}

impl Drop for BoundTile {
    fn drop(&mut self) {
        if self.release {
            self.cell.borrow_mut().state_mut().clear_context();
        }
    }
}

/// The facade for one registered tile type.
pub struct TileBlock {
    id: BlockId,
    ty: Rc<TileType>,
}

impl TileBlock {
    /// Wires the descriptor to its block identity. Constructing two facades
    /// for one descriptor panics; identity is assigned exactly once.
    pub fn new(id: BlockId, ty: Rc<TileType>) -> Self {
        ty.wire_block(id);
        Self { id, ty }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn tile_type(&self) -> &Rc<TileType> {
        &self.ty
    }

    pub fn caps(&self) -> CapabilitySet {
        self.ty.caps()
    }

    pub fn supports(&self, cap: Capability) -> bool {
        self.ty.caps().has(cap)
    }

    /// The placed instance at `pos`, if it belongs to this type.
    fn real_tile(&self, world: &WorldRef, pos: TilePos) -> Option<TileCell> {
        let cell = world.view()?.tile_at(pos)?;
        let matches = Rc::ptr_eq(cell.borrow().state().tile_type(), &self.ty);
        matches.then_some(cell)
    }

    /// Resolves a dispatch target: the matching placed instance when one is
    /// there, otherwise the stand-in bound to the caller's coordinates.
    pub fn resolve(&self, world: &WorldRef, pos: TilePos) -> BoundTile {
        if let Some(cell) = self.real_tile(world, pos) {
            return BoundTile {
                cell,
                release: false,
            };
        }
        let cell = self.ty.standin().clone();
        match cell.try_borrow_mut() {
            Ok(mut standin) => {
                standin
                    .state_mut()
                    .bind_context(Some(world.clone()), pos);
            }
            Err(_) => panic!(
                "stand-in for '{}' is busy; overlapping dispatch is not supported",
                self.ty.name
            ),
        }
        BoundTile {
            cell,
            release: true,
        }
    }

    // Placement.

    /// Creates an instance, commits it to the grid, and attaches it.
    pub fn place(&self, world: &WorldRef, pos: TilePos, variant: u8) -> Option<TileCell> {
        let grid = world.full()?;
        let tile = self.ty.create_instance(variant);
        grid.place(
            pos,
            GridCell {
                block: self.id,
                variant,
                opaque: self.ty.opaque,
                tile: Some(tile.clone()),
            },
        );
        self.on_added(world, pos);
        Some(tile)
    }

    /// Attaches the placed instance once the grid has committed it.
    pub fn on_added(&self, world: &WorldRef, pos: TilePos) {
        if let Some(cell) = self.real_tile(world, pos) {
            let mut tile = cell.borrow_mut();
            tile.state_mut().attach(world.clone(), pos);
            tile.on_added();
        }
    }

    pub fn can_place_at(&self, world: &WorldRef, pos: TilePos) -> bool {
        if self.supports(Capability::Placeable) {
            let bound = self.resolve(world, pos);
            let mut tile = bound.tile_mut();
            if let Some(p) = tile.as_placeable_mut() {
                return p.can_place_here();
            }
        }
        world.view().is_some_and(|g| g.is_replaceable(pos))
    }

    pub fn can_place_on_side(&self, world: &WorldRef, pos: TilePos, side: i32) -> bool {
        if self.supports(Capability::Placeable) {
            let bound = self.resolve(world, pos);
            let mut tile = bound.tile_mut();
            if let Some(p) = tile.as_placeable_mut() {
                return p.can_place_on_side(side);
            }
        }
        self.can_place_at(world, pos)
    }

    pub fn on_placed_by(&self, world: &WorldRef, pos: TilePos, agent: &Agent, stack: &ItemStack) {
        if !self.supports(Capability::Placeable) {
            return;
        }
        let bound = self.resolve(world, pos);
        let mut tile = bound.tile_mut();
        if let Some(p) = tile.as_placeable_mut() {
            p.on_placed_by(agent, stack);
        }
    }

    pub fn on_post_placed(&self, world: &WorldRef, pos: TilePos, variant: u8) {
        if !self.supports(Capability::Placeable) {
            return;
        }
        let bound = self.resolve(world, pos);
        let mut tile = bound.tile_mut();
        if let Some(p) = tile.as_placeable_mut() {
            p.on_post_placed(variant);
        }
    }

    // Removal.

    /// Full removal sequence: lifecycle hooks, detach, then the grid cell.
    pub fn break_block(&self, world: &WorldRef, pos: TilePos) {
        if let Some(cell) = self.real_tile(world, pos) {
            let mut tile = cell.borrow_mut();
            tile.on_removed();
            tile.on_leaving_world();
            tile.state_mut().detach();
        }
        if let Some(grid) = world.full() {
            grid.set_to_empty(pos);
        }
    }

    /// Player-initiated removal. Goes through the instance so types can
    /// veto or redirect it.
    pub fn removed_by_player(&self, world: &WorldRef, pos: TilePos) -> bool {
        let bound = self.resolve(world, pos);
        let removed = bound.tile_mut().remove_by_player();
        removed
    }

    // Explosions.

    /// Type-level resistance, used when no coordinates are in play.
    pub fn explosion_resistance(&self) -> f32 {
        self.ty.resistance / 5.0
    }

    pub fn explosion_resistance_at(&self, world: &WorldRef, pos: TilePos, source: Vec3) -> f32 {
        let bound = self.resolve(world, pos);
        let mut tile = bound.tile_mut();
        match tile.as_explosion_aware_mut() {
            Some(e) => e.explosion_resistance(source),
            None => tile.explosion_resistance(),
        }
    }

    pub fn on_destroyed_by_explosion(&self, world: &WorldRef, pos: TilePos) {
        if !self.supports(Capability::ExplosionAware) {
            return;
        }
        let bound = self.resolve(world, pos);
        let mut tile = bound.tile_mut();
        if let Some(e) = tile.as_explosion_aware_mut() {
            e.on_destroyed_by_explosion();
        }
    }

    // Interaction.

    pub fn on_clicked(&self, world: &WorldRef, pos: TilePos, agent: &mut Agent) {
        if !self.supports(Capability::LeftClick) {
            return;
        }
        let bound = self.resolve(world, pos);
        let mut tile = bound.tile_mut();
        if let Some(lc) = tile.as_left_click_mut() {
            lc.on_left_click(agent);
        }
    }

    /// Right-click entry point. The wrench flow runs even for types without
    /// an activation behavior.
    pub fn on_activated(
        &self,
        world: &WorldRef,
        pos: TilePos,
        agent: &mut Agent,
        side: i32,
        hit: Vec3,
    ) -> bool {
        let bound = self.resolve(world, pos);
        let consumed = dispatch_activation(&mut *bound.tile_mut(), agent, side, hit);
        consumed
    }

    // Neighbors.

    pub fn on_neighbor_block_changed(&self, world: &WorldRef, pos: TilePos, block: BlockId) {
        if !self.supports(Capability::NeighborAware) {
            return;
        }
        let bound = self.resolve(world, pos);
        let mut tile = bound.tile_mut();
        if let Some(n) = tile.as_neighbor_aware_mut() {
            n.on_neighbor_block_changed(block);
        }
    }

    pub fn on_neighbor_tile_changed(&self, world: &WorldRef, pos: TilePos, neighbor: TilePos) {
        if !self.supports(Capability::NeighborAware) {
            return;
        }
        let bound = self.resolve(world, pos);
        let mut tile = bound.tile_mut();
        if let Some(n) = tile.as_neighbor_aware_mut() {
            n.on_neighbor_tile_changed(neighbor);
        }
    }

    // Ticking.

    /// One scheduled update. A placed instance runs the full lifecycle; a
    /// stand-in only gets the plain update hook, its counters never move.
    pub fn tick(&self, world: &WorldRef, pos: TilePos) {
        let bound = self.resolve(world, pos);
        let mut tile = bound.tile_mut();
        if bound.is_standin() {
            tile.update();
        } else {
            run_scheduled_update(&mut *tile);
        }
    }

    pub fn tick_rate(&self, world: &WorldRef, pos: TilePos) -> u32 {
        let bound = self.resolve(world, pos);
        let rate = bound.tile_mut().tick_rate();
        rate
    }

    pub fn random_display_tick(&self, world: &WorldRef, pos: TilePos) {
        if !self.supports(Capability::DisplayTicking) {
            return;
        }
        let bound = self.resolve(world, pos);
        let mut tile = bound.tile_mut();
        if let Some(d) = tile.as_display_ticking_mut() {
            d.random_display_tick();
        }
    }

    // Drops and picking.

    pub fn quantity_dropped(&self, world: &WorldRef, pos: TilePos) -> u32 {
        let bound = self.resolve(world, pos);
        let n = bound.tile_mut().quantity_dropped();
        n
    }

    pub fn drops(&self, world: &WorldRef, pos: TilePos) -> Vec<ItemStack> {
        let bound = self.resolve(world, pos);
        let drops = bound.tile_mut().drops();
        drops
    }

    pub fn pick_block(&self, world: &WorldRef, pos: TilePos) -> Option<ItemStack> {
        if self.supports(Capability::Pickable) {
            let bound = self.resolve(world, pos);
            let mut tile = bound.tile_mut();
            if let Some(p) = tile.as_pickable_mut() {
                return p.pick_item();
            }
        }
        let variant = world.view().map(|g| g.variant_at(pos)).unwrap_or(0);
        Some(ItemStack::new(self.ty.unlocalized_name(), 1, variant))
    }

    // Geometry.

    /// Collision boxes intersecting `clip`, in world space.
    pub fn collision_boxes(&self, world: &WorldRef, pos: TilePos, clip: Aabb) -> Vec<Aabb> {
        if self.supports(Capability::Collidable) {
            let bound = self.resolve(world, pos);
            let mut tile = bound.tile_mut();
            if let Some(c) = tile.as_collidable_mut() {
                let mut out = Vec::new();
                c.add_collision_boxes(clip, &mut out);
                return out;
            }
        }
        let base = self.ty.bounds.offset(pos.x, pos.y, pos.z);
        if base.intersects(&clip) {
            vec![base]
        } else {
            Vec::new()
        }
    }

    /// Selection outline, in world space.
    pub fn selection_box(&self, world: &WorldRef, pos: TilePos) -> Aabb {
        self.recompute_bounds(world, pos).offset(pos.x, pos.y, pos.z)
    }

    /// Current local-space bounds for the instance at `pos`.
    pub fn recompute_bounds(&self, world: &WorldRef, pos: TilePos) -> Aabb {
        if self.supports(Capability::DynamicBounds) {
            let bound = self.resolve(world, pos);
            let mut tile = bound.tile_mut();
            if let Some(d) = tile.as_dynamic_bounds_mut() {
                return d.recompute_bounds();
            }
        }
        self.ty.bounds
    }

    pub fn is_side_solid(&self, world: &WorldRef, pos: TilePos, side: i32) -> bool {
        let bound = self.resolve(world, pos);
        let solid = bound.tile_mut().is_solid(side);
        solid
    }

    pub fn light_value(&self, world: &WorldRef, pos: TilePos) -> u8 {
        let bound = self.resolve(world, pos);
        let light = bound.tile_mut().light_value();
        light
    }

    // Rendering.

    pub fn is_opaque(&self) -> bool {
        self.ty.opaque
    }

    pub fn render_as_standard(&self) -> bool {
        self.ty.render_standard()
    }

    pub fn render_pass(&self) -> u8 {
        self.ty.render_pass
    }

    pub fn should_side_be_rendered(&self, world: &WorldRef, pos: TilePos, side: i32) -> bool {
        let bound = self.resolve(world, pos);
        let visible = bound.tile_mut().should_side_be_rendered(side);
        visible
    }

    /// Type-level icon query for inventory rendering. No coordinates are
    /// in play, so the stand-in answers without a context binding.
    pub fn icon(&self, side: i32, variant: u8) -> Option<IconHandle> {
        if !self.supports(Capability::Textured) {
            return None;
        }
        let mut standin = self.ty.standin().borrow_mut();
        standin
            .as_textured_mut()
            .and_then(|t| t.icon(side, variant))
    }

    pub fn icon_at(&self, world: &WorldRef, pos: TilePos, side: i32) -> Option<IconHandle> {
        if !self.supports(Capability::Textured) {
            return None;
        }
        let variant = world.view().map(|g| g.variant_at(pos)).unwrap_or(0);
        let bound = self.resolve(world, pos);
        let mut tile = bound.tile_mut();
        let icon = tile.as_textured_mut().and_then(|t| t.icon(side, variant));
        icon
    }

    /// One-time atlas registration for this type.
    pub fn register_icons(&self, reg: &mut dyn IconRegistrar) {
        if self.supports(Capability::Textured) {
            let mut standin = self.ty.standin().borrow_mut();
            if let Some(t) = standin.as_textured_mut() {
                t.register_icons(reg);
                return;
            }
        }
        let key = self.ty.texture_key();
        let handle = reg.register_icon(&key);
        self.ty.put_icon(key, handle);
    }

    pub fn color_multiplier(&self, world: &WorldRef, pos: TilePos) -> u32 {
        if self.supports(Capability::Tinted) {
            let bound = self.resolve(world, pos);
            let mut tile = bound.tile_mut();
            if let Some(t) = tile.as_tinted_mut() {
                return t.color_multiplier();
            }
        }
        0x00FF_FFFF
    }

    pub fn render_color(&self, _variant: u8) -> u32 {
        0x00FF_FFFF
    }

    /// Variants this type exposes in creative listings.
    pub fn sub_types(&self) -> Vec<u8> {
        vec![0]
    }

    /// Runs the instance's custom renderer. The first failure logs once and
    /// permanently downgrades the type to standard-volume rendering.
    pub fn render_dynamic(&self, world: &WorldRef, pos: TilePos) -> bool {
        if self.ty.dynamic_render_failed() {
            return false;
        }
        let bound = self.resolve(world, pos);
        let result = bound.tile_mut().render_dynamic();
        match result {
            Ok(()) => true,
            Err(err) => {
                log::warn!(
                    target: "render",
                    "dynamic render failed for '{}', using standard volume from now on: {err}",
                    self.ty.name
                );
                self.ty.downgrade_to_standard_render();
                false
            }
        }
    }

    // Redstone.

    pub fn can_provide_power(&self) -> bool {
        self.ty.emits_redstone
    }

    pub fn weak_power(&self, world: &WorldRef, pos: TilePos, side: i32) -> u8 {
        if !self.supports(Capability::RedstoneSource) {
            return 0;
        }
        let bound = self.resolve(world, pos);
        let mut tile = bound.tile_mut();
        match tile.as_redstone_source_mut() {
            Some(r) => r.weak_power(side),
            None => 0,
        }
    }

    pub fn strong_power(&self, world: &WorldRef, pos: TilePos, side: i32) -> u8 {
        if !self.supports(Capability::RedstoneSource) {
            return 0;
        }
        let bound = self.resolve(world, pos);
        let mut tile = bound.tile_mut();
        match tile.as_redstone_source_mut() {
            Some(r) => r.strong_power(side),
            None => 0,
        }
    }

    // Weather and sync.

    pub fn fill_with_rain(&self, world: &WorldRef, pos: TilePos) {
        if !self.supports(Capability::RainAware) {
            return;
        }
        let bound = self.resolve(world, pos);
        let mut tile = bound.tile_mut();
        if let Some(r) = tile.as_rain_aware_mut() {
            r.fill_with_rain();
        }
    }

    /// Pushes the placed instance's description to viewers in range.
    pub fn describe_to(&self, world: &WorldRef, pos: TilePos, sink: &mut dyn PacketSink) {
        if let Some(cell) = self.real_tile(world, pos) {
            send_description(&*cell.borrow(), sink);
        }
    }
}
