//! Stateful tile instances: the `Tile` trait every concrete type
//! implements, the embedded `TileState`, and the free functions that run
//! the shared lifecycle (scheduled updates, persistence, interaction
//! dispatch, description sync).

use std::cell::RefCell;
use std::error::Error;
use std::rc::Rc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tessera_geom::{Face, Vec3};

use crate::capability::{
    Activatable, Collidable, DisplayTicking, DynamicBounds, ExplosionAware, LeftClick,
    NeighborAware, Pickable, Placeable, RainAware, RedstoneSource, Textured, Tinted,
};
use crate::descriptor::{IconHandle, IconRegistrar, TileFactory, TileType};
use crate::grid::{GridMut, GridView, TileCell, TilePos, WorldRef};
use crate::items::{Agent, ItemStack, ViewerId};
use crate::net::{DescribePayload, PacketSink, PacketTarget};
use crate::tag::TagCompound;

/// Lifetime counters start here: first maintenance fires 200 ticks after
/// attachment, later ones on the randomized interval.
pub const INITIAL_MAINTENANCE_INTERVAL: u64 = 200;

/// Viewers within this radius of a tile receive its descriptions.
pub const DESCRIPTION_RADIUS: f32 = 64.0;

/// The per-instance state every tile embeds. Owns the back-pointer to the
/// descriptor, the location binding, and the lifetime counters.
pub struct TileState {
    ty: Rc<TileType>,
    pub variant: u8,
    pos: TilePos,
    world: Option<WorldRef>,
    /// Completed scheduled updates. Zero means the first tick is pending.
    pub ticks: u64,
    maintenance_interval: u64,
    standin: bool,
    bound: bool,
    detached: bool,
    redraw_requested: bool,
    pub viewers: Vec<ViewerId>,
    rng: SmallRng,
}

impl TileState {
    pub fn new(ty: Rc<TileType>, variant: u8) -> Self {
        Self {
            ty,
            variant,
            pos: TilePos::UNBOUND,
            world: None,
            ticks: 0,
            maintenance_interval: INITIAL_MAINTENANCE_INTERVAL,
            standin: false,
            bound: false,
            detached: false,
            redraw_requested: false,
            viewers: Vec::new(),
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn tile_type(&self) -> &Rc<TileType> {
        &self.ty
    }

    pub fn pos(&self) -> TilePos {
        self.pos
    }

    pub fn is_standin(&self) -> bool {
        self.standin
    }

    pub(crate) fn mark_standin(&mut self) {
        self.standin = true;
    }

    pub fn is_attached(&self) -> bool {
        self.world.is_some() && !self.standin
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Binds a placed instance to its permanent location.
    pub fn attach(&mut self, world: WorldRef, pos: TilePos) {
        if self.standin {
            panic!(
                "stand-in for '{}' cannot be attached to the grid",
                self.ty.name
            );
        }
        self.world = Some(world);
        self.pos = pos;
        self.detached = false;
    }

    /// Severs the location binding when the tile leaves the grid.
    pub fn detach(&mut self) {
        self.world = None;
        self.pos = TilePos::UNBOUND;
        self.detached = true;
    }

    /// Temporarily binds context onto a stand-in for one dispatch. Fails
    /// loudly on re-entrant binding rather than silently clobbering the
    /// coordinates of the outer call.
    pub fn bind_context(&mut self, world: Option<WorldRef>, pos: TilePos) {
        if self.bound {
            panic!(
                "stand-in for '{}' is already bound at {:?}; nested dispatch through one stand-in is not supported",
                self.ty.name, self.pos
            );
        }
        self.bound = true;
        self.world = world;
        self.pos = pos;
    }

    /// Releases a temporary binding.
    pub fn clear_context(&mut self) {
        self.bound = false;
        self.world = None;
        self.pos = TilePos::UNBOUND;
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn world(&self) -> Option<&WorldRef> {
        self.world.as_ref()
    }

    /// Read access to the bound grid, if the handle is still alive.
    pub fn grid(&self) -> Option<Rc<dyn GridView>> {
        self.world.as_ref().and_then(|w| w.view())
    }

    /// Mutable access to the bound grid; `None` under a read-only binding.
    pub fn grid_mut(&self) -> Option<Rc<dyn GridMut>> {
        self.world.as_ref().and_then(|w| w.full())
    }

    pub fn maintenance_interval(&self) -> u64 {
        self.maintenance_interval
    }

    pub fn set_maintenance_interval(&mut self, interval: u64) {
        assert!(interval > 0, "maintenance interval must be positive");
        self.maintenance_interval = interval;
    }

    /// Next randomized maintenance interval, in [100, 2100).
    pub fn draw_maintenance_interval(&mut self) -> u64 {
        100 + self.rng.gen_range(0..2000)
    }

    pub fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }

    /// Consumes the pending redraw flag, returning whether one was set.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    pub fn add_viewer(&mut self, viewer: ViewerId) {
        if !self.viewers.contains(&viewer) {
            self.viewers.push(viewer);
        }
    }

    pub fn remove_viewer(&mut self, viewer: ViewerId) {
        self.viewers.retain(|v| *v != viewer);
    }
}

/// A stateful tile instance. Concrete types embed a [`TileState`], override
/// the hooks they care about, and surface optional behaviors through the
/// `as_*_mut` accessors.
pub trait Tile {
    fn state(&self) -> &TileState;
    fn state_mut(&mut self) -> &mut TileState;

    // Lifecycle hooks, invoked by the grid and the scheduler.

    /// Runs once, on the first scheduled update after attachment.
    fn first_tick(&mut self) {}

    /// Runs on every scheduled update after the first.
    fn update(&mut self) {}

    /// Runs when the lifetime counter crosses a maintenance boundary.
    fn maintenance(&mut self) {}

    fn on_added(&mut self) {}

    fn on_removed(&mut self) {}

    fn on_leaving_world(&mut self) {}

    /// Interval until the next maintenance pass.
    fn next_maintenance_interval(&mut self) -> u64 {
        self.state_mut().draw_maintenance_interval()
    }

    // Defaults every type inherits unless it overrides them.

    /// Whether the given face is solid. Defaults to the material, for
    /// every face alike.
    fn is_solid(&self, _side: i32) -> bool {
        self.state().tile_type().material.is_solid()
    }

    fn light_value(&self) -> u8 {
        0
    }

    /// Type-level resistance against an explosion, used when the instance
    /// carries no [`ExplosionAware`] behavior.
    fn explosion_resistance(&self) -> f32 {
        self.state().tile_type().resistance / 5.0
    }

    fn quantity_dropped(&self) -> u32 {
        1
    }

    fn variant_dropped(&self) -> u8 {
        0
    }

    fn drops(&self) -> Vec<ItemStack> {
        let name = self.state().tile_type().unlocalized_name();
        vec![ItemStack::new(
            name,
            self.quantity_dropped(),
            self.variant_dropped(),
        )]
    }

    fn tick_rate(&self) -> u32 {
        20
    }

    /// Handles a wrench action on the given side. Consuming the action
    /// wears the tool down.
    fn on_wrench_used(&mut self, _side: i32) -> bool {
        false
    }

    /// Removes this tile from the grid on behalf of a player.
    fn remove_by_player(&mut self) -> bool {
        let pos = self.state().pos();
        match self.state().grid_mut() {
            Some(grid) => grid.set_to_empty(pos),
            None => false,
        }
    }

    /// Whether the given face needs rendering. A face flush with the cell
    /// border is hidden by an opaque neighbor.
    fn should_side_be_rendered(&self, side: i32) -> bool {
        let Some(face) = Face::from_index(side) else {
            return true;
        };
        let b = self.state().tile_type().bounds;
        let flush = match face {
            Face::Down => b.min.y <= 0.0,
            Face::Up => b.max.y >= 1.0,
            Face::North => b.min.z <= 0.0,
            Face::South => b.max.z >= 1.0,
            Face::West => b.min.x <= 0.0,
            Face::East => b.max.x >= 1.0,
        };
        if !flush {
            return true;
        }
        match self.state().grid() {
            Some(grid) => !grid.is_opaque_at(self.state().pos().neighbor(face)),
            None => true,
        }
    }

    /// Visible state to push to viewers. `None` means this type has nothing
    /// to describe.
    fn describe(&self) -> Option<DescribePayload> {
        None
    }

    /// Runs after each scheduled update while viewers are registered.
    fn sync_viewers(&mut self) {}

    /// Draws the instance with its custom renderer. An `Err` permanently
    /// downgrades the whole type to standard-volume rendering.
    fn render_dynamic(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    fn save(&self, _tag: &mut TagCompound) {}

    fn load(&mut self, _tag: &TagCompound) {}

    // Capability accessors. Overriding one is how a type opts into the
    // matching behavior; the registry probes these once per type.

    fn as_placeable_mut(&mut self) -> Option<&mut dyn Placeable> {
        None
    }

    fn as_left_click_mut(&mut self) -> Option<&mut dyn LeftClick> {
        None
    }

    fn as_activatable_mut(&mut self) -> Option<&mut dyn Activatable> {
        None
    }

    fn as_neighbor_aware_mut(&mut self) -> Option<&mut dyn NeighborAware> {
        None
    }

    fn as_explosion_aware_mut(&mut self) -> Option<&mut dyn ExplosionAware> {
        None
    }

    fn as_redstone_source_mut(&mut self) -> Option<&mut dyn RedstoneSource> {
        None
    }

    fn as_textured_mut(&mut self) -> Option<&mut dyn Textured> {
        None
    }

    fn as_collidable_mut(&mut self) -> Option<&mut dyn Collidable> {
        None
    }

    fn as_tinted_mut(&mut self) -> Option<&mut dyn Tinted> {
        None
    }

    fn as_display_ticking_mut(&mut self) -> Option<&mut dyn DisplayTicking> {
        None
    }

    fn as_dynamic_bounds_mut(&mut self) -> Option<&mut dyn DynamicBounds> {
        None
    }

    fn as_pickable_mut(&mut self) -> Option<&mut dyn Pickable> {
        None
    }

    fn as_rain_aware_mut(&mut self) -> Option<&mut dyn RainAware> {
        None
    }
}

/// Runs one scheduled update through the shared state machine. This is the
/// only place the lifetime counter advances.
pub fn run_scheduled_update(tile: &mut dyn Tile) {
    if tile.state().ticks == 0 {
        tile.first_tick();
    } else {
        tile.update();
    }

    let state = tile.state_mut();
    state.ticks = if state.ticks == u64::MAX {
        0
    } else {
        state.ticks + 1
    };

    if tile.state().ticks % tile.state().maintenance_interval() == 0 {
        tile.maintenance();
        let next = tile.next_maintenance_interval();
        let state = tile.state_mut();
        state.set_maintenance_interval(next);
        state.request_redraw();
    }

    if !tile.state().viewers.is_empty() {
        tile.sync_viewers();
    }
}

/// Persists the lifetime counters, then the instance's own state.
pub fn save_tile(tile: &dyn Tile, tag: &mut TagCompound) {
    tag.put_long("ticks", tile.state().ticks as i64);
    tag.put_long("interval", tile.state().maintenance_interval() as i64);
    tile.save(tag);
}

/// Restores the lifetime counters, then the instance's own state.
pub fn load_tile(tile: &mut dyn Tile, tag: &TagCompound) {
    if let Some(ticks) = tag.get_long("ticks") {
        tile.state_mut().ticks = ticks as u64;
    }
    if let Some(interval) = tag.get_long("interval") {
        if interval > 0 {
            tile.state_mut().set_maintenance_interval(interval as u64);
        }
    }
    tile.load(tag);
}

/// Routes a right-click. A usable wrench owns the dispatch outright: a
/// consumed wrench action wears the tool, an unconsumed one reports
/// unhandled. Only a wrench-free click reaches the [`Activatable`]
/// behavior, if any.
pub fn dispatch_activation(tile: &mut dyn Tile, agent: &mut Agent, side: i32, hit: Vec3) -> bool {
    if agent.holds_usable_wrench() {
        if tile.on_wrench_used(side) {
            agent.damage_wrench();
            return true;
        }
        return false;
    }
    match tile.as_activatable_mut() {
        Some(act) => act.on_activated(agent, side, hit),
        None => false,
    }
}

/// Pushes the tile's description to everyone within range.
pub fn send_description(tile: &dyn Tile, sink: &mut dyn PacketSink) {
    if let Some(payload) = tile.describe() {
        let target = PacketTarget::AllWithin {
            center: tile.state().pos(),
            radius: DESCRIPTION_RADIUS,
        };
        sink.send_description(target, payload);
    }
}

/// Wraps a concrete tile in the shared-cell handle the grid stores.
pub fn into_cell<T: Tile + 'static>(tile: T) -> TileCell {
    Rc::new(RefCell::new(tile))
}

/// The plainest possible tile: default behavior everywhere, with the
/// type's single texture on every face.
pub struct BasicTile {
    state: TileState,
}

impl BasicTile {
    pub fn new(ty: &Rc<TileType>, variant: u8) -> Self {
        Self {
            state: TileState::new(ty.clone(), variant),
        }
    }
}

impl Tile for BasicTile {
    fn state(&self) -> &TileState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut TileState {
        &mut self.state
    }

    fn as_textured_mut(&mut self) -> Option<&mut dyn Textured> {
        Some(self)
    }
}

impl Textured for BasicTile {
    fn icon(&mut self, _side: i32, _variant: u8) -> Option<IconHandle> {
        let ty = self.state.tile_type();
        ty.icon(&ty.texture_key())
    }

    fn register_icons(&mut self, reg: &mut dyn IconRegistrar) {
        let key = self.state.tile_type().texture_key();
        let handle = reg.register_icon(&key);
        self.state.tile_type().put_icon(key, handle);
    }
}

/// Factory producing [`BasicTile`] instances; the registry default.
pub fn basic_factory() -> TileFactory {
    Box::new(|ty, variant| into_cell(BasicTile::new(ty, variant)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ModInfo, TileTypeBuilder};

    fn test_type() -> Rc<TileType> {
        let ty = Rc::new(
            TileTypeBuilder::new("probe", ModInfo::new("test:", "test/"))
                .build(basic_factory()),
        );
        ty.finish_registration();
        ty
    }

    #[test]
    fn first_update_runs_first_tick_then_counts() {
        struct Probe {
            state: TileState,
            first: u32,
            updates: u32,
        }
        impl Tile for Probe {
            fn state(&self) -> &TileState {
                &self.state
            }
            fn state_mut(&mut self) -> &mut TileState {
                &mut self.state
            }
            fn first_tick(&mut self) {
                self.first += 1;
            }
            fn update(&mut self) {
                self.updates += 1;
            }
        }

        let mut tile = Probe {
            state: TileState::new(test_type(), 0),
            first: 0,
            updates: 0,
        };
        for _ in 0..5 {
            run_scheduled_update(&mut tile);
        }
        assert_eq!(tile.first, 1);
        assert_eq!(tile.updates, 4);
        assert_eq!(tile.state.ticks, 5);
    }

    #[test]
    fn counter_wraps_to_exactly_zero() {
        let mut tile = BasicTile::new(&test_type(), 0);
        tile.state_mut().ticks = u64::MAX;
        run_scheduled_update(&mut tile);
        assert_eq!(tile.state().ticks, 0);
    }

    #[test]
    fn maintenance_fires_on_interval_and_redraws() {
        struct Probe {
            state: TileState,
            maintained: u32,
        }
        impl Tile for Probe {
            fn state(&self) -> &TileState {
                &self.state
            }
            fn state_mut(&mut self) -> &mut TileState {
                &mut self.state
            }
            fn maintenance(&mut self) {
                self.maintained += 1;
            }
        }

        let mut tile = Probe {
            state: TileState::new(test_type(), 0),
            maintained: 0,
        };
        for _ in 0..INITIAL_MAINTENANCE_INTERVAL {
            run_scheduled_update(&mut tile);
        }
        assert_eq!(tile.maintained, 1);
        assert!(tile.state.take_redraw_request());
        let next = tile.state.maintenance_interval();
        assert!((100..2100).contains(&next), "interval {next} out of range");
    }

    #[test]
    fn lifetime_counters_round_trip() {
        let ty = test_type();
        let mut tile = BasicTile::new(&ty, 0);
        tile.state_mut().ticks = 4242;
        tile.state_mut().set_maintenance_interval(777);

        let mut tag = TagCompound::new();
        save_tile(&tile, &mut tag);

        let mut restored = BasicTile::new(&ty, 0);
        load_tile(&mut restored, &tag);
        assert_eq!(restored.state().ticks, 4242);
        assert_eq!(restored.state().maintenance_interval(), 777);
    }

    struct Valve {
        state: TileState,
        consume_wrench: bool,
        wrenched: bool,
        activated: bool,
    }

    impl Valve {
        fn new(consume_wrench: bool) -> Self {
            Self {
                state: TileState::new(test_type(), 0),
                consume_wrench,
                wrenched: false,
                activated: false,
            }
        }
    }

    impl Tile for Valve {
        fn state(&self) -> &TileState {
            &self.state
        }
        fn state_mut(&mut self) -> &mut TileState {
            &mut self.state
        }
        fn on_wrench_used(&mut self, _side: i32) -> bool {
            self.wrenched = true;
            self.consume_wrench
        }
        fn as_activatable_mut(&mut self) -> Option<&mut dyn Activatable> {
            Some(self)
        }
    }

    impl Activatable for Valve {
        fn on_activated(&mut self, _agent: &mut Agent, _side: i32, _hit: Vec3) -> bool {
            self.activated = true;
            true
        }
    }

    #[test]
    fn wrench_takes_precedence_over_activation() {
        let mut tile = Valve::new(true);

        let mut wrencher = Agent::holding(ViewerId(1), ItemStack::wrench("wrench"));
        assert!(dispatch_activation(&mut tile, &mut wrencher, 1, Vec3::ZERO));
        assert!(tile.wrenched);
        assert!(!tile.activated);
        assert_eq!(wrencher.held.as_ref().unwrap().wear, 1);

        let mut bare = Agent::new(ViewerId(2));
        assert!(dispatch_activation(&mut tile, &mut bare, 1, Vec3::ZERO));
        assert!(tile.activated);
    }

    #[test]
    fn unconsumed_wrench_reports_unhandled() {
        let mut tile = Valve::new(false);

        // A held wrench owns the dispatch even when the tile declines it:
        // activation never runs and the tool takes no wear.
        let mut wrencher = Agent::holding(ViewerId(1), ItemStack::wrench("wrench"));
        assert!(!dispatch_activation(&mut tile, &mut wrencher, 1, Vec3::ZERO));
        assert!(tile.wrenched);
        assert!(!tile.activated);
        assert_eq!(wrencher.held.as_ref().unwrap().wear, 0);
    }

    #[test]
    fn drops_are_one_stack_of_the_dropped_quantity() {
        struct Ore {
            state: TileState,
        }
        impl Tile for Ore {
            fn state(&self) -> &TileState {
                &self.state
            }
            fn state_mut(&mut self) -> &mut TileState {
                &mut self.state
            }
            fn quantity_dropped(&self) -> u32 {
                4
            }
            fn variant_dropped(&self) -> u8 {
                2
            }
        }

        let tile = Ore {
            state: TileState::new(test_type(), 0),
        };
        assert_eq!(tile.drops(), vec![ItemStack::new("test:probe", 4, 2)]);
    }

    #[test]
    fn rebinding_a_bound_standin_panics() {
        let ty = test_type();
        let standin = ty.standin().clone();
        standin
            .borrow_mut()
            .state_mut()
            .bind_context(None, TilePos::new(1, 2, 3));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            standin
                .borrow_mut()
                .state_mut()
                .bind_context(None, TilePos::new(4, 5, 6));
        }));
        assert!(result.is_err());
    }
}
