use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tessera_facade::TileBlock;
use tessera_geom::{Aabb, Vec3};
use tessera_tiles::{
    Activatable, Agent, Capability, ItemStack, ModInfo, RedstoneSource, TagCompound, Tile,
    TilePos, TileRegistry, TileState, TileTypeBuilder, ViewerId, WorldRef, into_cell, load_tile,
    save_tile,
};
use tessera_world::MemoryGrid;

/// Shared instrumentation the test tiles report into.
#[derive(Default)]
struct Trace {
    activated_at: RefCell<Vec<TilePos>>,
    first_ticks: Cell<u32>,
    maintenance: Cell<u32>,
    renders: Cell<u32>,
}

struct Gauge {
    state: TileState,
    trace: Rc<Trace>,
    power: u8,
    fail_render: bool,
}

impl Tile for Gauge {
    fn state(&self) -> &TileState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut TileState {
        &mut self.state
    }

    fn first_tick(&mut self) {
        self.trace.first_ticks.set(self.trace.first_ticks.get() + 1);
    }

    fn maintenance(&mut self) {
        self.trace.maintenance.set(self.trace.maintenance.get() + 1);
    }

    fn render_dynamic(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.trace.renders.set(self.trace.renders.get() + 1);
        if self.fail_render {
            Err("renderer exploded".into())
        } else {
            Ok(())
        }
    }

    fn as_activatable_mut(&mut self) -> Option<&mut dyn Activatable> {
        Some(self)
    }

    fn as_redstone_source_mut(&mut self) -> Option<&mut dyn RedstoneSource> {
        Some(self)
    }
}

impl Activatable for Gauge {
    fn on_activated(&mut self, _agent: &mut Agent, _side: i32, _hit: Vec3) -> bool {
        self.trace.activated_at.borrow_mut().push(self.state.pos());
        true
    }
}

impl RedstoneSource for Gauge {
    fn weak_power(&mut self, _side: i32) -> u8 {
        self.power
    }
}

fn gauge_block(trace: Rc<Trace>, fail_render: bool) -> (TileRegistry, TileBlock) {
    let mut reg = TileRegistry::new();
    let builder = TileTypeBuilder::new("gauge", ModInfo::new("test:", "test/"))
        .emits_redstone(true)
        .factory(Box::new(move |ty, variant| {
            into_cell(Gauge {
                state: TileState::new(ty.clone(), variant),
                trace: trace.clone(),
                power: 7,
                fail_render,
            })
        }));
    let id = reg.register(builder);
    let ty = reg.get(id).expect("just registered").clone();
    let block = TileBlock::new(id, ty);
    (reg, block)
}

fn plain_block() -> (TileRegistry, TileBlock) {
    let mut reg = TileRegistry::new();
    let id = reg.register(
        TileTypeBuilder::new("slate", ModInfo::new("test:", "test/")).resistance(10.0),
    );
    let ty = reg.get(id).expect("just registered").clone();
    let block = TileBlock::new(id, ty);
    (reg, block)
}

fn full_world(grid: &Rc<MemoryGrid>) -> WorldRef {
    WorldRef::full_of(grid)
}

#[test]
fn standin_answers_when_nothing_is_placed() {
    let trace = Rc::new(Trace::default());
    let (_reg, block) = gauge_block(trace.clone(), false);
    let grid = Rc::new(MemoryGrid::new());
    let world = full_world(&grid);
    let pos = TilePos::new(3, 4, 5);

    let mut agent = Agent::new(ViewerId(1));
    assert!(block.on_activated(&world, pos, &mut agent, 1, Vec3::ZERO));

    // The stand-in saw the caller's coordinates during the dispatch.
    assert_eq!(trace.activated_at.borrow().as_slice(), &[pos]);

    // And carries nothing afterwards.
    let standin = block.tile_type().standin().borrow();
    assert!(!standin.state().is_bound());
    assert_eq!(standin.state().pos(), TilePos::UNBOUND);
    assert!(standin.state().world().is_none());
}

#[test]
fn placed_instance_is_preferred_over_standin() {
    let trace = Rc::new(Trace::default());
    let (_reg, block) = gauge_block(trace, false);
    let grid = Rc::new(MemoryGrid::new());
    let world = full_world(&grid);
    let pos = TilePos::new(0, 1, 0);

    assert!(block.resolve(&world, pos).is_standin());
    block.place(&world, pos, 0).expect("world is mutable");
    assert!(!block.resolve(&world, pos).is_standin());
}

#[test]
fn foreign_instance_falls_back_to_standin() {
    let trace = Rc::new(Trace::default());
    let (_ga_reg, gauge) = gauge_block(trace, false);
    let (_pl_reg, plain) = plain_block();
    let grid = Rc::new(MemoryGrid::new());
    let world = full_world(&grid);
    let pos = TilePos::new(2, 2, 2);

    plain.place(&world, pos, 0).expect("world is mutable");
    // The cell holds an instance of a different type, so the gauge facade
    // must not treat it as its own.
    assert!(gauge.resolve(&world, pos).is_standin());
    assert!(!plain.resolve(&world, pos).is_standin());
}

#[test]
fn sequential_dispatches_never_leak_coordinates() {
    let trace = Rc::new(Trace::default());
    let (_reg, block) = gauge_block(trace.clone(), false);
    let grid = Rc::new(MemoryGrid::new());
    let world = full_world(&grid);
    let a = TilePos::new(-8, 60, 12);
    let b = TilePos::new(100, 0, -100);

    let mut agent = Agent::new(ViewerId(1));
    block.on_activated(&world, a, &mut agent, 1, Vec3::ZERO);
    {
        let standin = block.tile_type().standin().borrow();
        assert_eq!(standin.state().pos(), TilePos::UNBOUND);
    }
    block.on_activated(&world, b, &mut agent, 1, Vec3::ZERO);

    assert_eq!(trace.activated_at.borrow().as_slice(), &[a, b]);
}

#[test]
fn context_is_released_when_a_hook_panics() {
    struct Grenade {
        state: TileState,
    }
    impl Tile for Grenade {
        fn state(&self) -> &TileState {
            &self.state
        }
        fn state_mut(&mut self) -> &mut TileState {
            &mut self.state
        }
        fn as_activatable_mut(&mut self) -> Option<&mut dyn Activatable> {
            Some(self)
        }
    }
    impl Activatable for Grenade {
        fn on_activated(&mut self, _agent: &mut Agent, _side: i32, _hit: Vec3) -> bool {
            panic!("hook blew up");
        }
    }

    let mut reg = TileRegistry::new();
    let id = reg.register(
        TileTypeBuilder::new("grenade", ModInfo::new("test:", "test/")).factory(Box::new(
            |ty, variant| {
                into_cell(Grenade {
                    state: TileState::new(ty.clone(), variant),
                })
            },
        )),
    );
    let ty = reg.get(id).expect("just registered").clone();
    let block = TileBlock::new(id, ty);
    let grid = Rc::new(MemoryGrid::new());
    let world = full_world(&grid);
    let pos = TilePos::new(1, 1, 1);

    let mut agent = Agent::new(ViewerId(1));
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        block.on_activated(&world, pos, &mut agent, 1, Vec3::ZERO)
    }));
    assert!(result.is_err());

    // The unwinding dispatch still released the stand-in; the next one
    // binds cleanly instead of hitting the re-entrancy check.
    {
        let standin = block.tile_type().standin().borrow();
        assert!(!standin.state().is_bound());
        assert_eq!(standin.state().pos(), TilePos::UNBOUND);
    }
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        block.on_activated(&world, TilePos::new(9, 9, 9), &mut agent, 1, Vec3::ZERO)
    }));
    assert!(result.is_err(), "hook panics again, not the injector");
}

#[test]
fn default_table_covers_missing_capabilities() {
    let (_reg, block) = plain_block();
    let grid = Rc::new(MemoryGrid::new());
    let world = full_world(&grid);
    let pos = TilePos::new(4, 4, 4);

    assert_eq!(block.weak_power(&world, pos, 1), 0);
    assert_eq!(block.strong_power(&world, pos, 1), 0);
    assert!(!block.can_provide_power());
    assert_eq!(block.color_multiplier(&world, pos), 0x00FF_FFFF);
    assert_eq!(block.explosion_resistance_at(&world, pos, Vec3::ZERO), 2.0);
    assert_eq!(block.explosion_resistance(), 2.0);

    // Base bounds, offset to the cell, filtered by the clip volume.
    let clip = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(100.0, 100.0, 100.0));
    assert_eq!(
        block.collision_boxes(&world, pos, clip),
        vec![Aabb::unit().offset(4, 4, 4)]
    );
    let far = Aabb::new(Vec3::new(50.0, 0.0, 0.0), Vec3::new(60.0, 1.0, 1.0));
    assert!(block.collision_boxes(&world, pos, far).is_empty());

    assert!(block.can_place_at(&world, pos));
    block.place(&world, pos, 0).expect("world is mutable");
    assert!(!block.can_place_at(&world, pos));

    let picked = block.pick_block(&world, pos).expect("default pick");
    assert_eq!(picked.item, "test:slate");
    assert_eq!(picked.count, 1);
}

#[test]
fn capability_dispatch_reaches_the_instance() {
    let trace = Rc::new(Trace::default());
    let (_reg, block) = gauge_block(trace, false);
    let grid = Rc::new(MemoryGrid::new());
    let world = full_world(&grid);
    let pos = TilePos::new(7, 7, 7);

    assert!(block.supports(Capability::Activatable));
    assert!(block.supports(Capability::RedstoneSource));
    assert!(!block.supports(Capability::Collidable));
    assert!(block.can_provide_power());
    assert_eq!(block.weak_power(&world, pos, 3), 7);
}

#[test]
fn placed_lifecycle_runs_and_persists() {
    let trace = Rc::new(Trace::default());
    let (_reg, block) = gauge_block(trace.clone(), false);
    let grid = Rc::new(MemoryGrid::new());
    let world = full_world(&grid);
    let pos = TilePos::new(5, 10, 5);

    let tile = block.place(&world, pos, 0).expect("world is mutable");
    assert!(tile.borrow().state().is_attached());
    assert_eq!(tile.borrow().state().pos(), pos);

    for _ in 0..200 {
        block.tick(&world, pos);
    }
    assert_eq!(trace.first_ticks.get(), 1);
    assert_eq!(trace.maintenance.get(), 1);
    assert_eq!(tile.borrow().state().ticks, 200);

    let mut tag = TagCompound::new();
    save_tile(&*tile.borrow(), &mut tag);

    let restored = block.tile_type().create_instance(0);
    load_tile(&mut *restored.borrow_mut(), &tag);
    assert_eq!(restored.borrow().state().ticks, 200);
    assert_eq!(
        restored.borrow().state().maintenance_interval(),
        tile.borrow().state().maintenance_interval()
    );
}

#[test]
fn standin_tick_never_advances_counters() {
    let trace = Rc::new(Trace::default());
    let (_reg, block) = gauge_block(trace.clone(), false);
    let grid = Rc::new(MemoryGrid::new());
    let world = full_world(&grid);
    let pos = TilePos::new(0, 0, 0);

    block.tick(&world, pos);
    block.tick(&world, pos);
    assert_eq!(trace.first_ticks.get(), 0);
    assert_eq!(block.tile_type().standin().borrow().state().ticks, 0);
}

#[test]
fn render_failure_downgrades_the_type_once() {
    let trace = Rc::new(Trace::default());
    let (_reg, block) = gauge_block(trace.clone(), true);
    let grid = Rc::new(MemoryGrid::new());
    let world = full_world(&grid);
    let pos = TilePos::new(1, 2, 3);

    assert!(!block.render_dynamic(&world, pos));
    assert!(block.render_as_standard());
    assert!(block.tile_type().dynamic_render_failed());
    assert_eq!(trace.renders.get(), 1);

    // Later calls short-circuit without touching the renderer again.
    assert!(!block.render_dynamic(&world, pos));
    assert_eq!(trace.renders.get(), 1);
}

#[test]
fn break_block_detaches_and_clears_the_cell() {
    let trace = Rc::new(Trace::default());
    let (_reg, block) = gauge_block(trace, false);
    let grid = Rc::new(MemoryGrid::new());
    let world = full_world(&grid);
    let pos = TilePos::new(6, 6, 6);

    let tile = block.place(&world, pos, 0).expect("world is mutable");
    block.break_block(&world, pos);
    assert!(tile.borrow().state().is_detached());
    assert_eq!(tile.borrow().state().pos(), TilePos::UNBOUND);
    assert_eq!(grid.stats().cells, 0);
}

#[test]
fn snapshot_world_allows_reads_but_denies_mutation() {
    let (_reg, block) = plain_block();
    let grid = Rc::new(MemoryGrid::new());
    let full = full_world(&grid);
    let view = WorldRef::view_of(&grid);
    let pos = TilePos::new(2, 3, 4);

    assert!(!view.is_full());
    assert!(view.view().is_some());
    assert!(view.full().is_none());

    block.place(&full, pos, 0).expect("full world is mutable");

    // Reads through the snapshot see the committed cell.
    assert!(!block.can_place_at(&view, pos));
    assert!(block.can_place_at(&view, pos.offset(1, 0, 0)));

    // Mutation through a snapshot-bound dispatch is unavailable.
    let empty = TilePos::new(9, 9, 9);
    assert!(!block.removed_by_player(&view, empty));
    assert!(block.place(&view, empty, 0).is_none());
    assert_eq!(grid.stats().cells, 1);
}

#[test]
fn side_solidity_is_answered_per_face() {
    struct Hatch {
        state: TileState,
    }
    impl Tile for Hatch {
        fn state(&self) -> &TileState {
            &self.state
        }
        fn state_mut(&mut self) -> &mut TileState {
            &mut self.state
        }
        fn is_solid(&self, side: i32) -> bool {
            side == 1
        }
    }

    let mut reg = TileRegistry::new();
    let id = reg.register(
        TileTypeBuilder::new("hatch", ModInfo::new("test:", "test/")).factory(Box::new(
            |ty, variant| {
                into_cell(Hatch {
                    state: TileState::new(ty.clone(), variant),
                })
            },
        )),
    );
    let ty = reg.get(id).expect("just registered").clone();
    let block = TileBlock::new(id, ty);
    let grid = Rc::new(MemoryGrid::new());
    let world = full_world(&grid);
    let pos = TilePos::new(0, 0, 0);

    assert!(block.is_side_solid(&world, pos, 1));
    assert!(!block.is_side_solid(&world, pos, 0));
    assert!(!block.is_side_solid(&world, pos, 4));
}

#[test]
fn drops_default_to_one_of_the_type() {
    let (_reg, block) = plain_block();
    let grid = Rc::new(MemoryGrid::new());
    let world = full_world(&grid);
    let pos = TilePos::new(0, 0, 0);

    assert_eq!(block.quantity_dropped(&world, pos), 1);
    let drops = block.drops(&world, pos);
    assert_eq!(drops, vec![ItemStack::new("test:slate", 1, 0)]);
}
