//! Demo harness: loads tile declarations, adds one programmatic type with
//! behaviors, places a row of tiles in an in-memory grid, and runs the
//! interaction and update loops against the facades.

use std::error::Error;
use std::path::Path;
use std::rc::Rc;

use tessera_facade::TileBlock;
use tessera_geom::Vec3;
use tessera_tiles::{
    Activatable, Agent, DescribePayload, IconHandle, IconRegistrar, ItemStack, ModInfo,
    NeighborAware, RecordingSink, RedstoneSource, TagCompound, Tile, TilePos, TileRegistry,
    TileState, TileTypeBuilder, ViewerId, WorldRef, into_cell,
};
use tessera_world::MemoryGrid;

/// A redstone pulser: toggled by activation, re-faced by a wrench.
struct Pulser {
    state: TileState,
    powered: bool,
    facing: u8,
}

impl Tile for Pulser {
    fn state(&self) -> &TileState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut TileState {
        &mut self.state
    }

    fn on_wrench_used(&mut self, side: i32) -> bool {
        self.facing = side.clamp(0, 5) as u8;
        log::info!(target: "harness", "pulser at {:?} re-faced to {}", self.state.pos(), self.facing);
        true
    }

    fn describe(&self) -> Option<DescribePayload> {
        let mut tag = TagCompound::new();
        tag.put_bool("powered", self.powered);
        tag.put_int("facing", self.facing as i32);
        Some(DescribePayload {
            pos: self.state.pos(),
            block: self.state.tile_type().block_id(),
            tag,
        })
    }

    fn as_activatable_mut(&mut self) -> Option<&mut dyn Activatable> {
        Some(self)
    }

    fn as_redstone_source_mut(&mut self) -> Option<&mut dyn RedstoneSource> {
        Some(self)
    }

    fn as_neighbor_aware_mut(&mut self) -> Option<&mut dyn NeighborAware> {
        Some(self)
    }
}

impl Activatable for Pulser {
    fn on_activated(&mut self, _agent: &mut Agent, _side: i32, _hit: Vec3) -> bool {
        self.powered = !self.powered;
        log::info!(target: "harness", "pulser at {:?} toggled to {}", self.state.pos(), self.powered);
        true
    }
}

impl RedstoneSource for Pulser {
    fn weak_power(&mut self, _side: i32) -> u8 {
        if self.powered { 15 } else { 0 }
    }
}

impl NeighborAware for Pulser {
    fn on_neighbor_block_changed(&mut self, block: tessera_tiles::BlockId) {
        log::debug!(target: "harness", "pulser at {:?} saw neighbor change (block {})", self.state.pos(), block.0);
    }
}

fn pulser_type() -> TileTypeBuilder {
    TileTypeBuilder::new("pulser", ModInfo::new("demo:", "demo/"))
        .emits_redstone(true)
        .texture("pulser")
        .factory(Box::new(|ty, variant| {
            into_cell(Pulser {
                state: TileState::new(ty.clone(), variant),
                powered: false,
                facing: 1,
            })
        }))
}

/// Counting atlas stub standing in for a real texture registrar.
#[derive(Default)]
struct Atlas {
    next: u32,
}

impl IconRegistrar for Atlas {
    fn register_icon(&mut self, name: &str) -> IconHandle {
        let handle = IconHandle(self.next);
        self.next += 1;
        log::debug!(target: "harness", "icon '{}' -> {}", name, handle.0);
        handle
    }
}

pub fn run(config: &Path, ticks: u32) -> Result<(), Box<dyn Error>> {
    let mut registry = TileRegistry::load_from_path(config)?;
    registry.register(pulser_type());

    let blocks: Vec<TileBlock> = registry
        .iter()
        .map(|(id, ty)| TileBlock::new(id, ty.clone()))
        .collect();

    let mut atlas = Atlas::default();
    for block in &blocks {
        block.register_icons(&mut atlas);
    }

    let grid = Rc::new(MemoryGrid::new());
    let world = WorldRef::full_of(&grid);

    let mut placed = Vec::new();
    for (i, block) in blocks.iter().enumerate() {
        let pos = TilePos::new(i as i32 * 2, 0, 0);
        if block.can_place_at(&world, pos) {
            let _ = block.place(&world, pos, 0);
            placed.push((block, pos));
        }
    }
    log::info!(target: "harness", "placed {} tiles: {:?}", placed.len(), grid.stats());

    // A wrench-wielding agent walks the row; wrench-aware types consume
    // the click before their activation behavior sees it.
    let mut agent = Agent::holding(ViewerId(1), ItemStack::wrench("demo:wrench"));
    for (block, pos) in &placed {
        let consumed = block.on_activated(&world, *pos, &mut agent, 1, Vec3::new(0.5, 1.0, 0.5));
        log::debug!(target: "harness", "activated {:?}: consumed={}", pos, consumed);
    }

    for _ in 0..ticks {
        for (block, pos) in &placed {
            block.tick(&world, *pos);
        }
    }

    let mut sink = RecordingSink::default();
    for (block, pos) in &placed {
        block.describe_to(&world, *pos, &mut sink);
    }
    log::info!(
        target: "harness",
        "{} descriptions after {} ticks per tile, grid {:?}",
        sink.sent.len(),
        ticks,
        grid.stats()
    );

    for (block, pos) in &placed {
        block.break_block(&world, *pos);
    }
    log::info!(target: "harness", "cleared: {:?}", grid.stats());
    Ok(())
}
