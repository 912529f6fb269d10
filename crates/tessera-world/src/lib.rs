//! In-memory grid backing the demo harness and the test suites. Stores
//! cells sparsely and records scheduled updates and neighbor notifications
//! so callers can inspect what the simulation asked for.
#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use tessera_geom::Face;
use tessera_tiles::{BlockId, GridCell, GridMut, GridView, TileCell, TilePos};

/// One pending scheduled update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduledUpdate {
    pub pos: TilePos,
    pub block: BlockId,
    pub delay: u32,
}

/// Snapshot counters for logging and assertions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GridStats {
    pub cells: usize,
    pub pending_updates: usize,
    pub pending_notifications: usize,
}

/// Sparse in-memory grid. Methods take `&self`; all mutation goes through
/// `RefCell` since the grid lives on the single simulation thread.
#[derive(Default)]
pub struct MemoryGrid {
    cells: RefCell<HashMap<TilePos, GridCell>>,
    scheduled: RefCell<Vec<ScheduledUpdate>>,
    notifications: RefCell<Vec<(TilePos, BlockId)>>,
}

impl MemoryGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> GridStats {
        GridStats {
            cells: self.cells.borrow().len(),
            pending_updates: self.scheduled.borrow().len(),
            pending_notifications: self.notifications.borrow().len(),
        }
    }

    /// Drains and returns every pending scheduled update.
    pub fn take_scheduled(&self) -> Vec<ScheduledUpdate> {
        self.scheduled.borrow_mut().drain(..).collect()
    }

    /// Drains and returns the recorded neighbor notifications, as
    /// (notified position, changed block) pairs.
    pub fn take_notifications(&self) -> Vec<(TilePos, BlockId)> {
        self.notifications.borrow_mut().drain(..).collect()
    }
}

impl GridView for MemoryGrid {
    fn tile_at(&self, pos: TilePos) -> Option<TileCell> {
        self.cells.borrow().get(&pos).and_then(|c| c.tile.clone())
    }

    fn type_at(&self, pos: TilePos) -> Option<BlockId> {
        self.cells.borrow().get(&pos).map(|c| c.block)
    }

    fn variant_at(&self, pos: TilePos) -> u8 {
        self.cells.borrow().get(&pos).map(|c| c.variant).unwrap_or(0)
    }

    fn is_replaceable(&self, pos: TilePos) -> bool {
        !self.cells.borrow().contains_key(&pos)
    }

    fn is_opaque_at(&self, pos: TilePos) -> bool {
        self.cells.borrow().get(&pos).is_some_and(|c| c.opaque)
    }
}

impl GridMut for MemoryGrid {
    fn place(&self, pos: TilePos, cell: GridCell) {
        log::debug!(target: "world", "place block {} at {:?}", cell.block.0, pos);
        self.cells.borrow_mut().insert(pos, cell);
    }

    fn set_to_empty(&self, pos: TilePos) -> bool {
        let removed = self.cells.borrow_mut().remove(&pos).is_some();
        if removed {
            log::debug!(target: "world", "clear {:?}", pos);
        }
        removed
    }

    fn schedule_update(&self, pos: TilePos, block: BlockId, delay: u32) {
        self.scheduled
            .borrow_mut()
            .push(ScheduledUpdate { pos, block, delay });
    }

    fn notify_neighbors(&self, pos: TilePos, block: BlockId) {
        for face in Face::ALL {
            let neighbor = pos.neighbor(face);
            self.notifications.borrow_mut().push((neighbor, block));
            // Take the tile out of the borrow before dispatching so a
            // reacting neighbor can query the grid.
            let tile = self.tile_at(neighbor);
            if let Some(tile) = tile {
                let mut tile = tile.borrow_mut();
                if let Some(aware) = tile.as_neighbor_aware_mut() {
                    aware.on_neighbor_block_changed(block);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cells_are_replaceable_and_clear() {
        let grid = MemoryGrid::new();
        let pos = TilePos::new(1, 2, 3);
        assert!(grid.is_replaceable(pos));
        assert!(!grid.is_opaque_at(pos));
        assert!(grid.tile_at(pos).is_none());
        assert!(!grid.set_to_empty(pos));
    }

    #[test]
    fn placed_cells_report_their_contents() {
        let grid = MemoryGrid::new();
        let pos = TilePos::new(0, 4, 0);
        grid.place(
            pos,
            GridCell {
                block: BlockId(7),
                variant: 2,
                opaque: true,
                tile: None,
            },
        );
        assert_eq!(grid.type_at(pos), Some(BlockId(7)));
        assert_eq!(grid.variant_at(pos), 2);
        assert!(grid.is_opaque_at(pos));
        assert!(!grid.is_replaceable(pos));
        assert_eq!(grid.stats().cells, 1);
        assert!(grid.set_to_empty(pos));
        assert_eq!(grid.stats().cells, 0);
    }

    #[test]
    fn notifications_cover_all_six_neighbors() {
        let grid = MemoryGrid::new();
        let pos = TilePos::new(5, 5, 5);
        grid.notify_neighbors(pos, BlockId(3));
        let notes = grid.take_notifications();
        assert_eq!(notes.len(), 6);
        for (neighbor, block) in notes {
            assert_eq!(block, BlockId(3));
            let d = (neighbor.x - pos.x).abs()
                + (neighbor.y - pos.y).abs()
                + (neighbor.z - pos.z).abs();
            assert_eq!(d, 1);
        }
    }

    #[test]
    fn scheduled_updates_drain_in_order() {
        let grid = MemoryGrid::new();
        grid.schedule_update(TilePos::new(0, 0, 0), BlockId(1), 20);
        grid.schedule_update(TilePos::new(1, 0, 0), BlockId(1), 40);
        let drained = grid.take_scheduled();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].delay, 20);
        assert_eq!(drained[1].delay, 40);
        assert!(grid.take_scheduled().is_empty());
    }
}
