//! The world-grid collaborator seam: positions, access traits, and the
//! weak world handles bound onto tiles.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tessera_geom::{Face, Vec3};

use crate::descriptor::BlockId;
use crate::tile::Tile;

/// Shared handle to a tile instance. The grid owns the cells for placed
/// tiles; each descriptor owns one more for its stand-in.
pub type TileCell = Rc<RefCell<dyn Tile>>;

/// Integer world coordinates.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl TilePos {
    /// Sentinel for an instance not attached to any location.
    pub const UNBOUND: TilePos = TilePos { x: 0, y: 0, z: 0 };

    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// The neighboring position through the given face.
    #[inline]
    pub fn neighbor(self, face: Face) -> Self {
        match face {
            Face::Down => self.offset(0, -1, 0),
            Face::Up => self.offset(0, 1, 0),
            Face::North => self.offset(0, 0, -1),
            Face::South => self.offset(0, 0, 1),
            Face::West => self.offset(-1, 0, 0),
            Face::East => self.offset(1, 0, 0),
        }
    }

    /// Center of the cell this position names.
    #[inline]
    pub fn center(self) -> Vec3 {
        Vec3::new(
            self.x as f32 + 0.5,
            self.y as f32 + 0.5,
            self.z as f32 + 0.5,
        )
    }
}

/// Read-only grid access. May be a snapshot; never assume mutation is
/// available behind this trait.
pub trait GridView {
    fn tile_at(&self, pos: TilePos) -> Option<TileCell>;
    fn type_at(&self, pos: TilePos) -> Option<BlockId>;
    fn variant_at(&self, pos: TilePos) -> u8;
    fn is_replaceable(&self, pos: TilePos) -> bool;
    fn is_opaque_at(&self, pos: TilePos) -> bool;
}

/// Full mutable world. Methods take `&self`: everything runs on the host's
/// single simulation thread and implementations use interior mutability.
pub trait GridMut: GridView {
    fn place(&self, pos: TilePos, cell: GridCell);
    fn set_to_empty(&self, pos: TilePos) -> bool;
    fn schedule_update(&self, pos: TilePos, block: BlockId, delay: u32);
    fn notify_neighbors(&self, pos: TilePos, block: BlockId);
}

/// Everything stored at one grid location.
pub struct GridCell {
    pub block: BlockId,
    pub variant: u8,
    pub opaque: bool,
    pub tile: Option<TileCell>,
}

/// Weak handle to the grid a tile is operating in. `View` is a read-only
/// snapshot; only `Full` exposes mutation. Weak so a placed tile holding
/// its own world never keeps the grid alive.
#[derive(Clone)]
pub enum WorldRef {
    View(Weak<dyn GridView>),
    Full {
        view: Weak<dyn GridView>,
        full: Weak<dyn GridMut>,
    },
}

impl WorldRef {
    pub fn view_of<G: GridView + 'static>(grid: &Rc<G>) -> Self {
        let view: Rc<dyn GridView> = grid.clone();
        WorldRef::View(Rc::downgrade(&view))
    }

    pub fn full_of<G: GridMut + 'static>(grid: &Rc<G>) -> Self {
        let view: Rc<dyn GridView> = grid.clone();
        let full: Rc<dyn GridMut> = grid.clone();
        WorldRef::Full {
            view: Rc::downgrade(&view),
            full: Rc::downgrade(&full),
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, WorldRef::Full { .. })
    }

    /// Read access, whichever kind of handle this is.
    pub fn view(&self) -> Option<Rc<dyn GridView>> {
        match self {
            WorldRef::View(w) => w.upgrade(),
            WorldRef::Full { view, .. } => view.upgrade(),
        }
    }

    /// Mutable world access; `None` for read-only snapshots.
    pub fn full(&self) -> Option<Rc<dyn GridMut>> {
        match self {
            WorldRef::View(_) => None,
            WorldRef::Full { full, .. } => full.upgrade(),
        }
    }
}
