//! Core tile framework: per-type descriptors, per-location instances,
//! optional behavior capabilities, and the registry that ties them
//! together.
#![forbid(unsafe_code)]

pub mod capability;
pub mod config;
pub mod descriptor;
pub mod grid;
pub mod items;
pub mod net;
pub mod registry;
pub mod tag;
pub mod tile;

pub use capability::{
    Activatable, Capability, CapabilitySet, Collidable, DisplayTicking, DynamicBounds,
    ExplosionAware, LeftClick, NeighborAware, Pickable, Placeable, RainAware, RedstoneSource,
    Textured, Tinted,
};
pub use config::{BoundsDef, TileDef, TilesConfig};
pub use descriptor::{
    BlockId, IconHandle, IconRegistrar, MaterialKind, ModInfo, StepSound, TileFactory, TileType,
    TileTypeBuilder,
};
pub use grid::{GridCell, GridMut, GridView, TileCell, TilePos, WorldRef};
pub use items::{Agent, ItemStack, ViewerId};
pub use net::{DescribePayload, PacketSink, PacketTarget, RecordingSink};
pub use registry::TileRegistry;
pub use tag::{TagCompound, TagValue};
pub use tile::{
    BasicTile, Tile, TileState, basic_factory, dispatch_activation, into_cell, load_tile,
    run_scheduled_update, save_tile, send_description,
};
