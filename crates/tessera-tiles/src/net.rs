//! Description packets: how a tile pushes its visible state to viewers.

use crate::descriptor::BlockId;
use crate::grid::TilePos;
use crate::items::ViewerId;
use crate::tag::TagCompound;

/// Serialized visible state of one tile, addressed by location.
#[derive(Clone, Debug, PartialEq)]
pub struct DescribePayload {
    pub pos: TilePos,
    pub block: BlockId,
    pub tag: TagCompound,
}

/// Who a description is delivered to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PacketTarget {
    /// Every viewer within `radius` of `center`.
    AllWithin { center: TilePos, radius: f32 },
    /// One specific viewer.
    Viewer(ViewerId),
    /// The simulation authority.
    Authority,
}

/// Outbound packet seam. The host wires its transport in here; tests use a
/// recording sink.
pub trait PacketSink {
    fn send_description(&mut self, target: PacketTarget, payload: DescribePayload);
}

/// Sink that records everything sent, for tests and the demo harness.
#[derive(Default)]
pub struct RecordingSink {
    pub sent: Vec<(PacketTarget, DescribePayload)>,
}

impl PacketSink for RecordingSink {
    fn send_description(&mut self, target: PacketTarget, payload: DescribePayload) {
        self.sent.push((target, payload));
    }
}
