//! Just enough item and agent surface for drops, pick-block, and the
//! wrench interaction flow. Inventory semantics stay with the host.

/// Identifies a player/agent viewing or acting on a tile.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct ViewerId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub struct ItemStack {
    pub item: String,
    pub count: u32,
    pub variant: u8,
    /// Flagged by the host when the item acts as a wrench on tiles.
    pub wrench: bool,
    /// Accumulated tool wear; bumped when a wrench action is consumed.
    pub wear: u32,
}

impl ItemStack {
    pub fn new(item: impl Into<String>, count: u32, variant: u8) -> Self {
        Self {
            item: item.into(),
            count,
            variant,
            wrench: false,
            wear: 0,
        }
    }

    pub fn wrench(item: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            count: 1,
            variant: 0,
            wrench: true,
            wear: 0,
        }
    }
}

/// The acting agent a behavior hook sees: who, and what they hold.
#[derive(Clone, Debug)]
pub struct Agent {
    pub id: ViewerId,
    pub held: Option<ItemStack>,
}

impl Agent {
    pub fn new(id: ViewerId) -> Self {
        Self { id, held: None }
    }

    pub fn holding(id: ViewerId, stack: ItemStack) -> Self {
        Self {
            id,
            held: Some(stack),
        }
    }

    pub fn holds_usable_wrench(&self) -> bool {
        self.held.as_ref().is_some_and(|s| s.wrench)
    }

    /// Applies tool wear after a consumed wrench action.
    pub fn damage_wrench(&mut self) {
        if let Some(held) = self.held.as_mut() {
            if held.wrench {
                held.wear += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrench_detection_and_wear() {
        let mut agent = Agent::holding(ViewerId(1), ItemStack::wrench("wrench"));
        assert!(agent.holds_usable_wrench());
        agent.damage_wrench();
        assert_eq!(agent.held.as_ref().unwrap().wear, 1);

        let mut bare = Agent::new(ViewerId(2));
        assert!(!bare.holds_usable_wrench());
        bare.damage_wrench();
        assert!(bare.held.is_none());
    }
}
