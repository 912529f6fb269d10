use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;

use tessera_facade::TileBlock;
use tessera_geom::Vec3;
use tessera_tiles::{
    Activatable, Agent, ModInfo, Tile, TilePos, TileRegistry, TileState, TileTypeBuilder,
    ViewerId, WorldRef, into_cell,
};
use tessera_world::MemoryGrid;

struct Echo {
    state: TileState,
    seen: Rc<RefCell<Vec<TilePos>>>,
}

impl Tile for Echo {
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

impl Activatable for Echo {
    fn on_activated(&mut self, _agent: &mut Agent, _side: i32, _hit: Vec3) -> bool {
        self.seen.borrow_mut().push(self.state.pos());
        true
    }
}

fn echo_block(seen: Rc<RefCell<Vec<TilePos>>>) -> (TileRegistry, TileBlock) {
    let mut reg = TileRegistry::new();
    let id = reg.register(
        TileTypeBuilder::new("echo", ModInfo::new("test:", "test/")).factory(Box::new(
            move |ty, variant| {
                into_cell(Echo {
                    state: TileState::new(ty.clone(), variant),
                    seen: seen.clone(),
                })
            },
        )),
    );
    let ty = reg.get(id).expect("just registered").clone();
    let block = TileBlock::new(id, ty);
    (reg, block)
}

proptest! {
    // Every dispatch through the stand-in sees exactly the caller's
    // coordinates and leaves nothing behind, for any sequence of positions.
    #[test]
    fn standin_binding_is_exact_and_transient(
        coords in prop::collection::vec((-1000i32..1000, -64i32..320, -1000i32..1000), 1..24)
    ) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (_reg, block) = echo_block(seen.clone());
        let grid = Rc::new(MemoryGrid::new());
        let world = WorldRef::full_of(&grid);
        let mut agent = Agent::new(ViewerId(1));

        let positions: Vec<TilePos> =
            coords.iter().map(|&(x, y, z)| TilePos::new(x, y, z)).collect();
        for &pos in &positions {
            prop_assert!(block.on_activated(&world, pos, &mut agent, 1, Vec3::ZERO));
            let standin = block.tile_type().standin().borrow();
            prop_assert!(!standin.state().is_bound());
            prop_assert_eq!(standin.state().pos(), TilePos::UNBOUND);
        }
        prop_assert_eq!(&*seen.borrow(), &positions);
    }
}
