mod capture;
mod driver;
mod instance;
mod registry;

pub use capture::take_territory;
pub use driver::fight_all_battles;
pub use instance::BattleOutcome;
pub use registry::{
    add_battle, conquer_on_the_move, fight, undo_battle, BattleRegistry, PendingBattle,
};
