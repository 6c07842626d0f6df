//! The Ironfront rules engine: movement validation, battle tracking and
//! territory capture for a turn-based territory wargame.
//!
//! The exposed surface is small: load a [`rules::CompiledSetup`] with
//! [`rules::load_setup`], build a [`state::GameState`], validate moves with
//! [`move_validate::validate_move`], perform them with
//! [`move_exec::perform_move`], and let [`battle::fight_all_battles`]
//! resolve the turn's combat in dependency order. Everything the engine
//! does to shared state is recorded as changes and chronicle entries.

pub mod battle;
mod dice;
mod entities;
mod error;
pub mod map;
mod move_exec;
mod move_validate;
mod relationships;
pub mod rules;
mod stacking;
mod state;
mod tech;
mod unit;

pub use crate::dice::GameRng;
pub use crate::entities::EntityStore;
pub use crate::error::EngineError;
pub use crate::map::{Canal, Route, TerritoryMap};
pub use crate::move_exec::{perform_move, MoveOutcome};
pub use crate::move_validate::{
    validate_move, MoveDescription, CANNOT_LEAVE_ACTIVE_BATTLE,
    ENEMY_SUBMARINE_PREVENTING_UNESCORTED_LANDING, NOT_ALL_UNITS_CAN_BLITZ,
    TRANSPORT_CANNOT_LOAD_IN_HOSTILE_SEA_ZONE,
    TRANSPORT_HAS_ALREADY_UNLOADED_UNITS_IN_A_PREVIOUS_PHASE,
};
pub use crate::relationships::Relationships;
pub use crate::stacking::{remaining_capacity, PendingStacks};
pub use crate::state::{GameState, Player, PlayerEconomy, SharedState};
pub use crate::tech::TechState;
pub use crate::unit::Unit;
