use serde::{Deserialize, Serialize};

use ironfront_protocol::{PlayerId, TerritoryId, UnitId, UnitTypeId};

use crate::rules::CompiledRules;
use crate::tech::TechState;

/// A unit on the board. Static capabilities live in the rules catalogue;
/// this is only the mutable part.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Unit {
    pub type_id: UnitTypeId,
    pub owner: PlayerId,
    pub territory: TerritoryId,
    pub movement_left: u32,
    /// Combat hits taken this battle/turn (multi-hit-point units).
    pub hits: u32,
    /// Accumulated infrastructure damage (bombing, capture effects).
    pub damage: u32,
    /// Sea or air transport currently carrying this unit.
    pub transported_by: Option<UnitId>,
    pub submerged: bool,
    /// Set once the unit has taken part in a battle this turn.
    pub was_in_combat: bool,
    pub loaded_this_turn: bool,
    pub unloaded_this_turn: bool,
    /// For transports: unloaded cargo during the combat-move phase. Locks
    /// out further unloads for the rest of the turn.
    pub unloaded_in_combat_phase: bool,
}

impl Unit {
    pub fn new(
        type_id: UnitTypeId,
        owner: PlayerId,
        territory: TerritoryId,
        rules: &CompiledRules,
        tech: &TechState,
    ) -> Self {
        Self {
            type_id,
            owner,
            territory,
            movement_left: rules.movement_value(type_id, tech),
            hits: 0,
            damage: 0,
            transported_by: None,
            submerged: false,
            was_in_combat: false,
            loaded_this_turn: false,
            unloaded_this_turn: false,
            unloaded_in_combat_phase: false,
        }
    }

    /// Remaining hit points before this unit dies.
    pub fn hit_points_left(&self, rules: &CompiledRules) -> u32 {
        rules.unit_type(self.type_id).hit_points.saturating_sub(self.hits)
    }

    /// Reset per-turn movement and combat bookkeeping.
    pub fn refresh_for_new_turn(&mut self, movement: u32) {
        self.movement_left = movement;
        self.hits = 0;
        self.submerged = false;
        self.was_in_combat = false;
        self.loaded_this_turn = false;
        self.unloaded_this_turn = false;
        self.unloaded_in_combat_phase = false;
    }
}
