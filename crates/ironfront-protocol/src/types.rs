use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::UnitId;

/// Which movement phase a move request belongs to. The validator applies a
/// different rule set per phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovePhase {
    CombatMove,
    NonCombatMove,
}

impl MovePhase {
    pub fn is_combat(self) -> bool {
        matches!(self, MovePhase::CombatMove)
    }
}

/// Classification of a pending battle. One territory can hold at most one
/// pending battle per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleKind {
    /// Ground or sea combat with dice resolution.
    Normal,
    /// Defending interceptors meet attacking aircraft before a normal battle.
    AirInterception,
    /// Strategic bombers against production in the target territory.
    BombingRaid,
    /// Defending interceptors meet a bombing raid's escorts before the raid.
    AirRaid,
    /// Trivial conquest: no combat-capable defenders. Skips dice, still
    /// goes through capture.
    Finished,
    /// Encounter registered for bookkeeping only (e.g. ignored transports or
    /// submerged submarines); resolves as a no-op.
    NonFighting,
}

impl BattleKind {
    /// Air battles resolve in the first wave of a phase.
    pub fn is_air_battle(self) -> bool {
        matches!(self, BattleKind::AirInterception | BattleKind::AirRaid)
    }

    /// Bombing runs resolve before normal ground/sea battles.
    pub fn is_bombing_run(self) -> bool {
        matches!(self, BattleKind::BombingRaid | BattleKind::AirRaid)
    }
}

/// Standing between two players. Symmetric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Allied,
    Neutral,
    War,
}

/// Outcome of movement validation.
///
/// Not an error type: player-input problems come back as data so the caller
/// (UI or AI) can drop disallowed units and retry, or prompt to resolve an
/// ambiguity. A populated `error` rejects the move wholesale.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MoveValidationResult {
    /// Hard rejection reason for the whole move, if any.
    pub error: Option<String>,
    /// Units that must be excluded; the rest of the move may proceed.
    pub disallowed: BTreeMap<UnitId, String>,
    /// Units needing caller clarification (e.g. which transport to board).
    pub unresolved: BTreeMap<UnitId, String>,
}

impl MoveValidationResult {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn hard_error(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn disallow(&mut self, unit: UnitId, reason: impl Into<String>) {
        self.disallowed.entry(unit).or_insert_with(|| reason.into());
    }

    pub fn unresolve(&mut self, unit: UnitId, reason: impl Into<String>) {
        self.unresolved.entry(unit).or_insert_with(|| reason.into());
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.disallowed.is_empty() && self.unresolved.is_empty()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Fold another check's result in. A hard error wins outright; unit
    /// verdicts accumulate.
    pub fn absorb(&mut self, other: MoveValidationResult) {
        if self.error.is_none() {
            self.error = other.error;
        }
        for (unit, reason) in other.disallowed {
            self.disallowed.entry(unit).or_insert(reason);
        }
        for (unit, reason) in other.unresolved {
            self.unresolved.entry(unit).or_insert(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityId;

    #[test]
    fn absorb_keeps_first_error_and_merges_units() {
        let u1 = EntityId::new(0, 0);
        let u2 = EntityId::new(1, 0);

        let mut a = MoveValidationResult::ok();
        a.disallow(u1, "stacking limit reached");

        let mut b = MoveValidationResult::hard_error("no route");
        b.disallow(u2, "cannot move during combat phase");

        a.absorb(b);
        assert_eq!(a.error.as_deref(), Some("no route"));
        assert_eq!(a.disallowed.len(), 2);

        // A later error does not displace the first.
        a.absorb(MoveValidationResult::hard_error("second"));
        assert_eq!(a.error.as_deref(), Some("no route"));
    }

    #[test]
    fn duplicate_unit_verdicts_keep_first_reason() {
        let u = EntityId::new(3, 1);
        let mut r = MoveValidationResult::ok();
        r.disallow(u, "first");
        r.disallow(u, "second");
        assert_eq!(r.disallowed.get(&u).map(String::as_str), Some("first"));
    }
}
