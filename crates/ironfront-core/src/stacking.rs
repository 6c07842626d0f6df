use std::collections::HashMap;

use ironfront_protocol::{PlayerId, TerritoryId, UnitTypeId};

use crate::rules::{StackContext, StackScope};
use crate::state::GameState;

/// Units provisionally accepted earlier in the same validation pass. Each
/// accepted unit consumes capacity for later units of the same type headed
/// to the same territory, so a batch cannot slip past a limit one unit at
/// a time.
#[derive(Clone, Debug, Default)]
pub struct PendingStacks {
    accepted: HashMap<(TerritoryId, UnitTypeId), u32>,
}

impl PendingStacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note(&mut self, territory: TerritoryId, unit_type: UnitTypeId) {
        *self.accepted.entry((territory, unit_type)).or_insert(0) += 1;
    }

    fn count(&self, territory: TerritoryId, unit_type: UnitTypeId) -> u32 {
        self.accepted
            .get(&(territory, unit_type))
            .copied()
            .unwrap_or(0)
    }
}

/// How many more units of `unit_type` the player may put into `territory`
/// under the given context. `None` means unbounded.
///
/// A territory already over its limit (legacy rule exceptions allow this)
/// reports zero remaining capacity, never a negative count.
pub fn remaining_capacity(
    state: &GameState,
    pending: &PendingStacks,
    ctx: StackContext,
    unit_type: UnitTypeId,
    territory: TerritoryId,
    player: PlayerId,
) -> Option<u32> {
    let rules = state.rules.unit_type(unit_type);
    let declared = rules.limit_for(ctx);

    // Classic ruleset carve-out: one anti-air unit per territory, full stop.
    let aa_override = if state.rules.properties.classic_one_aa_per_territory
        && rules.antiair.is_some()
    {
        Some((1, StackScope::Total))
    } else {
        None
    };

    let (max, scope) = match (declared, aa_override) {
        (Some(limit), Some((cap, cap_scope))) => {
            if limit.max <= cap {
                (limit.max, limit.scope)
            } else {
                (cap, cap_scope)
            }
        }
        (Some(limit), None) => (limit.max, limit.scope),
        (None, Some((cap, cap_scope))) => (cap, cap_scope),
        (None, None) => return None,
    };

    let mut present = 0_u32;
    for (_, unit) in state.units.iter_ordered() {
        if unit.territory != territory || unit.type_id != unit_type {
            continue;
        }
        let counts = match scope {
            StackScope::Owned => unit.owner == player,
            StackScope::Allied => state.relationships.are_allied(unit.owner, player),
            StackScope::Total => true,
        };
        if counts {
            present += 1;
        }
    }
    present += pending.count(territory, unit_type);

    Some(max.saturating_sub(present))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{load_setup, RulesSource};
    use crate::state::GameState;

    fn state_with(base: fn(&mut crate::rules::CompiledSetup)) -> GameState {
        let mut setup = load_setup(RulesSource::Embedded).expect("rules load");
        base(&mut setup);
        GameState::from_setup(setup)
    }

    #[test]
    fn capacity_floors_at_zero_when_already_over_limit() {
        let mut state = state_with(|_| {});
        let aa = state.rules.unit_type_id("aa_gun").expect("base unit");
        let berlin = state.map.id("germany").expect("base territory");
        let p = PlayerId(0);

        // aa_gun ships with placement_limit (1, total); stack two anyway.
        state.spawn_unit(aa, p, berlin);
        state.spawn_unit(aa, p, berlin);

        let remaining = remaining_capacity(
            &state,
            &PendingStacks::new(),
            StackContext::Placement,
            aa,
            berlin,
            p,
        );
        assert_eq!(remaining, Some(0));
    }

    #[test]
    fn unlimited_types_report_none() {
        let state = state_with(|_| {});
        let infantry = state.rules.unit_type_id("infantry").expect("base unit");
        let berlin = state.map.id("germany").expect("base territory");

        let remaining = remaining_capacity(
            &state,
            &PendingStacks::new(),
            StackContext::Movement,
            infantry,
            berlin,
            PlayerId(0),
        );
        assert_eq!(remaining, None);
    }

    #[test]
    fn pending_acceptances_consume_capacity() {
        let state = state_with(|_| {});
        let aa = state.rules.unit_type_id("aa_gun").expect("base unit");
        let berlin = state.map.id("germany").expect("base territory");
        let p = PlayerId(0);

        let mut pending = PendingStacks::new();
        assert_eq!(
            remaining_capacity(&state, &pending, StackContext::Placement, aa, berlin, p),
            Some(1)
        );
        pending.note(berlin, aa);
        assert_eq!(
            remaining_capacity(&state, &pending, StackContext::Placement, aa, berlin, p),
            Some(0)
        );
    }
}
