use ironfront_protocol::{BattleId, BattleKind};
use tracing::info;

use crate::battle::registry::fight;
use crate::dice::GameRng;
use crate::error::EngineError;
use crate::state::GameState;

/// Fight every pending battle for the phase in the fixed wave order:
///
/// 1. all air-interception battles,
/// 2. all strategic-bombing raids (in passes, since the first wave can
///    leave fresh raids behind),
/// 3. battles whose defense has no dice power, so dependent amphibious
///    assaults are never left waiting on a foregone conclusion,
/// 4. any territory down to a single pending battle.
///
/// Resolution order within one phase is fully deterministic.
pub fn fight_all_battles(state: &mut GameState, rng: &mut GameRng) -> Result<(), EngineError> {
    // Wave 1: air battles clear the sky first.
    fight_matching(state, rng, |state, id| {
        state
            .battles
            .battle(id)
            .map(|b| b.kind.is_air_battle())
            .unwrap_or(false)
    })?;

    // Wave 2: bombing raids, repeated until none remain pending.
    fight_matching(state, rng, |state, id| {
        state
            .battles
            .battle(id)
            .map(|b| b.kind == BattleKind::BombingRaid)
            .unwrap_or(false)
    })?;

    // Wave 3: auto-resolve battles the defense cannot contest.
    fight_matching(state, rng, |state, id| defensive_power(state, id) == 0)?;

    // Wave 4: territories with exactly one remaining battle, then anything
    // left unblocked, until the board is clear.
    loop {
        if state.battles.pending_count() == 0 {
            info!("all battles resolved for phase");
            return Ok(());
        }

        let mut fought_any = false;
        for id in state.battles.pending_ids() {
            let Some(battle) = state.battles.battle(id) else {
                continue;
            };
            let alone = state
                .battles
                .pending_ids()
                .into_iter()
                .filter(|&other| {
                    state
                        .battles
                        .battle(other)
                        .map(|b| b.territory == battle.territory)
                        .unwrap_or(false)
                })
                .count()
                == 1;
            if alone && !state.battles.is_blocked(id) {
                fight(state, id, rng)?;
                fought_any = true;
            }
        }
        if fought_any {
            continue;
        }

        // No singleton available; take any unblocked battle.
        let next = state
            .battles
            .pending_ids()
            .into_iter()
            .find(|&id| !state.battles.is_blocked(id));
        match next {
            Some(id) => {
                fight(state, id, rng)?;
            }
            None => {
                // Acyclicity makes this unreachable; failing loudly beats
                // spinning.
                return Err(EngineError::Inconsistent(
                    "pending battles remain but all are blocked".to_string(),
                ));
            }
        }
    }
}

fn fight_matching(
    state: &mut GameState,
    rng: &mut GameRng,
    pred: impl Fn(&GameState, BattleId) -> bool,
) -> Result<(), EngineError> {
    loop {
        let next = state
            .battles
            .pending_ids()
            .into_iter()
            .find(|&id| pred(state, id) && !state.battles.is_blocked(id));
        let Some(id) = next else {
            return Ok(());
        };
        fight(state, id, rng)?;
    }
}

/// Total defensive dice power in a battle's territory: defense values of
/// standing enemy units plus a point for every anti-air battery.
fn defensive_power(state: &GameState, id: BattleId) -> u32 {
    let Some(battle) = state.battles.battle(id) else {
        return 0;
    };
    state
        .enemy_units_in(battle.territory, battle.attacker)
        .into_iter()
        .map(|unit_id| {
            let unit = state.units.get(unit_id).expect("listed unit exists");
            if unit.submerged {
                return 0;
            }
            let rules = state.rules.unit_type(unit.type_id);
            if rules.is_infrastructure {
                return 0;
            }
            let aa = u32::from(rules.antiair.is_some());
            state.rules.defense_value(unit.type_id, state.tech(unit.owner)) * rules.defense_rolls
                + aa
        })
        .sum()
}
