use ironfront_protocol::{BattleId, Change, MovePhase, MoveValidationResult, PlayerId, UnitId};
use tracing::debug;

use crate::battle::{add_battle, conquer_on_the_move};
use crate::error::EngineError;
use crate::move_validate::{validate_move, MoveDescription};
use crate::state::GameState;

/// What performing a move produced.
#[derive(Debug)]
pub enum MoveOutcome {
    Moved { battle: Option<BattleId> },
    Rejected(MoveValidationResult),
}

/// Validate and perform a move: relocate the units (and any cargo riding
/// them), update transport bookkeeping, conquer blitzed territory on the
/// way, and register the battle the move produces.
pub fn perform_move(
    state: &mut GameState,
    md: &MoveDescription,
    player: PlayerId,
    phase: MovePhase,
) -> Result<MoveOutcome, EngineError> {
    let verdict = validate_move(state, md, player, phase);
    if !verdict.is_ok() {
        return Ok(MoveOutcome::Rejected(verdict));
    }

    let route = &md.route;
    let start = route.start();
    let end = route.end();
    let distance = route.distance();
    let map_is_load = route.is_load(&state.map);
    let map_is_unload = route.is_unload(&state.map);

    // Cargo follows its carrier.
    let mut moving = md.units.clone();
    for &id in &md.units {
        let cargo: Vec<UnitId> = state
            .units
            .iter_ordered()
            .filter(|(_, u)| u.transported_by == Some(id))
            .map(|(cid, _)| cid)
            .collect();
        for c in cargo {
            if !moving.contains(&c) {
                moving.push(c);
            }
        }
    }

    // Which transports are giving up cargo, before the links are cleared.
    let unload_transports: Vec<UnitId> = if map_is_unload {
        let mut out = Vec::new();
        for &id in &md.units {
            if let Some(t) = state.units.get(id).and_then(|u| u.transported_by) {
                if !out.contains(&t) {
                    out.push(t);
                }
            }
        }
        out
    } else {
        Vec::new()
    };

    state.apply(Change::UnitsMoved {
        units: moving.clone(),
        from: start,
        to: end,
    });

    for &id in &md.units {
        let is_land;
        let has_carrier;
        {
            let unit = state.units.get(id).ok_or(EngineError::UnknownUnit)?;
            is_land = state.rules.unit_type(unit.type_id).is_land();
            has_carrier = unit.transported_by.is_some();
        }
        let unit = state.units.get_mut(id).ok_or(EngineError::UnknownUnit)?;

        if map_is_load && is_land {
            // Boarding ends the unit's movement for the turn. The exact
            // transport was fixed at validation; riders keep only the link.
            unit.movement_left = 0;
            unit.loaded_this_turn = true;
        } else if map_is_unload && is_land && has_carrier {
            unit.transported_by = None;
            unit.unloaded_this_turn = true;
            unit.movement_left = 0;
        } else {
            unit.movement_left = unit.movement_left.saturating_sub(distance);
        }
    }

    if map_is_load {
        assign_boarded_transports(state, md, player);
    }
    for t in unload_transports {
        if let Some(unit) = state.units.get_mut(t) {
            unit.unloaded_this_turn = true;
            if phase.is_combat() {
                unit.unloaded_in_combat_phase = true;
            }
        }
    }

    // Blitzed territory is conquered in passing.
    if phase.is_combat() {
        let middle: Vec<_> = route.middle().to_vec();
        for t in middle {
            if state.map.is_water(t) {
                continue;
            }
            let hostile = state.is_hostile(t, player) || state.owner(t).is_none();
            if hostile && state.blocking_enemy_units_in(t, player).is_empty() {
                conquer_on_the_move(state, t, player, true);
            }
        }
    }

    let mut battle = None;
    if phase.is_combat() {
        let wants_battle = md.bombing
            || state.has_enemy_units(end, player)
            || state.is_hostile(end, player)
            || (!state.map.is_water(end) && state.owner(end).is_none());
        if wants_battle {
            battle = add_battle(state, route.clone(), &md.units, player, md.bombing);
        }
    }

    debug!(
        from = state.map.name(start),
        to = state.map.name(end),
        units = md.units.len(),
        battle = battle.is_some(),
        "move performed"
    );
    Ok(MoveOutcome::Moved { battle })
}

/// Fix rider -> transport links after a load move, honoring explicit
/// assignments and filling the rest greedily (validation guaranteed a fit).
fn assign_boarded_transports(state: &mut GameState, md: &MoveDescription, player: PlayerId) {
    let zone = md.route.end();

    let transports: Vec<UnitId> = state
        .units_in(zone)
        .into_iter()
        .filter(|&id| {
            let unit = state.units.get(id).expect("listed unit exists");
            state.relationships.are_allied(unit.owner, player)
                && state.rules.unit_type(unit.type_id).is_sea_transport()
        })
        .collect();

    let mut free: Vec<(UnitId, u32)> = transports
        .iter()
        .map(|&t| {
            let capacity = state
                .rules
                .unit_type(state.units.get(t).expect("transport exists").type_id)
                .transport_capacity
                .unwrap_or(0);
            let used: u32 = state
                .units
                .iter_ordered()
                .filter(|(_, u)| u.transported_by == Some(t))
                .map(|(_, u)| {
                    state
                        .rules
                        .unit_type(u.type_id)
                        .transport_cost
                        .unwrap_or(0)
                })
                .sum();
            (t, capacity.saturating_sub(used))
        })
        .collect();

    for &id in &md.units {
        let (is_land, cost) = {
            let unit = state.units.get(id).expect("mover exists");
            let rules = state.rules.unit_type(unit.type_id);
            (rules.is_land(), rules.transport_cost.unwrap_or(0))
        };
        if !is_land {
            continue;
        }
        let chosen = md
            .transport_assignments
            .get(&id)
            .copied()
            .or_else(|| {
                free.iter()
                    .find(|(_, capacity)| *capacity >= cost)
                    .map(|(t, _)| *t)
            });
        if let Some(transport) = chosen {
            if let Some((_, capacity)) = free.iter_mut().find(|(t, _)| *t == transport) {
                *capacity = capacity.saturating_sub(cost);
            }
            if let Some(unit) = state.units.get_mut(id) {
                unit.transported_by = Some(transport);
            }
        }
    }
}
