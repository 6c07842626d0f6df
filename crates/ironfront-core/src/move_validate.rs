use std::collections::{BTreeMap, HashMap};

use ironfront_protocol::{
    BattleKind, MovePhase, MoveValidationResult, PlayerId, ResourceId, TerritoryId, UnitId,
};

use crate::map::Route;
use crate::rules::{StackContext, TechEffect};
use crate::stacking::{remaining_capacity, PendingStacks};
use crate::state::GameState;

// Named validation errors surfaced to the caller. These are contract, not
// display strings: UIs and AIs match on them.
pub const TRANSPORT_HAS_ALREADY_UNLOADED_UNITS_IN_A_PREVIOUS_PHASE: &str =
    "TRANSPORT_HAS_ALREADY_UNLOADED_UNITS_IN_A_PREVIOUS_PHASE";
pub const ENEMY_SUBMARINE_PREVENTING_UNESCORTED_LANDING: &str =
    "ENEMY_SUBMARINE_PREVENTING_UNESCORTED_LANDING";
pub const NOT_ALL_UNITS_CAN_BLITZ: &str = "NOT_ALL_UNITS_CAN_BLITZ";
pub const TRANSPORT_CANNOT_LOAD_IN_HOSTILE_SEA_ZONE: &str =
    "TRANSPORT_CANNOT_LOAD_IN_HOSTILE_SEA_ZONE";
pub const CANNOT_LEAVE_ACTIVE_BATTLE: &str = "CANNOT_LEAVE_ACTIVE_BATTLE";

/// A proposed move: a unit group, the route it takes, and any explicit
/// rider-to-transport choices the caller has already made.
#[derive(Clone, Debug)]
pub struct MoveDescription {
    pub units: Vec<UnitId>,
    pub route: Route,
    /// Rider -> carrying transport (sea or air), where the caller has
    /// resolved the choice. Missing entries are resolved automatically
    /// when unambiguous.
    pub transport_assignments: BTreeMap<UnitId, UnitId>,
    /// This move is a strategic bombing run rather than an attack.
    pub bombing: bool,
}

impl MoveDescription {
    pub fn new(units: Vec<UnitId>, route: Route) -> Self {
        Self {
            units,
            route,
            transport_assignments: BTreeMap::new(),
            bombing: false,
        }
    }
}

/// Movement validation: an ordered pipeline of checks. The pipeline stops
/// at the first hard error; unit-level verdicts accumulate across the
/// non-fatal checks.
pub fn validate_move(
    state: &GameState,
    md: &MoveDescription,
    player: PlayerId,
    phase: MovePhase,
) -> MoveValidationResult {
    let mut result = MoveValidationResult::ok();

    for check in [
        check_sanity,
        check_phase_rules,
        check_enemy_transit,
        check_sea_transports,
        check_air_transports,
        check_land_transports,
        check_carrier_space,
        check_canals,
        check_fees,
        check_battle_exit,
        check_stacking,
    ] {
        result.absorb(check(state, md, player, phase));
        if result.has_error() {
            return result;
        }
    }

    result
}

// -------------------------------------------------------------------
// 1. Sanity
// -------------------------------------------------------------------

fn check_sanity(
    state: &GameState,
    md: &MoveDescription,
    player: PlayerId,
    _phase: MovePhase,
) -> MoveValidationResult {
    if md.units.is_empty() {
        return MoveValidationResult::hard_error("no units selected");
    }
    if md.route.distance() == 0 {
        return MoveValidationResult::hard_error("route does not go anywhere");
    }
    if !md.route.is_valid(&state.map) {
        return MoveValidationResult::hard_error("route is not connected");
    }

    let mut seen = md.units.clone();
    seen.sort();
    seen.dedup();
    if seen.len() != md.units.len() {
        return MoveValidationResult::hard_error("duplicate units in move");
    }

    for &id in &md.units {
        let Some(unit) = state.units.get(id) else {
            return MoveValidationResult::hard_error("unknown unit in move");
        };
        if unit.owner != player {
            return MoveValidationResult::hard_error("cannot move another player's units");
        }
        if unit.territory != md.route.start() {
            return MoveValidationResult::hard_error(
                "units are not all in the route's starting territory",
            );
        }
    }

    for &t in md.route.steps() {
        if state.map.rules(t).impassable {
            return MoveValidationResult::hard_error("route crosses impassable territory");
        }
    }

    MoveValidationResult::ok()
}

// -------------------------------------------------------------------
// 2. Phase-specific legality
// -------------------------------------------------------------------

fn check_phase_rules(
    state: &GameState,
    md: &MoveDescription,
    player: PlayerId,
    phase: MovePhase,
) -> MoveValidationResult {
    let mut result = MoveValidationResult::ok();
    let end = md.route.end();

    // Transit or entry into another player's territory needs a standing:
    // allied passage or open war. A merely neutral relationship blocks.
    for &t in md.route.steps() {
        if state.map.is_water(t) {
            continue;
        }
        if let Some(owner) = state.owner(t) {
            if !state.relationships.are_allied(owner, player)
                && !state.relationships.is_at_war(owner, player)
            {
                return MoveValidationResult::hard_error(
                    "cannot enter the territory of a player you are not at war with",
                );
            }
        }
    }

    match phase {
        MovePhase::CombatMove => {
            for &id in &md.units {
                let unit = state.units.get(id).expect("validated in sanity");
                if state.rules.unit_type(unit.type_id).cannot_move_during_combat {
                    result.disallow(id, "cannot move during the combat phase");
                }
            }

            // Hostile or unowned-neutral middle land territories are blitz
            // country.
            let hostile_middle: Vec<TerritoryId> = md
                .route
                .middle()
                .iter()
                .copied()
                .filter(|&t| {
                    !state.map.is_water(t)
                        && (state.is_hostile(t, player) || state.owner(t).is_none())
                })
                .collect();
            if !hostile_middle.is_empty() {
                for &id in &md.units {
                    let unit = state.units.get(id).expect("validated in sanity");
                    let rules = state.rules.unit_type(unit.type_id);
                    if rules.is_land() && !rules.can_blitz {
                        result.disallow(id, NOT_ALL_UNITS_CAN_BLITZ);
                    }
                }
            }
        }
        MovePhase::NonCombatMove => {
            let contested =
                !state.blocking_enemy_units_in(end, player).is_empty() || md.bombing;
            let enemy_ground = !state.map.is_water(end)
                && match state.owner(end) {
                    Some(owner) => state.relationships.is_at_war(owner, player),
                    None => !state.map.rules(end).impassable,
                };
            if contested || enemy_ground {
                return MoveValidationResult::hard_error(
                    "cannot advance into enemy or neutral territory during non-combat movement",
                );
            }
            for &id in &md.units {
                let unit = state.units.get(id).expect("validated in sanity");
                if unit.was_in_combat && !state.rules.unit_type(unit.type_id).is_air() {
                    result.disallow(id, "already fought this turn");
                }
            }
        }
    }

    // Movement allowance, ignoring units that will ride a transport.
    for &id in &md.units {
        let unit = state.units.get(id).expect("validated in sanity");
        if unit.transported_by.is_some() || md.transport_assignments.contains_key(&id) {
            continue;
        }
        let rides_land_transport = state.rules.land_transportable(unit.type_id, state.tech(player));
        if unit.movement_left < md.route.distance() && !rides_land_transport {
            result.disallow(id, "not enough movement");
        }
    }

    result
}

// -------------------------------------------------------------------
// 3. Enemy-occupied path
// -------------------------------------------------------------------

fn check_enemy_transit(
    state: &GameState,
    md: &MoveDescription,
    player: PlayerId,
    _phase: MovePhase,
) -> MoveValidationResult {
    for &t in md.route.middle() {
        let blocking = state.blocking_enemy_units_in(t, player);
        if blocking.is_empty() {
            continue;
        }
        let enemy_destroyer = blocking.iter().any(|&id| {
            state
                .units
                .get(id)
                .map(|u| state.rules.unit_type(u.type_id).is_destroyer)
                .unwrap_or(false)
        });
        let all_can_slip = md.units.iter().all(|&id| {
            let unit = state.units.get(id).expect("validated in sanity");
            if unit.transported_by.is_some() || md.transport_assignments.contains_key(&id) {
                return true; // rides with its carrier
            }
            let rules = state.rules.unit_type(unit.type_id);
            rules.is_air() || (rules.is_sea() && rules.can_evade && !enemy_destroyer)
        });
        if !all_can_slip {
            return MoveValidationResult::hard_error(
                "cannot move through territories held by enemy units",
            );
        }
    }
    MoveValidationResult::ok()
}

// -------------------------------------------------------------------
// 4. Sea transports: loading, riding, unloading
// -------------------------------------------------------------------

fn check_sea_transports(
    state: &GameState,
    md: &MoveDescription,
    player: PlayerId,
    phase: MovePhase,
) -> MoveValidationResult {
    let mut result = MoveValidationResult::ok();
    let map = &state.map;

    if md.route.is_unload(map) {
        let origin = md.route.start();

        if md.route.distance() != 1 {
            return MoveValidationResult::hard_error(
                "unloading must be exactly one territory from the sea zone",
            );
        }

        let mut riders: Vec<(UnitId, UnitId)> = Vec::new();
        for &id in &md.units {
            let unit = state.units.get(id).expect("validated in sanity");
            if state.rules.unit_type(unit.type_id).is_land() {
                match unit.transported_by {
                    Some(t) => riders.push((id, t)),
                    None => result.disallow(id, "unit is not aboard a transport"),
                }
                // Ferrying in one turn is an assault move, not a non-combat
                // shuttle.
                if unit.loaded_this_turn && phase == MovePhase::NonCombatMove {
                    result.disallow(id, "cannot load and unload in the same turn");
                }
            }
        }

        // A transport that unloaded in an earlier phase is locked out for
        // the rest of the turn.
        for &(rider, transport) in &riders {
            let locked = phase == MovePhase::NonCombatMove
                && state
                    .units
                    .get(transport)
                    .map(|t| t.unloaded_in_combat_phase)
                    .unwrap_or(false);
            if locked {
                let mut hard =
                    MoveValidationResult::hard_error(TRANSPORT_HAS_ALREADY_UNLOADED_UNITS_IN_A_PREVIOUS_PHASE);
                hard.disallow(rider, TRANSPORT_HAS_ALREADY_UNLOADED_UNITS_IN_A_PREVIOUS_PHASE);
                result.absorb(hard);
                return result;
            }
        }

        // Enemy submarines in the origin zone pin an unescorted landing.
        if phase == MovePhase::CombatMove
            && state.rules.properties.subs_prevent_unescorted_landings
        {
            let enemy_evaders = state.enemy_units_in(origin, player).into_iter().any(|id| {
                state
                    .units
                    .get(id)
                    .map(|u| state.rules.unit_type(u.type_id).can_evade)
                    .unwrap_or(false)
            });
            let escorted = state.units_in(origin).into_iter().any(|id| {
                let unit = state.units.get(id).expect("listed unit exists");
                let rules = state.rules.unit_type(unit.type_id);
                state.relationships.are_allied(unit.owner, player)
                    && rules.is_sea()
                    && !rules.is_sea_transport()
                    && rules.is_combat_unit()
            });
            if enemy_evaders && !escorted {
                for &(rider, _) in &riders {
                    result.disallow(rider, ENEMY_SUBMARINE_PREVENTING_UNESCORTED_LANDING);
                }
            }
        }

        return result;
    }

    if md.route.is_load(map) {
        let boarding_zone = md.route.end();

        // Loading under enemy guns is not allowed.
        if !state.blocking_enemy_units_in(boarding_zone, player).is_empty() {
            for &id in &md.units {
                let unit = state.units.get(id).expect("validated in sanity");
                if state.rules.unit_type(unit.type_id).is_land() {
                    result.disallow(id, TRANSPORT_CANNOT_LOAD_IN_HOSTILE_SEA_ZONE);
                }
            }
            return result;
        }

        // Free capacity per allied transport in the boarding zone. A
        // transport that already unloaded this turn takes no new cargo.
        let mut free: HashMap<UnitId, u32> = HashMap::new();
        for id in state.units_in(boarding_zone) {
            let unit = state.units.get(id).expect("listed unit exists");
            let rules = state.rules.unit_type(unit.type_id);
            if !state.relationships.are_allied(unit.owner, player)
                || !rules.is_sea_transport()
                || unit.unloaded_this_turn
            {
                continue;
            }
            let capacity = rules.transport_capacity.unwrap_or(0);
            let used: u32 = state
                .units
                .iter_ordered()
                .filter(|(_, u)| u.transported_by == Some(id))
                .map(|(_, u)| {
                    state
                        .rules
                        .unit_type(u.type_id)
                        .transport_cost
                        .unwrap_or(0)
                })
                .sum();
            free.insert(id, capacity.saturating_sub(used));
        }

        for &id in &md.units {
            let unit = state.units.get(id).expect("validated in sanity");
            let rules = state.rules.unit_type(unit.type_id);
            if !rules.is_land() {
                continue;
            }
            let Some(cost) = rules.transport_cost else {
                result.disallow(id, "unit cannot be carried by sea transports");
                continue;
            };
            if let Some(&transport) = md.transport_assignments.get(&id) {
                match free.get_mut(&transport) {
                    Some(capacity) if *capacity >= cost => *capacity -= cost,
                    _ => result.disallow(id, "assigned transport has no capacity"),
                }
                continue;
            }
            let candidates: Vec<UnitId> = free
                .iter()
                .filter(|(_, &capacity)| capacity >= cost)
                .map(|(&t, _)| t)
                .collect();
            match candidates.len() {
                0 => result.disallow(id, "no transport with free capacity"),
                1 => {
                    *free.get_mut(&candidates[0]).expect("candidate exists") -= cost;
                }
                _ => result.unresolve(id, "multiple transports can carry this unit"),
            }
        }

        return result;
    }

    // Pure-land or pure-sea route: land units must not touch water.
    for &id in &md.units {
        let unit = state.units.get(id).expect("validated in sanity");
        let rules = state.rules.unit_type(unit.type_id);
        if rules.is_land()
            && unit.transported_by.is_none()
            && md.route.crosses_water(map)
        {
            result.disallow(id, "land units cannot cross water without a transport");
        }
        if rules.is_sea() && md.route.all().iter().any(|&t| !map.is_water(t)) {
            result.disallow(id, "sea units cannot cross land");
        }
    }

    result
}

// -------------------------------------------------------------------
// 5. Air transports / paratroopers, including timing
// -------------------------------------------------------------------

fn check_air_transports(
    state: &GameState,
    md: &MoveDescription,
    player: PlayerId,
    phase: MovePhase,
) -> MoveValidationResult {
    let mut result = MoveValidationResult::ok();

    let carriers: Vec<UnitId> = md
        .units
        .iter()
        .copied()
        .filter(|&id| {
            let unit = state.units.get(id).expect("validated in sanity");
            state.rules.unit_type(unit.type_id).is_air_transport
        })
        .collect();
    let riders: Vec<UnitId> = md
        .units
        .iter()
        .copied()
        .filter(|&id| {
            let unit = state.units.get(id).expect("validated in sanity");
            let rules = state.rules.unit_type(unit.type_id);
            rules.is_air_transportable
                && (md.transport_assignments.get(&id).is_some_and(|t| {
                    state
                        .units
                        .get(*t)
                        .map(|u| state.rules.unit_type(u.type_id).is_air_transport)
                        .unwrap_or(false)
                }) || (unit.movement_left < md.route.distance() && !carriers.is_empty()))
        })
        .collect();

    if riders.is_empty() {
        return result;
    }

    if !state.tech(player).has(&state.rules, TechEffect::Paratroopers) {
        for id in riders {
            result.disallow(id, "paratroopers require the paratrooper technology");
        }
        return result;
    }

    // Drops happen during combat movement, into hostile ground.
    if phase == MovePhase::NonCombatMove {
        for &id in &riders {
            result.disallow(id, "paratroopers only drop during combat movement");
        }
        return result;
    }
    let end = md.route.end();
    if state.map.is_water(end) || !state.is_hostile(end, player) {
        for &id in &riders {
            result.disallow(id, "paratroopers must drop into hostile territory");
        }
        return result;
    }

    let capacity: u32 = carriers
        .iter()
        .map(|&id| {
            let unit = state.units.get(id).expect("validated in sanity");
            state
                .rules
                .unit_type(unit.type_id)
                .air_transport_capacity
                .unwrap_or(0)
        })
        .sum();
    if (riders.len() as u32) > capacity {
        for &id in riders.iter().skip(capacity as usize) {
            result.disallow(id, "no air transport capacity left");
        }
    }

    result
}

// -------------------------------------------------------------------
// Land transports (mechanized movement)
// -------------------------------------------------------------------

fn check_land_transports(
    state: &GameState,
    md: &MoveDescription,
    player: PlayerId,
    _phase: MovePhase,
) -> MoveValidationResult {
    let mut result = MoveValidationResult::ok();

    let riders: Vec<UnitId> = md
        .units
        .iter()
        .copied()
        .filter(|&id| {
            let unit = state.units.get(id).expect("validated in sanity");
            unit.transported_by.is_none()
                && !md.transport_assignments.contains_key(&id)
                && unit.movement_left < md.route.distance()
                && state.rules.unit_type(unit.type_id).is_land()
        })
        .collect();
    if riders.is_empty() {
        return result;
    }

    let capacity: u32 = md
        .units
        .iter()
        .map(|&id| {
            let unit = state.units.get(id).expect("validated in sanity");
            let rules = state.rules.unit_type(unit.type_id);
            if rules.is_land_transport && unit.movement_left >= md.route.distance() {
                rules.land_transport_capacity.unwrap_or(0)
            } else {
                0
            }
        })
        .sum();

    let mut used = 0_u32;
    for &id in &riders {
        let unit = state.units.get(id).expect("validated in sanity");
        if !state.rules.land_transportable(unit.type_id, state.tech(player)) {
            // Already disallowed as "not enough movement" in phase rules.
            continue;
        }
        if used < capacity {
            used += 1;
        } else {
            result.disallow(id, "no land transport capacity left");
        }
    }

    result
}

// -------------------------------------------------------------------
// Carrier space for air units ending at sea
// -------------------------------------------------------------------

fn check_carrier_space(
    state: &GameState,
    md: &MoveDescription,
    player: PlayerId,
    _phase: MovePhase,
) -> MoveValidationResult {
    let mut result = MoveValidationResult::ok();
    let end = md.route.end();
    if !state.map.is_water(end) {
        return result;
    }

    let needy: Vec<(UnitId, u32)> = md
        .units
        .iter()
        .filter_map(|&id| {
            let unit = state.units.get(id).expect("validated in sanity");
            let rules = state.rules.unit_type(unit.type_id);
            if rules.is_air() {
                rules.carrier_cost.map(|c| (id, c))
            } else {
                None
            }
        })
        .collect();
    if needy.is_empty() {
        return result;
    }

    let mut capacity: u32 = 0;
    // Carriers sailing with the group plus allied carriers already there.
    for &id in &md.units {
        let unit = state.units.get(id).expect("validated in sanity");
        capacity += state
            .rules
            .unit_type(unit.type_id)
            .carrier_capacity
            .unwrap_or(0);
    }
    for id in state.units_in(end) {
        let unit = state.units.get(id).expect("listed unit exists");
        if state.relationships.are_allied(unit.owner, player) {
            capacity += state
                .rules
                .unit_type(unit.type_id)
                .carrier_capacity
                .unwrap_or(0);
            // Hosted air already at the destination keeps its seat.
            if state.rules.unit_type(unit.type_id).is_air() {
                capacity = capacity
                    .saturating_sub(state.rules.unit_type(unit.type_id).carrier_cost.unwrap_or(0));
            }
        }
    }

    let mut left = capacity;
    for (id, cost) in needy {
        if cost <= left {
            left -= cost;
        } else {
            result.disallow(id, "no carrier space at destination");
        }
    }
    result
}

// -------------------------------------------------------------------
// 6. Canals
// -------------------------------------------------------------------

fn check_canals(
    state: &GameState,
    md: &MoveDescription,
    player: PlayerId,
    phase: MovePhase,
) -> MoveValidationResult {
    for pair in md.route.all().windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if !state.map.is_water(a) || !state.map.is_water(b) {
            continue;
        }
        for canal in state.map.canals_between(a, b) {
            for &gate in &canal.controlled_by {
                let controlled = state
                    .owner(gate)
                    .map(|o| state.relationships.are_allied(o, player))
                    .unwrap_or(false);
                // A gate captured this turn does not open the canal yet.
                let just_taken =
                    phase.is_combat() && state.battles.conquered().contains(&gate);
                if !controlled || just_taken {
                    return MoveValidationResult::hard_error(format!(
                        "canal {} is not controlled",
                        canal.name
                    ));
                }
            }
        }
    }
    MoveValidationResult::ok()
}

// -------------------------------------------------------------------
// 7. Fuel and neutrality fees
// -------------------------------------------------------------------

fn check_fees(
    state: &GameState,
    md: &MoveDescription,
    player: PlayerId,
    _phase: MovePhase,
) -> MoveValidationResult {
    let mut needed: BTreeMap<ResourceId, i64> = BTreeMap::new();

    let distance = md.route.distance() as i64;
    for &id in &md.units {
        let unit = state.units.get(id).expect("validated in sanity");
        for &(resource, cost) in &state.rules.unit_type(unit.type_id).fuel_cost {
            *needed.entry(resource).or_insert(0) += cost as i64 * distance;
        }
    }

    let neutral_entries = md
        .route
        .steps()
        .iter()
        .filter(|&&t| !state.map.is_water(t) && state.owner(t).is_none())
        .count() as i64;
    if neutral_entries > 0 {
        if let Some(resource) = state.rules.primary_resource() {
            *needed.entry(resource).or_insert(0) +=
                neutral_entries * state.rules.properties.neutral_fee;
        }
    }

    for (resource, amount) in needed {
        if state.resource(player, resource) < amount {
            return MoveValidationResult::hard_error(
                "insufficient resources to pay for the move",
            );
        }
    }
    MoveValidationResult::ok()
}

// -------------------------------------------------------------------
// 8. Cannot exit an active battle zone
// -------------------------------------------------------------------

fn check_battle_exit(
    state: &GameState,
    md: &MoveDescription,
    player: PlayerId,
    _phase: MovePhase,
) -> MoveValidationResult {
    let mut result = MoveValidationResult::ok();
    let start = md.route.start();
    if state
        .battles
        .get_pending_battle_of(start, BattleKind::Normal)
        .is_none()
    {
        return result;
    }

    let end = md.route.end();
    let destination_contested = state.is_hostile(end, player)
        || state.battles.get_pending_battle(end, false).is_some();

    for &id in &md.units {
        let unit = state.units.get(id).expect("validated in sanity");
        if state.rules.unit_type(unit.type_id).is_air() {
            continue;
        }
        if destination_contested {
            continue;
        }
        result.disallow(id, CANNOT_LEAVE_ACTIVE_BATTLE);
    }
    result
}

// -------------------------------------------------------------------
// Stacking limits, per territory entered
// -------------------------------------------------------------------

fn check_stacking(
    state: &GameState,
    md: &MoveDescription,
    player: PlayerId,
    phase: MovePhase,
) -> MoveValidationResult {
    let mut result = MoveValidationResult::ok();
    let mut pending = PendingStacks::new();
    let end = md.route.end();

    for &id in &md.units {
        let unit = state.units.get(id).expect("validated in sanity");
        let mut blocked = false;
        for &t in md.route.steps() {
            let ctx = if t == end && phase.is_combat() && state.is_hostile(t, player) {
                StackContext::Attacking
            } else {
                StackContext::Movement
            };
            match remaining_capacity(state, &pending, ctx, unit.type_id, t, player) {
                Some(0) => {
                    result.disallow(id, "stacking limit reached");
                    blocked = true;
                    break;
                }
                _ => {}
            }
        }
        if !blocked {
            for &t in md.route.steps() {
                pending.note(t, unit.type_id);
            }
        }
    }
    result
}
