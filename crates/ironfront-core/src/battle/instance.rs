use ironfront_protocol::{BattleKind, Change, ChronicleEvent, PlayerId, TerritoryId, UnitId};
use tracing::debug;

use crate::battle::capture;
use crate::battle::registry::PendingBattle;
use crate::dice::GameRng;
use crate::error::EngineError;
use crate::state::GameState;

/// Result of fighting one battle instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BattleOutcome {
    AttackerWins { captured: bool },
    DefenderWins,
    /// Neither side was eliminated within the round cap.
    Stalemate,
    /// Non-fighting encounter, nothing to resolve.
    NoFight,
    Raided { damage: u32 },
}

/// Dispatch on the battle's kind. Dice enter the engine only here.
pub(crate) fn resolve(
    state: &mut GameState,
    battle: &PendingBattle,
    rng: &mut GameRng,
) -> Result<BattleOutcome, EngineError> {
    let outcome = match battle.kind {
        BattleKind::Finished => resolve_finished(state, battle),
        BattleKind::NonFighting => BattleOutcome::NoFight,
        BattleKind::BombingRaid => resolve_bombing_raid(state, battle, rng),
        BattleKind::AirRaid | BattleKind::AirInterception => resolve_air_battle(state, battle, rng),
        BattleKind::Normal => resolve_normal(state, battle, rng),
    };

    let winner = match outcome {
        BattleOutcome::AttackerWins { .. } | BattleOutcome::Raided { .. } => Some(battle.attacker),
        BattleOutcome::DefenderWins => state.owner(battle.territory),
        _ => None,
    };
    state.record(ChronicleEvent::BattleFought {
        territory: battle.territory,
        kind: battle.kind,
        attacker: battle.attacker,
        winner,
    });

    Ok(outcome)
}

fn resolve_finished(state: &mut GameState, battle: &PendingBattle) -> BattleOutcome {
    let captured = capture::take_territory(state, battle.territory, battle.attacker, false);
    BattleOutcome::AttackerWins { captured }
}

// -------------------------------------------------------------------
// Shared pieces
// -------------------------------------------------------------------

fn live_attackers(state: &GameState, battle: &PendingBattle) -> Vec<UnitId> {
    battle
        .attackers
        .keys()
        .copied()
        .filter(|&id| state.units.contains(id))
        .collect()
}

/// Combat-relevant defenders: enemy units in the territory that are not
/// infrastructure and not submerged. Infrastructure waits for capture.
fn gather_defenders(state: &GameState, battle: &PendingBattle) -> Vec<UnitId> {
    state
        .enemy_units_in(battle.territory, battle.attacker)
        .into_iter()
        .filter(|&id| {
            let unit = state.units.get(id).expect("listed unit exists");
            let rules = state.rules.unit_type(unit.type_id);
            !unit.submerged && !rules.is_infrastructure
        })
        .collect()
}

fn side_has_destroyer(state: &GameState, units: &[UnitId]) -> bool {
    units.iter().any(|&id| {
        state
            .units
            .get(id)
            .map(|u| state.rules.unit_type(u.type_id).is_destroyer)
            .unwrap_or(false)
    })
}

/// Defending evaders slip away when the attacker brings no destroyer.
fn submerge_evaders(state: &mut GameState, defenders: &mut Vec<UnitId>, attackers: &[UnitId]) {
    if side_has_destroyer(state, attackers) {
        return;
    }
    let mut kept = Vec::with_capacity(defenders.len());
    for &id in defenders.iter() {
        let can_evade = state
            .units
            .get(id)
            .map(|u| state.rules.unit_type(u.type_id).can_evade)
            .unwrap_or(false);
        if can_evade {
            if let Some(unit) = state.units.get_mut(id) {
                unit.submerged = true;
            }
        } else {
            kept.push(id);
        }
    }
    *defenders = kept;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Attack,
    Defense,
}

fn combat_value(state: &GameState, id: UnitId, side: Side, first_round_amphibious: bool) -> u32 {
    let unit = state.units.get(id).expect("combatant exists");
    let tech = state.tech(unit.owner);
    match side {
        Side::Attack => {
            let mut value = state.rules.attack_value(unit.type_id, tech);
            // Marines hit harder on the beach.
            if first_round_amphibious && state.rules.unit_type(unit.type_id).is_marine {
                value = (value + 1).min(state.rules.properties.dice_sides);
            }
            value
        }
        Side::Defense => state.rules.defense_value(unit.type_id, tech),
    }
}

fn roll_count(state: &GameState, id: UnitId, side: Side) -> u32 {
    let unit = state.units.get(id).expect("combatant exists");
    let tech = state.tech(unit.owner);
    match side {
        Side::Attack => state.rules.attack_rolls(unit.type_id, tech),
        Side::Defense => state.rules.unit_type(unit.type_id).defense_rolls.max(1),
    }
}

/// Fire one volley for `firing`, returning total hits and which units
/// scored (for suicide-on-hit bookkeeping).
fn volley(
    state: &GameState,
    rng: &mut GameRng,
    firing: &[UnitId],
    side: Side,
    first_round_amphibious: bool,
) -> (u32, Vec<UnitId>) {
    let dice_sides = state.rules.properties.dice_sides;
    let mut hits = 0;
    let mut scorers = Vec::new();
    for &id in firing {
        let strength = combat_value(state, id, side, first_round_amphibious);
        if strength == 0 {
            continue;
        }
        let mut scored = false;
        for _ in 0..roll_count(state, id, side) {
            if rng.roll_die(dice_sides) <= strength {
                hits += 1;
                scored = true;
            }
        }
        if scored {
            scorers.push(id);
        }
    }
    (hits, scorers)
}

/// Deterministic casualty selection: multi-hit-point units absorb first,
/// then the weakest units die, transports and other zero-value units last.
/// There is no interactive chooser in the core.
fn assign_casualties(
    state: &mut GameState,
    territory: TerritoryId,
    side_units: &mut Vec<UnitId>,
    side: Side,
    mut hits: u32,
) -> Vec<UnitId> {
    if hits == 0 || side_units.is_empty() {
        return Vec::new();
    }

    // Soak into spare hit points before losing whole units.
    for &id in side_units.iter() {
        if hits == 0 {
            break;
        }
        let spare = {
            let unit = state.units.get(id).expect("combatant exists");
            unit.hit_points_left(&state.rules).saturating_sub(1)
        };
        let soak = spare.min(hits);
        if soak > 0 {
            if let Some(unit) = state.units.get_mut(id) {
                unit.hits += soak;
            }
            hits -= soak;
        }
    }

    let mut by_value: Vec<(u32, UnitId)> = side_units
        .iter()
        .map(|&id| {
            let value = combat_value(state, id, side, false);
            let key = if value == 0 { u32::MAX } else { value };
            (key, id)
        })
        .collect();
    by_value.sort();

    let killed: Vec<UnitId> = by_value
        .into_iter()
        .take(hits as usize)
        .map(|(_, id)| id)
        .collect();

    if !killed.is_empty() {
        state.apply(Change::UnitsRemoved {
            units: killed.clone(),
            territory,
        });
        side_units.retain(|id| !killed.contains(id));
    }
    killed
}

fn remove_units(state: &mut GameState, territory: TerritoryId, units: Vec<UnitId>) {
    if !units.is_empty() {
        state.apply(Change::UnitsRemoved { units, territory });
    }
}

/// Anti-air fire against attacking air units. Happens before anything else
/// and casualties never fire back.
fn anti_air_phase(
    state: &mut GameState,
    territory: TerritoryId,
    attacker: PlayerId,
    air_targets: &mut Vec<UnitId>,
    rng: &mut GameRng,
) {
    if air_targets.is_empty() {
        return;
    }
    let guns: Vec<UnitId> = state
        .enemy_units_in(territory, attacker)
        .into_iter()
        .filter(|&id| {
            let unit = state.units.get(id).expect("listed unit exists");
            state.rules.unit_type(unit.type_id).antiair.is_some()
        })
        .collect();
    if guns.is_empty() {
        return;
    }

    let mut hits = 0;
    for &gun in &guns {
        let unit = state.units.get(gun).expect("gun exists");
        let tech = state.tech(unit.owner);
        let Some((strength, die_sides)) = state.rules.aa_attack_value(unit.type_id, tech) else {
            continue;
        };
        let max_shots = state
            .rules
            .unit_type(unit.type_id)
            .antiair
            .and_then(|aa| aa.max_shots)
            .unwrap_or(air_targets.len() as u32);
        let shots = max_shots.min(air_targets.len() as u32);
        for _ in 0..shots {
            if rng.roll_die(die_sides) <= strength {
                hits += 1;
            }
        }
    }

    if hits == 0 {
        return;
    }
    // Cheapest air units fall first.
    let mut by_value: Vec<(u32, UnitId)> = air_targets
        .iter()
        .map(|&id| (combat_value(state, id, Side::Attack, false), id))
        .collect();
    by_value.sort();
    let killed: Vec<UnitId> = by_value
        .into_iter()
        .take(hits as usize)
        .map(|(_, id)| id)
        .collect();
    debug!(count = killed.len(), "air units lost to anti-air fire");
    air_targets.retain(|id| !killed.contains(id));
    remove_units(state, territory, killed);
}

fn split_air(state: &GameState, units: &[UnitId]) -> Vec<UnitId> {
    units
        .iter()
        .copied()
        .filter(|&id| {
            state
                .units
                .get(id)
                .map(|u| state.rules.unit_type(u.type_id).is_air())
                .unwrap_or(false)
        })
        .collect()
}

fn drop_suicide_units(
    state: &mut GameState,
    territory: TerritoryId,
    units: &mut Vec<UnitId>,
    side: Side,
    scorers: &[UnitId],
) {
    let doomed: Vec<UnitId> = units
        .iter()
        .copied()
        .filter(|&id| {
            let rules = state
                .rules
                .unit_type(state.units.get(id).expect("combatant exists").type_id);
            let fires_and_dies = match side {
                Side::Attack => rules.suicide_on_attack,
                Side::Defense => rules.suicide_on_defense,
            };
            fires_and_dies || (rules.suicide_on_hit && scorers.contains(&id))
        })
        .collect();
    units.retain(|id| !doomed.contains(id));
    remove_units(state, territory, doomed);
}

// -------------------------------------------------------------------
// Normal ground/sea battle
// -------------------------------------------------------------------

fn resolve_normal(
    state: &mut GameState,
    battle: &PendingBattle,
    rng: &mut GameRng,
) -> BattleOutcome {
    let territory = battle.territory;
    let is_water = state.map.is_water(territory);

    let mut attackers = live_attackers(state, battle);
    let mut defenders = gather_defenders(state, battle);

    if is_water {
        submerge_evaders(state, &mut defenders, &attackers);
    }

    // Pre-battle fire: anti-air, then shore bombardment.
    if !is_water {
        let mut air = split_air(state, &attackers);
        let before = air.len();
        anti_air_phase(state, territory, battle.attacker, &mut air, rng);
        if air.len() != before {
            attackers.retain(|id| state.units.contains(*id));
        }
    }
    if battle.is_amphibious() && !is_water {
        bombardment(state, battle, &mut defenders, rng);
    }

    let amphibious = battle.is_amphibious();
    let max_rounds = state.rules.properties.max_battle_rounds.unwrap_or(u32::MAX);
    let mut round = 1_u32;

    loop {
        if attackers.is_empty() && defenders.is_empty() {
            return BattleOutcome::Stalemate;
        }
        if attackers.is_empty() {
            return BattleOutcome::DefenderWins;
        }
        if defenders.is_empty() {
            break;
        }
        if round > max_rounds {
            return BattleOutcome::Stalemate;
        }

        // Neither side can score a hit: break off instead of spinning.
        let att_can_score = attackers
            .iter()
            .any(|&id| combat_value(state, id, Side::Attack, amphibious && round == 1) > 0);
        let def_can_score = defenders
            .iter()
            .any(|&id| combat_value(state, id, Side::Defense, false) > 0);
        if !att_can_score && !def_can_score {
            return BattleOutcome::Stalemate;
        }

        let first_round_amphibious = amphibious && round == 1;

        // Surprise strike: first-strike attackers fire, and their
        // casualties are removed before return fire unless a defending
        // destroyer reveals them.
        let (sneak, regular): (Vec<UnitId>, Vec<UnitId>) =
            attackers.iter().copied().partition(|&id| {
                state
                    .rules
                    .unit_type(state.units.get(id).expect("combatant exists").type_id)
                    .first_strike
            });
        let defenders_see_subs = side_has_destroyer(state, &defenders);

        let mut sneak_scorers = Vec::new();
        if !sneak.is_empty() {
            let (hits, scorers) = volley(state, rng, &sneak, Side::Attack, first_round_amphibious);
            sneak_scorers = scorers;
            if !defenders_see_subs {
                assign_casualties(state, territory, &mut defenders, Side::Defense, hits);
                if defenders.is_empty() {
                    drop_suicide_units(state, territory, &mut attackers, Side::Attack, &sneak_scorers);
                    break;
                }
            } else {
                // Revealed: casualties fall with the regular volley below.
                let (more, scorers) =
                    volley(state, rng, &regular, Side::Attack, first_round_amphibious);
                let (def_hits, def_scorers) = volley(state, rng, &defenders, Side::Defense, false);
                assign_casualties(state, territory, &mut defenders, Side::Defense, hits + more);
                assign_casualties(state, territory, &mut attackers, Side::Attack, def_hits);
                let all_scorers: Vec<UnitId> =
                    sneak_scorers.iter().chain(scorers.iter()).copied().collect();
                drop_suicide_units(state, territory, &mut attackers, Side::Attack, &all_scorers);
                drop_suicide_units(state, territory, &mut defenders, Side::Defense, &def_scorers);
                round += 1;
                continue;
            }
        }

        let (att_hits, att_scorers) =
            volley(state, rng, &regular, Side::Attack, first_round_amphibious);
        let (def_hits, def_scorers) = volley(state, rng, &defenders, Side::Defense, false);

        assign_casualties(state, territory, &mut defenders, Side::Defense, att_hits);
        assign_casualties(state, territory, &mut attackers, Side::Attack, def_hits);

        let all_scorers: Vec<UnitId> = sneak_scorers
            .iter()
            .chain(att_scorers.iter())
            .copied()
            .collect();
        drop_suicide_units(state, territory, &mut attackers, Side::Attack, &all_scorers);
        drop_suicide_units(state, territory, &mut defenders, Side::Defense, &def_scorers);

        round += 1;
    }

    // Defenders eliminated. Ground must be held by something that walks.
    let captured = if is_water {
        capture::take_territory(state, territory, battle.attacker, false)
    } else {
        let has_ground = attackers.iter().any(|&id| {
            state
                .units
                .get(id)
                .map(|u| state.rules.unit_type(u.type_id).is_land())
                .unwrap_or(false)
        });
        if has_ground {
            capture::take_territory(state, territory, battle.attacker, false)
        } else {
            false
        }
    };
    BattleOutcome::AttackerWins { captured }
}

/// Shore bombardment supporting the first round of an amphibious assault.
/// Ships fire from origin sea zones that did not just host a sea battle.
fn bombardment(
    state: &mut GameState,
    battle: &PendingBattle,
    defenders: &mut Vec<UnitId>,
    rng: &mut GameRng,
) {
    let dice_sides = state.rules.properties.dice_sides;
    let mut hits = 0;
    for &origin in &battle.amphibious_origins {
        if state.battles.bombard_blocked(origin) {
            continue;
        }
        let ships: Vec<UnitId> = state
            .units_in(origin)
            .into_iter()
            .filter(|&id| {
                let unit = state.units.get(id).expect("listed unit exists");
                state.relationships.are_allied(unit.owner, battle.attacker)
                    && state.rules.unit_type(unit.type_id).bombard.is_some()
            })
            .collect();
        for ship in ships {
            let strength = state
                .rules
                .unit_type(state.units.get(ship).expect("ship exists").type_id)
                .bombard
                .expect("filtered on bombard")
                .min(dice_sides);
            if rng.roll_die(dice_sides) <= strength {
                hits += 1;
            }
        }
    }
    if hits > 0 {
        debug!(hits, "shore bombardment");
        assign_casualties(state, battle.territory, defenders, Side::Defense, hits);
    }
}

// -------------------------------------------------------------------
// Air battles (interception) and strategic bombing
// -------------------------------------------------------------------

fn interceptors(state: &GameState, territory: TerritoryId, attacker: PlayerId) -> Vec<UnitId> {
    state
        .enemy_units_in(territory, attacker)
        .into_iter()
        .filter(|&id| {
            let unit = state.units.get(id).expect("listed unit exists");
            let rules = state.rules.unit_type(unit.type_id);
            rules.is_air() && !rules.is_strategic_bomber && rules.defense > 0
        })
        .collect()
}

/// One exchange between escorts/raiders and defending interceptors.
/// Survivors carry on to the battle this one was blocking.
fn resolve_air_battle(
    state: &mut GameState,
    battle: &PendingBattle,
    rng: &mut GameRng,
) -> BattleOutcome {
    let territory = battle.territory;
    let mut attackers = live_attackers(state, battle);
    let mut defenders = interceptors(state, territory, battle.attacker);

    if attackers.is_empty() {
        return BattleOutcome::DefenderWins;
    }
    if defenders.is_empty() {
        return BattleOutcome::AttackerWins { captured: false };
    }

    let (att_hits, _) = volley(state, rng, &attackers, Side::Attack, false);
    let (def_hits, _) = volley(state, rng, &defenders, Side::Defense, false);
    assign_casualties(state, territory, &mut defenders, Side::Defense, att_hits);
    assign_casualties(state, territory, &mut attackers, Side::Attack, def_hits);

    if attackers.is_empty() {
        BattleOutcome::DefenderWins
    } else if defenders.is_empty() {
        BattleOutcome::AttackerWins { captured: false }
    } else {
        BattleOutcome::Stalemate
    }
}

/// Strategic bombing: anti-air fire, then each surviving bomber rolls raid
/// damage, capped by what the target can absorb.
fn resolve_bombing_raid(
    state: &mut GameState,
    battle: &PendingBattle,
    rng: &mut GameRng,
) -> BattleOutcome {
    let territory = battle.territory;
    let dice_sides = state.rules.properties.dice_sides;

    let mut raiders = split_air(state, &live_attackers(state, battle));
    anti_air_phase(state, territory, battle.attacker, &mut raiders, rng);

    let bombers: Vec<UnitId> = raiders
        .into_iter()
        .filter(|&id| {
            let unit = state.units.get(id).expect("raider exists");
            state.rules.unit_type(unit.type_id).is_strategic_bomber
        })
        .collect();
    if bombers.is_empty() {
        return BattleOutcome::DefenderWins;
    }

    let mut rolled: u32 = 0;
    for &bomber in &bombers {
        let unit = state.units.get(bomber).expect("bomber exists");
        let rolls = state.rules.attack_rolls(unit.type_id, state.tech(unit.owner));
        for _ in 0..rolls {
            rolled += rng.roll_die(dice_sides);
        }
    }

    let damage = apply_raid_damage(state, territory, battle.attacker, rolled);
    state.record(ChronicleEvent::BombingDamage {
        territory,
        by: battle.attacker,
        damage,
    });
    BattleOutcome::Raided { damage }
}

fn apply_raid_damage(
    state: &mut GameState,
    territory: TerritoryId,
    attacker: PlayerId,
    rolled: u32,
) -> u32 {
    let production = state.map.rules(territory).production;
    let fallback_cap = production * state.rules.properties.bombing_cap_multiplier;

    if state.rules.properties.bombing_damages_units {
        // Damage lands on the territory's production infrastructure.
        let target = state
            .enemy_units_in(territory, attacker)
            .into_iter()
            .find(|&id| {
                let unit = state.units.get(id).expect("listed unit exists");
                state.rules.unit_type(unit.type_id).can_be_damaged
            });
        let Some(target) = target else {
            return 0;
        };
        let (existing, cap, dies) = {
            let unit = state.units.get(target).expect("target exists");
            let rules = state.rules.unit_type(unit.type_id);
            (
                unit.damage,
                rules.max_damage.unwrap_or(fallback_cap),
                rules.destroyed_at_max_damage,
            )
        };
        let damage = rolled.min(cap.saturating_sub(existing));
        if damage > 0 {
            state.apply(Change::UnitDamaged {
                unit: target,
                delta: damage as i32,
            });
        }
        if dies && existing + damage >= cap {
            state.apply(Change::UnitsRemoved {
                units: vec![target],
                territory,
            });
        }
        damage
    } else {
        // Classic rules: the defender's treasury takes the hit.
        let Some(owner) = state.owner(territory) else {
            return 0;
        };
        let Some(resource) = state.rules.primary_resource() else {
            return 0;
        };
        let funds = state.resource(owner, resource).max(0) as u32;
        let damage = rolled.min(fallback_cap).min(funds);
        if damage > 0 {
            state.apply(Change::ResourceDelta {
                player: owner,
                resource,
                delta: -(damage as i64),
            });
        }
        damage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::registry::{add_battle, fight};
    use crate::map::Route;
    use crate::rules::{load_setup, RulesSource};

    const MAP: &[u8] = b"
territories:
  home: { production: 4, owner: p1 }
  front: { production: 2, owner: p2 }
  sea_a: { water: true }
connections:
  - [home, front]
  - [home, sea_a]
  - [front, sea_a]
";
    const PLAYERS: &[u8] = b"
players:
  p1: {}
  p2: {}
at_war:
  - [p1, p2]
";

    fn custom_state(units_yaml: &[u8]) -> GameState {
        let setup = load_setup(RulesSource::Bytes {
            units: units_yaml,
            map: MAP,
            players: PLAYERS,
            techs: None,
            properties: None,
        })
        .expect("custom rules load");
        GameState::from_setup(setup)
    }

    #[test]
    fn evaders_submerge_and_concede_the_zone_when_unhunted() {
        let units = b"
cruiser: { name: Cruiser, domain: sea, attack: 3, defense: 3, movement: 2 }
sub: { name: Sub, domain: sea, attack: 2, defense: 1, movement: 2, first_strike: true, can_evade: true }
";
        let mut state = custom_state(units);
        let p1 = state.player_id("p1").unwrap();
        let p2 = state.player_id("p2").unwrap();
        let home = state.map.id("home").unwrap();
        let sea = state.map.id("sea_a").unwrap();

        let sub = state.spawn_unit(state.rules.unit_type_id("sub").unwrap(), p2, sea);
        let cruiser = state.spawn_unit(state.rules.unit_type_id("cruiser").unwrap(), p1, sea);

        let route = Route::new(vec![home, sea]);
        let id = add_battle(&mut state, route, &[cruiser], p1, false).expect("battle registered");
        let mut rng = GameRng::seed_from_u64(1);
        let outcome = fight(&mut state, id, &mut rng).expect("battle resolves");

        // No destroyer hunting it: the submarine slips away unharmed and
        // the attacker takes the zone without a shot.
        assert_eq!(outcome, BattleOutcome::AttackerWins { captured: true });
        assert!(state.units.get(sub).unwrap().submerged);
        assert!(state.units.contains(cruiser));
    }

    #[test]
    fn suicide_attackers_die_after_firing() {
        let units = b"
rocket_boat: { name: Rocket Boat, domain: sea, attack: 6, defense: 1, movement: 2, suicide_on_attack: true }
patrol: { name: Patrol Boat, domain: sea, attack: 1, defense: 1, movement: 2 }
";
        let mut state = custom_state(units);
        let p1 = state.player_id("p1").unwrap();
        let p2 = state.player_id("p2").unwrap();
        let home = state.map.id("home").unwrap();
        let sea = state.map.id("sea_a").unwrap();

        state.spawn_unit(state.rules.unit_type_id("patrol").unwrap(), p2, sea);
        let boat = state.spawn_unit(state.rules.unit_type_id("rocket_boat").unwrap(), p1, sea);

        let route = Route::new(vec![home, sea]);
        let id = add_battle(&mut state, route, &[boat], p1, false).expect("battle registered");
        let mut rng = GameRng::seed_from_u64(9);
        let outcome = fight(&mut state, id, &mut rng).expect("battle resolves");

        // Attack 6 on a d6 always hits, and the boat is spent either way.
        assert_eq!(outcome, BattleOutcome::Stalemate);
        assert!(!state.units.contains(boat));
        assert!(state.units_in(sea).is_empty());
    }

    #[test]
    fn perfect_flak_stops_a_raid_cold() {
        let units = b"
flak:
  name: Flak Tower
  attack: 0
  defense: 0
  movement: 0
  antiair: { attack: 6, die_sides: 6 }
bomber: { name: Bomber, domain: air, attack: 4, defense: 1, movement: 6, is_strategic_bomber: true }
mill:
  name: Mill
  attack: 0
  defense: 0
  movement: 0
  is_infrastructure: true
  can_produce_units: true
  can_be_damaged: true
  max_damage: 10
";
        let mut state = custom_state(units);
        let p1 = state.player_id("p1").unwrap();
        let p2 = state.player_id("p2").unwrap();
        let home = state.map.id("home").unwrap();
        let front = state.map.id("front").unwrap();

        state.spawn_unit(state.rules.unit_type_id("flak").unwrap(), p2, front);
        state.spawn_unit(state.rules.unit_type_id("mill").unwrap(), p2, front);
        let bomber = state.spawn_unit(state.rules.unit_type_id("bomber").unwrap(), p1, front);

        let route = Route::new(vec![home, front]);
        let id = add_battle(&mut state, route, &[bomber], p1, true).expect("raid registered");
        let mut rng = GameRng::seed_from_u64(4);
        let outcome = fight(&mut state, id, &mut rng).expect("raid resolves");

        assert_eq!(outcome, BattleOutcome::DefenderWins);
        assert!(!state.units.contains(bomber));
    }
}
