//! End-to-end tests driving the engine the way a turn-phase driver would:
//! load rules, move units, register battles, fight them in order, and
//! check the recorded consequences.

use ironfront_core::battle::{self, BattleOutcome};
use ironfront_core::rules::{load_setup, RulesError, RulesSource};
use ironfront_core::{
    perform_move, validate_move, GameRng, GameState, MoveDescription, MoveOutcome, Route,
    ENEMY_SUBMARINE_PREVENTING_UNESCORTED_LANDING,
    TRANSPORT_HAS_ALREADY_UNLOADED_UNITS_IN_A_PREVIOUS_PHASE,
};
use ironfront_protocol::{ChronicleEvent, EntityId, MovePhase, PlayerId, TerritoryId, UnitId};

fn base_state() -> GameState {
    GameState::from_setup(load_setup(RulesSource::Embedded).expect("embedded rules load"))
}

fn territory(state: &GameState, name: &str) -> TerritoryId {
    state.map.id(name).expect("territory exists")
}

fn player(state: &GameState, name: &str) -> PlayerId {
    state.player_id(name).expect("player exists")
}

fn spawn(state: &mut GameState, unit: &str, owner: &str, at: &str) -> UnitId {
    let type_id = state.rules.unit_type_id(unit).expect("unit type exists");
    let owner = player(state, owner);
    let at = territory(state, at);
    state.spawn_unit(type_id, owner, at)
}

fn route(state: &GameState, names: &[&str]) -> Route {
    Route::new(names.iter().map(|n| territory(state, n)).collect())
}

// -------------------------------------------------------------------
// Load-time validation
// -------------------------------------------------------------------

#[test]
fn sea_unit_with_blitz_fails_loading_with_a_category_conflict() {
    let units = b"
bad_ship:
  name: Bad Ship
  domain: sea
  attack: 1
  defense: 1
  can_blitz: true
";
    let map = b"
territories:
  a: { production: 1 }
connections: []
";
    let players = b"
players:
  p1: {}
";
    let err = load_setup(RulesSource::Bytes {
        units,
        map,
        players,
        techs: None,
        properties: None,
    })
    .expect_err("load must fail");

    match err {
        RulesError::InvalidUnitType { unit, problems } => {
            assert_eq!(unit, "bad_ship");
            assert!(problems.iter().any(|p| p.contains("blitz")));
        }
        other => panic!("expected a unit-type validation failure, got {other}"),
    }
}

#[test]
fn embedded_rules_load_cleanly() {
    let setup = load_setup(RulesSource::Embedded).expect("embedded rules load");
    assert!(setup.rules.unit_type_id("infantry").is_some());
    assert!(setup.map.id("germany").is_some());
    assert_eq!(setup.rules.properties.dice_sides, 6);
    // Canal data survives compilation.
    let atlantic = setup.map.id("atlantic").unwrap();
    let med = setup.map.id("mediterranean").unwrap();
    assert_eq!(setup.map.canals_between(atlantic, med).len(), 1);
}

// -------------------------------------------------------------------
// Stacking limits (scenario: third unit over an owned cap is refused)
// -------------------------------------------------------------------

#[test]
fn third_unit_over_an_owned_stacking_limit_is_disallowed_alone() {
    let units = b"
guard:
  name: Guard
  attack: 1
  defense: 2
  movement: 1
  movement_limit: { max: 2, scope: owned }
";
    let map = b"
territories:
  a: { production: 1, owner: p1 }
  b: { production: 1, owner: p1 }
connections:
  - [a, b]
";
    let players = b"
players:
  p1: {}
  p2: {}
";
    let setup = load_setup(RulesSource::Bytes {
        units,
        map,
        players,
        techs: None,
        properties: None,
    })
    .expect("custom rules load");
    let mut state = GameState::from_setup(setup);

    let guard = state.rules.unit_type_id("guard").unwrap();
    let p1 = state.player_id("p1").unwrap();
    let a = state.map.id("a").unwrap();
    let b = state.map.id("b").unwrap();

    let movers: Vec<UnitId> = (0..3).map(|_| state.spawn_unit(guard, p1, a)).collect();
    let md = MoveDescription::new(movers.clone(), Route::new(vec![a, b]));
    let verdict = validate_move(&state, &md, p1, MovePhase::NonCombatMove);

    assert!(verdict.error.is_none());
    assert_eq!(verdict.disallowed.len(), 1);
    assert!(verdict.disallowed.contains_key(&movers[2]));
    assert!(verdict.unresolved.is_empty());
}

// -------------------------------------------------------------------
// Transports
// -------------------------------------------------------------------

#[test]
fn transport_that_unloaded_in_a_previous_phase_cannot_unload_again() {
    let mut state = base_state();
    let germany = player(&state, "germany");

    let transport = spawn(&mut state, "transport", "germany", "english_channel");
    let infantry = spawn(&mut state, "infantry", "germany", "english_channel");
    {
        let unit = state.units.get_mut(infantry).unwrap();
        unit.transported_by = Some(transport);
    }
    state
        .units
        .get_mut(transport)
        .unwrap()
        .unloaded_in_combat_phase = true;

    let md = MoveDescription::new(
        vec![infantry],
        route(&state, &["english_channel", "western_germany"]),
    );
    let verdict = validate_move(&state, &md, germany, MovePhase::NonCombatMove);

    assert_eq!(
        verdict.error.as_deref(),
        Some(TRANSPORT_HAS_ALREADY_UNLOADED_UNITS_IN_A_PREVIOUS_PHASE)
    );
    assert_eq!(
        verdict.disallowed.get(&infantry).map(String::as_str),
        Some(TRANSPORT_HAS_ALREADY_UNLOADED_UNITS_IN_A_PREVIOUS_PHASE)
    );
}

#[test]
fn enemy_submarine_pins_an_unescorted_landing() {
    let mut state = base_state();
    let germany = player(&state, "germany");

    let transport = spawn(&mut state, "transport", "germany", "english_channel");
    let infantry = spawn(&mut state, "infantry", "germany", "english_channel");
    state.units.get_mut(infantry).unwrap().transported_by = Some(transport);
    spawn(&mut state, "submarine", "uk", "english_channel");

    let md = MoveDescription::new(
        vec![infantry],
        route(&state, &["english_channel", "normandy"]),
    );
    let verdict = validate_move(&state, &md, germany, MovePhase::CombatMove);

    assert!(verdict.error.is_none());
    assert_eq!(
        verdict.disallowed.get(&infantry).map(String::as_str),
        Some(ENEMY_SUBMARINE_PREVENTING_UNESCORTED_LANDING)
    );
}

#[test]
fn an_escort_warship_frees_the_landing() {
    let mut state = base_state();
    let germany = player(&state, "germany");

    let transport = spawn(&mut state, "transport", "germany", "english_channel");
    let infantry = spawn(&mut state, "infantry", "germany", "english_channel");
    state.units.get_mut(infantry).unwrap().transported_by = Some(transport);
    spawn(&mut state, "submarine", "uk", "english_channel");
    spawn(&mut state, "destroyer", "germany", "english_channel");

    let md = MoveDescription::new(
        vec![infantry],
        route(&state, &["english_channel", "normandy"]),
    );
    let verdict = validate_move(&state, &md, germany, MovePhase::CombatMove);
    assert!(verdict.is_ok(), "unexpected verdict: {verdict:?}");
}

#[test]
fn ambiguous_transport_choice_comes_back_unresolved() {
    let mut state = base_state();
    let germany = player(&state, "germany");

    spawn(&mut state, "transport", "germany", "english_channel");
    spawn(&mut state, "transport", "germany", "english_channel");
    let infantry = spawn(&mut state, "infantry", "germany", "western_germany");

    let md = MoveDescription::new(
        vec![infantry],
        route(&state, &["western_germany", "english_channel"]),
    );
    let verdict = validate_move(&state, &md, germany, MovePhase::NonCombatMove);
    assert!(verdict.error.is_none());
    assert!(verdict.unresolved.contains_key(&infantry));

    // An explicit assignment resolves it.
    let mut md = md;
    let transports: Vec<UnitId> = state
        .units_in(territory(&state, "english_channel"))
        .into_iter()
        .filter(|&id| {
            let unit = state.units.get(id).unwrap();
            state.rules.unit_type(unit.type_id).is_sea_transport()
        })
        .collect();
    md.transport_assignments.insert(infantry, transports[0]);
    let verdict = validate_move(&state, &md, germany, MovePhase::NonCombatMove);
    assert!(verdict.is_ok(), "unexpected verdict: {verdict:?}");
}

// -------------------------------------------------------------------
// Battle ordering (bombing before ground, dependency enforcement)
// -------------------------------------------------------------------

#[test]
fn ground_battle_waits_for_the_bombing_raid_in_the_same_territory() {
    let mut state = base_state();
    let france = player(&state, "france");

    spawn(&mut state, "infantry", "germany", "western_germany");
    spawn(&mut state, "factory", "germany", "western_germany");
    let rifles = spawn(&mut state, "infantry", "france", "western_germany");
    let bomber = spawn(&mut state, "bomber", "france", "western_germany");

    let attack_route = route(&state, &["france", "western_germany"]);
    let ground = battle::add_battle(&mut state, attack_route.clone(), &[rifles], france, false)
        .expect("ground battle registered");
    let raid = battle::add_battle(&mut state, attack_route, &[bomber], france, true)
        .expect("raid registered");

    let mut rng = GameRng::seed_from_u64(42);
    let err = battle::fight(&mut state, ground, &mut rng).unwrap_err();
    assert!(err.to_string().contains("blocked"));

    let outcome = battle::fight(&mut state, raid, &mut rng).expect("raid resolves");
    match outcome {
        BattleOutcome::Raided { damage } => assert!(damage > 0),
        other => panic!("expected a raid outcome, got {other:?}"),
    }

    battle::fight(&mut state, ground, &mut rng).expect("ground battle resolves once unblocked");
    assert_eq!(state.battles.pending_count(), 0);
    assert!(state.battles.was_fought(territory(&state, "western_germany")));
}

#[test]
fn phase_driver_clears_the_board_in_wave_order() {
    let mut state = base_state();
    let germany = player(&state, "germany");

    // A sea battle, a dependent amphibious landing, and a bombing raid.
    spawn(&mut state, "destroyer", "uk", "english_channel");
    spawn(&mut state, "infantry", "france", "normandy");
    spawn(&mut state, "factory", "france", "france");
    let cruiser = spawn(&mut state, "cruiser", "germany", "english_channel");
    let sub = spawn(&mut state, "submarine", "germany", "english_channel");
    let landing_a = spawn(&mut state, "infantry", "germany", "normandy");
    let landing_b = spawn(&mut state, "marine", "germany", "normandy");
    let bomber = spawn(&mut state, "bomber", "germany", "france");

    let sea_route = route(&state, &["north_sea", "english_channel"]);
    let land_route = route(&state, &["english_channel", "normandy"]);
    let raid_route = route(&state, &["germany", "western_germany", "france"]);
    battle::add_battle(&mut state, sea_route, &[cruiser, sub], germany, false)
        .expect("sea battle");
    battle::add_battle(
        &mut state,
        land_route,
        &[landing_a, landing_b],
        germany,
        false,
    )
    .expect("landing battle");
    battle::add_battle(&mut state, raid_route, &[bomber], germany, true).expect("raid");

    let mut rng = GameRng::seed_from_u64(7);
    battle::fight_all_battles(&mut state, &mut rng).expect("driver clears the board");
    assert_eq!(state.battles.pending_count(), 0);

    // The raid resolved and left a record.
    assert!(state
        .chronicle()
        .iter()
        .any(|e| matches!(e.event, ChronicleEvent::BombingDamage { .. })));
}

// -------------------------------------------------------------------
// Movement + battles end to end
// -------------------------------------------------------------------

#[test]
fn blitz_conquers_in_passing_and_the_destination_battle_registers() {
    let mut state = base_state();
    let germany = player(&state, "germany");
    let ussr = player(&state, "ussr");
    state.relationships.declare_war(germany, ussr);

    spawn(&mut state, "infantry", "ussr", "russia");
    let armour = spawn(&mut state, "armour", "germany", "germany");

    let md = MoveDescription::new(vec![armour], route(&state, &["germany", "ukraine", "russia"]));
    let outcome = perform_move(&mut state, &md, germany, MovePhase::CombatMove)
        .expect("move performs");
    let battle_id = match outcome {
        MoveOutcome::Moved { battle } => battle.expect("a battle at the destination"),
        MoveOutcome::Rejected(v) => panic!("move rejected: {v:?}"),
    };

    let ukraine = territory(&state, "ukraine");
    assert_eq!(state.owner(ukraine), Some(germany));
    assert!(state.battles.blitzed().contains(&ukraine));
    assert!(state.battles.blitzed().is_subset(state.battles.conquered()));

    let mut rng = GameRng::seed_from_u64(3);
    battle::fight(&mut state, battle_id, &mut rng).expect("battle resolves");
    assert_eq!(state.battles.pending_count(), 0);
}

#[test]
fn non_combat_movement_cannot_enter_enemy_territory() {
    let mut state = base_state();
    let germany = player(&state, "germany");
    let armour = spawn(&mut state, "armour", "germany", "western_germany");

    let md = MoveDescription::new(vec![armour], route(&state, &["western_germany", "france"]));
    let verdict = validate_move(&state, &md, germany, MovePhase::NonCombatMove);
    assert!(verdict.error.is_some());
}

#[test]
fn cannot_move_into_a_territory_of_a_player_not_at_war() {
    let mut state = base_state();
    let germany = player(&state, "germany");
    let armour = spawn(&mut state, "armour", "germany", "germany");

    // ussr is neutral toward germany in the base setup.
    let md = MoveDescription::new(vec![armour], route(&state, &["germany", "ukraine"]));
    let verdict = validate_move(&state, &md, germany, MovePhase::CombatMove);
    assert!(verdict.error.is_some());
}

#[test]
fn moving_another_players_units_is_rejected_outright() {
    let mut state = base_state();
    let germany = player(&state, "germany");
    let uk_infantry = spawn(&mut state, "infantry", "uk", "united_kingdom");

    let md = MoveDescription::new(
        vec![uk_infantry],
        route(&state, &["united_kingdom", "north_sea"]),
    );
    let verdict = validate_move(&state, &md, germany, MovePhase::CombatMove);
    assert!(verdict.error.is_some());
}

#[test]
fn stale_unit_handles_are_rejected() {
    let mut state = base_state();
    let germany = player(&state, "germany");
    let ghost = EntityId::new(999, 0);

    let md = MoveDescription::new(vec![ghost], route(&state, &["germany", "western_germany"]));
    let verdict = validate_move(&state, &md, germany, MovePhase::NonCombatMove);
    assert!(verdict.error.is_some());
}

// -------------------------------------------------------------------
// Capture consequences
// -------------------------------------------------------------------

#[test]
fn capital_capture_seizes_the_treasury_and_research_tokens() {
    let mut state = base_state();
    let germany = player(&state, "germany");
    let france = player(&state, "france");
    let paris = territory(&state, "france");
    let funds = state.rules.resource_id("funds").unwrap();

    state.player_mut(france).tech.add_tokens(2);
    let france_funds = state.resource(france, funds);
    let germany_funds = state.resource(germany, funds);

    // France holds no other capital, so the treasury falls with Paris.
    battle::take_territory(&mut state, paris, germany, false);

    assert_eq!(state.owner(paris), Some(germany));
    assert_eq!(state.resource(france, funds), 0);
    assert_eq!(state.resource(germany, funds), germany_funds + france_funds);
    assert_eq!(state.player(france).tech.tokens(), 0);
    assert!(state
        .chronicle()
        .iter()
        .any(|e| matches!(e.event, ChronicleEvent::CapitalCaptured { .. })));
}

#[test]
fn capture_transfer_table_reroutes_the_new_owner() {
    let mut state = base_state();
    let germany = player(&state, "germany");
    let italy = player(&state, "italy");
    let gibraltar = territory(&state, "gibraltar");

    battle::take_territory(&mut state, gibraltar, germany, false);
    assert_eq!(state.owner(gibraltar), Some(italy));
}

#[test]
fn liberating_an_allied_territory_returns_it_to_its_owner() {
    let mut state = base_state();
    let germany = player(&state, "germany");
    let uk = player(&state, "uk");
    let france = player(&state, "france");
    let normandy = territory(&state, "normandy");

    // Germany holds Normandy; the UK takes it back for France.
    battle::take_territory(&mut state, normandy, germany, false);
    assert_eq!(state.owner(normandy), Some(germany));

    battle::take_territory(&mut state, normandy, uk, false);
    assert_eq!(state.owner(normandy), Some(france));
    assert!(state
        .chronicle()
        .iter()
        .any(|e| matches!(e.event, ChronicleEvent::TerritoryLiberated { .. })));
}

#[test]
fn entering_unowned_neutral_land_charges_the_fee() {
    let mut state = base_state();
    let germany = player(&state, "germany");
    let spain = territory(&state, "spain");
    let funds = state.rules.resource_id("funds").unwrap();
    let before = state.resource(germany, funds);

    battle::take_territory(&mut state, spain, germany, false);
    assert_eq!(
        state.resource(germany, funds),
        before - state.rules.properties.neutral_fee
    );
    assert!(state
        .chronicle()
        .iter()
        .any(|e| matches!(e.event, ChronicleEvent::NeutralityViolated { .. })));
}

#[test]
fn captured_infrastructure_changes_owner_instead_of_dying() {
    let mut state = base_state();
    let germany = player(&state, "germany");
    let normandy = territory(&state, "normandy");
    let factory = spawn(&mut state, "factory", "france", "normandy");

    battle::take_territory(&mut state, normandy, germany, false);
    assert_eq!(state.units.get(factory).unwrap().owner, germany);
    assert!(state
        .chronicle()
        .iter()
        .any(|e| matches!(e.event, ChronicleEvent::UnitsCaptured { .. })));
}

// -------------------------------------------------------------------
// Turn boundary
// -------------------------------------------------------------------

#[test]
fn end_of_turn_resets_movement_and_territory_status_sets() {
    let mut state = base_state();
    let germany = player(&state, "germany");
    let ussr = player(&state, "ussr");
    state.relationships.declare_war(germany, ussr);

    let armour = spawn(&mut state, "armour", "germany", "germany");
    let md = MoveDescription::new(vec![armour], route(&state, &["germany", "ukraine"]));
    match perform_move(&mut state, &md, germany, MovePhase::CombatMove).unwrap() {
        MoveOutcome::Moved { battle } => {
            // Undefended enemy territory: a finished battle, fought trivially.
            let id = battle.expect("finished battle registered");
            let mut rng = GameRng::seed_from_u64(1);
            battle::fight(&mut state, id, &mut rng).unwrap();
        }
        MoveOutcome::Rejected(v) => panic!("move rejected: {v:?}"),
    }
    assert_eq!(state.units.get(armour).unwrap().movement_left, 1);
    assert!(!state.battles.conquered().is_empty());

    let round_before = state.round;
    state.end_of_turn();
    assert_eq!(state.round, round_before + 1);
    assert!(state.battles.conquered().is_empty());
    assert_eq!(state.units.get(armour).unwrap().movement_left, 2);
}
