use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use ironfront_protocol::{BattleId, BattleKind, Change, PlayerId, TerritoryId, UnitId};
use tracing::{debug, info};

use crate::battle::capture;
use crate::battle::instance::{self, BattleOutcome};
use crate::dice::GameRng;
use crate::entities::EntityStore;
use crate::error::EngineError;
use crate::map::Route;
use crate::state::GameState;

/// One registered combat or conquest encounter, keyed to a territory and a
/// classification. Owned exclusively by the registry.
#[derive(Clone, Debug)]
pub struct PendingBattle {
    pub kind: BattleKind,
    pub territory: TerritoryId,
    pub attacker: PlayerId,
    /// Attacking units and the route each arrived by.
    pub attackers: BTreeMap<UnitId, Route>,
    /// Sea zones amphibious landings in this battle unload from.
    pub amphibious_origins: BTreeSet<TerritoryId>,
}

impl PendingBattle {
    fn new(kind: BattleKind, territory: TerritoryId, attacker: PlayerId) -> Self {
        Self {
            kind,
            territory,
            attacker,
            attackers: BTreeMap::new(),
            amphibious_origins: BTreeSet::new(),
        }
    }

    pub fn is_amphibious(&self) -> bool {
        !self.amphibious_origins.is_empty()
    }
}

/// Tracks, orders and retires battle instances as movement and combat
/// unfold; owns the per-turn territory status sets and the inter-battle
/// dependency graph.
///
/// The graph is acyclic by construction: edges only ever point from a
/// battle to a prerequisite in a different territory (amphibious source
/// sea zones) or to an earlier-resolving kind in the same territory, and
/// no kind both precedes and follows another.
#[derive(Clone, Debug, Default)]
pub struct BattleRegistry {
    battles: EntityStore<PendingBattle>,
    /// blocked battle -> prerequisite battles that must resolve first.
    dependencies: HashMap<BattleId, HashSet<BattleId>>,

    conquered: HashSet<TerritoryId>,
    blitzed: HashSet<TerritoryId>,
    fought: HashSet<TerritoryId>,
    no_bombard: HashSet<TerritoryId>,
    /// Owner before each provisional move-time conquest, for undo.
    prior_owners: HashMap<TerritoryId, Option<PlayerId>>,
}

impl BattleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn battle(&self, id: BattleId) -> Option<&PendingBattle> {
        self.battles.get(id)
    }

    pub fn pending_ids(&self) -> Vec<BattleId> {
        self.battles.ids()
    }

    pub fn pending_count(&self) -> usize {
        self.battles.len()
    }

    /// The pending battle in a territory, split by bombing-run vs. not.
    pub fn get_pending_battle(&self, territory: TerritoryId, bombing: bool) -> Option<BattleId> {
        self.battles
            .iter_ordered()
            .find(|(_, b)| b.territory == territory && b.kind.is_bombing_run() == bombing)
            .map(|(id, _)| id)
    }

    pub fn get_pending_battle_of(
        &self,
        territory: TerritoryId,
        kind: BattleKind,
    ) -> Option<BattleId> {
        self.battles
            .iter_ordered()
            .find(|(_, b)| b.territory == territory && b.kind == kind)
            .map(|(id, _)| id)
    }

    /// Territories with at least one pending battle.
    pub fn get_pending_battle_sites(&self, bombing_only: bool) -> BTreeSet<TerritoryId> {
        self.battles
            .iter_ordered()
            .filter(|(_, b)| !bombing_only || b.kind.is_bombing_run())
            .map(|(_, b)| b.territory)
            .collect()
    }

    /// Prerequisites still pending for this battle.
    pub fn blockers(&self, id: BattleId) -> Vec<BattleId> {
        self.dependencies
            .get(&id)
            .map(|deps| {
                let mut out: Vec<BattleId> = deps
                    .iter()
                    .copied()
                    .filter(|&d| self.battles.contains(d))
                    .collect();
                out.sort();
                out
            })
            .unwrap_or_default()
    }

    pub fn is_blocked(&self, id: BattleId) -> bool {
        !self.blockers(id).is_empty()
    }

    pub fn conquered(&self) -> &HashSet<TerritoryId> {
        &self.conquered
    }

    pub fn blitzed(&self) -> &HashSet<TerritoryId> {
        &self.blitzed
    }

    pub fn fought(&self) -> &HashSet<TerritoryId> {
        &self.fought
    }

    pub fn was_fought(&self, territory: TerritoryId) -> bool {
        self.fought.contains(&territory)
    }

    pub fn bombard_blocked(&self, territory: TerritoryId) -> bool {
        self.no_bombard.contains(&territory)
    }

    pub(crate) fn mark_no_bombard(&mut self, territory: TerritoryId) {
        self.no_bombard.insert(territory);
    }

    pub(crate) fn mark_conquered(&mut self, territory: TerritoryId) {
        self.conquered.insert(territory);
    }

    /// A blitzed territory is always also conquered.
    pub(crate) fn mark_blitzed(&mut self, territory: TerritoryId) {
        self.conquered.insert(territory);
        self.blitzed.insert(territory);
    }

    pub(crate) fn note_prior_owner(&mut self, territory: TerritoryId, owner: Option<PlayerId>) {
        self.prior_owners.entry(territory).or_insert(owner);
    }

    pub(crate) fn prior_owner(&self, territory: TerritoryId) -> Option<Option<PlayerId>> {
        self.prior_owners.get(&territory).copied()
    }

    fn add_dependency(&mut self, blocked: BattleId, prerequisite: BattleId) {
        if blocked == prerequisite {
            return;
        }
        self.dependencies
            .entry(blocked)
            .or_default()
            .insert(prerequisite);
    }

    /// Drop a battle and every edge touching it, in both directions.
    fn retire(&mut self, id: BattleId) {
        self.battles.remove(id);
        self.dependencies.remove(&id);
        for deps in self.dependencies.values_mut() {
            deps.remove(&id);
        }
        self.dependencies.retain(|_, deps| !deps.is_empty());
    }

    /// Turn boundary: all per-turn sets reset. Pending battles must already
    /// have been fought by the phase driver.
    pub fn clear_turn_state(&mut self) {
        debug_assert!(self.battles.is_empty(), "unfought battles at turn end");
        self.conquered.clear();
        self.blitzed.clear();
        self.fought.clear();
        self.no_bombard.clear();
        self.prior_owners.clear();
    }

    fn find_or_create(
        &mut self,
        kind: BattleKind,
        territory: TerritoryId,
        attacker: PlayerId,
    ) -> BattleId {
        if let Some(id) = self.get_pending_battle_of(territory, kind) {
            return id;
        }
        let id = self
            .battles
            .insert(PendingBattle::new(kind, territory, attacker));
        debug!(?kind, territory = territory.raw, "battle created");
        id
    }
}

/// Register the encounter a validated combat move produces, creating or
/// augmenting battles and installing dependencies.
///
/// Returns the battle the move feeds, or `None` when the destination needs
/// no battle at all (friendly territory, open sea).
pub fn add_battle(
    state: &mut GameState,
    route: Route,
    units: &[UnitId],
    player: PlayerId,
    bombing: bool,
) -> Option<BattleId> {
    let territory = route.end();

    let id = if bombing {
        add_bombing_battle(state, &route, units, player, territory)
    } else {
        add_ground_battle(state, &route, units, player, territory)?
    };

    for &unit in units {
        if let Some(u) = state.units.get_mut(unit) {
            u.was_in_combat = true;
        }
    }
    Some(id)
}

fn add_bombing_battle(
    state: &mut GameState,
    route: &Route,
    units: &[UnitId],
    player: PlayerId,
    territory: TerritoryId,
) -> BattleId {
    let raid = state
        .battles
        .find_or_create(BattleKind::BombingRaid, territory, player);
    for &unit in units {
        state
            .battles
            .battles
            .get_mut(raid)
            .expect("just created")
            .attackers
            .insert(unit, route.clone());
    }

    // Defending fighters may contest the raid first.
    if state.rules.properties.intercept_bombing_raids && has_interceptors(state, territory, player)
    {
        let air = state
            .battles
            .find_or_create(BattleKind::AirRaid, territory, player);
        for &unit in units {
            state
                .battles
                .battles
                .get_mut(air)
                .expect("just created")
                .attackers
                .insert(unit, route.clone());
        }
        state.battles.add_dependency(raid, air);
    }

    // A ground battle in the same territory waits for the bombing run.
    if let Some(ground) = state
        .battles
        .get_pending_battle_of(territory, BattleKind::Normal)
    {
        state.battles.add_dependency(ground, raid);
    }

    raid
}

fn add_ground_battle(
    state: &mut GameState,
    route: &Route,
    units: &[UnitId],
    player: PlayerId,
    territory: TerritoryId,
) -> Option<BattleId> {
    let blocking = state.blocking_enemy_units_in(territory, player);
    let any_enemy = state.has_enemy_units(territory, player);
    let is_water = state.map.is_water(territory);
    let hostile_ground = state.is_hostile(territory, player)
        || (!is_water && state.owner(territory).is_none() && !units.is_empty());

    let kind = if !blocking.is_empty() {
        BattleKind::Normal
    } else if any_enemy && is_water {
        // Only ignorable units present (transports, submerged subs).
        BattleKind::NonFighting
    } else if hostile_ground && !is_water {
        // Trivial conquest: capture without dice.
        BattleKind::Finished
    } else {
        return None;
    };

    let id = state.battles.find_or_create(kind, territory, player);

    let amphibious_origin = route
        .all()
        .iter()
        .rev()
        .nth(1)
        .copied()
        .filter(|&prev| state.map.is_water(prev) && !is_water);

    {
        let battle = state.battles.battles.get_mut(id).expect("just created");
        for &unit in units {
            battle.attackers.insert(unit, route.clone());
        }
        if let Some(origin) = amphibious_origin {
            battle.amphibious_origins.insert(origin);
        }
    }

    // An amphibious landing waits on the sea battle at its origin.
    if let Some(origin) = amphibious_origin {
        if let Some(sea) = state
            .battles
            .get_pending_battle_of(origin, BattleKind::Normal)
        {
            state.battles.add_dependency(id, sea);
        }
    }

    // Bombing and air battles in the territory resolve before the ground
    // battle.
    if kind == BattleKind::Normal {
        for other in state.battles.pending_ids() {
            let Some(b) = state.battles.battle(other) else {
                continue;
            };
            if b.territory == territory && (b.kind.is_bombing_run() || b.kind.is_air_battle()) {
                state.battles.add_dependency(id, other);
            }
        }

        if state.rules.properties.intercept_combat_moves
            && all_air(state, units)
            && has_interceptors(state, territory, player)
        {
            let air = state
                .battles
                .find_or_create(BattleKind::AirInterception, territory, player);
            for &unit in units {
                state
                    .battles
                    .battles
                    .get_mut(air)
                    .expect("just created")
                    .attackers
                    .insert(unit, route.clone());
            }
            state.battles.add_dependency(id, air);
        }
    }

    Some(id)
}

fn has_interceptors(state: &GameState, territory: TerritoryId, attacker: PlayerId) -> bool {
    state
        .enemy_units_in(territory, attacker)
        .into_iter()
        .any(|id| {
            let unit = state.units.get(id).expect("listed unit exists");
            let rules = state.rules.unit_type(unit.type_id);
            rules.is_air() && !rules.is_strategic_bomber && rules.defense > 0
        })
}

fn all_air(state: &GameState, units: &[UnitId]) -> bool {
    units.iter().all(|&id| {
        state
            .units
            .get(id)
            .map(|u| state.rules.unit_type(u.type_id).is_air())
            .unwrap_or(false)
    })
}

/// A move-time conquest: blitz pass-through or walking into undefended
/// enemy land. Ownership transfers immediately; the registry remembers the
/// prior owner so the move can be undone.
pub fn conquer_on_the_move(
    state: &mut GameState,
    territory: TerritoryId,
    player: PlayerId,
    blitz: bool,
) {
    let prior = state.owner(territory);
    state.battles.note_prior_owner(territory, prior);
    capture::take_territory(state, territory, player, blitz);
    if blitz {
        state.battles.mark_blitzed(territory);
    } else {
        state.battles.mark_conquered(territory);
    }
}

/// Fight one battle. Only legal for battles with an empty (filtered)
/// prerequisite set; the phase driver is responsible for ordering.
pub fn fight(
    state: &mut GameState,
    id: BattleId,
    rng: &mut GameRng,
) -> Result<BattleOutcome, EngineError> {
    let blockers = state.battles.blockers(id);
    if !blockers.is_empty() {
        return Err(EngineError::BattleBlocked(blockers.len()));
    }
    let battle = state
        .battles
        .battles
        .get(id)
        .cloned()
        .ok_or(EngineError::UnknownBattle)?;

    info!(
        territory = state.map.name(battle.territory),
        kind = ?battle.kind,
        attackers = battle.attackers.len(),
        "fighting battle"
    );

    let outcome = instance::resolve(state, &battle, rng)?;

    state.battles.fought.insert(battle.territory);
    if matches!(outcome, BattleOutcome::AttackerWins { .. }) {
        state.battles.mark_conquered(battle.territory);
    }
    // Sea combat spoils shore bombardment from that zone.
    if battle.kind == BattleKind::Normal && state.map.is_water(battle.territory) {
        state.battles.mark_no_bombard(battle.territory);
    }
    state.battles.retire(id);

    Ok(outcome)
}

/// Reverse a move's contribution to pending battles. A no-op when the
/// move fed no battle and marked no territory.
pub fn undo_battle(state: &mut GameState, route: &Route, units: &[UnitId], player: PlayerId) {
    let mut emptied = Vec::new();
    for id in state.battles.pending_ids() {
        let Some(battle) = state.battles.battles.get_mut(id) else {
            continue;
        };
        if !route.contains(battle.territory) {
            continue;
        }
        for unit in units {
            battle.attackers.remove(unit);
        }
        if battle.attackers.is_empty() {
            emptied.push(id);
        }
    }
    for id in emptied {
        debug!(battle = ?id, "battle emptied by undo, retiring");
        state.battles.retire(id);
    }

    // Un-mark provisional conquests along the route unless the mover was
    // allied with the territory's original owner.
    for &territory in route.all() {
        if !state.battles.conquered.contains(&territory) {
            continue;
        }
        let Some(prior) = state.battles.prior_owner(territory) else {
            continue;
        };
        let allied_with_prior = prior
            .map(|p| state.relationships.are_allied(p, player))
            .unwrap_or(false);
        if allied_with_prior {
            continue;
        }
        let current = state.owner(territory);
        if current != prior {
            state.apply(Change::TerritoryOwner {
                territory,
                old: current,
                new: prior,
            });
        }
        state.battles.conquered.remove(&territory);
        state.battles.blitzed.remove(&territory);
        state.battles.prior_owners.remove(&territory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{load_setup, RulesSource};

    fn base_state() -> GameState {
        GameState::from_setup(load_setup(RulesSource::Embedded).expect("rules load"))
    }

    fn route(state: &GameState, names: &[&str]) -> Route {
        Route::new(
            names
                .iter()
                .map(|n| state.map.id(n).expect("territory exists"))
                .collect(),
        )
    }

    #[test]
    fn amphibious_landing_waits_for_the_sea_battle_at_its_origin() {
        let mut state = base_state();
        let germany = state.player_id("germany").unwrap();
        let uk = state.player_id("uk").unwrap();
        let france = state.player_id("france").unwrap();
        let channel = state.map.id("english_channel").unwrap();
        let normandy = state.map.id("normandy").unwrap();

        // Contested sea zone and a defended beach.
        state.spawn_unit(state.rules.unit_type_id("destroyer").unwrap(), uk, channel);
        state.spawn_unit(
            state.rules.unit_type_id("infantry").unwrap(),
            france,
            normandy,
        );
        let cruiser = state.spawn_unit(
            state.rules.unit_type_id("cruiser").unwrap(),
            germany,
            channel,
        );
        let landing = state.spawn_unit(
            state.rules.unit_type_id("infantry").unwrap(),
            germany,
            normandy,
        );

        let sea_route = route(&state, &["north_sea", "english_channel"]);
        let land_route = route(&state, &["english_channel", "normandy"]);
        let sea = add_battle(&mut state, sea_route, &[cruiser], germany, false)
            .expect("sea battle registered");
        let land = add_battle(&mut state, land_route, &[landing], germany, false)
            .expect("land battle registered");

        assert_eq!(state.battles.blockers(land), vec![sea]);

        let mut rng = GameRng::seed_from_u64(11);
        let err = fight(&mut state, land, &mut rng).unwrap_err();
        assert!(matches!(err, EngineError::BattleBlocked(1)));

        fight(&mut state, sea, &mut rng).expect("sea battle resolves");
        assert!(state.battles.blockers(land).is_empty());
        fight(&mut state, land, &mut rng).expect("landing resolves");
        assert_eq!(state.battles.pending_count(), 0);
    }

    #[test]
    fn undoing_the_only_contribution_retires_the_battle() {
        let mut state = base_state();
        let germany = state.player_id("germany").unwrap();
        let france = state.player_id("france").unwrap();
        let fr = state.map.id("france").unwrap();
        let wg = state.map.id("western_germany").unwrap();

        state.spawn_unit(state.rules.unit_type_id("infantry").unwrap(), france, fr);
        let attacker =
            state.spawn_unit(state.rules.unit_type_id("armour").unwrap(), germany, fr);

        let attack_route = Route::new(vec![wg, fr]);
        let id = add_battle(&mut state, attack_route.clone(), &[attacker], germany, false)
            .expect("battle registered");
        assert!(state.battles.battle(id).is_some());

        undo_battle(&mut state, &attack_route, &[attacker], germany);
        assert!(state.battles.battle(id).is_none());
        assert_eq!(state.battles.pending_count(), 0);
    }

    #[test]
    fn undo_without_contribution_is_a_no_op() {
        let mut state = base_state();
        let germany = state.player_id("germany").unwrap();
        let g = state.map.id("germany").unwrap();
        let wg = state.map.id("western_germany").unwrap();
        let unit = state.spawn_unit(state.rules.unit_type_id("infantry").unwrap(), germany, g);

        let changes_before = state.changes().len();
        let chronicle_before = state.chronicle().len();
        undo_battle(&mut state, &Route::new(vec![g, wg]), &[unit], germany);
        assert_eq!(state.changes().len(), changes_before);
        assert_eq!(state.chronicle().len(), chronicle_before);
    }

    #[test]
    fn blitzed_territories_are_always_conquered_too() {
        let mut state = base_state();
        let germany = state.player_id("germany").unwrap();
        let ukraine = state.map.id("ukraine").unwrap();

        // ussr is neutral toward germany, so force the war on first.
        let ussr = state.player_id("ussr").unwrap();
        state.relationships.declare_war(germany, ussr);

        conquer_on_the_move(&mut state, ukraine, germany, true);
        assert!(state.battles.blitzed().is_subset(state.battles.conquered()));
        assert!(state.battles.blitzed().contains(&ukraine));
        assert_eq!(state.owner(ukraine), Some(germany));

        // Undo restores ownership and clears both marks.
        let route = Route::new(vec![
            state.map.id("germany").unwrap(),
            ukraine,
            state.map.id("russia").unwrap(),
        ]);
        undo_battle(&mut state, &route, &[], germany);
        assert_eq!(state.owner(ukraine), Some(ussr));
        assert!(!state.battles.conquered().contains(&ukraine));
        assert!(!state.battles.blitzed().contains(&ukraine));
    }
}
