use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use ironfront_protocol::{
    Change, ChronicleEntry, ChronicleEvent, DataId, PlayerId, ResourceId, TerritoryId, UnitId,
    UnitTypeId,
};
use serde::{Deserialize, Serialize};

use crate::battle::BattleRegistry;
use crate::entities::EntityStore;
use crate::map::TerritoryMap;
use crate::rules::{CompiledRules, CompiledSetup};
use crate::tech::TechState;
use crate::unit::Unit;

#[derive(Clone, Debug)]
pub struct Player {
    pub name: DataId,
    pub alliance: Option<DataId>,
    pub resources: BTreeMap<ResourceId, i64>,
    pub tech: TechState,
}

/// The shared, mutable game state: map ownership, the unit roster, players,
/// relationships and the battle registry, plus the applied-change record
/// and turn chronicle.
///
/// All ownership/resource/roster mutation goes through [`GameState::apply`]
/// so the recorded history and the state can never drift apart.
#[derive(Debug)]
pub struct GameState {
    pub rules: CompiledRules,
    pub map: TerritoryMap,
    pub units: EntityStore<Unit>,
    pub players: Vec<Player>,
    pub relationships: crate::relationships::Relationships,
    pub battles: BattleRegistry,
    pub round: u32,

    owners: Vec<Option<PlayerId>>,
    changes: Vec<Change>,
    chronicle: Vec<ChronicleEntry>,
    next_entry_id: u64,
}

impl GameState {
    pub fn from_setup(setup: CompiledSetup) -> Self {
        let owners = setup
            .map
            .territory_ids()
            .map(|t| setup.map.rules(t).original_owner)
            .collect();
        let players = setup
            .players
            .into_iter()
            .map(|p| Player {
                name: p.name,
                alliance: p.alliance,
                resources: p.resources.into_iter().collect(),
                tech: TechState::new(),
            })
            .collect();

        let mut relationships = crate::relationships::Relationships::new();
        {
            // Same alliance tag means allied; explicit pairs start at war.
            let players: &Vec<Player> = &players;
            for (i, a) in players.iter().enumerate() {
                for (j, b) in players.iter().enumerate().skip(i + 1) {
                    if let (Some(aa), Some(ab)) = (&a.alliance, &b.alliance) {
                        if aa == ab {
                            relationships.set_allied(PlayerId(i as u8), PlayerId(j as u8));
                        }
                    }
                }
            }
        }
        for (a, b) in setup.initial_war {
            relationships.declare_war(a, b);
        }

        Self {
            rules: setup.rules,
            map: setup.map,
            units: EntityStore::new(),
            players,
            relationships,
            battles: BattleRegistry::new(),
            round: 1,
            owners,
            changes: Vec::new(),
            chronicle: Vec::new(),
            next_entry_id: 0,
        }
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    pub fn owner(&self, territory: TerritoryId) -> Option<PlayerId> {
        self.owners[territory.raw as usize]
    }

    pub fn player(&self, id: PlayerId) -> &Player {
        &self.players[id.0 as usize]
    }

    pub fn player_id(&self, name: &str) -> Option<PlayerId> {
        self.players
            .iter()
            .position(|p| p.name == name)
            .map(|i| PlayerId(i as u8))
    }

    pub fn player_mut(&mut self, id: PlayerId) -> &mut Player {
        &mut self.players[id.0 as usize]
    }

    pub fn tech(&self, player: PlayerId) -> &TechState {
        &self.player(player).tech
    }

    pub fn resource(&self, player: PlayerId, resource: ResourceId) -> i64 {
        self.player(player)
            .resources
            .get(&resource)
            .copied()
            .unwrap_or(0)
    }

    pub fn units_in(&self, territory: TerritoryId) -> Vec<UnitId> {
        self.units
            .iter_ordered()
            .filter(|(_, u)| u.territory == territory)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn enemy_units_in(&self, territory: TerritoryId, player: PlayerId) -> Vec<UnitId> {
        self.units
            .iter_ordered()
            .filter(|(_, u)| {
                u.territory == territory && self.relationships.is_at_war(u.owner, player)
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Enemy units that can force a battle (combat-capable, not submerged).
    pub fn blocking_enemy_units_in(&self, territory: TerritoryId, player: PlayerId) -> Vec<UnitId> {
        self.enemy_units_in(territory, player)
            .into_iter()
            .filter(|&id| {
                let unit = self.units.get(id).expect("listed unit exists");
                !unit.submerged && self.rules.unit_type(unit.type_id).blocks_conquest()
            })
            .collect()
    }

    pub fn has_enemy_units(&self, territory: TerritoryId, player: PlayerId) -> bool {
        !self.enemy_units_in(territory, player).is_empty()
    }

    /// Territory is hostile ground for `player`: enemy-owned land or a zone
    /// holding enemy units.
    pub fn is_hostile(&self, territory: TerritoryId, player: PlayerId) -> bool {
        if self.has_enemy_units(territory, player) {
            return true;
        }
        if self.map.is_water(territory) {
            return false;
        }
        match self.owner(territory) {
            Some(owner) => self.relationships.is_at_war(owner, player),
            None => false,
        }
    }

    pub fn capitals_of(&self, player: PlayerId) -> Vec<TerritoryId> {
        self.map
            .territory_ids()
            .filter(|&t| self.map.rules(t).capital_of == Some(player))
            .collect()
    }

    /// Does the player still hold at least one of their designated capitals?
    pub fn controls_a_capital(&self, player: PlayerId) -> bool {
        self.capitals_of(player)
            .into_iter()
            .any(|t| self.owner(t) == Some(player))
    }

    pub fn chronicle(&self) -> &[ChronicleEntry] {
        &self.chronicle
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Put a unit on the board. Setup/placement path; in-play roster edits
    /// go through `apply`.
    pub fn spawn_unit(&mut self, type_id: UnitTypeId, owner: PlayerId, territory: TerritoryId) -> UnitId {
        let unit = Unit::new(type_id, owner, territory, &self.rules, &self.players[owner.0 as usize].tech);
        self.units.insert(unit)
    }

    pub fn record(&mut self, event: ChronicleEvent) {
        let entry = ChronicleEntry {
            id: self.next_entry_id,
            round: self.round,
            event,
        };
        self.next_entry_id += 1;
        self.chronicle.push(entry);
    }

    /// Apply one change to the state and record it. The single mutation
    /// path for everything the history must be able to explain.
    pub fn apply(&mut self, change: Change) {
        match &change {
            Change::TerritoryOwner { territory, old, new } => {
                debug_assert_eq!(self.owners[territory.raw as usize], *old);
                self.owners[territory.raw as usize] = *new;
            }
            Change::ResourceDelta {
                player,
                resource,
                delta,
            } => {
                let entry = self.players[player.0 as usize]
                    .resources
                    .entry(*resource)
                    .or_insert(0);
                *entry += delta;
            }
            Change::UnitsMoved { units, from, to } => {
                for &unit in units {
                    if let Some(u) = self.units.get_mut(unit) {
                        debug_assert_eq!(u.territory, *from);
                        u.territory = *to;
                    }
                }
            }
            Change::UnitsRemoved { units, .. } => {
                for &unit in units {
                    self.units.remove(unit);
                }
            }
            Change::UnitOwner { unit, new, .. } => {
                if let Some(u) = self.units.get_mut(*unit) {
                    u.owner = *new;
                }
            }
            Change::UnitTransformed { unit, new_type, .. } => {
                if let Some(u) = self.units.get_mut(*unit) {
                    u.type_id = *new_type;
                }
            }
            Change::UnitDamaged { unit, delta } => {
                if let Some(u) = self.units.get_mut(*unit) {
                    u.damage = (u.damage as i64 + *delta as i64).max(0) as u32;
                }
            }
            Change::TechTokensCleared { player, count } => {
                debug_assert_eq!(self.players[player.0 as usize].tech.tokens(), *count);
                self.players[player.0 as usize].tech.forfeit_tokens();
            }
            Change::ProductionSet { territory, new, .. } => {
                self.map.rules_mut(*territory).production = *new;
            }
        }
        self.changes.push(change);
    }

    /// Turn boundary: movement refreshed, per-turn unit flags and the
    /// registry's territory status sets cleared.
    pub fn end_of_turn(&mut self) {
        self.battles.clear_turn_state();
        for id in self.units.ids() {
            let (type_id, owner) = {
                let unit = self.units.get(id).expect("listed unit exists");
                (unit.type_id, unit.owner)
            };
            let movement = self
                .rules
                .movement_value(type_id, &self.players[owner.0 as usize].tech);
            if let Some(unit) = self.units.get_mut(id) {
                unit.refresh_for_new_turn(movement);
            }
        }
        self.round += 1;
    }
}

/// Coarse single-lock handle over the whole game state. Read-only queries
/// take the shared side; anything that mutates takes it exclusively. Guards
/// are scoped to one closure so the lock is never held across a
/// user-interaction suspension point.
#[derive(Clone, Debug)]
pub struct SharedState {
    inner: Arc<RwLock<GameState>>,
}

impl SharedState {
    pub fn new(state: GameState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&GameState) -> R) -> R {
        let guard = self.inner.read().expect("state lock poisoned");
        f(&guard)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut GameState) -> R) -> R {
        let mut guard = self.inner.write().expect("state lock poisoned");
        f(&mut guard)
    }
}

/// Snapshot of player economy for external display.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerEconomy {
    pub player: PlayerId,
    pub resources: BTreeMap<ResourceId, i64>,
}

impl GameState {
    pub fn economy(&self, player: PlayerId) -> PlayerEconomy {
        PlayerEconomy {
            player,
            resources: self.player(player).resources.clone(),
        }
    }

    /// Machine-readable snapshot for external tooling and logs.
    pub fn economy_json(&self, player: PlayerId) -> String {
        serde_json::to_string(&self.economy(player)).unwrap_or_else(|_| String::from("{}"))
    }

    /// The chronicle as JSON lines, for export to history viewers.
    pub fn chronicle_json(&self) -> String {
        self.chronicle
            .iter()
            .map(ChronicleEntry::to_json_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
