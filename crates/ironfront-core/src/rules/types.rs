use std::collections::{BTreeMap, HashMap};

use ironfront_protocol::{DataId, PlayerId, ResourceId, TechId, TerritoryId, UnitTypeId};
use serde::Deserialize;

use crate::rules::RulesError;
use crate::tech::TechState;

/// Mutually exclusive movement category. Replaces the pair of is-air/is-sea
/// booleans so an impossible combination cannot be expressed at all; the
/// remaining cross-flag constraints are enforced by `UnitType::problems`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitDomain {
    Land,
    Sea,
    Air,
}

/// Which presence count a stacking limit constrains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackScope {
    /// Units of the asking player only.
    Owned,
    /// Units of the asking player and their allies.
    Allied,
    /// Every unit of the type regardless of owner.
    Total,
}

/// A per-unit-type cap on simultaneous presence in one territory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct StackingLimit {
    pub max: u32,
    pub scope: StackScope,
}

/// The three contexts a stacking limit can attach to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StackContext {
    Movement,
    Attacking,
    Placement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct AntiAir {
    /// Hit on a roll of `attack` or less, on a die with `die_sides` sides.
    pub attack: u32,
    pub die_sides: u32,
    /// Cap on targets fired at per battle. `None` fires at every eligible
    /// air unit.
    #[serde(default)]
    pub max_shots: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUnitType {
    pub name: String,
    #[serde(default = "default_domain")]
    pub domain: UnitDomain,
    #[serde(default)]
    pub attack: u32,
    #[serde(default)]
    pub defense: u32,
    #[serde(default = "default_one")]
    pub attack_rolls: u32,
    #[serde(default = "default_one")]
    pub defense_rolls: u32,
    #[serde(default = "default_one")]
    pub hit_points: u32,
    #[serde(default = "default_one")]
    pub movement: u32,

    // Sea transports carry land units; both sides of the relation.
    #[serde(default)]
    pub transport_capacity: Option<u32>,
    #[serde(default)]
    pub transport_cost: Option<u32>,

    // Carriers host air units.
    #[serde(default)]
    pub carrier_capacity: Option<u32>,
    #[serde(default)]
    pub carrier_cost: Option<u32>,

    #[serde(default)]
    pub can_blitz: bool,
    #[serde(default)]
    pub is_marine: bool,
    /// Shore-bombardment strength supporting an amphibious assault.
    #[serde(default)]
    pub bombard: Option<u32>,
    #[serde(default)]
    pub is_strategic_bomber: bool,

    #[serde(default)]
    pub first_strike: bool,
    #[serde(default)]
    pub can_evade: bool,
    #[serde(default)]
    pub is_destroyer: bool,

    #[serde(default)]
    pub suicide_on_attack: bool,
    #[serde(default)]
    pub suicide_on_defense: bool,
    #[serde(default)]
    pub suicide_on_hit: bool,

    #[serde(default)]
    pub antiair: Option<AntiAir>,

    #[serde(default)]
    pub is_infrastructure: bool,
    #[serde(default)]
    pub can_produce_units: bool,

    #[serde(default)]
    pub can_be_damaged: bool,
    #[serde(default)]
    pub max_damage: Option<u32>,
    #[serde(default)]
    pub destroyed_at_max_damage: bool,

    #[serde(default)]
    pub destroy_on_capture: bool,
    #[serde(default)]
    pub capture_changes_into: Option<DataId>,
    #[serde(default)]
    pub capture_damage: Option<u32>,

    #[serde(default)]
    pub is_air_transport: bool,
    #[serde(default)]
    pub is_air_transportable: bool,
    #[serde(default)]
    pub air_transport_capacity: Option<u32>,

    #[serde(default)]
    pub is_land_transport: bool,
    #[serde(default)]
    pub land_transport_capacity: Option<u32>,

    #[serde(default)]
    pub cannot_move_during_combat: bool,
    #[serde(default)]
    pub max_built_per_player: Option<u32>,

    /// Per-territory-entered movement cost, charged from player resources.
    #[serde(default)]
    pub fuel_cost: BTreeMap<DataId, u32>,

    #[serde(default)]
    pub movement_limit: Option<StackingLimit>,
    #[serde(default)]
    pub attacking_limit: Option<StackingLimit>,
    #[serde(default)]
    pub placement_limit: Option<StackingLimit>,

    #[serde(default)]
    pub tech_required: Option<DataId>,
}

fn default_domain() -> UnitDomain {
    UnitDomain::Land
}

fn default_one() -> u32 {
    1
}

impl RawUnitType {
    pub fn compile(
        self,
        unit_ids: &HashMap<DataId, UnitTypeId>,
        tech_ids: &HashMap<DataId, TechId>,
        resource_ids: &HashMap<DataId, ResourceId>,
    ) -> Result<UnitType, RulesError> {
        let capture_changes_into = match self.capture_changes_into {
            Some(id) => Some(
                *unit_ids
                    .get(&id)
                    .ok_or(RulesError::MissingId(id))?,
            ),
            None => None,
        };
        let tech_required = match self.tech_required {
            Some(id) => Some(
                *tech_ids
                    .get(&id)
                    .ok_or(RulesError::MissingId(id))?,
            ),
            None => None,
        };
        let fuel_cost = self
            .fuel_cost
            .into_iter()
            .map(|(id, amount)| {
                resource_ids
                    .get(&id)
                    .copied()
                    .map(|r| (r, amount))
                    .ok_or(RulesError::MissingId(id))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(UnitType {
            name: self.name,
            domain: self.domain,
            attack: self.attack,
            defense: self.defense,
            attack_rolls: self.attack_rolls,
            defense_rolls: self.defense_rolls,
            hit_points: self.hit_points,
            movement: self.movement,
            transport_capacity: self.transport_capacity,
            transport_cost: self.transport_cost,
            carrier_capacity: self.carrier_capacity,
            carrier_cost: self.carrier_cost,
            can_blitz: self.can_blitz,
            is_marine: self.is_marine,
            bombard: self.bombard,
            is_strategic_bomber: self.is_strategic_bomber,
            first_strike: self.first_strike,
            can_evade: self.can_evade,
            is_destroyer: self.is_destroyer,
            suicide_on_attack: self.suicide_on_attack,
            suicide_on_defense: self.suicide_on_defense,
            suicide_on_hit: self.suicide_on_hit,
            antiair: self.antiair,
            is_infrastructure: self.is_infrastructure,
            can_produce_units: self.can_produce_units,
            can_be_damaged: self.can_be_damaged,
            max_damage: self.max_damage,
            destroyed_at_max_damage: self.destroyed_at_max_damage,
            destroy_on_capture: self.destroy_on_capture,
            capture_changes_into,
            capture_damage: self.capture_damage,
            is_air_transport: self.is_air_transport,
            is_air_transportable: self.is_air_transportable,
            air_transport_capacity: self.air_transport_capacity,
            is_land_transport: self.is_land_transport,
            land_transport_capacity: self.land_transport_capacity,
            cannot_move_during_combat: self.cannot_move_during_combat,
            max_built_per_player: self.max_built_per_player,
            fuel_cost,
            movement_limit: self.movement_limit,
            attacking_limit: self.attacking_limit,
            placement_limit: self.placement_limit,
            tech_required,
        })
    }
}

/// Static per-unit-type rule table. Immutable after load; derived queries
/// that fold in player technology live on `CompiledRules`.
#[derive(Debug, Clone)]
pub struct UnitType {
    pub name: String,
    pub domain: UnitDomain,
    pub attack: u32,
    pub defense: u32,
    pub attack_rolls: u32,
    pub defense_rolls: u32,
    pub hit_points: u32,
    pub movement: u32,
    pub transport_capacity: Option<u32>,
    pub transport_cost: Option<u32>,
    pub carrier_capacity: Option<u32>,
    pub carrier_cost: Option<u32>,
    pub can_blitz: bool,
    pub is_marine: bool,
    pub bombard: Option<u32>,
    pub is_strategic_bomber: bool,
    pub first_strike: bool,
    pub can_evade: bool,
    pub is_destroyer: bool,
    pub suicide_on_attack: bool,
    pub suicide_on_defense: bool,
    pub suicide_on_hit: bool,
    pub antiair: Option<AntiAir>,
    pub is_infrastructure: bool,
    pub can_produce_units: bool,
    pub can_be_damaged: bool,
    pub max_damage: Option<u32>,
    pub destroyed_at_max_damage: bool,
    pub destroy_on_capture: bool,
    pub capture_changes_into: Option<UnitTypeId>,
    pub capture_damage: Option<u32>,
    pub is_air_transport: bool,
    pub is_air_transportable: bool,
    pub air_transport_capacity: Option<u32>,
    pub is_land_transport: bool,
    pub land_transport_capacity: Option<u32>,
    pub cannot_move_during_combat: bool,
    pub max_built_per_player: Option<u32>,
    pub fuel_cost: Vec<(ResourceId, u32)>,
    pub movement_limit: Option<StackingLimit>,
    pub attacking_limit: Option<StackingLimit>,
    pub placement_limit: Option<StackingLimit>,
    pub tech_required: Option<TechId>,
}

impl UnitType {
    pub fn is_air(&self) -> bool {
        self.domain == UnitDomain::Air
    }

    pub fn is_sea(&self) -> bool {
        self.domain == UnitDomain::Sea
    }

    pub fn is_land(&self) -> bool {
        self.domain == UnitDomain::Land
    }

    pub fn is_sea_transport(&self) -> bool {
        self.is_sea() && self.transport_capacity.is_some()
    }

    /// Can this unit ever take part in combat resolution?
    pub fn is_combat_unit(&self) -> bool {
        !self.is_infrastructure && (self.attack > 0 || self.defense > 0)
    }

    /// Can this unit, standing on defense, force a battle?
    pub fn blocks_conquest(&self) -> bool {
        !self.is_infrastructure && self.defense > 0
    }

    pub fn limit_for(&self, ctx: StackContext) -> Option<StackingLimit> {
        match ctx {
            StackContext::Movement => self.movement_limit,
            StackContext::Attacking => self.attacking_limit,
            StackContext::Placement => self.placement_limit,
        }
    }

    /// All load-time consistency problems with this type, empty when valid.
    /// Collected per type so a broken catalogue reports every field at once.
    pub fn problems(&self, dice_sides: u32) -> Vec<String> {
        let mut out = Vec::new();

        if self.hit_points == 0 {
            out.push("hit_points must be positive".to_string());
        }
        if !self.is_land() && self.can_blitz {
            out.push("only land units can blitz".to_string());
        }
        if !self.is_sea() && self.transport_capacity.is_some() {
            out.push("transport_capacity requires a sea unit".to_string());
        }
        if !self.is_land() && self.transport_cost.is_some() {
            out.push("transport_cost requires a land unit".to_string());
        }
        if !self.is_sea() && self.carrier_capacity.is_some() {
            out.push("carrier_capacity requires a sea unit".to_string());
        }
        if !self.is_air() && self.carrier_cost.is_some() {
            out.push("carrier_cost requires an air unit".to_string());
        }
        if !self.is_sea() && (self.first_strike || self.can_evade || self.is_destroyer) {
            out.push("first_strike, can_evade and is_destroyer are sea-only".to_string());
        }
        if !self.is_sea() && self.bombard.is_some() {
            out.push("bombard requires a sea unit".to_string());
        }
        if !self.is_air() && self.is_strategic_bomber {
            out.push("is_strategic_bomber requires an air unit".to_string());
        }
        if !self.is_land() && self.is_marine {
            out.push("is_marine requires a land unit".to_string());
        }
        if self.is_air_transport && !self.is_air() {
            out.push("is_air_transport requires an air unit".to_string());
        }
        if self.is_air_transport && self.air_transport_capacity.is_none() {
            out.push("is_air_transport requires air_transport_capacity".to_string());
        }
        if self.air_transport_capacity.is_some() && !self.is_air_transport {
            out.push("air_transport_capacity requires is_air_transport".to_string());
        }
        if self.is_air_transportable && !self.is_land() {
            out.push("is_air_transportable requires a land unit".to_string());
        }
        if self.is_land_transport && !self.is_land() {
            out.push("is_land_transport requires a land unit".to_string());
        }
        if self.land_transport_capacity.is_some() && !self.is_land_transport {
            out.push("land_transport_capacity requires is_land_transport".to_string());
        }
        if let Some(aa) = self.antiair {
            if aa.die_sides == 0 || aa.die_sides > dice_sides {
                out.push(format!(
                    "antiair die_sides must be in 1..={dice_sides}"
                ));
            }
            if aa.attack == 0 || aa.attack > aa.die_sides {
                out.push("antiair attack must be in 1..=die_sides".to_string());
            }
        }
        if self.can_produce_units && !self.is_infrastructure {
            out.push("can_produce_units requires is_infrastructure".to_string());
        }
        if self.destroyed_at_max_damage && !self.can_be_damaged {
            out.push("destroyed_at_max_damage requires can_be_damaged".to_string());
        }
        if self.max_damage.is_some() && !self.can_be_damaged {
            out.push("max_damage requires can_be_damaged".to_string());
        }
        if self.capture_damage.is_some() && !self.can_be_damaged {
            out.push("capture_damage requires can_be_damaged".to_string());
        }
        if self.destroy_on_capture && self.capture_changes_into.is_some() {
            out.push("destroy_on_capture conflicts with capture_changes_into".to_string());
        }

        out
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTerritory {
    #[serde(default)]
    pub water: bool,
    #[serde(default)]
    pub production: u32,
    /// Production usable for unit placement; defaults to `production`.
    #[serde(default)]
    pub unit_production: Option<u32>,
    #[serde(default)]
    pub capital_of: Option<DataId>,
    /// Starting owner. Absent means unowned neutral (or open sea).
    #[serde(default)]
    pub owner: Option<DataId>,
    #[serde(default)]
    pub impassable: bool,
    /// Land territories whose owner draws income through this convoy zone.
    #[serde(default)]
    pub convoy_to: Vec<DataId>,
    /// Capture-transfer table: when `key` captures this territory it is
    /// handed to `value` instead.
    #[serde(default)]
    pub capture_goes_to: BTreeMap<DataId, DataId>,
}

impl RawTerritory {
    pub fn compile(
        self,
        territory_ids: &HashMap<DataId, TerritoryId>,
        player_ids: &HashMap<DataId, PlayerId>,
    ) -> Result<TerritoryRules, RulesError> {
        let capital_of = match self.capital_of {
            Some(name) => Some(
                *player_ids
                    .get(&name)
                    .ok_or(RulesError::MissingId(name))?,
            ),
            None => None,
        };
        let original_owner = match self.owner {
            Some(name) => Some(
                *player_ids
                    .get(&name)
                    .ok_or(RulesError::MissingId(name))?,
            ),
            None => None,
        };
        let convoy_to = self
            .convoy_to
            .into_iter()
            .map(|name| {
                territory_ids
                    .get(&name)
                    .copied()
                    .ok_or(RulesError::MissingId(name))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let capture_goes_to = self
            .capture_goes_to
            .into_iter()
            .map(|(from, to)| {
                let from = *player_ids
                    .get(&from)
                    .ok_or(RulesError::MissingId(from))?;
                let to = *player_ids
                    .get(&to)
                    .ok_or(RulesError::MissingId(to))?;
                Ok((from, to))
            })
            .collect::<Result<BTreeMap<_, _>, RulesError>>()?;

        Ok(TerritoryRules {
            water: self.water,
            production: self.production,
            unit_production: self.unit_production.unwrap_or(self.production),
            capital_of,
            original_owner,
            impassable: self.impassable,
            convoy_to,
            capture_goes_to,
        })
    }
}

/// Static per-territory data. Ownership itself lives on the runtime
/// `Territory`; `original_owner` here is the at-load owner used for
/// liberation decisions.
#[derive(Debug, Clone)]
pub struct TerritoryRules {
    pub water: bool,
    pub production: u32,
    pub unit_production: u32,
    pub capital_of: Option<PlayerId>,
    pub original_owner: Option<PlayerId>,
    pub impassable: bool,
    pub convoy_to: Vec<TerritoryId>,
    pub capture_goes_to: BTreeMap<PlayerId, PlayerId>,
}

/// Technology effects the capability model understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechEffect {
    /// +1 defense for non-bomber air units.
    JetFighters,
    /// +1 attack for first-strike / evading sea units.
    SuperSubmarines,
    /// +2 movement for air units.
    LongRangeAircraft,
    /// Strategic bombers roll one extra attack die.
    HeavyBombers,
    /// +1 anti-air attack value.
    Radar,
    /// Enables rocket attacks from anti-air units.
    Rockets,
    /// Land units may ride land transports.
    MechanizedInfantry,
    /// Air transports may carry air-transportable units.
    Paratroopers,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTechnology {
    pub name: String,
    pub effect: TechEffect,
}

impl RawTechnology {
    pub fn compile(self) -> Technology {
        Technology {
            name: self.name,
            effect: self.effect,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Technology {
    pub name: String,
    pub effect: TechEffect,
}

/// Ruleset-wide flags and constants. Legacy carve-outs are preserved as
/// declared policy, not re-derived.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameProperties {
    pub dice_sides: u32,
    /// Fee per unowned neutral territory entered.
    pub neutral_fee: i64,
    /// Classic ruleset: at most one anti-air unit per territory, whatever
    /// the declared stacking limits say.
    pub classic_one_aa_per_territory: bool,
    /// Enemy submarines in the origin sea zone block unloads from
    /// transports that have no warship escort.
    pub subs_prevent_unescorted_landings: bool,
    /// Transports alone retain control of a captured sea zone.
    pub transports_hold_sea: bool,
    /// Evading units alone retain control of a captured sea zone.
    pub subs_hold_sea: bool,
    /// Captured capital treasuries are burned instead of transferred.
    pub capture_destroys_treasury: bool,
    /// Bombing damages production units; when false the defender loses
    /// resources directly.
    pub bombing_damages_units: bool,
    /// Per-raid damage cap as a multiple of territory production, used for
    /// targets without an explicit max_damage.
    pub bombing_cap_multiplier: u32,
    /// Defending fighters may intercept strategic bombing raids.
    pub intercept_bombing_raids: bool,
    /// Defending fighters may intercept ordinary air attacks.
    pub intercept_combat_moves: bool,
    /// Combat rounds per battle before the attacker must break off.
    pub max_battle_rounds: Option<u32>,
}

impl Default for GameProperties {
    fn default() -> Self {
        Self {
            dice_sides: 6,
            neutral_fee: 3,
            classic_one_aa_per_territory: false,
            subs_prevent_unescorted_landings: false,
            transports_hold_sea: false,
            subs_hold_sea: false,
            capture_destroys_treasury: false,
            bombing_damages_units: true,
            bombing_cap_multiplier: 2,
            intercept_bombing_raids: true,
            intercept_combat_moves: false,
            max_battle_rounds: None,
        }
    }
}

/// The compiled rules catalogue: unit capability table, technologies,
/// resources and ruleset properties, with DataId -> runtime-id maps.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub unit_types: Vec<UnitType>,
    pub techs: Vec<Technology>,
    pub resources: Vec<String>,
    pub properties: GameProperties,

    pub unit_type_ids: HashMap<DataId, UnitTypeId>,
    pub tech_ids: HashMap<DataId, TechId>,
    pub resource_ids: HashMap<DataId, ResourceId>,
}

impl CompiledRules {
    pub fn unit_type(&self, id: UnitTypeId) -> &UnitType {
        &self.unit_types[id.raw as usize]
    }

    pub fn unit_type_id(&self, data_id: &str) -> Option<UnitTypeId> {
        self.unit_type_ids.get(data_id).copied()
    }

    pub fn tech_id(&self, data_id: &str) -> Option<TechId> {
        self.tech_ids.get(data_id).copied()
    }

    pub fn resource_id(&self, data_id: &str) -> Option<ResourceId> {
        self.resource_ids.get(data_id).copied()
    }

    /// The first declared resource: fees and treasuries are charged in it.
    pub fn primary_resource(&self) -> Option<ResourceId> {
        (!self.resources.is_empty()).then(|| ResourceId::new(0))
    }

    pub fn tech(&self, id: TechId) -> &Technology {
        &self.techs[id.raw as usize]
    }

    fn clamp(&self, value: i64) -> u32 {
        value.clamp(0, self.properties.dice_sides as i64) as u32
    }

    /// Attack value with the player's technology folded in, clamped to the
    /// die-size range.
    pub fn attack_value(&self, id: UnitTypeId, tech: &TechState) -> u32 {
        let unit = self.unit_type(id);
        let mut value = unit.attack as i64;
        if unit.is_sea()
            && (unit.first_strike || unit.can_evade)
            && tech.has(self, TechEffect::SuperSubmarines)
        {
            value += 1;
        }
        self.clamp(value)
    }

    pub fn defense_value(&self, id: UnitTypeId, tech: &TechState) -> u32 {
        let unit = self.unit_type(id);
        let mut value = unit.defense as i64;
        if unit.is_air() && !unit.is_strategic_bomber && tech.has(self, TechEffect::JetFighters) {
            value += 1;
        }
        self.clamp(value)
    }

    pub fn movement_value(&self, id: UnitTypeId, tech: &TechState) -> u32 {
        let unit = self.unit_type(id);
        let mut value = unit.movement;
        if unit.is_air() && tech.has(self, TechEffect::LongRangeAircraft) {
            value += 2;
        }
        value
    }

    pub fn attack_rolls(&self, id: UnitTypeId, tech: &TechState) -> u32 {
        let unit = self.unit_type(id);
        let mut rolls = unit.attack_rolls;
        if unit.is_strategic_bomber && tech.has(self, TechEffect::HeavyBombers) {
            rolls += 1;
        }
        rolls.max(1)
    }

    /// Anti-air strength after radar, clamped to the gun's own die sides.
    pub fn aa_attack_value(&self, id: UnitTypeId, tech: &TechState) -> Option<(u32, u32)> {
        let aa = self.unit_type(id).antiair?;
        let mut attack = aa.attack;
        if tech.has(self, TechEffect::Radar) {
            attack += 1;
        }
        Some((attack.min(aa.die_sides), aa.die_sides))
    }

    /// Is this unit type allowed to ride a land transport for this player?
    pub fn land_transportable(&self, id: UnitTypeId, tech: &TechState) -> bool {
        let unit = self.unit_type(id);
        unit.is_land()
            && !unit.is_land_transport
            && unit.transport_cost.is_some()
            && tech.has(self, TechEffect::MechanizedInfantry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(name: &str, domain: UnitDomain) -> UnitType {
        UnitType {
            name: name.to_string(),
            domain,
            attack: 1,
            defense: 1,
            attack_rolls: 1,
            defense_rolls: 1,
            hit_points: 1,
            movement: 1,
            transport_capacity: None,
            transport_cost: None,
            carrier_capacity: None,
            carrier_cost: None,
            can_blitz: false,
            is_marine: false,
            bombard: None,
            is_strategic_bomber: false,
            first_strike: false,
            can_evade: false,
            is_destroyer: false,
            suicide_on_attack: false,
            suicide_on_defense: false,
            suicide_on_hit: false,
            antiair: None,
            is_infrastructure: false,
            can_produce_units: false,
            can_be_damaged: false,
            max_damage: None,
            destroyed_at_max_damage: false,
            destroy_on_capture: false,
            capture_changes_into: None,
            capture_damage: None,
            is_air_transport: false,
            is_air_transportable: false,
            air_transport_capacity: None,
            is_land_transport: false,
            land_transport_capacity: None,
            cannot_move_during_combat: false,
            max_built_per_player: None,
            fuel_cost: Vec::new(),
            movement_limit: None,
            attacking_limit: None,
            placement_limit: None,
            tech_required: None,
        }
    }

    #[test]
    fn sea_unit_with_blitz_is_a_category_conflict() {
        let mut cruiser = bare("cruiser", UnitDomain::Sea);
        cruiser.can_blitz = true;
        let problems = cruiser.problems(6);
        assert!(problems.iter().any(|p| p.contains("blitz")));
    }

    #[test]
    fn zero_hit_points_is_rejected() {
        let mut ghost = bare("ghost", UnitDomain::Land);
        ghost.hit_points = 0;
        assert!(!ghost.problems(6).is_empty());
    }

    #[test]
    fn antiair_die_sides_must_fit_the_game_die() {
        let mut gun = bare("gun", UnitDomain::Land);
        gun.antiair = Some(AntiAir {
            attack: 1,
            die_sides: 8,
            max_shots: None,
        });
        assert!(gun
            .problems(6)
            .iter()
            .any(|p| p.contains("die_sides")));
        gun.antiair = Some(AntiAir {
            attack: 1,
            die_sides: 6,
            max_shots: None,
        });
        assert!(gun.problems(6).is_empty());
    }

    #[test]
    fn production_without_infrastructure_is_inconsistent() {
        let mut mill = bare("mill", UnitDomain::Land);
        mill.can_produce_units = true;
        assert!(!mill.problems(6).is_empty());
        mill.is_infrastructure = true;
        assert!(mill.problems(6).is_empty());
    }

    #[test]
    fn a_valid_land_unit_has_no_problems() {
        let infantry = bare("infantry", UnitDomain::Land);
        assert!(infantry.problems(6).is_empty());
    }
}
