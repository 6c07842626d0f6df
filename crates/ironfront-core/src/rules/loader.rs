use std::collections::{BTreeMap, HashMap};

use ironfront_protocol::{DataId, PlayerId, ResourceId, TechId, TerritoryId, UnitTypeId};
use serde::Deserialize;
use thiserror::Error;

use crate::map::{Canal, TerritoryMap};
use crate::rules::{CompiledRules, GameProperties, RawTechnology, RawTerritory, RawUnitType};

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("missing referenced id: {0}")]
    MissingId(String),
    #[error("invalid unit type `{unit}`: {}", .problems.join("; "))]
    InvalidUnitType { unit: String, problems: Vec<String> },
    #[error("invalid territory `{territory}`: {}", .problems.join("; "))]
    InvalidTerritory {
        territory: String,
        problems: Vec<String>,
    },
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub enum RulesSource<'a> {
    Embedded,
    Path(String),
    Bytes {
        units: &'a [u8],
        map: &'a [u8],
        players: &'a [u8],
        techs: Option<&'a [u8]>,
        properties: Option<&'a [u8]>,
    },
}

#[derive(Debug, Deserialize)]
struct RawMapFile {
    territories: BTreeMap<DataId, RawTerritory>,
    connections: Vec<(DataId, DataId)>,
    #[serde(default)]
    canals: BTreeMap<DataId, RawCanal>,
}

#[derive(Debug, Deserialize)]
struct RawCanal {
    between: (DataId, DataId),
    controlled_by: Vec<DataId>,
}

#[derive(Debug, Deserialize)]
struct RawPlayersFile {
    players: BTreeMap<DataId, RawPlayer>,
    #[serde(default = "default_resources")]
    resources: Vec<DataId>,
    /// Pairs of players or alliances starting the game at war.
    #[serde(default)]
    at_war: Vec<(DataId, DataId)>,
}

fn default_resources() -> Vec<DataId> {
    vec!["funds".to_string()]
}

#[derive(Debug, Deserialize)]
struct RawPlayer {
    #[serde(default)]
    alliance: Option<DataId>,
    #[serde(default)]
    resources: BTreeMap<DataId, i64>,
}

/// Per-player starting configuration produced by the loader.
#[derive(Debug, Clone)]
pub struct PlayerSetup {
    pub name: DataId,
    pub alliance: Option<DataId>,
    pub resources: Vec<(ResourceId, i64)>,
}

/// Everything the loader produces: the compiled catalogue, the territory
/// graph, and the player roster with initial diplomacy.
#[derive(Debug, Clone)]
pub struct CompiledSetup {
    pub rules: CompiledRules,
    pub map: TerritoryMap,
    pub players: Vec<PlayerSetup>,
    pub player_ids: HashMap<DataId, PlayerId>,
    pub initial_war: Vec<(PlayerId, PlayerId)>,
}

struct RawFiles {
    units: BTreeMap<DataId, RawUnitType>,
    map: RawMapFile,
    players: RawPlayersFile,
    techs: BTreeMap<DataId, RawTechnology>,
    properties: GameProperties,
}

pub fn load_setup(source: RulesSource<'_>) -> Result<CompiledSetup, RulesError> {
    let raw = match source {
        RulesSource::Embedded => parse_raw(
            include_str!("../../data/base/units.yaml"),
            include_str!("../../data/base/map.yaml"),
            include_str!("../../data/base/players.yaml"),
            Some(include_str!("../../data/base/techs.yaml")),
            Some(include_str!("../../data/base/properties.yaml")),
        )?,
        RulesSource::Path(path) => {
            let units = std::fs::read_to_string(format!("{path}/units.yaml"))?;
            let map = std::fs::read_to_string(format!("{path}/map.yaml"))?;
            let players = std::fs::read_to_string(format!("{path}/players.yaml"))?;
            let techs = std::fs::read_to_string(format!("{path}/techs.yaml")).ok();
            let properties = std::fs::read_to_string(format!("{path}/properties.yaml")).ok();
            parse_raw(
                &units,
                &map,
                &players,
                techs.as_deref(),
                properties.as_deref(),
            )?
        }
        RulesSource::Bytes {
            units,
            map,
            players,
            techs,
            properties,
        } => parse_raw(
            std::str::from_utf8(units)?,
            std::str::from_utf8(map)?,
            std::str::from_utf8(players)?,
            techs.map(std::str::from_utf8).transpose()?,
            properties.map(std::str::from_utf8).transpose()?,
        )?,
    };

    compile_setup(raw)
}

fn parse_raw(
    units_yaml: &str,
    map_yaml: &str,
    players_yaml: &str,
    techs_yaml: Option<&str>,
    properties_yaml: Option<&str>,
) -> Result<RawFiles, RulesError> {
    let units = serde_yaml::from_str(units_yaml)?;
    let map = serde_yaml::from_str(map_yaml)?;
    let players = serde_yaml::from_str(players_yaml)?;
    let techs = match techs_yaml {
        Some(s) => serde_yaml::from_str(s)?,
        None => BTreeMap::new(),
    };
    let properties = match properties_yaml {
        Some(s) => serde_yaml::from_str(s)?,
        None => GameProperties::default(),
    };
    Ok(RawFiles {
        units,
        map,
        players,
        techs,
        properties,
    })
}

fn compile_setup(raw: RawFiles) -> Result<CompiledSetup, RulesError> {
    let unit_type_ids = raw
        .units
        .keys()
        .enumerate()
        .map(|(i, k)| (k.clone(), UnitTypeId::new(i as u16)))
        .collect::<HashMap<_, _>>();
    let territory_ids = raw
        .map
        .territories
        .keys()
        .enumerate()
        .map(|(i, k)| (k.clone(), TerritoryId::new(i as u16)))
        .collect::<HashMap<_, _>>();
    let tech_ids = raw
        .techs
        .keys()
        .enumerate()
        .map(|(i, k)| (k.clone(), TechId::new(i as u16)))
        .collect::<HashMap<_, _>>();
    let resource_ids = raw
        .players
        .resources
        .iter()
        .enumerate()
        .map(|(i, k)| (k.clone(), ResourceId::new(i as u16)))
        .collect::<HashMap<_, _>>();
    let player_ids = raw
        .players
        .players
        .keys()
        .enumerate()
        .map(|(i, k)| (k.clone(), PlayerId(i as u8)))
        .collect::<HashMap<_, _>>();

    let dice_sides = raw.properties.dice_sides;

    let mut unit_types = Vec::with_capacity(raw.units.len());
    for (name, raw_unit) in raw.units {
        let compiled = raw_unit.compile(&unit_type_ids, &tech_ids, &resource_ids)?;
        let problems = compiled.problems(dice_sides);
        if !problems.is_empty() {
            return Err(RulesError::InvalidUnitType {
                unit: name,
                problems,
            });
        }
        unit_types.push(compiled);
    }

    let mut names = Vec::with_capacity(raw.map.territories.len());
    let mut territory_rules = Vec::with_capacity(raw.map.territories.len());
    for (name, raw_territory) in raw.map.territories {
        let compiled = raw_territory.compile(&territory_ids, &player_ids)?;
        let problems = territory_problems(&compiled);
        if !problems.is_empty() {
            return Err(RulesError::InvalidTerritory {
                territory: name,
                problems,
            });
        }
        names.push(name);
        territory_rules.push(compiled);
    }

    let connections = raw
        .map
        .connections
        .into_iter()
        .map(|(a, b)| {
            let a = *territory_ids
                .get(&a)
                .ok_or(RulesError::MissingId(a))?;
            let b = *territory_ids
                .get(&b)
                .ok_or(RulesError::MissingId(b))?;
            Ok((a, b))
        })
        .collect::<Result<Vec<_>, RulesError>>()?;

    let canals = raw
        .map
        .canals
        .into_iter()
        .map(|(name, canal)| {
            let a = *territory_ids
                .get(&canal.between.0)
                .ok_or(RulesError::MissingId(canal.between.0))?;
            let b = *territory_ids
                .get(&canal.between.1)
                .ok_or(RulesError::MissingId(canal.between.1))?;
            let controlled_by = canal
                .controlled_by
                .into_iter()
                .map(|t| {
                    territory_ids
                        .get(&t)
                        .copied()
                        .ok_or(RulesError::MissingId(t))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Canal {
                name,
                between: (a, b),
                controlled_by,
            })
        })
        .collect::<Result<Vec<_>, RulesError>>()?;

    let techs = raw
        .techs
        .into_values()
        .map(RawTechnology::compile)
        .collect::<Vec<_>>();

    let map = TerritoryMap::build(
        names,
        territory_rules,
        connections,
        canals,
        territory_ids.clone(),
    );

    let alliances: HashMap<DataId, Vec<PlayerId>> = {
        let mut out: HashMap<DataId, Vec<PlayerId>> = HashMap::new();
        for (name, player) in &raw.players.players {
            if let Some(alliance) = &player.alliance {
                out.entry(alliance.clone())
                    .or_default()
                    .push(player_ids[name]);
            }
        }
        out
    };

    let mut initial_war = Vec::new();
    for (a, b) in &raw.players.at_war {
        let left = side_members(a, &alliances, &player_ids)?;
        let right = side_members(b, &alliances, &player_ids)?;
        for &l in &left {
            for &r in &right {
                if l != r {
                    initial_war.push((l, r));
                }
            }
        }
    }

    let players = raw
        .players
        .players
        .into_iter()
        .map(|(name, player)| {
            let resources = player
                .resources
                .into_iter()
                .map(|(res, amount)| {
                    resource_ids
                        .get(&res)
                        .copied()
                        .map(|r| (r, amount))
                        .ok_or(RulesError::MissingId(res))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(PlayerSetup {
                name,
                alliance: player.alliance,
                resources,
            })
        })
        .collect::<Result<Vec<_>, RulesError>>()?;

    let resources = {
        let mut by_id = raw
            .players
            .resources
            .iter()
            .map(|name| (resource_ids[name], name.clone()))
            .collect::<Vec<_>>();
        by_id.sort_by_key(|(id, _)| *id);
        by_id.into_iter().map(|(_, name)| name).collect()
    };

    let rules = CompiledRules {
        unit_types,
        techs,
        resources,
        properties: raw.properties,
        unit_type_ids,
        tech_ids,
        resource_ids,
    };

    Ok(CompiledSetup {
        rules,
        map,
        players,
        player_ids,
        initial_war,
    })
}

fn side_members(
    side: &DataId,
    alliances: &HashMap<DataId, Vec<PlayerId>>,
    player_ids: &HashMap<DataId, PlayerId>,
) -> Result<Vec<PlayerId>, RulesError> {
    if let Some(members) = alliances.get(side) {
        return Ok(members.clone());
    }
    player_ids
        .get(side)
        .map(|&p| vec![p])
        .ok_or_else(|| RulesError::MissingId(side.clone()))
}

fn territory_problems(rules: &crate::rules::TerritoryRules) -> Vec<String> {
    let mut out = Vec::new();
    if rules.water && rules.capital_of.is_some() {
        out.push("a sea zone cannot be a capital".to_string());
    }
    if rules.water && rules.original_owner.is_some() {
        out.push("a sea zone cannot have an owner".to_string());
    }
    if !rules.water && !rules.convoy_to.is_empty() {
        out.push("convoy routes start from sea zones".to_string());
    }
    if rules.impassable && rules.capital_of.is_some() {
        out.push("an impassable territory cannot be a capital".to_string());
    }
    out
}
