use serde::{Deserialize, Serialize};

use crate::{PlayerId, ResourceId, TerritoryId, UnitId, UnitTypeId};

/// One applied mutation of shared game state.
///
/// The core never edits ownership, resources or the unit roster directly:
/// it builds a `Change` and pushes it through the state's single apply
/// path, which mutates and records in one step. Old values are carried so
/// a recorded change is self-describing and reversible.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Change {
    TerritoryOwner {
        territory: TerritoryId,
        old: Option<PlayerId>,
        new: Option<PlayerId>,
    },
    ResourceDelta {
        player: PlayerId,
        resource: ResourceId,
        delta: i64,
    },
    UnitsMoved {
        units: Vec<UnitId>,
        from: TerritoryId,
        to: TerritoryId,
    },
    UnitsRemoved {
        units: Vec<UnitId>,
        territory: TerritoryId,
    },
    UnitOwner {
        unit: UnitId,
        old: PlayerId,
        new: PlayerId,
    },
    UnitTransformed {
        unit: UnitId,
        old_type: UnitTypeId,
        new_type: UnitTypeId,
    },
    UnitDamaged {
        unit: UnitId,
        delta: i32,
    },
    TechTokensCleared {
        player: PlayerId,
        count: u32,
    },
    ProductionSet {
        territory: TerritoryId,
        old: u32,
        new: u32,
    },
}
