use serde::{Deserialize, Serialize};

use crate::{BattleKind, PlayerId, TerritoryId};

/// A permanent, replayable history entry for the turn log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChronicleEntry {
    pub id: u64,
    pub round: u32,
    pub event: ChronicleEvent,
}

impl ChronicleEntry {
    /// One JSON line per entry, for export to external history viewers.
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChronicleEvent {
    // Conquest events
    TerritoryConquered {
        territory: TerritoryId,
        by: PlayerId,
        from: Option<PlayerId>,
        blitz: bool,
    },
    TerritoryLiberated {
        territory: TerritoryId,
        by: PlayerId,
        returned_to: PlayerId,
    },
    SeaZoneTaken {
        territory: TerritoryId,
        by: PlayerId,
    },
    CapitalCaptured {
        capital: TerritoryId,
        old_owner: PlayerId,
        new_owner: PlayerId,
        treasury_seized: i64,
    },

    // Battle events
    BattleFought {
        territory: TerritoryId,
        kind: BattleKind,
        attacker: PlayerId,
        winner: Option<PlayerId>,
    },
    BombingDamage {
        territory: TerritoryId,
        by: PlayerId,
        damage: u32,
    },

    // Economy events
    ConvoyDisrupted {
        convoy: TerritoryId,
        owner: PlayerId,
        loss: i64,
    },
    NeutralityViolated {
        player: PlayerId,
        territory: TerritoryId,
        fee: i64,
    },

    // Capture side effects
    UnitsCaptured {
        territory: TerritoryId,
        by: PlayerId,
        count: u32,
    },
    UnitsDestroyedOnCapture {
        territory: TerritoryId,
        count: u32,
    },

    // Diplomacy events
    WarDeclared {
        aggressor: PlayerId,
        target: PlayerId,
    },
    PeaceDeclared {
        a: PlayerId,
        b: PlayerId,
    },
}
