use ironfront_protocol::{Change, ChronicleEvent, PlayerId, TerritoryId, UnitId};
use tracing::info;

use crate::state::GameState;

/// Ownership transfer after the attacker wins a territory. Runs the full
/// consequence chain: naval-control check, convoy economy, neutrality fee,
/// capital fall, liberation rerouting, the ownership change itself, and
/// the fate of leftover units.
///
/// Returns false when the transfer is vetoed (sea zone without real naval
/// control).
pub fn take_territory(
    state: &mut GameState,
    territory: TerritoryId,
    player: PlayerId,
    blitz: bool,
) -> bool {
    let is_water = state.map.is_water(territory);

    // 1. A sea zone only changes hands if the attacker keeps real warships
    //    there; transports and evaders alone may not count.
    if is_water {
        if !holds_sea_zone(state, territory, player) {
            return false;
        }
        disrupt_convoys(state, territory, player);
        state.record(ChronicleEvent::SeaZoneTaken {
            territory,
            by: player,
        });
        return true;
    }

    let old_owner = state.owner(territory);

    // 2. Convoy zones feeding this territory stop paying its old owner.
    //    (Narration only here; the sea-zone side handles the deduction.)

    // 3. Marching into unowned neutral ground costs political capital.
    if old_owner.is_none() {
        charge_neutrality_fee(state, territory, player);
    }

    // 4. Capitals: treasury and research tokens fall with the city.
    if let Some(owner) = old_owner {
        if state.map.rules(territory).capital_of == Some(owner)
            && state.relationships.is_at_war(owner, player)
        {
            capture_capital(state, territory, owner, player);
        }
    }

    // 5. Decide the receiving player: explicit transfer table first, then
    //    liberation of an ally's original territory.
    let rules = state.map.rules(territory);
    let original = rules.original_owner;
    let new_owner = if let Some(&receiver) = rules.capture_goes_to.get(&player) {
        receiver
    } else if let Some(orig) = original {
        let liberating = orig != player
            && state.relationships.are_allied(orig, player)
            && state.controls_a_capital(orig);
        if liberating {
            orig
        } else {
            player
        }
    } else {
        player
    };

    // 6. The ownership change itself, with the appropriate narration.
    state.apply(Change::TerritoryOwner {
        territory,
        old: old_owner,
        new: Some(new_owner),
    });
    if new_owner != player {
        state.record(ChronicleEvent::TerritoryLiberated {
            territory,
            by: player,
            returned_to: new_owner,
        });
    } else {
        state.record(ChronicleEvent::TerritoryConquered {
            territory,
            by: player,
            from: old_owner,
            blitz,
        });
    }
    info!(
        territory = state.map.name(territory),
        by = state.player(player).name.as_str(),
        "territory captured"
    );

    // 7. Surviving enemy units: destroy, capture, or convert.
    resolve_leftover_units(state, territory, player, new_owner);

    true
}

/// Do the attacker's remaining units amount to naval control? Ruleset
/// flags decide whether transports or evaders count on their own.
fn holds_sea_zone(state: &GameState, territory: TerritoryId, player: PlayerId) -> bool {
    let props = &state.rules.properties;
    state.units_in(territory).into_iter().any(|id| {
        let unit = state.units.get(id).expect("listed unit exists");
        if !state.relationships.are_allied(unit.owner, player) {
            return false;
        }
        let rules = state.rules.unit_type(unit.type_id);
        if !rules.is_sea() {
            return false;
        }
        if rules.is_sea_transport() && !props.transports_hold_sea {
            return false;
        }
        if rules.can_evade && !props.subs_hold_sea {
            return false;
        }
        true
    })
}

/// Losing a convoy zone cuts income for whoever draws from it.
fn disrupt_convoys(state: &mut GameState, convoy: TerritoryId, player: PlayerId) {
    let fed: Vec<TerritoryId> = state.map.rules(convoy).convoy_to.clone();
    let loss = state.map.rules(convoy).production as i64;
    if loss == 0 {
        return;
    }
    let Some(resource) = state.rules.primary_resource() else {
        return;
    };
    for land in fed {
        let Some(owner) = state.owner(land) else {
            continue;
        };
        if !state.relationships.is_at_war(owner, player) {
            continue;
        }
        let available = state.resource(owner, resource).max(0).min(loss);
        if available > 0 {
            state.apply(Change::ResourceDelta {
                player: owner,
                resource,
                delta: -available,
            });
        }
        state.record(ChronicleEvent::ConvoyDisrupted {
            convoy,
            owner,
            loss: available,
        });
    }
}

fn charge_neutrality_fee(state: &mut GameState, territory: TerritoryId, player: PlayerId) {
    let fee = state.rules.properties.neutral_fee;
    if fee <= 0 {
        return;
    }
    let Some(resource) = state.rules.primary_resource() else {
        return;
    };
    state.apply(Change::ResourceDelta {
        player,
        resource,
        delta: -fee,
    });
    state.record(ChronicleEvent::NeutralityViolated {
        player,
        territory,
        fee,
    });
}

/// The defeated player's treasury transfers (or burns) and their research
/// tokens are stripped, unless another capital still stands.
fn capture_capital(
    state: &mut GameState,
    capital: TerritoryId,
    old_owner: PlayerId,
    player: PlayerId,
) {
    let retains_another = state
        .capitals_of(old_owner)
        .into_iter()
        .any(|t| t != capital && state.owner(t) == Some(old_owner));
    if retains_another {
        return;
    }

    let mut seized = 0_i64;
    let resources: Vec<_> = state
        .player(old_owner)
        .resources
        .iter()
        .map(|(&r, &amount)| (r, amount))
        .collect();
    for (resource, amount) in resources {
        if amount <= 0 {
            continue;
        }
        state.apply(Change::ResourceDelta {
            player: old_owner,
            resource,
            delta: -amount,
        });
        if !state.rules.properties.capture_destroys_treasury {
            state.apply(Change::ResourceDelta {
                player,
                resource,
                delta: amount,
            });
            seized += amount;
        }
    }

    let tokens = state.player(old_owner).tech.tokens();
    if tokens > 0 {
        state.apply(Change::TechTokensCleared {
            player: old_owner,
            count: tokens,
        });
    }

    state.record(ChronicleEvent::CapitalCaptured {
        capital,
        old_owner,
        new_owner: player,
        treasury_seized: seized,
    });
}

/// Enemy units left standing after the fight: destroy the ones flagged to
/// die, convert the ones with a replacement, capture the rest that cannot
/// resist, and apply capture damage.
fn resolve_leftover_units(
    state: &mut GameState,
    territory: TerritoryId,
    player: PlayerId,
    new_owner: PlayerId,
) {
    let leftovers: Vec<UnitId> = state.enemy_units_in(territory, player);
    let mut destroyed = 0_u32;
    let mut captured = 0_u32;

    for unit_id in leftovers {
        let Some(unit) = state.units.get(unit_id) else {
            continue;
        };
        let old_owner = unit.owner;
        let type_id = unit.type_id;
        let rules = state.rules.unit_type(type_id).clone();

        if rules.destroy_on_capture {
            state.apply(Change::UnitsRemoved {
                units: vec![unit_id],
                territory,
            });
            destroyed += 1;
            continue;
        }

        if let Some(replacement) = rules.capture_changes_into {
            state.apply(Change::UnitTransformed {
                unit: unit_id,
                old_type: type_id,
                new_type: replacement,
            });
            state.apply(Change::UnitOwner {
                unit: unit_id,
                old: old_owner,
                new: new_owner,
            });
            captured += 1;
            continue;
        }

        let capturable = rules.is_infrastructure || rules.defense == 0;
        if !capturable {
            state.apply(Change::UnitsRemoved {
                units: vec![unit_id],
                territory,
            });
            destroyed += 1;
            continue;
        }

        state.apply(Change::UnitOwner {
            unit: unit_id,
            old: old_owner,
            new: new_owner,
        });
        captured += 1;

        if let Some(damage) = rules.capture_damage {
            state.apply(Change::UnitDamaged {
                unit: unit_id,
                delta: damage as i32,
            });
            let now = state.units.get(unit_id).expect("just updated").damage;
            let ceiling = rules.max_damage.unwrap_or(u32::MAX);
            if rules.destroyed_at_max_damage && now >= ceiling {
                state.apply(Change::UnitsRemoved {
                    units: vec![unit_id],
                    territory,
                });
                captured -= 1;
                destroyed += 1;
            }
        }
    }

    if captured > 0 {
        state.record(ChronicleEvent::UnitsCaptured {
            territory,
            by: new_owner,
            count: captured,
        });
    }
    if destroyed > 0 {
        state.record(ChronicleEvent::UnitsDestroyedOnCapture {
            territory,
            count: destroyed,
        });
    }
}
