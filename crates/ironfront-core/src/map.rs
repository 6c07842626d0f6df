use std::collections::HashMap;

use ironfront_protocol::{DataId, TerritoryId};

use crate::rules::TerritoryRules;

/// A territory-pair link that certain unit moves may only cross while the
/// controlling land territories are held.
#[derive(Clone, Debug)]
pub struct Canal {
    pub name: String,
    /// The two sea zones the canal joins.
    pub between: (TerritoryId, TerritoryId),
    /// Land territories that must all be controlled to pass.
    pub controlled_by: Vec<TerritoryId>,
}

/// The static territory graph: per-territory rules plus adjacency and
/// canal links. Ownership and unit positions live in `GameState`.
#[derive(Clone, Debug)]
pub struct TerritoryMap {
    names: Vec<String>,
    rules: Vec<TerritoryRules>,
    adjacency: Vec<Vec<TerritoryId>>,
    canals: Vec<Canal>,
    ids: HashMap<DataId, TerritoryId>,
}

impl TerritoryMap {
    pub fn build(
        names: Vec<String>,
        rules: Vec<TerritoryRules>,
        connections: Vec<(TerritoryId, TerritoryId)>,
        canals: Vec<Canal>,
        ids: HashMap<DataId, TerritoryId>,
    ) -> Self {
        let mut adjacency = vec![Vec::new(); names.len()];
        for (a, b) in connections {
            let (ai, bi) = (a.raw as usize, b.raw as usize);
            if !adjacency[ai].contains(&b) {
                adjacency[ai].push(b);
            }
            if !adjacency[bi].contains(&a) {
                adjacency[bi].push(a);
            }
        }
        for neighbors in &mut adjacency {
            neighbors.sort();
        }
        Self {
            names,
            rules,
            adjacency,
            canals,
            ids,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, id: TerritoryId) -> &str {
        &self.names[id.raw as usize]
    }

    pub fn rules(&self, id: TerritoryId) -> &TerritoryRules {
        &self.rules[id.raw as usize]
    }

    pub fn rules_mut(&mut self, id: TerritoryId) -> &mut TerritoryRules {
        &mut self.rules[id.raw as usize]
    }

    pub fn id(&self, name: &str) -> Option<TerritoryId> {
        self.ids.get(name).copied()
    }

    pub fn territory_ids(&self) -> impl Iterator<Item = TerritoryId> + '_ {
        (0..self.names.len()).map(|i| TerritoryId::new(i as u16))
    }

    pub fn neighbors(&self, id: TerritoryId) -> &[TerritoryId] {
        &self.adjacency[id.raw as usize]
    }

    pub fn are_adjacent(&self, a: TerritoryId, b: TerritoryId) -> bool {
        self.adjacency[a.raw as usize].contains(&b)
    }

    pub fn is_water(&self, id: TerritoryId) -> bool {
        self.rules(id).water
    }

    /// Canals whose two ends are exactly this territory pair.
    pub fn canals_between(&self, a: TerritoryId, b: TerritoryId) -> Vec<&Canal> {
        self.canals
            .iter()
            .filter(|c| c.between == (a, b) || c.between == (b, a))
            .collect()
    }

    /// Convoy zones feeding the given land territory.
    pub fn convoys_feeding(&self, land: TerritoryId) -> Vec<TerritoryId> {
        self.territory_ids()
            .filter(|&t| self.rules(t).convoy_to.contains(&land))
            .collect()
    }
}

/// A unit group's proposed path: the origin territory followed by each
/// territory entered, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    territories: Vec<TerritoryId>,
}

impl Route {
    pub fn new(territories: Vec<TerritoryId>) -> Self {
        debug_assert!(!territories.is_empty());
        Self { territories }
    }

    pub fn start(&self) -> TerritoryId {
        self.territories[0]
    }

    pub fn end(&self) -> TerritoryId {
        *self.territories.last().expect("route is never empty")
    }

    /// Territories entered (everything but the origin).
    pub fn steps(&self) -> &[TerritoryId] {
        &self.territories[1..]
    }

    /// Territories passed through, excluding origin and destination.
    pub fn middle(&self) -> &[TerritoryId] {
        let n = self.territories.len();
        if n <= 2 {
            &[]
        } else {
            &self.territories[1..n - 1]
        }
    }

    pub fn all(&self) -> &[TerritoryId] {
        &self.territories
    }

    /// Number of territories entered.
    pub fn distance(&self) -> u32 {
        (self.territories.len() - 1) as u32
    }

    pub fn contains(&self, t: TerritoryId) -> bool {
        self.territories.contains(&t)
    }

    /// Every hop exists in the map's adjacency and no territory repeats.
    pub fn is_valid(&self, map: &TerritoryMap) -> bool {
        for pair in self.territories.windows(2) {
            if !map.are_adjacent(pair[0], pair[1]) {
                return false;
            }
        }
        let mut seen = self.territories.clone();
        seen.sort();
        seen.dedup();
        seen.len() == self.territories.len()
    }

    pub fn crosses_water(&self, map: &TerritoryMap) -> bool {
        self.territories.iter().any(|&t| map.is_water(t))
    }

    pub fn is_unload(&self, map: &TerritoryMap) -> bool {
        self.distance() >= 1 && map.is_water(self.start()) && !map.is_water(self.end())
    }

    pub fn is_load(&self, map: &TerritoryMap) -> bool {
        self.distance() >= 1 && !map.is_water(self.start()) && map.is_water(self.end())
    }

    /// The prefix of this route ending at `t`.
    pub fn up_to(&self, t: TerritoryId) -> Option<Route> {
        let pos = self.territories.iter().position(|&x| x == t)?;
        Some(Route::new(self.territories[..=pos].to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn tiny_map() -> TerritoryMap {
        // a - b - c, all land
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let rules = (0..3)
            .map(|_| TerritoryRules {
                water: false,
                production: 0,
                unit_production: 0,
                capital_of: None,
                original_owner: None,
                impassable: false,
                convoy_to: Vec::new(),
                capture_goes_to: BTreeMap::new(),
            })
            .collect();
        let ids = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), TerritoryId::new(i as u16)))
            .collect();
        TerritoryMap::build(
            names,
            rules,
            vec![
                (TerritoryId::new(0), TerritoryId::new(1)),
                (TerritoryId::new(1), TerritoryId::new(2)),
            ],
            Vec::new(),
            ids,
        )
    }

    #[test]
    fn adjacency_is_symmetric() {
        let map = tiny_map();
        let (a, b) = (TerritoryId::new(0), TerritoryId::new(1));
        assert!(map.are_adjacent(a, b));
        assert!(map.are_adjacent(b, a));
        assert!(!map.are_adjacent(a, TerritoryId::new(2)));
    }

    #[test]
    fn route_segments() {
        let map = tiny_map();
        let route = Route::new(vec![
            TerritoryId::new(0),
            TerritoryId::new(1),
            TerritoryId::new(2),
        ]);
        assert!(route.is_valid(&map));
        assert_eq!(route.distance(), 2);
        assert_eq!(route.middle(), &[TerritoryId::new(1)]);
        assert_eq!(route.steps().len(), 2);
    }

    #[test]
    fn disconnected_or_repeating_routes_are_invalid() {
        let map = tiny_map();
        let skip = Route::new(vec![TerritoryId::new(0), TerritoryId::new(2)]);
        assert!(!skip.is_valid(&map));

        let backtrack = Route::new(vec![
            TerritoryId::new(0),
            TerritoryId::new(1),
            TerritoryId::new(0),
        ]);
        assert!(!backtrack.is_valid(&map));
    }
}
