//! Relationship tracking between players.

use std::collections::HashMap;

use ironfront_protocol::{PlayerId, RelationshipKind};

/// Symmetric relationship matrix. Pairs default to `Neutral`; alliances are
/// fixed at setup, war comes and goes.
#[derive(Clone, Debug, Default)]
pub struct Relationships {
    kinds: HashMap<(PlayerId, PlayerId), RelationshipKind>,
}

fn key(a: PlayerId, b: PlayerId) -> (PlayerId, PlayerId) {
    if a.0 <= b.0 {
        (a, b)
    } else {
        (b, a)
    }
}

impl Relationships {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(&self, a: PlayerId, b: PlayerId) -> RelationshipKind {
        if a == b {
            return RelationshipKind::Allied;
        }
        self.kinds
            .get(&key(a, b))
            .copied()
            .unwrap_or(RelationshipKind::Neutral)
    }

    pub fn are_allied(&self, a: PlayerId, b: PlayerId) -> bool {
        self.kind(a, b) == RelationshipKind::Allied
    }

    pub fn is_at_war(&self, a: PlayerId, b: PlayerId) -> bool {
        self.kind(a, b) == RelationshipKind::War
    }

    pub fn set_allied(&mut self, a: PlayerId, b: PlayerId) {
        if a != b {
            self.kinds.insert(key(a, b), RelationshipKind::Allied);
        }
    }

    /// Declare war (returns true if the pair was not already at war).
    /// Allies cannot be declared on; the alliance must break first.
    pub fn declare_war(&mut self, a: PlayerId, b: PlayerId) -> bool {
        if a == b || self.are_allied(a, b) || self.is_at_war(a, b) {
            return false;
        }
        self.kinds.insert(key(a, b), RelationshipKind::War);
        true
    }

    /// End a war, reverting the pair to neutral (returns true if a war
    /// existed).
    pub fn make_peace(&mut self, a: PlayerId, b: PlayerId) -> bool {
        if self.is_at_war(a, b) {
            self.kinds.insert(key(a, b), RelationshipKind::Neutral);
            true
        } else {
            false
        }
    }

    pub fn enemies_of(&self, player: PlayerId) -> Vec<PlayerId> {
        let mut out: Vec<PlayerId> = self
            .kinds
            .iter()
            .filter_map(|(&(a, b), &kind)| {
                if kind != RelationshipKind::War {
                    return None;
                }
                if a == player {
                    Some(b)
                } else if b == player {
                    Some(a)
                } else {
                    None
                }
            })
            .collect();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn war_declaration_and_peace() {
        let mut rel = Relationships::new();
        let p1 = PlayerId(0);
        let p2 = PlayerId(1);
        let p3 = PlayerId(2);

        assert!(!rel.is_at_war(p1, p2));
        assert!(rel.declare_war(p1, p2));
        assert!(rel.is_at_war(p1, p2));
        assert!(rel.is_at_war(p2, p1)); // symmetric
        assert!(!rel.is_at_war(p1, p3));

        // Declaring twice is a no-op.
        assert!(!rel.declare_war(p2, p1));
        assert_eq!(rel.enemies_of(p1), vec![p2]);

        assert!(rel.make_peace(p1, p2));
        assert!(!rel.is_at_war(p1, p2));
        assert_eq!(rel.kind(p1, p2), RelationshipKind::Neutral);
    }

    #[test]
    fn allies_cannot_declare_war_on_each_other() {
        let mut rel = Relationships::new();
        let p1 = PlayerId(0);
        let p2 = PlayerId(1);
        rel.set_allied(p1, p2);
        assert!(rel.are_allied(p1, p2));
        assert!(!rel.declare_war(p1, p2));
        assert!(rel.are_allied(p1, p2));
    }

    #[test]
    fn a_player_is_allied_with_itself() {
        let rel = Relationships::new();
        assert!(rel.are_allied(PlayerId(3), PlayerId(3)));
    }
}
