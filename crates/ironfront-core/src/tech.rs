use std::collections::BTreeSet;

use ironfront_protocol::TechId;

use crate::rules::{CompiledRules, TechEffect};

/// Per-player technology tracking: researched techs plus tokens banked
/// toward the next breakthrough. Tokens are forfeited when the player's
/// last capital falls.
#[derive(Clone, Debug, Default)]
pub struct TechState {
    researched: BTreeSet<TechId>,
    tokens: u32,
}

impl TechState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, tech: TechId) {
        self.researched.insert(tech);
    }

    pub fn knows(&self, tech: TechId) -> bool {
        self.researched.contains(&tech)
    }

    pub fn has(&self, rules: &CompiledRules, effect: TechEffect) -> bool {
        self.researched
            .iter()
            .any(|&id| rules.tech(id).effect == effect)
    }

    pub fn tokens(&self) -> u32 {
        self.tokens
    }

    pub fn add_tokens(&mut self, count: u32) {
        self.tokens += count;
    }

    /// Strip banked tokens, returning how many were lost.
    pub fn forfeit_tokens(&mut self) -> u32 {
        std::mem::take(&mut self.tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{load_setup, RulesSource};

    #[test]
    fn researched_effects_are_visible_and_tokens_forfeit() {
        let setup = load_setup(RulesSource::Embedded).expect("rules load");
        let rules = &setup.rules;
        let jets = rules.tech_id("jet_fighters").expect("base tech");

        let mut tech = TechState::new();
        assert!(!tech.has(rules, TechEffect::JetFighters));
        tech.grant(jets);
        assert!(tech.knows(jets));
        assert!(tech.has(rules, TechEffect::JetFighters));

        tech.add_tokens(3);
        assert_eq!(tech.forfeit_tokens(), 3);
        assert_eq!(tech.tokens(), 0);
    }
}
