use thiserror::Error;

/// Fatal engine errors. Player-input problems never surface here; they
/// come back as `MoveValidationResult` data. Anything below indicates a
/// driver bug or structurally inconsistent state.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown battle")]
    UnknownBattle,
    #[error("unknown unit")]
    UnknownUnit,
    #[error("battle is blocked by {0} prerequisite battle(s)")]
    BattleBlocked(usize),
    #[error("inconsistent internal state: {0}")]
    Inconsistent(String),
}
