mod loader;
mod types;

pub use loader::{load_setup, CompiledSetup, PlayerSetup, RulesError, RulesSource};
pub use types::*;
