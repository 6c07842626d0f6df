//! Shared ids and value types for the Ironfront rules engine.
//!
//! Everything here crosses a boundary: into the rules core, out to a UI or
//! AI layer, or into the recorded turn history. Rule semantics live in
//! `ironfront-core`; this crate stays declaration-only.

mod change;
mod chronicle;
mod ids;
mod types;

pub use crate::change::*;
pub use crate::chronicle::*;
pub use crate::ids::*;
pub use crate::types::*;
