//! Host world model for Skirmish: actors, grid positions, arena terrain,
//! and character sheets.
//!
//! This crate is the "live world" the combat engine reads from and writes
//! back to. It knows nothing about turns or combat state; you can build an
//! [`Arena`] programmatically or parse one from a text layout.

/// Actor identities and the actor record.
pub mod actor;
/// The arena: terrain solidity plus the actor store.
pub mod arena;
/// Character sheets, skills, weapons, and the per-player sheet store.
pub mod character;
/// Error types used throughout the crate.
pub mod error;
/// Integer grid positions and neighbor enumeration.
pub mod grid;

/// Re-export actor types.
pub use actor::{Actor, ActorId, ActorKind};
/// Re-export arena types.
pub use arena::Arena;
/// Re-export character types.
pub use character::{CharacterSheet, CharacterStore, Skill, Weapon, WeaponKind};
/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export grid types.
pub use grid::GridPos;
