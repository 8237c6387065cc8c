//! Turn-based grid combat engine for Skirmish.
//!
//! Suspends the live world, puts the player and a set of enemies into a
//! fixed turn order, validates single-step grid movement, resolves
//! attacks, and drives enemy decisions. Enemy turns are paced through a
//! tick-driven [`TurnScheduler`] so their effects stay visible before the
//! next turn begins.
//!
//! The host world is reached only through the traits in [`host`]; the
//! engine owns no global state. Call [`CombatManager::tick`] once per host
//! simulation step and the command methods from the input layer.

/// Enemy decision engine: attack when adjacent, otherwise step closer.
pub mod ai;
/// Turn bookkeeping wrapper around a roster member.
pub mod combatant;
/// Tunable combat constants.
pub mod config;
/// Damage formulas and the injected variance source.
pub mod damage;
/// Enemy detection and the post-combat re-trigger cooldown.
pub mod detection;
/// Error types for the combat crate.
pub mod error;
/// Suspension of actors outside the encounter.
pub mod freeze;
/// Collaborator contracts the engine calls into.
pub mod host;
/// Bounded, newest-first combat message log.
pub mod log;
/// The combat state machine and orchestrator.
pub mod manager;
/// Delayed task queue ticked once per host step.
pub mod scheduler;
/// Serializable read-only views of a session.
pub mod snapshot;
/// The combat state enum.
pub mod state;

/// Re-exports of the decision engine result types.
pub use ai::{EnemyAction, EnemyDecision, EnemyTurn};
/// Re-export of [`combatant::Combatant`].
pub use combatant::Combatant;
/// Re-export of [`config::CombatConfig`].
pub use config::CombatConfig;
/// Re-exports of the variance sources.
pub use damage::{FixedVariance, VarianceRoll};
/// Re-export of [`detection::CombatDetection`].
pub use detection::CombatDetection;
/// Re-exports of [`error::CombatError`] and [`error::CombatResult`].
pub use error::{CombatError, CombatResult};
/// Re-export of [`freeze::WorldFreezer`].
pub use freeze::WorldFreezer;
/// Re-exports of the collaborator contracts.
pub use host::{
    Battlefield, CharacterSource, CombatContext, CombatCooldown, Equipment, Progression, Stat,
    WorldFreeze,
};
/// Re-export of [`log::CombatLog`].
pub use log::CombatLog;
/// Re-exports of the manager and its result types.
pub use manager::{AttackOutcome, CombatManager, CombatOutcome, EncounterSummary};
/// Re-exports of the scheduler types.
pub use scheduler::{TickReport, TurnScheduler};
/// Re-exports of the snapshot types.
pub use snapshot::{CombatSnapshot, CombatantView};
/// Re-export of [`state::CombatState`].
pub use state::CombatState;
