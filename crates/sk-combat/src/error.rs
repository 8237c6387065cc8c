//! Error types for the combat engine.

use sk_core::{ActorId, CoreError, GridPos};

use crate::state::CombatState;

/// Convenience result type for combat operations.
pub type CombatResult<T> = Result<T, CombatError>;

/// Reasons a combat command or scheduled action was rejected.
///
/// A rejected call never mutates the session.
#[derive(Debug, thiserror::Error)]
pub enum CombatError {
    /// `start` was called while an encounter is running.
    #[error("already in combat")]
    AlreadyInCombat,

    /// A combat-only operation was called outside combat.
    #[error("not in combat")]
    NotInCombat,

    /// `start` was called without any living enemy.
    #[error("no living enemies to fight")]
    NoEnemies,

    /// A player command was issued outside the player's turn.
    #[error("not the player's turn (state: {state})")]
    NotPlayerTurn {
        /// The state the session was in.
        state: CombatState,
    },

    /// The requested cell is not one of this turn's valid moves.
    #[error("invalid move to {0}")]
    InvalidMove(GridPos),

    /// No living enemy could be resolved as the attack target.
    #[error("no target selected")]
    NoTarget,

    /// The actor is not known to the host world.
    #[error("unknown actor: {0}")]
    UnknownActor(ActorId),

    /// The actor is not a living enemy in the current roster.
    #[error("{0} is not a valid target")]
    NotATarget(ActorId),

    /// A scheduled action fired after its turn or encounter had ended.
    #[error("stale scheduled action for encounter {scheduled} (current: {current})")]
    StaleTask {
        /// Encounter the action was scheduled in.
        scheduled: u64,
        /// Encounter running when it fired.
        current: u64,
    },

    /// The host world rejected a write.
    #[error("host error: {0}")]
    Host(#[from] CoreError),
}
