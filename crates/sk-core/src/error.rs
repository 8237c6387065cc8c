use crate::actor::ActorId;

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur when building or manipulating an arena.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The requested actor does not exist in the arena.
    #[error("actor not found: {0}")]
    ActorNotFound(ActorId),

    /// A layout contained a character that is neither terrain nor a known monster.
    #[error("unknown glyph '{glyph}' at line {line}, column {column}")]
    UnknownGlyph {
        /// The offending character.
        glyph: char,
        /// 1-based line number.
        line: usize,
        /// 1-based column number.
        column: usize,
    },

    /// A layout did not place a player.
    #[error("layout has no player ('@')")]
    MissingPlayer,

    /// A layout placed more than one player.
    #[error("layout places more than one player")]
    DuplicatePlayer,

    /// Two actors were placed on the same cell.
    #[error("cell {0} is already occupied")]
    Occupied(crate::grid::GridPos),
}
