use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the combat state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatState {
    /// Not in combat; the world runs in real time.
    #[default]
    Exploration,
    /// The player may move, attack, or change target.
    PlayerTurn,
    /// An enemy is acting; its turn ends on a scheduled tick.
    EnemyTurn,
    /// Cleanup between the end of an encounter and exploration.
    Ending,
}

impl CombatState {
    /// True for every state except [`CombatState::Exploration`].
    pub fn is_in_combat(self) -> bool {
        self != Self::Exploration
    }
}

impl fmt::Display for CombatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exploration => write!(f, "exploration"),
            Self::PlayerTurn => write!(f, "player turn"),
            Self::EnemyTurn => write!(f, "enemy turn"),
            Self::Ending => write!(f, "ending"),
        }
    }
}
