use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::grid::GridPos;

/// Unique identifier for every actor in an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    /// Generate a new random actor ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Disposition of an actor towards the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// The player character.
    Player,
    /// A monster that fights the player.
    Hostile,
    /// A harmless creature (livestock and the like).
    Passive,
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "player"),
            Self::Hostile => write!(f, "hostile"),
            Self::Passive => write!(f, "passive"),
        }
    }
}

/// A live creature in the arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    /// Unique identifier for this actor.
    pub id: ActorId,
    /// Display name.
    pub name: String,
    /// Player, hostile, or passive.
    pub kind: ActorKind,
    /// Current block position.
    pub position: GridPos,
    /// Current hit points.
    pub hp: u32,
    /// Maximum hit points.
    pub max_hp: u32,
    /// Base melee damage.
    pub attack: u32,
    /// Turn-order key; higher acts earlier.
    pub speed: i32,
    /// Set when the host has despawned the actor.
    pub removed: bool,
}

impl Actor {
    /// Create an actor at full health.
    pub fn new(kind: ActorKind, name: impl Into<String>, position: GridPos, max_hp: u32) -> Self {
        Self {
            id: ActorId::new(),
            name: name.into(),
            kind,
            position,
            hp: max_hp,
            max_hp,
            attack: 1,
            speed: 10,
            removed: false,
        }
    }

    /// Set the base melee damage.
    pub fn with_attack(mut self, attack: u32) -> Self {
        self.attack = attack;
        self
    }

    /// Set the turn-order speed.
    pub fn with_speed(mut self, speed: i32) -> Self {
        self.speed = speed;
        self
    }

    /// True while the actor is present and has hit points left.
    pub fn is_alive(&self) -> bool {
        !self.removed && self.hp > 0
    }

    /// Subtract `amount` hit points, saturating at zero. Returns the new HP.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        self.hp = self.hp.saturating_sub(amount);
        self.hp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_id_display_shows_short_form() {
        let id = ActorId(Uuid::parse_str("a3f2b1c8-1234-5678-9abc-def012345678").unwrap());
        assert_eq!(id.to_string(), "a3f2b1c8");
    }

    #[test]
    fn damage_saturates_at_zero() {
        let mut rat = Actor::new(ActorKind::Hostile, "Rat", GridPos::default(), 5);
        assert_eq!(rat.take_damage(3), 2);
        assert!(rat.is_alive());
        assert_eq!(rat.take_damage(10), 0);
        assert!(!rat.is_alive());
    }

    #[test]
    fn removed_actor_is_not_alive() {
        let mut orc = Actor::new(ActorKind::Hostile, "Orc", GridPos::default(), 12);
        orc.removed = true;
        assert!(!orc.is_alive());
    }

    #[test]
    fn builder_sets_stats() {
        let goblin = Actor::new(ActorKind::Hostile, "Goblin", GridPos::default(), 8)
            .with_attack(3)
            .with_speed(12);
        assert_eq!(goblin.attack, 3);
        assert_eq!(goblin.speed, 12);
        assert_eq!(goblin.hp, 8);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ActorKind::Hostile).unwrap();
        assert_eq!(json, "\"hostile\"");
    }
}
