use serde::{Deserialize, Serialize};
use sk_core::{ActorId, GridPos};

use crate::host::Battlefield;

/// Action points granted at the start of each turn.
const ACTION_POINTS_PER_TURN: u32 = 1;

/// A roster member: one actor plus its turn bookkeeping.
///
/// Hit points and position live in the host world and are read through
/// [`Battlefield`]; only turn state is kept here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    actor: ActorId,
    is_player: bool,
    speed: i32,
    action_points: u32,
    has_acted: bool,
}

impl Combatant {
    /// Wrap an actor. `speed` is captured once, at encounter start.
    pub fn new(actor: ActorId, is_player: bool, speed: i32) -> Self {
        Self {
            actor,
            is_player,
            speed,
            action_points: 0,
            has_acted: false,
        }
    }

    /// The wrapped actor.
    pub fn actor(&self) -> ActorId {
        self.actor
    }

    /// Whether this is the player.
    pub fn is_player(&self) -> bool {
        self.is_player
    }

    /// Speed snapshot used for turn order.
    pub fn speed(&self) -> i32 {
        self.speed
    }

    /// Remaining action points this turn.
    pub fn action_points(&self) -> u32 {
        self.action_points
    }

    /// Whether the combatant has finished its current turn.
    pub fn has_acted(&self) -> bool {
        self.has_acted
    }

    /// Grant action points and clear the acted flag.
    pub fn start_turn(&mut self) {
        self.action_points = ACTION_POINTS_PER_TURN;
        self.has_acted = false;
    }

    /// Spend all action points and mark the turn done.
    pub fn end_turn(&mut self) {
        self.action_points = 0;
        self.has_acted = true;
    }

    /// Current HP as the host reports it.
    pub fn current_hp(&self, world: &dyn Battlefield) -> u32 {
        world.current_hp(self.actor)
    }

    /// Maximum HP as the host reports it.
    pub fn max_hp(&self, world: &dyn Battlefield) -> u32 {
        world.max_hp(self.actor)
    }

    /// Alive iff the host reports the actor alive and it has HP left.
    pub fn is_alive(&self, world: &dyn Battlefield) -> bool {
        world.reports_alive(self.actor) && self.current_hp(world) > 0
    }

    /// Current position in the host world.
    pub fn position(&self, world: &dyn Battlefield) -> Option<GridPos> {
        world.position(self.actor)
    }

    /// Display name from the host world.
    pub fn name(&self, world: &dyn Battlefield) -> String {
        world.name(self.actor)
    }
}
