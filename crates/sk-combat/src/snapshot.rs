use serde::{Deserialize, Serialize};
use sk_core::{ActorId, GridPos};

use crate::combatant::Combatant;
use crate::host::Battlefield;
use crate::manager::EncounterSummary;
use crate::state::CombatState;

/// One roster member as seen by a UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantView {
    /// The actor's identity.
    pub actor: ActorId,
    /// Display name.
    pub name: String,
    /// Whether this is the player.
    pub is_player: bool,
    /// Speed used for turn order.
    pub speed: i32,
    /// Current hit points.
    pub hp: u32,
    /// Maximum hit points.
    pub max_hp: u32,
    /// Whether the combatant is alive.
    pub alive: bool,
    /// Current position, if the actor still exists.
    pub position: Option<GridPos>,
    /// Whether it has finished its turn this round.
    pub has_acted: bool,
}

impl CombatantView {
    /// Read a combatant's live values from the world.
    pub fn of(combatant: &Combatant, world: &dyn Battlefield) -> Self {
        let actor = combatant.actor();
        Self {
            actor,
            name: world.name(actor),
            is_player: combatant.is_player(),
            speed: combatant.speed(),
            hp: combatant.current_hp(world),
            max_hp: combatant.max_hp(world),
            alive: combatant.is_alive(world),
            position: world.position(actor),
            has_acted: combatant.has_acted(),
        }
    }
}

/// A serializable, read-only view of a combat session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatSnapshot {
    /// Number of the current or most recent encounter.
    pub encounter: u64,
    /// Current state.
    pub state: CombatState,
    /// Completed rounds in the current encounter.
    pub round: u32,
    /// The combatant whose turn it is.
    pub current: Option<ActorId>,
    /// The roster in turn order.
    pub roster: Vec<CombatantView>,
    /// Cells the player may step to.
    pub valid_moves: Vec<GridPos>,
    /// The target an attack would hit.
    pub selected_target: Option<ActorId>,
    /// Anchor of the tactical grid.
    pub grid_center: Option<GridPos>,
    /// Combat log, newest first.
    pub log: Vec<String>,
    /// How the last finished encounter ended.
    pub last_encounter: Option<EncounterSummary>,
}

impl CombatSnapshot {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
