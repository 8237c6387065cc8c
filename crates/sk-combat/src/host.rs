//! Contracts between the combat engine and the world it runs in.
//!
//! The engine never reaches for global state. Each command receives a
//! [`CombatContext`] that borrows the host's collaborators for the
//! duration of the call. [`Battlefield`] is implemented for
//! [`sk_core::Arena`] and [`Equipment`]/[`Progression`] for
//! [`sk_core::CharacterStore`]; tests may supply their own.

use std::collections::HashSet;

use sk_core::{ActorId, ActorKind, Arena, CharacterStore, GridPos, Skill, Weapon};

use crate::error::CombatResult;

/// Read and write access to terrain and actors.
///
/// Reads on an unknown actor return neutral values (no position, zero HP,
/// not alive) so a despawned actor simply drops out of play.
pub trait Battlefield {
    /// Whether the cell is solid terrain.
    fn is_solid(&self, pos: GridPos) -> bool;
    /// Current grid position of an actor.
    fn position(&self, actor: ActorId) -> Option<GridPos>;
    /// Display name of an actor.
    fn name(&self, actor: ActorId) -> String;
    /// Current hit points.
    fn current_hp(&self, actor: ActorId) -> u32;
    /// Maximum hit points.
    fn max_hp(&self, actor: ActorId) -> u32;
    /// Whether the host still considers the actor present and alive.
    fn reports_alive(&self, actor: ActorId) -> bool;
    /// Base damage of an enemy's attack.
    fn attack_power(&self, actor: ActorId) -> u32;
    /// Movement speed attribute used for turn order.
    fn speed(&self, actor: ActorId) -> i32;
    /// Whether the actor is hostile to the player.
    fn is_hostile(&self, actor: ActorId) -> bool;
    /// Living actors within `radius` of `center`.
    fn actors_near(&self, center: GridPos, radius: f64) -> Vec<ActorId>;
    /// Deal damage. Returns the actor's HP afterwards.
    fn apply_damage(&mut self, actor: ActorId, amount: u32) -> CombatResult<u32>;
    /// Place an actor at `pos` with no validity checks.
    fn teleport(&mut self, actor: ActorId, pos: GridPos) -> CombatResult<()>;
}

/// Suspends every actor outside an exempt set.
pub trait WorldFreeze {
    /// Freeze everything except `exempt`.
    fn freeze(&mut self, exempt: &HashSet<ActorId>);
    /// Lift the freeze.
    fn unfreeze(&mut self);
    /// Whether a freeze is in effect.
    fn is_frozen(&self) -> bool;
}

/// Receives notice that an encounter ended.
pub trait CombatCooldown {
    /// Start the post-combat re-trigger cooldown.
    fn set_combat_cooldown(&mut self);
}

/// Weapon lookup for damage calculation.
pub trait Equipment {
    /// Damage of the wielded weapon before variance, if one is wielded.
    fn weapon_damage(&self, actor: ActorId) -> Option<u32>;
    /// Skill trained by the wielded weapon, if one is wielded.
    fn weapon_skill(&self, actor: ActorId) -> Option<Skill>;
}

/// Attributes the damage formulas read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stat {
    /// Raw strength.
    Strength,
    /// Experience level.
    Level,
}

/// Character attributes, skills, and experience.
pub trait Progression {
    /// Current value of an attribute.
    fn stat(&self, actor: ActorId, stat: Stat) -> u32;
    /// Current level of a skill.
    fn skill_level(&self, actor: ActorId, skill: Skill) -> u32;
    /// Award experience. Returns true on a level-up.
    fn gain_experience(&mut self, actor: ActorId, xp: u32) -> bool;
    /// Award skill experience. Returns the skill levels gained.
    fn train_skill(&mut self, actor: ActorId, skill: Skill, xp: u32) -> u32;
}

/// A single collaborator that provides both [`Equipment`] and [`Progression`].
pub trait CharacterSource: Equipment + Progression {}

impl<T: Equipment + Progression> CharacterSource for T {}

/// Mutable borrows of every collaborator a combat call may touch.
pub struct CombatContext<'a> {
    /// Terrain and actors.
    pub world: &'a mut dyn Battlefield,
    /// World suspension.
    pub freeze: &'a mut dyn WorldFreeze,
    /// Post-combat cooldown sink.
    pub cooldown: &'a mut dyn CombatCooldown,
    /// Weapons, attributes, skills, and experience.
    pub characters: &'a mut dyn CharacterSource,
}

impl<'a> CombatContext<'a> {
    /// Bundle the collaborators for one call.
    pub fn new(
        world: &'a mut dyn Battlefield,
        freeze: &'a mut dyn WorldFreeze,
        cooldown: &'a mut dyn CombatCooldown,
        characters: &'a mut dyn CharacterSource,
    ) -> Self {
        Self {
            world,
            freeze,
            cooldown,
            characters,
        }
    }
}

impl Battlefield for Arena {
    fn is_solid(&self, pos: GridPos) -> bool {
        Arena::is_solid(self, pos)
    }

    fn position(&self, actor: ActorId) -> Option<GridPos> {
        self.actor(actor).map(|a| a.position)
    }

    fn name(&self, actor: ActorId) -> String {
        self.actor(actor)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| actor.to_string())
    }

    fn current_hp(&self, actor: ActorId) -> u32 {
        self.actor(actor).map_or(0, |a| a.hp)
    }

    fn max_hp(&self, actor: ActorId) -> u32 {
        self.actor(actor).map_or(0, |a| a.max_hp)
    }

    fn reports_alive(&self, actor: ActorId) -> bool {
        self.actor(actor).is_some_and(|a| !a.removed)
    }

    fn attack_power(&self, actor: ActorId) -> u32 {
        self.actor(actor).map_or(0, |a| a.attack)
    }

    fn speed(&self, actor: ActorId) -> i32 {
        self.actor(actor).map_or(0, |a| a.speed)
    }

    fn is_hostile(&self, actor: ActorId) -> bool {
        self.actor(actor)
            .is_some_and(|a| a.kind == ActorKind::Hostile)
    }

    fn actors_near(&self, center: GridPos, radius: f64) -> Vec<ActorId> {
        self.actors_within(center, radius).map(|a| a.id).collect()
    }

    fn apply_damage(&mut self, actor: ActorId, amount: u32) -> CombatResult<u32> {
        Ok(Arena::apply_damage(self, actor, amount)?)
    }

    fn teleport(&mut self, actor: ActorId, pos: GridPos) -> CombatResult<()> {
        Ok(Arena::teleport(self, actor, pos)?)
    }
}

impl Equipment for CharacterStore {
    fn weapon_damage(&self, actor: ActorId) -> Option<u32> {
        self.get(actor)
            .and_then(|sheet| sheet.weapon.as_ref())
            .map(Weapon::damage)
    }

    fn weapon_skill(&self, actor: ActorId) -> Option<Skill> {
        self.get(actor)
            .and_then(|sheet| sheet.weapon.as_ref())
            .map(|weapon| weapon.kind.skill())
    }
}

impl Progression for CharacterStore {
    fn stat(&self, actor: ActorId, stat: Stat) -> u32 {
        match (self.get(actor), stat) {
            (Some(sheet), Stat::Strength) => sheet.strength,
            (Some(sheet), Stat::Level) => sheet.level,
            (None, Stat::Strength) => sk_core::CharacterSheet::default().strength,
            (None, Stat::Level) => 1,
        }
    }

    fn skill_level(&self, actor: ActorId, skill: Skill) -> u32 {
        self.get(actor).map_or(0, |sheet| sheet.skill_level(skill))
    }

    fn gain_experience(&mut self, actor: ActorId, xp: u32) -> bool {
        self.entry(actor).gain_xp(xp)
    }

    fn train_skill(&mut self, actor: ActorId, skill: Skill, xp: u32) -> u32 {
        self.entry(actor).train_skill(skill, xp)
    }
}
