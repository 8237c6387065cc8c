use rand::Rng;
use sk_core::{ActorId, Skill};

use crate::config::CombatConfig;
use crate::host::{CharacterSource, Equipment, Progression, Stat};

/// Source of damage variance multipliers.
pub trait VarianceRoll {
    /// A multiplier drawn uniformly from `min..=max`.
    fn roll_variance(&mut self, min: f64, max: f64) -> f64;
}

impl<R: Rng> VarianceRoll for R {
    fn roll_variance(&mut self, min: f64, max: f64) -> f64 {
        if min >= max {
            return min;
        }
        self.random_range(min..=max)
    }
}

/// A variance source that always returns the same multiplier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedVariance(pub f64);

impl Default for FixedVariance {
    fn default() -> Self {
        Self(1.0)
    }
}

impl VarianceRoll for FixedVariance {
    fn roll_variance(&mut self, _min: f64, _max: f64) -> f64 {
        self.0
    }
}

/// Scale `base` by `factor`, rounding down and never going below 1.
pub fn apply_variance(base: u32, factor: f64) -> u32 {
    let scaled = (f64::from(base) * factor).floor();
    if scaled < 1.0 {
        1
    } else if scaled >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        scaled as u32
    }
}

/// Unarmed damage: `base + strength / 4 + unarmed_skill / 2`.
pub fn unarmed_damage(base: u32, strength: u32, unarmed_skill: u32) -> u32 {
    base + strength / 4 + unarmed_skill / 2
}

/// The player's pre-variance damage and the skill the blow trains.
pub fn player_base_damage(
    characters: &dyn CharacterSource,
    player: ActorId,
    config: &CombatConfig,
) -> (u32, Skill) {
    match (
        characters.weapon_damage(player),
        characters.weapon_skill(player),
    ) {
        (Some(damage), Some(skill)) => (damage, skill),
        _ => {
            let strength = characters.stat(player, Stat::Strength);
            let skill = characters.skill_level(player, Skill::UnarmedCombat);
            (
                unarmed_damage(config.unarmed_base_damage, strength, skill),
                Skill::UnarmedCombat,
            )
        }
    }
}
