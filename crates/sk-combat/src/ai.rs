use sk_core::{ActorId, GridPos};
use tracing::{debug, warn};

use crate::combatant::Combatant;
use crate::config::CombatConfig;
use crate::damage::{VarianceRoll, apply_variance};
use crate::host::Battlefield;
use crate::log::CombatLog;

/// What an enemy intends to do this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyDecision {
    /// Strike the adjacent player.
    Attack,
    /// Step to a neighboring cell.
    Move(GridPos),
    /// Do nothing.
    Pass,
}

/// What an enemy actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyAction {
    /// Hit the player.
    Attacked {
        /// Damage dealt after variance.
        damage: u32,
        /// Player HP afterwards.
        player_hp: u32,
    },
    /// Moved one cell.
    Moved {
        /// Starting cell.
        from: GridPos,
        /// Destination cell.
        to: GridPos,
    },
    /// No valid action.
    Passed,
}

/// Result of running one enemy turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnemyTurn {
    /// The action taken.
    pub action: EnemyAction,
    /// Ticks to wait before the turn ends.
    pub delay_ticks: u32,
}

/// Whether two cells touch, diagonals and vertical included.
pub fn is_adjacent(a: GridPos, b: GridPos) -> bool {
    a != b && a.chebyshev(b) <= 1
}

/// The neighbor of `current` that gets closest to `target`.
///
/// A candidate must be open, have solid ground below, and hold no other
/// living combatant. Ties keep the first candidate in NW..SE order.
pub fn find_best_move(
    current: GridPos,
    target: GridPos,
    mover: ActorId,
    roster: &[Combatant],
    world: &dyn Battlefield,
) -> Option<GridPos> {
    let mut best: Option<(GridPos, i64)> = None;
    for candidate in current.horizontal_neighbors() {
        if world.is_solid(candidate) || !world.is_solid(candidate.below()) {
            continue;
        }
        let occupied = roster.iter().any(|c| {
            c.actor() != mover && c.is_alive(world) && c.position(world) == Some(candidate)
        });
        if occupied {
            continue;
        }
        let distance = candidate.distance_squared(target);
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((candidate, distance));
        }
    }
    best.map(|(cell, _)| cell)
}

/// Decide an enemy's action without touching the world.
pub fn plan_turn(
    enemy: &Combatant,
    player: &Combatant,
    roster: &[Combatant],
    world: &dyn Battlefield,
) -> EnemyDecision {
    let (Some(from), Some(target)) = (enemy.position(world), player.position(world)) else {
        return EnemyDecision::Pass;
    };
    if is_adjacent(from, target) {
        return EnemyDecision::Attack;
    }
    match find_best_move(from, target, enemy.actor(), roster, world) {
        Some(to) => EnemyDecision::Move(to),
        None => EnemyDecision::Pass,
    }
}

/// Decide and carry out one enemy turn.
///
/// Attacks wait `attack_delay_ticks` before the turn ends; moves and
/// passes wait `move_delay_ticks`. A world write that fails counts as a
/// pass.
pub fn execute_turn<R: VarianceRoll + ?Sized>(
    enemy: &Combatant,
    player: &Combatant,
    roster: &[Combatant],
    world: &mut dyn Battlefield,
    rng: &mut R,
    log: &mut CombatLog,
    config: &CombatConfig,
) -> EnemyTurn {
    let name = enemy.name(world);
    let decision = plan_turn(enemy, player, roster, world);
    debug!(enemy = %name, ?decision, "enemy turn");

    let action = match decision {
        EnemyDecision::Attack => {
            let factor = rng.roll_variance(config.variance_min, config.variance_max);
            let damage = apply_variance(world.attack_power(enemy.actor()), factor);
            let before = world.current_hp(player.actor());
            match world.apply_damage(player.actor(), damage) {
                Ok(after) => {
                    log.add_message(format!("{name} attacks you for {damage} damage!"));
                    if after > 0 {
                        log.add_message(format!("Your HP: {before} -> {after}"));
                    } else {
                        log.add_message("You have been defeated!");
                    }
                    EnemyAction::Attacked {
                        damage,
                        player_hp: after,
                    }
                }
                Err(err) => {
                    warn!(enemy = %name, error = %err, "enemy attack failed");
                    EnemyAction::Passed
                }
            }
        }
        EnemyDecision::Move(to) => {
            let from = enemy.position(world).unwrap_or(to);
            match world.teleport(enemy.actor(), to) {
                Ok(()) => {
                    log.add_message(format!("{name} moves closer"));
                    EnemyAction::Moved { from, to }
                }
                Err(err) => {
                    warn!(enemy = %name, error = %err, "enemy move failed");
                    EnemyAction::Passed
                }
            }
        }
        EnemyDecision::Pass => {
            log.add_message(format!("{name} cannot move"));
            EnemyAction::Passed
        }
    };

    let delay_ticks = match action {
        EnemyAction::Attacked { .. } => config.attack_delay_ticks,
        EnemyAction::Moved { .. } | EnemyAction::Passed => config.move_delay_ticks,
    };
    EnemyTurn {
        action,
        delay_ticks,
    }
}
