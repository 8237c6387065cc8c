use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use colored::Colorize;
use serde_json::json;
use sk_combat::{CombatState, ai};
use sk_core::ActorId;
use tracing::{debug, info};

use super::Session;

/// Simulated wall-clock time per host tick.
const TICK_MILLIS: i64 = 50;

pub fn run(
    map: Option<&Path>,
    seed: u64,
    max_ticks: u64,
    config: Option<&Path>,
    verbose: bool,
    json: bool,
) -> Result<(), String> {
    let arena = super::load_arena(map)?;
    let config = super::load_config(config)?.with_seed(seed);
    let mut session = Session::new(arena, config)?;
    session.detection.set_auto_combat(true);

    let started_at = Utc::now();
    let clock = |tick: u64| -> DateTime<Utc> {
        let millis = i64::try_from(tick).unwrap_or(i64::MAX / TICK_MILLIS) * TICK_MILLIS;
        started_at + Duration::milliseconds(millis)
    };

    let mut ticks = 0u64;
    let mut enemies: Option<Vec<ActorId>> = None;
    while ticks < max_ticks {
        ticks += 1;
        let in_combat = session.manager.is_in_combat();
        if let Some(found) =
            session
                .detection
                .poll(&session.arena, session.player, in_combat, clock(ticks))
        {
            debug!(tick = ticks, count = found.len(), "detection fired");
            enemies = Some(found);
            break;
        }
        if session.detection.detect_nearby_enemies(&session.arena, session.player).is_empty() {
            break;
        }
    }

    let Some(enemies) = enemies else {
        if json {
            let report = json!({
                "arena": session.arena.name,
                "seed": seed,
                "ticks": ticks,
                "outcome": null,
                "log": Vec::<String>::new(),
                "combatants": Vec::<serde_json::Value>::new(),
            });
            println!("{}", serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?);
        } else {
            println!(
                "  No enemies within {} blocks of the player. Nothing to fight.",
                session.manager.config().detection_radius
            );
        }
        return Ok(());
    };

    session.start(&enemies).map_err(|e| e.to_string())?;
    while session.manager.is_in_combat() && ticks < max_ticks {
        if session.manager.state() == CombatState::PlayerTurn {
            player_step(&mut session)?;
        } else {
            session.tick();
            ticks += 1;
        }
    }

    let mut participants = vec![session.player];
    participants.extend(enemies.iter().copied());
    let summary = if session.manager.is_in_combat() {
        None
    } else {
        session.manager.last_encounter()
    };
    info!(ticks, outcome = ?summary.map(|s| s.outcome), "simulation finished");
    let mut log: Vec<&str> = session.manager.log().messages().collect();
    log.reverse();

    if json {
        let combatants: Vec<serde_json::Value> = participants
            .iter()
            .filter_map(|&id| session.arena.actor(id))
            .map(|a| {
                json!({
                    "name": a.name,
                    "kind": a.kind,
                    "hp": a.hp,
                    "max_hp": a.max_hp,
                    "alive": a.is_alive(),
                    "position": a.position,
                })
            })
            .collect();
        let report = json!({
            "arena": session.arena.name,
            "seed": seed,
            "ticks": ticks,
            "outcome": summary,
            "log": log,
            "combatants": combatants,
            "snapshot": session.manager.snapshot(&session.arena),
        });
        println!("{}", serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?);
        return Ok(());
    }

    println!(
        "  {} '{}' {}",
        "Simulation".bold(),
        session.arena.name,
        format!("(seed {seed}, {ticks} ticks)").dimmed()
    );
    println!();
    super::print_outcome(summary);
    println!();

    let shown = if verbose {
        log.as_slice()
    } else {
        &log[log.len().saturating_sub(5)..]
    };
    println!("  {}", "Combat Log".bold());
    for line in shown {
        println!("    {line}");
    }
    println!();
    println!(
        "{}",
        super::actor_table(&session.arena, &participants, Some(&session.freezer))
    );

    Ok(())
}

/// Autopilot for the player's turn: hit an adjacent target, otherwise close
/// the distance, otherwise strike from where they stand.
fn player_step(session: &mut Session) -> Result<(), String> {
    let Some(target) = session.selected_target() else {
        return session.pass().map_err(|e| e.to_string());
    };
    let (Some(me), Some(them)) = (session.position(session.player), session.position(target))
    else {
        return session.pass().map_err(|e| e.to_string());
    };

    if ai::is_adjacent(me, them) {
        return session.attack().map(|_| ()).map_err(|e| e.to_string());
    }

    let closer = session
        .manager
        .valid_moves()
        .iter()
        .copied()
        .min_by_key(|p| p.distance_squared(them))
        .filter(|p| p.distance_squared(them) < me.distance_squared(them));
    match closer {
        Some(pos) => session.move_to(pos).map_err(|e| e.to_string()),
        None => session.attack().map(|_| ()).map_err(|e| e.to_string()),
    }
}
