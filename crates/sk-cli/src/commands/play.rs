use std::io::{self, BufRead};
use std::path::Path;

use colored::Colorize;
use sk_combat::{CombatConfig, CombatError};
use sk_core::{ActorId, GridPos};

use super::Session;

const HELP: &str = "\
  Commands:
    n ne e se s sw w nw   step one block
    attack, a             strike the selected target
    wait, pass            skip your turn
    tab                   select the next enemy
    target <name>         select an enemy by name
    status                show the battlefield
    flee                  leave the fight
    quit                  stop playing";

enum Step {
    Continue,
    Stop,
}

pub fn run(map: Option<&Path>, seed: u64) -> Result<(), String> {
    let arena = super::load_arena(map)?;
    let mut session = Session::new(arena, CombatConfig::default().with_seed(seed))?;

    let enemies = session
        .detection
        .detect_nearby_enemies(&session.arena, session.player);
    if enemies.is_empty() {
        println!("  No enemies nearby. The arena is quiet.");
        return Ok(());
    }

    let stdin = io::stdin();
    play_loop(&mut session, &enemies, stdin.lock())?;
    super::print_outcome(session.manager.last_encounter());
    Ok(())
}

fn play_loop(
    session: &mut Session,
    enemies: &[ActorId],
    input: impl BufRead,
) -> Result<(), String> {
    session.start(enemies).map_err(|e| e.to_string())?;
    session.run_enemy_turns();
    let mut mark = print_new_lines(session, 0);
    if !session.manager.is_in_combat() {
        return Ok(());
    }
    print_prompt(session);

    for line in input.lines() {
        let line = line.map_err(|e| format!("cannot read input: {e}"))?;
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let rest: Vec<&str> = words.collect();

        if let Step::Stop = handle(session, &command.to_ascii_lowercase(), &rest) {
            print_new_lines(session, mark);
            return Ok(());
        }
        session.run_enemy_turns();
        mark = print_new_lines(session, mark);
        if !session.manager.is_in_combat() {
            return Ok(());
        }
        print_prompt(session);
    }

    // Input ran out mid-fight.
    session.flee();
    print_new_lines(session, mark);
    Ok(())
}

fn handle(session: &mut Session, command: &str, args: &[&str]) -> Step {
    if let Some((dx, dz)) = direction(command) {
        let Some(here) = session.position(session.player) else {
            return Step::Continue;
        };
        report(session.move_to(here.offset(dx, 0, dz)));
        return Step::Continue;
    }

    match command {
        "attack" | "a" => report(session.attack().map(|_| ())),
        "wait" | "pass" => report(session.pass()),
        "tab" => match session.cycle_target() {
            Some(target) => println!("  Target: {}", session.name(target).bold()),
            None => println!("  No target."),
        },
        "target" => {
            let name = args.join(" ");
            match session.arena.find_by_name(&name).map(|a| a.id) {
                Some(id) => match session.set_target(id) {
                    Ok(()) => println!("  Target: {}", session.name(id).bold()),
                    Err(e) => warn(&e.to_string()),
                },
                None => warn(&format!("No actor named '{name}'")),
            }
        }
        "status" => print_status(session),
        "help" | "?" => println!("{HELP}"),
        "flee" => {
            session.flee();
            println!("  You flee.");
            return Step::Stop;
        }
        "quit" | "q" => {
            session.flee();
            return Step::Stop;
        }
        other => warn(&format!("Unknown command: {other} (type 'help')")),
    }
    Step::Continue
}

fn direction(word: &str) -> Option<(i32, i32)> {
    Some(match word {
        "n" => (0, -1),
        "ne" => (1, -1),
        "e" => (1, 0),
        "se" => (1, 1),
        "s" => (0, 1),
        "sw" => (-1, 1),
        "w" => (-1, 0),
        "nw" => (-1, -1),
        _ => return None,
    })
}

fn report(result: Result<(), CombatError>) {
    if let Err(e) = result {
        warn(&e.to_string());
    }
}

fn warn(message: &str) {
    println!("  {}", message.yellow());
}

/// Print log lines added after `mark` and return the new mark.
fn print_new_lines(session: &Session, mark: u64) -> u64 {
    let log = session.manager.log();
    for line in log.since(mark) {
        println!("  {line}");
    }
    log.total_added()
}

fn print_prompt(session: &mut Session) {
    let hp = session
        .arena
        .actor(session.player)
        .map(|a| format!("{}/{}", a.hp, a.max_hp))
        .unwrap_or_default();
    let target = session
        .selected_target()
        .map(|t| session.name(t))
        .unwrap_or_else(|| "none".to_string());
    println!(
        "  {} HP {hp}, target {target} >",
        format!("[round {}]", session.manager.turn_counter() + 1).dimmed()
    );
}

fn print_status(session: &Session) {
    for line in session.arena.render().lines() {
        println!("  {line}");
    }
    let ids: Vec<ActorId> = session.arena.actors().iter().map(|a| a.id).collect();
    println!(
        "{}",
        super::actor_table(&session.arena, &ids, Some(&session.freezer))
    );
    let moves: Vec<String> = session
        .manager
        .valid_moves()
        .iter()
        .map(GridPos::to_string)
        .collect();
    println!("  Moves: {}", moves.join(" "));
}
