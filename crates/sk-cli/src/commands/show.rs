use std::path::Path;

use colored::Colorize;
use sk_core::ActorId;

pub fn run(map: Option<&Path>) -> Result<(), String> {
    let arena = super::load_arena(map)?;

    println!("  {} '{}'", "Arena".bold(), arena.name);
    println!();
    for line in arena.render().lines() {
        println!("  {line}");
    }
    println!();

    let ids: Vec<ActorId> = arena.actors().iter().map(|a| a.id).collect();
    if ids.is_empty() {
        println!("  No actors.");
        return Ok(());
    }
    println!("{}", super::actor_table(&arena, &ids, None));
    println!();
    println!("  {} actors", ids.len());

    Ok(())
}
