pub mod play;
pub mod show;
pub mod simulate;

use std::fs;
use std::path::Path;

use colored::{ColoredString, Colorize};
use comfy_table::{ContentArrangement, Table};
use sk_combat::{
    AttackOutcome, CombatConfig, CombatContext, CombatDetection, CombatManager, CombatOutcome,
    CombatResult, CombatState, EncounterSummary, WorldFreezer,
};
use sk_core::{ActorId, Arena, CharacterStore, GridPos};

/// The arena used when no `--map` is given.
const DEFAULT_MAP: &str = include_str!("../../maps/default.txt");

/// Upper bound on ticks spent waiting out one round of enemy turns.
const MAX_ENEMY_TICKS: u64 = 100_000;

/// Load an arena layout from a file, or the built-in one.
pub fn load_arena(map: Option<&Path>) -> Result<Arena, String> {
    let Some(path) = map else {
        return Arena::parse("Default Arena", DEFAULT_MAP).map_err(|e| e.to_string());
    };
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read map {}: {e}", path.display()))?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Arena".to_string());
    Arena::parse(name, &text).map_err(|e| format!("invalid map {}: {e}", path.display()))
}

/// Load combat settings from a JSON file, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<CombatConfig, String> {
    let Some(path) = path else {
        return Ok(CombatConfig::default());
    };
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read config {}: {e}", path.display()))?;
    CombatConfig::from_json(&text).map_err(|e| format!("invalid config {}: {e}", path.display()))
}

/// Everything one terminal session owns: the world, its collaborators, and
/// the combat manager.
pub struct Session {
    pub arena: Arena,
    pub freezer: WorldFreezer,
    pub detection: CombatDetection,
    pub store: CharacterStore,
    pub manager: CombatManager,
    pub player: ActorId,
}

impl Session {
    pub fn new(arena: Arena, config: CombatConfig) -> Result<Self, String> {
        let player = arena
            .player()
            .map(|a| a.id)
            .ok_or("arena has no player")?;
        Ok(Self {
            arena,
            freezer: WorldFreezer::new(),
            detection: CombatDetection::from_config(&config),
            store: CharacterStore::new(),
            manager: CombatManager::new(config),
            player,
        })
    }

    fn split(&mut self) -> (&mut CombatManager, CombatContext<'_>) {
        let ctx = CombatContext::new(
            &mut self.arena,
            &mut self.freezer,
            &mut self.detection,
            &mut self.store,
        );
        (&mut self.manager, ctx)
    }

    pub fn start(&mut self, enemies: &[ActorId]) -> CombatResult<()> {
        let player = self.player;
        let (manager, mut ctx) = self.split();
        manager.start(&mut ctx, player, enemies)
    }

    pub fn tick(&mut self) {
        let (manager, mut ctx) = self.split();
        manager.tick(&mut ctx);
    }

    pub fn attack(&mut self) -> CombatResult<AttackOutcome> {
        let (manager, mut ctx) = self.split();
        manager.attack_target(&mut ctx)
    }

    pub fn move_to(&mut self, pos: GridPos) -> CombatResult<()> {
        let (manager, mut ctx) = self.split();
        manager.move_player(&mut ctx, pos)
    }

    pub fn pass(&mut self) -> CombatResult<()> {
        let (manager, mut ctx) = self.split();
        manager.pass_turn(&mut ctx)
    }

    pub fn flee(&mut self) -> bool {
        let (manager, mut ctx) = self.split();
        manager.end_combat(&mut ctx)
    }

    pub fn selected_target(&mut self) -> Option<ActorId> {
        self.manager.selected_target(&self.arena)
    }

    pub fn cycle_target(&mut self) -> Option<ActorId> {
        self.manager.cycle_target(&self.arena)
    }

    pub fn set_target(&mut self, actor: ActorId) -> CombatResult<()> {
        self.manager.set_target(&self.arena, actor)
    }

    /// Tick until the player may act or the fight is over. Returns the
    /// ticks spent.
    pub fn run_enemy_turns(&mut self) -> u64 {
        let mut ticks = 0;
        while self.manager.state() == CombatState::EnemyTurn && ticks < MAX_ENEMY_TICKS {
            self.tick();
            ticks += 1;
        }
        ticks
    }

    pub fn position(&self, actor: ActorId) -> Option<GridPos> {
        self.arena.actor(actor).map(|a| a.position)
    }

    pub fn name(&self, actor: ActorId) -> String {
        self.arena
            .actor(actor)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| actor.to_string())
    }
}

pub fn outcome_label(outcome: Option<CombatOutcome>) -> ColoredString {
    match outcome {
        Some(CombatOutcome::Victory) => "VICTORY".green().bold(),
        Some(CombatOutcome::Defeat) => "DEFEAT".red().bold(),
        Some(CombatOutcome::Ended) => "ENDED".yellow().bold(),
        None => "UNFINISHED".yellow().bold(),
    }
}

pub fn print_outcome(summary: Option<EncounterSummary>) {
    let label = outcome_label(summary.map(|s| s.outcome));
    match summary {
        Some(s) => println!(
            "  {} {label} {}",
            "Outcome:".bold(),
            format!("after {} full rounds", s.rounds).dimmed()
        ),
        None => println!("  {} {label}", "Outcome:".bold()),
    }
}

/// A table of actors with their HP, position, and whether they are
/// dead, frozen, or active.
pub fn actor_table(arena: &Arena, ids: &[ActorId], freezer: Option<&WorldFreezer>) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Kind", "HP", "Position", "Status"]);

    for &id in ids {
        let Some(actor) = arena.actor(id) else {
            continue;
        };
        let status = if !actor.is_alive() {
            "dead".red().to_string()
        } else if freezer.is_some_and(|f| !f.should_tick(id)) {
            "frozen".cyan().to_string()
        } else {
            "active".green().to_string()
        };
        table.add_row(vec![
            actor.name.clone(),
            actor.kind.to_string(),
            format!("{}/{}", actor.hp, actor.max_hp),
            actor.position.to_string(),
            status,
        ]);
    }
    table
}
