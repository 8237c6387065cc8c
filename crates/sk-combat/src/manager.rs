//! The combat state machine.
//!
//! A [`CombatManager`] owns one session: the roster in turn order, the
//! current turn, the player's valid moves, the selected target, the combat
//! log, and the scheduler that paces enemy turns. The host drives it with
//! [`CombatManager::tick`] once per simulation step; the input layer calls
//! the command methods directly.

use std::collections::{BTreeSet, HashSet};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use sk_core::{ActorId, GridPos};
use tracing::{debug, info};

use crate::ai;
use crate::combatant::Combatant;
use crate::config::CombatConfig;
use crate::damage::{self, VarianceRoll};
use crate::error::{CombatError, CombatResult};
use crate::host::{Battlefield, CombatContext, CombatCooldown, Progression, Stat, WorldFreeze};
use crate::log::CombatLog;
use crate::scheduler::{self, TickReport, TurnScheduler};
use crate::snapshot::{CombatSnapshot, CombatantView};
use crate::state::CombatState;

/// Work deferred through the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingAction {
    /// Finish the enemy turn that was started as `turn` of `encounter`.
    EndEnemyTurn { encounter: u64, turn: u64 },
}

/// How an encounter finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatOutcome {
    /// Every enemy died.
    Victory,
    /// The player died.
    Defeat,
    /// `end_combat` was called while both sides stood.
    Ended,
}

/// Record of a finished encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterSummary {
    /// Encounter number.
    pub encounter: u64,
    /// How it ended.
    pub outcome: CombatOutcome,
    /// Full rounds completed.
    pub rounds: u32,
}

/// Result of a successful [`CombatManager::attack_target`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackOutcome {
    /// Who was hit.
    pub target: ActorId,
    /// Damage dealt after variance.
    pub damage: u32,
    /// Target HP afterwards.
    pub remaining_hp: u32,
    /// Whether the blow was fatal.
    pub killed: bool,
    /// Whether the kill's experience raised the player's level.
    pub leveled_up: bool,
}

/// Turn-based combat session.
///
/// `R` supplies damage variance; production code uses the seeded
/// [`StdRng`], tests a [`FixedVariance`](crate::damage::FixedVariance).
#[derive(Debug)]
pub struct CombatManager<R: VarianceRoll = StdRng> {
    config: CombatConfig,
    rng: R,
    state: CombatState,
    player: Option<ActorId>,
    combatants: Vec<Combatant>,
    current_turn_index: usize,
    turn_counter: u32,
    grid_center: Option<GridPos>,
    valid_moves: BTreeSet<GridPos>,
    selected_target: Option<ActorId>,
    scheduler: TurnScheduler<PendingAction>,
    log: CombatLog,
    encounter: u64,
    turn_seq: u64,
    last_encounter: Option<EncounterSummary>,
}

impl CombatManager<StdRng> {
    /// Create a session whose variance comes from a `StdRng` seeded by the config.
    pub fn new(config: CombatConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self::with_rng(config, rng)
    }
}

impl<R: VarianceRoll> CombatManager<R> {
    /// Create a session with an explicit variance source.
    pub fn with_rng(config: CombatConfig, rng: R) -> Self {
        let log = CombatLog::new(config.log_capacity);
        Self {
            config,
            rng,
            state: CombatState::Exploration,
            player: None,
            combatants: Vec::new(),
            current_turn_index: 0,
            turn_counter: 0,
            grid_center: None,
            valid_moves: BTreeSet::new(),
            selected_target: None,
            scheduler: TurnScheduler::new(),
            log,
            encounter: 0,
            turn_seq: 0,
            last_encounter: None,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Current state.
    pub fn state(&self) -> CombatState {
        self.state
    }

    /// Whether an encounter is running.
    pub fn is_in_combat(&self) -> bool {
        self.state.is_in_combat()
    }

    /// The roster in turn order. Empty outside combat.
    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    /// The combatant whose turn it is.
    pub fn current_combatant(&self) -> Option<&Combatant> {
        self.combatants.get(self.current_turn_index)
    }

    /// Index of the current combatant in the roster.
    pub fn current_turn_index(&self) -> usize {
        self.current_turn_index
    }

    /// Completed rounds in this encounter.
    pub fn turn_counter(&self) -> u32 {
        self.turn_counter
    }

    /// The player in the running encounter.
    pub fn player(&self) -> Option<ActorId> {
        self.player
    }

    /// Anchor of the tactical grid, fixed at the player's start position.
    pub fn grid_center(&self) -> Option<GridPos> {
        self.grid_center
    }

    /// Cells the player may step to this turn.
    pub fn valid_moves(&self) -> &BTreeSet<GridPos> {
        &self.valid_moves
    }

    /// Whether `pos` is one of this turn's valid moves.
    pub fn is_valid_move(&self, pos: GridPos) -> bool {
        self.valid_moves.contains(&pos)
    }

    /// The tactical grid around the grid center, row by row.
    pub fn grid_cells(&self) -> Vec<GridPos> {
        let Some(center) = self.grid_center else {
            return Vec::new();
        };
        let r = self.config.grid_radius.max(0);
        (-r..=r)
            .flat_map(|dz| (-r..=r).map(move |dx| center.offset(dx, 0, dz)))
            .collect()
    }

    /// The combat log.
    pub fn log(&self) -> &CombatLog {
        &self.log
    }

    /// The session config.
    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Number of the current or most recent encounter; 0 before the first.
    pub fn encounter(&self) -> u64 {
        self.encounter
    }

    /// How the most recent encounter ended.
    pub fn last_encounter(&self) -> Option<EncounterSummary> {
        self.last_encounter
    }

    /// Scheduled actions still waiting.
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// Living enemy combatants in roster order.
    pub fn living_enemies(&self, world: &dyn Battlefield) -> Vec<ActorId> {
        self.combatants
            .iter()
            .filter(|c| !c.is_player() && c.is_alive(world))
            .map(Combatant::actor)
            .collect()
    }

    /// A serializable view of the session.
    pub fn snapshot(&self, world: &dyn Battlefield) -> CombatSnapshot {
        CombatSnapshot {
            encounter: self.encounter,
            state: self.state,
            round: self.turn_counter,
            current: self.current_combatant().map(Combatant::actor),
            roster: self
                .combatants
                .iter()
                .map(|c| CombatantView::of(c, world))
                .collect(),
            valid_moves: self.valid_moves.iter().copied().collect(),
            selected_target: self.resolve_target(world),
            grid_center: self.grid_center,
            log: self.log.messages().map(str::to_string).collect(),
            last_encounter: self.last_encounter,
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Begin an encounter between `player` and `enemies`.
    ///
    /// The roster is the player followed by each living enemy, stably
    /// sorted by descending speed. Everything outside the roster is frozen.
    /// Rejected while already in combat or when no enemy is alive.
    pub fn start(
        &mut self,
        ctx: &mut CombatContext<'_>,
        player: ActorId,
        enemies: &[ActorId],
    ) -> CombatResult<()> {
        if self.state.is_in_combat() {
            debug!(state = %self.state, "start rejected: already in combat");
            return Err(CombatError::AlreadyInCombat);
        }
        let world = &*ctx.world;
        let origin = world
            .position(player)
            .ok_or(CombatError::UnknownActor(player))?;

        let mut seen = HashSet::from([player]);
        let mut roster = vec![Combatant::new(player, true, world.speed(player))];
        for &enemy in enemies {
            if !seen.insert(enemy) {
                continue;
            }
            let combatant = Combatant::new(enemy, false, world.speed(enemy));
            if combatant.is_alive(world) {
                roster.push(combatant);
            }
        }
        if roster.len() < 2 {
            debug!("start rejected: no living enemies");
            return Err(CombatError::NoEnemies);
        }
        // Stable: equal speeds keep insertion order.
        roster.sort_by(|a, b| b.speed().cmp(&a.speed()));

        self.scheduler.cancel_all();
        self.encounter += 1;
        self.player = Some(player);
        self.combatants = roster;
        self.current_turn_index = 0;
        self.turn_counter = 0;
        self.grid_center = Some(origin);
        self.selected_target = None;
        self.update_valid_moves(&*ctx.world);

        let exempt: HashSet<ActorId> = self.combatants.iter().map(Combatant::actor).collect();
        ctx.freeze.freeze(&exempt);

        let enemy_count = self.combatants.len() - 1;
        self.log.clear();
        self.log.add_message(format!(
            "Combat started against {enemy_count} {}!",
            if enemy_count == 1 { "enemy" } else { "enemies" }
        ));
        info!(
            encounter = self.encounter,
            combatants = self.combatants.len(),
            "combat started"
        );

        self.begin_turn(ctx);
        Ok(())
    }

    /// Leave combat without a winner. Returns false if not in combat.
    ///
    /// Cancels pending enemy turns, lifts the freeze, clears the roster,
    /// and starts the detection cooldown.
    pub fn end_combat(&mut self, ctx: &mut CombatContext<'_>) -> bool {
        if !self.state.is_in_combat() {
            debug!("end_combat ignored: not in combat");
            return false;
        }
        self.log.add_message("Combat ended.");
        self.finish(ctx, CombatOutcome::Ended);
        true
    }

    /// Advance one host tick, running any enemy turn that finished waiting.
    pub fn tick(&mut self, ctx: &mut CombatContext<'_>) -> TickReport {
        let due = self.scheduler.tick();
        if due.is_empty() {
            return TickReport::default();
        }
        scheduler::run_due(due, |action| self.dispatch(ctx, action))
    }

    // -----------------------------------------------------------------------
    // Player commands
    // -----------------------------------------------------------------------

    /// Step the player to `pos`, then end the turn.
    pub fn move_player(&mut self, ctx: &mut CombatContext<'_>, pos: GridPos) -> CombatResult<()> {
        self.require_player_turn()?;
        if !self.valid_moves.contains(&pos) {
            debug!(%pos, "move rejected");
            return Err(CombatError::InvalidMove(pos));
        }
        let player = self.player.ok_or(CombatError::NotInCombat)?;
        ctx.world.teleport(player, pos)?;
        self.log.add_message(format!("You move to {pos}"));
        self.end_turn(ctx)
    }

    /// Strike the selected target, then end the turn.
    ///
    /// A kill awards experience and skill training and may end the
    /// encounter on the spot.
    pub fn attack_target(&mut self, ctx: &mut CombatContext<'_>) -> CombatResult<AttackOutcome> {
        self.require_player_turn()?;
        let player = self.player.ok_or(CombatError::NotInCombat)?;
        let target = self
            .selected_target(&*ctx.world)
            .ok_or(CombatError::NoTarget)?;

        let (base, skill) = damage::player_base_damage(&*ctx.characters, player, &self.config);
        let factor = self
            .rng
            .roll_variance(self.config.variance_min, self.config.variance_max);
        let dealt = damage::apply_variance(base, factor);

        let name = ctx.world.name(target);
        let before = ctx.world.current_hp(target);
        let remaining = ctx.world.apply_damage(target, dealt)?;
        self.log
            .add_message(format!("You attack {name} for {dealt} damage!"));

        let killed = !(ctx.world.reports_alive(target) && remaining > 0);
        let mut leveled_up = false;
        if killed {
            self.log.add_message(format!("{name} has been defeated!"));
            let xp = ctx
                .world
                .max_hp(target)
                .saturating_mul(self.config.xp_per_max_hp);
            leveled_up = ctx.characters.gain_experience(player, xp);
            ctx.characters
                .train_skill(player, skill, self.config.skill_xp_per_kill);
            self.log.add_message(format!("You gain {xp} experience."));
            if leveled_up {
                let level = ctx.characters.stat(player, Stat::Level);
                self.log
                    .add_message(format!("You reached level {level}!"));
            }
            if self.selected_target == Some(target) {
                self.selected_target = None;
            }
            info!(target = %name, xp, "enemy slain");
        } else {
            self.log
                .add_message(format!("{name}: {before} -> {remaining} HP"));
        }

        let outcome = AttackOutcome {
            target,
            damage: dealt,
            remaining_hp: remaining,
            killed,
            leveled_up,
        };
        if self.check_combat_end(ctx) {
            return Ok(outcome);
        }
        self.end_turn(ctx)?;
        Ok(outcome)
    }

    /// Spend the player's turn doing nothing.
    pub fn pass_turn(&mut self, ctx: &mut CombatContext<'_>) -> CombatResult<()> {
        self.require_player_turn()?;
        self.log.add_message("You wait.");
        self.end_turn(ctx)
    }

    /// Finish the current combatant's turn and start the next one.
    ///
    /// Wrapping past the end of the roster completes a round. End
    /// conditions are checked before the next combatant acts.
    pub fn end_turn(&mut self, ctx: &mut CombatContext<'_>) -> CombatResult<()> {
        if !self.state.is_in_combat() {
            return Err(CombatError::NotInCombat);
        }
        self.advance_index();
        self.begin_turn(ctx);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Targeting
    // -----------------------------------------------------------------------

    /// The current target, re-resolved to the first living enemy when the
    /// previous one is unset or dead.
    pub fn selected_target(&mut self, world: &dyn Battlefield) -> Option<ActorId> {
        let resolved = self.resolve_target(world);
        self.selected_target = resolved;
        resolved
    }

    /// Select the next living enemy in roster order, wrapping.
    pub fn cycle_target(&mut self, world: &dyn Battlefield) -> Option<ActorId> {
        let enemies = self.living_enemies(world);
        let next = match self
            .selected_target
            .and_then(|current| enemies.iter().position(|&e| e == current))
        {
            Some(i) => enemies.get((i + 1) % enemies.len()),
            None => enemies.first(),
        };
        self.selected_target = next.copied();
        self.selected_target
    }

    /// Select a specific living enemy from the roster.
    pub fn set_target(&mut self, world: &dyn Battlefield, actor: ActorId) -> CombatResult<()> {
        if !self.is_living_enemy(actor, world) {
            debug!(%actor, "target rejected");
            return Err(CombatError::NotATarget(actor));
        }
        self.selected_target = Some(actor);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn require_player_turn(&self) -> CombatResult<()> {
        if self.state == CombatState::PlayerTurn {
            Ok(())
        } else {
            debug!(state = %self.state, "player command rejected");
            Err(CombatError::NotPlayerTurn { state: self.state })
        }
    }

    fn player_combatant(&self) -> Option<Combatant> {
        self.combatants.iter().find(|c| c.is_player()).copied()
    }

    fn is_living_enemy(&self, actor: ActorId, world: &dyn Battlefield) -> bool {
        self.combatants
            .iter()
            .any(|c| c.actor() == actor && !c.is_player() && c.is_alive(world))
    }

    fn resolve_target(&self, world: &dyn Battlefield) -> Option<ActorId> {
        match self.selected_target {
            Some(current) if self.is_living_enemy(current, world) => Some(current),
            _ => self.living_enemies(world).first().copied(),
        }
    }

    fn advance_index(&mut self) {
        if let Some(current) = self.combatants.get_mut(self.current_turn_index) {
            current.end_turn();
        }
        self.current_turn_index += 1;
        if self.current_turn_index >= self.combatants.len() {
            self.current_turn_index = 0;
            self.turn_counter += 1;
            debug!(round = self.turn_counter, "round complete");
        }
    }

    /// Hand the turn to the combatant at the current index.
    ///
    /// Dead enemies are passed over. An enemy's decision runs immediately;
    /// its turn ends when the scheduled [`PendingAction`] fires.
    fn begin_turn(&mut self, ctx: &mut CombatContext<'_>) {
        for _ in 0..=self.combatants.len() {
            if self.check_combat_end(ctx) {
                return;
            }
            let Some(current) = self.combatants.get(self.current_turn_index).copied() else {
                return;
            };
            self.turn_seq += 1;

            if current.is_player() {
                self.state = CombatState::PlayerTurn;
                if let Some(c) = self.combatants.get_mut(self.current_turn_index) {
                    c.start_turn();
                }
                self.update_valid_moves(&*ctx.world);
                debug!(round = self.turn_counter, moves = self.valid_moves.len(), "player turn");
                return;
            }

            if !current.is_alive(&*ctx.world) {
                debug!(actor = %current.actor(), "skipping dead combatant");
                self.advance_index();
                continue;
            }

            self.state = CombatState::EnemyTurn;
            if let Some(c) = self.combatants.get_mut(self.current_turn_index) {
                c.start_turn();
            }
            let Some(player) = self.player_combatant() else {
                return;
            };
            let turn = ai::execute_turn(
                &current,
                &player,
                &self.combatants,
                &mut *ctx.world,
                &mut self.rng,
                &mut self.log,
                &self.config,
            );
            if self.check_combat_end(ctx) {
                return;
            }
            let action = PendingAction::EndEnemyTurn {
                encounter: self.encounter,
                turn: self.turn_seq,
            };
            self.scheduler.schedule_after_delay(action, turn.delay_ticks);
            debug!(delay = turn.delay_ticks, "enemy turn scheduled to end");
            return;
        }
    }

    fn dispatch(&mut self, ctx: &mut CombatContext<'_>, action: PendingAction) -> CombatResult<()> {
        match action {
            PendingAction::EndEnemyTurn { encounter, turn } => {
                let live = encounter == self.encounter
                    && turn == self.turn_seq
                    && self.state == CombatState::EnemyTurn;
                if !live {
                    return Err(CombatError::StaleTask {
                        scheduled: encounter,
                        current: self.encounter,
                    });
                }
                self.end_turn(ctx)
            }
        }
    }

    /// Recompute the player's valid moves: open neighbors with no living
    /// combatant on them.
    fn update_valid_moves(&mut self, world: &dyn Battlefield) {
        self.valid_moves.clear();
        let Some(origin) = self.player.and_then(|p| world.position(p)) else {
            return;
        };
        for cell in origin.horizontal_neighbors() {
            if world.is_solid(cell) {
                continue;
            }
            let occupied = self
                .combatants
                .iter()
                .any(|c| c.is_alive(world) && c.position(world) == Some(cell));
            if !occupied {
                self.valid_moves.insert(cell);
            }
        }
    }

    /// End the encounter on defeat or victory. Returns true if it ended.
    fn check_combat_end(&mut self, ctx: &mut CombatContext<'_>) -> bool {
        if self.combatants.is_empty() {
            return false;
        }
        let world = &*ctx.world;
        let player_alive = self.player_combatant().is_some_and(|p| p.is_alive(world));
        if !player_alive {
            self.log.add_message("=== DEFEAT ===");
            self.finish(ctx, CombatOutcome::Defeat);
            return true;
        }
        let enemies_alive = self
            .combatants
            .iter()
            .any(|c| !c.is_player() && c.is_alive(world));
        if !enemies_alive {
            self.log.add_message("=== VICTORY ===");
            self.finish(ctx, CombatOutcome::Victory);
            return true;
        }
        false
    }

    fn finish(&mut self, ctx: &mut CombatContext<'_>, outcome: CombatOutcome) {
        self.state = CombatState::Ending;
        let cancelled = self.scheduler.cancel_all();
        ctx.freeze.unfreeze();

        let summary = EncounterSummary {
            encounter: self.encounter,
            outcome,
            rounds: self.turn_counter,
        };
        self.combatants.clear();
        self.player = None;
        self.current_turn_index = 0;
        self.turn_counter = 0;
        self.grid_center = None;
        self.valid_moves.clear();
        self.selected_target = None;
        self.state = CombatState::Exploration;
        self.last_encounter = Some(summary);

        ctx.cooldown.set_combat_cooldown();
        info!(
            encounter = summary.encounter,
            ?outcome,
            rounds = summary.rounds,
            cancelled,
            "combat ended"
        );
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sk_core::{Actor, ActorKind, Arena, CharacterStore};

    use super::*;
    use crate::damage::FixedVariance;
    use crate::detection::CombatDetection;
    use crate::freeze::WorldFreezer;

    struct Fixture {
        arena: Arena,
        freezer: WorldFreezer,
        detection: CombatDetection,
        store: CharacterStore,
        player: ActorId,
    }

    impl Fixture {
        fn parse(layout: &str) -> Self {
            Self::from_arena(Arena::parse("test", layout).unwrap())
        }

        fn from_arena(arena: Arena) -> Self {
            let player = arena.player().unwrap().id;
            Self {
                arena,
                freezer: WorldFreezer::new(),
                detection: CombatDetection::default(),
                store: CharacterStore::new(),
                player,
            }
        }

        fn ctx(&mut self) -> CombatContext<'_> {
            CombatContext::new(
                &mut self.arena,
                &mut self.freezer,
                &mut self.detection,
                &mut self.store,
            )
        }

        fn id(&self, name: &str) -> ActorId {
            self.arena.find_by_name(name).unwrap().id
        }

        fn hostiles(&self) -> Vec<ActorId> {
            self.arena
                .actors()
                .iter()
                .filter(|a| a.kind == ActorKind::Hostile)
                .map(|a| a.id)
                .collect()
        }

        fn hp(&self, id: ActorId) -> u32 {
            self.arena.actor(id).unwrap().hp
        }

        fn pos(&self, id: ActorId) -> GridPos {
            self.arena.actor(id).unwrap().position
        }
    }

    fn manager() -> CombatManager<FixedVariance> {
        CombatManager::with_rng(CombatConfig::default(), FixedVariance(1.0))
    }

    fn start(m: &mut CombatManager<FixedVariance>, fx: &mut Fixture) {
        let enemies = fx.hostiles();
        let player = fx.player;
        m.start(&mut fx.ctx(), player, &enemies).unwrap();
    }

    fn tick_n<R: VarianceRoll>(m: &mut CombatManager<R>, fx: &mut Fixture, n: usize) {
        for _ in 0..n {
            m.tick(&mut fx.ctx());
        }
    }

    fn assert_invariants<R: VarianceRoll>(m: &CombatManager<R>) {
        assert_eq!(
            m.state() == CombatState::Exploration,
            m.combatants().is_empty()
        );
        if m.is_in_combat() {
            assert!(m.current_turn_index() < m.combatants().len());
        }
    }

    const DUEL: &str = "\
#######
#@....#
#.....#
#....o#
#######";

    #[test]
    fn start_sorts_roster_and_freezes_the_world() {
        let mut fx = Fixture::parse(
            "\
#########
#@..g..r#
#.......#
#########",
        );
        let mut m = manager();
        start(&mut m, &mut fx);

        let order: Vec<ActorId> = m.combatants().iter().map(Combatant::actor).collect();
        assert_eq!(order, vec![fx.id("Rat"), fx.player, fx.id("Goblin")]);
        // The rat is fastest and acts first.
        assert_eq!(m.state(), CombatState::EnemyTurn);
        assert_eq!(m.current_turn_index(), 0);
        assert_eq!(m.grid_center(), Some(GridPos::new(1, 1, 1)));
        assert!(fx.freezer.is_frozen());
        assert_eq!(fx.freezer.exempt_count(), 3);
        assert!(m
            .log()
            .messages()
            .any(|line| line == "Combat started against 2 enemies!"));
        assert_eq!(m.pending_tasks(), 1);
        assert_invariants(&m);

        tick_n(&mut m, &mut fx, 10);
        assert_eq!(m.state(), CombatState::PlayerTurn);
        assert_eq!(m.current_turn_index(), 1);
    }

    #[test]
    fn turn_order_is_a_stable_descending_sort() {
        let mut arena = Arena::new("speeds");
        let player = arena
            .add_actor(
                Actor::new(ActorKind::Player, "You", GridPos::new(0, 1, 0), 20).with_speed(10),
            )
            .unwrap();
        let mut enemies = Vec::new();
        for (i, speed) in [15, 10, 20].into_iter().enumerate() {
            let pos = GridPos::new(10 + 3 * i as i32, 1, 10);
            let enemy = Actor::new(ActorKind::Hostile, format!("E{i}"), pos, 5).with_speed(speed);
            enemies.push(arena.add_actor(enemy).unwrap());
        }
        let mut fx = Fixture::from_arena(arena);
        let mut m = manager();
        m.start(&mut fx.ctx(), player, &enemies).unwrap();

        let order: Vec<ActorId> = m.combatants().iter().map(Combatant::actor).collect();
        assert_eq!(order, vec![enemies[2], enemies[0], player, enemies[1]]);
    }

    #[test]
    fn start_rejections_leave_the_session_untouched() {
        let mut fx = Fixture::parse(DUEL);
        let mut m = manager();
        let player = fx.player;
        let enemies = fx.hostiles();

        let err = m.start(&mut fx.ctx(), player, &[]).unwrap_err();
        assert!(matches!(err, CombatError::NoEnemies));
        let err = m.start(&mut fx.ctx(), player, &[player]).unwrap_err();
        assert!(matches!(err, CombatError::NoEnemies));
        let ghost = ActorId::new();
        let err = m.start(&mut fx.ctx(), ghost, &enemies).unwrap_err();
        assert!(matches!(err, CombatError::UnknownActor(id) if id == ghost));
        assert_eq!(m.encounter(), 0);
        assert!(!fx.freezer.is_frozen());

        start(&mut m, &mut fx);
        let encounter = m.encounter();
        let err = m.start(&mut fx.ctx(), player, &enemies).unwrap_err();
        assert!(matches!(err, CombatError::AlreadyInCombat));
        assert_eq!(m.encounter(), encounter);
        assert_eq!(m.state(), CombatState::PlayerTurn);
    }

    #[test]
    fn dead_enemies_are_left_out_of_the_roster() {
        let mut fx = Fixture::parse("@.g..r");
        let rat = fx.id("Rat");
        fx.arena.apply_damage(rat, 100).unwrap();
        let mut m = manager();
        start(&mut m, &mut fx);
        assert_eq!(m.combatants().len(), 2);
    }

    #[test]
    fn three_end_turns_complete_a_round() {
        let mut fx = Fixture::parse(
            "\
##########
#@.......#
#........#
#......gg#
##########",
        );
        let mut m = manager();
        start(&mut m, &mut fx);
        assert_eq!(m.combatants().len(), 3);
        assert_eq!(m.state(), CombatState::PlayerTurn);
        assert_eq!(m.turn_counter(), 0);

        m.end_turn(&mut fx.ctx()).unwrap();
        assert_eq!(m.current_turn_index(), 1);
        assert_eq!(m.state(), CombatState::EnemyTurn);

        tick_n(&mut m, &mut fx, 10);
        assert_eq!(m.current_turn_index(), 2);
        assert_eq!(m.turn_counter(), 0);

        tick_n(&mut m, &mut fx, 10);
        assert_eq!(m.turn_counter(), 1);
        assert_eq!(m.current_turn_index(), 0);
        assert_eq!(m.state(), CombatState::PlayerTurn);
    }

    #[test]
    fn valid_moves_are_open_unoccupied_neighbors() {
        let mut fx = Fixture::parse(
            "\
#######
#@g...#
#.....#
#....g#
#######",
        );
        let mut m = manager();
        start(&mut m, &mut fx);
        assert_eq!(m.state(), CombatState::PlayerTurn);
        let expected: BTreeSet<GridPos> = [GridPos::new(1, 1, 2), GridPos::new(2, 1, 2)]
            .into_iter()
            .collect();
        assert_eq!(m.valid_moves(), &expected);
    }

    #[test]
    fn moves_are_validated_and_end_the_turn() {
        let mut fx = Fixture::parse(DUEL);
        let player = fx.player;
        let mut m = manager();
        start(&mut m, &mut fx);
        assert_eq!(m.state(), CombatState::PlayerTurn);
        assert_eq!(m.valid_moves().len(), 3);

        let far = GridPos::new(3, 1, 1);
        let err = m.move_player(&mut fx.ctx(), far).unwrap_err();
        assert!(matches!(err, CombatError::InvalidMove(p) if p == far));
        assert_eq!(m.state(), CombatState::PlayerTurn);
        assert_eq!(fx.pos(player), GridPos::new(1, 1, 1));

        let step = GridPos::new(2, 1, 2);
        m.move_player(&mut fx.ctx(), step).unwrap();
        assert_eq!(fx.pos(player), step);
        assert_eq!(m.state(), CombatState::EnemyTurn);

        let err = m.move_player(&mut fx.ctx(), step).unwrap_err();
        assert!(matches!(err, CombatError::NotPlayerTurn { .. }));

        tick_n(&mut m, &mut fx, 10);
        assert_eq!(m.state(), CombatState::PlayerTurn);
        let err = m.move_player(&mut fx.ctx(), step).unwrap_err();
        assert!(matches!(err, CombatError::InvalidMove(_)));
        assert_invariants(&m);
    }

    #[test]
    fn attack_damages_target_and_hands_over_the_turn() {
        let mut fx = Fixture::parse("#@o#");
        let orc = fx.id("Orc");
        let player = fx.player;
        let mut m = manager();
        start(&mut m, &mut fx);

        let outcome = m.attack_target(&mut fx.ctx()).unwrap();
        assert_eq!(outcome.target, orc);
        assert_eq!(outcome.damage, 5);
        assert_eq!(outcome.remaining_hp, 13);
        assert!(!outcome.killed);
        assert_eq!(fx.hp(orc), 13);

        // The orc answered at once; its turn ends 20 ticks later.
        assert_eq!(m.state(), CombatState::EnemyTurn);
        assert_eq!(fx.hp(player), 15);
        assert!(m
            .log()
            .messages()
            .any(|line| line == "Orc: 18 -> 13 HP"));

        tick_n(&mut m, &mut fx, 19);
        assert_eq!(m.state(), CombatState::EnemyTurn);
        tick_n(&mut m, &mut fx, 1);
        assert_eq!(m.state(), CombatState::PlayerTurn);
        assert_eq!(m.turn_counter(), 1);
    }

    #[test]
    fn weapon_damage_is_used_when_equipped() {
        let mut fx = Fixture::parse("#@o#");
        let player = fx.player;
        fx.store.insert(
            player,
            sk_core::CharacterSheet::new(10)
                .with_weapon(sk_core::Weapon::new(sk_core::WeaponKind::LongSword)),
        );
        let mut m = manager();
        start(&mut m, &mut fx);
        let outcome = m.attack_target(&mut fx.ctx()).unwrap();
        assert_eq!(outcome.damage, 10);
    }

    #[test]
    fn killing_the_last_enemy_ends_in_victory_immediately() {
        let mut fx = Fixture::parse("#@g#");
        let goblin = fx.id("Goblin");
        let player = fx.player;
        fx.arena.actor_mut(goblin).unwrap().hp = 3;
        let mut m = manager();
        start(&mut m, &mut fx);
        assert_eq!(m.state(), CombatState::PlayerTurn);

        let outcome = m.attack_target(&mut fx.ctx()).unwrap();
        assert!(outcome.killed);
        assert_eq!(m.state(), CombatState::Exploration);
        assert!(m.combatants().is_empty());
        assert_eq!(m.pending_tasks(), 0);
        assert!(!fx.freezer.is_frozen());
        assert!(fx.detection.is_cooling_down(Utc::now()));
        assert_eq!(fx.hp(player), 20);
        assert!(!m.log().messages().any(|line| line.contains("attacks you")));
        assert_eq!(
            m.last_encounter(),
            Some(EncounterSummary {
                encounter: 1,
                outcome: CombatOutcome::Victory,
                rounds: 0
            })
        );

        let sheet = fx.store.get(player).unwrap();
        assert_eq!(sheet.total_xp, 20);
        assert_invariants(&m);
    }

    #[test]
    fn a_large_kill_award_reports_every_level_gained() {
        let mut fx = Fixture::parse("#@g#");
        let goblin = fx.id("Goblin");
        let player = fx.player;
        {
            let g = fx.arena.actor_mut(goblin).unwrap();
            g.max_hp = 250;
            g.hp = 3;
        }
        let mut m = manager();
        start(&mut m, &mut fx);

        let outcome = m.attack_target(&mut fx.ctx()).unwrap();
        assert!(outcome.killed);
        assert!(outcome.leveled_up);
        assert!(m.log().messages().any(|line| line == "You gain 500 experience."));
        assert!(m.log().messages().any(|line| line == "You reached level 6!"));
        assert_eq!(fx.store.get(player).unwrap().level, 6);
    }

    #[test]
    fn player_death_is_a_defeat() {
        let mut fx = Fixture::parse("#@r#");
        let player = fx.player;
        fx.arena.actor_mut(player).unwrap().hp = 1;
        let mut m = manager();
        start(&mut m, &mut fx);

        assert_eq!(m.state(), CombatState::Exploration);
        assert_eq!(fx.hp(player), 0);
        assert_eq!(
            m.last_encounter().map(|s| s.outcome),
            Some(CombatOutcome::Defeat)
        );
        assert_eq!(m.log().latest(), Some("=== DEFEAT ==="));
        assert_invariants(&m);
    }

    #[test]
    fn attacks_outside_the_player_turn_are_rejected() {
        let mut fx = Fixture::parse("#@.r#");
        let rat = fx.id("Rat");
        let mut m = manager();

        let err = m.attack_target(&mut fx.ctx()).unwrap_err();
        assert!(matches!(
            err,
            CombatError::NotPlayerTurn {
                state: CombatState::Exploration
            }
        ));

        start(&mut m, &mut fx);
        assert_eq!(m.state(), CombatState::EnemyTurn);
        let hp = fx.hp(rat);
        let err = m.attack_target(&mut fx.ctx()).unwrap_err();
        assert!(matches!(
            err,
            CombatError::NotPlayerTurn {
                state: CombatState::EnemyTurn
            }
        ));
        assert_eq!(fx.hp(rat), hp);
    }

    #[test]
    fn dead_roster_entries_pass_silently() {
        let mut fx = Fixture::parse(
            "\
##########
#@.......#
#........#
#......gg#
##########",
        );
        let first = fx.id("Goblin");
        let second = fx.id("Goblin 2");
        let mut m = manager();
        start(&mut m, &mut fx);

        fx.arena.apply_damage(first, 100).unwrap();
        m.pass_turn(&mut fx.ctx()).unwrap();

        assert_eq!(m.state(), CombatState::EnemyTurn);
        assert_eq!(m.current_combatant().map(Combatant::actor), Some(second));
        assert_eq!(m.current_turn_index(), 2);
        assert!(!m.log().messages().any(|line| line.starts_with("Goblin moves")));
        assert!(m.log().messages().any(|line| line == "Goblin 2 moves closer"));
    }

    #[test]
    fn targeting_cycles_and_re_resolves() {
        let mut fx = Fixture::parse(
            "\
###########
#@.......c#
#.........#
#...g..o.r#
###########",
        );
        let (goblin, orc, rat, cow) = (fx.id("Goblin"), fx.id("Orc"), fx.id("Rat"), fx.id("Cow"));
        let mut m = manager();
        start(&mut m, &mut fx);
        // Roster order: rat (12), player, goblin (10), orc (8).
        let living = m.living_enemies(&fx.arena);
        assert_eq!(living, vec![rat, goblin, orc]);

        assert_eq!(m.selected_target(&fx.arena), Some(rat));
        assert_eq!(m.cycle_target(&fx.arena), Some(goblin));
        assert_eq!(m.cycle_target(&fx.arena), Some(orc));
        assert_eq!(m.cycle_target(&fx.arena), Some(rat));

        let err = m.set_target(&fx.arena, cow).unwrap_err();
        assert!(matches!(err, CombatError::NotATarget(id) if id == cow));
        assert_eq!(m.selected_target(&fx.arena), Some(rat));

        m.set_target(&fx.arena, orc).unwrap();
        assert_eq!(m.selected_target(&fx.arena), Some(orc));

        fx.arena.apply_damage(orc, 100).unwrap();
        assert_eq!(m.selected_target(&fx.arena), Some(rat));
        let err = m.set_target(&fx.arena, orc).unwrap_err();
        assert!(matches!(err, CombatError::NotATarget(_)));
    }

    #[test]
    fn end_combat_cancels_and_is_idempotent() {
        let mut fx = Fixture::parse("#@..r#");
        let mut m = manager();
        start(&mut m, &mut fx);
        assert_eq!(m.pending_tasks(), 1);

        assert!(m.end_combat(&mut fx.ctx()));
        assert_eq!(m.state(), CombatState::Exploration);
        assert_eq!(m.pending_tasks(), 0);
        assert!(m.valid_moves().is_empty());
        assert_eq!(m.grid_center(), None);
        assert!(!fx.freezer.is_frozen());
        assert_eq!(
            m.last_encounter().map(|s| s.outcome),
            Some(CombatOutcome::Ended)
        );
        assert_invariants(&m);

        assert!(!m.end_combat(&mut fx.ctx()));
        assert!(matches!(
            m.end_turn(&mut fx.ctx()).unwrap_err(),
            CombatError::NotInCombat
        ));
    }

    #[test]
    fn cancelled_enemy_turn_never_fires_into_a_new_encounter() {
        let mut fx = Fixture::parse("#@.....r#");
        let mut m = manager();
        start(&mut m, &mut fx);
        assert_eq!(m.state(), CombatState::EnemyTurn);
        tick_n(&mut m, &mut fx, 5);
        assert!(m.end_combat(&mut fx.ctx()));

        start(&mut m, &mut fx);
        assert_eq!(m.encounter(), 2);
        assert_eq!(m.state(), CombatState::EnemyTurn);
        // The first encounter's action would have come due here.
        tick_n(&mut m, &mut fx, 9);
        assert_eq!(m.state(), CombatState::EnemyTurn);
        assert_eq!(m.current_turn_index(), 0);
        tick_n(&mut m, &mut fx, 1);
        assert_eq!(m.state(), CombatState::PlayerTurn);
    }

    #[test]
    fn stale_actions_are_dropped_not_run() {
        let mut fx = Fixture::parse("#@.....r#");
        let mut m = manager();
        start(&mut m, &mut fx);
        m.scheduler.schedule_after_delay(
            PendingAction::EndEnemyTurn {
                encounter: 99,
                turn: m.turn_seq,
            },
            1,
        );
        let report = m.tick(&mut fx.ctx());
        assert_eq!(report.failed, 1);
        assert_eq!(report.executed, 0);
        assert_eq!(m.state(), CombatState::EnemyTurn);
        assert_eq!(m.current_turn_index(), 0);
    }

    #[test]
    fn grid_and_snapshot() {
        let mut fx = Fixture::parse(DUEL);
        let mut m = manager();
        assert!(m.grid_cells().is_empty());
        start(&mut m, &mut fx);

        let cells = m.grid_cells();
        assert_eq!(cells.len(), 15 * 15);
        assert_eq!(cells.first(), Some(&GridPos::new(-6, 1, -6)));
        assert!(cells.contains(&GridPos::new(1, 1, 1)));

        let snap = m.snapshot(&fx.arena);
        assert_eq!(snap.state, CombatState::PlayerTurn);
        assert_eq!(snap.roster.len(), 2);
        assert_eq!(snap.current, Some(fx.player));
        assert_eq!(snap.selected_target, Some(fx.id("Orc")));
        assert_eq!(snap.valid_moves.len(), 3);
        let json = snap.to_json().unwrap();
        assert!(json.contains("\"player_turn\""));
        assert!(json.contains("\"Orc\""));
    }

    #[test]
    fn seeded_fight_runs_to_completion_with_invariants() {
        let mut fx = Fixture::parse(
            "\
#########
#@......#
#.......#
#..g..r.#
#########",
        );
        let mut m = CombatManager::new(CombatConfig::default().with_seed(7));
        let enemies = fx.hostiles();
        let player = fx.player;
        m.start(&mut fx.ctx(), player, &enemies).unwrap();

        for _ in 0..5_000 {
            assert_invariants(&m);
            if !m.is_in_combat() {
                break;
            }
            if m.state() == CombatState::PlayerTurn {
                m.attack_target(&mut fx.ctx()).unwrap();
            } else {
                m.tick(&mut fx.ctx());
            }
        }
        assert!(!m.is_in_combat());
        assert!(m.last_encounter().is_some());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn roster_is_a_stable_descending_sort(speeds in proptest::collection::vec(0i32..25, 2..8)) {
                let mut arena = Arena::new("prop");
                let mut ids = Vec::new();
                for (i, &speed) in speeds.iter().enumerate() {
                    let kind = if i == 0 { ActorKind::Player } else { ActorKind::Hostile };
                    let pos = GridPos::new(4 * i as i32, 1, 0);
                    let actor = Actor::new(kind, format!("A{i}"), pos, 5).with_speed(speed);
                    ids.push(arena.add_actor(actor).unwrap());
                }
                let mut fx = Fixture::from_arena(arena);
                let mut m = manager();
                m.start(&mut fx.ctx(), ids[0], &ids[1..]).unwrap();

                let roster = m.combatants();
                prop_assert_eq!(roster.len(), ids.len());
                for pair in roster.windows(2) {
                    let (a, b) = (pair[0], pair[1]);
                    prop_assert!(a.speed() >= b.speed());
                    if a.speed() == b.speed() {
                        let ia = ids.iter().position(|&id| id == a.actor());
                        let ib = ids.iter().position(|&id| id == b.actor());
                        prop_assert!(ia < ib);
                    }
                }
            }
        }
    }
}
