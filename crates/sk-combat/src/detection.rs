use chrono::{DateTime, Duration, Utc};
use sk_core::ActorId;
use tracing::{debug, info};

use crate::config::CombatConfig;
use crate::host::{Battlefield, CombatCooldown};

/// Finds hostile actors near the player and decides when to start combat.
///
/// Automatic detection is off by default. When on, a check runs every
/// `detection_interval_ticks` calls to [`poll`](CombatDetection::poll).
/// Both automatic and manual triggers stay quiet for `cooldown_secs`
/// after an encounter ends.
#[derive(Debug, Clone)]
pub struct CombatDetection {
    auto_combat: bool,
    radius: f64,
    interval: u32,
    tick_counter: u32,
    cooldown: Duration,
    last_combat_end: Option<DateTime<Utc>>,
}

impl Default for CombatDetection {
    fn default() -> Self {
        Self::from_config(&CombatConfig::default())
    }
}

impl CombatDetection {
    /// Build a detector from the combat config.
    pub fn from_config(config: &CombatConfig) -> Self {
        Self {
            auto_combat: false,
            radius: config.detection_radius,
            interval: config.detection_interval_ticks.max(1),
            tick_counter: 0,
            cooldown: Duration::seconds(config.cooldown_secs.max(0)),
            last_combat_end: None,
        }
    }

    /// Whether automatic detection is on.
    pub fn is_auto_combat_enabled(&self) -> bool {
        self.auto_combat
    }

    /// Turn automatic detection on or off.
    pub fn set_auto_combat(&mut self, enabled: bool) {
        self.auto_combat = enabled;
    }

    /// Flip automatic detection. Returns the new setting.
    pub fn toggle_auto_combat(&mut self) -> bool {
        self.auto_combat = !self.auto_combat;
        info!(enabled = self.auto_combat, "auto combat toggled");
        self.auto_combat
    }

    /// Record that combat ended at `now`.
    pub fn set_combat_cooldown_at(&mut self, now: DateTime<Utc>) {
        self.last_combat_end = Some(now);
    }

    /// Whether `now` falls inside the post-combat cooldown.
    pub fn is_cooling_down(&self, now: DateTime<Utc>) -> bool {
        self.last_combat_end
            .is_some_and(|ended| now < ended + self.cooldown)
    }

    /// Living hostile actors within the detection radius of the player.
    pub fn detect_nearby_enemies(&self, world: &dyn Battlefield, player: ActorId) -> Vec<ActorId> {
        let Some(center) = world.position(player) else {
            return Vec::new();
        };
        world
            .actors_near(center, self.radius)
            .into_iter()
            .filter(|&id| id != player && world.is_hostile(id) && world.reports_alive(id))
            .collect()
    }

    /// Count one host tick. On every interval boundary, with auto combat on,
    /// outside combat, and past the cooldown, returns the nearby enemies if
    /// there are any.
    pub fn poll(
        &mut self,
        world: &dyn Battlefield,
        player: ActorId,
        in_combat: bool,
        now: DateTime<Utc>,
    ) -> Option<Vec<ActorId>> {
        self.tick_counter += 1;
        if self.tick_counter < self.interval {
            return None;
        }
        self.tick_counter = 0;

        if !self.auto_combat || in_combat || self.is_cooling_down(now) {
            return None;
        }
        let enemies = self.detect_nearby_enemies(world, player);
        if enemies.is_empty() {
            return None;
        }
        debug!(count = enemies.len(), "enemies detected");
        Some(enemies)
    }

    /// Start combat against a specific hostile actor.
    ///
    /// The target comes first, followed by the other nearby enemies with
    /// no duplicates. Returns `None` while in combat, during the cooldown,
    /// or when the target is not a living hostile.
    pub fn manual_trigger(
        &self,
        world: &dyn Battlefield,
        player: ActorId,
        target: ActorId,
        in_combat: bool,
        now: DateTime<Utc>,
    ) -> Option<Vec<ActorId>> {
        if in_combat || self.is_cooling_down(now) {
            return None;
        }
        if !world.is_hostile(target) || !world.reports_alive(target) {
            return None;
        }
        let mut enemies = vec![target];
        enemies.extend(
            self.detect_nearby_enemies(world, player)
                .into_iter()
                .filter(|&id| id != target),
        );
        Some(enemies)
    }
}

impl CombatCooldown for CombatDetection {
    fn set_combat_cooldown(&mut self) {
        self.set_combat_cooldown_at(Utc::now());
    }
}
