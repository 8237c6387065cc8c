use serde::{Deserialize, Serialize};

/// Tunable constants for a combat session.
///
/// Every field has a default, so a JSON file may name only the fields it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// RNG seed for damage variance.
    pub seed: u64,
    /// Combat log capacity; older lines are evicted.
    pub log_capacity: usize,
    /// Ticks an enemy turn lasts after an attack.
    pub attack_delay_ticks: u32,
    /// Ticks an enemy turn lasts after moving or passing.
    pub move_delay_ticks: u32,
    /// Lower bound of the damage variance multiplier.
    pub variance_min: f64,
    /// Upper bound of the damage variance multiplier.
    pub variance_max: f64,
    /// Flat base of unarmed player damage.
    pub unarmed_base_damage: u32,
    /// Experience awarded per point of a slain enemy's max HP.
    pub xp_per_max_hp: u32,
    /// Skill experience awarded per kill.
    pub skill_xp_per_kill: u32,
    /// Half-width of the square grid overlay around the combat center.
    pub grid_radius: i32,
    /// Enemy detection radius in blocks.
    pub detection_radius: f64,
    /// Ticks between automatic detection checks.
    pub detection_interval_ticks: u32,
    /// Seconds after combat ends during which detection stays quiet.
    pub cooldown_secs: i64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            log_capacity: 20,
            attack_delay_ticks: 20,
            move_delay_ticks: 10,
            variance_min: 0.8,
            variance_max: 1.2,
            unarmed_base_damage: 3,
            xp_per_max_hp: 2,
            skill_xp_per_kill: 20,
            grid_radius: 7,
            detection_radius: 15.0,
            detection_interval_ticks: 20,
            cooldown_secs: 5,
        }
    }
}

impl CombatConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the combat log capacity.
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// Set the enemy turn delays after an attack and after a move.
    pub fn with_turn_delays(mut self, attack: u32, movement: u32) -> Self {
        self.attack_delay_ticks = attack;
        self.move_delay_ticks = movement;
        self
    }

    /// Set the damage variance range. Bounds are swapped if given reversed.
    pub fn with_variance(mut self, min: f64, max: f64) -> Self {
        self.variance_min = min.min(max);
        self.variance_max = max.max(min);
        self
    }

    /// Set the detection radius.
    pub fn with_detection_radius(mut self, radius: f64) -> Self {
        self.detection_radius = radius;
        self
    }

    /// Set the ticks between automatic detection checks.
    pub fn with_detection_interval(mut self, ticks: u32) -> Self {
        self.detection_interval_ticks = ticks;
        self
    }

    /// Set the post-combat detection cooldown.
    pub fn with_cooldown_secs(mut self, secs: i64) -> Self {
        self.cooldown_secs = secs;
        self
    }

    /// Set the grid overlay half-width.
    pub fn with_grid_radius(mut self, radius: i32) -> Self {
        self.grid_radius = radius;
        self
    }
}
