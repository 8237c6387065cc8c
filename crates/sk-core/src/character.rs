use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::actor::ActorId;

/// Highest experience level and skill level a character can reach.
pub const MAX_LEVEL: u32 = 27;
/// Skill XP needed per skill level.
const SKILL_XP_PER_LEVEL: u32 = 100;

/// A trainable combat skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    /// Fighting with fists and claws.
    UnarmedCombat,
    /// Daggers and short swords.
    ShortBlades,
    /// Long swords and scimitars.
    LongBlades,
    /// Hand axes and war axes.
    Axes,
    /// Clubs, maces, and flails.
    MacesFlails,
    /// Spears and other reach weapons.
    Polearms,
    /// Quarterstaves.
    Staves,
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnarmedCombat => write!(f, "Unarmed Combat"),
            Self::ShortBlades => write!(f, "Short Blades"),
            Self::LongBlades => write!(f, "Long Blades"),
            Self::Axes => write!(f, "Axes"),
            Self::MacesFlails => write!(f, "Maces & Flails"),
            Self::Polearms => write!(f, "Polearms"),
            Self::Staves => write!(f, "Staves"),
        }
    }
}

/// The kinds of weapon a character can wield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    /// A dagger.
    Dagger,
    /// A short sword.
    ShortSword,
    /// A long sword.
    LongSword,
    /// A hand axe.
    HandAxe,
    /// A war axe.
    WarAxe,
    /// A mace.
    Mace,
    /// A spear.
    Spear,
    /// A quarterstaff.
    Quarterstaff,
}

impl WeaponKind {
    /// Base damage before enchantment and variance.
    pub const fn base_damage(self) -> u32 {
        match self {
            Self::Dagger => 4,
            Self::ShortSword | Self::HandAxe => 7,
            Self::LongSword | Self::Quarterstaff => 10,
            Self::WarAxe => 11,
            Self::Mace => 8,
            Self::Spear => 6,
        }
    }

    /// The skill trained by fighting with this weapon.
    pub const fn skill(self) -> Skill {
        match self {
            Self::Dagger | Self::ShortSword => Skill::ShortBlades,
            Self::LongSword => Skill::LongBlades,
            Self::HandAxe | Self::WarAxe => Skill::Axes,
            Self::Mace => Skill::MacesFlails,
            Self::Spear => Skill::Polearms,
            Self::Quarterstaff => Skill::Staves,
        }
    }
}

impl fmt::Display for WeaponKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dagger => write!(f, "Dagger"),
            Self::ShortSword => write!(f, "Short Sword"),
            Self::LongSword => write!(f, "Long Sword"),
            Self::HandAxe => write!(f, "Hand Axe"),
            Self::WarAxe => write!(f, "War Axe"),
            Self::Mace => write!(f, "Mace"),
            Self::Spear => write!(f, "Spear"),
            Self::Quarterstaff => write!(f, "Quarterstaff"),
        }
    }
}

/// An equipped weapon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    /// What kind of weapon this is.
    pub kind: WeaponKind,
    /// Flat enchantment bonus added to the base damage.
    pub enchantment: i32,
}

impl Weapon {
    /// An unenchanted weapon of the given kind.
    pub fn new(kind: WeaponKind) -> Self {
        Self {
            kind,
            enchantment: 0,
        }
    }

    /// Damage dealt before variance, never below 1.
    pub fn damage(&self) -> u32 {
        let raw = i64::from(self.kind.base_damage()) + i64::from(self.enchantment);
        raw.max(1) as u32
    }
}

/// A character's progression state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterSheet {
    /// Strength attribute.
    pub strength: u32,
    /// Experience level (1-27).
    pub level: u32,
    /// Total experience gained.
    pub total_xp: u32,
    /// Currently wielded weapon, if any.
    pub weapon: Option<Weapon>,
    skills: HashMap<Skill, u32>,
    skill_progress: HashMap<Skill, u32>,
}

impl Default for CharacterSheet {
    fn default() -> Self {
        Self {
            strength: 10,
            level: 1,
            total_xp: 0,
            weapon: None,
            skills: HashMap::new(),
            skill_progress: HashMap::new(),
        }
    }
}

impl CharacterSheet {
    /// Create a level-1 sheet with the given strength.
    pub fn new(strength: u32) -> Self {
        Self {
            strength,
            ..Self::default()
        }
    }

    /// Equip a weapon.
    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.weapon = Some(weapon);
        self
    }

    /// Set a skill level directly.
    pub fn with_skill(mut self, skill: Skill, level: u32) -> Self {
        self.skills.insert(skill, level.min(MAX_LEVEL));
        self
    }

    /// Current level of a skill (0 if untrained).
    pub fn skill_level(&self, skill: Skill) -> u32 {
        self.skills.get(&skill).copied().unwrap_or(0)
    }

    /// Add experience. Returns true if the character gained at least one level.
    ///
    /// The next level is reached when total XP hits `level * 100`; a large
    /// award can cross several thresholds at once.
    pub fn gain_xp(&mut self, xp: u32) -> bool {
        self.total_xp = self.total_xp.saturating_add(xp);
        let before = self.level;
        while self.level < MAX_LEVEL && self.total_xp >= self.level * 100 {
            self.level += 1;
        }
        self.level > before
    }

    /// Add skill XP. Returns the number of skill levels gained.
    pub fn train_skill(&mut self, skill: Skill, xp: u32) -> u32 {
        let mut level = self.skill_level(skill);
        if level >= MAX_LEVEL {
            return 0;
        }
        let progress = self.skill_progress.entry(skill).or_insert(0);
        *progress = progress.saturating_add(xp);

        let mut gained = 0;
        while *progress >= SKILL_XP_PER_LEVEL && level < MAX_LEVEL {
            *progress -= SKILL_XP_PER_LEVEL;
            level += 1;
            gained += 1;
        }
        self.skills.insert(skill, level);
        gained
    }
}

/// Character sheets keyed by actor.
///
/// Owned by whoever runs the game and passed down by reference; there is
/// no global registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterStore {
    sheets: HashMap<ActorId, CharacterSheet>,
}

impl CharacterStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a sheet.
    pub fn insert(&mut self, actor: ActorId, sheet: CharacterSheet) {
        self.sheets.insert(actor, sheet);
    }

    /// The sheet for an actor.
    pub fn get(&self, actor: ActorId) -> Option<&CharacterSheet> {
        self.sheets.get(&actor)
    }

    /// The sheet for an actor, mutably.
    pub fn get_mut(&mut self, actor: ActorId) -> Option<&mut CharacterSheet> {
        self.sheets.get_mut(&actor)
    }

    /// The sheet for an actor, created with defaults if missing.
    pub fn entry(&mut self, actor: ActorId) -> &mut CharacterSheet {
        self.sheets.entry(actor).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weapon_damage_includes_enchantment_and_floor() {
        assert_eq!(Weapon::new(WeaponKind::LongSword).damage(), 10);
        let blessed = Weapon {
            kind: WeaponKind::Dagger,
            enchantment: 3,
        };
        assert_eq!(blessed.damage(), 7);
        let cursed = Weapon {
            kind: WeaponKind::Dagger,
            enchantment: -9,
        };
        assert_eq!(cursed.damage(), 1);
    }

    #[test]
    fn weapon_skills() {
        assert_eq!(WeaponKind::Dagger.skill(), Skill::ShortBlades);
        assert_eq!(WeaponKind::WarAxe.skill(), Skill::Axes);
        assert_eq!(WeaponKind::Quarterstaff.skill(), Skill::Staves);
    }

    #[test]
    fn gain_xp_levels_up_at_threshold() {
        let mut sheet = CharacterSheet::default();
        assert!(!sheet.gain_xp(99));
        assert_eq!(sheet.level, 1);
        assert!(sheet.gain_xp(1));
        assert_eq!(sheet.level, 2);
        // level 2 needs 200 total
        assert!(!sheet.gain_xp(50));
        assert!(sheet.gain_xp(50));
        assert_eq!(sheet.level, 3);
    }

    #[test]
    fn gain_xp_crosses_several_levels_at_once() {
        let mut sheet = CharacterSheet::default();
        // 100, 200, 300, 400 and 500 are all reached.
        assert!(sheet.gain_xp(500));
        assert_eq!(sheet.level, 6);
        assert!(sheet.total_xp < sheet.level * 100);
    }

    #[test]
    fn gain_xp_stops_at_max_level() {
        let mut sheet = CharacterSheet::default();
        assert!(sheet.gain_xp(u32::MAX));
        assert_eq!(sheet.level, MAX_LEVEL);
    }

    #[test]
    fn gain_xp_caps_at_max_level() {
        let mut sheet = CharacterSheet {
            level: MAX_LEVEL,
            ..CharacterSheet::default()
        };
        assert!(!sheet.gain_xp(1_000_000));
        assert_eq!(sheet.level, MAX_LEVEL);
    }

    #[test]
    fn train_skill_carries_progress() {
        let mut sheet = CharacterSheet::default();
        assert_eq!(sheet.train_skill(Skill::UnarmedCombat, 60), 0);
        assert_eq!(sheet.train_skill(Skill::UnarmedCombat, 60), 1);
        assert_eq!(sheet.skill_level(Skill::UnarmedCombat), 1);
        assert_eq!(sheet.train_skill(Skill::UnarmedCombat, 180), 2);
        assert_eq!(sheet.skill_level(Skill::UnarmedCombat), 3);
    }

    #[test]
    fn train_skill_stops_at_max() {
        let mut sheet = CharacterSheet::default().with_skill(Skill::Axes, 40);
        assert_eq!(sheet.skill_level(Skill::Axes), MAX_LEVEL);
        assert_eq!(sheet.train_skill(Skill::Axes, 500), 0);
    }

    #[test]
    fn store_entry_creates_default_sheet() {
        let mut store = CharacterStore::new();
        let id = ActorId::new();
        assert!(store.get(id).is_none());
        store.entry(id).strength = 14;
        assert_eq!(store.get(id).unwrap().strength, 14);
    }
}
