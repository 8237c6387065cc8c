use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::actor::{Actor, ActorId, ActorKind};
use crate::error::{CoreError, CoreResult};
use crate::grid::GridPos;

/// Layer that holds the floor in parsed layouts.
pub const FLOOR_Y: i32 = 0;
/// Layer that walkers stand on in parsed layouts.
pub const WALK_Y: i32 = 1;

/// Player stats for parsed layouts.
const PLAYER_HP: u32 = 20;
const PLAYER_ATTACK: u32 = 5;
const PLAYER_SPEED: i32 = 10;

/// A monster template placed by a layout glyph.
struct MonsterTemplate {
    glyph: char,
    name: &'static str,
    kind: ActorKind,
    hp: u32,
    attack: u32,
    speed: i32,
}

const BESTIARY: &[MonsterTemplate] = &[
    MonsterTemplate {
        glyph: 'r',
        name: "Rat",
        kind: ActorKind::Hostile,
        hp: 6,
        attack: 2,
        speed: 12,
    },
    MonsterTemplate {
        glyph: 'g',
        name: "Goblin",
        kind: ActorKind::Hostile,
        hp: 10,
        attack: 3,
        speed: 10,
    },
    MonsterTemplate {
        glyph: 'o',
        name: "Orc",
        kind: ActorKind::Hostile,
        hp: 18,
        attack: 5,
        speed: 8,
    },
    MonsterTemplate {
        glyph: 's',
        name: "Sentry Bot",
        kind: ActorKind::Hostile,
        hp: 30,
        attack: 7,
        speed: 6,
    },
    MonsterTemplate {
        glyph: 'c',
        name: "Cow",
        kind: ActorKind::Passive,
        hp: 10,
        attack: 0,
        speed: 8,
    },
];

fn template_for(glyph: char) -> Option<&'static MonsterTemplate> {
    BESTIARY.iter().find(|t| t.glyph == glyph)
}

fn glyph_for(actor: &Actor) -> char {
    match actor.kind {
        ActorKind::Player => '@',
        _ => BESTIARY
            .iter()
            .find(|t| actor.name.starts_with(t.name))
            .map(|t| t.glyph)
            .unwrap_or('?'),
    }
}

/// A tactical map: solid cells plus the actors standing in it.
///
/// Actors keep their insertion order, which is also the order every
/// query returns them in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Arena {
    /// Display name of the arena.
    pub name: String,
    solids: HashSet<GridPos>,
    actors: Vec<Actor>,
    #[serde(skip)]
    index: HashMap<ActorId, usize>,
    width: i32,
    depth: i32,
}

impl Arena {
    /// Create an empty arena with no terrain.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse a text layout.
    ///
    /// `#` wall, `.` floor, ` ` or `_` pit, `@` player, and monster glyphs
    /// `r` rat, `g` goblin, `o` orc, `s` sentry bot, `c` cow. Each row is a
    /// `z` line and each column an `x` cell; every non-pit cell has floor
    /// at [`FLOOR_Y`] and walls also fill [`WALK_Y`].
    pub fn parse(name: impl Into<String>, layout: &str) -> CoreResult<Self> {
        let mut arena = Self::new(name);
        let mut seen: HashMap<char, usize> = HashMap::new();
        let mut player = false;

        for (row, line) in layout.lines().enumerate() {
            let z = row as i32;
            for (col, glyph) in line.chars().enumerate() {
                let x = col as i32;
                let floor = GridPos::new(x, FLOOR_Y, z);
                let walk = GridPos::new(x, WALK_Y, z);
                match glyph {
                    ' ' | '_' => {}
                    '.' => arena.add_solid(floor),
                    '#' => {
                        arena.add_solid(floor);
                        arena.add_solid(walk);
                    }
                    '@' => {
                        if player {
                            return Err(CoreError::DuplicatePlayer);
                        }
                        player = true;
                        arena.add_solid(floor);
                        let actor = Actor::new(ActorKind::Player, "You", walk, PLAYER_HP)
                            .with_attack(PLAYER_ATTACK)
                            .with_speed(PLAYER_SPEED);
                        arena.add_actor(actor)?;
                    }
                    other => {
                        let template = template_for(other).ok_or(CoreError::UnknownGlyph {
                            glyph: other,
                            line: row + 1,
                            column: col + 1,
                        })?;
                        let count = seen.entry(other).or_insert(0);
                        *count += 1;
                        let name = if *count == 1 {
                            template.name.to_string()
                        } else {
                            format!("{} {}", template.name, count)
                        };
                        arena.add_solid(floor);
                        let actor = Actor::new(template.kind, name, walk, template.hp)
                            .with_attack(template.attack)
                            .with_speed(template.speed);
                        arena.add_actor(actor)?;
                    }
                }
                arena.width = arena.width.max(x + 1);
            }
            arena.depth = arena.depth.max(z + 1);
        }

        if !player {
            return Err(CoreError::MissingPlayer);
        }
        Ok(arena)
    }

    // -----------------------------------------------------------------------
    // Terrain
    // -----------------------------------------------------------------------

    /// Mark a cell as solid.
    pub fn add_solid(&mut self, pos: GridPos) {
        self.solids.insert(pos);
    }

    /// Clear a solid cell.
    pub fn remove_solid(&mut self, pos: GridPos) {
        self.solids.remove(&pos);
    }

    /// Whether the cell is solid terrain.
    pub fn is_solid(&self, pos: GridPos) -> bool {
        self.solids.contains(&pos)
    }

    // -----------------------------------------------------------------------
    // Actors
    // -----------------------------------------------------------------------

    /// Add an actor. Fails if a living actor already stands on its cell.
    pub fn add_actor(&mut self, actor: Actor) -> CoreResult<ActorId> {
        if self.actor_at(actor.position).is_some() {
            return Err(CoreError::Occupied(actor.position));
        }
        let id = actor.id;
        self.index.insert(id, self.actors.len());
        self.actors.push(actor);
        Ok(id)
    }

    /// Look up an actor by ID.
    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.lookup(id).and_then(|i| self.actors.get(i))
    }

    /// Look up an actor mutably by ID.
    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.lookup(id).and_then(move |i| self.actors.get_mut(i))
    }

    /// All actors in insertion order, dead ones included.
    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    /// The first actor of kind [`ActorKind::Player`].
    pub fn player(&self) -> Option<&Actor> {
        self.actors.iter().find(|a| a.kind == ActorKind::Player)
    }

    /// Find an actor by case-insensitive name.
    pub fn find_by_name(&self, name: &str) -> Option<&Actor> {
        self.actors
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// The living actor standing on `pos`, if any.
    pub fn actor_at(&self, pos: GridPos) -> Option<&Actor> {
        self.actors
            .iter()
            .find(|a| a.position == pos && a.is_alive())
    }

    /// Living actors within `radius` (Euclidean) of `center`.
    pub fn actors_within(&self, center: GridPos, radius: f64) -> impl Iterator<Item = &Actor> {
        let limit = radius * radius;
        self.actors
            .iter()
            .filter(move |a| a.is_alive() && a.position.distance_squared(center) as f64 <= limit)
    }

    /// Move an actor to `pos` without any validity checks.
    pub fn teleport(&mut self, id: ActorId, pos: GridPos) -> CoreResult<()> {
        let actor = self.actor_mut(id).ok_or(CoreError::ActorNotFound(id))?;
        actor.position = pos;
        Ok(())
    }

    /// Deal damage to an actor. Returns its HP afterwards.
    pub fn apply_damage(&mut self, id: ActorId, amount: u32) -> CoreResult<u32> {
        let actor = self.actor_mut(id).ok_or(CoreError::ActorNotFound(id))?;
        Ok(actor.take_damage(amount))
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    /// Draw the walk layer as text: living actors over walls, floor, and pits.
    pub fn render(&self) -> String {
        let mut rows = Vec::with_capacity(self.depth.max(0) as usize);
        for z in 0..self.depth {
            let mut row = String::with_capacity(self.width.max(0) as usize);
            for x in 0..self.width {
                let walk = GridPos::new(x, WALK_Y, z);
                let glyph = if let Some(actor) = self.actor_at(walk) {
                    glyph_for(actor)
                } else if self.is_solid(walk) {
                    '#'
                } else if self.is_solid(GridPos::new(x, FLOOR_Y, z)) {
                    '.'
                } else {
                    '_'
                };
                row.push(glyph);
            }
            rows.push(row);
        }
        rows.join("\n")
    }

    fn lookup(&self, id: ActorId) -> Option<usize> {
        if let Some(&i) = self.index.get(&id) {
            return Some(i);
        }
        // Deserialized arenas arrive without the index.
        self.actors.iter().position(|a| a.id == id)
    }
}
