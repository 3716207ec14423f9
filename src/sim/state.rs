//! Simulation state and core data types
//!
//! Everything mutable lives in [`MatchContext`], owned by the driver and
//! handed by reference to whichever policy runs the tick.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::bounds::Bounds;
use super::lifecycle::Lifecycle;
use super::score::MatchScore;

/// Opaque player identity supplied by the transport layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Player metadata delivered at join time. Display-only; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub id: PlayerId,
    pub label: String,
    pub color: String,
}

impl PlayerRef {
    pub fn new(id: u64, label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: PlayerId(id),
            label: label.into(),
            color: color.into(),
        }
    }
}

/// Court half / team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// One sample from a controller
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerInput {
    /// Tilt vector, components in [-1, 1]
    pub axis: Vec2,
    /// Action button (jump/serve) currently down
    pub action: bool,
}

impl PlayerInput {
    pub fn tilt(x: f32, y: f32) -> Self {
        Self {
            axis: Vec2::new(x, y),
            action: false,
        }
    }

    pub fn with_action(mut self, action: bool) -> Self {
        self.action = action;
        self
    }
}

/// Latest input for an entity with edge detection on the action button
#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    pub axis: Vec2,
    action_held: bool,
    action_pending: bool,
}

impl InputState {
    pub fn apply(&mut self, input: PlayerInput) {
        let sanitize = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        self.axis = Vec2::new(sanitize(input.axis.x), sanitize(input.axis.y));
        if input.action && !self.action_held {
            self.action_pending = true;
        }
        self.action_held = input.action;
    }

    /// Consume a pending press; true at most once per press
    pub fn take_action(&mut self) -> bool {
        std::mem::take(&mut self.action_pending)
    }

    /// Forget held tilt and any unconsumed press
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A car, slime or snake owner
#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    pub player: PlayerRef,
    /// Join sequence number, used to break ties on the scoreboard
    pub join_order: u64,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Heading in radians
    pub angle: f32,
    pub side: Option<Side>,
    pub lifecycle: Lifecycle,
    pub lives: u32,
    /// Points, knockouts or food eaten, depending on the game
    pub score: u32,
    /// Collisions / ball touches
    pub hits: u32,
    pub on_ground: bool,
    pub snake: Option<Snake>,
    #[serde(skip)]
    pub input: InputState,
    /// Last entity touched and when, for knockout credit
    #[serde(skip)]
    pub last_contact: Option<(PlayerId, f64)>,
}

impl Entity {
    pub fn new(player: PlayerRef, join_order: u64, pos: Vec2, lives: u32) -> Self {
        Self {
            player,
            join_order,
            pos,
            vel: Vec2::ZERO,
            angle: 0.0,
            side: None,
            lifecycle: Lifecycle::Active,
            lives,
            score: 0,
            hits: 0,
            on_ground: false,
            snake: None,
            input: InputState::default(),
            last_contact: None,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.player.id
    }
}

/// Where the ball is in a rally
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum BallPhase {
    /// Hanging above the serving side, frozen until touched
    AwaitingServe,
    /// In play
    Live,
    /// Landed or left the court; rests until the rally reset
    Dead,
}

/// The volleyball
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub phase: BallPhase,
    /// Side that touched the ball last
    pub last_touch: Option<Side>,
}

impl Ball {
    pub fn new(pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            radius,
            phase: BallPhase::AwaitingServe,
            last_touch: None,
        }
    }
}

/// Grid heading (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Heading as an angle, for renderers that rotate the head sprite
    pub fn angle(self) -> f32 {
        let (dx, dy) = self.delta();
        (dy as f32).atan2(dx as f32)
    }

    /// Map a tilt vector to a heading along its dominant axis
    pub fn from_tilt(axis: Vec2, threshold: f32) -> Option<Self> {
        if axis.x.abs() > axis.y.abs() {
            if axis.x < -threshold {
                Some(Direction::Left)
            } else if axis.x > threshold {
                Some(Direction::Right)
            } else {
                None
            }
        } else if axis.y < -threshold {
            Some(Direction::Up)
        } else if axis.y > threshold {
            Some(Direction::Down)
        } else {
            None
        }
    }
}

/// A grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx, self.y + dy)
    }
}

/// A snake body, head first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snake {
    pub body: VecDeque<Cell>,
    pub heading: Direction,
    /// Applied at the next grid step
    pub pending: Direction,
    pub alive: bool,
}

impl Snake {
    /// Build a straight snake with its head at `head`, trailing away from `heading`
    pub fn new(head: Cell, heading: Direction, length: usize) -> Self {
        let back = heading.opposite();
        let mut body = VecDeque::with_capacity(length);
        let mut cell = head;
        for _ in 0..length.max(1) {
            body.push_back(cell);
            cell = cell.step(back);
        }
        Self {
            body,
            heading,
            pending: heading,
            alive: true,
        }
    }

    pub fn head(&self) -> Option<Cell> {
        self.body.front().copied()
    }

    /// True if turning to `dir` would drive the head into the segment behind it
    pub fn reverses(&self, dir: Direction) -> bool {
        match (self.body.front(), self.body.get(1)) {
            (Some(&head), Some(&neck)) => head.step(dir) == neck,
            _ => false,
        }
    }

    /// Queue a heading for the next step; reversals are rejected
    pub fn queue_heading(&mut self, dir: Direction) -> bool {
        if self.reverses(dir) {
            return false;
        }
        self.pending = dir;
        true
    }

    pub fn occupies(&self, cell: Cell) -> bool {
        self.body.contains(&cell)
    }
}

/// Things that happened during the last `step`, for renderers and sound
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    Joined { id: PlayerId },
    Left { id: PlayerId },
    Collision { a: PlayerId, b: PlayerId, impact: f32 },
    Fell { id: PlayerId },
    Knockout { by: PlayerId, victim: PlayerId },
    Respawned { id: PlayerId },
    Eliminated { id: PlayerId },
    BallTouched { id: PlayerId, side: Side },
    Served { id: PlayerId },
    NetHit,
    PointScored { side: Side },
    RoundReset { serving: Side },
    Ate { id: PlayerId },
    Died { id: PlayerId },
    GameOver { winner: Option<String> },
}

/// All per-match mutable state
#[derive(Debug)]
pub struct MatchContext {
    /// Simulation clock in seconds
    pub now: f64,
    pub bounds: Bounds,
    /// Sorted by id for deterministic iteration
    pub entities: BTreeMap<PlayerId, Entity>,
    pub ball: Option<Ball>,
    pub food: Vec<Cell>,
    pub score: MatchScore,
    pub events: Vec<SimEvent>,
    pub rng: Pcg32,
    /// Time the current match started (grid ramp-up is measured from here)
    pub started_at: f64,
    next_join_order: u64,
}

impl MatchContext {
    pub fn new(bounds: Bounds, score: MatchScore, seed: u64) -> Self {
        Self {
            now: 0.0,
            bounds,
            entities: BTreeMap::new(),
            ball: None,
            food: Vec::new(),
            score,
            events: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            started_at: 0.0,
            next_join_order: 0,
        }
    }

    pub fn emit(&mut self, event: SimEvent) {
        log::debug!("{:.3}s {:?}", self.now, event);
        self.events.push(event);
    }

    pub fn next_join_order(&mut self) -> u64 {
        let order = self.next_join_order;
        self.next_join_order += 1;
        order
    }

    /// Number of current entities on a side
    pub fn side_count(&self, side: Side) -> usize {
        self.entities
            .values()
            .filter(|e| e.side == Some(side))
            .count()
    }

    /// Entities still in the match
    pub fn survivors(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(|e| e.lifecycle.is_alive())
    }

    /// Is any live snake body or food on this cell
    pub fn cell_occupied(&self, cell: Cell) -> bool {
        self.food.contains(&cell)
            || self
                .entities
                .values()
                .filter_map(|e| e.snake.as_ref())
                .any(|s| s.alive && s.occupies(cell))
    }
}
