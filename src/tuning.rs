//! Game tuning and presets
//!
//! Loaded from JSON supplied by the host page; every field falls back to the
//! defaults of the shipped games.

use serde::{Deserialize, Serialize};

/// Which of the party games a simulation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum GameKind {
    /// Sumo arena: push other cars off the platform
    #[default]
    BumperCars,
    /// Slime volleyball across a net
    Volleyball,
    /// Multiplayer grid snake
    Snake,
}

impl GameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::BumperCars => "bumper-cars",
            GameKind::Volleyball => "volleyball",
            GameKind::Snake => "snake",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bumper-cars" | "bumper" | "sumo" => Some(GameKind::BumperCars),
            "volleyball" | "beach-volleyball" | "slime" => Some(GameKind::Volleyball),
            "snake" => Some(GameKind::Snake),
            _ => None,
        }
    }
}

/// Sumo arena tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaTuning {
    /// Arena radius as a fraction of the shorter viewport side
    pub radius_fraction: f32,
    pub car_radius: f32,
    /// Units/s²
    pub acceleration: f32,
    /// Multiplicative velocity decay applied every tick
    pub friction: f32,
    pub max_speed: f32,
    /// Extra separation speed per unit of approach speed on impact
    pub push_factor: f32,
    /// Cars slower than this keep their previous heading
    pub turn_speed_threshold: f32,
    pub lives: u32,
    pub fall_duration: f32,
    pub respawn_delay: f32,
    /// A fall this soon after a contact credits the other car with a knockout
    pub knockout_window: f32,
    /// Spawns land within this fraction of the arena radius
    pub spawn_fraction: f32,
    pub spawn_attempts: u32,
}

impl Default for ArenaTuning {
    fn default() -> Self {
        Self {
            radius_fraction: 0.45,
            car_radius: 40.0,
            acceleration: 600.0,
            friction: 0.99,
            max_speed: 400.0,
            push_factor: 0.5,
            turn_speed_threshold: 10.0,
            lives: 3,
            fall_duration: 0.8,
            respawn_delay: 1.5,
            knockout_window: 3.0,
            spawn_fraction: 0.5,
            spawn_attempts: 32,
        }
    }
}

/// Slime volleyball tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetSportTuning {
    /// Court inset from the viewport edges
    pub padding: f32,
    /// Extra inset at the top (room for the score)
    pub header: f32,
    /// Net height as a fraction of the court height
    pub net_height_fraction: f32,
    pub net_half_width: f32,
    /// Fraction of horizontal speed kept when the ball hits the net
    pub net_restitution: f32,
    pub slime_radius: f32,
    pub move_speed: f32,
    pub gravity: f32,
    pub jump_impulse: f32,
    pub ball_radius: f32,
    pub ball_gravity: f32,
    pub ball_max_speed: f32,
    pub hit_force: f32,
    /// Share of the slime's horizontal speed carried into a hit
    pub carry_factor: f32,
    /// Every hit leaves the ball rising at least this fast
    pub min_upward_speed: f32,
    /// Vertical slack below a slime's centre that still counts as its top half
    pub contact_epsilon: f32,
    pub ceiling_bounce: f32,
    pub win_score: u32,
    pub rally_pause: f32,
    /// Height of the waiting ball above the ground, as a fraction of the court height
    pub serve_height_fraction: f32,
}

impl Default for NetSportTuning {
    fn default() -> Self {
        Self {
            padding: 50.0,
            header: 60.0,
            net_height_fraction: 0.35,
            net_half_width: 5.0,
            net_restitution: 0.5,
            slime_radius: 35.0,
            move_speed: 400.0,
            gravity: 1800.0,
            jump_impulse: 800.0,
            ball_radius: 20.0,
            ball_gravity: 600.0,
            ball_max_speed: 800.0,
            hit_force: 500.0,
            carry_factor: 0.5,
            min_upward_speed: 350.0,
            contact_epsilon: 2.0,
            ceiling_bounce: 0.75,
            win_score: 5,
            rally_pause: 1.5,
            serve_height_fraction: 0.4,
        }
    }
}

/// Grid snake tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridTuning {
    pub cell_size: f32,
    /// Seconds between moves once the ramp-up is over
    pub step_interval: f32,
    /// Seconds between moves at match start
    pub ramp_start_interval: f32,
    /// Seconds over which the interval eases from slow to nominal
    pub ramp_duration: f32,
    pub food_count: usize,
    /// Food never spawns closer than this many cells to a wall
    pub food_margin: i32,
    pub food_attempts: u32,
    pub spawn_margin: i32,
    pub spawn_attempts: u32,
    pub initial_length: usize,
    /// Post-join invulnerability with wall avoidance
    pub learning_duration: f32,
    pub tilt_threshold: f32,
    pub lives: u32,
    pub death_duration: f32,
    pub respawn_delay: f32,
}

impl Default for GridTuning {
    fn default() -> Self {
        Self {
            cell_size: 20.0,
            step_interval: 0.1,
            ramp_start_interval: 0.25,
            ramp_duration: 5.0,
            food_count: 3,
            food_margin: 2,
            food_attempts: 100,
            spawn_margin: 5,
            spawn_attempts: 50,
            initial_length: 3,
            learning_duration: 3.0,
            tilt_threshold: 0.3,
            lives: 1,
            death_duration: 0.6,
            respawn_delay: 2.0,
        }
    }
}

/// All tuning for a simulation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub arena: ArenaTuning,
    pub net_sport: NetSportTuning,
    pub grid: GridTuning,
}

impl Tuning {
    /// Parse tuning from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Tuning>(json).map(Tuning::sanitized)
    }

    /// Parse tuning, falling back to defaults on malformed input
    pub fn load_or_default(json: Option<&str>) -> Self {
        match json.map(Self::from_json) {
            Some(Ok(tuning)) => {
                log::info!("Loaded tuning overrides");
                tuning
            }
            Some(Err(err)) => {
                log::warn!("Ignoring malformed tuning ({err}), using defaults");
                Self::default()
            }
            None => Self::default(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Clamp values the simulation cannot work with
    pub fn sanitized(mut self) -> Self {
        let a = &mut self.arena;
        if !(a.friction > 0.0 && a.friction <= 1.0) {
            log::warn!("arena.friction {} out of (0, 1], using 1.0", a.friction);
            a.friction = 1.0;
        }
        a.car_radius = positive_or("arena.car_radius", a.car_radius, 40.0);
        a.max_speed = positive_or("arena.max_speed", a.max_speed, 400.0);
        a.push_factor = a.push_factor.max(0.0);
        a.lives = a.lives.max(1);

        let n = &mut self.net_sport;
        n.slime_radius = positive_or("net_sport.slime_radius", n.slime_radius, 35.0);
        n.ball_radius = positive_or("net_sport.ball_radius", n.ball_radius, 20.0);
        n.ball_max_speed = positive_or("net_sport.ball_max_speed", n.ball_max_speed, 800.0);
        if n.min_upward_speed > n.ball_max_speed {
            log::warn!(
                "net_sport.min_upward_speed {} above ball_max_speed, clamping",
                n.min_upward_speed
            );
            n.min_upward_speed = n.ball_max_speed;
        }
        n.min_upward_speed = n.min_upward_speed.max(0.0);
        n.win_score = n.win_score.max(1);

        let g = &mut self.grid;
        g.cell_size = positive_or("grid.cell_size", g.cell_size, 20.0);
        g.step_interval = positive_or("grid.step_interval", g.step_interval, 0.1);
        g.ramp_start_interval = g.ramp_start_interval.max(g.step_interval);
        g.initial_length = g.initial_length.max(2);
        g.lives = g.lives.max(1);

        self
    }
}

fn positive_or(name: &str, value: f32, fallback: f32) -> f32 {
    if value > 0.0 && value.is_finite() {
        value
    } else {
        log::warn!("{name} must be positive (got {value}), using {fallback}");
        fallback
    }
}
