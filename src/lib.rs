//! Tilt Arena - real-time simulation core for phone-tilt party games
//!
//! Core modules:
//! - `sim`: Simulation core (collision math, entity lifecycle, per-game policies, driver)
//! - `tuning`: Data-driven game balance
//! - `standings`: Ranked scoreboard for HUDs
//! - `platform`: Browser bridge (wasm32 only)

pub mod platform;
pub mod sim;
pub mod standings;
pub mod tuning;

pub use sim::{PlayerId, PlayerInput, PlayerRef, Simulation, Viewport};
pub use standings::Standings;
pub use tuning::{GameKind, Tuning};

use glam::Vec2;

/// Simulation timing constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz for smooth physics)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 16;
    /// Largest frame delta accepted by `Simulation::step` (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}
