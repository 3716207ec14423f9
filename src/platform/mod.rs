//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Logger and panic hook setup
//! - The JavaScript-facing simulation wrapper (wasm32 only)
//! - Seeding from the host clock

#[cfg(target_arch = "wasm32")]
mod web;
#[cfg(target_arch = "wasm32")]
pub use web::WebSimulation;

use crate::sim::{PlayerId, PlayerInput};
use crate::tuning::GameKind;

/// Install the platform logger. Safe to call more than once.
pub fn init_logging() {
    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        // Already installed by an earlier simulation on the page
        let _ = console_log::init_with_level(log::Level::Info);
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init();
    }
}

/// Seed derived from the host clock
pub fn clock_seed() -> u64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now() as u64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Resolve a game name from the host, defaulting to bumper cars
pub fn parse_kind(name: &str) -> GameKind {
    GameKind::from_str(name).unwrap_or_else(|| {
        log::warn!("Unknown game '{name}', defaulting to {}", GameKind::default().as_str());
        GameKind::default()
    })
}

/// Controller sample as delivered by the transport layer
pub fn controller_input(id: u32, x: f32, y: f32, action: bool) -> (PlayerId, PlayerInput) {
    (PlayerId(id as u64), PlayerInput::tilt(x, y).with_action(action))
}
