//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed-size micro-steps only
//! - Seeded RNG only
//! - Stable iteration order (by player ID)
//! - No rendering or platform dependencies

pub mod arena;
pub mod bounds;
pub mod collision;
pub mod driver;
pub mod grid;
pub mod lifecycle;
pub mod net_sport;
pub mod policy;
pub mod score;
pub mod state;

pub use bounds::{ArenaBounds, Bounds, CourtBounds, GridBounds, Viewport};
pub use collision::{Contact, circle_overlap, clamp_magnitude, reflect, resolve_elastic_collision};
pub use driver::{Simulation, Snapshot};
pub use lifecycle::Lifecycle;
pub use policy::Policy;
pub use score::{MatchScore, Outcome, RoundState};
pub use state::{
    Ball, BallPhase, Cell, Direction, Entity, MatchContext, PlayerId, PlayerInput, PlayerRef,
    SimEvent, Side, Snake,
};
