//! Per-game rule sets behind one tagged enum
//!
//! The driver owns exactly one [`Policy`] and forwards every lifecycle
//! callback to it; all three games share the same [`MatchContext`].

use super::arena::ArenaRules;
use super::bounds::Bounds;
use super::grid::GridRules;
use super::net_sport::NetSportRules;
use super::state::{Entity, MatchContext, PlayerId, PlayerInput, PlayerRef};
use crate::tuning::{GameKind, Tuning};

#[derive(Debug, Clone)]
pub enum Policy {
    Arena(ArenaRules),
    NetSport(NetSportRules),
    Grid(GridRules),
}

impl Policy {
    pub fn for_kind(kind: GameKind, tuning: &Tuning) -> Self {
        match kind {
            GameKind::BumperCars => Policy::Arena(ArenaRules::new(tuning.arena.clone())),
            GameKind::Volleyball => Policy::NetSport(NetSportRules::new(tuning.net_sport.clone())),
            GameKind::Snake => Policy::Grid(GridRules::new(tuning.grid.clone())),
        }
    }

    pub fn kind(&self) -> GameKind {
        match self {
            Policy::Arena(_) => GameKind::BumperCars,
            Policy::NetSport(_) => GameKind::Volleyball,
            Policy::Grid(_) => GameKind::Snake,
        }
    }

    /// Prepare an empty match (ball, food)
    pub fn setup(&mut self, ctx: &mut MatchContext) {
        match self {
            Policy::Arena(_) => {}
            Policy::NetSport(rules) => rules.setup(ctx),
            Policy::Grid(rules) => rules.setup(ctx),
        }
    }

    pub fn join(&mut self, ctx: &mut MatchContext, player: PlayerRef) {
        match self {
            Policy::Arena(rules) => rules.join(ctx, player),
            Policy::NetSport(rules) => rules.join(ctx, player),
            Policy::Grid(rules) => rules.join(ctx, player),
        }
    }

    /// Called after `id` has been removed from the context
    pub fn after_leave(&mut self, ctx: &mut MatchContext, id: PlayerId) {
        log::debug!("{id} removed from {}", self.kind().as_str());
        if let Policy::NetSport(rules) = self {
            rules.after_leave(ctx);
        }
    }

    pub fn input(&self, entity: &mut Entity, input: PlayerInput) {
        match self {
            Policy::Arena(rules) => rules.input(entity, input),
            Policy::NetSport(rules) => rules.input(entity, input),
            Policy::Grid(rules) => rules.input(entity, input),
        }
    }

    pub fn tick(&mut self, ctx: &mut MatchContext, dt: f32) {
        match self {
            Policy::Arena(rules) => rules.tick(ctx, dt),
            Policy::NetSport(rules) => rules.tick(ctx, dt),
            Policy::Grid(rules) => rules.tick(ctx, dt),
        }
    }

    /// `ctx.bounds` already holds the new bounds
    pub fn resize(&mut self, ctx: &mut MatchContext, old: &Bounds) {
        match self {
            Policy::Arena(rules) => rules.resize(ctx, old),
            Policy::NetSport(rules) => rules.resize(ctx),
            Policy::Grid(rules) => rules.resize(ctx, old),
        }
    }

    /// Points needed to win, where the game has a score target
    pub fn win_score(&self) -> u32 {
        match self {
            Policy::NetSport(rules) => rules.tuning().win_score,
            _ => u32::MAX,
        }
    }

    pub fn rally_pause(&self) -> f32 {
        match self {
            Policy::NetSport(rules) => rules.tuning().rally_pause,
            _ => 0.0,
        }
    }
}
