//! Public simulation driver
//!
//! The host feeds presence, input and frame times in; renderers read the
//! state back out after each `step`. Unknown or duplicate ids are ignored so
//! transport-layer races never panic the simulation.

use serde::Serialize;

use super::bounds::{Bounds, Viewport};
use super::policy::Policy;
use super::score::{MatchScore, Outcome, RoundState};
use super::state::{Ball, Cell, Entity, MatchContext, PlayerId, PlayerInput, PlayerRef, SimEvent};
use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};
use crate::standings::Standings;
use crate::tuning::{GameKind, Tuning};

/// Slack for float drift when draining the step accumulator
const STEP_EPSILON: f32 = 1e-6;

/// Read-only view of a match for renderers and the browser bridge
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<'a> {
    pub kind: GameKind,
    pub now: f64,
    pub bounds: &'a Bounds,
    pub entities: Vec<&'a Entity>,
    pub ball: Option<&'a Ball>,
    pub food: &'a [Cell],
    pub score: &'a MatchScore,
    pub round: RoundState,
    pub outcome: Option<Outcome>,
    pub events: &'a [SimEvent],
}

/// One running match of one game
#[derive(Debug)]
pub struct Simulation {
    kind: GameKind,
    tuning: Tuning,
    policy: Policy,
    ctx: MatchContext,
    /// Frame time not yet consumed by a whole `SIM_DT` tick
    accumulator: f32,
    /// Presence events raised between steps, published by the next `step`
    pending: Vec<SimEvent>,
}

impl Simulation {
    pub fn new(kind: GameKind, tuning: Tuning, viewport: Viewport, seed: u64) -> Self {
        let tuning = tuning.sanitized();
        let policy = Policy::for_kind(kind, &tuning);
        let bounds = Bounds::from_viewport(viewport, &tuning);
        let score = MatchScore::new(policy.win_score(), policy.rally_pause());
        let mut sim = Self {
            kind,
            tuning,
            policy,
            ctx: MatchContext::new(bounds, score, seed),
            accumulator: 0.0,
            pending: Vec::new(),
        };
        sim.policy.setup(&mut sim.ctx);
        log::info!(
            "{} match ready ({}x{}, seed {seed})",
            kind.as_str(),
            viewport.width,
            viewport.height
        );
        sim
    }

    pub fn on_entity_join(&mut self, player: PlayerRef) {
        let id = player.id;
        if self.ctx.entities.contains_key(&id) {
            log::debug!("Ignoring duplicate join for {id}");
            return;
        }
        self.policy.join(&mut self.ctx, player);
        self.pending.push(SimEvent::Joined { id });
    }

    pub fn on_entity_leave(&mut self, id: PlayerId) {
        if self.ctx.entities.remove(&id).is_none() {
            log::debug!("Ignoring leave for unknown {id}");
            return;
        }
        // Forget stale knockout credit pointing at the departed entity
        for entity in self.ctx.entities.values_mut() {
            if entity.last_contact.is_some_and(|(other, _)| other == id) {
                entity.last_contact = None;
            }
        }
        self.policy.after_leave(&mut self.ctx, id);
        self.pending.push(SimEvent::Left { id });
    }

    pub fn on_entity_input(&mut self, id: PlayerId, input: PlayerInput) {
        let Some(entity) = self.ctx.entities.get_mut(&id) else {
            return;
        };
        if entity.lifecycle.is_eliminated() {
            return;
        }
        self.policy.input(entity, input);
    }

    /// Rebuild all bounds for a new viewport size
    pub fn resize(&mut self, viewport: Viewport) {
        let old = self.ctx.bounds;
        self.ctx.bounds = Bounds::from_viewport(viewport, &self.tuning);
        if self.ctx.bounds != old {
            log::info!("Resized to {}x{}", viewport.width, viewport.height);
            self.policy.resize(&mut self.ctx, &old);
        }
    }

    /// Advance the match by a frame delta in seconds.
    ///
    /// The delta is clamped to [`MAX_FRAME_DT`] and banked; the match then
    /// runs as many whole [`SIM_DT`] ticks as the bank holds, carrying the
    /// remainder into the next call. Every tick has the same length, so
    /// friction and timers behave the same at any host frame rate.
    /// Events from the previous call are replaced by joins and leaves
    /// since then, followed by whatever this call raises.
    pub fn step(&mut self, dt: f32) {
        self.ctx.events.clear();
        self.ctx.events.append(&mut self.pending);
        if !dt.is_finite() || dt <= 0.0 || self.ctx.entities.is_empty() {
            return;
        }

        self.accumulator += dt.min(MAX_FRAME_DT);
        let mut substeps = 0;
        while self.accumulator + STEP_EPSILON >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.accumulator = (self.accumulator - SIM_DT).max(0.0);
            self.ctx.now += SIM_DT as f64;
            self.policy.tick(&mut self.ctx, SIM_DT);
            substeps += 1;
        }
        if substeps == MAX_SUBSTEPS {
            // Behind by more than the substep budget: drop the backlog
            self.accumulator = 0.0;
        }
    }

    /// Start a fresh match with the same players, in join order
    pub fn restart(&mut self) {
        let mut players: Vec<(u64, PlayerRef)> = self
            .ctx
            .entities
            .values()
            .map(|e| (e.join_order, e.player.clone()))
            .collect();
        players.sort_by_key(|(order, _)| *order);

        self.ctx.entities.clear();
        self.ctx.ball = None;
        self.ctx.food.clear();
        self.ctx.events.clear();
        self.accumulator = 0.0;
        self.ctx.score.reset();
        self.policy.setup(&mut self.ctx);
        for (_, player) in players {
            self.policy.join(&mut self.ctx, player);
        }
        log::info!("{} match restarted", self.kind.as_str());
    }

    pub fn kind(&self) -> GameKind {
        self.kind
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.ctx.entities.values()
    }

    pub fn entity(&self, id: PlayerId) -> Option<&Entity> {
        self.ctx.entities.get(&id)
    }

    pub fn ball(&self) -> Option<&Ball> {
        self.ctx.ball.as_ref()
    }

    pub fn food(&self) -> &[Cell] {
        &self.ctx.food
    }

    pub fn scores(&self) -> &MatchScore {
        &self.ctx.score
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.ctx.score.outcome()
    }

    pub fn is_game_over(&self) -> bool {
        self.ctx.score.is_game_over()
    }

    pub fn is_round_over(&self) -> bool {
        self.ctx.score.is_round_over()
    }

    /// Events raised during the last `step`, led by joins and leaves that
    /// happened before it
    pub fn events(&self) -> &[SimEvent] {
        &self.ctx.events
    }

    pub fn bounds(&self) -> &Bounds {
        &self.ctx.bounds
    }

    /// Simulation clock in seconds
    pub fn now(&self) -> f64 {
        self.ctx.now
    }

    pub fn standings(&self) -> Standings {
        Standings::from_entities(self.ctx.entities.values())
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            kind: self.kind,
            now: self.ctx.now,
            bounds: &self.ctx.bounds,
            entities: self.ctx.entities.values().collect(),
            ball: self.ctx.ball.as_ref(),
            food: &self.ctx.food,
            score: &self.ctx.score,
            round: self.ctx.score.round(),
            outcome: self.ctx.score.outcome(),
            events: &self.ctx.events,
        }
    }

    pub fn snapshot_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_default()
    }
}
