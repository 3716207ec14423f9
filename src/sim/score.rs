//! Match and round bookkeeping
//!
//! Point scoring and game-over are latched: once a rally or the match has
//! ended, repeated checks report nothing new and never double count.

use std::fmt;

use serde::Serialize;

use super::state::{PlayerId, Side};

/// How a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "winner", rename_all = "snake_case")]
pub enum Outcome {
    /// A team reached the winning score
    Side(Side),
    /// Last entity standing
    Player(PlayerId),
    /// Nobody left standing
    Draw,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Side(side) => write!(f, "{}", side.as_str()),
            Outcome::Player(id) => write!(f, "{id}"),
            Outcome::Draw => write!(f, "draw"),
        }
    }
}

/// Whether a rally is being played or the post-point pause is running
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RoundState {
    InPlay,
    Paused { until: f64 },
}

/// Scores, serve ownership and the round/game latches
#[derive(Debug, Clone, Serialize)]
pub struct MatchScore {
    pub left: u32,
    pub right: u32,
    pub win_score: u32,
    pub serving: Side,
    pub rally_pause: f32,
    round: RoundState,
    outcome: Option<Outcome>,
}

impl MatchScore {
    pub fn new(win_score: u32, rally_pause: f32) -> Self {
        Self {
            left: 0,
            right: 0,
            win_score,
            serving: Side::Left,
            rally_pause,
            round: RoundState::InPlay,
            outcome: None,
        }
    }

    pub fn points(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn round(&self) -> RoundState {
        self.round
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn is_round_over(&self) -> bool {
        matches!(self.round, RoundState::Paused { .. })
    }

    pub fn is_game_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Credit a point and start the rally pause.
    ///
    /// Ignored while a rally is already over or the match is decided; returns
    /// whether the point counted. The scoring side serves next.
    pub fn award_point(&mut self, side: Side, now: f64) -> bool {
        if self.is_game_over() || self.is_round_over() {
            return false;
        }
        match side {
            Side::Left => self.left += 1,
            Side::Right => self.right += 1,
        }
        self.serving = side;
        self.round = RoundState::Paused {
            until: now + self.rally_pause as f64,
        };
        log::info!(
            "Point for {}! Score: {} - {}",
            side.as_str(),
            self.left,
            self.right
        );
        true
    }

    /// Latch a side winner once a score reaches the threshold.
    ///
    /// Returns the outcome only on the call that latches it.
    pub fn check_side_winner(&mut self) -> Option<Outcome> {
        if self.is_game_over() {
            return None;
        }
        let winner = [Side::Left, Side::Right]
            .into_iter()
            .find(|&side| self.points(side) >= self.win_score)?;
        self.latch(Outcome::Side(winner))
    }

    /// Latch a last-one-standing result.
    ///
    /// With two or more entities the match ends when at most one survives;
    /// a solo player's match ends only when they are gone too. Returns the
    /// outcome only on the call that latches it.
    pub fn check_survivors(&mut self, total: usize, survivors: &[PlayerId]) -> Option<Outcome> {
        if self.is_game_over() || total == 0 {
            return None;
        }
        let outcome = match (total, survivors) {
            (1, []) => Outcome::Draw,
            (1, _) => return None,
            (_, [only]) => Outcome::Player(*only),
            (_, []) => Outcome::Draw,
            _ => return None,
        };
        self.latch(outcome)
    }

    /// End the rally pause once it has elapsed. Returns true exactly once
    /// per pause; a decided match stays paused.
    pub fn poll_round(&mut self, now: f64) -> bool {
        match self.round {
            RoundState::Paused { until } if now >= until && !self.is_game_over() => {
                self.round = RoundState::InPlay;
                true
            }
            _ => false,
        }
    }

    /// Fresh match, same rules
    pub fn reset(&mut self) {
        *self = Self::new(self.win_score, self.rally_pause);
    }

    fn latch(&mut self, outcome: Outcome) -> Option<Outcome> {
        log::info!("Game over: {outcome}");
        self.outcome = Some(outcome);
        Some(outcome)
    }
}
