//! Entity lifecycle shared by cars, slimes and snakes
//!
//! Timers are absolute deadlines in simulation seconds; the owning policy
//! polls them every tick with the current timestamp.

use serde::{Deserialize, Serialize};

/// Where an entity is in its life
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Lifecycle {
    /// Controllable and collidable
    #[default]
    Active,
    /// Active, but invulnerable and steered away from walls until `until`
    Learning { until: f64 },
    /// Falling off / dying animation; ignores input and collisions
    Falling { until: f64 },
    /// Waiting to be placed back in play
    Respawning { until: f64 },
    /// Out of lives; kept for the scoreboard only
    Eliminated,
}

/// Result of a timer expiring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Fall finished with lives remaining
    Respawning,
    /// Fall finished on the last life
    Eliminated,
    /// Learning window ran out
    Graduated,
}

impl Lifecycle {
    /// Reads input this tick
    pub fn is_controllable(&self) -> bool {
        matches!(self, Lifecycle::Active | Lifecycle::Learning { .. })
    }

    /// Takes part in entity-entity and boundary checks
    pub fn is_collidable(&self) -> bool {
        self.is_controllable()
    }

    pub fn is_invulnerable(&self) -> bool {
        matches!(self, Lifecycle::Learning { .. })
    }

    pub fn is_eliminated(&self) -> bool {
        matches!(self, Lifecycle::Eliminated)
    }

    /// Still in the match (anything but eliminated)
    pub fn is_alive(&self) -> bool {
        !self.is_eliminated()
    }

    /// Start the falling/dying animation.
    ///
    /// Only an active, non-invulnerable entity can start falling; returns
    /// `true` exactly once per fall no matter how often it is called.
    pub fn begin_fall(&mut self, now: f64, duration: f32) -> bool {
        match self {
            Lifecycle::Active => {
                *self = Lifecycle::Falling {
                    until: now + duration as f64,
                };
                true
            }
            _ => false,
        }
    }

    /// Advance expired timers.
    ///
    /// A finished fall costs one life; with none left the entity is
    /// eliminated, otherwise it waits `respawn_delay` seconds. Respawning
    /// itself is left to the caller via [`Lifecycle::respawn_due`] and
    /// [`Lifecycle::revive`], since it needs a free spot to land on.
    pub fn poll(&mut self, now: f64, lives: &mut u32, respawn_delay: f32) -> Option<Transition> {
        match *self {
            Lifecycle::Falling { until } if now >= until => {
                *lives = lives.saturating_sub(1);
                if *lives == 0 {
                    *self = Lifecycle::Eliminated;
                    Some(Transition::Eliminated)
                } else {
                    *self = Lifecycle::Respawning {
                        until: now + respawn_delay as f64,
                    };
                    Some(Transition::Respawning)
                }
            }
            Lifecycle::Learning { until } if now >= until => {
                *self = Lifecycle::Active;
                Some(Transition::Graduated)
            }
            _ => None,
        }
    }

    /// Respawn delay has elapsed and the entity may be placed again
    pub fn respawn_due(&self, now: f64) -> bool {
        matches!(*self, Lifecycle::Respawning { until } if now >= until)
    }

    /// Put a respawning entity back in play, optionally with a learning
    /// window. No-op from any other state.
    pub fn revive(&mut self, now: f64, learning: Option<f32>) -> bool {
        if !matches!(self, Lifecycle::Respawning { .. }) {
            return false;
        }
        *self = match learning {
            Some(secs) if secs > 0.0 => Lifecycle::Learning {
                until: now + secs as f64,
            },
            _ => Lifecycle::Active,
        };
        true
    }
}
