//! Slime volleyball: two teams, one ball, a net in the middle
//!
//! Slimes are half-discs resting on the ground line. They slide with the
//! tilt vector and jump on the action button. The ball only reacts to the
//! domed upper half of a slime, always leaves a touch heading upward, and
//! scores for the other team when it lands.

use glam::Vec2;

use super::bounds::Bounds;
use super::collision::{SEPARATION_SLOP, circle_overlap, clamp_magnitude, reflect};
use super::state::{Ball, BallPhase, Entity, MatchContext, PlayerId, PlayerInput, PlayerRef, SimEvent, Side};
use crate::tuning::NetSportTuning;

#[derive(Debug, Clone)]
pub struct NetSportRules {
    tuning: NetSportTuning,
}

impl NetSportRules {
    pub fn new(tuning: NetSportTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &NetSportTuning {
        &self.tuning
    }

    pub fn setup(&self, ctx: &mut MatchContext) {
        self.reset_ball(ctx);
    }

    /// Join the smaller team (left on a tie)
    pub fn join(&self, ctx: &mut MatchContext, player: PlayerRef) {
        let side = if ctx.side_count(Side::Left) <= ctx.side_count(Side::Right) {
            Side::Left
        } else {
            Side::Right
        };
        let order = ctx.next_join_order();
        let slot = ctx.side_count(side);
        let pos = self.slot_position(&ctx.bounds, side, slot);

        let mut slime = Entity::new(player, order, pos, 1);
        slime.side = Some(side);
        slime.on_ground = true;
        log::info!("{} joins the {} team", slime.player.label, side.as_str());
        ctx.entities.insert(slime.id(), slime);

        self.rebalance_serve(ctx);
    }

    pub fn after_leave(&self, ctx: &mut MatchContext) {
        self.rebalance_serve(ctx);
    }

    pub fn input(&self, slime: &mut Entity, input: PlayerInput) {
        slime.input.apply(input);
    }

    pub fn tick(&self, ctx: &mut MatchContext, dt: f32) {
        if ctx.score.is_game_over() {
            return;
        }
        if ctx.score.poll_round(ctx.now) {
            self.reset_ball(ctx);
            let serving = ctx.score.serving;
            ctx.emit(SimEvent::RoundReset { serving });
        }

        self.move_slimes(ctx, dt);
        self.move_ball(ctx, dt);
        self.touch_ball(ctx);
        self.check_landing(ctx);
    }

    fn move_slimes(&self, ctx: &mut MatchContext, dt: f32) {
        let t = &self.tuning;
        let court = ctx.bounds.court;
        for slime in ctx.entities.values_mut() {
            if !slime.lifecycle.is_controllable() {
                continue;
            }
            let Some(side) = slime.side else { continue };

            slime.vel.x = slime.input.axis.x * t.move_speed;
            // Presses in mid-air are consumed and dropped
            if slime.input.take_action() && slime.on_ground {
                slime.vel.y = -t.jump_impulse;
                slime.on_ground = false;
            }
            slime.vel.y += t.gravity * dt;
            slime.pos += slime.vel * dt;

            let (lo, hi) = court.half_range(side, t.slime_radius, t.net_half_width);
            slime.pos.x = slime.pos.x.clamp(lo, hi);
            if slime.pos.y >= court.ground {
                slime.pos.y = court.ground;
                slime.vel.y = 0.0;
                slime.on_ground = true;
            }
            if slime.pos.y - t.slime_radius < court.top {
                slime.pos.y = court.top + t.slime_radius;
                slime.vel.y = slime.vel.y.max(0.0);
            }
            if slime.vel.x.abs() > 1.0 {
                slime.angle = if slime.vel.x > 0.0 { 0.0 } else { std::f32::consts::PI };
            }
        }
    }

    fn move_ball(&self, ctx: &mut MatchContext, dt: f32) {
        let t = &self.tuning;
        let court = ctx.bounds.court;
        let Some(ball) = ctx.ball.as_mut() else { return };
        if ball.phase != BallPhase::Live {
            return;
        }

        let prev_x = ball.pos.x;
        ball.vel.y += t.ball_gravity * dt;
        ball.vel = clamp_magnitude(ball.vel, t.ball_max_speed);
        ball.pos += ball.vel * dt;

        // Ceiling
        if ball.pos.y - ball.radius < court.top {
            ball.pos.y = court.top + ball.radius;
            ball.vel.y = ball.vel.y.abs() * t.ceiling_bounce;
        }

        // Net: a thin post from net_top down to the ground
        let reach = ball.radius + t.net_half_width;
        let mut net_hit = false;
        if (ball.pos.x - court.net_x).abs() < reach && ball.pos.y + ball.radius > court.net_top {
            let from = court.side_of(prev_x);
            let toward_net = match from {
                Side::Left => ball.vel.x > 0.0,
                Side::Right => ball.vel.x < 0.0,
            };
            if toward_net {
                ball.vel.x = -ball.vel.x * t.net_restitution;
                net_hit = true;
            }
            ball.pos.x = match from {
                Side::Left => court.net_x - reach,
                Side::Right => court.net_x + reach,
            };
        }
        if net_hit {
            ctx.emit(SimEvent::NetHit);
        }
    }

    fn touch_ball(&self, ctx: &mut MatchContext) {
        let t = &self.tuning;
        let Some(ball) = ctx.ball.as_mut() else { return };
        if ball.phase == BallPhase::Dead {
            return;
        }

        let practice = ctx.entities.len() == 1;
        let serving = ctx.score.serving;
        let mut touched: Option<(PlayerId, Side, bool)> = None;

        for slime in ctx.entities.values_mut() {
            if !slime.lifecycle.is_collidable() {
                continue;
            }
            let Some(side) = slime.side else { continue };
            if ball.phase == BallPhase::AwaitingServe && !practice && side != serving {
                continue;
            }
            // Only the dome counts; the flat underside never touches
            if ball.pos.y >= slime.pos.y + t.contact_epsilon {
                continue;
            }
            let Some(contact) = circle_overlap(slime.pos, t.slime_radius, ball.pos, ball.radius)
            else {
                continue;
            };

            let n = contact.normal;
            ball.pos = slime.pos + n * (t.slime_radius + ball.radius + SEPARATION_SLOP);

            let mut vel = ball.vel;
            if (ball.vel - slime.vel).dot(n) < 0.0 {
                vel = reflect(vel, n);
            }
            vel += n * t.hit_force;
            vel.x += slime.vel.x * t.carry_factor;
            ball.vel = self.shape_rebound(vel);

            let serve = ball.phase == BallPhase::AwaitingServe;
            ball.phase = BallPhase::Live;
            ball.last_touch = Some(side);
            slime.hits += 1;
            touched = Some((slime.id(), side, serve));
            break;
        }

        if let Some((id, side, serve)) = touched {
            if serve {
                ctx.emit(SimEvent::Served { id });
            }
            ctx.emit(SimEvent::BallTouched { id, side });
        }
    }

    /// Cap the speed and guarantee the ball leaves heading upward
    fn shape_rebound(&self, vel: Vec2) -> Vec2 {
        let t = &self.tuning;
        let mut v = clamp_magnitude(vel, t.ball_max_speed);
        if v.y > -t.min_upward_speed {
            v.y = -t.min_upward_speed;
        }
        let max_x = (t.ball_max_speed.powi(2) - t.min_upward_speed.powi(2)).max(0.0).sqrt();
        v.x = v.x.clamp(-max_x, max_x);
        v
    }

    fn check_landing(&self, ctx: &mut MatchContext) {
        let court = ctx.bounds.court;
        let Some(ball) = ctx.ball.as_mut() else { return };
        if ball.phase != BallPhase::Live {
            return;
        }

        let scorer = if ball.pos.x < court.left {
            Some(Side::Right)
        } else if ball.pos.x > court.right {
            Some(Side::Left)
        } else if ball.pos.y + ball.radius >= court.ground {
            ball.pos.y = court.ground - ball.radius;
            Some(court.side_of(ball.pos.x).opposite())
        } else {
            None
        };
        let Some(side) = scorer else { return };

        ball.phase = BallPhase::Dead;
        ball.vel = Vec2::ZERO;
        if ctx.score.award_point(side, ctx.now) {
            ctx.emit(SimEvent::PointScored { side });
            if let Some(outcome) = ctx.score.check_side_winner() {
                ctx.emit(SimEvent::GameOver {
                    winner: Some(outcome.to_string()),
                });
            }
        }
    }

    /// Ball back above the serving side, which passes to the other team if
    /// the serving team is empty
    fn reset_ball(&self, ctx: &mut MatchContext) {
        let serving = ctx.score.serving;
        if ctx.side_count(serving) == 0 && ctx.side_count(serving.opposite()) > 0 {
            ctx.score.serving = serving.opposite();
        }
        let pos = self.serve_position(&ctx.bounds, ctx.score.serving);
        ctx.ball = Some(Ball::new(pos, self.tuning.ball_radius));
    }

    /// Re-run the serve assignment while the ball is still waiting
    fn rebalance_serve(&self, ctx: &mut MatchContext) {
        let waiting = ctx
            .ball
            .as_ref()
            .is_some_and(|b| b.phase == BallPhase::AwaitingServe);
        if waiting && ctx.side_count(ctx.score.serving) == 0 {
            self.reset_ball(ctx);
        }
    }

    fn serve_position(&self, bounds: &Bounds, side: Side) -> Vec2 {
        let court = bounds.court;
        Vec2::new(
            court.quarter_x(side),
            court.ground - court.height() * self.tuning.serve_height_fraction,
        )
    }

    /// Spread team mates around the middle of their half
    fn slot_position(&self, bounds: &Bounds, side: Side, slot: usize) -> Vec2 {
        let t = &self.tuning;
        let court = bounds.court;
        let rank = slot.div_ceil(2) as f32;
        let sign = if slot % 2 == 1 { -1.0 } else { 1.0 };
        let x = court.quarter_x(side) + sign * rank * t.slime_radius * 2.2;
        let (lo, hi) = court.half_range(side, t.slime_radius, t.net_half_width);
        Vec2::new(x.clamp(lo, hi), court.ground)
    }

    /// Keep slimes on the ground line and inside their half; a waiting
    /// ball follows its serve spot
    pub fn resize(&self, ctx: &mut MatchContext) {
        let t = &self.tuning;
        let court = ctx.bounds.court;
        for slime in ctx.entities.values_mut() {
            let Some(side) = slime.side else { continue };
            let (lo, hi) = court.half_range(side, t.slime_radius, t.net_half_width);
            slime.pos.x = slime.pos.x.clamp(lo, hi);
            slime.pos.y = slime.pos.y.min(court.ground);
            if slime.on_ground {
                slime.pos.y = court.ground;
            }
        }
        let serve = self.serve_position(&ctx.bounds, ctx.score.serving);
        if let Some(ball) = ctx.ball.as_mut() {
            match ball.phase {
                BallPhase::AwaitingServe => ball.pos = serve,
                _ => {
                    ball.pos.x = ball.pos.x.clamp(court.left, court.right);
                    ball.pos.y = ball.pos.y.clamp(court.top + ball.radius, court.ground - ball.radius);
                }
            }
        }
    }
}
