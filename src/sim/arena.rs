//! Sumo arena: tilt-driven cars on a round platform
//!
//! Cars accelerate with the tilt vector, bleed speed through friction and
//! shove each other around. Leaving the platform starts a fall; a fall costs
//! a life, and the last car on the platform wins.

use std::collections::BTreeMap;
use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::bounds::{ArenaBounds, Bounds};
use super::collision::{beyond_radius, circle_overlap, clamp_magnitude, resolve_elastic_collision};
use super::lifecycle::{Lifecycle, Transition};
use super::state::{Entity, MatchContext, PlayerId, PlayerInput, PlayerRef, SimEvent};
use crate::polar_to_cartesian;
use crate::tuning::ArenaTuning;

#[derive(Debug, Clone)]
pub struct ArenaRules {
    tuning: ArenaTuning,
}

impl ArenaRules {
    pub fn new(tuning: ArenaTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &ArenaTuning {
        &self.tuning
    }

    pub fn join(&self, ctx: &mut MatchContext, player: PlayerRef) {
        let order = ctx.next_join_order();
        let arena = ctx.bounds.arena;
        let spot = find_spawn(&ctx.entities, &mut ctx.rng, &arena, &self.tuning);

        let mut car = Entity::new(player, order, spot.unwrap_or(arena.center), self.tuning.lives);
        car.angle = crate::normalize_angle(ctx.rng.random_range(0.0..TAU));
        if spot.is_none() {
            // Platform crowded: wait on the sideline and retry every tick
            log::warn!("No free spawn for {}, deferring", car.player.id);
            car.lifecycle = Lifecycle::Respawning { until: ctx.now };
        }
        ctx.entities.insert(car.id(), car);
    }

    pub fn input(&self, car: &mut Entity, input: PlayerInput) {
        car.input.apply(input);
    }

    pub fn tick(&self, ctx: &mut MatchContext, dt: f32) {
        let t = &self.tuning;
        let now = ctx.now;
        let arena = ctx.bounds.arena;

        // 1. Integrate
        for car in ctx.entities.values_mut() {
            match car.lifecycle {
                Lifecycle::Active | Lifecycle::Learning { .. } => {
                    let thrust = clamp_magnitude(car.input.axis, 1.0) * t.acceleration;
                    car.vel += thrust * dt;
                    car.vel *= t.friction;
                    car.vel = clamp_magnitude(car.vel, t.max_speed);
                    car.pos += car.vel * dt;
                    if car.vel.length() > t.turn_speed_threshold {
                        car.angle = car.vel.y.atan2(car.vel.x);
                    }
                }
                // Sliding off the edge
                Lifecycle::Falling { .. } => {
                    car.vel *= t.friction;
                    car.pos += car.vel * dt;
                }
                Lifecycle::Respawning { .. } | Lifecycle::Eliminated => {}
            }
        }

        // 2. Ring-out
        let limit = arena.radius + t.car_radius;
        let mut fallen: Vec<(PlayerId, Option<PlayerId>)> = Vec::new();
        for car in ctx.entities.values_mut() {
            if car.lifecycle.is_collidable()
                && beyond_radius(car.pos, arena.center, limit)
                && car.lifecycle.begin_fall(now, t.fall_duration)
            {
                let credit = car
                    .last_contact
                    .filter(|&(_, at)| now - at <= t.knockout_window as f64)
                    .map(|(by, _)| by);
                fallen.push((car.id(), credit));
            }
        }
        for (victim, credit) in fallen {
            ctx.emit(SimEvent::Fell { id: victim });
            // The pusher may have left the match since the contact
            if let Some(by) = credit
                && let Some(pusher) = ctx.entities.get_mut(&by)
            {
                pusher.score += 1;
                ctx.emit(SimEvent::Knockout { by, victim });
            }
        }

        // 3. Car-car impacts
        let mut impacts = Vec::new();
        {
            let mut cars: Vec<&mut Entity> = ctx
                .entities
                .values_mut()
                .filter(|c| c.lifecycle.is_collidable())
                .collect();
            for i in 0..cars.len() {
                let (head, tail) = cars.split_at_mut(i + 1);
                let a = &mut head[i];
                for b in tail.iter_mut() {
                    let Some(contact) = circle_overlap(a.pos, t.car_radius, b.pos, t.car_radius)
                    else {
                        continue;
                    };
                    let approach = resolve_elastic_collision(
                        &mut a.pos,
                        &mut a.vel,
                        &mut b.pos,
                        &mut b.vel,
                        &contact,
                    );
                    // Harder hits shove harder
                    if approach > 0.0 {
                        let push = contact.normal * approach * t.push_factor;
                        a.vel = clamp_magnitude(a.vel - push, t.max_speed);
                        b.vel = clamp_magnitude(b.vel + push, t.max_speed);
                    }
                    a.hits += 1;
                    b.hits += 1;
                    a.last_contact = Some((b.id(), now));
                    b.last_contact = Some((a.id(), now));
                    impacts.push(SimEvent::Collision {
                        a: a.id(),
                        b: b.id(),
                        impact: approach,
                    });
                }
            }
        }
        for event in impacts {
            ctx.emit(event);
        }

        // 4. Lifecycle timers. Runs last so a car placed back on the
        // platform is not checked again until the next tick.
        self.advance_lifecycles(ctx);

        // 5. Last car standing
        let survivors: Vec<PlayerId> = ctx.survivors().map(Entity::id).collect();
        if let Some(outcome) = ctx.score.check_survivors(ctx.entities.len(), &survivors) {
            ctx.emit(SimEvent::GameOver {
                winner: Some(outcome.to_string()),
            });
        }
    }

    fn advance_lifecycles(&self, ctx: &mut MatchContext) {
        let t = &self.tuning;
        let now = ctx.now;
        let mut transitions = Vec::new();
        let mut due = Vec::new();
        for car in ctx.entities.values_mut() {
            if let Some(tr) = car.lifecycle.poll(now, &mut car.lives, t.respawn_delay) {
                transitions.push((car.id(), tr));
            }
            if car.lifecycle.respawn_due(now) {
                due.push(car.id());
            }
        }
        for (id, tr) in transitions {
            if tr == Transition::Eliminated {
                log::info!("{id} eliminated");
                ctx.emit(SimEvent::Eliminated { id });
            }
        }

        for id in due {
            let arena = ctx.bounds.arena;
            let Some(spot) = find_spawn(&ctx.entities, &mut ctx.rng, &arena, t) else {
                log::debug!("No free spawn for {id}, retrying next tick");
                continue;
            };
            if let Some(car) = ctx.entities.get_mut(&id) {
                car.pos = spot;
                car.vel = Vec2::ZERO;
                car.last_contact = None;
                car.input.clear();
                car.lifecycle.revive(now, None);
                ctx.emit(SimEvent::Respawned { id });
            }
        }
    }

    /// Keep cars at the same place relative to the platform
    pub fn resize(&self, ctx: &mut MatchContext, old: &Bounds) {
        let from = old.arena;
        let to = ctx.bounds.arena;
        let scale = if from.radius > 0.0 {
            to.radius / from.radius
        } else {
            1.0
        };
        for car in ctx.entities.values_mut() {
            if !car.lifecycle.is_eliminated() {
                car.pos = to.center + (car.pos - from.center) * scale;
            }
        }
    }
}

/// Random point inside the spawn disc not overlapping any car in play
fn find_spawn(
    cars: &BTreeMap<PlayerId, Entity>,
    rng: &mut Pcg32,
    arena: &ArenaBounds,
    t: &ArenaTuning,
) -> Option<Vec2> {
    let reach = arena.radius * t.spawn_fraction;
    let min_gap = t.car_radius * 2.0;
    (0..t.spawn_attempts.max(1)).find_map(|_| {
        let angle = rng.random_range(0.0..TAU);
        let dist = rng.random::<f32>() * reach;
        let candidate = arena.center + polar_to_cartesian(dist, angle);
        let clear = cars
            .values()
            .filter(|c| c.lifecycle.is_collidable())
            .all(|c| c.pos.distance(candidate) >= min_gap);
        clear.then_some(candidate)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::bounds::Viewport;
    use crate::sim::score::MatchScore;
    use crate::tuning::Tuning;
    use crate::consts::SIM_DT;

    fn context() -> MatchContext {
        let bounds = Bounds::from_viewport(Viewport::new(1000.0, 1000.0), &Tuning::default());
        MatchContext::new(bounds, MatchScore::new(1, 0.0), 7)
    }

    fn place(ctx: &mut MatchContext, id: u64, pos: Vec2, vel: Vec2) {
        let mut car = Entity::new(PlayerRef::new(id, format!("P{id}"), "#fff"), id, pos, 3);
        car.vel = vel;
        ctx.entities.insert(car.id(), car);
    }

    #[test]
    fn test_join_spawns_inside_spawn_disc() {
        let rules = ArenaRules::new(ArenaTuning::default());
        let mut ctx = context();
        for id in 0..4 {
            rules.join(&mut ctx, PlayerRef::new(id, "car", "#f00"));
        }
        let arena = ctx.bounds.arena;
        for car in ctx.entities.values() {
            assert!(car.pos.distance(arena.center) <= arena.radius * 0.5 + 0.01);
            assert_eq!(car.lifecycle, Lifecycle::Active);
            assert_eq!(car.lives, 3);
        }
    }

    #[test]
    fn test_speed_is_capped() {
        let rules = ArenaRules::new(ArenaTuning::default());
        let mut ctx = context();
        let center = ctx.bounds.arena.center;
        place(&mut ctx, 1, center, Vec2::ZERO);
        ctx.entities.get_mut(&PlayerId(1)).unwrap().input.apply(PlayerInput::tilt(1.0, 1.0));

        for _ in 0..120 {
            ctx.now += SIM_DT as f64;
            rules.tick(&mut ctx, SIM_DT);
            let car = &ctx.entities[&PlayerId(1)];
            assert!(car.vel.length() <= 400.0 + 1e-3);
        }
    }

    #[test]
    fn test_head_on_impact_separates_faster() {
        let rules = ArenaRules::new(ArenaTuning::default());
        let mut ctx = context();
        let c = ctx.bounds.arena.center;
        let v = 200.0;
        place(&mut ctx, 1, c - Vec2::new(39.0, 0.0), Vec2::new(v, 0.0));
        place(&mut ctx, 2, c + Vec2::new(39.0, 0.0), Vec2::new(-v, 0.0));

        ctx.now += SIM_DT as f64;
        rules.tick(&mut ctx, SIM_DT);

        let a = &ctx.entities[&PlayerId(1)];
        let b = &ctx.entities[&PlayerId(2)];
        assert!(a.vel.x < 0.0 && b.vel.x > 0.0, "cars bounce apart");
        // Friction shaves a little off the approach speed before impact
        let pre = v * 0.99;
        assert!(a.vel.length() >= pre);
        assert!(b.vel.length() >= pre);
        assert_eq!(a.hits, 1);
        assert_eq!(a.last_contact.map(|(id, _)| id), Some(PlayerId(2)));
        assert!(a.pos.distance(b.pos) >= 80.0);
    }

    #[test]
    fn test_knockout_credits_pusher() {
        let rules = ArenaRules::new(ArenaTuning::default());
        let mut ctx = context();
        let c = ctx.bounds.arena.center;
        let edge = ctx.bounds.arena.radius + 40.0;
        place(&mut ctx, 1, c, Vec2::ZERO);
        place(&mut ctx, 2, c + Vec2::new(edge + 1.0, 0.0), Vec2::ZERO);
        ctx.entities.get_mut(&PlayerId(2)).unwrap().last_contact = Some((PlayerId(1), 0.0));

        ctx.now = 1.0;
        rules.tick(&mut ctx, SIM_DT);

        assert!(matches!(ctx.entities[&PlayerId(2)].lifecycle, Lifecycle::Falling { .. }));
        assert_eq!(ctx.entities[&PlayerId(1)].score, 1);
        assert!(ctx.events.contains(&SimEvent::Knockout {
            by: PlayerId(1),
            victim: PlayerId(2)
        }));
    }

    #[test]
    fn test_fallen_car_respawns_inside_spawn_disc() {
        let tuning = ArenaTuning::default();
        let rules = ArenaRules::new(tuning.clone());
        let mut ctx = context();
        let arena = ctx.bounds.arena;
        let edge = arena.radius + tuning.car_radius;
        place(&mut ctx, 1, arena.center, Vec2::ZERO);
        place(&mut ctx, 2, arena.center + Vec2::new(edge + 1.0, 0.0), Vec2::ZERO);
        {
            let car = ctx.entities.get_mut(&PlayerId(2)).unwrap();
            car.last_contact = Some((PlayerId(1), 0.0));
            car.input.apply(PlayerInput::tilt(1.0, 0.0));
        }

        let mut falls = 0;
        let mut respawned_at = None;
        for tick in 0..400 {
            ctx.events.clear();
            ctx.now += SIM_DT as f64;
            rules.tick(&mut ctx, SIM_DT);
            falls += ctx.events.iter().filter(|e| matches!(e, SimEvent::Fell { .. })).count();
            if ctx.events.contains(&SimEvent::Respawned { id: PlayerId(2) }) {
                respawned_at = Some(tick);
                break;
            }
        }

        assert_eq!(falls, 1);
        let tick = respawned_at.expect("car never respawned");
        let expected = ((tuning.fall_duration + tuning.respawn_delay) / SIM_DT) as i32;
        assert!((tick - expected).abs() <= 2, "respawned at tick {tick}");

        let car = &ctx.entities[&PlayerId(2)];
        assert_eq!(car.lifecycle, Lifecycle::Active);
        assert_eq!(car.lives, 2);
        assert_eq!(car.vel, Vec2::ZERO);
        assert_eq!(car.input.axis, Vec2::ZERO);
        assert!(car.last_contact.is_none());
        assert!(car.pos.distance(arena.center) <= arena.radius * tuning.spawn_fraction + 0.01);
        assert!(car.pos.distance(ctx.entities[&PlayerId(1)].pos) >= tuning.car_radius * 2.0);
    }

    #[test]
    fn test_crowded_platform_defers_respawn() {
        let mut tuning = ArenaTuning::default();
        tuning.spawn_fraction = 0.0;
        let rules = ArenaRules::new(tuning);
        let mut ctx = context();
        let c = ctx.bounds.arena.center;
        place(&mut ctx, 1, c, Vec2::ZERO);
        place(&mut ctx, 2, c, Vec2::ZERO);
        ctx.entities.get_mut(&PlayerId(2)).unwrap().lifecycle = Lifecycle::Respawning { until: 0.0 };

        // The only spawn point is taken
        ctx.now = 0.5;
        rules.tick(&mut ctx, SIM_DT);
        assert!(matches!(ctx.entities[&PlayerId(2)].lifecycle, Lifecycle::Respawning { .. }));
        assert!(!ctx.events.contains(&SimEvent::Respawned { id: PlayerId(2) }));

        // Retried once the centre clears
        ctx.entities.get_mut(&PlayerId(1)).unwrap().pos = c + Vec2::new(200.0, 0.0);
        ctx.now += SIM_DT as f64;
        rules.tick(&mut ctx, SIM_DT);
        assert_eq!(ctx.entities[&PlayerId(2)].lifecycle, Lifecycle::Active);
        assert!(ctx.events.contains(&SimEvent::Respawned { id: PlayerId(2) }));
    }

    #[test]
    fn test_last_car_standing_wins() {
        let mut tuning = ArenaTuning::default();
        tuning.lives = 1;
        tuning.fall_duration = 0.0;
        let rules = ArenaRules::new(tuning);
        let mut ctx = context();
        let c = ctx.bounds.arena.center;
        place(&mut ctx, 1, c, Vec2::ZERO);
        place(&mut ctx, 2, c + Vec2::new(1000.0, 0.0), Vec2::ZERO);
        ctx.entities.get_mut(&PlayerId(2)).unwrap().lives = 1;

        ctx.now = 0.5;
        rules.tick(&mut ctx, SIM_DT);

        assert!(ctx.entities[&PlayerId(2)].lifecycle.is_eliminated());
        assert_eq!(
            ctx.score.outcome(),
            Some(crate::sim::score::Outcome::Player(PlayerId(1)))
        );
    }

    #[test]
    fn test_resize_keeps_relative_position() {
        let rules = ArenaRules::new(ArenaTuning::default());
        let mut ctx = context();
        let c = ctx.bounds.arena.center;
        place(&mut ctx, 1, c + Vec2::new(100.0, 0.0), Vec2::ZERO);

        let old = ctx.bounds;
        ctx.bounds = Bounds::from_viewport(Viewport::new(500.0, 500.0), &Tuning::default());
        rules.resize(&mut ctx, &old);

        let car = &ctx.entities[&PlayerId(1)];
        assert!((car.pos - Vec2::new(300.0, 250.0)).length() < 1e-3);
    }
}
