//! Tilt Arena headless demo
//!
//! Runs a match natively with scripted bots standing in for phones, logging
//! events as they happen. The browser build drives the library through
//! `platform::WebSimulation` instead.
//!
//! Usage: `tilt-arena [bumper-cars|volleyball|snake] [tuning.json] [seconds]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use tilt_arena::platform::{clock_seed, init_logging, parse_kind};
    use tilt_arena::{PlayerRef, Simulation, Tuning, Viewport};

    init_logging();

    let mut args = std::env::args().skip(1);
    let kind = parse_kind(&args.next().unwrap_or_default());
    let tuning_json = args.next().and_then(|path| match std::fs::read_to_string(&path) {
        Ok(json) => Some(json),
        Err(err) => {
            log::warn!("Cannot read {path}: {err}");
            None
        }
    });
    let seconds: f32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(60.0);

    let tuning = Tuning::load_or_default(tuning_json.as_deref());
    let mut sim = Simulation::new(kind, tuning, Viewport::new(1280.0, 720.0), clock_seed());
    log::info!("Tilt Arena (native) running {} for {seconds}s", kind.as_str());
    log::debug!("Tuning: {}", sim.tuning().to_json());

    let names = ["Ada", "Brick", "Comet", "Dot"];
    let colors = ["#e74c3c", "#3498db", "#2ecc71", "#f1c40f"];
    for (i, (name, color)) in names.iter().zip(colors).enumerate() {
        sim.on_entity_join(PlayerRef::new(i as u64 + 1, *name, color));
    }

    let frame = 1.0 / 60.0;
    let frames = (seconds / frame) as u32;
    for n in 0..frames {
        bots::drive(&mut sim, n);
        sim.step(frame);
        for event in sim.events() {
            log::info!("{:>7.2}s {event:?}", sim.now());
        }
        if sim.is_game_over() {
            break;
        }
    }

    match sim.outcome() {
        Some(outcome) => log::info!("Result: {outcome}"),
        None => log::info!("No result after {seconds}s"),
    }
    for (rank, row) in sim.standings().iter().enumerate() {
        log::info!(
            "#{} {} score {} lives {}{}",
            rank + 1,
            row.label,
            row.score,
            row.lives,
            if row.eliminated { " (out)" } else { "" }
        );
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::WebSimulation, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod bots {
    use tilt_arena::sim::{BallPhase, Direction, Entity};
    use tilt_arena::{GameKind, PlayerInput, Simulation};

    /// Feed every bot one controller sample
    pub fn drive(sim: &mut Simulation, frame: u32) {
        let samples: Vec<_> = sim
            .entities()
            .filter(|e| e.lifecycle.is_controllable())
            .map(|e| (e.id(), sample(sim, e, frame)))
            .collect();
        for (id, input) in samples {
            sim.on_entity_input(id, input);
        }
    }

    fn sample(sim: &Simulation, bot: &Entity, frame: u32) -> PlayerInput {
        let phase = bot.id().0 as f32 * 1.7 + frame as f32 * 0.02;
        match sim.kind() {
            // Chase the platform centre with a wobble, so bots collide
            GameKind::BumperCars => {
                let to_center = sim.bounds().arena.center - bot.pos;
                let aim = to_center.normalize_or_zero() + glam::Vec2::from_angle(phase) * 0.8;
                PlayerInput::tilt(aim.x, aim.y)
            }
            // Stand under the ball and hop when it is close
            GameKind::Volleyball => {
                let Some(ball) = sim.ball() else {
                    return PlayerInput::default();
                };
                let dx = ball.pos.x - bot.pos.x;
                let close = (ball.pos - bot.pos).length() < 140.0;
                let jump = close && (ball.phase != BallPhase::Dead) && frame % 20 < 10;
                PlayerInput::tilt((dx / 60.0).clamp(-1.0, 1.0), 0.0).with_action(jump)
            }
            // Wander, turning now and then
            GameKind::Snake => {
                let dir = Direction::ALL[((frame / 45 + bot.id().0 as u32) % 4) as usize];
                let (dx, dy) = dir.delta();
                PlayerInput::tilt(dx as f32, dy as f32)
            }
        }
    }
}
