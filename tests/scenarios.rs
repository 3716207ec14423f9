use tilt_arena::sim::grid::GridRules;
use tilt_arena::sim::{
    Bounds, Cell, Direction, Entity, Lifecycle, MatchContext, MatchScore, Outcome, SimEvent, Side,
    Snake,
};
use tilt_arena::{GameKind, PlayerId, PlayerInput, PlayerRef, Simulation, Tuning, Viewport};

const FRAME: f32 = 1.0 / 60.0;

#[test]
fn arena_car_driven_off_the_edge_falls_once() {
    let mut tuning = Tuning::default();
    tuning.arena.spawn_fraction = 0.0;
    let mut sim = Simulation::new(GameKind::BumperCars, tuning, Viewport::new(1000.0, 800.0), 11);
    sim.on_entity_join(PlayerRef::new(1, "solo", "#f00"));

    let id = PlayerId(1);
    let center = sim.bounds().arena.center;
    let car = sim.entity(id).unwrap();
    assert!(car.pos.distance(center) < 1e-3);
    assert_eq!(car.lifecycle, Lifecycle::Active);

    let limit = sim.bounds().arena.radius + sim.tuning().arena.car_radius;
    let mut falls = 0;
    let mut fell_at = None;
    for frame in 0..180 {
        sim.on_entity_input(id, PlayerInput::tilt(1.0, 0.0));
        sim.step(FRAME);
        falls += sim
            .events()
            .iter()
            .filter(|e| matches!(e, SimEvent::Fell { .. }))
            .count();
        if fell_at.is_none() && falls == 1 {
            fell_at = Some(frame);
            let car = sim.entity(id).unwrap();
            assert!(matches!(car.lifecycle, Lifecycle::Falling { .. }));
            assert!(car.pos.distance(center) > limit);
        }
    }

    assert_eq!(falls, 1);
    assert!(fell_at.is_some());
    let car = sim.entity(id).unwrap();
    assert!(!matches!(car.lifecycle, Lifecycle::Active));
    assert_eq!(car.lives, 2);
}

#[test]
fn snake_reversal_is_rejected_and_head_moves_up() {
    let tuning = Tuning::default();
    let bounds = Bounds::from_viewport(Viewport::new(600.0, 400.0), &tuning);
    let mut ctx = MatchContext::new(bounds, MatchScore::new(1, 0.0), 5);
    let mut rules = GridRules::new(tuning.grid.clone());

    let mut entity = Entity::new(PlayerRef::new(1, "s", "#0f0"), 0, Default::default(), 1);
    entity.snake = Some(Snake::new(Cell::new(5, 5), Direction::Up, 3));
    ctx.entities.insert(entity.id(), entity);

    let entity = ctx.entities.get_mut(&PlayerId(1)).unwrap();
    rules.input(entity, PlayerInput::tilt(0.0, 1.0));
    let snake = entity.snake.as_ref().unwrap();
    assert_eq!(snake.heading, Direction::Up);
    assert_eq!(snake.pending, Direction::Up);

    rules.grid_step(&mut ctx);

    let snake = ctx.entities[&PlayerId(1)].snake.as_ref().unwrap();
    assert_eq!(snake.heading, Direction::Up);
    assert_eq!(snake.head(), Some(Cell::new(5, 4)));
    let body: Vec<_> = snake.body.iter().copied().collect();
    assert_eq!(body, vec![Cell::new(5, 4), Cell::new(5, 5), Cell::new(5, 6)]);
}

fn serve_with_tilt(tilt_x: f32) -> f32 {
    let mut sim = Simulation::new(
        GameKind::Volleyball,
        Tuning::default(),
        Viewport::new(1000.0, 600.0),
        3,
    );
    let id = PlayerId(1);
    sim.on_entity_join(PlayerRef::new(1, "solo", "#ff0"));

    for _ in 0..60 {
        sim.on_entity_input(id, PlayerInput::tilt(tilt_x, 0.0).with_action(true));
        sim.step(FRAME);
        let touched = sim
            .events()
            .iter()
            .any(|e| matches!(e, SimEvent::BallTouched { .. }));
        if touched {
            return sim.ball().unwrap().vel.y;
        }
    }
    panic!("slime never reached the ball");
}

#[test]
fn volleyball_touch_sends_ball_upward() {
    let min_up = Tuning::default().net_sport.min_upward_speed;
    for tilt in [0.0, 0.2, -0.2] {
        let vy = serve_with_tilt(tilt);
        assert!(vy <= -min_up, "tilt {tilt}: vy {vy}");
    }
}

#[test]
fn volleyball_point_rotates_serve() {
    let mut sim = Simulation::new(
        GameKind::Volleyball,
        Tuning::default(),
        Viewport::new(1000.0, 600.0),
        8,
    );
    sim.on_entity_join(PlayerRef::new(1, "a", "#f00"));
    sim.on_entity_join(PlayerRef::new(2, "b", "#00f"));
    assert_eq!(sim.entity(PlayerId(1)).unwrap().side, Some(Side::Left));
    assert_eq!(sim.entity(PlayerId(2)).unwrap().side, Some(Side::Right));

    // Left serves with a jump, then runs away from the ball
    let mut served = false;
    let mut scored = None;
    for _ in 0..600 {
        let input = if served {
            PlayerInput::tilt(-1.0, 0.0)
        } else {
            PlayerInput::tilt(0.0, 0.0).with_action(true)
        };
        sim.on_entity_input(PlayerId(1), input);
        sim.step(FRAME);
        served |= sim
            .events()
            .iter()
            .any(|e| matches!(e, SimEvent::Served { .. }));
        if let Some(SimEvent::PointScored { side }) = sim
            .events()
            .iter()
            .find(|e| matches!(e, SimEvent::PointScored { .. }))
        {
            scored = Some(*side);
            break;
        }
    }
    let side = scored.expect("rally never ended");
    assert_eq!(side, Side::Right);
    assert!(sim.is_round_over());
    assert_eq!(sim.scores().points(side), 1);
    assert_eq!(sim.scores().serving, side);
}

#[test]
fn match_score_latches_left_winner() {
    let mut score = MatchScore::new(5, 1.5);
    let mut now = 0.0;
    for _ in 0..5 {
        assert!(score.award_point(Side::Left, now));
        now += 2.0;
        assert!(score.poll_round(now));
    }
    assert_eq!(score.check_side_winner(), Some(Outcome::Side(Side::Left)));
    assert!(score.is_game_over());
    assert_eq!(score.outcome().unwrap().to_string(), "left");

    for _ in 0..3 {
        now += 2.0;
        score.poll_round(now);
        assert!(!score.award_point(Side::Right, now));
        assert_eq!(score.check_side_winner(), None);
    }
    assert_eq!(score.outcome(), Some(Outcome::Side(Side::Left)));
    assert_eq!(score.right, 0);
    assert_eq!(score.left, 5);
}

#[test]
fn same_seed_same_match() {
    let run = || {
        let mut sim = Simulation::new(
            GameKind::BumperCars,
            Tuning::default(),
            Viewport::default(),
            1234,
        );
        for id in 1..=4 {
            sim.on_entity_join(PlayerRef::new(id, "bot", "#fff"));
        }
        for frame in 0..300u32 {
            for id in 1..=4u64 {
                let t = frame as f32 * 0.03 + id as f32;
                sim.on_entity_input(PlayerId(id), PlayerInput::tilt(t.cos(), t.sin()));
            }
            sim.step(FRAME);
        }
        sim.snapshot_json()
    };
    assert_eq!(run(), run());
}

#[test]
fn stale_ids_never_change_state() {
    let mut sim = Simulation::new(GameKind::Snake, Tuning::default(), Viewport::default(), 9);
    sim.on_entity_join(PlayerRef::new(1, "a", "#fff"));
    sim.step(FRAME);
    let before = sim.snapshot_json();

    sim.on_entity_input(PlayerId(42), PlayerInput::tilt(1.0, 0.0));
    sim.on_entity_leave(PlayerId(42));
    assert_eq!(sim.snapshot_json(), before);
}
