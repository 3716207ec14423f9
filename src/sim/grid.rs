//! Multiplayer snake on a discrete grid
//!
//! Snakes advance one cell per grid step. The step interval starts slow and
//! ramps down to the nominal rate after the match begins. All snakes move
//! first, then heads are checked against walls, their own body and every
//! other live body, so head-on meetings kill both.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::IndexedRandom;

use super::bounds::{Bounds, GridBounds};
use super::lifecycle::{Lifecycle, Transition};
use super::state::{
    Cell, Direction, Entity, MatchContext, PlayerId, PlayerInput, PlayerRef, SimEvent, Snake,
};
use crate::tuning::GridTuning;

#[derive(Debug, Clone)]
pub struct GridRules {
    tuning: GridTuning,
    accumulator: f32,
}

impl GridRules {
    pub fn new(tuning: GridTuning) -> Self {
        Self {
            tuning,
            accumulator: 0.0,
        }
    }

    pub fn tuning(&self) -> &GridTuning {
        &self.tuning
    }

    pub fn setup(&mut self, ctx: &mut MatchContext) {
        self.accumulator = 0.0;
        ctx.started_at = ctx.now;
        self.top_up_food(ctx);
    }

    /// Seconds between grid steps at time `now`
    pub fn step_interval(&self, started_at: f64, now: f64) -> f32 {
        let t = &self.tuning;
        if t.ramp_duration <= 0.0 {
            return t.step_interval;
        }
        let progress = (((now - started_at) as f32) / t.ramp_duration).clamp(0.0, 1.0);
        t.ramp_start_interval + (t.step_interval - t.ramp_start_interval) * progress
    }

    pub fn join(&mut self, ctx: &mut MatchContext, player: PlayerRef) {
        if ctx.entities.is_empty() {
            // First snake in an empty board starts the speed ramp
            ctx.started_at = ctx.now;
            self.accumulator = 0.0;
        }
        let order = ctx.next_join_order();
        let grid = ctx.bounds.grid;
        let mut entity = Entity::new(player, order, grid.cell_center(Cell::new(0, 0)), self.tuning.lives);

        match self.spawn_snake(ctx) {
            Some(snake) => {
                self.place(&mut entity, snake, &grid);
                entity.lifecycle = Lifecycle::Learning {
                    until: ctx.now + self.tuning.learning_duration as f64,
                };
            }
            None => {
                log::warn!("Board full, {} waits for a free spot", entity.player.id);
                entity.lifecycle = Lifecycle::Respawning { until: ctx.now };
            }
        }
        ctx.entities.insert(entity.id(), entity);
    }

    pub fn input(&self, entity: &mut Entity, input: PlayerInput) {
        entity.input.apply(input);
        if !entity.lifecycle.is_controllable() {
            return;
        }
        let Some(dir) = Direction::from_tilt(entity.input.axis, self.tuning.tilt_threshold) else {
            return;
        };
        if let Some(snake) = entity.snake.as_mut()
            && snake.alive
        {
            snake.queue_heading(dir);
        }
    }

    pub fn tick(&mut self, ctx: &mut MatchContext, dt: f32) {
        if ctx.score.is_game_over() {
            return;
        }

        self.accumulator += dt;
        let interval = self.step_interval(ctx.started_at, ctx.now);
        if self.accumulator >= interval {
            self.accumulator -= interval;
            // Never bank more than one step
            self.accumulator = self.accumulator.min(interval);
            self.grid_step(ctx);
        }

        // After the step, so a revived snake neither moves nor blocks
        // anyone until the next tick
        self.advance_lifecycles(ctx);

        let survivors: Vec<PlayerId> = ctx.survivors().map(Entity::id).collect();
        if let Some(outcome) = ctx.score.check_survivors(ctx.entities.len(), &survivors) {
            ctx.emit(SimEvent::GameOver {
                winner: Some(outcome.to_string()),
            });
        }
    }

    /// One discrete move for every live snake
    pub fn grid_step(&mut self, ctx: &mut MatchContext) {
        let grid = ctx.bounds.grid;
        let mut events = Vec::new();

        // Cells blocked at the start of the step, for auto-steering
        let blocked: HashSet<Cell> = ctx
            .entities
            .values()
            .filter_map(|e| e.snake.as_ref())
            .filter(|s| s.alive)
            .flat_map(|s| s.body.iter().copied())
            .collect();

        // 1. Move everyone
        for entity in ctx.entities.values_mut() {
            if !entity.lifecycle.is_controllable() {
                continue;
            }
            let learning = entity.lifecycle.is_invulnerable();
            let id = entity.id();
            let Some(snake) = entity.snake.as_mut() else { continue };
            if !snake.alive {
                continue;
            }
            let Some(head) = snake.head() else { continue };

            if snake.reverses(snake.pending) {
                snake.pending = snake.heading;
            } else {
                snake.heading = snake.pending;
            }

            let mut next = head.step(snake.heading);
            if learning && !grid.contains(next) {
                match steer_clear(snake, head, &grid, &blocked) {
                    Some(dir) => {
                        snake.heading = dir;
                        snake.pending = dir;
                        next = head.step(dir);
                    }
                    // Boxed in; wait for the next step
                    None => continue,
                }
            }

            snake.body.push_front(next);
            if let Some(i) = ctx.food.iter().position(|&f| f == next) {
                ctx.food.swap_remove(i);
                entity.score += 1;
                events.push(SimEvent::Ate { id });
            } else {
                snake.body.pop_back();
            }
        }

        // 2. Collisions, against the board after everyone moved
        let mut dead = Vec::new();
        for entity in ctx.entities.values() {
            let Some(snake) = entity.snake.as_ref() else { continue };
            if !snake.alive || !entity.lifecycle.is_controllable() || entity.lifecycle.is_invulnerable() {
                continue;
            }
            let Some(head) = snake.head() else { continue };
            let wall = !grid.contains(head);
            let own = snake.body.iter().skip(1).any(|&c| c == head);
            let other = ctx
                .entities
                .values()
                .filter(|o| o.id() != entity.id())
                .filter_map(|o| o.snake.as_ref())
                .any(|s| s.alive && s.occupies(head));
            if wall || own || other {
                dead.push(entity.id());
            }
        }

        let now = ctx.now;
        for id in dead {
            if let Some(entity) = ctx.entities.get_mut(&id) {
                if let Some(snake) = entity.snake.as_mut() {
                    snake.alive = false;
                }
                entity.lifecycle.begin_fall(now, self.tuning.death_duration);
                log::info!("{} crashed", entity.player.label);
                events.push(SimEvent::Died { id });
            }
        }

        // 3. Sync world positions for renderers
        for entity in ctx.entities.values_mut() {
            if entity.lifecycle.is_eliminated() {
                continue;
            }
            if let Some(snake) = entity.snake.as_ref()
                && let Some(head) = snake.head()
            {
                entity.pos = grid.cell_center(head);
                entity.angle = snake.heading.angle();
            }
        }

        for event in events {
            ctx.emit(event);
        }
        self.top_up_food(ctx);
    }

    fn advance_lifecycles(&self, ctx: &mut MatchContext) {
        let t = &self.tuning;
        let now = ctx.now;
        let mut due = Vec::new();
        let mut eliminated = Vec::new();
        for entity in ctx.entities.values_mut() {
            if let Some(Transition::Eliminated) =
                entity.lifecycle.poll(now, &mut entity.lives, t.respawn_delay)
            {
                eliminated.push(entity.id());
            }
            if entity.lifecycle.respawn_due(now) {
                due.push(entity.id());
            }
        }
        for id in eliminated {
            log::info!("{id} eliminated");
            ctx.emit(SimEvent::Eliminated { id });
        }

        let grid = ctx.bounds.grid;
        for id in due {
            let Some(snake) = self.spawn_snake(ctx) else {
                log::debug!("No room to respawn {id}, retrying");
                continue;
            };
            if let Some(entity) = ctx.entities.get_mut(&id) {
                self.place(entity, snake, &grid);
                entity.input.clear();
                entity.lifecycle.revive(now, Some(t.learning_duration));
                ctx.emit(SimEvent::Respawned { id });
            }
        }
    }

    fn place(&self, entity: &mut Entity, snake: Snake, grid: &GridBounds) {
        if let Some(head) = snake.head() {
            entity.pos = grid.cell_center(head);
        }
        entity.angle = snake.heading.angle();
        entity.snake = Some(snake);
    }

    /// A straight snake on free cells away from the walls
    fn spawn_snake(&self, ctx: &mut MatchContext) -> Option<Snake> {
        let t = &self.tuning;
        let grid = ctx.bounds.grid;
        let xs = margin_range(grid.cols, t.spawn_margin);
        let ys = margin_range(grid.rows, t.spawn_margin);
        for _ in 0..t.spawn_attempts.max(1) {
            let head = Cell::new(ctx.rng.random_range(xs.clone()), ctx.rng.random_range(ys.clone()));
            let heading = *Direction::ALL.choose(&mut ctx.rng)?;
            let snake = Snake::new(head, heading, t.initial_length);
            let fits = snake
                .body
                .iter()
                .all(|&c| grid.contains(c) && !ctx.cell_occupied(c));
            if fits {
                return Some(snake);
            }
        }
        None
    }

    /// Keep `food_count` items on the board; gives up quietly when crowded
    fn top_up_food(&self, ctx: &mut MatchContext) {
        let t = &self.tuning;
        let grid = ctx.bounds.grid;
        let xs = margin_range(grid.cols, t.food_margin);
        let ys = margin_range(grid.rows, t.food_margin);
        while ctx.food.len() < t.food_count {
            let mut spot = None;
            for _ in 0..t.food_attempts.max(1) {
                let cell = Cell::new(ctx.rng.random_range(xs.clone()), ctx.rng.random_range(ys.clone()));
                if !ctx.cell_occupied(cell) {
                    spot = Some(cell);
                    break;
                }
            }
            match spot {
                Some(cell) => ctx.food.push(cell),
                None => {
                    log::debug!("No free cell for food");
                    break;
                }
            }
        }
    }

    /// Drop food that fell off a shrunken board and refill
    pub fn resize(&self, ctx: &mut MatchContext, _old: &Bounds) {
        let grid = ctx.bounds.grid;
        ctx.food.retain(|&c| grid.contains(c));
        for entity in ctx.entities.values_mut() {
            if entity.lifecycle.is_eliminated() {
                continue;
            }
            if let Some(head) = entity.snake.as_ref().and_then(Snake::head) {
                entity.pos = grid.cell_center(head);
            }
        }
        self.top_up_food(ctx);
    }
}

/// Cells `[margin, len - margin)`, or the whole axis if that is empty
fn margin_range(len: i32, margin: i32) -> std::ops::Range<i32> {
    if len - margin > margin {
        margin..len - margin
    } else {
        0..len.max(1)
    }
}

/// Pick a heading for a learning snake about to leave the board
fn steer_clear(snake: &Snake, head: Cell, grid: &GridBounds, blocked: &HashSet<Cell>) -> Option<Direction> {
    let mut open = Direction::ALL
        .into_iter()
        .filter(|&d| d != snake.heading.opposite() && !snake.reverses(d))
        .filter(|&d| grid.contains(head.step(d)));
    let first = open.clone().next();
    open.find(|&d| !blocked.contains(&head.step(d))).or(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::bounds::Viewport;
    use crate::sim::score::{MatchScore, Outcome};
    use crate::tuning::Tuning;

    fn context() -> MatchContext {
        // 30 x 20 cells
        let bounds = Bounds::from_viewport(Viewport::new(600.0, 400.0), &Tuning::default());
        MatchContext::new(bounds, MatchScore::new(1, 0.0), 3)
    }

    fn put_snake(ctx: &mut MatchContext, id: u64, head: Cell, heading: Direction, len: usize) {
        let mut entity = Entity::new(PlayerRef::new(id, format!("S{id}"), "#0f0"), id, Default::default(), 1);
        entity.snake = Some(Snake::new(head, heading, len));
        ctx.entities.insert(entity.id(), entity);
    }

    fn body(ctx: &MatchContext, id: u64) -> Vec<Cell> {
        ctx.entities[&PlayerId(id)].snake.as_ref().unwrap().body.iter().copied().collect()
    }

    #[test]
    fn test_step_interval_ramps_down() {
        let rules = GridRules::new(GridTuning::default());
        assert!((rules.step_interval(0.0, 0.0) - 0.25).abs() < 1e-6);
        assert!((rules.step_interval(0.0, 2.5) - 0.175).abs() < 1e-6);
        assert!((rules.step_interval(0.0, 5.0) - 0.1).abs() < 1e-6);
        assert!((rules.step_interval(0.0, 60.0) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_reversal_is_ignored() {
        let mut rules = GridRules::new(GridTuning::default());
        let mut ctx = context();
        put_snake(&mut ctx, 1, Cell::new(5, 5), Direction::Up, 3);

        let entity = ctx.entities.get_mut(&PlayerId(1)).unwrap();
        rules.input(entity, PlayerInput::tilt(0.0, 1.0));
        rules.grid_step(&mut ctx);

        assert_eq!(body(&ctx, 1), vec![Cell::new(5, 4), Cell::new(5, 5), Cell::new(5, 6)]);
    }

    #[test]
    fn test_turn_applies_on_next_step() {
        let mut rules = GridRules::new(GridTuning::default());
        let mut ctx = context();
        put_snake(&mut ctx, 1, Cell::new(5, 5), Direction::Up, 3);

        let entity = ctx.entities.get_mut(&PlayerId(1)).unwrap();
        rules.input(entity, PlayerInput::tilt(-0.9, 0.1));
        rules.grid_step(&mut ctx);

        assert_eq!(body(&ctx, 1)[0], Cell::new(4, 5));
        let e = &ctx.entities[&PlayerId(1)];
        assert_eq!(e.pos, ctx.bounds.grid.cell_center(Cell::new(4, 5)));
    }

    #[test]
    fn test_eating_grows_and_scores() {
        let mut rules = GridRules::new(GridTuning::default());
        let mut ctx = context();
        put_snake(&mut ctx, 1, Cell::new(5, 5), Direction::Right, 3);
        ctx.food = vec![Cell::new(6, 5)];

        rules.grid_step(&mut ctx);

        assert_eq!(body(&ctx, 1).len(), 4);
        assert_eq!(ctx.entities[&PlayerId(1)].score, 1);
        assert!(ctx.events.contains(&SimEvent::Ate { id: PlayerId(1) }));
        // Refilled elsewhere
        assert_eq!(ctx.food.len(), 3);
        assert!(!ctx.food.contains(&Cell::new(6, 5)));
    }

    #[test]
    fn test_wall_kills_active_snake() {
        let mut rules = GridRules::new(GridTuning::default());
        let mut ctx = context();
        put_snake(&mut ctx, 1, Cell::new(0, 5), Direction::Left, 3);
        put_snake(&mut ctx, 2, Cell::new(10, 10), Direction::Up, 3);

        rules.grid_step(&mut ctx);

        let e = &ctx.entities[&PlayerId(1)];
        assert!(!e.snake.as_ref().unwrap().alive);
        assert!(matches!(e.lifecycle, Lifecycle::Falling { .. }));
        assert!(ctx.events.contains(&SimEvent::Died { id: PlayerId(1) }));
    }

    #[test]
    fn test_learning_snake_steers_off_wall() {
        let mut rules = GridRules::new(GridTuning::default());
        let mut ctx = context();
        put_snake(&mut ctx, 1, Cell::new(0, 5), Direction::Left, 3);
        ctx.entities.get_mut(&PlayerId(1)).unwrap().lifecycle = Lifecycle::Learning { until: 10.0 };

        rules.grid_step(&mut ctx);

        let head = body(&ctx, 1)[0];
        assert!(ctx.bounds.grid.contains(head));
        assert!(ctx.entities[&PlayerId(1)].snake.as_ref().unwrap().alive);
    }

    #[test]
    fn test_head_on_kills_both() {
        let mut rules = GridRules::new(GridTuning::default());
        let mut ctx = context();
        put_snake(&mut ctx, 1, Cell::new(5, 5), Direction::Right, 3);
        put_snake(&mut ctx, 2, Cell::new(7, 5), Direction::Left, 3);
        put_snake(&mut ctx, 3, Cell::new(15, 15), Direction::Up, 3);

        rules.grid_step(&mut ctx);

        assert!(!ctx.entities[&PlayerId(1)].snake.as_ref().unwrap().alive);
        assert!(!ctx.entities[&PlayerId(2)].snake.as_ref().unwrap().alive);
        assert!(ctx.entities[&PlayerId(3)].snake.as_ref().unwrap().alive);
    }

    #[test]
    fn test_last_snake_wins() {
        let mut rules = GridRules::new(GridTuning::default());
        let mut ctx = context();
        put_snake(&mut ctx, 1, Cell::new(0, 5), Direction::Left, 3);
        put_snake(&mut ctx, 2, Cell::new(10, 15), Direction::Up, 3);

        // Die on the first step, then let the death animation finish
        for _ in 0..240 {
            ctx.now += SIM_DT as f64;
            rules.tick(&mut ctx, SIM_DT);
        }

        assert!(ctx.entities[&PlayerId(1)].lifecycle.is_eliminated());
        assert_eq!(ctx.score.outcome(), Some(Outcome::Player(PlayerId(2))));
    }

    fn kill_for_respawn(ctx: &mut MatchContext, id: u64) {
        let entity = ctx.entities.get_mut(&PlayerId(id)).unwrap();
        entity.lives = 2;
        entity.snake.as_mut().unwrap().alive = false;
        entity.lifecycle = Lifecycle::Respawning { until: 0.0 };
    }

    #[test]
    fn test_revived_snake_waits_for_next_step() {
        let mut rules = GridRules::new(GridTuning::default());
        let food = vec![Cell::new(1, 1), Cell::new(2, 1), Cell::new(3, 1)];
        let mut ctx = context();
        ctx.food = food.clone();
        put_snake(&mut ctx, 1, Cell::new(5, 5), Direction::Up, 3);
        kill_for_respawn(&mut ctx, 1);

        // Same seed, same free cells: where the respawn will land
        let mut twin = context();
        twin.food = food;
        let expected = rules.spawn_snake(&mut twin).unwrap();

        // One tick that both runs a grid step and revives the snake
        ctx.now = 0.3;
        rules.tick(&mut ctx, 0.3);
        assert!(ctx.events.contains(&SimEvent::Respawned { id: PlayerId(1) }));
        let entity = &ctx.entities[&PlayerId(1)];
        assert!(matches!(entity.lifecycle, Lifecycle::Learning { until } if (until - 3.3).abs() < 1e-6));
        assert_eq!(entity.lives, 2);
        assert_eq!(body(&ctx, 1), expected.body.iter().copied().collect::<Vec<_>>());

        // Moves on the following step
        ctx.now = 0.6;
        rules.tick(&mut ctx, 0.3);
        let head = expected.head().unwrap().step(expected.heading);
        assert_eq!(body(&ctx, 1)[0], head);
    }

    #[test]
    fn test_respawn_waits_for_free_room() {
        let mut rules = GridRules::new(GridTuning::default());
        let mut ctx = context();
        let grid = ctx.bounds.grid;
        ctx.food = (0..grid.cols)
            .flat_map(|x| (0..grid.rows).map(move |y| Cell::new(x, y)))
            .collect();
        put_snake(&mut ctx, 1, Cell::new(5, 5), Direction::Up, 3);
        kill_for_respawn(&mut ctx, 1);

        ctx.now = 0.1;
        rules.tick(&mut ctx, 0.1);
        assert!(matches!(ctx.entities[&PlayerId(1)].lifecycle, Lifecycle::Respawning { .. }));
        assert!(!ctx.events.contains(&SimEvent::Respawned { id: PlayerId(1) }));

        // Board clears; the next tick places it
        ctx.food.truncate(3);
        ctx.now = 0.2;
        rules.tick(&mut ctx, 0.1);
        assert!(ctx.entities[&PlayerId(1)].lifecycle.is_invulnerable());
        assert!(ctx.events.contains(&SimEvent::Respawned { id: PlayerId(1) }));
    }

    #[test]
    fn test_food_top_up_gives_up_when_crowded() {
        let tuning = GridTuning {
            food_count: 1000,
            ..GridTuning::default()
        };
        let mut rules = GridRules::new(tuning);
        let mut ctx = context();
        put_snake(&mut ctx, 1, Cell::new(10, 10), Direction::Up, 3);

        rules.setup(&mut ctx);
        let placed = ctx.food.len();
        assert!(placed > 0 && placed < 1000);
        let unique: HashSet<Cell> = ctx.food.iter().copied().collect();
        assert_eq!(unique.len(), placed);
        assert!(body(&ctx, 1).iter().all(|c| !ctx.food.contains(c)));

        // Tried again on the next grid step
        ctx.food.clear();
        rules.grid_step(&mut ctx);
        assert!(!ctx.food.is_empty());
    }

    #[test]
    fn test_join_spawns_learning_snake_away_from_walls() {
        let mut rules = GridRules::new(GridTuning::default());
        let mut ctx = context();
        rules.setup(&mut ctx);
        for id in 0..3 {
            rules.join(&mut ctx, PlayerRef::new(id, "s", "#fff"));
        }
        for entity in ctx.entities.values() {
            assert!(entity.lifecycle.is_invulnerable());
            let snake = entity.snake.as_ref().unwrap();
            assert_eq!(snake.body.len(), 3);
            let head = snake.head().unwrap();
            assert!((5..25).contains(&head.x) && (5..15).contains(&head.y));
            for cell in &snake.body {
                assert!(!ctx.food.contains(cell));
            }
        }
        assert_eq!(ctx.food.len(), 3);
    }
}
