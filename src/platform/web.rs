//! JavaScript bindings
//!
//! The page owns the render loop and the controller transport; it calls
//! into [`WebSimulation`] once per animation frame and draws from the JSON
//! snapshot.

use wasm_bindgen::prelude::*;

use super::{clock_seed, controller_input, init_logging, parse_kind};
use crate::sim::{PlayerId, PlayerRef, Simulation, Viewport};
use crate::tuning::Tuning;

#[wasm_bindgen]
pub struct WebSimulation {
    inner: Simulation,
}

#[wasm_bindgen]
impl WebSimulation {
    /// `tuning_json` may be omitted or partial; malformed input falls back to defaults
    #[wasm_bindgen(constructor)]
    pub fn new(kind: &str, width: f32, height: f32, tuning_json: Option<String>) -> WebSimulation {
        init_logging();
        let tuning = Tuning::load_or_default(tuning_json.as_deref());
        let inner = Simulation::new(parse_kind(kind), tuning, Viewport::new(width, height), clock_seed());
        WebSimulation { inner }
    }

    pub fn join(&mut self, id: u32, label: String, color: String) {
        self.inner.on_entity_join(PlayerRef::new(id as u64, label, color));
    }

    pub fn leave(&mut self, id: u32) {
        self.inner.on_entity_leave(PlayerId(id as u64));
    }

    pub fn input(&mut self, id: u32, x: f32, y: f32, action: bool) {
        let (id, input) = controller_input(id, x, y, action);
        self.inner.on_entity_input(id, input);
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.inner.resize(Viewport::new(width, height));
    }

    /// Frame delta in seconds
    pub fn step(&mut self, dt: f32) {
        self.inner.step(dt);
    }

    pub fn restart(&mut self) {
        self.inner.restart();
    }

    pub fn snapshot(&self) -> String {
        self.inner.snapshot_json()
    }

    /// Effective tuning after sanitizing, as JSON
    pub fn tuning(&self) -> String {
        self.inner.tuning().to_json()
    }

    pub fn standings(&self) -> String {
        serde_json::to_string(&self.inner.standings()).unwrap_or_default()
    }

    #[wasm_bindgen(getter)]
    pub fn game_over(&self) -> bool {
        self.inner.is_game_over()
    }

    #[wasm_bindgen(getter)]
    pub fn round_over(&self) -> bool {
        self.inner.is_round_over()
    }
}
