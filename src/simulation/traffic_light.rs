//! Traffic light state machine
//!
//! A light toggles between Red and Green on a fixed timer until an external
//! controller takes it over, after which only forced states change it.

use super::types::{Axis, GridPos};

/// Default number of ticks between automatic toggles
pub const DEFAULT_CYCLE_LENGTH: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightState {
    Red,
    Green,
}

impl LightState {
    pub fn toggled(self) -> Self {
        match self {
            LightState::Red => LightState::Green,
            LightState::Green => LightState::Red,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrafficLight {
    pub position: GridPos,
    /// The flow this light gates
    pub axis: Axis,
    state: LightState,
    timer: u32,
    cycle_length: u32,
    manual: bool,
}

impl TrafficLight {
    pub fn new(position: GridPos, axis: Axis, initial_state: LightState, cycle_length: u32) -> Self {
        Self {
            position,
            axis,
            state: initial_state,
            timer: 0,
            cycle_length: cycle_length.max(1),
            manual: false,
        }
    }

    /// Advance the automatic timer by one tick
    pub fn update(&mut self) {
        if self.manual {
            return;
        }
        self.timer += 1;
        if self.timer >= self.cycle_length {
            self.state = self.state.toggled();
            self.timer = 0;
        }
    }

    /// Set the state directly and restart the timer, regardless of mode
    pub fn force_state(&mut self, state: LightState) {
        self.state = state;
        self.timer = 0;
    }

    /// Manual mode is sticky: once set, `update` never toggles this light again.
    pub fn set_manual(&mut self, manual: bool) {
        if manual {
            self.manual = true;
        }
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    pub fn state(&self) -> LightState {
        self.state
    }

    pub fn timer(&self) -> u32 {
        self.timer
    }

    pub fn cycle_length(&self) -> u32 {
        self.cycle_length
    }

    pub fn is_red(&self) -> bool {
        self.state == LightState::Red
    }

    pub fn is_green(&self) -> bool {
        self.state == LightState::Green
    }
}
