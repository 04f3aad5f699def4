//! Grid traffic simulation engine
//!
//! This module contains the road topology, the traffic-light state machine,
//! per-car movement resolution and the statistics built on top of them. It
//! has no rendering dependencies and can be driven headless or by a
//! controller.

mod car;
mod config;
mod intersection;
mod map;
mod stats;
mod traffic_light;
mod types;
mod world;

pub use car::{pick_turn, Car, CarUpdateResult, OtherCars, WaitReason};
pub use config::{
    SimConfig, DEFAULT_MAX_CARS, DEFAULT_RESTART_DELAY, DEFAULT_SPAWN_RATE,
    DEFAULT_TICKS_PER_SECOND,
};
pub use intersection::{HorizontalPair, Intersection, IntersectionLights, Phase, VerticalPair};
pub use map::{Bounds, CellKind, Map, SpawnPoint, GRID_SIZE};
pub use stats::{queue_chains, RollingWindow, SimStats};
pub use traffic_light::{LightState, TrafficLight, DEFAULT_CYCLE_LENGTH};
pub use types::{
    Axis, CarId, GridPos, Heading, IntersectionId, Turn, DEADLOCK_ESCAPE_TICKS,
    FOLLOWING_OVERRIDE_TICKS, QUEUE_WINDOW_CELLS, ROLLING_WINDOW_SECONDS,
};
pub use world::{CarSnapshot, LightSnapshot, SimSnapshot, Simulation};
