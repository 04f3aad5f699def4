//! Tunables for one simulation episode

use super::traffic_light::DEFAULT_CYCLE_LENGTH;

/// Spawn a car every N ticks
pub const DEFAULT_SPAWN_RATE: u32 = 20;

/// Population cap
pub const DEFAULT_MAX_CARS: usize = 20;

/// Simulation ticks per simulated second
pub const DEFAULT_TICKS_PER_SECOND: u32 = 10;

/// Total reaction lag of a car whose blocking condition just cleared
pub const DEFAULT_RESTART_DELAY: u32 = 2;

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub spawn_rate: u32,
    pub max_cars: usize,
    pub ticks_per_second: u32,
    pub light_cycle: u32,
    pub restart_delay: u32,
    /// Seed for map decoration, spawning and turn choices; `None` draws from
    /// the OS
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            spawn_rate: DEFAULT_SPAWN_RATE,
            max_cars: DEFAULT_MAX_CARS,
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            light_cycle: DEFAULT_CYCLE_LENGTH,
            restart_delay: DEFAULT_RESTART_DELAY,
            seed: None,
        }
    }
}

impl SimConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}
