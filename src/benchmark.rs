//! Episode runner and multi-run aggregation
//!
//! Runs whole episodes headless under a controller and reduces repeated runs
//! to summary statistics.

use anyhow::Result;
use log::debug;
use ordered_float::OrderedFloat;

use crate::control::PhaseController;
use crate::simulation::{SimConfig, Simulation};

/// Ticks between spawn-interval changes in the fluctuating schedule
pub const FLUCTUATION_INTERVAL: u64 = 300;

/// Spawn intervals the fluctuating schedule cycles through
pub const FLUCTUATION_RATES: [u32; 10] = [1, 2, 3, 5, 8, 10, 5, 3, 2, 1];

/// How the spawn interval evolves over an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnSchedule {
    Fixed(u32),
    Fluctuating,
}

impl SpawnSchedule {
    pub fn rate_at(self, tick: u64) -> u32 {
        match self {
            SpawnSchedule::Fixed(rate) => rate,
            SpawnSchedule::Fluctuating => {
                let index = (tick / FLUCTUATION_INTERVAL) as usize % FLUCTUATION_RATES.len();
                FLUCTUATION_RATES[index]
            }
        }
    }
}

/// Outcome of one episode
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub avg_wait_time_seconds: f64,
    /// Largest cumulative wait of any single car
    pub max_wait_time_seconds: f64,
    pub avg_queue_length: f64,
    pub max_queue_length: usize,
    pub total_cars_spawned: u64,
}

/// Run one episode of `ticks` ticks
pub fn run_episode(
    config: SimConfig,
    controller: &mut dyn PhaseController,
    schedule: SpawnSchedule,
    ticks: u64,
) -> Result<RunSummary> {
    let ticks_per_second = f64::from(config.ticks_per_second.max(1));
    let mut sim = Simulation::new(config);
    let mut max_wait_ticks = 0;

    for tick in 0..ticks {
        sim.spawn_rate = schedule.rate_at(tick);
        max_wait_ticks = max_wait_ticks.max(longest_wait(&sim));
        controller.apply(&mut sim)?;
        sim.step();
    }
    max_wait_ticks = max_wait_ticks.max(longest_wait(&sim));

    let summary = RunSummary {
        avg_wait_time_seconds: sim.average_wait_time_seconds(),
        max_wait_time_seconds: max_wait_ticks as f64 / ticks_per_second,
        avg_queue_length: sim.average_queue_length(),
        max_queue_length: sim.max_queue_length(),
        total_cars_spawned: sim.total_cars_spawned(),
    };
    debug!("{} episode finished: {:?}", controller.name(), summary);
    Ok(summary)
}

fn longest_wait(sim: &Simulation) -> u64 {
    sim.cars()
        .iter()
        .map(|car| car.total_wait_ticks)
        .max()
        .unwrap_or(0)
}

/// Mean, spread and 95% confidence margin of one metric across runs
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub ci95: f64,
}

impl MetricStats {
    pub fn from_values(values: &[f64]) -> Self {
        let n = values.len();
        if n == 0 {
            return Self::default();
        }

        let mean = values.iter().sum::<f64>() / n as f64;
        let (std_dev, ci95) = if n > 1 {
            let variance =
                values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            let std_dev = variance.sqrt();
            (std_dev, 1.96 * std_dev / (n as f64).sqrt())
        } else {
            (0.0, 0.0)
        };

        let min = values.iter().copied().map(OrderedFloat).min().map_or(0.0, |v| v.0);
        let max = values.iter().copied().map(OrderedFloat).max().map_or(0.0, |v| v.0);

        Self {
            mean,
            std_dev,
            min,
            max,
            ci95,
        }
    }
}

/// Statistics over a batch of runs
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregate {
    pub runs: usize,
    pub wait_time: MetricStats,
    pub max_wait_time: MetricStats,
    pub queue_length: MetricStats,
    pub max_queue_length: MetricStats,
    pub cars_spawned: MetricStats,
}

impl Aggregate {
    pub fn from_runs(runs: &[RunSummary]) -> Self {
        let metric = |f: fn(&RunSummary) -> f64| {
            let values: Vec<f64> = runs.iter().map(f).collect();
            MetricStats::from_values(&values)
        };

        Self {
            runs: runs.len(),
            wait_time: metric(|r| r.avg_wait_time_seconds),
            max_wait_time: metric(|r| r.max_wait_time_seconds),
            queue_length: metric(|r| r.avg_queue_length),
            max_queue_length: metric(|r| r.max_queue_length as f64),
            cars_spawned: metric(|r| r.total_cars_spawned as f64),
        }
    }
}
