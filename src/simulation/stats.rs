//! Wait-time and queue statistics
//!
//! Per-tick aggregates are pushed into fixed-capacity rolling windows so the
//! trailing averages always cover the most recent stretch of simulated time.

use std::collections::{HashMap, HashSet, VecDeque};

use super::car::Car;
use super::types::GridPos;

/// Fixed-capacity history of the most recent samples
#[derive(Debug, Clone)]
pub struct RollingWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Mean of the retained samples, 0 when empty
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Lengths of the queue chains among the waiting cars.
///
/// A chain is a maximal run of waiting cars with the same heading, each one
/// directly behind the next. Every chain is walked from its head backwards so
/// container order does not split a queue.
pub fn queue_chains(cars: &[Car]) -> Vec<usize> {
    let waiting: HashMap<GridPos, &Car> = cars
        .iter()
        .filter(|car| car.waiting)
        .map(|car| (car.position, car))
        .collect();
    let mut visited: HashSet<GridPos> = HashSet::new();
    let mut chains = Vec::new();

    for car in cars.iter().filter(|car| car.waiting) {
        if visited.contains(&car.position) {
            continue;
        }

        let heading = car.heading;
        let same_queue = |pos: GridPos, visited: &HashSet<GridPos>| {
            waiting
                .get(&pos)
                .is_some_and(|other| other.heading == heading && !visited.contains(&pos))
        };

        // Find the head of the queue this car belongs to
        let mut head = car.position;
        loop {
            let ahead = head.step(heading);
            if ahead == car.position || !same_queue(ahead, &visited) {
                break;
            }
            head = ahead;
        }

        let mut length = 0;
        let mut pos = head;
        while same_queue(pos, &visited) {
            visited.insert(pos);
            length += 1;
            pos = pos.step(heading.opposite());
        }
        chains.push(length);
    }

    chains
}

/// Running totals and rolling histories kept by the simulation
#[derive(Debug, Clone)]
pub struct SimStats {
    /// Per-tick average consecutive wait (ticks) among waiting cars
    pub wait_history: RollingWindow,
    /// Per-tick average queue-chain length
    pub queue_history: RollingWindow,
    pub max_queue_length: usize,
    /// Cumulative wait of every car already removed from the grid
    pub removed_wait_ticks: u64,
    pub cars_exited: u64,
}

impl SimStats {
    pub fn new(window: usize) -> Self {
        Self {
            wait_history: RollingWindow::new(window),
            queue_history: RollingWindow::new(window),
            max_queue_length: 0,
            removed_wait_ticks: 0,
            cars_exited: 0,
        }
    }

    pub fn record_exit(&mut self, car: &Car) {
        self.removed_wait_ticks += car.total_wait_ticks;
        self.cars_exited += 1;
    }

    /// Sample the per-tick aggregates from the live population
    pub fn record_tick(&mut self, cars: &[Car]) {
        let waits: Vec<u64> = cars
            .iter()
            .filter(|car| car.waiting)
            .map(|car| car.current_wait_ticks)
            .collect();
        let average_wait = if waits.is_empty() {
            0.0
        } else {
            waits.iter().sum::<u64>() as f64 / waits.len() as f64
        };
        self.wait_history.push(average_wait);

        let chains = queue_chains(cars);
        let average_queue = if chains.is_empty() {
            0.0
        } else {
            chains.iter().sum::<usize>() as f64 / chains.len() as f64
        };
        self.queue_history.push(average_queue);

        if let Some(longest) = chains.iter().max() {
            self.max_queue_length = self.max_queue_length.max(*longest);
        }
    }
}
