//! Main simulation world that ties everything together
//!
//! Owns the map, the cars and the signal groups, drives one tick at a time
//! and exposes the observation/actuation surface used by controllers.

use anyhow::{Context, Result};
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;

use super::car::{Car, CarUpdateResult, OtherCars};
use super::config::SimConfig;
use super::intersection::{Intersection, Phase};
use super::map::{CellKind, Map};
use super::stats::{queue_chains, SimStats};
use super::traffic_light::{LightState, TrafficLight};
use super::types::{
    CarId, GridPos, Heading, IntersectionId, QUEUE_WINDOW_CELLS, ROLLING_WINDOW_SECONDS,
};

/// Public view of one car
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarSnapshot {
    pub id: CarId,
    pub position: GridPos,
    pub heading: Heading,
    pub waiting: bool,
    pub total_wait_ticks: u64,
    pub current_wait_ticks: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightSnapshot {
    pub position: GridPos,
    pub state: LightState,
}

/// Everything a renderer or controller needs after a tick
#[derive(Debug, Clone)]
pub struct SimSnapshot<'a> {
    pub tick: u64,
    pub cars: Vec<CarSnapshot>,
    pub lights: Vec<LightSnapshot>,
    pub map: &'a Map,
    pub total_wait_ticks: u64,
    pub average_wait_time_seconds: f64,
    pub average_wait_time_last_10s: f64,
    pub average_queue_length: f64,
    pub max_queue_length: usize,
    pub total_cars_spawned: u64,
}

/// The main simulation world
pub struct Simulation {
    pub map: Map,

    /// Car arena, resolved in this order every tick
    cars: Vec<Car>,

    intersections: Vec<Intersection>,

    /// Ticks between spawn attempts; writable by controllers and renderers
    pub spawn_rate: u32,

    config: SimConfig,
    stats: SimStats,
    tick_count: u64,
    total_cars_spawned: u64,
    next_id: usize,
    rng: StdRng,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let map = Map::generate(&mut rng);
        let intersections = map
            .blocks()
            .iter()
            .enumerate()
            .map(|(index, bounds)| {
                Intersection::new(IntersectionId(index), *bounds, config.light_cycle)
            })
            .collect();
        let window = ROLLING_WINDOW_SECONDS * config.ticks_per_second.max(1) as usize;

        Self {
            map,
            cars: Vec::new(),
            intersections,
            spawn_rate: config.spawn_rate,
            stats: SimStats::new(window),
            config,
            tick_count: 0,
            total_cars_spawned: 0,
            next_id: 0,
            rng,
        }
    }

    /// Create a new Simulation with a seeded RNG for reproducible runs
    pub fn new_with_seed(seed: u64) -> Self {
        Self::new(SimConfig::with_seed(seed))
    }

    fn next_car_id(&mut self) -> CarId {
        let id = CarId(self.next_id);
        self.next_id += 1;
        id
    }

    fn is_occupied(&self, position: GridPos) -> bool {
        self.cars.iter().any(|car| car.position == position)
    }

    /// Place a car directly, bypassing the spawn interval and population cap.
    /// Useful for setting up scenarios.
    pub fn add_car(&mut self, position: GridPos, heading: Heading) -> CarId {
        let id = self.next_car_id();
        self.cars.push(Car::new(id, position, heading));
        self.total_cars_spawned += 1;
        id
    }

    /// Spawn a car at a random free spawn point, unless the population cap
    /// is reached or every spawn point is taken
    pub fn spawn_car(&mut self) -> Option<CarId> {
        if self.cars.len() >= self.config.max_cars {
            return None;
        }

        let free: Vec<_> = self
            .map
            .spawn_points()
            .iter()
            .filter(|spawn| !self.is_occupied(spawn.position))
            .copied()
            .collect();
        let spawn = *free.choose(&mut self.rng)?;

        let id = self.add_car(spawn.position, spawn.heading);
        debug!(
            "Spawned car {:?} at {:?} heading {:?} ({} on the grid)",
            id,
            spawn.position,
            spawn.heading,
            self.cars.len()
        );
        Some(id)
    }

    /// Advance the simulation by one tick
    pub fn step(&mut self) {
        self.tick_count += 1;

        for intersection in &mut self.intersections {
            intersection.update_lights();
        }

        if self.tick_count % u64::from(self.spawn_rate.max(1)) == 0 {
            self.spawn_car();
        }

        self.update_cars();
        self.remove_exited_cars();
        self.stats.record_tick(&self.cars);
    }

    /// Resolve every car in container order. Each car sees the cars before it
    /// at their new cells and the cars after it at last tick's cells.
    fn update_cars(&mut self) {
        for index in 0..self.cars.len() {
            let (before, rest) = self.cars.split_at_mut(index);
            let Some((car, after)) = rest.split_first_mut() else {
                break;
            };
            let others = OtherCars::new(before, after);
            let result = car.advance(
                &self.map,
                &self.intersections,
                others,
                &mut self.rng,
                self.config.restart_delay,
            );
            if let CarUpdateResult::Rerouted(heading) = result {
                debug!(
                    "Car {:?} escaped a blocked intersection heading {:?}",
                    car.id, heading
                );
            }
        }
    }

    fn remove_exited_cars(&mut self) {
        let map = &self.map;
        let stats = &mut self.stats;
        self.cars.retain(|car| {
            if map.in_bounds(car.position) {
                return true;
            }
            trace!(
                "Car {:?} left the grid after waiting {} ticks",
                car.id,
                car.total_wait_ticks
            );
            stats.record_exit(car);
            false
        });
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    pub fn car(&self, id: CarId) -> Option<&Car> {
        self.cars.iter().find(|car| car.id == id)
    }

    pub fn intersections(&self) -> &[Intersection] {
        &self.intersections
    }

    /// Every light, intersection by intersection, in south/north/east/west
    /// entry order
    pub fn lights(&self) -> impl Iterator<Item = &TrafficLight> {
        self.intersections
            .iter()
            .flat_map(|intersection| intersection.lights.iter())
    }

    pub fn total_cars_spawned(&self) -> u64 {
        self.total_cars_spawned
    }

    pub fn cars_exited(&self) -> u64 {
        self.stats.cars_exited
    }

    pub fn current_cars_waiting(&self) -> usize {
        self.cars.iter().filter(|car| car.waiting).count()
    }

    /// Wait ticks of every car ever spawned, removed ones included
    pub fn total_wait_ticks(&self) -> u64 {
        self.stats.removed_wait_ticks
            + self
                .cars
                .iter()
                .map(|car| car.total_wait_ticks)
                .sum::<u64>()
    }

    fn ticks_to_seconds(&self, ticks: f64) -> f64 {
        ticks / f64::from(self.config.ticks_per_second.max(1))
    }

    /// Mean cumulative wait per spawned car, in seconds
    pub fn average_wait_time_seconds(&self) -> f64 {
        if self.total_cars_spawned == 0 {
            return 0.0;
        }
        self.ticks_to_seconds(self.total_wait_ticks() as f64 / self.total_cars_spawned as f64)
    }

    /// Trailing average of the consecutive wait of waiting cars, in seconds
    pub fn average_wait_time_last_10s(&self) -> f64 {
        self.ticks_to_seconds(self.stats.wait_history.average())
    }

    /// Trailing average queue-chain length
    pub fn average_queue_length(&self) -> f64 {
        self.stats.queue_history.average()
    }

    /// Longest queue chain seen this episode
    pub fn max_queue_length(&self) -> usize {
        self.stats.max_queue_length
    }

    pub fn current_queue_lengths(&self) -> Vec<usize> {
        queue_chains(&self.cars)
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn get_state(&self) -> SimSnapshot<'_> {
        SimSnapshot {
            tick: self.tick_count,
            cars: self
                .cars
                .iter()
                .map(|car| CarSnapshot {
                    id: car.id,
                    position: car.position,
                    heading: car.heading,
                    waiting: car.waiting,
                    total_wait_ticks: car.total_wait_ticks,
                    current_wait_ticks: car.current_wait_ticks,
                })
                .collect(),
            lights: self
                .lights()
                .map(|light| LightSnapshot {
                    position: light.position,
                    state: light.state(),
                })
                .collect(),
            map: &self.map,
            total_wait_ticks: self.total_wait_ticks(),
            average_wait_time_seconds: self.average_wait_time_seconds(),
            average_wait_time_last_10s: self.average_wait_time_last_10s(),
            average_queue_length: self.average_queue_length(),
            max_queue_length: self.max_queue_length(),
            total_cars_spawned: self.total_cars_spawned,
        }
    }

    fn intersection(&self, id: IntersectionId) -> Result<&Intersection> {
        self.intersections
            .get(id.0)
            .with_context(|| format!("Intersection {:?} not found", id))
    }

    /// Waiting cars on each approach within the queue window, ordered
    /// northbound, southbound, eastbound, westbound
    pub fn get_intersection_queues(&self, id: IntersectionId) -> Result<[usize; 4]> {
        let bounds = self.intersection(id)?.bounds;
        let window = QUEUE_WINDOW_CELLS;

        let count = |heading: Heading| {
            self.cars
                .iter()
                .filter(|car| car.waiting && car.heading == heading)
                .filter(|car| {
                    let GridPos { x, y } = car.position;
                    let in_columns = (bounds.x_min..=bounds.x_max).contains(&x);
                    let in_rows = (bounds.y_min..=bounds.y_max).contains(&y);
                    match heading {
                        Heading::North => {
                            in_columns && (bounds.y_max + 1..=bounds.y_max + window).contains(&y)
                        }
                        Heading::South => {
                            in_columns && (bounds.y_min - window..bounds.y_min).contains(&y)
                        }
                        Heading::East => {
                            in_rows && (bounds.x_min - window..bounds.x_min).contains(&x)
                        }
                        Heading::West => {
                            in_rows && (bounds.x_max + 1..=bounds.x_max + window).contains(&x)
                        }
                    }
                })
                .count()
        };

        Ok([
            count(Heading::North),
            count(Heading::South),
            count(Heading::East),
            count(Heading::West),
        ])
    }

    /// Force an intersection into a phase. Its lights stay under manual
    /// control for the rest of the episode.
    pub fn set_intersection_light_phase(&mut self, id: IntersectionId, phase: Phase) -> Result<()> {
        let intersection = self
            .intersections
            .get_mut(id.0)
            .with_context(|| format!("Intersection {:?} not found", id))?;
        if !intersection.lights.iter().all(TrafficLight::is_manual) {
            debug!("Intersection {:?} switched to manual control", id);
        }
        intersection.apply_phase(phase);
        Ok(())
    }

    /// Draw the grid as text: `.` road, `+` intersection, `#` building,
    /// `G`/`R` lights, arrows for cars
    pub fn render_ascii(&self) -> String {
        let mut rows: Vec<Vec<char>> = (0..self.map.height())
            .map(|y| {
                (0..self.map.width())
                    .map(|x| match self.map.cell(GridPos::new(x, y)) {
                        Some(CellKind::Road) => '.',
                        Some(CellKind::Intersection) => '+',
                        Some(CellKind::Building) => '#',
                        Some(CellKind::Grass) | Some(CellKind::Empty) | None => ' ',
                    })
                    .collect()
            })
            .collect();

        let mut put = |pos: GridPos, symbol: char| {
            if self.map.in_bounds(pos) {
                rows[pos.y as usize][pos.x as usize] = symbol;
            }
        };
        for light in self.lights() {
            put(light.position, if light.is_green() { 'G' } else { 'R' });
        }
        for car in &self.cars {
            put(car.position, car.heading.arrow());
        }

        rows.into_iter()
            .map(|row| row.into_iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Print the world map to the terminal
    pub fn draw_map(&self) {
        println!("\n=== World Map ===");
        println!("Legend: .=Road, +=Intersection, #=Building, G/R=Light, ^v<>=Car");
        println!();
        println!("{}", self.render_ascii());
        println!();
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        println!("=== Traffic Simulation Summary ===");
        println!(
            "Tick: {} ({:.1}s)",
            self.tick_count,
            self.ticks_to_seconds(self.tick_count as f64)
        );
        println!(
            "Cars: {} (waiting: {}), spawned: {}, exited: {}",
            self.cars.len(),
            self.current_cars_waiting(),
            self.total_cars_spawned,
            self.stats.cars_exited
        );
        println!(
            "Avg wait (last 10s): {:.2}s",
            self.average_wait_time_last_10s()
        );
        let current = self.current_queue_lengths();
        println!(
            "Queue now: {}, max: {}, avg (last 10s): {:.1}",
            current.iter().max().copied().unwrap_or(0),
            self.max_queue_length(),
            self.average_queue_length()
        );

        println!("--- Intersections ---");
        for intersection in &self.intersections {
            let states: Vec<&str> = intersection
                .lights
                .iter()
                .map(|light| if light.is_green() { "G" } else { "R" })
                .collect();
            let queues = self
                .get_intersection_queues(intersection.id)
                .unwrap_or_default();
            println!(
                "  Intersection {}: lights(S,N,E,W)={} queues(N,S,E,W)={:?}",
                intersection.id.0,
                states.join(""),
                queues
            );
        }
    }
}
