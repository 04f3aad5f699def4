//! Car movement logic for the traffic simulation
//!
//! A car tries to advance one cell per tick. The attempt passes through a
//! fixed sequence of gates (restart delay, road validity, signal, crossing
//! conflict, following distance); a car stuck inside an intersection for too
//! long skips them and takes any free exit.

use log::trace;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::intersection::Intersection;
use super::map::Map;
use super::types::{
    CarId, GridPos, Heading, Turn, DEADLOCK_ESCAPE_TICKS, FOLLOWING_OVERRIDE_TICKS,
};

/// Why a car stayed put this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    /// Reaction lag after the blocking condition cleared
    Reacting,
    /// The next cell is not drivable
    OffRoad,
    RedLight,
    /// A perpendicular car is inside an intersection
    CrossTraffic,
    CarAhead,
}

/// Result of a car update indicating what happened this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarUpdateResult {
    Moved,
    /// Deadlock escape onto a different exit
    Rerouted(Heading),
    Waiting(WaitReason),
    /// The car drove off the grid and should be removed
    Exited,
}

/// Read-only view of every other car while one car is being resolved.
///
/// Cars are resolved in container order without a snapshot: `before` holds
/// cars already moved this tick, `after` the ones still at last tick's cells.
/// Every occupancy and conflict check goes through this view so that the
/// earlier cars' new positions win contested cells.
#[derive(Debug, Clone, Copy)]
pub struct OtherCars<'a> {
    before: &'a [Car],
    after: &'a [Car],
}

impl<'a> OtherCars<'a> {
    pub fn new(before: &'a [Car], after: &'a [Car]) -> Self {
        Self { before, after }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Car> + 'a {
        let (before, after) = (self.before, self.after);
        before.iter().chain(after.iter())
    }

    pub fn occupant_at(&self, position: GridPos) -> Option<&'a Car> {
        self.iter().find(|car| car.position == position)
    }

    pub fn is_occupied(&self, position: GridPos) -> bool {
        self.occupant_at(position).is_some()
    }
}

/// A car in the traffic simulation
#[derive(Debug, Clone)]
pub struct Car {
    pub id: CarId,
    pub position: GridPos,
    pub heading: Heading,
    pub waiting: bool,
    /// Heading the car had when it drove into the current intersection
    pub entry_heading: Option<Heading>,
    /// Consecutive ticks started inside an intersection cell
    pub ticks_in_intersection: u32,
    pub total_wait_ticks: u64,
    pub current_wait_ticks: u64,
    /// Pending reaction ticks before the car may move again
    pub restart_delay: u32,
    /// The previous attempt was refused by a blocking condition
    pub was_waiting: bool,
}

impl Car {
    pub fn new(id: CarId, position: GridPos, heading: Heading) -> Self {
        Self {
            id,
            position,
            heading,
            waiting: false,
            entry_heading: None,
            ticks_in_intersection: 0,
            total_wait_ticks: 0,
            current_wait_ticks: 0,
            restart_delay: 0,
            was_waiting: false,
        }
    }

    /// Attempt one cell of advance.
    ///
    /// `restart_delay` is the total number of ticks a previously blocked car
    /// lags behind its cleared condition; 0 disables the lag.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        map: &Map,
        intersections: &[Intersection],
        others: OtherCars<'_>,
        rng: &mut R,
        restart_delay: u32,
    ) -> CarUpdateResult {
        if map.is_intersection(self.position) {
            self.ticks_in_intersection += 1;
        } else {
            self.ticks_in_intersection = 0;
        }

        if self.ticks_in_intersection > DEADLOCK_ESCAPE_TICKS {
            if let Some(heading) = self.find_escape_heading(map, others) {
                let rerouted = heading != self.heading;
                if rerouted {
                    trace!(
                        "Car {:?} stuck {} ticks at {:?}, rerouting {:?} -> {:?}",
                        self.id,
                        self.ticks_in_intersection,
                        self.position,
                        self.heading,
                        heading
                    );
                }
                self.heading = heading;
                self.restart_delay = 0;
                return match self.move_forward(map, others, rng) {
                    CarUpdateResult::Moved if rerouted => CarUpdateResult::Rerouted(heading),
                    result => result,
                };
            }
        }

        if self.restart_delay > 0 {
            self.restart_delay -= 1;
            return self.hold(WaitReason::Reacting);
        }

        if let Err(reason) = self.check_gates(map, intersections, others) {
            trace!("Car {:?} at {:?} waiting: {:?}", self.id, self.position, reason);
            self.was_waiting = true;
            return self.hold(reason);
        }

        // The way is clear, but a car that was just blocked reacts late
        if self.was_waiting && restart_delay > 0 {
            self.was_waiting = false;
            self.restart_delay = restart_delay - 1;
            return self.hold(WaitReason::Reacting);
        }

        self.move_forward(map, others, rng)
    }

    /// Gates 2-5 of the movement check
    fn check_gates(
        &self,
        map: &Map,
        intersections: &[Intersection],
        others: OtherCars<'_>,
    ) -> Result<(), WaitReason> {
        let target = self.position.step(self.heading);

        // Leaving the grid is always allowed, the simulation removes the car
        if !map.in_bounds(target) {
            return Ok(());
        }
        if !map.is_road(target) {
            return Err(WaitReason::OffRoad);
        }

        let entering_intersection = map.is_intersection(target);
        if entering_intersection {
            // The approach light stands one cell to the car's right
            let light_cell = self.position.step(self.heading.right());
            let red = intersections
                .iter()
                .filter_map(|intersection| intersection.light_at(light_cell))
                .any(|light| light.is_red());
            if red {
                return Err(WaitReason::RedLight);
            }
        }

        if entering_intersection && !map.is_intersection(self.position) {
            let conflict = others.iter().any(|other| {
                map.is_intersection(other.position) && other.heading.is_perpendicular_to(self.heading)
            });
            if conflict {
                return Err(WaitReason::CrossTraffic);
            }
        }

        if let Some(occupant) = others.occupant_at(target) {
            // A car stuck in an intersection may push into an exit lane; the
            // occupant is ignored and nothing else is re-checked
            let spillback_override = self.ticks_in_intersection > FOLLOWING_OVERRIDE_TICKS
                && !map.is_intersection(occupant.position);
            if !spillback_override {
                return Err(WaitReason::CarAhead);
            }
        }

        Ok(())
    }

    /// Current heading first, then the other permitted exits of this cell
    fn find_escape_heading(&self, map: &Map, others: OtherCars<'_>) -> Option<Heading> {
        std::iter::once(self.heading)
            .chain(
                map.allowed_exit_directions(self.position)
                    .into_iter()
                    .filter(|heading| *heading != self.heading),
            )
            .find(|heading| {
                let target = self.position.step(*heading);
                !map.in_bounds(target) || (map.is_road(target) && !others.is_occupied(target))
            })
    }

    fn hold(&mut self, reason: WaitReason) -> CarUpdateResult {
        self.waiting = true;
        self.total_wait_ticks += 1;
        self.current_wait_ticks += 1;
        CarUpdateResult::Waiting(reason)
    }

    fn move_forward<R: Rng + ?Sized>(
        &mut self,
        map: &Map,
        others: OtherCars<'_>,
        rng: &mut R,
    ) -> CarUpdateResult {
        self.position = self.position.step(self.heading);
        self.waiting = false;
        self.was_waiting = false;
        self.current_wait_ticks = 0;

        if !map.in_bounds(self.position) {
            return CarUpdateResult::Exited;
        }

        if map.is_intersection(self.position) {
            self.entry_heading.get_or_insert(self.heading);
        } else {
            self.entry_heading = None;
        }

        self.choose_next_heading(map, others, rng);
        CarUpdateResult::Moved
    }

    /// Pick the heading for the next tick at the cell just reached
    fn choose_next_heading<R: Rng + ?Sized>(
        &mut self,
        map: &Map,
        others: OtherCars<'_>,
        rng: &mut R,
    ) {
        let mut candidates: Vec<Heading> = map
            .allowed_exit_directions(self.position)
            .into_iter()
            .filter(|heading| *heading != self.heading.opposite())
            .filter(|heading| self.entry_heading.map_or(true, |entry| *heading != entry.opposite()))
            .collect();

        if candidates.is_empty() {
            return;
        }

        let free: Vec<Heading> = candidates
            .iter()
            .copied()
            .filter(|heading| !others.is_occupied(self.position.step(*heading)))
            .collect();
        if !free.is_empty() {
            candidates = free;
        }

        self.heading = pick_turn(self.heading, &candidates, rng);
    }
}

/// Draw the next heading from `candidates`, none of which is a U-turn.
///
/// Straight/right splits 2:1 in favour of going straight, straight/left is a
/// coin flip, and anything else is uniform.
pub fn pick_turn<R: Rng + ?Sized>(current: Heading, candidates: &[Heading], rng: &mut R) -> Heading {
    if let [only] = candidates {
        return *only;
    }

    let find = |turn: Turn| {
        candidates
            .iter()
            .copied()
            .find(|heading| current.turn_to(*heading) == Some(turn))
    };
    let straight = find(Turn::Straight);
    let left = find(Turn::Left);
    let right = find(Turn::Right);

    match (straight, left, right) {
        (Some(straight), None, Some(right)) => {
            if rng.random_bool(1.0 / 3.0) {
                right
            } else {
                straight
            }
        }
        (Some(straight), Some(left), None) => {
            if rng.random_bool(0.5) {
                left
            } else {
                straight
            }
        }
        _ => candidates.choose(rng).copied().unwrap_or(current),
    }
}
