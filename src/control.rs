//! Baseline light controllers
//!
//! A controller is applied before every `Simulation::step` and may read the
//! approach queues and force intersection phases.

use anyhow::Result;

use crate::simulation::{IntersectionId, Phase, Simulation};

/// Minimum ticks a phase is held before a controller may switch it
pub const MIN_PHASE_TICKS: u32 = 30;

pub trait PhaseController {
    fn name(&self) -> &'static str;

    /// Observe the simulation and actuate its lights ahead of the next tick
    fn apply(&mut self, sim: &mut Simulation) -> Result<()>;
}

/// Leaves the automatic light timers running
#[derive(Debug, Default)]
pub struct FixedTimer;

impl PhaseController for FixedTimer {
    fn name(&self) -> &'static str {
        "fixed-timer"
    }

    fn apply(&mut self, _sim: &mut Simulation) -> Result<()> {
        Ok(())
    }
}

/// Gives green to whichever axis has more waiting cars, holding each phase
/// for at least `min_phase_ticks`
#[derive(Debug)]
pub struct LongestQueue {
    min_phase_ticks: u32,
    phases: Vec<Phase>,
    since_switch: Vec<u32>,
}

impl LongestQueue {
    pub fn new(min_phase_ticks: u32) -> Self {
        Self {
            min_phase_ticks,
            phases: Vec::new(),
            since_switch: Vec::new(),
        }
    }

    pub fn phase(&self, id: IntersectionId) -> Option<Phase> {
        self.phases.get(id.0).copied()
    }
}

impl Default for LongestQueue {
    fn default() -> Self {
        Self::new(MIN_PHASE_TICKS)
    }
}

impl PhaseController for LongestQueue {
    fn name(&self) -> &'static str {
        "longest-queue"
    }

    fn apply(&mut self, sim: &mut Simulation) -> Result<()> {
        let count = sim.intersections().len();
        if self.phases.len() != count {
            self.phases = vec![Phase::VerticalGreen; count];
            self.since_switch = vec![0; count];
        }

        for index in 0..count {
            let id = IntersectionId(index);
            let [north, south, east, west] = sim.get_intersection_queues(id)?;
            let vertical = north + south;
            let horizontal = east + west;

            let current = self.phases[index];
            let wanted = if horizontal > vertical {
                Phase::HorizontalGreen
            } else if vertical > horizontal {
                Phase::VerticalGreen
            } else {
                current
            };

            if wanted != current && self.since_switch[index] >= self.min_phase_ticks {
                self.phases[index] = wanted;
                self.since_switch[index] = 0;
            }

            sim.set_intersection_light_phase(id, self.phases[index])?;
            self.since_switch[index] += 1;
        }

        Ok(())
    }
}
