//! Signal groups for the intersection blocks
//!
//! Each 2x2 intersection is gated by four lights, one per approach. They are
//! kept in a named structure so a phase change never depends on array order.

use anyhow::{bail, Result};

use super::map::Bounds;
use super::traffic_light::{LightState, TrafficLight};
use super::types::{Axis, GridPos, IntersectionId};

/// Paired Green/Red assignment across an intersection's four lights
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// North/south flow green, east/west red (phase 0)
    VerticalGreen,
    /// East/west flow green, north/south red (phase 1)
    HorizontalGreen,
}

impl Phase {
    pub fn index(self) -> u8 {
        match self {
            Phase::VerticalGreen => 0,
            Phase::HorizontalGreen => 1,
        }
    }

    pub fn green_axis(self) -> Axis {
        match self {
            Phase::VerticalGreen => Axis::Vertical,
            Phase::HorizontalGreen => Axis::Horizontal,
        }
    }
}

impl TryFrom<u8> for Phase {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Phase::VerticalGreen),
            1 => Ok(Phase::HorizontalGreen),
            other => bail!("Unknown light phase {other}, expected 0 or 1"),
        }
    }
}

/// Lights gating the north/south flow
#[derive(Debug, Clone)]
pub struct VerticalPair {
    /// Controls southbound cars entering from the north edge
    pub south_entry: TrafficLight,
    /// Controls northbound cars entering from the south edge
    pub north_entry: TrafficLight,
}

/// Lights gating the east/west flow
#[derive(Debug, Clone)]
pub struct HorizontalPair {
    /// Controls eastbound cars entering from the west edge
    pub east_entry: TrafficLight,
    /// Controls westbound cars entering from the east edge
    pub west_entry: TrafficLight,
}

#[derive(Debug, Clone)]
pub struct IntersectionLights {
    pub vertical: VerticalPair,
    pub horizontal: HorizontalPair,
}

impl IntersectionLights {
    /// Lights in the fixed order south-entry, north-entry, east-entry, west-entry
    pub fn iter(&self) -> impl Iterator<Item = &TrafficLight> {
        [
            &self.vertical.south_entry,
            &self.vertical.north_entry,
            &self.horizontal.east_entry,
            &self.horizontal.west_entry,
        ]
        .into_iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrafficLight> {
        [
            &mut self.vertical.south_entry,
            &mut self.vertical.north_entry,
            &mut self.horizontal.east_entry,
            &mut self.horizontal.west_entry,
        ]
        .into_iter()
    }
}

/// An intersection block and the lights on its approaches
#[derive(Debug, Clone)]
pub struct Intersection {
    pub id: IntersectionId,
    pub bounds: Bounds,
    pub lights: IntersectionLights,
}

impl Intersection {
    /// Place one light per approach, one cell to the right of its stop line.
    /// The vertical flow starts green.
    pub fn new(id: IntersectionId, bounds: Bounds, cycle_length: u32) -> Self {
        let Bounds {
            x_min,
            x_max,
            y_min,
            y_max,
        } = bounds;

        let lights = IntersectionLights {
            vertical: VerticalPair {
                south_entry: TrafficLight::new(
                    GridPos::new(x_min - 1, y_min - 1),
                    Axis::Vertical,
                    LightState::Green,
                    cycle_length,
                ),
                north_entry: TrafficLight::new(
                    GridPos::new(x_max + 1, y_max + 1),
                    Axis::Vertical,
                    LightState::Green,
                    cycle_length,
                ),
            },
            horizontal: HorizontalPair {
                east_entry: TrafficLight::new(
                    GridPos::new(x_min - 1, y_max + 1),
                    Axis::Horizontal,
                    LightState::Red,
                    cycle_length,
                ),
                west_entry: TrafficLight::new(
                    GridPos::new(x_max + 1, y_min - 1),
                    Axis::Horizontal,
                    LightState::Red,
                    cycle_length,
                ),
            },
        };

        assert_eq!(lights.vertical.south_entry.axis, Axis::Vertical);
        assert_eq!(lights.vertical.north_entry.axis, Axis::Vertical);
        assert_eq!(lights.horizontal.east_entry.axis, Axis::Horizontal);
        assert_eq!(lights.horizontal.west_entry.axis, Axis::Horizontal);

        Self { id, bounds, lights }
    }

    /// Force the phase and hand the lights over to manual control for good
    pub fn apply_phase(&mut self, phase: Phase) {
        let green_axis = phase.green_axis();
        for light in self.lights.iter_mut() {
            let state = if light.axis == green_axis {
                LightState::Green
            } else {
                LightState::Red
            };
            light.force_state(state);
            light.set_manual(true);
        }
    }

    /// The light standing on this cell, if any
    pub fn light_at(&self, position: GridPos) -> Option<&TrafficLight> {
        self.lights.iter().find(|light| light.position == position)
    }

    pub fn update_lights(&mut self) {
        for light in self.lights.iter_mut() {
            light.update();
        }
    }
}
