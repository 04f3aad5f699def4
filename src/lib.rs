//! Grid Traffic Simulation Library
//!
//! A tick-driven traffic simulation on a small fixed road grid whose lights
//! can run on timers or be driven by an external controller.

pub mod benchmark;
pub mod control;
pub mod simulation;
