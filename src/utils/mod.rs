//! Utilities: fiber geometry and the motor-unit stimulation schedule.

pub mod geometry;
pub mod stimulation;
pub use stimulation::StimulationSchedule;
