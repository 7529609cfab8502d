//! Motor-unit driven stimulation of fibers.
//!
//! Every fiber belongs to a motor unit. A firing-times table holds one row per stimulation
//! period and one column per motor unit; a fiber fires at time `t` when the entry of its motor
//! unit in row `round(t * frequency)` (wrapping around the table) is 1. A firing fiber gets model
//! state 0 prescribed at the innervation zone, the center node and its neighbours, whichever
//! state is the primary transfer channel.

use std::ops::Range;

use crate::error::FiberError;

#[derive(Debug, Clone)]
pub struct StimulationSchedule {
    /// Rows of the firing table per unit of simulation time.
    pub frequency: f64,
    /// `firing_times[row][motor_unit]`.
    pub firing_times: Vec<Vec<bool>>,
    /// 1-based motor unit number per fiber, repeated cyclically over the fiber numbers.
    pub fiber_distribution: Vec<usize>,
    /// Prescribed value of model state 0 at stimulated nodes.
    pub value: f64,
    /// Stimulated neighbours on each side of the center node.
    pub half_width_nodes: usize,
}

impl StimulationSchedule {
    pub fn new(
        frequency: f64,
        firing_times: Vec<Vec<bool>>,
        fiber_distribution: Vec<usize>,
    ) -> Result<Self, FiberError> {
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(FiberError::Stimulation(format!("frequency must be positive, got {}", frequency)));
        }
        let n_motor_units = firing_times.first().map_or(0, Vec::len);
        if n_motor_units == 0 {
            return Err(FiberError::Stimulation("firing times table is empty".into()));
        }
        if let Some(row) = firing_times.iter().position(|r| r.len() != n_motor_units) {
            return Err(FiberError::Stimulation(format!(
                "firing times row {} has {} entries, expected {}", row, firing_times[row].len(), n_motor_units
            )));
        }
        if fiber_distribution.is_empty() {
            return Err(FiberError::Stimulation("fiber distribution is empty".into()));
        }
        if let Some(&mu) = fiber_distribution.iter().find(|&&mu| mu == 0 || mu > n_motor_units) {
            return Err(FiberError::Stimulation(format!(
                "motor unit {} out of range 1..={}", mu, n_motor_units
            )));
        }
        Ok(Self { frequency, firing_times, fiber_distribution, value: 20.0, half_width_nodes: 1 })
    }

    /// Parses whitespace-separated tables: the fiber distribution as a flat list of motor unit
    /// numbers, the firing times as one row per line of 0/1 entries.
    pub fn from_text(distribution: &str, firing_times: &str, frequency: f64) -> Result<Self, FiberError> {
        let parse = |token: &str| {
            token
                .parse::<f64>()
                .map_err(|e| FiberError::Stimulation(format!("cannot parse '{}': {}", token, e)))
        };
        let fiber_distribution = distribution
            .split_whitespace()
            .map(|t| parse(t).map(|v| v as usize))
            .collect::<Result<Vec<_>, _>>()?;
        let firing_times = firing_times
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.split_whitespace().map(|t| parse(t).map(|v| v == 1.0)).collect::<Result<Vec<bool>, _>>())
            .collect::<Result<Vec<Vec<bool>>, _>>()?;
        Self::new(frequency, firing_times, fiber_distribution)
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn with_half_width(mut self, half_width_nodes: usize) -> Self {
        self.half_width_nodes = half_width_nodes;
        self
    }

    /// 0-based motor unit of `fiber_no`.
    pub fn motor_unit_no(&self, fiber_no: usize) -> usize {
        self.fiber_distribution[fiber_no % self.fiber_distribution.len()] - 1
    }

    pub fn fiber_gets_stimulated(&self, fiber_no: usize, current_time: f64) -> bool {
        // ties go to the even row
        let index = (current_time * self.frequency).round_ties_even().max(0.0) as usize;
        let row = &self.firing_times[index % self.firing_times.len()];
        row[self.motor_unit_no(fiber_no)]
    }

    /// Natural node numbers of the innervation zone of a fiber with `n_nodes_global` nodes.
    pub fn stimulated_nodes(&self, n_nodes_global: usize) -> Range<usize> {
        if n_nodes_global == 0 {
            return 0..0;
        }
        let center = n_nodes_global / 2;
        let begin = center.saturating_sub(self.half_width_nodes);
        let end = (center + self.half_width_nodes).min(n_nodes_global - 1) + 1;
        begin..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> StimulationSchedule {
        StimulationSchedule::from_text("1 2 2", "1 0\n0 1\n0 0\n", 10.0).unwrap()
    }

    #[test]
    fn firing_follows_motor_unit_column() {
        let s = schedule();
        assert_eq!(s.motor_unit_no(0), 0);
        assert_eq!(s.motor_unit_no(4), 1);
        assert!(s.fiber_gets_stimulated(0, 0.0));
        assert!(!s.fiber_gets_stimulated(1, 0.0));
        assert!(s.fiber_gets_stimulated(1, 0.1));
        // row index wraps around the table
        assert!(s.fiber_gets_stimulated(0, 0.3));
    }

    #[test]
    fn half_way_times_pick_the_even_row() {
        let s = StimulationSchedule::from_text("1", "0\n0\n1\n0\n", 10.0).unwrap();
        // 0.25 * 10 = 2.5 selects row 2, not row 3
        assert!(s.fiber_gets_stimulated(0, 0.25));
        assert!(!s.fiber_gets_stimulated(0, 0.35));
        assert!(!s.fiber_gets_stimulated(0, 0.3));
        let step_250 = 250.0 * 1e-3;
        assert!(s.fiber_gets_stimulated(0, step_250));
    }

    #[test]
    fn innervation_zone_is_clamped() {
        let s = schedule();
        assert_eq!(s.stimulated_nodes(9), 3..6);
        assert_eq!(s.stimulated_nodes(2), 0..2);
        assert_eq!(s.stimulated_nodes(1), 0..1);
        assert_eq!(s.clone().with_half_width(0).stimulated_nodes(5), 2..3);
        assert_eq!(s.with_half_width(4).stimulated_nodes(5), 0..5);
    }

    #[test]
    fn invalid_tables_are_rejected() {
        assert!(StimulationSchedule::from_text("3", "1 0", 1.0).is_err());
        assert!(StimulationSchedule::from_text("1", "1 0\n1", 1.0).is_err());
        assert!(StimulationSchedule::from_text("x", "1", 1.0).is_err());
        assert!(StimulationSchedule::from_text("1", "1", 0.0).is_err());
    }
}
