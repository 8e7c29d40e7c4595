//! Decimating recorder for accepted integration steps.

use serde::{Deserialize, Serialize};

use crate::spin::SpinVector;
use crate::traits::StepObserver;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Age in Myr, positive in the past.
    pub age_myr: f64,
    pub time_years: f64,
    /// Obliquity (rad).
    pub obliquity: f64,
    /// Precession angle ψ (rad), in `(-π, π]`.
    pub precession_angle: f64,
}

impl SampleRecord {
    pub fn from_state(time_years: f64, state: SpinVector) -> Self {
        Self {
            age_myr: -time_years * 1e-6,
            time_years,
            obliquity: state.obliquity(),
            precession_angle: state.precession_angle(),
        }
    }
}

/// Keeps one record every `decimation` calls, starting with the first.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSink {
    decimation: usize,
    calls: usize,
    records: Vec<SampleRecord>,
}

impl Default for SampleSink {
    fn default() -> Self {
        Self::new(5)
    }
}

impl SampleSink {
    /// A decimation of zero is treated as one.
    pub fn new(decimation: usize) -> Self {
        Self {
            decimation: decimation.max(1),
            calls: 0,
            records: Vec::new(),
        }
    }

    pub fn with_capacity(decimation: usize, expected_calls: usize) -> Self {
        let mut sink = Self::new(decimation);
        sink.records.reserve(expected_calls / sink.decimation + 1);
        sink
    }

    pub fn decimation(&self) -> usize {
        self.decimation
    }

    /// Number of steps seen so far, recorded or not.
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<SampleRecord> {
        self.records
    }

    pub fn record(&mut self, time_years: f64, state: SpinVector) {
        if self.calls % self.decimation == 0 {
            self.records.push(SampleRecord::from_state(time_years, state));
        }
        self.calls += 1;
    }
}

impl StepObserver for SampleSink {
    fn on_step(&mut self, _index: usize, t: f64, y: SpinVector) {
        self.record(t, y);
    }

    fn recorded(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_every_nth_call_starting_with_the_first() {
        let mut sink = SampleSink::new(5);
        for i in 0..12 {
            sink.on_step(i, -200.0 * i as f64, SpinVector::new(0.4, 0.0));
        }
        assert_eq!(sink.calls(), 12);
        let times: Vec<f64> = sink.records().iter().map(|r| r.time_years).collect();
        assert_eq!(times, vec![0.0, -1000.0, -2000.0]);
    }

    #[test]
    fn converts_state_to_angles_and_age() {
        let record = SampleRecord::from_state(-2.5e6, SpinVector::from_angles(0.41, -1.0));
        assert!((record.age_myr - 2.5).abs() < 1e-12);
        assert!((record.obliquity - 0.41).abs() < 1e-14);
        assert!((record.precession_angle + 1.0).abs() < 1e-14);
    }

    #[test]
    fn zero_decimation_keeps_everything() {
        let mut sink = SampleSink::new(0);
        for i in 0..3 {
            sink.record(i as f64, SpinVector::ZERO);
        }
        assert_eq!(sink.into_records().len(), 3);
    }
}
