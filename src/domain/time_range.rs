use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::{EesrepError, Result};

/// Rolling-horizon discretisation of the studied period.
///
/// Iteration `i` solves the absolute steps `[i * window_steps, i * window_steps
/// + horizon_steps)`, clipped to `total_steps`. The leading `window_steps` of a
/// window are committed; the final window commits everything it solved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeRange")]
pub struct TimeRange {
    step_duration: f64,
    window_steps: usize,
    horizon_steps: usize,
    iterations: usize,
    total_steps: usize,
}

/// Unchecked form read from serialized data
#[derive(Debug, Deserialize)]
struct RawTimeRange {
    step_duration: f64,
    window_steps: usize,
    horizon_steps: usize,
    iterations: usize,
    #[serde(default)]
    total_steps: Option<usize>,
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = EesrepError;

    fn try_from(raw: RawTimeRange) -> Result<Self> {
        let range = Self::new(
            raw.step_duration,
            raw.window_steps,
            raw.horizon_steps,
            raw.iterations,
        )?;
        match raw.total_steps {
            Some(total) => range.with_total_steps(total),
            None => Ok(range),
        }
    }
}

impl TimeRange {
    pub fn new(
        step_duration: f64,
        window_steps: usize,
        horizon_steps: usize,
        iterations: usize,
    ) -> Result<Self> {
        if !step_duration.is_finite() || step_duration <= 0.0 {
            return Err(EesrepError::Configuration(format!(
                "step duration must be positive and finite, got {}",
                step_duration
            )));
        }
        if window_steps == 0 {
            return Err(EesrepError::Configuration(
                "window must contain at least one step".to_string(),
            ));
        }
        if window_steps > horizon_steps {
            return Err(EesrepError::Configuration(format!(
                "window steps ({}) cannot exceed horizon steps ({})",
                window_steps, horizon_steps
            )));
        }
        if iterations == 0 {
            return Err(EesrepError::Configuration(
                "at least one rolling-horizon iteration is required".to_string(),
            ));
        }

        Ok(Self {
            step_duration,
            window_steps,
            horizon_steps,
            iterations,
            total_steps: (iterations - 1) * window_steps + horizon_steps,
        })
    }

    /// Clip the studied period to `total_steps`, e.g. to the extent of the
    /// available input data. The last windows then solve shorter grids.
    pub fn with_total_steps(mut self, total_steps: usize) -> Result<Self> {
        let first_step_of_last = (self.iterations - 1) * self.window_steps;
        if total_steps <= first_step_of_last {
            return Err(EesrepError::Configuration(format!(
                "total of {} steps leaves iteration {} empty",
                total_steps, self.iterations
            )));
        }
        let covered = first_step_of_last + self.horizon_steps;
        if total_steps > covered {
            return Err(EesrepError::Configuration(format!(
                "total of {} steps exceeds the {} steps covered by the iterations",
                total_steps, covered
            )));
        }
        self.total_steps = total_steps;
        Ok(self)
    }

    pub fn step_duration(&self) -> f64 {
        self.step_duration
    }

    pub fn window_steps(&self) -> usize {
        self.window_steps
    }

    pub fn horizon_steps(&self) -> usize {
        self.horizon_steps
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Total duration of the studied period
    pub fn total_duration(&self) -> f64 {
        self.total_steps as f64 * self.step_duration
    }

    /// Grid solved by the given iteration
    pub fn window(&self, iteration: usize) -> Option<TimeGrid> {
        if iteration >= self.iterations {
            return None;
        }
        let first_step = iteration * self.window_steps;
        let end = (first_step + self.horizon_steps).min(self.total_steps);
        let len = end - first_step;
        let is_final = iteration + 1 == self.iterations;
        let committed = if is_final { len } else { len.min(self.window_steps) };

        Some(TimeGrid {
            iteration,
            first_step,
            len,
            committed,
            step_duration: self.step_duration,
        })
    }

    pub fn windows(&self) -> impl Iterator<Item = TimeGrid> + '_ {
        (0..self.iterations).filter_map(move |i| self.window(i))
    }
}

/// Uniform time grid of one rolling-horizon window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeGrid {
    iteration: usize,
    first_step: usize,
    len: usize,
    committed: usize,
    step_duration: f64,
}

impl TimeGrid {
    /// Standalone grid committing all of its steps
    pub fn new(first_step: usize, len: usize, step_duration: f64) -> Self {
        Self {
            iteration: 0,
            first_step,
            len,
            committed: len,
            step_duration,
        }
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn first_step(&self) -> usize {
        self.first_step
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of leading steps kept in the results
    pub fn committed_steps(&self) -> usize {
        self.committed
    }

    /// Local index of the last committed step
    pub fn last_committed(&self) -> Option<usize> {
        self.committed.checked_sub(1)
    }

    /// Absolute step indices covered by this grid
    pub fn steps(&self) -> Range<usize> {
        self.first_step..self.first_step + self.len
    }

    pub fn duration(&self, _t: usize) -> f64 {
        self.step_duration
    }

    pub fn step_start(&self, t: usize) -> f64 {
        (self.first_step + t) as f64 * self.step_duration
    }

    pub fn step_end(&self, t: usize) -> f64 {
        (self.first_step + t + 1) as f64 * self.step_duration
    }

    /// Start times of the committed steps
    pub fn committed_times(&self) -> Vec<f64> {
        (0..self.committed).map(|t| self.step_start(t)).collect()
    }
}
