//! Discrete zoom steps.
//!
//! Continuous gesture input is quantized to the nearest entry of a
//! `StepTable`. Ties go to the earlier (smaller) entry.

use once_cell::sync::Lazy;

use crate::error::{Result, ViewerError};

static DEFAULT_STEPS: Lazy<StepTable> = Lazy::new(|| StepTable {
    steps: vec![1.0, 1.5, 2.0, 3.0, 4.0, 6.0, 8.0],
});

/// Ascending list of allowed zoom scales. Strictly increasing, at least two
/// entries, all finite.
#[derive(Debug, Clone, PartialEq)]
pub struct StepTable {
    steps: Vec<f64>,
}

impl StepTable {
    pub fn new(steps: Vec<f64>) -> Result<Self> {
        if steps.len() < 2 {
            return Err(ViewerError::InvalidStepTable(format!(
                "need at least 2 steps, got {}",
                steps.len()
            )));
        }
        if let Some(bad) = steps.iter().find(|s| !s.is_finite() || **s <= 0.0) {
            return Err(ViewerError::InvalidStepTable(format!(
                "step {bad} is not a positive finite scale"
            )));
        }
        if let Some(pair) = steps.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ViewerError::InvalidStepTable(format!(
                "steps must be strictly increasing ({} >= {})",
                pair[0], pair[1]
            )));
        }
        Ok(Self { steps })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn min(&self) -> f64 {
        self.steps[0]
    }

    pub fn max(&self) -> f64 {
        self.steps[self.steps.len() - 1]
    }

    pub fn last_index(&self) -> usize {
        self.steps.len() - 1
    }

    pub fn get(&self, index: usize) -> f64 {
        self.steps[index.min(self.last_index())]
    }

    pub fn clamp(&self, scale: f64) -> f64 {
        if scale.is_nan() {
            return self.min();
        }
        scale.clamp(self.min(), self.max())
    }

    pub fn nearest(&self, value: f64) -> f64 {
        nearest_step(value, &self.steps)
    }

    pub fn index_of(&self, value: f64) -> usize {
        step_index(value, &self.steps)
    }

    /// Index one step above the step nearest to `value`, clamped to the end.
    pub fn next_index(&self, value: f64) -> usize {
        (self.index_of(value) + 1).min(self.last_index())
    }

    /// Index one step below the step nearest to `value`, clamped to zero.
    pub fn previous_index(&self, value: f64) -> usize {
        self.index_of(value).saturating_sub(1)
    }
}

impl Default for StepTable {
    fn default() -> Self {
        DEFAULT_STEPS.clone()
    }
}

/// Index of the entry closest to `value`. Equal distances resolve to the
/// earlier entry; an empty slice or NaN input yields 0.
pub fn step_index(value: f64, steps: &[f64]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, step) in steps.iter().enumerate() {
        let distance = (step - value).abs();
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}

pub fn nearest_step(value: f64, steps: &[f64]) -> f64 {
    steps.get(step_index(value, steps)).copied().unwrap_or(value)
}
