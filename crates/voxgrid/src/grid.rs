//! Fixed time grid onto which note spans are snapped.
//!
//! Grid positions are carried as integer step indices; real time is only
//! derived at the boundary (`index * step`). That keeps equal grid points
//! equal even for steps like 0.1 that have no exact binary representation.

use crate::timespan::Timespan;
use serde::{Deserialize, Serialize};

/// Tolerance, in step units, within which a time counts as lying on a grid
/// point.
const SNAP_TOLERANCE: f64 = 1e-9;

/// A validated grid step in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridStep(f64);

impl GridStep {
    pub fn new(seconds: f64) -> crate::Result<Self> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(crate::Error::InvalidStep(seconds));
        }
        Ok(Self(seconds))
    }

    pub fn seconds(&self) -> f64 {
        self.0
    }

    pub fn time_of(&self, index: i64) -> f64 {
        index as f64 * self.0
    }

    /// Index of the smallest grid point that is `>= time`.
    pub fn index_at_or_after(&self, time: f64) -> i64 {
        let units = time / self.0;
        let nearest = units.round();
        if (units - nearest).abs() <= SNAP_TOLERANCE {
            return nearest as i64;
        }
        let below = units.floor();
        if below < units {
            below as i64 + 1
        } else {
            below as i64
        }
    }

    /// Index of the largest grid point that is `<= time`.
    pub fn index_at_or_before(&self, time: f64) -> i64 {
        let units = time / self.0;
        let nearest = units.round();
        if (units - nearest).abs() <= SNAP_TOLERANCE {
            return nearest as i64;
        }
        units.floor() as i64
    }

    /// Whether a span is long enough to be quantized at all.
    pub fn admits(&self, span: &Timespan) -> bool {
        span.duration() / self.0 >= 1.0 - SNAP_TOLERANCE
    }
}

/// Smallest multiple of `step` that is `>= target`.
pub fn smallest_multiple_ge(step: GridStep, target: f64) -> f64 {
    step.time_of(step.index_at_or_after(target))
}

/// One position on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub index: i64,
    pub time: f64,
}

/// Lazy iterator over the grid points inside a span.
///
/// Cloning restarts from the clone point, so the sequence can be walked
/// more than once.
#[derive(Debug, Clone)]
pub struct GridPoints {
    step: GridStep,
    next: i64,
    last: i64,
}

impl Iterator for GridPoints {
    type Item = GridPoint;

    fn next(&mut self) -> Option<GridPoint> {
        if self.next > self.last {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(GridPoint {
            index,
            time: self.step.time_of(index),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.last - self.next + 1).max(0) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridPoints {}

/// Grid points from the snapped start of `span` while the span contains them.
pub fn grid_points(span: &Timespan, step: GridStep) -> GridPoints {
    GridPoints {
        step,
        next: step.index_at_or_after(span.start),
        last: step.index_at_or_before(span.end),
    }
}
