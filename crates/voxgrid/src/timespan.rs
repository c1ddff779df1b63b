use serde::{Deserialize, Serialize};

/// A closed time interval in seconds.
///
/// Both ends are inclusive: a note ending at `t` is still sounding at `t`,
/// so grid points landing exactly on a boundary count for both neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timespan {
    pub start: f64,
    pub end: f64,
}

impl Timespan {
    /// Build a span, rejecting `start > end` and non-finite bounds.
    pub fn new(start: f64, end: f64) -> crate::Result<Self> {
        if !start.is_finite() || !end.is_finite() || start > end {
            return Err(crate::Error::MalformedTimespan { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.end
    }

    /// The part of `other` that lies inside `self`, or `None` when they do
    /// not overlap.
    ///
    /// A span that merely touches `self.start` with its end yields the
    /// zero-length span `(self.start, self.start)`.
    pub fn intersect(&self, other: &Timespan) -> Option<Timespan> {
        if self.start <= other.start && other.start < self.end {
            return Some(Timespan {
                start: other.start,
                end: other.end.min(self.end),
            });
        }
        if other.end >= self.start && other.start < self.end {
            return Some(Timespan {
                start: self.start,
                end: other.end.min(self.end),
            });
        }
        None
    }

    /// Move the span earlier by `offset`, clamping each bound at zero.
    pub fn shift(&self, offset: f64) -> Timespan {
        Timespan {
            start: (self.start - offset).max(0.0),
            end: (self.end - offset).max(0.0),
        }
    }
}
