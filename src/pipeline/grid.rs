//! Expected sampling timestamps between two instants.

use chrono::{DateTime, Duration, Utc};

// ---

/// Evenly spaced timestamps `start + k*step` for `k >= 0`, up to and including `end`.
///
/// Nothing is materialized; every call to [`TimeGrid::iter`] starts from `start`
/// again. `start > end` or a non-positive step gives an empty grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeGrid {
    // ---
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step: Duration,
}

impl TimeGrid {
    // ---
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, step: Duration) -> Self {
        TimeGrid { start, end, step }
    }

    /// Grid spanning the earliest and latest of `timestamps`; `None` when empty.
    pub fn spanning<I>(timestamps: I, step: Duration) -> Option<Self>
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        // ---
        let mut iter = timestamps.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts)));
        Some(TimeGrid::new(min, max, step))
    }

    pub fn iter(&self) -> GridIter {
        // ---
        let exhausted = self.start > self.end || self.step <= Duration::zero();
        GridIter {
            next: (!exhausted).then_some(self.start),
            end: self.end,
            step: self.step,
        }
    }
}

impl IntoIterator for &TimeGrid {
    type Item = DateTime<Utc>;
    type IntoIter = GridIter;

    fn into_iter(self) -> GridIter {
        self.iter()
    }
}

/// Cursor over a [`TimeGrid`].
#[derive(Debug, Clone)]
pub struct GridIter {
    next: Option<DateTime<Utc>>,
    end: DateTime<Utc>,
    step: Duration,
}

impl Iterator for GridIter {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        // ---
        let current = self.next?;
        // Overflow past the representable range simply ends the grid
        self.next = current
            .checked_add_signed(self.step)
            .filter(|ts| *ts <= self.end);
        Some(current)
    }
}
