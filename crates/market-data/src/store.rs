// In crates/market-data/src/store.rs

use crate::{Error, Result};
use core_types::Bar;
use std::collections::VecDeque;

/// A rolling, append-only window of recent bars with a fixed retention horizon.
///
/// Ordering is the store's single responsibility at the feed boundary: a bar
/// whose `open_time` is not strictly after the last stored bar is rejected
/// and the store is left untouched. Historical bars are never mutated.
#[derive(Debug)]
pub struct BarStore {
    bars: VecDeque<Bar>,
    retention: usize,
}

impl BarStore {
    /// Creates an empty store retaining at most `retention` bars.
    pub fn new(retention: usize) -> Self {
        assert!(retention > 0, "Bar retention must be greater than 0.");
        Self {
            bars: VecDeque::with_capacity(retention + 1),
            retention,
        }
    }

    /// Appends a bar, evicting the oldest once the retention horizon is full.
    pub fn append(&mut self, bar: Bar) -> Result<()> {
        if let Some(last) = self.bars.back() {
            if bar.open_time <= last.open_time {
                return Err(Error::OutOfOrder {
                    incoming: bar.open_time,
                    last: last.open_time,
                });
            }
        }

        self.bars.push_back(bar);
        if self.bars.len() > self.retention {
            self.bars.pop_front();
        }
        Ok(())
    }

    /// Returns the most recent `n` bars, oldest first.
    pub fn window(&self, n: usize) -> Result<Vec<Bar>> {
        if self.bars.len() < n {
            return Err(Error::InsufficientData {
                requested: n,
                available: self.bars.len(),
            });
        }
        Ok(self.bars.iter().skip(self.bars.len() - n).cloned().collect())
    }

    /// The most recently appended bar, if any.
    pub fn latest(&self) -> Option<&Bar> {
        self.bars.back()
    }

    /// Finds the bar opening exactly at `open_time`, if still retained.
    pub fn bar_at(&self, open_time: i64) -> Option<&Bar> {
        self.bars.iter().find(|b| b.open_time == open_time)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
