// This file is part of Bindle.
//
// Bindle is free software: you can redistribute it and/or modify it under the
// terms of the GNU Lesser General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version.
//
// Bindle is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with Bindle.
// If not, see https://www.gnu.org/licenses/.

use std::collections::VecDeque;

use ethers::types::U256;

/// A single timestamped fee observation
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct FeeSample {
    timestamp_ms: u64,
    value: U256,
}

/// Bounded sliding-window history of fee observations.
///
/// Holds at most one entry per slice window: an observation landing within
/// the window of the newest entry replaces it only when lower, so each entry
/// tracks the minimum seen during its slice. Timestamps are monotonically
/// non-decreasing front to back.
#[derive(Debug)]
pub(crate) struct FeeQueue {
    entries: VecDeque<FeeSample>,
    max_entries: usize,
    slice_millis: u64,
    ignore_zero: bool,
}

impl FeeQueue {
    pub(crate) fn new(max_entries: usize, slice_millis: u64, ignore_zero: bool) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries),
            max_entries,
            slice_millis,
            ignore_zero,
        }
    }

    /// Record an observation made at `now_ms`
    pub(crate) fn record(&mut self, value: U256, now_ms: u64) {
        if self.ignore_zero && value.is_zero() {
            return;
        }
        match self.entries.back_mut() {
            Some(last) if now_ms.saturating_sub(last.timestamp_ms) < self.slice_millis => {
                if value < last.value {
                    last.value = value;
                    last.timestamp_ms = now_ms;
                }
            }
            _ => {
                if self.entries.len() >= self.max_entries {
                    self.entries.pop_front();
                }
                self.entries.push_back(FeeSample {
                    timestamp_ms: now_ms,
                    value,
                });
            }
        }
    }

    /// The most recently recorded value
    pub(crate) fn latest(&self) -> Option<U256> {
        self.entries.back().map(|sample| sample.value)
    }

    /// The smallest value in the window
    pub(crate) fn min(&self) -> Option<U256> {
        self.entries.iter().map(|sample| sample.value).min()
    }

    /// The largest value in the window
    pub(crate) fn max(&self) -> Option<U256> {
        self.entries.iter().map(|sample| sample.value).max()
    }

    #[cfg(test)]
    fn samples(&self) -> Vec<(u64, U256)> {
        self.entries
            .iter()
            .map(|sample| (sample.timestamp_ms, sample.value))
            .collect()
    }
}
