//! Local-maxima detection over a rate series

use crate::error::{BotError, Result};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Heap entry ordered by rate, then by index so equal rates stay deterministic
#[derive(Debug, Clone, Copy)]
struct Peak {
    rate: f64,
    index: usize,
}

impl PartialEq for Peak {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Peak {}

impl PartialOrd for Peak {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Peak {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rate
            .total_cmp(&other.rate)
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Indices of up to `n` interior local maxima, highest rate first
///
/// A point is a local maximum when it is strictly greater than both
/// neighbours, so the first and last points are never returned. When more
/// than `n` maxima exist the `n` largest are kept, using a min-heap bounded
/// at `n` entries.
pub fn find_peaks(rates: &[f64], n: usize) -> Result<Vec<usize>> {
    if rates.is_empty() {
        return Err(BotError::EmptyDataset);
    }
    if n == 0 || rates.len() < 3 {
        return Ok(Vec::new());
    }

    let mut heap: BinaryHeap<Reverse<Peak>> = BinaryHeap::with_capacity(n + 1);
    for (offset, window) in rates.windows(3).enumerate() {
        let (prev, rate, next) = (window[0], window[1], window[2]);
        if rate > prev && rate > next {
            heap.push(Reverse(Peak {
                rate,
                index: offset + 1,
            }));
            if heap.len() > n {
                heap.pop();
            }
        }
    }

    // Ascending order of Reverse<Peak> is descending order of rate
    Ok(heap
        .into_sorted_vec()
        .into_iter()
        .map(|Reverse(peak)| peak.index)
        .collect())
}
