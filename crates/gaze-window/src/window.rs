//! Sliding Window Implementation

use crate::WindowError;
use std::collections::VecDeque;

/// Fixed-capacity FIFO window over the most recent observations.
///
/// Pushing onto a full window evicts the oldest element; the window never
/// rejects an observation.
#[derive(Debug, Clone)]
pub struct BoundedWindow<T> {
    /// Observations in push order (front = oldest)
    items: VecDeque<T>,
    /// Maximum number of observations retained
    capacity: usize,
}

impl<T> BoundedWindow<T> {
    /// Create a new window with given capacity
    pub fn new(capacity: usize) -> Result<Self, WindowError> {
        if capacity == 0 {
            return Err(WindowError::ZeroCapacity(capacity));
        }
        Ok(Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Push an observation, returning the evicted one if the window was full
    pub fn push(&mut self, item: T) -> Option<T> {
        self.items.push_back(item);
        if self.items.len() > self.capacity {
            self.items.pop_front()
        } else {
            None
        }
    }

    /// Number of observations currently held
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if window is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check if window holds exactly `capacity` observations
    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    /// Get the window capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Empty the window. Capacity is unchanged.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Count observations matching a predicate
    pub fn count_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        self.items.iter().filter(|item| predicate(*item)).count()
    }

    /// Fraction of observations matching a predicate, `None` when empty
    pub fn ratio_where<F>(&self, predicate: F) -> Option<f64>
    where
        F: FnMut(&T) -> bool,
    {
        if self.items.is_empty() {
            return None;
        }
        Some(self.count_where(predicate) as f64 / self.items.len() as f64)
    }

    /// Modal projected value and its count over the current contents.
    ///
    /// Ties go to the value encountered first, oldest to newest.
    pub fn majority_of<U, F>(&self, mut selector: F) -> Option<(U, usize)>
    where
        U: PartialEq,
        F: FnMut(&T) -> U,
    {
        // Windows are small (tens of frames), a linear tally keeps first-seen order
        let mut tally: Vec<(U, usize)> = Vec::new();
        for item in &self.items {
            let value = selector(item);
            match tally.iter_mut().find(|(seen, _)| *seen == value) {
                Some((_, count)) => *count += 1,
                None => tally.push((value, 1)),
            }
        }

        let mut best: Option<(U, usize)> = None;
        for (value, count) in tally {
            let replace = match &best {
                Some((_, best_count)) => count > *best_count,
                None => true,
            };
            if replace {
                best = Some((value, count));
            }
        }
        best
    }
}
