//! Sparse order key allocation
//!
//! Siblings carry integer `order` keys spaced by a fixed gap, so a single
//! insertion between two siblings fits without rewriting any other sibling.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicI64, Ordering};

const DEFAULT_GAP: NonZeroU32 = match NonZeroU32::new(1000) {
    Some(n) => n,
    None => unreachable!(),
};

/// Which end of the list is read first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Lowest key first; the first created item gets the lowest key
    #[default]
    Ascending,
    /// Highest key first ("newest first"); the first item of a batch gets the
    /// highest key
    Descending,
}

impl SortDirection {
    /// Whether `a` may directly precede `b` in read order
    #[inline]
    #[must_use]
    pub fn precedes(self, a: i64, b: i64) -> bool {
        match self {
            Self::Ascending => a < b,
            Self::Descending => a > b,
        }
    }
}

/// Gap and base of the key space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderConfig {
    /// Spacing between adjacent siblings
    pub gap: NonZeroU32,
    /// Key of the first item in an empty list
    pub base: i64,
}

impl OrderConfig {
    /// With gap
    #[inline]
    #[must_use]
    pub fn with_gap(mut self, gap: NonZeroU32) -> Self {
        self.gap = gap;
        self
    }

    /// With base
    #[inline]
    #[must_use]
    pub fn with_base(mut self, base: i64) -> Self {
        self.base = base;
        self
    }
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            gap: DEFAULT_GAP,
            base: 1000,
        }
    }
}

/// Keys to write after moving one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    /// `(position in the reordered list, new key)` for every item whose key changes
    pub changes: Vec<(usize, i64)>,
    /// Whether the whole list had to be renumbered
    pub renumbered: bool,
}

/// Order key allocator
#[derive(Debug)]
pub struct OrderAllocator {
    config: OrderConfig,
    last_fallback: AtomicI64,
}

impl OrderAllocator {
    /// Create allocator
    #[inline]
    #[must_use]
    pub fn new(config: OrderConfig) -> Self {
        Self {
            config,
            last_fallback: AtomicI64::new(i64::MIN),
        }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> OrderConfig {
        self.config
    }

    #[inline]
    fn gap(&self) -> i64 {
        i64::from(self.config.gap.get())
    }

    /// Key for a new item appended after the current extreme key
    ///
    /// Both schemes append at the numerically high end; they differ only in
    /// read direction, so the caller passes the current maximum key.
    #[must_use]
    pub fn next_order(&self, current_extreme: Option<i64>) -> i64 {
        match current_extreme {
            None => self.config.base,
            Some(extreme) => extreme.saturating_add(self.gap()),
        }
    }

    /// Keys for `count` fresh siblings, in creation order
    ///
    /// Ascending yields `[G, 2G, .., N·G]`, descending `[N·G, .., G]`.
    #[must_use]
    pub fn order_values_for_batch(&self, count: usize, direction: SortDirection) -> Vec<i64> {
        (0..count)
            .map(|position| self.order_for_position(position, count, direction))
            .collect()
    }

    /// Key for the item at zero-based `position` of `total`
    ///
    /// Positions past the end clamp to the last slot of the scheme.
    #[must_use]
    pub fn order_for_position(&self, position: usize, total: usize, direction: SortDirection) -> i64 {
        let position = position.min(total.saturating_sub(1));
        let slot = match direction {
            SortDirection::Ascending => position.saturating_add(1),
            SortDirection::Descending => total.saturating_sub(position),
        };
        i64::try_from(slot)
            .unwrap_or(i64::MAX)
            .saturating_mul(self.gap())
    }

    /// Strictly increasing wall-clock key (milliseconds)
    ///
    /// Collision escape hatch for inserts whose computed key cannot be
    /// guaranteed unique; never the primary allocation path.
    pub fn fallback_order(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let next = |last: i64| now.max(last.saturating_add(1));
        match self
            .last_fallback
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(next(last)))
        {
            Ok(prev) | Err(prev) => next(prev),
        }
    }

    /// Key strictly between two neighbours in read order
    ///
    /// Returns `None` when the gap is exhausted; the caller then renumbers or
    /// falls back.
    #[must_use]
    pub fn order_between(
        &self,
        before: Option<i64>,
        after: Option<i64>,
        direction: SortDirection,
    ) -> Option<i64> {
        let (low, high) = match direction {
            SortDirection::Ascending => (before, after),
            SortDirection::Descending => (after, before),
        };
        match (low, high) {
            (None, None) => Some(self.config.base),
            (Some(low), None) => low.checked_add(self.gap()),
            (None, Some(high)) => high.checked_sub(self.gap()),
            (Some(low), Some(high)) if high.saturating_sub(low) >= 2 => {
                i64::try_from((i128::from(low) + i128::from(high)) / 2).ok()
            }
            (Some(_), Some(_)) => None,
        }
    }

    /// Keys to persist after the item at `from` moved to `to`
    ///
    /// `orders` are the current keys in read order. The moved item and its
    /// displaced neighbour take their positional keys when that keeps the
    /// list strictly ordered; otherwise they swap their existing keys; if the
    /// two keys tie, the whole list is renumbered.
    #[must_use]
    pub fn plan_move(
        &self,
        orders: &[i64],
        from: usize,
        to: usize,
        direction: SortDirection,
    ) -> MovePlan {
        let total = orders.len();
        if from >= total || to >= total || from == to {
            return MovePlan {
                changes: Vec::new(),
                renumbered: false,
            };
        }

        let mut swapped = orders.to_vec();
        swapped.swap(from, to);

        let mut positional = swapped.clone();
        positional[to] = self.order_for_position(to, total, direction);
        positional[from] = self.order_for_position(from, total, direction);
        if is_strictly_ordered(&positional, direction) {
            return MovePlan {
                changes: diff(&swapped, &positional, &[to, from]),
                renumbered: false,
            };
        }

        // Swapping existing keys keeps every position's key unchanged
        if orders[from] != orders[to] && is_strictly_ordered(orders, direction) {
            return MovePlan {
                changes: vec![(to, orders[to]), (from, orders[from])],
                renumbered: false,
            };
        }

        let fresh = self.order_values_for_batch(total, direction);
        let all: Vec<usize> = (0..total).collect();
        MovePlan {
            changes: diff(&swapped, &fresh, &all),
            renumbered: true,
        }
    }
}

impl Default for OrderAllocator {
    fn default() -> Self {
        Self::new(OrderConfig::default())
    }
}

fn is_strictly_ordered(keys: &[i64], direction: SortDirection) -> bool {
    keys.windows(2).all(|w| direction.precedes(w[0], w[1]))
}

fn diff(current: &[i64], target: &[i64], positions: &[usize]) -> Vec<(usize, i64)> {
    positions
        .iter()
        .filter(|&&p| current[p] != target[p])
        .map(|&p| (p, target[p]))
        .collect()
}
