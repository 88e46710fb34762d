//! Fixed-capacity recycling pools
//!
//! Every slot is created up front and lives in exactly one of two FIFO queues
//! (inactive/active). Nothing is allocated or freed after construction.

use std::collections::VecDeque;

/// A bounded pool of pre-built entities
#[derive(Debug, Clone)]
pub struct Pool<T> {
    items: Vec<T>,
    inactive: VecDeque<usize>,
    active: VecDeque<usize>,
}

/// Spawns into the pool being ticked.
///
/// New entities join the back of the active queue, behind the tick snapshot,
/// so they are first processed on the following tick.
pub struct Spawner<'a, T> {
    left: &'a mut [T],
    right: &'a mut [T],
    pivot: usize,
    inactive: &'a mut VecDeque<usize>,
    active: &'a mut VecDeque<usize>,
}

impl<T> Spawner<'_, T> {
    pub fn spawn(&mut self, init: impl FnOnce(&mut T)) -> bool {
        let Some(idx) = self.inactive.pop_front() else {
            return false;
        };
        let slot = if idx < self.pivot {
            &mut self.left[idx]
        } else {
            &mut self.right[idx - self.pivot - 1]
        };
        init(slot);
        self.active.push_back(idx);
        true
    }
}

impl<T> Pool<T> {
    /// Build `capacity` entities with `make(slot_index)`
    pub fn new(capacity: usize, mut make: impl FnMut(usize) -> T) -> Self {
        let items: Vec<T> = (0..capacity).map(&mut make).collect();
        let mut inactive = VecDeque::with_capacity(capacity);
        inactive.extend(0..capacity);
        Self {
            items,
            inactive,
            active: VecDeque::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    #[inline]
    pub fn inactive_count(&self) -> usize {
        self.inactive.len()
    }

    /// Activate a free slot. Returns false when the pool is exhausted.
    pub fn spawn(&mut self, init: impl FnOnce(&mut T)) -> bool {
        let Some(idx) = self.inactive.pop_front() else {
            return false;
        };
        init(&mut self.items[idx]);
        self.active.push_back(idx);
        true
    }

    /// Process exactly the entities that were active when the call started.
    ///
    /// `f` returns true to keep the entity active, false to retire it.
    /// Entities spawned through the `Spawner` during the pass are not visited.
    pub fn tick(&mut self, mut f: impl FnMut(&mut T, &mut Spawner<'_, T>) -> bool) {
        let count = self.active.len();
        for _ in 0..count {
            let Some(idx) = self.active.pop_front() else {
                break;
            };
            let (left, rest) = self.items.split_at_mut(idx);
            let Some((item, right)) = rest.split_first_mut() else {
                continue;
            };
            let mut spawner = Spawner {
                left,
                right,
                pivot: idx,
                inactive: &mut self.inactive,
                active: &mut self.active,
            };
            if f(item, &mut spawner) {
                self.active.push_back(idx);
            } else {
                self.inactive.push_back(idx);
            }
        }
        debug_assert_eq!(self.active.len() + self.inactive.len(), self.items.len());
    }

    /// Retire every active entity, bypassing normal expiry
    pub fn clear(&mut self, mut on_retire: impl FnMut(&mut T)) {
        let count = self.active.len();
        for _ in 0..count {
            let Some(idx) = self.active.pop_front() else {
                break;
            };
            on_retire(&mut self.items[idx]);
            self.inactive.push_back(idx);
        }
    }

    /// Active entities in queue order
    pub fn iter_active(&self) -> impl Iterator<Item = &T> + '_ {
        self.active.iter().map(move |&idx| &self.items[idx])
    }
}
