//! Recycling pool for joints, vertices and points.
//!
//! Released objects keep their heap allocations (influence lists, names) so
//! that delete/undo/redo cycles do not churn the allocator. An object drawn
//! from the pool is reinitialized through [`Recycle::recycle`] before it is
//! handed out, so no cache-validity bit survives from a previous incarnation.

/// Objects that can be returned to a [`Pool`].
pub trait Recycle: Default {
    /// Restores the freshly-constructed state.
    ///
    /// Must assign every field; implementations may only keep allocation
    /// capacity.
    fn recycle(&mut self);
}

/// A free list of released objects.
#[derive(Debug)]
pub struct Pool<T> {
    free: Vec<T>,
    limit: usize,
}

impl<T: Recycle> Pool<T> {
    pub const DEFAULT_LIMIT: usize = 256;

    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(Self::DEFAULT_LIMIT)
    }

    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            free: Vec::new(),
            limit,
        }
    }

    /// Takes a reinitialized object from the free list, or constructs one.
    pub fn acquire(&mut self) -> T {
        match self.free.pop() {
            Some(mut obj) => {
                obj.recycle();
                obj
            }
            None => T::default(),
        }
    }

    /// Returns an object to the free list. Objects beyond the limit are dropped.
    pub fn release(&mut self, obj: T) {
        if self.free.len() < self.limit {
            self.free.push(obj);
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.free.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    pub fn clear(&mut self) {
        self.free.clear();
    }
}

impl<T: Recycle> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}
