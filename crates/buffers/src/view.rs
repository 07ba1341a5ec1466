//! Subbuffer view registry.
//!
//! A [`ByteStore`](crate::ByteStore) keeps a bounded FIFO of view
//! descriptors. A view is Valid exactly while its descriptor is registered;
//! once removed (released, evicted or invalidated by a resize) its id never
//! resolves again.

use std::collections::VecDeque;
use std::fmt;

use tracing::debug;

use crate::StoreConfig;

/// Identifier of a view within its parent store.
///
/// Ids are allocated from a per-store counter and are never reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(u64);

impl ViewId {
    /// Returns the raw counter value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewId({})", self.0)
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view #{}", self.0)
    }
}

/// Validity of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Valid,
    Invalid,
}

/// A window onto the parent's bytes: `[offset, offset + len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct View {
    pub id: ViewId,
    pub offset: usize,
    pub len: usize,
}

impl View {
    /// End offset (exclusive) in the parent.
    #[inline]
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Bounded registry of live views.
#[derive(Debug, Clone)]
pub struct ViewRegistry {
    entries: VecDeque<View>,
    capacity: usize,
    dedup: bool,
    next_id: u64,
}

impl ViewRegistry {
    pub fn new(config: &StoreConfig) -> Self {
        let capacity = config.view_capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            dedup: config.dedup_views,
            next_id: 0,
        }
    }

    /// Maximum number of simultaneously valid views.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of valid views.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Valid views, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &View> {
        self.entries.iter()
    }

    pub fn get(&self, id: ViewId) -> Option<View> {
        self.entries.iter().find(|v| v.id == id).copied()
    }

    pub fn state(&self, id: ViewId) -> ViewState {
        if self.entries.iter().any(|v| v.id == id) {
            ViewState::Valid
        } else {
            ViewState::Invalid
        }
    }

    /// Registers a view over `[begin, end)` clamped to `parent_len`.
    ///
    /// A clamped `end` before `begin` gives an empty view at `begin`. An
    /// existing view with the same offset and length is returned instead of
    /// a new one when de-duplication is enabled. A full registry evicts its
    /// oldest entry.
    pub fn create(&mut self, parent_len: usize, begin: usize, end: usize) -> ViewId {
        let offset = begin.min(parent_len);
        let end = end.min(parent_len);
        let len = end.saturating_sub(offset);

        if self.dedup {
            if let Some(existing) = self
                .entries
                .iter()
                .find(|v| v.offset == offset && v.len == len)
            {
                return existing.id;
            }
        }

        if self.entries.len() >= self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                debug!(view = %evicted.id, "view registry full, evicting oldest view");
            }
        }

        let id = ViewId(self.next_id);
        self.next_id += 1;
        self.entries.push_back(View { id, offset, len });
        id
    }

    /// Removes a view; returns `false` if it was already invalid.
    pub fn release(&mut self, id: ViewId) -> bool {
        match self.entries.iter().position(|v| v.id == id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_len(&mut self, id: ViewId, len: usize) {
        if let Some(view) = self.entries.iter_mut().find(|v| v.id == id) {
            view.len = len;
        }
    }

    /// Invalidates every view.
    pub(crate) fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    /// Fixes up the registry after the parent changed from `old_len` to
    /// `new_len` bytes. Returns the number of views invalidated.
    pub(crate) fn reconcile(&mut self, old_len: usize, new_len: usize, moved: bool) -> usize {
        if new_len == 0 {
            let count = self.clear();
            if count > 0 {
                debug!(count, "parent emptied, all views invalidated");
            }
            return count;
        }

        if new_len >= old_len {
            // Offsets are relative to the parent's storage, so growth or a
            // moved allocation keeps every view intact.
            if moved {
                debug!(views = self.entries.len(), "views rebound to moved storage");
            }
            return 0;
        }

        let before = self.entries.len();
        self.entries.retain_mut(|view| {
            if view.offset > new_len {
                debug!(view = %view.id, offset = view.offset, new_len, "view invalidated by shrink");
                return false;
            }
            if view.end() > new_len {
                view.len = new_len - view.offset;
            }
            true
        });
        before - self.entries.len()
    }
}
