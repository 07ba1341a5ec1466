//! Owning, resizable byte store.
//!
//! Every length change goes through [`ByteStore::resize`], which reconciles
//! the view registry before returning.

use std::cmp::Ordering;
use std::ops::Range;

use tracing::{debug, trace};

use crate::codec::{self, Endian};
use crate::view::{View, ViewId, ViewRegistry, ViewState};
use crate::{BufferError, Result};

/// Default number of views a store keeps before evicting the oldest.
pub const DEFAULT_VIEW_CAPACITY: usize = 8;

/// Per-store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StoreConfig {
    /// Bounded size of the view registry. Zero is treated as one.
    pub view_capacity: usize,
    /// Return an existing view for an identical range instead of a new one.
    pub dedup_views: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            view_capacity: DEFAULT_VIEW_CAPACITY,
            dedup_views: true,
        }
    }
}

impl StoreConfig {
    pub fn with_view_capacity(mut self, capacity: usize) -> Self {
        self.view_capacity = capacity;
        self
    }

    pub fn with_dedup_views(mut self, dedup: bool) -> Self {
        self.dedup_views = dedup;
        self
    }
}

/// A contiguous, resizable region that packing can write into.
///
/// Implemented by [`ByteStore`] and by [`ViewMut`], so the format
/// interpreter grows either through the same resize path.
pub trait ByteBuf {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bytes(&self) -> &[u8];

    fn bytes_mut(&mut self) -> &mut [u8];

    fn resize(&mut self, new_len: usize) -> Result<()>;

    /// Overwrites bytes at `pos`, growing when the write runs past the end.
    /// A `pos` beyond the end is clamped to the end.
    fn write_at(&mut self, pos: usize, src: &[u8]) -> Result<usize> {
        let pos = pos.min(self.len());
        let end = grown(pos, src.len())?;
        if end > self.len() {
            self.resize(end)?;
        }
        self.bytes_mut()[pos..end].copy_from_slice(src);
        Ok(end)
    }
}

/// Owning byte store with a bounded registry of subbuffer views.
#[derive(Debug)]
pub struct ByteStore {
    data: Vec<u8>,
    views: ViewRegistry,
    config: StoreConfig,
}

impl Default for ByteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ByteStore {
    /// Copies the bytes only; the clone starts with no views.
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl PartialEq for ByteStore {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for ByteStore {}

impl AsRef<[u8]> for ByteStore {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl ByteStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            data: Vec::new(),
            views: ViewRegistry::new(&config),
            config,
        }
    }

    /// Creates a store holding a copy of `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_slice_with_config(bytes, StoreConfig::default())
    }

    pub fn from_slice_with_config(bytes: &[u8], config: StoreConfig) -> Result<Self> {
        let mut store = Self::with_config(config);
        store.resize(bytes.len())?;
        store.data.copy_from_slice(bytes);
        Ok(store)
    }

    /// Returns an independent store with the same bytes and no views.
    pub fn copy(&self) -> Self {
        Self {
            data: self.data.clone(),
            views: ViewRegistry::new(&self.config),
            config: self.config.clone(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Address of the storage; changes when a resize moves the allocation.
    pub fn as_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Changes the length to exactly `new_len` bytes.
    ///
    /// Resizing to the current length is a no-op. Bytes exposed by growth
    /// are zero. On allocation failure the store is left unchanged.
    pub fn resize(&mut self, new_len: usize) -> Result<()> {
        let old_len = self.data.len();
        if new_len == old_len {
            return Ok(());
        }
        let old_ptr = self.data.as_ptr();
        if new_len == 0 {
            self.data = Vec::new();
        } else if new_len > old_len {
            self.data
                .try_reserve_exact(new_len - old_len)
                .map_err(|_| BufferError::Alloc { requested: new_len })?;
            self.data.resize(new_len, 0);
        } else {
            self.data.truncate(new_len);
            self.data.shrink_to_fit();
        }
        let moved = self.data.as_ptr() != old_ptr;
        let invalidated = self.views.reconcile(old_len, new_len, moved);
        trace!(old_len, new_len, moved, invalidated, "store resized");
        Ok(())
    }

    /// Frees the storage; every view becomes invalid.
    pub fn clear(&mut self) {
        let shrunk = self.resize(0);
        debug_assert!(shrunk.is_ok(), "shrinking to zero never allocates");
    }

    /// Resizes and zero-fills any tail exposed by growth.
    pub fn set_len(&mut self, new_len: usize) -> Result<()> {
        let old_len = self.len();
        self.resize(new_len)?;
        if new_len > old_len {
            self.data[old_len..].fill(0);
        }
        Ok(())
    }

    // ------------------------------------------------------------------ views

    /// Creates a view over `[begin, end)`, clamped to the current length.
    pub fn view(&mut self, begin: usize, end: usize) -> ViewId {
        self.views.create(self.data.len(), begin, end)
    }

    pub fn view_state(&self, id: ViewId) -> ViewState {
        self.views.state(id)
    }

    pub fn view_info(&self, id: ViewId) -> Result<View> {
        self.views.get(id).ok_or(BufferError::InvalidView(id))
    }

    pub fn view_bytes(&self, id: ViewId) -> Result<&[u8]> {
        let view = self.view_info(id)?;
        Ok(&self.data[view.offset..view.end()])
    }

    /// Releases a view. Releasing an already invalid view is an error.
    pub fn release_view(&mut self, id: ViewId) -> Result<()> {
        if self.views.release(id) {
            Ok(())
        } else {
            Err(BufferError::InvalidView(id))
        }
    }

    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    /// Invalidates every view without touching the bytes.
    pub fn invalidate_views(&mut self) {
        let count = self.views.clear();
        if count > 0 {
            debug!(count, "views invalidated");
        }
    }

    /// Mutable handle that treats a view as a buffer of its own.
    pub fn view_mut(&mut self, id: ViewId) -> Result<ViewMut<'_>> {
        self.view_info(id)?;
        Ok(ViewMut { store: self, id })
    }

    /// Resizes a view by inserting or removing bytes at its end.
    ///
    /// Growing shifts the parent's trailing bytes forward and zero-fills the
    /// gap; shrinking shifts them backward before the parent shrinks. Both
    /// happen under one `&mut self` borrow.
    pub fn resize_view(&mut self, id: ViewId, new_len: usize) -> Result<()> {
        let view = self.view_info(id)?;
        if new_len == view.len {
            return Ok(());
        }
        let parent_len = self.data.len();
        let old_end = view.end();
        if new_len > view.len {
            let delta = new_len - view.len;
            self.resize(grown(parent_len, delta)?)?;
            self.data.copy_within(old_end..parent_len, old_end + delta);
            self.data[old_end..old_end + delta].fill(0);
        } else {
            let delta = view.len - new_len;
            self.data.copy_within(old_end..parent_len, old_end - delta);
            self.resize(parent_len - delta)?;
        }
        self.views.set_len(id, new_len);
        Ok(())
    }

    // ------------------------------------------------------------- mutations

    fn clamp_range(&self, range: Range<usize>) -> Range<usize> {
        let start = range.start.min(self.len());
        let end = range.end.clamp(start, self.len());
        start..end
    }

    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_at(self.len(), bytes).map(|_| ())
    }

    /// Inserts `bytes` at `pos`, shifting the tail forward.
    pub fn insert(&mut self, pos: usize, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let pos = pos.min(self.len());
        let old_len = self.len();
        self.resize(old_len + bytes.len())?;
        self.data.copy_within(pos..old_len, pos + bytes.len());
        self.data[pos..pos + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Removes a range, shifting the tail backward.
    pub fn remove(&mut self, range: Range<usize>) -> Result<()> {
        let range = self.clamp_range(range);
        if range.is_empty() {
            return Ok(());
        }
        let old_len = self.len();
        let removed = range.len();
        self.data.copy_within(range.end..old_len, range.start);
        self.resize(old_len - removed)
    }

    /// Fills a range with `pattern` repeated; an empty pattern fills zeros.
    pub fn fill(&mut self, range: Range<usize>, pattern: &[u8]) {
        let range = self.clamp_range(range);
        fill_pattern(&mut self.data[range], pattern);
    }

    /// Replaces the content with `pattern` repeated `times` times.
    pub fn repeat(&mut self, pattern: &[u8], times: usize) -> Result<()> {
        let new_len = pattern
            .len()
            .checked_mul(times)
            .ok_or(BufferError::Alloc {
                requested: usize::MAX,
            })?;
        self.resize(new_len)?;
        fill_pattern(&mut self.data, pattern);
        Ok(())
    }

    /// Copies `src` to `dst` with memmove semantics. Growing to fit, and
    /// zero-filling the gap when `dst` lies past the end.
    pub fn move_within(&mut self, src: Range<usize>, dst: usize) -> Result<()> {
        let src = self.clamp_range(src);
        let old_len = self.len();
        let end = grown(dst, src.len())?;
        if end > old_len {
            self.resize(end)?;
        }
        self.data.copy_within(src.clone(), dst);
        if dst > old_len {
            self.data[old_len..dst].fill(0);
        }
        Ok(())
    }

    pub fn reverse(&mut self, range: Range<usize>) {
        let range = self.clamp_range(range);
        self.data[range].reverse();
    }

    /// Exchanges `[..at]` and `[at..]`.
    pub fn swap(&mut self, at: usize) {
        let at = at.min(self.len());
        self.data.rotate_left(at);
    }

    pub fn byte(&self, pos: usize) -> Option<u8> {
        self.data.get(pos).copied()
    }

    /// Sets one byte; `pos == len` appends.
    pub fn set_byte(&mut self, pos: usize, value: u8) -> Result<()> {
        if pos > self.len() {
            return Err(BufferError::OutOfBounds {
                offset: pos,
                len: self.len(),
            });
        }
        self.write_at(pos, &[value]).map(|_| ())
    }

    // --------------------------------------------------------------- scalars

    pub fn get_uint(&self, pos: usize, width: usize, endian: Endian) -> Result<Option<u64>> {
        if width == 0 || width > codec::MAX_INT_WIDTH {
            return Err(BufferError::InvalidWidth(width));
        }
        match self.field(pos, width) {
            Some(bytes) => codec::read_uint(bytes, width, endian).map(Some),
            None => Ok(None),
        }
    }

    pub fn get_int(&self, pos: usize, width: usize, endian: Endian) -> Result<Option<i64>> {
        Ok(self
            .get_uint(pos, width, endian)?
            .map(|n| codec::expand_sign(n, width)))
    }

    /// Writes an integer at `pos`, growing the store as needed.
    pub fn set_int(&mut self, pos: usize, width: usize, endian: Endian, value: i64) -> Result<()> {
        let mut scratch = [0u8; codec::MAX_INT_WIDTH];
        codec::write_int(&mut scratch, width, endian, value)?;
        self.write_at(pos, &scratch[..width]).map(|_| ())
    }

    fn field(&self, pos: usize, width: usize) -> Option<&[u8]> {
        let end = pos.checked_add(width)?;
        self.data.get(pos..end)
    }

    /// Lexicographic byte comparison, shorter first on a common prefix.
    pub fn compare(&self, other: &[u8]) -> Ordering {
        crate::cmp::compare(&self.data, other)
    }
}

impl ByteBuf for ByteStore {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn resize(&mut self, new_len: usize) -> Result<()> {
        ByteStore::resize(self, new_len)
    }
}

/// `len + extra`, or an allocation error when it does not fit in `usize`.
fn grown(len: usize, extra: usize) -> Result<usize> {
    len.checked_add(extra).ok_or(BufferError::Alloc {
        requested: usize::MAX,
    })
}

fn fill_pattern(dest: &mut [u8], pattern: &[u8]) {
    match pattern.len() {
        0 => dest.fill(0),
        1 => dest.fill(pattern[0]),
        n => {
            for chunk in dest.chunks_mut(n) {
                chunk.copy_from_slice(&pattern[..chunk.len()]);
            }
        }
    }
}

/// A valid view borrowed as a buffer of its own.
///
/// Resizing goes through [`ByteStore::resize_view`], so the parent's
/// trailing bytes follow the view's end.
#[derive(Debug)]
pub struct ViewMut<'a> {
    store: &'a mut ByteStore,
    id: ViewId,
}

impl ViewMut<'_> {
    pub fn id(&self) -> ViewId {
        self.id
    }

    fn window(&self) -> Range<usize> {
        // The view cannot be invalidated while this borrow is alive.
        match self.store.views.get(self.id) {
            Some(view) => view.offset..view.end(),
            None => 0..0,
        }
    }
}

impl ByteBuf for ViewMut<'_> {
    fn len(&self) -> usize {
        self.window().len()
    }

    fn bytes(&self) -> &[u8] {
        let window = self.window();
        &self.store.data[window]
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        let window = self.window();
        &mut self.store.data[window]
    }

    fn resize(&mut self, new_len: usize) -> Result<()> {
        self.store.resize_view(self.id, new_len)
    }
}
