//! Arena of byte stores addressed by integer handles.
//!
//! Stores live in generation-checked slots, so a handle to a released store
//! never resolves to a store created later in the same slot. A view is
//! addressed by its store handle plus its per-store [`ViewId`].

use std::fmt;

use tracing::trace;

use crate::store::{ByteStore, StoreConfig};
use crate::view::{ViewId, ViewState};
use crate::{BufferError, Result};

/// Handle of a store inside a [`StoreArena`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreId {
    index: u32,
    generation: u32,
}

impl StoreId {
    pub const fn index(self) -> u32 {
        self.index
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreId({}:{})", self.index, self.generation)
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "store {}:{}", self.index, self.generation)
    }
}

/// Handle of a view: `(store, view)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewHandle {
    pub store: StoreId,
    pub view: ViewId,
}

#[derive(Debug)]
enum Slot {
    Occupied {
        store: ByteStore,
        generation: u32,
    },
    Vacant {
        next_free: Option<u32>,
        generation: u32,
    },
}

/// Owner of many stores.
#[derive(Debug, Default)]
pub struct StoreArena {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    len: usize,
    config: StoreConfig,
}

impl StoreArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every store created by this arena uses `config`.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Number of live stores.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn insert(&mut self, store: ByteStore) -> StoreId {
        self.len += 1;
        if let Some(index) = self.free_head {
            let slot = &mut self.slots[index as usize];
            if let Slot::Vacant {
                next_free,
                generation,
            } = *slot
            {
                self.free_head = next_free;
                *slot = Slot::Occupied { store, generation };
                return StoreId { index, generation };
            }
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot::Occupied {
            store,
            generation: 0,
        });
        StoreId {
            index,
            generation: 0,
        }
    }

    /// Creates an empty store.
    pub fn create(&mut self) -> StoreId {
        let store = ByteStore::with_config(self.config.clone());
        self.insert(store)
    }

    /// Creates a store holding a copy of `bytes`.
    pub fn create_from(&mut self, bytes: &[u8]) -> Result<StoreId> {
        let store = ByteStore::from_slice_with_config(bytes, self.config.clone())?;
        Ok(self.insert(store))
    }

    /// Creates an independent copy of an existing store.
    pub fn copy(&mut self, id: StoreId) -> Result<StoreId> {
        let store = self.get(id)?.copy();
        Ok(self.insert(store))
    }

    pub fn get(&self, id: StoreId) -> Result<&ByteStore> {
        match self.slots.get(id.index as usize) {
            Some(Slot::Occupied { store, generation }) if *generation == id.generation => {
                Ok(store)
            }
            _ => Err(BufferError::UnknownStore(id)),
        }
    }

    pub fn get_mut(&mut self, id: StoreId) -> Result<&mut ByteStore> {
        match self.slots.get_mut(id.index as usize) {
            Some(Slot::Occupied { store, generation }) if *generation == id.generation => {
                Ok(store)
            }
            _ => Err(BufferError::UnknownStore(id)),
        }
    }

    /// Releases a store and hands it back detached, with every view
    /// invalidated. Dropping the returned store frees its storage.
    pub fn release(&mut self, id: StoreId) -> Result<ByteStore> {
        self.get(id)?;
        let vacant = Slot::Vacant {
            next_free: self.free_head,
            generation: id.generation.wrapping_add(1),
        };
        match std::mem::replace(&mut self.slots[id.index as usize], vacant) {
            Slot::Occupied { mut store, .. } => {
                self.free_head = Some(id.index);
                self.len -= 1;
                store.invalidate_views();
                trace!(store = %id, "store released");
                Ok(store)
            }
            Slot::Vacant { .. } => Err(BufferError::UnknownStore(id)),
        }
    }

    // ------------------------------------------------------------------ views

    pub fn view(&mut self, store: StoreId, begin: usize, end: usize) -> Result<ViewHandle> {
        let view = self.get_mut(store)?.view(begin, end);
        Ok(ViewHandle { store, view })
    }

    /// A view of a released store is invalid.
    pub fn view_is_valid(&self, handle: ViewHandle) -> bool {
        self.get(handle.store)
            .map(|s| s.view_state(handle.view) == ViewState::Valid)
            .unwrap_or(false)
    }

    pub fn view_bytes(&self, handle: ViewHandle) -> Result<&[u8]> {
        match self.get(handle.store) {
            Ok(store) => store.view_bytes(handle.view),
            Err(_) => Err(BufferError::InvalidView(handle.view)),
        }
    }

    pub fn release_view(&mut self, handle: ViewHandle) -> Result<()> {
        match self.get_mut(handle.store) {
            Ok(store) => store.release_view(handle.view),
            Err(_) => Err(BufferError::InvalidView(handle.view)),
        }
    }

    pub fn resize_view(&mut self, handle: ViewHandle, new_len: usize) -> Result<()> {
        match self.get_mut(handle.store) {
            Ok(store) => store.resize_view(handle.view, new_len),
            Err(_) => Err(BufferError::InvalidView(handle.view)),
        }
    }
}
