//! Resizable byte store with subbuffer views and a width-aware binary codec.
//!
//! # Overview
//!
//! - [`ByteStore`] - owns a contiguous byte region; every length change runs
//!   through [`ByteStore::resize`], which reconciles registered views
//! - [`ViewRegistry`] - bounded FIFO of subbuffer views (offset + length)
//! - [`StoreArena`] - stores addressed by generation-checked [`StoreId`]s,
//!   views by [`ViewHandle`]
//! - [`codec`] - 1 to 8 byte integers and IEEE floats in either byte order
//! - [`Reader`] - cursor over a byte slice driving the codec
//!
//! # Example
//!
//! ```
//! use packbuf_buffers::{ByteStore, Endian, ViewState};
//!
//! let mut store = ByteStore::from_slice(b"0123456789").unwrap();
//! let view = store.view(5, 8);
//! assert_eq!(store.view_bytes(view).unwrap(), b"567");
//!
//! // Shrinking past the view's end truncates it.
//! store.resize(7).unwrap();
//! assert_eq!(store.view_bytes(view).unwrap(), b"56");
//!
//! // Shrinking past its start invalidates it.
//! store.resize(4).unwrap();
//! assert_eq!(store.view_state(view), ViewState::Invalid);
//!
//! store.set_int(4, 2, Endian::Big, -2).unwrap();
//! assert_eq!(store.get_int(4, 2, Endian::Big).unwrap(), Some(-2));
//! ```

mod arena;
mod cmp;
pub mod codec;
mod reader;
mod store;
mod view;

pub use arena::{StoreArena, StoreId, ViewHandle};
pub use cmp::{compare, compare_sign, equal};
pub use codec::Endian;
pub use reader::Reader;
pub use store::{ByteBuf, ByteStore, StoreConfig, ViewMut, DEFAULT_VIEW_CAPACITY};
pub use view::{View, ViewId, ViewRegistry, ViewState};

use thiserror::Error;

/// Error type for buffer operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// The allocator could not provide `requested` bytes; the store is unchanged.
    #[error("cannot allocate {requested} bytes")]
    Alloc { requested: usize },
    /// The view was released, evicted or invalidated by a resize.
    #[error("invalid subbuffer ({0})")]
    InvalidView(ViewId),
    /// The store handle no longer refers to a live store.
    #[error("unknown {0}")]
    UnknownStore(StoreId),
    #[error("offset {offset} out of bounds (length {len})")]
    OutOfBounds { offset: usize, len: usize },
    #[error("invalid width {0}")]
    InvalidWidth(usize),
}

pub type Result<T> = std::result::Result<T, BufferError>;
