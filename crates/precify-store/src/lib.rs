//! # precify-store: Persistence Layer for Precify
//!
//! Everything between the in-memory catalog and bytes at rest.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   precify-session (Commands)                            │
//! │        persist_if_changed() drives this crate after every mutation     │
//! └─────────────────────────────────┬───────────────────────────────────────┘
//! ┌─────────────────────────────────▼───────────────────────────────────────┐
//! │                 ★ precify-store (THIS CRATE) ★                          │
//! │                                                                         │
//! │   ┌────────────────┐   ┌────────────────┐   ┌────────────────────────┐ │
//! │   │     codec      │   │     store      │   │   remote / memory      │ │
//! │   │ CSV ⇄ drafts   │   │ ItemStore trait│   │ contents API / in-proc │ │
//! │   │ tolerant parse │   │ Document+token │   │ revision-checked PUT   │ │
//! │   └────────────────┘   └────────────────┘   └────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Tolerant reads**: the remote document is hand-editable; cell garbage
//!    coerces, never errors
//! 2. **Revision-checked writes**: every upload echoes the last seen token;
//!    a stale token is a recoverable [`error::StoreError::RevisionConflict`]
//! 3. **Blob-level trait**: [`store::ItemStore`] moves documents, not items —
//!    the codec is a separate, synchronous, pure concern

pub mod codec;
pub mod error;
pub mod memory;
pub mod remote;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use remote::{RemoteCsvStore, RemoteStoreConfig};
pub use store::{Document, ItemStore};
