//! # precify-session: Command Layer for Precify
//!
//! The caller-facing surface. A [`session::Session`] owns one document's
//! worth of state — catalog, field registry, store handle, persistence
//! baseline — and exposes explicit commands:
//!
//! ```text
//! add_item · edit_item · delete_item · bulk_replace · reconcile_grid
//! set_pool · set_policy · add_field · rename_field · delete_field
//! ```
//!
//! Every mutating command ends in `persist_if_changed`: the write-through
//! fires only when the content fingerprint moved, failures downgrade to
//! warnings, and a stale revision token gets one refresh-and-retry. The
//! caller reads the [`session::CommandOutcome`] and decides when to redraw —
//! there is no hidden control-flow restart anywhere.

pub mod error;
pub mod session;
pub mod telemetry;

pub use error::{SessionError, SessionResult};
pub use session::{CommandOutcome, Session};
