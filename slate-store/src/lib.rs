//! SQLite storage layer for the Slate sync engine.
//!
//! Two stores, both append-only where it matters:
//!
//! - [`OutboxStore`] — the durable outbox/inbox log of sync messages. The
//!   local source of truth for "what must be sent" and "what has been
//!   received". A PENDING message is never lost before it reaches SYNCED;
//!   crash recovery reverts in-flight uploads to PENDING on open.
//! - [`RegistryStore`] — the single device-registration row.
//!
//! The relational store for materialized domain entities (courses,
//! schedules) is *not* here — the sync core reaches it through the
//! `EntityStore` collaborator trait in `slate-sync`.

mod error;
mod outbox;
mod registry;

pub use error::{StoreError, StoreResult};
pub use outbox::{InboundOutcome, OutboxStore, StatusCounts};
pub use registry::{DeviceRegistration, RegistryStore};
