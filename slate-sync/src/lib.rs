//! Offline-first, multi-device sync engine for Slate.
//!
//! Lets a user's schedule data converge across devices without a central
//! arbiter, tolerating intermittent connectivity, out-of-order delivery,
//! and concurrent edits.
//!
//! # Architecture
//!
//! - **Clock** (`slate-types`): Hybrid Logical Clock timestamps for causal
//!   ordering across unsynchronized physical clocks
//! - **Outbox/Inbox** (`slate-store`): durable, append-only log of sync
//!   messages
//! - **Registrar**: stable device identity, confirmed with the relay
//! - **Transport**: the wire contract, bound to HTTP via [`HttpTransport`]
//! - **Orchestrator**: periodic/on-demand cycles with retry and backoff
//! - **Merge engine**: last-writer-wins CRDT resolution, applied through
//!   the host's entity-store collaborator
//!
//! # Sync cycle
//!
//! 1. Ensure the device is registered (idempotent)
//! 2. Upload pending outbox messages, grouped by entity kind
//! 3. Download messages authored by other devices
//! 4. Advance the clock, dedup, and merge winners into local state
//!
//! Consistency comes from CRDT convergence, not cross-device locking: merge
//! is commutative, associative, and idempotent, so replicas agree no matter
//! the delivery order.
//!
//! # Example
//!
//! ```no_run
//! use slate_store::{OutboxStore, RegistryStore};
//! use slate_sync::transport::mock::MockTransport;
//! use slate_sync::{
//!     DeviceRegistrar, MemoryEntityStore, StaticSession, SyncConfig, SyncOrchestrator,
//! };
//! use slate_types::{HlcClock, NodeId};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(RegistryStore::open_in_memory()?);
//! let outbox = Arc::new(OutboxStore::open_in_memory()?);
//! let transport = Arc::new(MockTransport::new());
//! let registration = registry.ensure_device("user-1")?;
//! let clock = Arc::new(HlcClock::new(registration.device_id.as_node()));
//!
//! let orchestrator = SyncOrchestrator::new(
//!     SyncConfig::default(),
//!     clock,
//!     outbox,
//!     DeviceRegistrar::new(registry, transport.clone(), "docs example"),
//!     transport,
//!     Arc::new(MemoryEntityStore::new()),
//!     Arc::new(StaticSession::signed_in("user-1")),
//! );
//! let outcome = orchestrator.sync_cycle().await;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod http;
mod merge;
mod orchestrator;
mod registrar;
mod session;
pub mod transport;

pub use error::{SyncError, SyncResult};
pub use http::{HttpTransport, HttpTransportConfig};
pub use merge::{EntitySnapshot, EntityStore, MemoryEntityStore, MergeEngine, MergeOutcome};
pub use orchestrator::{CycleOutcome, CyclePhase, SyncConfig, SyncOrchestrator};
pub use registrar::DeviceRegistrar;
pub use session::{SessionProvider, StaticSession};
pub use transport::{RegistrationInfo, RegistrationReceipt, SyncTransport, UploadReceipt};
