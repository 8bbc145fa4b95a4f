// # navex-core
//
// Core library for Navex parcel-carrier order synchronization.
//
// ## Architecture Overview
//
// - **Carrier**: Trait for the Navex HTTP API (submit shipment, fetch status)
// - **OrderRepository / MetaStore**: Traits for the host's orders and per-order metadata
// - **payload**: Pure order → shipment request builder
// - **TrackingStore**: Per-order tracking fields over the metadata facility
// - **status**: Host order states and the carrier-driven transitions
// - **SyncEngine**: Orchestrates request code → refresh status → transition
// - **handlers**: Admin endpoints returning the host's JSON envelope
//
// ## Design Principles
//
// 1. **Explicit credentials**: Every operation receives `CarrierCredentials`; nothing global
// 2. **Collaborators as traits**: The host and the carrier are injected
// 3. **Partial failure is normal**: Batches and reconciliation log and continue
// 4. **Library-First**: The daemon is a thin scheduler over `SyncEngine`

pub mod config;
pub mod error;
pub mod handlers;
pub mod host;
pub mod order;
pub mod payload;
pub mod sanitize;
pub mod status;
pub mod sync;
pub mod tracking;
pub mod traits;

// Re-export core types for convenience
pub use config::{CarrierCredentials, EngineConfig, HostStoreConfig, SyncConfig};
pub use error::{Error, ErrorKind, Result};
pub use host::{FileHostStore, MemoryHostStore};
pub use order::{Address, OrderId, OrderItem, OrderSnapshot};
pub use payload::{FieldPolicy, ShipmentRequest};
pub use status::{CarrierStatus, OrderStatus};
pub use sync::{BulkOutcome, CodeOutcome, ReconcileReport, StatusOutcome, SyncEngine, SyncEvent};
pub use tracking::{TrackingRecord, TrackingStore, TrackingUpdate, TrackingView};
pub use traits::{Carrier, CarrierFactory, CarrierResponse, MetaStore, NonceVerifier, OrderRepository};
