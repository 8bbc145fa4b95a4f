//! Collaborator traits
//!
//! The core talks to the outside world only through these interfaces.
//!
//! - [`Carrier`]: Navex HTTP API (submit shipment, fetch status)
//! - [`OrderRepository`]: host order persistence (read, list, status change)
//! - [`MetaStore`]: per-order key/value metadata
//! - [`NonceVerifier`]: request token check used by the handlers

pub mod carrier;
pub mod meta_store;
pub mod nonce;
pub mod order_repository;

pub use carrier::{Carrier, CarrierFactory, CarrierResponse, ResponseKey};
pub use meta_store::MetaStore;
pub use nonce::{FixedNonce, NonceVerifier};
pub use order_repository::OrderRepository;
