//! Forward contract matching and verification engine.
//!
//! Contracts are immutable proposals over fixed commodity terms. Concurrent
//! acceptance races are resolved through a conditional write at the store
//! boundary, the winning contract is hashed into a reproducible verification
//! record, and a background pipeline publishes the canonical document to a
//! content-addressed store.

pub mod anchor;
pub mod canonical;
pub mod contract;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod service;
pub mod store;
pub mod utils;
