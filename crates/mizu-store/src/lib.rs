//! mizu-store - durable state stores for pipeline sessions
//!
//! A `StateStore` maps dotted keys to scalars for one actor. Snapshots are
//! written wholesale through a pluggable `SnapshotBackend`.

pub mod backend;
pub mod document;
pub mod store;

pub use backend::{JsonFileBackend, MemoryBackend, SnapshotBackend};
pub use store::StateStore;
