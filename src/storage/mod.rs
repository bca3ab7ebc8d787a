//! Durable key-value storage for data that outlives the process.
//!
//! This module provides the `BlobStore` abstraction used to persist the
//! exchange rate snapshot across restarts. Two implementations ship:
//! `FileStore` writes one JSON file per key, `MemoryStore` keeps
//! everything in a map for tests.

pub mod blob;

pub use blob::{BlobStore, FileStore, MemoryStore};
