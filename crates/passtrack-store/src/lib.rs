//! # passtrack-store
//!
//! SQLite-backed persistence for passtrack (orders, users, audit log).

pub mod store;

pub use store::Store;
