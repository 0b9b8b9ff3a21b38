//! Emporium Core - Shared domain types.
//!
//! This crate provides the small set of types used across all Emporium crates:
//! - `web` - The server-rendered shop (catalog, cart, orders, admin, auth)
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP.
//! Enabling the `postgres` feature adds `sqlx` encode/decode impls so the
//! types can be bound directly in queries.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
