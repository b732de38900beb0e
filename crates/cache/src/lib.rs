//! SQLite cache database for self-citation counts.
//!
//! This crate provides the derived cache that tracks, for every cited record
//! (the *citee*), which citing records share its authorship. The database is
//! not the source of truth - the record store and citation graph are. If the
//! database is deleted, it can be rebuilt by a full refresh pass.
//!
//! # Architecture
//! The cache stores four kinds of state:
//! - **Entries**: one per citee, holding the self-citation count, the
//!   citee's outbound references at computation time, and when it was
//!   computed.
//! - **Relation**: (citee, citer) pairs, each stamped with when it was first
//!   recorded. Rows that survive a recomputation keep their timestamp.
//! - **Watermarks**: one timestamp per named method, never lowered.
//! - **Method data**: the bulk citee -> count dictionary, replaced in one
//!   write at the end of every pass.

mod db;
mod entry;
pub mod error;
mod models;
mod repo;

pub use crate::db::Database;
pub use crate::entry::{CacheEntry, Changeset, Citation};
pub use crate::repo::Repository;

/// Identifier of a record in the bibliographic record store.
pub type RecordId = u64;
