//! Chirp shared types and utilities
//!
//! This crate contains the database pool helpers and types shared across the
//! Chirp backend.

pub mod db;
pub mod types;

pub use db::*;
pub use types::*;
