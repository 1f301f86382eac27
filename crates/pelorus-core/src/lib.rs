//! # pelorus-core
//!
//! Core instrument data model and path store.
//!
//! This crate provides:
//! - Data model types (PathRecord, PrimitiveValue, Zone, alarm events)
//! - Path canonicalization and the self-context cell
//! - The in-memory per-path store
//! - Settings types for externally supplied zone/unit configuration
//!
//! This crate is intentionally runtime-agnostic and contains no async
//! code; channel-based fan-out lives in `pelorus-engine`.

pub mod config;
pub mod model;
pub mod path;
pub mod store;

pub use model::*;
pub use path::{canonical_path, is_self_path, SelfContext};
pub use store::PathStore;
