// src/model/mod.rs
// =============================================================================
// This module holds the data shapes returned by the results API.
//
// Submodules:
// - descriptor: one node of the region hierarchy (province, regency, ...)
// - record: the per-polling-unit result document we persist
//
// Rust concepts:
// - serde derive: Decode JSON straight into typed structs
// - Enums: To say "descend further" vs "fetch the leaf results"
// =============================================================================

mod descriptor;
mod record;

pub use descriptor::{Descriptor, Step};
pub use record::ResultRecord;
