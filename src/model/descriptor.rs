// src/model/descriptor.rs
// =============================================================================
// A Descriptor is one entry of a region listing, e.g. a province in
// `0.json` or a polling unit in a village's listing.
//
// The source encodes the depth of a node in `tingkat`:
//   1 = province, 2 = regency, 3 = district, 4 = village, 5 = polling unit
//
// The crawler only needs two facts from a node: its `code` (to build the next
// URL) and its `level` (to decide whether it is another region to expand or a
// polling unit whose results we fetch).
// =============================================================================

use serde::{Deserialize, Serialize};

// One node of the region hierarchy
//
// Every field is required: a listing entry missing any of them is a decode
// error for the whole listing. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Display name (not used for anything but logging)
    #[serde(rename = "nama")]
    pub name: String,
    /// Remote-assigned numeric id, not unique across levels
    #[serde(rename = "id")]
    pub identifier: i64,
    /// Path segment used to build this node's child URLs
    #[serde(rename = "kode")]
    pub code: String,
    /// Depth of this node in the hierarchy
    #[serde(rename = "tingkat")]
    pub level: u32,
}

// What to do with one child of a listing, decided by the child's level
//
// A child at the terminal level is a polling unit: its result document is
// fetched. Any shallower child is a region and gets expanded in turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A region: fetch its listing and recurse
    Descend(Descriptor),
    /// A polling unit: fetch its result record
    Leaf(Descriptor),
}

impl Step {
    pub fn classify(child: Descriptor, terminal_level: u32) -> Self {
        if child.level >= terminal_level {
            Step::Leaf(child)
        } else {
            Step::Descend(child)
        }
    }
}

impl Descriptor {
    /// Parses the code as the polling unit's numeric identifier
    ///
    /// This is the idempotency key of the stored record.
    pub fn numeric_code(&self) -> Option<i64> {
        self.code.trim().parse().ok()
    }
}
