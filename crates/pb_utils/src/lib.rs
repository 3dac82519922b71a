//! Small shared containers and text helpers used across the `pb_*` crates.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod typeid_map;

pub mod hash;
pub mod text;

// -----------------------------------------------------------------------------
// Top-level exports

pub use typeid_map::TypeIdMap;
