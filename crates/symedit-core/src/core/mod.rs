//! # Core Module
//!
//! The fundamental building blocks of SymEdit: structure models and the symmetry algebra.
//!
//! ## Architecture
//!
//! - **Structure Representation** ([`models`]) - Atoms, models, unit cells and the atom store
//! - **Symmetry Algebra** ([`symmetry`]) - Operations, notation parsing, space-group tables and
//!   the subgroup relation index
//! - **Geometry Utilities** ([`utils`]) - Rotations and small linear-algebra helpers
//!
//! Nothing in this module keeps state between calls; caching lives in [`crate::engine`].

pub mod models;
pub mod symmetry;
pub mod utils;
