//! # Workflows Module
//!
//! High-level entry points that a host application drives to edit a structure.
//!
//! ## Overview
//!
//! The engine layer exposes the individual pieces (operation providers, constraints, the
//! propagation engine and the pathway composer) but leaves their caches and snapshots to the
//! caller. The workflows here own that state, so a host only needs a model store and a
//! sequence of edit requests.
//!
//! ## Architecture
//!
//! - **Editing Workflow** ([`edit`]) - The [`edit::SymmetryEditor`] facade: constrained drags,
//!   batch moves and rotations, symmetry-aware add/delete, symmetry assignment and pathway
//!   resolution.

pub mod edit;
