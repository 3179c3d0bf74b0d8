//! # SymEdit Core Library
//!
//! A symmetry-constrained structure-editing engine for periodic (crystallographic) and
//! free-form molecular models. Atoms can be dragged, rotated, added or deleted while every
//! symmetry-equivalent copy follows along and the local site symmetry is preserved.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Structure`, `Atom`, `UnitCell`),
//!   the space-group algebra (`SymmetryOperation`, `SpaceGroup`, Jones-faithful notation) and the
//!   subgroup relation index.
//!
//! - **[`engine`]: The Logic Core.** The stateful layer: per-model symmetry caches, the
//!   operation provider, basis-atom index, constraint model, the propagation engine with its
//!   snapshot transactions, and the transformation-pathway composer.
//!
//! - **[`workflows`]: The Public API.** The [`workflows::edit::SymmetryEditor`] facade that a host
//!   application drives to edit a structure.

pub mod core;
pub mod engine;
pub mod workflows;
