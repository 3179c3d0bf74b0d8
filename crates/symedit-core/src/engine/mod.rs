//! # Engine Module
//!
//! The symmetry-constrained editing engine: everything between a raw edit request (an atom and
//! a target position, or a pathway string) and the positions committed to the model store.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Numerical tolerances and the drag projection policy
//! - **Store Seam** ([`context`]) - Traits the engine uses to read and write atoms
//! - **Symmetry Lookups** ([`provider`]) - Fractional/Cartesian conversion and site symmetry
//! - **Constraints** ([`constraint`]) - Free, line, plane and locked site constraints
//! - **Propagation** ([`propagation`]) - Single-atom drags, batch moves and rotations
//! - **Outcomes** ([`state`]) - Accepted and rejected move results
//! - **Pathways** ([`pathway`]) - Group/subgroup/setting chains composed into one transform
//! - **Error Handling** ([`error`]) - Engine-specific error types
//!
//! Per-model caches (basis index, constraints) and the snapshot transactions used by the
//! propagation engine are internal to the engine and owned by the
//! [`SymmetryEditor`](crate::workflows::edit::SymmetryEditor).

pub(crate) mod basis;
pub(crate) mod cache;
pub mod config;
pub mod constraint;
pub mod context;
pub mod error;
pub mod pathway;
pub mod propagation;
pub mod provider;
pub mod state;
pub(crate) mod transaction;
