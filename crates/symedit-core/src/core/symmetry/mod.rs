//! # Symmetry Module
//!
//! Space-group and point-group algebra used by the editing engine.
//!
//! - [`notation`] - Jones-faithful `x,y,z` operations, `a,b,c` basis changes and explicit
//!   matrices, parsed into and formatted from 4x4 affine matrices
//! - [`operation`] - The [`operation::SymmetryOperation`] type and affine helpers
//! - [`groups`] - The built-in space-group table, named settings and group closure
//! - [`subgroups`] - Group/subgroup relations consumed by the pathway composer
//!
//! All operations act on fractional coordinates. Matrices follow the column-vector
//! convention: a point `x` maps to `W * [x; 1]`.

pub mod groups;
pub mod notation;
pub mod operation;
pub mod subgroups;
