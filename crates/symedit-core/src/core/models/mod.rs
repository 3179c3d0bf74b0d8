//! # Core Models Module
//!
//! Data structures describing the structures being edited.
//!
//! ## Key Components
//!
//! - [`atom`] - Individual atom with element, absolute position and symmetry site
//! - [`cell`] - Crystallographic unit cell and fractional/Cartesian conversion
//! - [`model`] - A model (frame) grouping atoms that share one symmetry description
//! - [`system`] - The atom store holding every model and atom
//! - [`ids`] - Key types for atoms and models
//!
//! ## Usage
//!
//! ```ignore
//! use symedit::core::models::{atom::Atom, cell::UnitCell, model::ModelSymmetry, system::Structure};
//!
//! let mut structure = Structure::new();
//! let cell = UnitCell::new([5.0, 6.0, 7.0], [90.0, 100.0, 90.0])?;
//! let model = structure.add_model("crystal", Some(ModelSymmetry::new("P 21", Some(cell))));
//! let atom_id = structure.add_atom(model, Atom::new("C", model, Point3::new(1.0, 2.0, 3.0)));
//! ```

pub mod atom;
pub mod cell;
pub mod ids;
pub mod model;
pub mod system;
