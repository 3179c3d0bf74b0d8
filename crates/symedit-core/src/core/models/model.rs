use super::cell::UnitCell;
use super::ids::AtomId;

/// Symmetry description attached to a model.
///
/// `group` is any group descriptor understood by
/// [`SpaceGroup::resolve`](crate::core::symmetry::groups::SpaceGroup::resolve): a number, a
/// Hermann-Mauguin symbol, a named setting or bracketed generators. A model with a cell is
/// periodic; a model without one is treated as a finite molecule whose operations act on
/// Cartesian coordinates directly.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSymmetry {
    pub group: String,
    pub cell: Option<UnitCell>,
}

impl ModelSymmetry {
    pub fn new(group: &str, cell: Option<UnitCell>) -> Self {
        Self {
            group: group.to_string(),
            cell,
        }
    }

    pub fn is_periodic(&self) -> bool {
        self.cell.is_some()
    }
}

/// A model (frame) of a structure: a named set of atoms sharing one symmetry description.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub symmetry: Option<ModelSymmetry>,
    pub(crate) atoms: Vec<AtomId>,
}

impl Model {
    pub fn new(name: &str, symmetry: Option<ModelSymmetry>) -> Self {
        Self {
            name: name.to_string(),
            symmetry,
            atoms: Vec::new(),
        }
    }

    /// Atom IDs of this model, in insertion order.
    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }
}
