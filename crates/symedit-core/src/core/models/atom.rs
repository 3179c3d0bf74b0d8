use super::ids::ModelId;
use nalgebra::Point3;

/// Site number carried by atoms whose symmetry-equivalence class has not been assigned yet.
pub const UNASSIGNED_SITE: u32 = 0;

/// Represents an atom of an editable structure.
///
/// The editing engine only ever changes `position` and `site`; the element and the owning
/// model are fixed for the lifetime of the atom.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The element symbol (e.g., "C", "Si", "O").
    pub element: String,
    /// The ID of the model (frame) this atom belongs to.
    pub model_id: ModelId,
    /// The absolute (Cartesian) coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
    /// The symmetry-equivalence class of the atom within its model.
    ///
    /// Atoms sharing a site number are images of one another under the model's symmetry
    /// operations. `0` means the class has not been assigned yet.
    pub site: u32,
}

impl Atom {
    /// Creates a new `Atom` with an unassigned site.
    ///
    /// # Arguments
    ///
    /// * `element` - The element symbol.
    /// * `model_id` - The ID of the model this atom belongs to.
    /// * `position` - The absolute coordinates of the atom.
    pub fn new(element: &str, model_id: ModelId, position: Point3<f64>) -> Self {
        Self {
            element: element.to_string(),
            model_id,
            position,
            site: UNASSIGNED_SITE,
        }
    }

    /// Returns `true` if the atom has been assigned to a symmetry-equivalence class.
    pub fn has_site(&self) -> bool {
        self.site != UNASSIGNED_SITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_has_expected_default_fields() {
        let model_id = ModelId::default();
        let atom = Atom::new("Si", model_id, Point3::new(1.0, 2.0, 3.0));

        assert_eq!(atom.element, "Si");
        assert_eq!(atom.model_id, model_id);
        assert_eq!(atom.position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.site, UNASSIGNED_SITE);
        assert!(!atom.has_site());
    }

    #[test]
    fn atom_equality_and_clone_works() {
        let mut atom1 = Atom::new("O", ModelId::default(), Point3::origin());
        atom1.site = 3;
        let atom2 = atom1.clone();
        assert_eq!(atom1, atom2);
        assert!(atom2.has_site());
    }
}
