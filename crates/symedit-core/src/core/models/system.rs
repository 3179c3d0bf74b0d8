use super::atom::Atom;
use super::ids::{AtomId, ModelId};
use super::model::{Model, ModelSymmetry};
use nalgebra::Point3;
use slotmap::SlotMap;

/// The atom store: every model and atom of an editable structure.
///
/// Atoms are stored in a slot map so that IDs stay valid across insertions and removals.
/// Each model keeps the ordered list of its atom IDs, which defines the order in which basis
/// atoms are chosen.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    /// Primary storage for atoms.
    atoms: SlotMap<AtomId, Atom>,
    /// Primary storage for models.
    models: SlotMap<ModelId, Model>,
}

impl Structure {
    /// Creates a new, empty structure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves an immutable reference to an atom by its ID.
    ///
    /// # Return
    ///
    /// Returns `Some(&Atom)` if the atom exists, otherwise `None`.
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Retrieves a mutable reference to an atom by its ID.
    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    /// Returns an iterator over all atoms of all models.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atoms.iter()
    }

    pub fn model(&self, id: ModelId) -> Option<&Model> {
        self.models.get(id)
    }

    pub fn model_mut(&mut self, id: ModelId) -> Option<&mut Model> {
        self.models.get_mut(id)
    }

    pub fn models_iter(&self) -> impl Iterator<Item = (ModelId, &Model)> {
        self.models.iter()
    }

    /// Finds a model ID by its name.
    pub fn find_model_by_name(&self, name: &str) -> Option<ModelId> {
        self.models
            .iter()
            .find(|(_, model)| model.name == name)
            .map(|(id, _)| id)
    }

    /// Adds a new, empty model to the structure.
    pub fn add_model(&mut self, name: &str, symmetry: Option<ModelSymmetry>) -> ModelId {
        self.models.insert(Model::new(name, symmetry))
    }

    /// Adds an atom to a model.
    ///
    /// The atom's `model_id` is overwritten with `model_id` so that the two never disagree.
    ///
    /// # Return
    ///
    /// Returns `Some(AtomId)` if the model exists, otherwise `None`.
    pub fn add_atom(&mut self, model_id: ModelId, mut atom: Atom) -> Option<AtomId> {
        if !self.models.contains_key(model_id) {
            return None;
        }
        atom.model_id = model_id;
        let atom_id = self.atoms.insert(atom);
        self.models[model_id].atoms.push(atom_id);
        Some(atom_id)
    }

    /// Removes an atom from the structure and from its model's atom list.
    ///
    /// # Return
    ///
    /// Returns the removed `Atom` if it existed, otherwise `None`.
    pub fn remove_atom(&mut self, atom_id: AtomId) -> Option<Atom> {
        let atom = self.atoms.remove(atom_id)?;
        if let Some(model) = self.models.get_mut(atom.model_id) {
            model.atoms.retain(|&id| id != atom_id);
        }
        Some(atom)
    }

    /// Removes a model together with all of its atoms.
    pub fn remove_model(&mut self, model_id: ModelId) -> Option<Model> {
        let model = self.models.remove(model_id)?;
        for atom_id in &model.atoms {
            self.atoms.remove(*atom_id);
        }
        Some(model)
    }

    /// Atom IDs of a model, in insertion order. Empty if the model does not exist.
    pub fn atom_ids_of_model(&self, model_id: ModelId) -> &[AtomId] {
        self.models
            .get(model_id)
            .map(|model| model.atoms.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_atom_position(&mut self, atom_id: AtomId, position: Point3<f64>) -> bool {
        match self.atoms.get_mut(atom_id) {
            Some(atom) => {
                atom.position = position;
                true
            }
            None => false,
        }
    }

    /// Replaces the symmetry description of a model.
    ///
    /// # Return
    ///
    /// Returns `false` if the model does not exist.
    pub fn set_model_symmetry(&mut self, model_id: ModelId, symmetry: Option<ModelSymmetry>) -> bool {
        match self.models.get_mut(model_id) {
            Some(model) => {
                model.symmetry = symmetry;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::UNASSIGNED_SITE;

    fn create_two_model_structure() -> (Structure, ModelId, ModelId, Vec<AtomId>) {
        let mut structure = Structure::new();
        let crystal = structure.add_model("crystal", Some(ModelSymmetry::new("P 1", None)));
        let molecule = structure.add_model("molecule", None);

        let ids = vec![
            structure
                .add_atom(crystal, Atom::new("C", crystal, Point3::new(0.0, 0.0, 0.0)))
                .unwrap(),
            structure
                .add_atom(crystal, Atom::new("O", crystal, Point3::new(1.2, 0.0, 0.0)))
                .unwrap(),
            structure
                .add_atom(molecule, Atom::new("N", molecule, Point3::new(0.0, 1.0, 0.0)))
                .unwrap(),
        ];
        (structure, crystal, molecule, ids)
    }

    #[test]
    fn structure_creation_and_access() {
        let (structure, crystal, molecule, ids) = create_two_model_structure();

        assert_eq!(structure.atoms_iter().count(), 3);
        assert_eq!(structure.models_iter().count(), 2);
        assert_eq!(structure.atom_ids_of_model(crystal), &ids[..2]);
        assert_eq!(structure.atom_ids_of_model(molecule), &ids[2..]);
        assert_eq!(structure.atom(ids[1]).unwrap().element, "O");
        assert_eq!(structure.atom(ids[2]).unwrap().model_id, molecule);
        assert_eq!(structure.atom(ids[0]).unwrap().site, UNASSIGNED_SITE);
        assert_eq!(structure.find_model_by_name("molecule"), Some(molecule));
        assert_eq!(structure.find_model_by_name("missing"), None);
    }

    #[test]
    fn add_atom_overrides_model_id_and_rejects_unknown_models() {
        let (mut structure, crystal, molecule, _) = create_two_model_structure();

        let id = structure
            .add_atom(crystal, Atom::new("H", molecule, Point3::origin()))
            .unwrap();
        assert_eq!(structure.atom(id).unwrap().model_id, crystal);

        structure.remove_model(molecule);
        assert!(
            structure
                .add_atom(molecule, Atom::new("H", molecule, Point3::origin()))
                .is_none()
        );
    }

    #[test]
    fn atom_removal_updates_model() {
        let (mut structure, crystal, _, ids) = create_two_model_structure();

        let removed = structure.remove_atom(ids[0]).unwrap();
        assert_eq!(removed.element, "C");
        assert!(structure.atom(ids[0]).is_none());
        assert_eq!(structure.atom_ids_of_model(crystal), &[ids[1]]);
        assert!(structure.remove_atom(ids[0]).is_none());
    }

    #[test]
    fn model_removal_drops_its_atoms() {
        let (mut structure, crystal, _, ids) = create_two_model_structure();

        let model = structure.remove_model(crystal).unwrap();
        assert_eq!(model.name, "crystal");
        assert!(structure.atom(ids[0]).is_none());
        assert!(structure.atom(ids[1]).is_none());
        assert!(structure.atom(ids[2]).is_some());
        assert!(structure.atom_ids_of_model(crystal).is_empty());
    }

    #[test]
    fn set_position_and_symmetry_report_missing_targets() {
        let (mut structure, crystal, _, ids) = create_two_model_structure();

        assert!(structure.set_atom_position(ids[0], Point3::new(1.0, 1.0, 1.0)));
        assert_eq!(
            structure.atom(ids[0]).unwrap().position,
            Point3::new(1.0, 1.0, 1.0)
        );

        assert!(structure.set_model_symmetry(crystal, None));
        assert!(structure.model(crystal).unwrap().symmetry.is_none());

        structure.remove_atom(ids[0]);
        assert!(!structure.set_atom_position(ids[0], Point3::origin()));
    }
}
