use crate::core::models::atom::Atom;
use crate::core::models::ids::{AtomId, ModelId};
use crate::core::models::model::ModelSymmetry;
use crate::core::models::system::Structure;
use nalgebra::Point3;

pub trait ModelStore {
    fn atom(&self, id: AtomId) -> Option<&Atom>;
    fn set_atom_position(&mut self, id: AtomId, position: Point3<f64>) -> bool;
    fn set_atom_site(&mut self, id: AtomId, site: u32) -> bool;
    fn atoms_of_model(&self, model: ModelId) -> &[AtomId];
    fn model_symmetry(&self, model: ModelId) -> Option<&ModelSymmetry>;
    fn contains_model(&self, model: ModelId) -> bool;
}

pub trait EditableModelStore: ModelStore {
    fn add_atom(&mut self, model: ModelId, atom: Atom) -> Option<AtomId>;
    fn remove_atom(&mut self, id: AtomId) -> Option<Atom>;
    fn set_model_symmetry(&mut self, model: ModelId, symmetry: Option<ModelSymmetry>) -> bool;
}

impl ModelStore for Structure {
    fn atom(&self, id: AtomId) -> Option<&Atom> {
        Structure::atom(self, id)
    }

    fn set_atom_position(&mut self, id: AtomId, position: Point3<f64>) -> bool {
        Structure::set_atom_position(self, id, position)
    }

    fn set_atom_site(&mut self, id: AtomId, site: u32) -> bool {
        match self.atom_mut(id) {
            Some(atom) => {
                atom.site = site;
                true
            }
            None => false,
        }
    }

    fn atoms_of_model(&self, model: ModelId) -> &[AtomId] {
        self.atom_ids_of_model(model)
    }

    fn model_symmetry(&self, model: ModelId) -> Option<&ModelSymmetry> {
        self.model(model).and_then(|m| m.symmetry.as_ref())
    }

    fn contains_model(&self, model: ModelId) -> bool {
        self.model(model).is_some()
    }
}

impl EditableModelStore for Structure {
    fn add_atom(&mut self, model: ModelId, atom: Atom) -> Option<AtomId> {
        Structure::add_atom(self, model, atom)
    }

    fn remove_atom(&mut self, id: AtomId) -> Option<Atom> {
        Structure::remove_atom(self, id)
    }

    fn set_model_symmetry(&mut self, model: ModelId, symmetry: Option<ModelSymmetry>) -> bool {
        Structure::set_model_symmetry(self, model, symmetry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_implements_store_traits() {
        let mut structure = Structure::new();
        let model = structure.add_model("m", Some(ModelSymmetry::new("2", None)));
        let id = EditableModelStore::add_atom(
            &mut structure,
            model,
            Atom::new("C", model, Point3::new(1.0, 2.0, 3.0)),
        )
        .unwrap();

        let store: &mut dyn EditableModelStore = &mut structure;
        assert!(store.contains_model(model));
        assert_eq!(store.atoms_of_model(model), &[id]);
        assert_eq!(store.model_symmetry(model).unwrap().group, "2");
        assert!(store.set_atom_site(id, 3));
        assert!(store.set_atom_position(id, Point3::origin()));
        assert_eq!(store.atom(id).unwrap().site, 3);
        assert_eq!(store.atom(id).unwrap().position, Point3::origin());

        assert!(store.set_model_symmetry(model, None));
        assert!(store.model_symmetry(model).is_none());
        assert!(store.remove_atom(id).is_some());
        assert!(!store.set_atom_site(id, 1));
    }
}
