use super::context::ModelStore;
use super::provider::SymmetryOperationProvider;
use crate::core::models::ids::{AtomId, ModelId};
use crate::core::utils::geometry;
use nalgebra::Matrix4;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct BasisLink {
    pub basis: AtomId,
    pub operation: usize,
    pub to_atom: Matrix4<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct BasisAtomIndex {
    links: HashMap<AtomId, BasisLink>,
    orbits: HashMap<AtomId, Vec<AtomId>>,
    sites: HashMap<AtomId, u32>,
    basis_atoms: Vec<AtomId>,
}

impl BasisAtomIndex {
    pub fn build<S: ModelStore + ?Sized>(
        store: &S,
        model: ModelId,
        provider: &SymmetryOperationProvider,
        tolerance: f64,
    ) -> Self {
        let mut index = Self::default();

        for &atom_id in store.atoms_of_model(model) {
            let Some(atom) = store.atom(atom_id) else {
                continue;
            };
            let fractional = provider.to_fractional(&atom.position);

            let mapping = if geometry::is_finite_point(&fractional) {
                index.basis_atoms.iter().find_map(|&basis_id| {
                    let basis = store.atom(basis_id)?;
                    if basis.element != atom.element {
                        return None;
                    }
                    let basis_fractional = provider.to_fractional(&basis.position);
                    provider
                        .map_onto(&basis_fractional, &fractional, tolerance)
                        .map(|(operation, to_atom)| BasisLink {
                            basis: basis_id,
                            operation,
                            to_atom,
                        })
                })
            } else {
                None
            };

            match mapping {
                Some(link) => {
                    index.orbits.entry(link.basis).or_default().push(atom_id);
                    index.links.insert(atom_id, link);
                }
                None => {
                    index.basis_atoms.push(atom_id);
                    index
                        .sites
                        .insert(atom_id, index.basis_atoms.len() as u32);
                    index.orbits.insert(atom_id, vec![atom_id]);
                    index.links.insert(
                        atom_id,
                        BasisLink {
                            basis: atom_id,
                            operation: 0,
                            to_atom: Matrix4::identity(),
                        },
                    );
                }
            }
        }

        debug!(
            atoms = index.links.len(),
            sites = index.basis_atoms.len(),
            "Built basis atom index."
        );
        index
    }

    pub fn link(&self, atom: AtomId) -> Option<&BasisLink> {
        self.links.get(&atom)
    }

    pub fn basis_of(&self, atom: AtomId) -> Option<AtomId> {
        self.links.get(&atom).map(|link| link.basis)
    }

    pub fn equivalents(&self, atom: AtomId) -> &[AtomId] {
        self.basis_of(atom)
            .and_then(|basis| self.orbits.get(&basis))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn site_of(&self, atom: AtomId) -> Option<u32> {
        self.basis_of(atom)
            .and_then(|basis| self.sites.get(&basis))
            .copied()
    }

    pub fn basis_atoms(&self) -> &[AtomId] {
        &self.basis_atoms
    }

    pub fn write_sites<S: ModelStore + ?Sized>(&self, store: &mut S) {
        for atom in self.links.keys() {
            if let Some(site) = self.site_of(*atom) {
                store.set_atom_site(*atom, site);
            }
        }
    }
}
