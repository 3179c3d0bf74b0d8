use crate::core::models::atom::Atom;
use crate::core::models::cell::UnitCell;
use crate::core::models::ids::{AtomId, ModelId};
use crate::core::models::model::ModelSymmetry;
use crate::core::symmetry::groups::SpaceGroup;
use crate::core::symmetry::subgroups::{SubgroupIndex, SubgroupTable};
use crate::core::utils::geometry;
use crate::engine::cache::SymmetryCache;
use crate::engine::config::EngineConfig;
use crate::engine::constraint::Constraint;
use crate::engine::context::{EditableModelStore, ModelStore};
use crate::engine::error::EngineError;
use crate::engine::pathway::{PathwayError, ResolvedPathway, TransformPathwayComposer};
use crate::engine::propagation::{AtomPropagationEngine, MoveTargets};
use crate::engine::provider::SymmetryOperationProvider;
use crate::engine::state::MoveOutcome;
use crate::engine::transaction::PositionSnapshot;
use nalgebra::Point3;
use std::collections::BTreeSet;
use tracing::{debug, info, instrument};

/// Stateful facade over the editing engine.
///
/// The editor owns the per-model symmetry caches and the snapshot of the last committed move.
/// Caches are built lazily on the first edit of a model and survive rejected moves; call
/// [`SymmetryEditor::on_model_changed`] whenever a model's atoms or symmetry change outside the
/// editor.
pub struct SymmetryEditor {
    config: EngineConfig,
    cache: SymmetryCache,
    subgroups: Box<dyn SubgroupIndex>,
    saved: Option<PositionSnapshot>,
}

impl SymmetryEditor {
    /// Creates an editor backed by the built-in subgroup table.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_subgroup_index(config, Box::new(SubgroupTable::builtin()))
    }

    pub fn with_subgroup_index(config: EngineConfig, subgroups: Box<dyn SubgroupIndex>) -> Self {
        Self {
            config,
            cache: SymmetryCache::new(),
            subgroups,
            saved: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Drops everything cached for `model`.
    pub fn on_model_changed(&mut self, model: ModelId) {
        self.cache.invalidate(model);
    }

    /// The constraint governing `atom` at its current position.
    pub fn resolve_constraint<S: ModelStore + ?Sized>(
        &mut self,
        store: &mut S,
        atom: AtomId,
    ) -> Result<Constraint, EngineError> {
        let model = model_of(&*store, atom)?;
        let model_cache = self.cache.ensure(store, model, &self.config)?;
        model_cache.constraint_for(atom).ok_or_else(|| {
            EngineError::Internal(format!("No constraint cached for atom {:?}", atom))
        })
    }

    /// Every atom sharing a basis atom with any atom of `selection`, the selection included.
    pub fn equivalent_atoms<S: ModelStore + ?Sized>(
        &mut self,
        store: &mut S,
        selection: &[AtomId],
    ) -> Result<BTreeSet<AtomId>, EngineError> {
        let mut equivalents = BTreeSet::new();
        for &atom in selection {
            let model = model_of(&*store, atom)?;
            let model_cache = self.cache.ensure(store, model, &self.config)?;
            equivalents.extend(model_cache.basis.equivalents(atom).iter().copied());
        }
        Ok(equivalents)
    }

    /// Drags one atom; every equivalent atom follows.
    pub fn move_atom<S: ModelStore + ?Sized>(
        &mut self,
        store: &mut S,
        atom: AtomId,
        position: Point3<f64>,
    ) -> Result<MoveOutcome, EngineError> {
        let (outcome, snapshot) =
            AtomPropagationEngine::new(&mut self.cache, &self.config).move_atom(store, atom, position)?;
        Ok(self.remember(outcome, snapshot))
    }

    /// Moves a selection as one all-or-nothing batch.
    pub fn move_selection<S: ModelStore + ?Sized>(
        &mut self,
        store: &mut S,
        selection: &[AtomId],
        targets: &MoveTargets,
        allow_projection: bool,
        rigid: bool,
    ) -> Result<MoveOutcome, EngineError> {
        let (outcome, snapshot) = AtomPropagationEngine::new(&mut self.cache, &self.config)
            .move_selection(store, selection, targets, allow_projection, rigid)?;
        Ok(self.remember(outcome, snapshot))
    }

    /// Rotates a selection by `degrees` about the axis from `axis_start` to `axis_end`.
    pub fn rotate_selection<S: ModelStore + ?Sized>(
        &mut self,
        store: &mut S,
        selection: &[AtomId],
        axis_start: &Point3<f64>,
        axis_end: &Point3<f64>,
        degrees: f64,
    ) -> Result<MoveOutcome, EngineError> {
        let (outcome, snapshot) = AtomPropagationEngine::new(&mut self.cache, &self.config)
            .rotate_selection(store, selection, axis_start, axis_end, degrees)?;
        Ok(self.remember(outcome, snapshot))
    }

    /// Puts back the positions from before the last committed move.
    ///
    /// # Return
    ///
    /// Returns the number of atoms restored, `0` when nothing was saved.
    pub fn restore_saved_positions<S: ModelStore + ?Sized>(&mut self, store: &mut S) -> usize {
        match self.saved.take() {
            Some(snapshot) => {
                let restored = snapshot.restore(store);
                info!(restored, "Restored saved positions.");
                restored
            }
            None => 0,
        }
    }

    /// Composes a pathway chain into one coordinate transform.
    ///
    /// `cell`, when given, is re-expressed in the final basis.
    pub fn resolve_pathway<T: AsRef<str>>(
        &self,
        chain: &[T],
        cell: Option<&UnitCell>,
    ) -> Result<ResolvedPathway, PathwayError> {
        TransformPathwayComposer::new(self.subgroups.as_ref(), self.config.pathway_tolerance)
            .resolve(chain, cell)
    }

    /// Replaces the symmetry of `model` with the group described by `group`.
    ///
    /// The group token is validated before the store is touched.
    #[instrument(skip_all, name = "assign_symmetry", fields(model = ?model, group = group))]
    pub fn assign_symmetry<S: EditableModelStore + ?Sized>(
        &mut self,
        store: &mut S,
        model: ModelId,
        group: &str,
        cell: Option<UnitCell>,
    ) -> Result<SpaceGroup, EngineError> {
        if !store.contains_model(model) {
            return Err(EngineError::ModelNotFound(model));
        }
        let resolved = SymmetryOperationProvider::from_descriptor(group, cell.clone())
            .map_err(|source| EngineError::Symmetry { model, source })?
            .group()
            .clone();

        store.set_model_symmetry(model, Some(ModelSymmetry::new(group, cell)));
        self.on_model_changed(model);
        info!(
            identifier = resolved.identifier(),
            order = resolved.order(),
            "Assigned model symmetry."
        );
        Ok(resolved)
    }

    /// Adds an atom at `position` together with all of its distinct symmetry images.
    ///
    /// # Return
    ///
    /// Returns the new atom IDs, the atom at `position` first.
    #[instrument(skip_all, name = "add_atom_with_equivalents", fields(model = ?model, element = element))]
    pub fn add_atom_with_equivalents<S: EditableModelStore + ?Sized>(
        &mut self,
        store: &mut S,
        model: ModelId,
        element: &str,
        position: Point3<f64>,
    ) -> Result<Vec<AtomId>, EngineError> {
        let provider = SymmetryOperationProvider::for_model(&*store, model)?;
        let fractional = provider.to_fractional(&position);

        let positions: Vec<Point3<f64>> = if geometry::is_finite_point(&fractional) {
            provider
                .orbit(&fractional, self.config.invariance_tolerance)
                .iter()
                .enumerate()
                .map(|(i, image)| {
                    if i == 0 {
                        position
                    } else {
                        provider.to_cartesian(image)
                    }
                })
                .collect()
        } else {
            vec![position]
        };

        let mut added = Vec::with_capacity(positions.len());
        for image in positions {
            let id = store
                .add_atom(model, Atom::new(element, model, image))
                .ok_or(EngineError::ModelNotFound(model))?;
            added.push(id);
        }
        self.on_model_changed(model);

        info!(added = added.len(), "Added atom with symmetry equivalents.");
        Ok(added)
    }

    /// Removes `atom` and every atom equivalent to it.
    ///
    /// # Return
    ///
    /// Returns the number of atoms removed.
    #[instrument(skip_all, name = "delete_atom_with_equivalents", fields(atom = ?atom))]
    pub fn delete_atom_with_equivalents<S: EditableModelStore + ?Sized>(
        &mut self,
        store: &mut S,
        atom: AtomId,
    ) -> Result<usize, EngineError> {
        let model = model_of(&*store, atom)?;
        let orbit = self
            .cache
            .ensure(store, model, &self.config)?
            .basis
            .equivalents(atom)
            .to_vec();

        let removed = orbit
            .iter()
            .filter(|id| store.remove_atom(**id).is_some())
            .count();
        self.on_model_changed(model);

        info!(removed, "Deleted atom with symmetry equivalents.");
        Ok(removed)
    }

    fn remember(&mut self, outcome: MoveOutcome, snapshot: Option<PositionSnapshot>) -> MoveOutcome {
        if outcome.moved_count() > 0 {
            if let Some(snapshot) = snapshot {
                debug!(atoms = snapshot.len(), "Saved pre-move positions.");
                self.saved = Some(snapshot);
            }
        }
        outcome
    }
}

fn model_of<S: ModelStore + ?Sized>(store: &S, atom: AtomId) -> Result<ModelId, EngineError> {
    store
        .atom(atom)
        .map(|a| a.model_id)
        .ok_or(EngineError::AtomNotFound(atom))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::system::Structure;
    use crate::core::symmetry::groups::GroupError;
    use crate::engine::state::Rejection;
    use nalgebra::Vector3;

    fn cubic_cell() -> UnitCell {
        UnitCell::new([10.0, 10.0, 10.0], [90.0, 90.0, 90.0]).unwrap()
    }

    fn crystal(group: &str) -> (Structure, ModelId) {
        let mut structure = Structure::new();
        let model = structure.add_model("crystal", Some(ModelSymmetry::new(group, Some(cubic_cell()))));
        (structure, model)
    }

    fn assert_point_eq(actual: &Point3<f64>, expected: &Point3<f64>) {
        assert!(
            (actual - expected).norm() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn p21_drag_moves_the_generated_copy() {
        let (mut structure, model) = crystal("P 21");
        let mut editor = SymmetryEditor::new(EngineConfig::default());
        let ids = editor
            .add_atom_with_equivalents(&mut structure, model, "C", Point3::new(3.0, 5.0, 1.0))
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_point_eq(&structure.atom(ids[1]).unwrap().position, &Point3::new(7.0, 0.0, 9.0));

        assert_eq!(
            editor.resolve_constraint(&mut structure, ids[0]).unwrap(),
            Constraint::Free
        );
        let outcome = editor
            .move_atom(&mut structure, ids[0], Point3::new(3.5, 5.0, 1.0))
            .unwrap();

        assert_eq!(outcome, MoveOutcome::Moved(2));
        assert_point_eq(&structure.atom(ids[1]).unwrap().position, &Point3::new(6.5, 0.0, 9.0));
    }

    #[test]
    fn restore_saved_positions_undoes_last_move() {
        let (mut structure, model) = crystal("P 21");
        let mut editor = SymmetryEditor::new(EngineConfig::default());
        let ids = editor
            .add_atom_with_equivalents(&mut structure, model, "C", Point3::new(3.0, 5.0, 1.0))
            .unwrap();

        editor
            .move_selection(
                &mut structure,
                &ids[..1],
                &MoveTargets::Displacement(Vector3::new(0.5, 0.0, 0.0)),
                true,
                false,
            )
            .unwrap();
        assert_eq!(editor.restore_saved_positions(&mut structure), 2);
        assert_point_eq(&structure.atom(ids[0]).unwrap().position, &Point3::new(3.0, 5.0, 1.0));
        assert_point_eq(&structure.atom(ids[1]).unwrap().position, &Point3::new(7.0, 0.0, 9.0));
        assert_eq!(editor.restore_saved_positions(&mut structure), 0);
    }

    #[test]
    fn rejected_move_keeps_previous_snapshot_and_positions() {
        let (mut structure, model) = crystal("P 2");
        let mut editor = SymmetryEditor::new(EngineConfig::default());
        let ids = editor
            .add_atom_with_equivalents(&mut structure, model, "O", Point3::new(1.0, 2.0, 3.0))
            .unwrap();
        let general = ids[0];

        editor
            .move_atom(&mut structure, general, Point3::new(1.5, 2.0, 3.0))
            .unwrap();
        let outcome = editor
            .move_atom(&mut structure, general, Point3::new(0.0, 2.0, 0.0))
            .unwrap();

        assert!(matches!(
            outcome,
            MoveOutcome::Rejected(Rejection::SymmetryMismatch { .. })
        ));
        assert_point_eq(&structure.atom(general).unwrap().position, &Point3::new(1.5, 2.0, 3.0));
        assert_eq!(editor.restore_saved_positions(&mut structure), 2);
        assert_point_eq(&structure.atom(general).unwrap().position, &Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn special_position_adds_a_single_atom_with_line_constraint() {
        let (mut structure, model) = crystal("P 2");
        let mut editor = SymmetryEditor::new(EngineConfig::default());
        let ids = editor
            .add_atom_with_equivalents(&mut structure, model, "S", Point3::new(0.0, 3.0, 0.0))
            .unwrap();

        assert_eq!(ids.len(), 1);
        let constraint = editor.resolve_constraint(&mut structure, ids[0]).unwrap();
        assert_eq!(constraint.degrees_of_freedom(), 1);
    }

    #[test]
    fn equivalent_atoms_and_delete_cover_the_orbit() {
        let (mut structure, model) = crystal("P 2/m");
        let mut editor = SymmetryEditor::new(EngineConfig::default());
        let general = editor
            .add_atom_with_equivalents(&mut structure, model, "C", Point3::new(1.0, 2.0, 3.0))
            .unwrap();
        let other = editor
            .add_atom_with_equivalents(&mut structure, model, "N", Point3::new(4.0, 1.0, 2.0))
            .unwrap();
        assert_eq!(general.len(), 4);

        let equivalents = editor
            .equivalent_atoms(&mut structure, &general[2..3])
            .unwrap();
        assert_eq!(equivalents, general.iter().copied().collect());

        let removed = editor
            .delete_atom_with_equivalents(&mut structure, general[1])
            .unwrap();
        assert_eq!(removed, 4);
        assert_eq!(structure.atom_ids_of_model(model), other.as_slice());
    }

    #[test]
    fn assign_symmetry_rebuilds_sites() {
        let mut structure = Structure::new();
        let model = structure.add_model("crystal", None);
        let ids: Vec<AtomId> = [Point3::new(3.0, 5.0, 1.0), Point3::new(7.0, 0.0, 9.0)]
            .into_iter()
            .map(|p| structure.add_atom(model, Atom::new("C", model, p)).unwrap())
            .collect();
        let mut editor = SymmetryEditor::new(EngineConfig::default());

        let equivalents = editor.equivalent_atoms(&mut structure, &ids[..1]).unwrap();
        assert_eq!(equivalents.len(), 1);

        let group = editor
            .assign_symmetry(&mut structure, model, "P 21", Some(cubic_cell()))
            .unwrap();
        assert_eq!(group.order(), 2);

        let equivalents = editor.equivalent_atoms(&mut structure, &ids[..1]).unwrap();
        assert_eq!(equivalents.len(), 2);
        assert_eq!(structure.atom(ids[1]).unwrap().site, 1);
    }

    #[test]
    fn assign_symmetry_rejects_unknown_groups_without_mutation() {
        let (mut structure, model) = crystal("P 21");
        let mut editor = SymmetryEditor::new(EngineConfig::default());

        let result = editor.assign_symmetry(&mut structure, model, "Q 7", None);
        assert!(matches!(result, Err(EngineError::Symmetry { .. })));
        assert_eq!(structure.model_symmetry(model).unwrap().group, "P 21");
    }

    #[test]
    fn resolve_pathway_uses_configured_index() {
        let editor = SymmetryEditor::new(EngineConfig::default());
        let resolved = editor.resolve_pathway(&["225", "sub", "139"], None).unwrap();
        assert_eq!(resolved.nodes.len(), 2);

        struct NoRelations;
        impl SubgroupIndex for NoRelations {
            fn relation(&self, _: u16, _: u16, _: usize) -> Option<String> {
                None
            }
        }
        let editor =
            SymmetryEditor::with_subgroup_index(EngineConfig::default(), Box::new(NoRelations));
        assert!(matches!(
            editor.resolve_pathway(&["225", "139"], None),
            Err(PathwayError::NoRelation { .. })
        ));
    }

    #[test]
    fn free_form_model_uses_point_group_without_cell() {
        let mut structure = Structure::new();
        let model = structure.add_model("molecule", Some(ModelSymmetry::new("2", None)));
        let mut editor = SymmetryEditor::new(EngineConfig::default());
        let ids = editor
            .add_atom_with_equivalents(&mut structure, model, "H", Point3::new(1.0, 0.5, 2.0))
            .unwrap();

        assert_eq!(ids.len(), 2);
        assert_point_eq(&structure.atom(ids[1]).unwrap().position, &Point3::new(-1.0, -0.5, 2.0));
    }

    #[test]
    fn threefold_copies_of_a_molecule_keep_their_distance_from_the_axis() {
        let mut structure = Structure::new();
        let model = structure.add_model("molecule", Some(ModelSymmetry::new("C3", None)));
        let mut editor = SymmetryEditor::new(EngineConfig::default());
        let ids = editor
            .add_atom_with_equivalents(&mut structure, model, "H", Point3::new(1.0, 0.0, 0.0))
            .unwrap();

        assert_eq!(ids.len(), 3);
        for id in &ids {
            let position = structure.atom(*id).unwrap().position;
            assert!((position.coords.norm() - 1.0).abs() < 1e-9);
        }
        let moved = editor
            .move_atom(&mut structure, ids[0], Point3::new(2.0, 0.0, 0.5))
            .unwrap();
        assert_eq!(moved, MoveOutcome::Moved(3));
        for id in &ids {
            let position = structure.atom(*id).unwrap().position;
            assert!((position.xy().coords.norm() - 2.0).abs() < 1e-9);
            assert!((position.z - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn assign_symmetry_rejects_screw_axes_on_finite_models() {
        let mut structure = Structure::new();
        let model = structure.add_model("molecule", None);
        let mut editor = SymmetryEditor::new(EngineConfig::default());

        let result = editor.assign_symmetry(&mut structure, model, "P 21", None);
        assert!(matches!(
            result,
            Err(EngineError::Symmetry {
                source: GroupError::NotPointGroup(_),
                ..
            })
        ));
        assert!(structure.model_symmetry(model).is_none());
    }
}
