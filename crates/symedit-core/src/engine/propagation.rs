use super::cache::{ModelCache, SymmetryCache};
use super::config::EngineConfig;
use super::context::ModelStore;
use super::error::EngineError;
use super::state::{MoveOutcome, Rejection};
use super::transaction::{self, PositionSnapshot};
use crate::core::models::ids::{AtomId, ModelId};
use crate::core::symmetry::operation;
use crate::core::utils::geometry;
use nalgebra::{Point3, Vector3};
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum MoveTargets {
    Displacement(Vector3<f64>),
    Positions(HashMap<AtomId, Point3<f64>>),
}

impl MoveTargets {
    fn target_for(&self, atom: AtomId, current: &Point3<f64>) -> Option<Point3<f64>> {
        match self {
            MoveTargets::Displacement(delta) => Some(current + delta),
            MoveTargets::Positions(targets) => targets.get(&atom).copied(),
        }
    }
}

struct Placement {
    requested_atom: AtomId,
    basis: AtomId,
    basis_fractional: Point3<f64>,
}

pub struct AtomPropagationEngine<'a> {
    cache: &'a mut SymmetryCache,
    config: &'a EngineConfig,
}

impl<'a> AtomPropagationEngine<'a> {
    pub fn new(cache: &'a mut SymmetryCache, config: &'a EngineConfig) -> Self {
        Self { cache, config }
    }

    #[instrument(skip_all, name = "move_atom", fields(atom = ?atom))]
    pub fn move_atom<S: ModelStore + ?Sized>(
        &mut self,
        store: &mut S,
        atom: AtomId,
        requested: Point3<f64>,
    ) -> Result<(MoveOutcome, Option<PositionSnapshot>), EngineError> {
        let model = store
            .atom(atom)
            .ok_or(EngineError::AtomNotFound(atom))?
            .model_id;
        self.cache.ensure(store, model, self.config)?;
        let model_cache = self.model_cache(model)?;

        let placement = match constrain_request(
            &*store,
            model_cache,
            atom,
            &requested,
            self.config.allow_projection,
            self.config,
        )? {
            Ok(Some(placement)) => placement,
            Ok(None) => return Ok((MoveOutcome::Moved(0), None)),
            Err(rejection) => {
                debug!(?rejection, "Rejected single-atom move.");
                return Ok((MoveOutcome::Rejected(rejection), None));
            }
        };

        let orbit = model_cache.basis.equivalents(placement.basis).to_vec();
        let (outcome, snapshot) = transaction::transaction(store, &orbit, |store| {
            let written = write_orbit(store, model_cache, &placement)?;
            Ok(MoveOutcome::Moved(written))
        })?;
        debug!(moved = outcome.moved_count(), "Committed single-atom move.");
        Ok((outcome, Some(snapshot)))
    }

    #[instrument(skip_all, name = "move_selection", fields(selected = selection.len(), rigid = rigid))]
    pub fn move_selection<S: ModelStore + ?Sized>(
        &mut self,
        store: &mut S,
        selection: &[AtomId],
        targets: &MoveTargets,
        allow_projection: bool,
        rigid: bool,
    ) -> Result<(MoveOutcome, Option<PositionSnapshot>), EngineError> {
        let mut requests: Vec<(AtomId, ModelId, Point3<f64>)> = Vec::new();
        let mut seen_atoms = HashSet::new();
        for &atom_id in selection {
            if !seen_atoms.insert(atom_id) {
                continue;
            }
            let atom = store.atom(atom_id).ok_or(EngineError::AtomNotFound(atom_id))?;
            if let Some(target) = targets.target_for(atom_id, &atom.position) {
                requests.push((atom_id, atom.model_id, target));
            }
        }
        if requests.is_empty() {
            return Ok((MoveOutcome::Moved(0), None));
        }

        let models: HashSet<ModelId> = requests.iter().map(|(_, model, _)| *model).collect();
        for model in &models {
            self.cache.ensure(store, *model, self.config)?;
        }
        let cache: &SymmetryCache = &*self.cache;
        let config = self.config;

        let mut representatives: Vec<(AtomId, ModelId, Point3<f64>)> = Vec::new();
        let mut seen_bases = HashSet::new();
        let mut affected: Vec<AtomId> = Vec::new();
        for (atom_id, model, target) in &requests {
            let model_cache = model_cache_of(cache, *model)?;
            let basis = model_cache
                .basis
                .basis_of(*atom_id)
                .ok_or_else(|| missing_link(*atom_id))?;
            if seen_bases.insert((*model, basis)) {
                representatives.push((*atom_id, *model, *target));
                affected.extend_from_slice(model_cache.basis.equivalents(basis));
            }
        }

        // None marks a target the atom's own constraint refuses.
        let mut expected_positions: Vec<(AtomId, Option<Point3<f64>>)> = Vec::new();
        for (atom_id, model, target) in &requests {
            let expected = if rigid {
                Some(*target)
            } else {
                reachable_position(
                    &*store,
                    model_cache_of(cache, *model)?,
                    *atom_id,
                    target,
                    allow_projection,
                    config,
                )?
            };
            expected_positions.push((*atom_id, expected));
        }

        let (outcome, snapshot) = transaction::transaction(store, &affected, |store| {
            let mut accepted: Vec<(AtomId, Point3<f64>)> = Vec::new();
            let mut written = 0;
            for (atom_id, model, target) in &representatives {
                let model_cache = model_cache_of(cache, *model)?;
                let placement = match constrain_request(
                    &*store,
                    model_cache,
                    *atom_id,
                    target,
                    allow_projection,
                    config,
                )? {
                    Ok(Some(placement)) => placement,
                    Ok(None) => continue,
                    Err(rejection) => return Ok(MoveOutcome::Rejected(rejection)),
                };
                written += write_orbit(store, model_cache, &placement)?;

                let link = model_cache
                    .basis
                    .link(placement.requested_atom)
                    .ok_or_else(|| missing_link(placement.requested_atom))?;
                let accepted_position = model_cache.provider.to_cartesian(
                    &operation::apply_affine(&link.to_atom, &placement.basis_fractional),
                );
                accepted.push((*atom_id, accepted_position));
            }

            let verified = accepted
                .into_iter()
                .map(|(id, position)| (id, Some(position)))
                .chain(expected_positions.iter().copied());
            for (atom_id, expected) in verified {
                let actual = store
                    .atom(atom_id)
                    .ok_or(EngineError::AtomNotFound(atom_id))?
                    .position;
                let reached = expected.is_some_and(|expected| {
                    (actual - expected).norm_squared() <= config.round_trip_tolerance
                });
                if !reached {
                    warn!(atom = ?atom_id, "Batch target not reached; rolling back.");
                    return Ok(MoveOutcome::Rejected(Rejection::BatchInconsistency {
                        atom: atom_id,
                    }));
                }
            }
            Ok(MoveOutcome::Moved(written))
        })?;

        debug!(?outcome, "Finished batch move.");
        Ok((outcome, Some(snapshot)))
    }

    pub fn rotate_selection<S: ModelStore + ?Sized>(
        &mut self,
        store: &mut S,
        selection: &[AtomId],
        axis_start: &Point3<f64>,
        axis_end: &Point3<f64>,
        degrees: f64,
    ) -> Result<(MoveOutcome, Option<PositionSnapshot>), EngineError> {
        let axis = geometry::axis_between(axis_start, axis_end).ok_or(EngineError::DegenerateAxis)?;
        let mut targets = HashMap::new();
        for &atom_id in selection {
            let atom = store.atom(atom_id).ok_or(EngineError::AtomNotFound(atom_id))?;
            targets.insert(
                atom_id,
                geometry::rotate_about_line(&atom.position, axis_start, &axis, degrees),
            );
        }
        self.move_selection(store, selection, &MoveTargets::Positions(targets), false, false)
    }

    fn model_cache(&self, model: ModelId) -> Result<&ModelCache, EngineError> {
        model_cache_of(&*self.cache, model)
    }
}

fn model_cache_of(cache: &SymmetryCache, model: ModelId) -> Result<&ModelCache, EngineError> {
    cache
        .get(model)
        .ok_or_else(|| EngineError::Internal(format!("Model {:?} has no symmetry cache", model)))
}

fn missing_link(atom: AtomId) -> EngineError {
    EngineError::Internal(format!("Atom {:?} is missing from the basis index", atom))
}

fn reachable_position<S: ModelStore + ?Sized>(
    store: &S,
    model_cache: &ModelCache,
    atom: AtomId,
    requested: &Point3<f64>,
    allow_projection: bool,
    config: &EngineConfig,
) -> Result<Option<Point3<f64>>, EngineError> {
    let provider = &model_cache.provider;
    let link = model_cache.basis.link(atom).ok_or_else(|| missing_link(atom))?;
    let to_basis = operation::invert_affine(&link.to_atom)
        .ok_or_else(|| EngineError::Internal(format!("Singular basis link for {:?}", atom)))?;
    let old_basis = store
        .atom(link.basis)
        .ok_or(EngineError::AtomNotFound(link.basis))?
        .position;
    let constraint = model_cache
        .basis_constraint(link.basis)
        .ok_or_else(|| EngineError::Internal(format!("No constraint for basis {:?}", link.basis)))?;

    let requested_basis = provider.apply_cartesian(&to_basis, requested);
    Ok(constraint
        .constrain(
            &old_basis,
            &requested_basis,
            allow_projection,
            config.constraint_tolerance,
        )
        .ok()
        .map(|accepted| provider.apply_cartesian(&link.to_atom, &accepted)))
}

// Inner Ok(None) is a no-op and inner Err a rejection; the outer Err is a lookup failure.
fn constrain_request<S: ModelStore + ?Sized>(
    store: &S,
    model_cache: &ModelCache,
    atom: AtomId,
    requested: &Point3<f64>,
    allow_projection: bool,
    config: &EngineConfig,
) -> Result<Result<Option<Placement>, Rejection>, EngineError> {
    let provider = &model_cache.provider;
    let link = model_cache.basis.link(atom).ok_or_else(|| missing_link(atom))?;
    let basis = link.basis;
    let to_basis = operation::invert_affine(&link.to_atom)
        .ok_or_else(|| EngineError::Internal(format!("Singular basis link for {:?}", atom)))?;

    let old_basis = store.atom(basis).ok_or(EngineError::AtomNotFound(basis))?.position;
    let requested_basis = provider.apply_cartesian(&to_basis, requested);

    let constraint = model_cache
        .basis_constraint(basis)
        .ok_or_else(|| EngineError::Internal(format!("No constraint for basis {:?}", basis)))?;
    let accepted = match constraint.constrain(
        &old_basis,
        &requested_basis,
        allow_projection,
        config.constraint_tolerance,
    ) {
        Ok(position) => position,
        Err(violation) => {
            return Ok(Err(Rejection::ConstraintViolation { atom, violation }));
        }
    };
    if accepted == old_basis {
        return Ok(Ok(None));
    }

    let basis_fractional = provider.to_fractional(&accepted);
    let expected = model_cache
        .site_operations(basis)
        .ok_or_else(|| EngineError::Internal(format!("No site symmetry for {:?}", basis)))?;
    let actual = provider.invariant_operation_ids(&basis_fractional, config.invariance_tolerance);
    if &actual != expected {
        debug!(
            atom = ?atom,
            before = expected.len(),
            after = actual.len(),
            "Site symmetry would change."
        );
        return Ok(Err(Rejection::SymmetryMismatch { atom }));
    }

    Ok(Ok(Some(Placement {
        requested_atom: atom,
        basis,
        basis_fractional,
    })))
}

fn write_orbit<S: ModelStore + ?Sized>(
    store: &mut S,
    model_cache: &ModelCache,
    placement: &Placement,
) -> Result<usize, EngineError> {
    let mut written = 0;
    for &member in model_cache.basis.equivalents(placement.basis) {
        let link = model_cache.basis.link(member).ok_or_else(|| missing_link(member))?;
        let position = model_cache
            .provider
            .to_cartesian(&operation::apply_affine(&link.to_atom, &placement.basis_fractional));
        if !store.set_atom_position(member, position) {
            return Err(EngineError::AtomNotFound(member));
        }
        written += 1;
    }
    Ok(written)
}
