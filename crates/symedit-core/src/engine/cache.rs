use super::basis::BasisAtomIndex;
use super::config::EngineConfig;
use super::constraint::Constraint;
use super::context::ModelStore;
use super::error::EngineError;
use super::provider::SymmetryOperationProvider;
use crate::core::models::ids::{AtomId, ModelId};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct ModelCache {
    pub provider: SymmetryOperationProvider,
    pub basis: BasisAtomIndex,
    constraints: HashMap<AtomId, Constraint>,
    site_operations: HashMap<AtomId, BTreeSet<usize>>,
}

impl ModelCache {
    fn build<S: ModelStore + ?Sized>(
        store: &mut S,
        model: ModelId,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        let provider = SymmetryOperationProvider::for_model(&*store, model)?;
        let basis = BasisAtomIndex::build(&*store, model, &provider, config.invariance_tolerance);
        basis.write_sites(store);

        let mut constraints = HashMap::new();
        let mut site_operations = HashMap::new();
        for &basis_id in basis.basis_atoms() {
            let atom = store
                .atom(basis_id)
                .ok_or(EngineError::AtomNotFound(basis_id))?;
            let fractional = provider.to_fractional(&atom.position);
            let operations = provider.invariant_operations(&fractional, config.invariance_tolerance);
            let constraint = Constraint::derive(&provider, &operations, &atom.position);
            trace!(atom = ?basis_id, ?constraint, "Derived site constraint.");

            site_operations.insert(basis_id, operations.iter().map(|op| op.index).collect());
            constraints.insert(basis_id, constraint);
        }

        debug!(
            model = ?model,
            group = provider.group().identifier(),
            sites = basis.basis_atoms().len(),
            "Built symmetry cache for model."
        );
        Ok(Self {
            provider,
            basis,
            constraints,
            site_operations,
        })
    }

    pub fn basis_constraint(&self, basis: AtomId) -> Option<&Constraint> {
        self.constraints.get(&basis)
    }

    pub fn site_operations(&self, basis: AtomId) -> Option<&BTreeSet<usize>> {
        self.site_operations.get(&basis)
    }

    pub fn constraint_for(&self, atom: AtomId) -> Option<Constraint> {
        let link = self.basis.link(atom)?;
        let constraint = self.constraints.get(&link.basis)?;
        if link.basis == atom {
            return Some(constraint.clone());
        }
        let (rotation, translation) = self.provider.cartesian_operation(&link.to_atom);
        Some(constraint.transformed(&rotation, &translation))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymmetryCache {
    models: HashMap<ModelId, ModelCache>,
}

impl SymmetryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure<S: ModelStore + ?Sized>(
        &mut self,
        store: &mut S,
        model: ModelId,
        config: &EngineConfig,
    ) -> Result<&ModelCache, EngineError> {
        if !self.models.contains_key(&model) {
            let built = ModelCache::build(store, model, config)?;
            self.models.insert(model, built);
        }
        self.models
            .get(&model)
            .ok_or_else(|| EngineError::Internal(format!("Cache for model {:?} vanished", model)))
    }

    pub fn get(&self, model: ModelId) -> Option<&ModelCache> {
        self.models.get(&model)
    }

    pub fn invalidate(&mut self, model: ModelId) {
        if self.models.remove(&model).is_some() {
            debug!(model = ?model, "Invalidated symmetry cache.");
        }
    }

    pub fn invalidate_all(&mut self) {
        self.models.clear();
    }

    pub fn is_cached(&self, model: ModelId) -> bool {
        self.models.contains_key(&model)
    }
}
