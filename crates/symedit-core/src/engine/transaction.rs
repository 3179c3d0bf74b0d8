use super::context::ModelStore;
use super::error::EngineError;
use super::state::MoveOutcome;
use crate::core::models::ids::AtomId;
use nalgebra::Point3;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionSnapshot {
    positions: Vec<(AtomId, Point3<f64>)>,
}

impl PositionSnapshot {
    pub fn capture<S: ModelStore + ?Sized>(store: &S, atoms: &[AtomId]) -> Self {
        let positions = atoms
            .iter()
            .filter_map(|&id| store.atom(id).map(|atom| (id, atom.position)))
            .collect();
        Self { positions }
    }

    pub fn restore<S: ModelStore + ?Sized>(&self, store: &mut S) -> usize {
        self.positions
            .iter()
            .filter(|(id, position)| store.set_atom_position(*id, *position))
            .count()
    }

    pub fn count_changed<S: ModelStore + ?Sized>(&self, store: &S) -> usize {
        self.positions
            .iter()
            .filter(|(id, position)| {
                store
                    .atom(*id)
                    .is_some_and(|atom| atom.position != *position)
            })
            .count()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

pub fn transaction<S, F>(
    store: &mut S,
    atoms: &[AtomId],
    action: F,
) -> Result<(MoveOutcome, PositionSnapshot), EngineError>
where
    S: ModelStore + ?Sized,
    F: FnOnce(&mut S) -> Result<MoveOutcome, EngineError>,
{
    let snapshot = PositionSnapshot::capture(store, atoms);

    match action(store) {
        Ok(MoveOutcome::Moved(count)) => Ok((MoveOutcome::Moved(count), snapshot)),
        Ok(MoveOutcome::Rejected(rejection)) => {
            let restored = snapshot.restore(store);
            debug!(?rejection, restored, "Rolled back rejected move.");
            Ok((MoveOutcome::Rejected(rejection), snapshot))
        }
        Err(e) => {
            snapshot.restore(store);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::system::Structure;
    use crate::engine::state::Rejection;

    fn structure_with_atoms() -> (Structure, Vec<AtomId>) {
        let mut structure = Structure::new();
        let model = structure.add_model("m", None);
        let ids = (0..3)
            .map(|i| {
                structure
                    .add_atom(model, Atom::new("C", model, Point3::new(i as f64, 0.0, 0.0)))
                    .unwrap()
            })
            .collect();
        (structure, ids)
    }

    #[test]
    fn snapshot_restore_and_change_count() {
        let (mut structure, ids) = structure_with_atoms();
        let snapshot = PositionSnapshot::capture(&structure, &ids);
        assert_eq!(snapshot.len(), 3);

        structure.set_atom_position(ids[1], Point3::new(5.0, 5.0, 5.0));
        assert_eq!(snapshot.count_changed(&structure), 1);

        assert_eq!(snapshot.restore(&mut structure), 3);
        assert_eq!(snapshot.count_changed(&structure), 0);
        assert_eq!(structure.atom(ids[1]).unwrap().position, Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn transaction_rolls_back_rejections() {
        let (mut structure, ids) = structure_with_atoms();
        let (outcome, _) = transaction(&mut structure, &ids, |store| {
            store.set_atom_position(ids[0], Point3::new(9.0, 9.0, 9.0));
            Ok(MoveOutcome::Rejected(Rejection::BatchInconsistency { atom: ids[0] }))
        })
        .unwrap();

        assert!(!outcome.is_accepted());
        assert_eq!(structure.atom(ids[0]).unwrap().position, Point3::origin());
    }

    #[test]
    fn transaction_rolls_back_errors() {
        let (mut structure, ids) = structure_with_atoms();
        let result = transaction(&mut structure, &ids, |store| {
            store.set_atom_position(ids[2], Point3::new(9.0, 9.0, 9.0));
            Err(EngineError::Internal("boom".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(structure.atom(ids[2]).unwrap().position, Point3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn transaction_keeps_committed_moves_and_returns_snapshot() {
        let (mut structure, ids) = structure_with_atoms();
        let (outcome, snapshot) = transaction(&mut structure, &ids[..1], |store| {
            store.set_atom_position(ids[0], Point3::new(9.0, 9.0, 9.0));
            Ok(MoveOutcome::Moved(1))
        })
        .unwrap();

        assert_eq!(outcome, MoveOutcome::Moved(1));
        assert_eq!(snapshot.count_changed(&structure), 1);
        snapshot.restore(&mut structure);
        assert_eq!(structure.atom(ids[0]).unwrap().position, Point3::origin());
    }
}
