use super::constraint::ConstraintViolation;
use crate::core::models::ids::AtomId;

#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    ConstraintViolation {
        atom: AtomId,
        violation: ConstraintViolation,
    },
    SymmetryMismatch { atom: AtomId },
    BatchInconsistency { atom: AtomId },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    Moved(usize),
    Rejected(Rejection),
}

impl MoveOutcome {
    pub fn moved_count(&self) -> usize {
        match self {
            MoveOutcome::Moved(count) => *count,
            MoveOutcome::Rejected(_) => 0,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, MoveOutcome::Moved(_))
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            MoveOutcome::Moved(_) => None,
            MoveOutcome::Rejected(rejection) => Some(rejection),
        }
    }
}
