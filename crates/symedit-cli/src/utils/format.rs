use nalgebra::{Matrix4, Point3, Vector3};
use symedit::engine::constraint::Constraint;
use symedit::engine::state::{MoveOutcome, Rejection};

pub fn point(p: &Point3<f64>) -> String {
    format!("({:>9.5}, {:>9.5}, {:>9.5})", p.x, p.y, p.z)
}

pub fn vector(v: &Vector3<f64>) -> String {
    format!("[{:.5}, {:.5}, {:.5}]", v.x, v.y, v.z)
}

/// Rows of an affine matrix, one per line, indented by `indent` spaces.
pub fn matrix(m: &Matrix4<f64>, indent: usize) -> String {
    (0..4)
        .map(|r| {
            format!(
                "{:indent$}[{:>9.5} {:>9.5} {:>9.5} {:>9.5}]",
                "",
                m[(r, 0)],
                m[(r, 1)],
                m[(r, 2)],
                m[(r, 3)],
                indent = indent
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn constraint(c: &Constraint) -> String {
    match c {
        Constraint::Free => "free (3 degrees of freedom)".to_string(),
        Constraint::Line { origin, direction } => format!(
            "line through {} along {} (1 degree of freedom)",
            point(origin),
            vector(direction)
        ),
        Constraint::Plane { normal, offset } => format!(
            "plane with normal {} at offset {:.5} (2 degrees of freedom)",
            vector(normal),
            offset
        ),
        Constraint::Locked => "locked (0 degrees of freedom)".to_string(),
        Constraint::Unknown => "unknown".to_string(),
    }
}

pub fn outcome(o: &MoveOutcome) -> String {
    match o {
        MoveOutcome::Moved(0) => "accepted, nothing to move".to_string(),
        MoveOutcome::Moved(count) => format!("accepted, {} atom(s) moved", count),
        MoveOutcome::Rejected(Rejection::ConstraintViolation { violation, .. }) => {
            format!("rejected: {}", violation)
        }
        MoveOutcome::Rejected(Rejection::SymmetryMismatch { .. }) => {
            "rejected: the move would change the site symmetry".to_string()
        }
        MoveOutcome::Rejected(Rejection::BatchInconsistency { .. }) => {
            "rejected: a propagated position missed its target".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Unit;

    #[test]
    fn describes_constraints() {
        assert_eq!(constraint(&Constraint::Locked), "locked (0 degrees of freedom)");
        let line = Constraint::Line {
            origin: Point3::origin(),
            direction: Unit::new_normalize(Vector3::y()),
        };
        assert!(constraint(&line).contains("along [0.00000, 1.00000, 0.00000]"));
    }

    #[test]
    fn describes_outcomes() {
        assert_eq!(outcome(&MoveOutcome::Moved(2)), "accepted, 2 atom(s) moved");
        assert_eq!(outcome(&MoveOutcome::Moved(0)), "accepted, nothing to move");
    }

    #[test]
    fn matrix_rows_are_indented() {
        let text = matrix(&Matrix4::identity(), 2);
        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().all(|line| line.starts_with("  [")));
    }
}
