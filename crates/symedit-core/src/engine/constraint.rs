use super::provider::{SiteOperation, SymmetryOperationProvider};
use crate::core::utils::geometry;
use nalgebra::{Matrix3, Point3, SymmetricEigen, Unit, Vector3};
use thiserror::Error;

const RANK_THRESHOLD: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Free,
    Line {
        origin: Point3<f64>,
        direction: Unit<Vector3<f64>>,
    },
    Plane {
        normal: Unit<Vector3<f64>>,
        offset: f64,
    },
    Locked,
    Unknown,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConstraintViolation {
    #[error("Atom is locked on a special position")]
    Locked,
    #[error("Position is off its constraint manifold (squared residual {residual_sq:e})")]
    OffManifold { residual_sq: f64 },
    #[error("Site constraint is unknown")]
    Unknown,
}

impl Constraint {
    pub fn derive(
        provider: &SymmetryOperationProvider,
        operations: &[SiteOperation],
        position: &Point3<f64>,
    ) -> Self {
        if !geometry::is_finite_point(position) {
            return Constraint::Unknown;
        }
        if operations.len() <= 1 {
            return Constraint::Free;
        }

        let mut normals = Matrix3::zeros();
        let mut image_sum = Vector3::zeros();
        for op in operations {
            let (rotation, translation) = provider.cartesian_operation(&op.matrix);
            let deviation = rotation - Matrix3::identity();
            normals += deviation.transpose() * deviation;
            image_sum += rotation * position.coords + translation;
        }
        let centre = Point3::from(image_sum / operations.len() as f64);

        let eigen = SymmetricEigen::new(normals);
        let mut order: Vec<usize> = (0..3).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));
        let rank = eigen
            .eigenvalues
            .iter()
            .filter(|value| **value > RANK_THRESHOLD)
            .count();

        match rank {
            0 => Constraint::Free,
            1 => {
                let normal = Unit::new_normalize(eigen.eigenvectors.column(order[2]).into_owned());
                Constraint::Plane {
                    offset: normal.dot(&centre.coords),
                    normal,
                }
            }
            2 => Constraint::Line {
                origin: centre,
                direction: Unit::new_normalize(eigen.eigenvectors.column(order[0]).into_owned()),
            },
            _ => Constraint::Locked,
        }
    }

    pub fn project(&self, point: &Point3<f64>) -> Point3<f64> {
        match self {
            Constraint::Line { origin, direction } => {
                geometry::project_onto_line(point, origin, direction)
            }
            Constraint::Plane { normal, offset } => {
                geometry::project_onto_plane(point, normal, *offset)
            }
            Constraint::Free | Constraint::Locked | Constraint::Unknown => *point,
        }
    }

    pub fn residual(&self, point: &Point3<f64>) -> f64 {
        (point - self.project(point)).norm_squared()
    }

    pub fn constrain(
        &self,
        old: &Point3<f64>,
        proposed: &Point3<f64>,
        allow_projection: bool,
        tolerance: f64,
    ) -> Result<Point3<f64>, ConstraintViolation> {
        if (proposed - old).norm_squared() <= tolerance {
            return Ok(*old);
        }
        match self {
            Constraint::Free => Ok(*proposed),
            Constraint::Locked => Err(ConstraintViolation::Locked),
            Constraint::Unknown => Err(ConstraintViolation::Unknown),
            Constraint::Line { .. } | Constraint::Plane { .. } => {
                let projected = self.project(proposed);
                let residual_sq = (proposed - projected).norm_squared();
                if residual_sq > tolerance && !allow_projection {
                    Err(ConstraintViolation::OffManifold { residual_sq })
                } else {
                    Ok(projected)
                }
            }
        }
    }

    pub fn transformed(&self, rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Self {
        match self {
            Constraint::Line { origin, direction } => Constraint::Line {
                origin: Point3::from(rotation * origin.coords + translation),
                direction: Unit::new_normalize(rotation * direction.as_ref()),
            },
            Constraint::Plane { normal, offset } => {
                let Some(inverse) = rotation.try_inverse() else {
                    return Constraint::Unknown;
                };
                let point_on_plane = normal.as_ref() * *offset;
                let mapped_normal = Unit::new_normalize(inverse.transpose() * normal.as_ref());
                let mapped_point = rotation * point_on_plane + translation;
                Constraint::Plane {
                    offset: mapped_normal.dot(&mapped_point),
                    normal: mapped_normal,
                }
            }
            other => other.clone(),
        }
    }

    pub fn degrees_of_freedom(&self) -> usize {
        match self {
            Constraint::Free => 3,
            Constraint::Plane { .. } => 2,
            Constraint::Line { .. } => 1,
            Constraint::Locked | Constraint::Unknown => 0,
        }
    }
}
