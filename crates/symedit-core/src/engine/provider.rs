use super::context::ModelStore;
use super::error::EngineError;
use crate::core::models::cell::UnitCell;
use crate::core::models::ids::ModelId;
use crate::core::symmetry::groups::{GroupError, SpaceGroup};
use crate::core::symmetry::operation::{self, SymmetryOperation};
use crate::core::utils::geometry;
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use std::collections::BTreeSet;
use tracing::debug;

const FRAME_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct SiteOperation {
    pub index: usize,
    pub matrix: Matrix4<f64>,
}

#[derive(Debug, Clone)]
pub struct SymmetryOperationProvider {
    group: SpaceGroup,
    cell: Option<UnitCell>,
    // Fractional-to-Cartesian axes; orthonormal or unit hexagonal for finite models.
    frame: Matrix3<f64>,
    frame_inverse: Matrix3<f64>,
}

impl SymmetryOperationProvider {
    pub fn new(group: SpaceGroup, cell: Option<UnitCell>) -> Result<Self, GroupError> {
        let (frame, frame_inverse) = match &cell {
            Some(cell) => (*cell.frac_to_cart(), *cell.cart_to_frac()),
            None => finite_frame(&group)?,
        };
        Ok(Self {
            group,
            cell,
            frame,
            frame_inverse,
        })
    }

    pub fn trivial() -> Self {
        Self {
            group: SpaceGroup::trivial(),
            cell: None,
            frame: Matrix3::identity(),
            frame_inverse: Matrix3::identity(),
        }
    }

    pub fn from_descriptor(token: &str, cell: Option<UnitCell>) -> Result<Self, GroupError> {
        let group = match &cell {
            Some(_) => SpaceGroup::resolve(token)?,
            None => SpaceGroup::resolve_point_group(token)?,
        };
        Self::new(group, cell)
    }

    pub fn for_model<S: ModelStore + ?Sized>(store: &S, model: ModelId) -> Result<Self, EngineError> {
        if !store.contains_model(model) {
            return Err(EngineError::ModelNotFound(model));
        }
        match store.model_symmetry(model) {
            None => Ok(Self::trivial()),
            Some(symmetry) => {
                let provider = Self::from_descriptor(&symmetry.group, symmetry.cell.clone())
                    .map_err(|source| EngineError::Symmetry { model, source })?;
                debug!(
                    group = provider.group.identifier(),
                    order = provider.group.order(),
                    periodic = symmetry.is_periodic(),
                    "Resolved model symmetry."
                );
                Ok(provider)
            }
        }
    }

    pub fn group(&self) -> &SpaceGroup {
        &self.group
    }

    pub fn cell(&self) -> Option<&UnitCell> {
        self.cell.as_ref()
    }

    pub fn is_periodic(&self) -> bool {
        self.cell.is_some()
    }

    pub fn operations(&self) -> &[SymmetryOperation] {
        self.group.operations()
    }

    pub fn to_fractional(&self, point: &Point3<f64>) -> Point3<f64> {
        match &self.cell {
            Some(cell) => cell.to_fractional(point),
            None => Point3::from(self.frame_inverse * point.coords),
        }
    }

    pub fn to_cartesian(&self, point: &Point3<f64>) -> Point3<f64> {
        match &self.cell {
            Some(cell) => cell.to_cartesian(point),
            None => Point3::from(self.frame * point.coords),
        }
    }

    fn lattice_shift(&self, image: &Point3<f64>, target: &Point3<f64>) -> Vector3<f64> {
        if self.is_periodic() {
            (target - image).map(f64::round)
        } else {
            Vector3::zeros()
        }
    }

    pub fn invariant_operations(&self, point: &Point3<f64>, tolerance: f64) -> Vec<SiteOperation> {
        if !geometry::is_finite_point(point) {
            return Vec::new();
        }
        self.operations()
            .iter()
            .filter_map(|op| {
                let image = op.apply(point);
                let shift = self.lattice_shift(&image, point);
                let residual = (image + shift - point).norm_squared();
                (residual < tolerance).then(|| SiteOperation {
                    index: op.index(),
                    matrix: operation::translation(&shift) * op.matrix(),
                })
            })
            .collect()
    }

    pub fn invariant_operation_ids(&self, point: &Point3<f64>, tolerance: f64) -> BTreeSet<usize> {
        self.invariant_operations(point, tolerance)
            .into_iter()
            .map(|op| op.index)
            .collect()
    }

    pub fn map_onto(
        &self,
        from: &Point3<f64>,
        to: &Point3<f64>,
        tolerance: f64,
    ) -> Option<(usize, Matrix4<f64>)> {
        self.operations().iter().find_map(|op| {
            let image = op.apply(from);
            let shift = self.lattice_shift(&image, to);
            let residual = (image + shift - to).norm_squared();
            (residual < tolerance).then(|| (op.index(), operation::translation(&shift) * op.matrix()))
        })
    }

    pub fn orbit(&self, point: &Point3<f64>, tolerance: f64) -> Vec<Point3<f64>> {
        let periodic = self.is_periodic();
        let mut images: Vec<Point3<f64>> = vec![*point];
        for op in self.operations() {
            let mut image = op.apply(point);
            if periodic {
                image = image.map(operation::wrap_unit);
            }
            let seen = images
                .iter()
                .any(|p| geometry::fractional_distance_squared(p, &image, periodic) < tolerance);
            if !seen {
                images.push(image);
            }
        }
        images
    }

    pub fn cartesian_operation(&self, matrix: &Matrix4<f64>) -> (Matrix3<f64>, Vector3<f64>) {
        let rotation = operation::linear_part(matrix);
        let translation = operation::translation_part(matrix);
        (
            self.frame * rotation * self.frame_inverse,
            self.frame * translation,
        )
    }

    pub fn apply_cartesian(&self, matrix: &Matrix4<f64>, point: &Point3<f64>) -> Point3<f64> {
        self.to_cartesian(&operation::apply_affine(matrix, &self.to_fractional(point)))
    }
}

fn finite_frame(group: &SpaceGroup) -> Result<(Matrix3<f64>, Matrix3<f64>), GroupError> {
    if group
        .operations()
        .iter()
        .any(|op| op.translation().norm() > FRAME_TOLERANCE)
    {
        return Err(GroupError::NotPointGroup(group.identifier().to_string()));
    }

    let hexagonal = Matrix3::new(1.0, -0.5, 0.0, 0.0, 3.0_f64.sqrt() / 2.0, 0.0, 0.0, 0.0, 1.0);
    [Matrix3::identity(), hexagonal]
        .into_iter()
        .filter_map(|frame| frame.try_inverse().map(|inverse| (frame, inverse)))
        .find(|(frame, inverse)| {
            group.operations().iter().all(|op| {
                let rotation = frame * op.rotation() * inverse;
                (rotation.transpose() * rotation - Matrix3::identity()).abs().max() < FRAME_TOLERANCE
            })
        })
        .ok_or_else(|| GroupError::NoCartesianFrame(group.identifier().to_string()))
}
