use super::notation;
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

const SNAP_DENOMINATOR: f64 = 24.0;
const SNAP_TOLERANCE: f64 = 1e-9;

/// A symmetry operation of a group: a 4x4 affine matrix acting on fractional coordinates,
/// together with its position in the group's operation list.
///
/// Operation `0` of every group is the identity.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetryOperation {
    index: usize,
    matrix: Matrix4<f64>,
}

impl SymmetryOperation {
    pub fn new(index: usize, matrix: Matrix4<f64>) -> Self {
        Self { index, matrix }
    }

    pub fn identity() -> Self {
        Self::new(0, Matrix4::identity())
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }

    pub fn rotation(&self) -> Matrix3<f64> {
        linear_part(&self.matrix)
    }

    pub fn translation(&self) -> Vector3<f64> {
        translation_part(&self.matrix)
    }

    /// Applies the operation to a fractional point.
    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        apply_affine(&self.matrix, point)
    }

    /// Returns `true` for the identity, ignoring whole lattice translations.
    pub fn is_identity(&self) -> bool {
        let translation = self.translation();
        (self.rotation() - Matrix3::identity()).abs().max() < SNAP_TOLERANCE
            && translation.iter().all(|t| (t - t.round()).abs() < SNAP_TOLERANCE)
    }

    /// Determinant of the rotation part: `+1` for proper, `-1` for improper operations.
    pub fn determinant(&self) -> f64 {
        self.rotation().determinant()
    }

    /// Smallest `n` such that the rotation part raised to `n` is the identity.
    ///
    /// Crystallographic rotations have orders 1, 2, 3, 4 or 6; `None` is returned for
    /// anything that does not return to the identity within 12 steps.
    pub fn rotation_order(&self) -> Option<usize> {
        let rotation = self.rotation();
        let mut power: Matrix3<f64> = Matrix3::identity();
        for n in 1..=12 {
            power *= rotation;
            if (power - Matrix3::identity()).abs().max() < 1e-6 {
                return Some(n);
            }
        }
        None
    }

    /// Jones-faithful representation, e.g. `-x,y+1/2,-z`.
    pub fn to_xyz(&self) -> String {
        notation::format_xyz(&self.matrix)
    }
}

/// Builds an affine matrix from a rotation and a translation.
pub fn affine(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Matrix4<f64> {
    let mut matrix = rotation.to_homogeneous();
    matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
    matrix
}

/// Builds a pure translation.
pub fn translation(shift: &Vector3<f64>) -> Matrix4<f64> {
    affine(&Matrix3::identity(), shift)
}

pub fn linear_part(matrix: &Matrix4<f64>) -> Matrix3<f64> {
    matrix.fixed_view::<3, 3>(0, 0).into_owned()
}

pub fn translation_part(matrix: &Matrix4<f64>) -> Vector3<f64> {
    matrix.fixed_view::<3, 1>(0, 3).into_owned()
}

pub fn apply_affine(matrix: &Matrix4<f64>, point: &Point3<f64>) -> Point3<f64> {
    let image = matrix * point.to_homogeneous();
    Point3::new(image.x, image.y, image.z)
}

/// Inverts an affine matrix, returning `None` if its linear part is singular.
pub fn invert_affine(matrix: &Matrix4<f64>) -> Option<Matrix4<f64>> {
    if linear_part(matrix).determinant().abs() < SNAP_TOLERANCE {
        return None;
    }
    matrix.try_inverse()
}

/// Rounds values that sit within floating-point noise of a multiple of 1/24.
pub fn snap(value: f64) -> f64 {
    let snapped = (value * SNAP_DENOMINATOR).round() / SNAP_DENOMINATOR;
    if (value - snapped).abs() < SNAP_TOLERANCE {
        snapped
    } else {
        value
    }
}

/// Wraps a fractional coordinate into `[0, 1)`.
pub fn wrap_unit(value: f64) -> f64 {
    let wrapped = snap(value - value.floor());
    if wrapped >= 1.0 { wrapped - 1.0 } else { wrapped }
}

/// Snaps every entry and wraps the translation into `[0, 1)`.
pub fn reduce_translation(matrix: &Matrix4<f64>) -> Matrix4<f64> {
    let mut reduced = matrix.map(snap);
    for row in 0..3 {
        reduced[(row, 3)] = wrap_unit(reduced[(row, 3)]);
    }
    reduced
}

/// Hashable identity of an operation modulo lattice translations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct OperationKey([i64; 12]);

impl OperationKey {
    pub(crate) fn new(matrix: &Matrix4<f64>) -> Self {
        let mut key = [0_i64; 12];
        for row in 0..3 {
            for col in 0..3 {
                key[row * 4 + col] = (matrix[(row, col)] * 1e4).round() as i64;
            }
            key[row * 4 + 3] = ((wrap_unit(matrix[(row, 3)]) * 1e5).round() as i64) % 100_000;
        }
        Self(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::symmetry::notation::parse_xyz;

    fn op(xyz: &str) -> SymmetryOperation {
        SymmetryOperation::new(1, parse_xyz(xyz).unwrap())
    }

    #[test]
    fn apply_screw_axis_to_point() {
        let screw = op("-x,y+1/2,-z");
        let image = screw.apply(&Point3::new(0.3, 0.5, 0.1));
        assert!((image - Point3::new(-0.3, 1.0, -0.1)).norm() < 1e-12);
    }

    #[test]
    fn identity_detection_ignores_lattice_translations() {
        assert!(SymmetryOperation::identity().is_identity());
        assert!(op("x+1,y,z-2").is_identity());
        assert!(!op("x+1/2,y,z").is_identity());
        assert!(!op("-x,-y,-z").is_identity());
    }

    #[test]
    fn rotation_order_and_determinant() {
        assert_eq!(op("-y,x-y,z").rotation_order(), Some(3));
        assert_eq!(op("-y,x,z").rotation_order(), Some(4));
        assert_eq!(op("x,-y,z").rotation_order(), Some(2));
        assert_eq!(op("x,y,z").rotation_order(), Some(1));
        assert!((op("x,-y,z").determinant() + 1.0).abs() < 1e-12);
        assert!((op("-y,x-y,z").determinant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn affine_round_trips_parts() {
        let rotation = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let shift = Vector3::new(0.5, 0.0, 0.25);
        let matrix = affine(&rotation, &shift);
        assert_eq!(linear_part(&matrix), rotation);
        assert_eq!(translation_part(&matrix), shift);
        assert_eq!(translation(&shift)[(2, 3)], 0.25);
    }

    #[test]
    fn invert_affine_rejects_singular_matrices() {
        let singular = affine(&Matrix3::zeros(), &Vector3::zeros());
        assert!(invert_affine(&singular).is_none());

        let screw = parse_xyz("-x,y+1/2,-z").unwrap();
        let inverse = invert_affine(&screw).unwrap();
        assert!((screw * inverse - Matrix4::identity()).abs().max() < 1e-12);
    }

    #[test]
    fn wrap_and_reduce_translation() {
        assert_eq!(wrap_unit(-0.25), 0.75);
        assert_eq!(wrap_unit(1.0), 0.0);
        assert_eq!(wrap_unit(0.9999999999999), 0.0);

        let reduced = reduce_translation(&parse_xyz("-x+3/2,y-1/2,z").unwrap());
        assert_eq!(reduced[(0, 3)], 0.5);
        assert_eq!(reduced[(1, 3)], 0.5);
    }

    #[test]
    fn operation_keys_identify_lattice_equivalent_operations() {
        let a = parse_xyz("-x+1/2,y,-z").unwrap();
        let b = parse_xyz("-x-1/2,y+1,-z").unwrap();
        let c = parse_xyz("-x,y,-z").unwrap();
        assert_eq!(OperationKey::new(&a), OperationKey::new(&b));
        assert_ne!(OperationKey::new(&a), OperationKey::new(&c));
    }

    #[test]
    fn to_xyz_formats_the_matrix() {
        assert_eq!(op("-x, y+1/2, -z").to_xyz(), "-x,y+1/2,-z");
    }
}
