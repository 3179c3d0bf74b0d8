use nalgebra::{Matrix3, Point3, Vector3};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CellError {
    #[error("Cell edge lengths must be positive and finite, got {0:?}")]
    InvalidLengths([f64; 3]),
    #[error("Cell angles {0:?} do not describe a valid parallelepiped")]
    InvalidAngles([f64; 3]),
    #[error("Cell basis is singular")]
    Singular,
}

/// Crystallographic unit cell with precomputed conversion matrices.
///
/// The Cartesian frame follows the usual convention: `a` along x, `b` in the xy plane and `c`
/// completing a right-handed basis.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitCell {
    /// Cell edge lengths (a, b, c) in Angstroms.
    lengths: [f64; 3],
    /// Cell angles (alpha, beta, gamma) in degrees.
    angles: [f64; 3],
    /// Columns are the cell vectors a, b, c in Cartesian coordinates.
    frac_to_cart: Matrix3<f64>,
    cart_to_frac: Matrix3<f64>,
}

impl UnitCell {
    /// Creates a unit cell from its edge lengths and angles.
    ///
    /// # Errors
    ///
    /// Returns [`CellError`] if a length is not positive, an angle lies outside `(0, 180)`
    /// degrees, or the three angles cannot close a parallelepiped.
    pub fn new(lengths: [f64; 3], angles: [f64; 3]) -> Result<Self, CellError> {
        if lengths.iter().any(|l| !l.is_finite() || *l <= 0.0) {
            return Err(CellError::InvalidLengths(lengths));
        }
        if angles
            .iter()
            .any(|a| !a.is_finite() || *a <= 0.0 || *a >= 180.0)
        {
            return Err(CellError::InvalidAngles(angles));
        }

        let [a, b, c] = lengths;
        let [alpha, beta, gamma] = angles.map(f64::to_radians);
        let (ca, cb, cg) = (alpha.cos(), beta.cos(), gamma.cos());
        let sg = gamma.sin();

        let volume_factor = 1.0 - ca * ca - cb * cb - cg * cg + 2.0 * ca * cb * cg;
        if volume_factor <= 1e-12 {
            return Err(CellError::InvalidAngles(angles));
        }

        #[rustfmt::skip]
        let frac_to_cart = Matrix3::new(
            a,   b * cg, c * cb,
            0.0, b * sg, c * (ca - cb * cg) / sg,
            0.0, 0.0,    c * volume_factor.sqrt() / sg,
        );
        let cart_to_frac = frac_to_cart.try_inverse().ok_or(CellError::Singular)?;

        Ok(Self {
            lengths,
            angles,
            frac_to_cart,
            cart_to_frac,
        })
    }

    /// Creates a unit cell from `[a, b, c, alpha, beta, gamma]`.
    pub fn from_parameters(parameters: [f64; 6]) -> Result<Self, CellError> {
        let [a, b, c, alpha, beta, gamma] = parameters;
        Self::new([a, b, c], [alpha, beta, gamma])
    }

    /// Creates a unit cell from three Cartesian cell vectors given as matrix columns.
    ///
    /// Only the metric of the basis is kept; the resulting cell is re-oriented into the
    /// standard Cartesian frame.
    pub fn from_basis(basis: &Matrix3<f64>) -> Result<Self, CellError> {
        if basis.determinant().abs() < 1e-12 {
            return Err(CellError::Singular);
        }
        let a: Vector3<f64> = basis.column(0).into_owned();
        let b: Vector3<f64> = basis.column(1).into_owned();
        let c: Vector3<f64> = basis.column(2).into_owned();

        let lengths = [a.norm(), b.norm(), c.norm()];
        let angles = [
            b.angle(&c).to_degrees(),
            a.angle(&c).to_degrees(),
            a.angle(&b).to_degrees(),
        ];
        Self::new(lengths, angles)
    }

    pub fn lengths(&self) -> [f64; 3] {
        self.lengths
    }

    pub fn angles(&self) -> [f64; 3] {
        self.angles
    }

    /// Returns `[a, b, c, alpha, beta, gamma]`.
    pub fn parameters(&self) -> [f64; 6] {
        let [a, b, c] = self.lengths;
        let [alpha, beta, gamma] = self.angles;
        [a, b, c, alpha, beta, gamma]
    }

    pub fn frac_to_cart(&self) -> &Matrix3<f64> {
        &self.frac_to_cart
    }

    pub fn cart_to_frac(&self) -> &Matrix3<f64> {
        &self.cart_to_frac
    }

    pub fn volume(&self) -> f64 {
        self.frac_to_cart.determinant()
    }

    pub fn to_fractional(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.cart_to_frac * point.coords)
    }

    pub fn to_cartesian(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.frac_to_cart * point.coords)
    }

    /// Returns the cell spanned by the new basis `[a b c] * basis_change`.
    ///
    /// The columns of `basis_change` are the new cell vectors expressed in the current basis,
    /// the same convention used by `a,b,c` transform strings.
    pub fn transformed(&self, basis_change: &Matrix3<f64>) -> Result<Self, CellError> {
        Self::from_basis(&(self.frac_to_cart * basis_change))
    }
}
