use itertools::Itertools;
use nalgebra::{Matrix3, Matrix4, Vector3};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NotationError {
    #[error("Empty expression")]
    Empty,
    #[error("Expected {expected} comma-separated components, found {found}")]
    ComponentCount { expected: usize, found: usize },
    #[error("Invalid term '{0}'")]
    InvalidTerm(String),
    #[error("Invalid number '{0}'")]
    InvalidNumber(String),
    #[error("Malformed matrix '{0}'")]
    MalformedMatrix(String),
}

const XYZ: [char; 3] = ['x', 'y', 'z'];
const ABC: [char; 3] = ['a', 'b', 'c'];
const ZERO_TOLERANCE: f64 = 1e-9;

/// Parses a plain number, a decimal or a fraction such as `1/2` or `-2/3`.
pub fn parse_number(text: &str) -> Result<f64, NotationError> {
    let text = text.trim();
    let invalid = || NotationError::InvalidNumber(text.to_string());
    let (numerator, denominator) = match text.split_once('/') {
        Some((n, d)) => (n, Some(d)),
        None => (text, None),
    };
    let value: f64 = numerator.parse().map_err(|_| invalid())?;
    match denominator {
        Some(d) => {
            let d: f64 = d.parse().map_err(|_| invalid())?;
            if d == 0.0 {
                return Err(invalid());
            }
            Ok(value / d)
        }
        None => Ok(value),
    }
}

/// Parses a Jones-faithful operation such as `-x+1/2,y,-z` into a 4x4 affine matrix.
///
/// Each component is one row: the coefficients of x, y and z followed by the translation.
pub fn parse_xyz(text: &str) -> Result<Matrix4<f64>, NotationError> {
    let components = split_components(text)?;
    let mut matrix = Matrix4::identity();
    for (row, component) in components.iter().enumerate() {
        let (coefficients, constant) = parse_linear(component, XYZ)?;
        for col in 0..3 {
            matrix[(row, col)] = coefficients[col];
        }
        matrix[(row, 3)] = constant;
    }
    Ok(matrix)
}

/// Parses a basis change such as `a-b,a+b,c` or `a,b,2c;0,0,1/2`.
///
/// Each comma-separated component is a new basis vector in terms of the old one and becomes
/// a column of the linear part. The optional part after `;` is the origin shift, expressed in
/// the old basis.
pub fn parse_basis_change(text: &str) -> Result<Matrix4<f64>, NotationError> {
    let (linear, shift) = match text.split_once(';') {
        Some((linear, shift)) => (linear, Some(shift)),
        None => (text, None),
    };

    let mut matrix = Matrix4::identity();
    for (col, component) in split_components(linear)?.iter().enumerate() {
        let (coefficients, constant) = parse_linear(component, ABC)?;
        if constant.abs() > ZERO_TOLERANCE {
            return Err(NotationError::InvalidTerm(component.to_string()));
        }
        for row in 0..3 {
            matrix[(row, col)] = coefficients[row];
        }
    }

    if let Some(shift) = shift {
        for (row, component) in split_components(shift)?.iter().enumerate() {
            matrix[(row, 3)] = parse_number(component)?;
        }
    }
    Ok(matrix)
}

/// Parses an explicit matrix written as nested rows.
///
/// Accepts three rows of three entries (linear part only), three rows of four entries
/// (affine without the homogeneous row) or four rows of four entries whose last row is
/// `[0,0,0,1]`. Entries may be fractions.
pub fn parse_matrix(text: &str) -> Result<Matrix4<f64>, NotationError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let malformed = || NotationError::MalformedMatrix(text.to_string());
    let inner = compact
        .strip_prefix("[[")
        .and_then(|rest| rest.strip_suffix("]]"))
        .ok_or_else(malformed)?;

    let rows = inner
        .split("],[")
        .map(|row| row.split(',').map(parse_number).collect::<Result<Vec<_>, _>>())
        .collect::<Result<Vec<_>, _>>()?;

    let widths: Vec<usize> = rows.iter().map(Vec::len).collect();
    let mut matrix = Matrix4::identity();
    match (rows.len(), widths.as_slice()) {
        (3, [3, 3, 3]) | (3, [4, 4, 4]) | (4, [4, 4, 4, 4]) => {
            for (r, row) in rows.iter().enumerate() {
                for (c, value) in row.iter().enumerate() {
                    matrix[(r, c)] = *value;
                }
            }
        }
        _ => return Err(malformed()),
    }

    let last_row_is_homogeneous = (0..3).all(|c| matrix[(3, c)].abs() < ZERO_TOLERANCE)
        && (matrix[(3, 3)] - 1.0).abs() < ZERO_TOLERANCE;
    if !last_row_is_homogeneous {
        return Err(malformed());
    }
    Ok(matrix)
}

/// Formats an affine matrix as a Jones-faithful operation, e.g. `-x+1/2,y,-z`.
pub fn format_xyz(matrix: &Matrix4<f64>) -> String {
    (0..3)
        .map(|row| {
            let coefficients = Vector3::new(matrix[(row, 0)], matrix[(row, 1)], matrix[(row, 2)]);
            format_linear(&coefficients, matrix[(row, 3)], XYZ)
        })
        .join(",")
}

/// Formats a basis change as `a,b,c` columns, followed by `;shift` if the origin moves.
pub fn format_basis_change(matrix: &Matrix4<f64>) -> String {
    let linear = (0..3)
        .map(|col| {
            let column = Vector3::new(matrix[(0, col)], matrix[(1, col)], matrix[(2, col)]);
            format_linear(&column, 0.0, ABC)
        })
        .join(",");

    let shift = Vector3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);
    if shift.iter().all(|v| v.abs() < ZERO_TOLERANCE) {
        linear
    } else {
        format!("{};{}", linear, shift.iter().map(|v| format_fraction(*v)).join(","))
    }
}

/// Formats a linear part on its own, e.g. for reporting rotation matrices.
pub fn format_rotation(rotation: &Matrix3<f64>) -> String {
    format_xyz(&rotation.to_homogeneous())
}

/// Formats a value as a fraction with a small denominator when possible.
pub fn format_fraction(value: f64) -> String {
    for denominator in [1_i64, 2, 3, 4, 6, 8, 12, 24] {
        let numerator = value * denominator as f64;
        if (numerator - numerator.round()).abs() < 1e-6 {
            let numerator = numerator.round() as i64;
            return if denominator == 1 {
                numerator.to_string()
            } else {
                format!("{}/{}", numerator, denominator)
            };
        }
    }
    let text = format!("{:.6}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn split_components(text: &str) -> Result<Vec<&str>, NotationError> {
    let components: Vec<&str> = text.split(',').collect();
    if components.len() != 3 {
        return Err(NotationError::ComponentCount {
            expected: 3,
            found: components.len(),
        });
    }
    Ok(components)
}

/// Splits a compact expression at every sign that starts a new term.
fn split_terms(expr: &str) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut start = 0;
    for (i, c) in expr.char_indices() {
        if (c == '+' || c == '-') && i > start && !expr[..i].ends_with('/') {
            terms.push(&expr[start..i]);
            start = i;
        }
    }
    terms.push(&expr[start..]);
    terms
}

fn parse_linear(expr: &str, vars: [char; 3]) -> Result<(Vector3<f64>, f64), NotationError> {
    let compact: String = expr
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    if compact.is_empty() {
        return Err(NotationError::Empty);
    }

    let mut coefficients = Vector3::zeros();
    let mut constant = 0.0;

    for term in split_terms(&compact) {
        let invalid = || NotationError::InvalidTerm(term.to_string());
        let (sign, body) = match term.strip_prefix('-') {
            Some(rest) => (-1.0, rest),
            None => (1.0, term.strip_prefix('+').unwrap_or(term)),
        };
        if body.is_empty() {
            return Err(invalid());
        }

        match body.find(|c: char| vars.contains(&c)) {
            Some(pos) => {
                let var = body[pos..].chars().next().ok_or_else(invalid)?;
                let axis = vars.iter().position(|v| *v == var).ok_or_else(invalid)?;
                let prefix = body[..pos].trim_end_matches('*');
                let suffix = &body[pos + var.len_utf8()..];

                let mut coefficient = if prefix.is_empty() {
                    1.0
                } else {
                    parse_number(prefix).map_err(|_| invalid())?
                };
                if !suffix.is_empty() {
                    let divisor = suffix.strip_prefix('/').ok_or_else(invalid)?;
                    let divisor = parse_number(divisor).map_err(|_| invalid())?;
                    if divisor == 0.0 {
                        return Err(invalid());
                    }
                    coefficient /= divisor;
                }
                coefficients[axis] += sign * coefficient;
            }
            None => constant += sign * parse_number(body).map_err(|_| invalid())?,
        }
    }
    Ok((coefficients, constant))
}

fn format_linear(coefficients: &Vector3<f64>, constant: f64, vars: [char; 3]) -> String {
    let mut out = String::new();
    for (axis, coefficient) in coefficients.iter().enumerate() {
        if coefficient.abs() < ZERO_TOLERANCE {
            continue;
        }
        push_signed(&mut out, *coefficient);
        let magnitude = coefficient.abs();
        if (magnitude - 1.0).abs() >= ZERO_TOLERANCE {
            out.push_str(&format_fraction(magnitude));
        }
        out.push(vars[axis]);
    }
    if constant.abs() >= ZERO_TOLERANCE {
        push_signed(&mut out, constant);
        out.push_str(&format_fraction(constant.abs()));
    }
    if out.is_empty() {
        out.push('0');
    }
    out
}

fn push_signed(out: &mut String, value: f64) {
    if value < 0.0 {
        out.push('-');
    } else if !out.is_empty() {
        out.push('+');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_identity() {
        assert_eq!(parse_xyz("x,y,z").unwrap(), Matrix4::identity());
    }

    #[test]
    fn parse_negative_with_translation() {
        let m = parse_xyz("-x+1/2,-y+1/2,z").unwrap();
        assert_eq!(m[(0, 0)], -1.0);
        assert_eq!(m[(0, 3)], 0.5);
        assert_eq!(m[(1, 1)], -1.0);
        assert_eq!(m[(1, 3)], 0.5);
        assert_eq!(m[(2, 2)], 1.0);
        assert_eq!(m[(2, 3)], 0.0);
    }

    #[test]
    fn parse_hexagonal_and_leading_constant_terms() {
        let m = parse_xyz("x-y, X, 1/6+z").unwrap();
        assert_eq!(m[(0, 0)], 1.0);
        assert_eq!(m[(0, 1)], -1.0);
        assert_eq!(m[(1, 0)], 1.0);
        assert!((m[(2, 3)] - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn parse_xyz_rejects_malformed_input() {
        assert_eq!(
            parse_xyz("x,y"),
            Err(NotationError::ComponentCount {
                expected: 3,
                found: 2
            })
        );
        assert!(matches!(parse_xyz("x+,y,z"), Err(NotationError::InvalidTerm(_))));
        assert!(matches!(parse_xyz("q,y,z"), Err(NotationError::InvalidTerm(_))));
        assert!(matches!(parse_xyz("xy,y,z"), Err(NotationError::InvalidTerm(_))));
        assert_eq!(parse_xyz(",y,z"), Err(NotationError::Empty));
    }

    #[test]
    fn parse_basis_change_builds_columns() {
        let m = parse_basis_change("a-b,a+b,c").unwrap();
        let column = |c: usize| Vector3::new(m[(0, c)], m[(1, c)], m[(2, c)]);
        assert_eq!(column(0), Vector3::new(1.0, -1.0, 0.0));
        assert_eq!(column(1), Vector3::new(1.0, 1.0, 0.0));
        assert_eq!(column(2), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(m[(3, 3)], 1.0);
    }

    #[test]
    fn parse_basis_change_with_fractions_and_origin_shift() {
        let m = parse_basis_change("a/2-b/2, a/2+b/2, 2c; 0,0,1/4").unwrap();
        assert_eq!(m[(0, 0)], 0.5);
        assert_eq!(m[(1, 0)], -0.5);
        assert_eq!(m[(2, 2)], 2.0);
        assert_eq!(m[(2, 3)], 0.25);

        let rhombohedral = parse_basis_change("2a/3+b/3+c/3,-a/3+b/3+c/3,-a/3-2b/3+c/3").unwrap();
        assert!((rhombohedral.fixed_view::<3, 3>(0, 0).determinant() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn parse_basis_change_rejects_constants_in_vectors() {
        assert!(matches!(
            parse_basis_change("a+1,b,c"),
            Err(NotationError::InvalidTerm(_))
        ));
    }

    #[test]
    fn parse_matrix_accepts_all_supported_shapes() {
        let m3 = parse_matrix("[[1,0,0],[0,1,0],[0,0,2]]").unwrap();
        assert_eq!(m3[(2, 2)], 2.0);
        assert_eq!(m3[(2, 3)], 0.0);

        let m34 = parse_matrix("[[1,0,0,1/2],[0,1,0,0],[0,0,1,0]]").unwrap();
        assert_eq!(m34[(0, 3)], 0.5);

        let m4 = parse_matrix("[[0,1,0,0],[1,0,0,0],[0,0,1,0],[0,0,0,1]]").unwrap();
        assert_eq!(m4[(0, 1)], 1.0);
    }

    #[test]
    fn parse_matrix_rejects_bad_shapes() {
        assert!(parse_matrix("[[1,0],[0,1]]").is_err());
        assert!(parse_matrix("[[1,0,0,0],[0,1,0,0],[0,0,1,0],[1,0,0,1]]").is_err());
        assert!(parse_matrix("[1,0,0]").is_err());
    }

    #[test]
    fn format_xyz_round_trips_common_operations() {
        for op in ["x,y,z", "-x+1/2,y+1/2,-z+1/2", "-y,x-y,z+1/3", "z,x,y", "y+3/4,x+1/4,-z"] {
            assert_eq!(format_xyz(&parse_xyz(op).unwrap()), op);
        }
    }

    #[test]
    fn format_basis_change_round_trips() {
        for transform in ["a,b,c", "c,a,b", "a-b,a+b,2c", "a,b,c;0,0,1/4"] {
            assert_eq!(
                format_basis_change(&parse_basis_change(transform).unwrap()),
                transform
            );
        }
    }

    #[test]
    fn format_fraction_prefers_small_denominators() {
        assert_eq!(format_fraction(0.5), "1/2");
        assert_eq!(format_fraction(-2.0 / 3.0), "-2/3");
        assert_eq!(format_fraction(3.0), "3");
        assert_eq!(format_fraction(0.123456789), "0.123457");
    }
}
