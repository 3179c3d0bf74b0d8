use nalgebra::Point3;
use symedit::core::models::cell::UnitCell;
use symedit::core::symmetry::notation;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Expected {expected} comma-separated values in '{text}', found {found}.")]
    ValueCount {
        text: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid number '{0}'. Expected a decimal or a fraction such as '1/4'.")]
    InvalidNumber(String),

    #[error("Invalid cell '{text}': {reason}")]
    InvalidCell { text: String, reason: String },
}

fn parse_values<const N: usize>(text: &str) -> Result<[f64; N], ParseError> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() != N {
        return Err(ParseError::ValueCount {
            text: text.to_string(),
            expected: N,
            found: parts.len(),
        });
    }
    let mut values = [0.0; N];
    for (value, part) in values.iter_mut().zip(&parts) {
        *value =
            notation::parse_number(part).map_err(|_| ParseError::InvalidNumber(part.to_string()))?;
    }
    Ok(values)
}

/// Parses a point written as `x,y,z`.
pub fn parse_point(text: &str) -> Result<Point3<f64>, ParseError> {
    let [x, y, z] = parse_values::<3>(text)?;
    Ok(Point3::new(x, y, z))
}

/// Parses cell parameters written as `a,b,c,alpha,beta,gamma`.
pub fn parse_cell(text: &str) -> Result<UnitCell, ParseError> {
    let parameters = parse_values::<6>(text)?;
    UnitCell::from_parameters(parameters).map_err(|e| ParseError::InvalidCell {
        text: text.to_string(),
        reason: e.to_string(),
    })
}
