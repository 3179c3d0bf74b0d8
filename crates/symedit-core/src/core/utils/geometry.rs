use nalgebra::{Point3, Rotation3, Unit, Vector3};

const AXIS_EPSILON: f64 = 1e-12;

pub fn rotation_from_axis_angle(axis: &Unit<Vector3<f64>>, angle_degrees: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(axis, angle_degrees.to_radians())
}

/// Unit direction from `from` to `to`, or `None` if the two points coincide.
pub fn axis_between(from: &Point3<f64>, to: &Point3<f64>) -> Option<Unit<Vector3<f64>>> {
    Unit::try_new(to - from, AXIS_EPSILON)
}

/// Rotates `point` by `angle_degrees` about the line through `origin` along `axis`.
pub fn rotate_about_line(
    point: &Point3<f64>,
    origin: &Point3<f64>,
    axis: &Unit<Vector3<f64>>,
    angle_degrees: f64,
) -> Point3<f64> {
    origin + rotation_from_axis_angle(axis, angle_degrees) * (point - origin)
}

/// Orthogonal projection of `point` onto the line through `origin` along `direction`.
pub fn project_onto_line(
    point: &Point3<f64>,
    origin: &Point3<f64>,
    direction: &Unit<Vector3<f64>>,
) -> Point3<f64> {
    origin + direction.as_ref() * (point - origin).dot(direction)
}

/// Orthogonal projection of `point` onto the plane `normal . x = offset`.
pub fn project_onto_plane(point: &Point3<f64>, normal: &Unit<Vector3<f64>>, offset: f64) -> Point3<f64> {
    let distance = normal.dot(&point.coords) - offset;
    point - normal.as_ref() * distance
}

/// Fractional difference `b - a` with every component reduced into `[-0.5, 0.5)`.
pub fn minimum_image(delta: &Vector3<f64>) -> Vector3<f64> {
    delta.map(|d| d - d.round())
}

/// Squared distance between two fractional points, modulo lattice translations when
/// `periodic` is set.
pub fn fractional_distance_squared(a: &Point3<f64>, b: &Point3<f64>, periodic: bool) -> f64 {
    let delta = b - a;
    if periodic {
        minimum_image(&delta).norm_squared()
    } else {
        delta.norm_squared()
    }
}

pub fn is_finite_point(point: &Point3<f64>) -> bool {
    point.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_about_line_quarter_turn() {
        let axis = axis_between(&Point3::new(1.0, 0.0, 0.0), &Point3::new(1.0, 0.0, 2.0)).unwrap();
        let rotated = rotate_about_line(
            &Point3::new(2.0, 0.0, 0.5),
            &Point3::new(1.0, 0.0, 0.0),
            &axis,
            90.0,
        );
        assert!((rotated - Point3::new(1.0, 1.0, 0.5)).norm() < 1e-12);
    }

    #[test]
    fn axis_between_coincident_points_is_none() {
        let p = Point3::new(0.3, 0.3, 0.3);
        assert!(axis_between(&p, &p).is_none());
    }

    #[test]
    fn projections_land_on_manifold() {
        let direction = Unit::new_normalize(Vector3::new(1.0, 1.0, 0.0));
        let on_line = project_onto_line(&Point3::new(1.0, 0.0, 3.0), &Point3::origin(), &direction);
        assert!((on_line - Point3::new(0.5, 0.5, 0.0)).norm() < 1e-12);

        let normal = Vector3::z_axis();
        let on_plane = project_onto_plane(&Point3::new(0.2, 0.4, 0.9), &normal, 0.25);
        assert!((on_plane - Point3::new(0.2, 0.4, 0.25)).norm() < 1e-12);
    }

    #[test]
    fn fractional_distance_respects_periodicity() {
        let a = Point3::new(0.95, 0.0, 0.0);
        let b = Point3::new(0.05, 0.0, 0.0);
        assert!((fractional_distance_squared(&a, &b, true) - 0.01).abs() < 1e-12);
        assert!((fractional_distance_squared(&a, &b, false) - 0.81).abs() < 1e-12);
    }

    #[test]
    fn finite_point_detection() {
        assert!(is_finite_point(&Point3::new(0.0, 1.0, 2.0)));
        assert!(!is_finite_point(&Point3::new(f64::NAN, 1.0, 2.0)));
    }
}
