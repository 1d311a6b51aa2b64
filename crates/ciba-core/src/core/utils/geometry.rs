use nalgebra::{Matrix3, Point3, Unit, Vector3};

/// Distance from a ring centroid to its shielding probe points, in Angstroms.
pub const PROBE_OFFSET: f64 = 1.0;

pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

/// Fits the plane `z = ax + by + c` to the points by least squares and
/// returns its unit normal.
///
/// Returns `None` for fewer than three points or when the normal equations
/// are singular (collinear points, or a plane parallel to the z axis).
pub fn best_fit_plane_normal(points: &[Point3<f64>]) -> Option<Unit<Vector3<f64>>> {
    if points.len() < 3 {
        return None;
    }

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    let (mut sx, mut sy) = (0.0, 0.0);
    let (mut sxz, mut syz, mut sz) = (0.0, 0.0, 0.0);
    for p in points {
        sxx += p.x * p.x;
        sxy += p.x * p.y;
        syy += p.y * p.y;
        sx += p.x;
        sy += p.y;
        sxz += p.x * p.z;
        syz += p.y * p.z;
        sz += p.z;
    }
    let n = points.len() as f64;

    let normal_eqs = Matrix3::new(sxx, sxy, sx, sxy, syy, sy, sx, sy, n);
    let rhs = Vector3::new(sxz, syz, sz);
    let coeffs = normal_eqs.lu().solve(&rhs)?;

    let normal = Vector3::new(1.0, 0.0, coeffs.x).cross(&Vector3::new(0.0, 1.0, coeffs.y));
    if normal.norm_squared() == 0.0 {
        return None;
    }
    Some(Unit::new_normalize(normal))
}

/// Probe points at `PROBE_OFFSET` above and below the best-fit plane of a
/// ring, through its centroid.
pub fn ring_probe_points(ring: &[Point3<f64>]) -> Option<(Point3<f64>, Point3<f64>)> {
    let centre = centroid(ring)?;
    let normal = best_fit_plane_normal(ring)?;
    let offset = normal.into_inner() * PROBE_OFFSET;
    Some((centre + offset, centre - offset))
}
