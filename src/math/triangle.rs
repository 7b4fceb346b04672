use super::{Point3, Vector3, TOLERANCE};

/// Unnormalized normal `(b - a) x (c - a)` of a triangle.
#[must_use]
pub fn triangle_cross(tri: &[Point3; 3]) -> Vector3 {
    (tri[1] - tri[0]).cross(&(tri[2] - tri[0]))
}

/// Area of a triangle.
#[must_use]
pub fn triangle_area(tri: &[Point3; 3]) -> f64 {
    0.5 * triangle_cross(tri).norm()
}

/// Barycentric coordinates of the projection of `p` onto the plane of `tri`.
///
/// Returns `(u, v)` where `u` weights `tri[1]`, `v` weights `tri[2]` and
/// `1 - u - v` weights `tri[0]`. Returns `None` for a degenerate triangle.
#[must_use]
pub fn barycentric(p: &Point3, tri: &[Point3; 3]) -> Option<(f64, f64)> {
    let e0 = tri[1] - tri[0];
    let e1 = tri[2] - tri[0];
    let d = p - tri[0];

    let d00 = e0.dot(&e0);
    let d01 = e0.dot(&e1);
    let d11 = e1.dot(&e1);
    let d20 = d.dot(&e0);
    let d21 = d.dot(&e1);

    let denom = d00 * d11 - d01 * d01;
    if denom <= f64::EPSILON * d00 * d11 {
        return None;
    }
    let u = (d11 * d20 - d01 * d21) / denom;
    let v = (d00 * d21 - d01 * d20) / denom;
    Some((u, v))
}

/// Point of `tri` with barycentric coordinates `(u, v)`, see [`barycentric`].
#[must_use]
pub fn point_from_barycentric(tri: &[Point3; 3], u: f64, v: f64) -> Point3 {
    tri[0] + (tri[1] - tri[0]) * u + (tri[2] - tri[0]) * v
}

/// Closest point on a triangle to `p`.
///
/// Walks the Voronoi regions of the triangle's vertices and edges before
/// falling back to the projection onto the face.
#[must_use]
pub fn closest_point_on_triangle(p: &Point3, tri: &[Point3; 3]) -> Point3 {
    let [a, b, c] = *tri;
    let ab = b - a;
    let ac = c - a;

    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// Squared distance between the segments `p1 q1` and `p2 q2`.
#[must_use]
pub fn segment_segment_distance_sq(p1: &Point3, q1: &Point3, p2: &Point3, q2: &Point3) -> f64 {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.dot(&d1);
    let e = d2.dot(&d2);
    let f = d2.dot(&r);
    let eps = TOLERANCE * TOLERANCE;

    if a <= eps && e <= eps {
        return r.norm_squared();
    }

    let (s, t) = if a <= eps {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= eps {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let s = if denom.abs() > f64::EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let t = (b * s + f) / e;
            if t < 0.0 {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else if t > 1.0 {
                (((b - c) / a).clamp(0.0, 1.0), 1.0)
            } else {
                (s, t)
            }
        }
    };

    let c1 = p1 + d1 * s;
    let c2 = p2 + d2 * t;
    (c1 - c2).norm_squared()
}

/// Orientation of `d` relative to the plane through `a`, `b`, `c`.
fn orient3d(a: &Point3, b: &Point3, c: &Point3, d: &Point3) -> f64 {
    (b - a).dot(&(c - a).cross(&(d - a)))
}

/// Whether `p` lies inside or on the boundary of a tetrahedron.
///
/// Flat tetrahedra contain nothing.
#[must_use]
pub fn point_in_tetrahedron(p: &Point3, tet: &[Point3; 4]) -> bool {
    let [a, b, c, d] = tet;
    let total = orient3d(a, b, c, d);
    if total.abs() < TOLERANCE * TOLERANCE * TOLERANCE {
        return false;
    }
    let sign = total.signum();
    orient3d(p, b, c, d) * sign >= 0.0
        && orient3d(a, p, c, d) * sign >= 0.0
        && orient3d(a, b, p, d) * sign >= 0.0
        && orient3d(a, b, c, p) * sign >= 0.0
}

/// Whether `p` lies in the volume swept by a triangle whose vertices move
/// from `old` to `new`.
///
/// The swept prism is split into three tetrahedra.
#[must_use]
pub fn point_in_swept_prism(p: &Point3, old: &[Point3; 3], new: &[Point3; 3]) -> bool {
    let [a, b, c] = *old;
    let [a2, b2, c2] = *new;
    point_in_tetrahedron(p, &[a, b, c, a2])
        || point_in_tetrahedron(p, &[b, c, a2, b2])
        || point_in_tetrahedron(p, &[c, a2, b2, c2])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn unit_tri() -> [Point3; 3] {
        [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)]
    }

    #[test]
    fn area_of_right_triangle() {
        assert_relative_eq!(triangle_area(&unit_tri()), 0.5);
    }

    #[test]
    fn barycentric_round_trip_through_point() {
        let tri = unit_tri();
        let (u, v) = barycentric(&p(0.25, 0.5, 3.0), &tri).unwrap();
        assert_relative_eq!(u, 0.25);
        assert_relative_eq!(v, 0.5);
        let back = point_from_barycentric(&tri, u, v);
        assert_relative_eq!(back, p(0.25, 0.5, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn degenerate_triangle_has_no_barycentric() {
        let tri = [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(2.0, 0.0, 0.0)];
        assert!(barycentric(&p(0.5, 0.5, 0.0), &tri).is_none());
    }

    #[test]
    fn closest_point_projects_onto_face() {
        let q = closest_point_on_triangle(&p(0.2, 0.2, 5.0), &unit_tri());
        assert_relative_eq!(q, p(0.2, 0.2, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn closest_point_clamps_to_vertex_and_edge() {
        let tri = unit_tri();
        assert_relative_eq!(closest_point_on_triangle(&p(-1.0, -1.0, 0.0), &tri), tri[0]);
        assert_relative_eq!(
            closest_point_on_triangle(&p(0.5, -2.0, 1.0), &tri),
            p(0.5, 0.0, 0.0)
        );
        assert_relative_eq!(
            closest_point_on_triangle(&p(1.0, 1.0, 0.0), &tri),
            p(0.5, 0.5, 0.0)
        );
    }

    #[test]
    fn crossing_segments_have_zero_distance() {
        let d = segment_segment_distance_sq(
            &p(-1.0, 0.0, 0.0),
            &p(1.0, 0.0, 0.0),
            &p(0.0, -1.0, 0.0),
            &p(0.0, 1.0, 0.0),
        );
        assert!(d < TOLERANCE);
    }

    #[test]
    fn parallel_segments_distance() {
        let d = segment_segment_distance_sq(
            &p(0.0, 0.0, 0.0),
            &p(1.0, 0.0, 0.0),
            &p(0.0, 2.0, 0.0),
            &p(1.0, 2.0, 0.0),
        );
        assert_relative_eq!(d, 4.0);
    }

    #[test]
    fn tetrahedron_containment() {
        let tet = [
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(0.0, 0.0, 1.0),
        ];
        assert!(point_in_tetrahedron(&p(0.1, 0.1, 0.1), &tet));
        assert!(!point_in_tetrahedron(&p(1.0, 1.0, 1.0), &tet));
    }

    #[test]
    fn swept_prism_contains_points_between_positions() {
        let old = unit_tri();
        let new = old.map(|q| q + Vector3::new(0.0, 0.0, 1.0));
        assert!(point_in_swept_prism(&p(0.2, 0.2, 0.5), &old, &new));
        assert!(!point_in_swept_prism(&p(0.2, 0.2, 1.5), &old, &new));
        assert!(!point_in_swept_prism(&p(0.8, 0.8, 0.5), &old, &new));
    }
}
