use super::triangle::{barycentric, segment_segment_distance_sq, triangle_cross};
use super::{Point3, Vector3, BARYCENTRIC_TOLERANCE, TOLERANCE};

/// Outcome of moving a point along a displacement against a triangular wall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentHit {
    /// The segment does not touch the wall.
    Miss,
    /// The segment crosses the wall's interior.
    Hit {
        /// Fraction of the displacement travelled before the hit.
        t: f64,
        /// The crossing point.
        point: Point3,
        /// `true` when the segment approaches from the side the normal points to.
        front: bool,
    },
    /// The segment touches the wall degenerately: it starts or ends on the
    /// wall, runs inside the wall's plane, or grazes an edge or vertex.
    /// The caller has to perturb its input and try again.
    Redo,
}

/// Intersects the segment `origin .. origin + displacement` with a triangle.
#[must_use]
pub fn segment_triangle_intersect(
    origin: &Point3,
    displacement: &Vector3,
    tri: &[Point3; 3],
) -> SegmentHit {
    let cross = triangle_cross(tri);
    let cross_len = cross.norm();
    if cross_len < TOLERANCE * TOLERANCE {
        return SegmentHit::Miss;
    }
    let normal = cross / cross_len;

    let start_dist = normal.dot(&(origin - tri[0]));
    let approach = normal.dot(displacement);

    if approach.abs() < TOLERANCE {
        // Parallel to the wall plane.
        if start_dist.abs() >= TOLERANCE {
            return SegmentHit::Miss;
        }
        return if segment_touches_triangle_in_plane(origin, &(origin + displacement), tri) {
            SegmentHit::Redo
        } else {
            SegmentHit::Miss
        };
    }

    let t = -start_dist / approach;
    let len = displacement.norm();
    let t_tol = if len > 0.0 { TOLERANCE / len } else { TOLERANCE };
    if t < -t_tol || t > 1.0 + t_tol {
        return SegmentHit::Miss;
    }

    let point = origin + displacement * t.clamp(0.0, 1.0);
    let Some((u, v)) = barycentric(&point, tri) else {
        return SegmentHit::Miss;
    };
    let w = 1.0 - u - v;
    if u < -BARYCENTRIC_TOLERANCE || v < -BARYCENTRIC_TOLERANCE || w < -BARYCENTRIC_TOLERANCE {
        return SegmentHit::Miss;
    }

    let on_edge =
        u < BARYCENTRIC_TOLERANCE || v < BARYCENTRIC_TOLERANCE || w < BARYCENTRIC_TOLERANCE;
    let at_endpoint = t < t_tol || t > 1.0 - t_tol;
    if on_edge || at_endpoint {
        return SegmentHit::Redo;
    }

    SegmentHit::Hit {
        t,
        point,
        front: approach < 0.0,
    }
}

/// In-plane test used for segments parallel to and lying on a wall.
fn segment_touches_triangle_in_plane(a: &Point3, b: &Point3, tri: &[Point3; 3]) -> bool {
    let inside = |q: &Point3| {
        barycentric(q, tri).is_some_and(|(u, v)| {
            u >= -BARYCENTRIC_TOLERANCE
                && v >= -BARYCENTRIC_TOLERANCE
                && 1.0 - u - v >= -BARYCENTRIC_TOLERANCE
        })
    };
    if inside(a) || inside(b) {
        return true;
    }
    (0..3).any(|i| {
        segment_segment_distance_sq(a, b, &tri[i], &tri[(i + 1) % 3]) < TOLERANCE * TOLERANCE
    })
}

/// Separating-axis test between a triangle and an axis-aligned box.
///
/// Touching counts as overlapping.
#[must_use]
pub fn triangle_overlaps_box(tri: &[Point3; 3], box_min: &Point3, box_max: &Point3) -> bool {
    let center = nalgebra::center(box_min, box_max);
    let half = (box_max - box_min) * 0.5;
    let verts = [tri[0] - center, tri[1] - center, tri[2] - center];

    // Box face normals.
    for axis in 0..3 {
        let lo = verts[0][axis].min(verts[1][axis]).min(verts[2][axis]);
        let hi = verts[0][axis].max(verts[1][axis]).max(verts[2][axis]);
        if lo > half[axis] + TOLERANCE || hi < -half[axis] - TOLERANCE {
            return false;
        }
    }

    let edges = [verts[1] - verts[0], verts[2] - verts[1], verts[0] - verts[2]];
    for edge in &edges {
        for unit in [Vector3::x(), Vector3::y(), Vector3::z()] {
            if !overlaps_on_axis(&unit.cross(edge), &verts, &half) {
                return false;
            }
        }
    }

    overlaps_on_axis(&edges[0].cross(&edges[1]), &verts, &half)
}

fn overlaps_on_axis(axis: &Vector3, verts: &[Vector3; 3], half: &Vector3) -> bool {
    if axis.norm_squared() < TOLERANCE * TOLERANCE {
        return true;
    }
    let p0 = axis.dot(&verts[0]);
    let p1 = axis.dot(&verts[1]);
    let p2 = axis.dot(&verts[2]);
    let radius = half.x * axis.x.abs() + half.y * axis.y.abs() + half.z * axis.z.abs();
    let slack = TOLERANCE * axis.norm();
    p0.min(p1).min(p2) <= radius + slack && p0.max(p1).max(p2) >= -radius - slack
}
