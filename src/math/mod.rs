pub mod intersect_3d;
pub mod triangle;

/// 2D point type, used for barycentric coordinates on walls.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Tolerance on barycentric coordinates when deciding whether a hit
/// lies on a wall edge or vertex.
pub const BARYCENTRIC_TOLERANCE: f64 = 1e-9;
