//! Planar geometry primitives
//!
//! Points live on the `x`/`z` plane of the map. Derived quantities such as
//! circumcenters and Voronoi vertices are plain [`DVec2`] values where `y`
//! holds the `z` coordinate.

use glam::DVec2;
use std::cmp::Ordering;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Determinant magnitude below which a triangle is treated as degenerate
pub const DEGENERATE_EPSILON: f64 = 1e-10;

/// A site or triangle vertex on the map plane
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical (depth) coordinate
    pub z: f64,
    /// Set for artificial points that do not represent real terrain
    pub is_boundary: bool,
}

impl Point {
    /// Create a regular site
    pub const fn new(x: f64, z: f64) -> Self {
        Self {
            x,
            z,
            is_boundary: false,
        }
    }

    /// Create an artificial boundary point
    pub const fn boundary(x: f64, z: f64) -> Self {
        Self {
            x,
            z,
            is_boundary: true,
        }
    }

    /// Convert to a glam vector (`y` holds `z`)
    #[inline]
    pub fn to_vec(self) -> DVec2 {
        DVec2::new(self.x, self.z)
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        self.to_vec().distance(other.to_vec())
    }

    /// Angle of the vector from `self` to `other`, in radians
    #[inline]
    pub fn angle_to(&self, other: &Point) -> f64 {
        (other.z - self.z).atan2(other.x - self.x)
    }

    /// True when both coordinates differ by less than `tolerance`
    #[inline]
    pub fn approx_eq(&self, other: &Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() < tolerance && (self.z - other.z).abs() < tolerance
    }

    /// True when the point lies inside the closed square `[0, size]²`
    #[inline]
    pub fn within_square(&self, size: f64) -> bool {
        (0.0..=size).contains(&self.x) && (0.0..=size).contains(&self.z)
    }
}

impl From<DVec2> for Point {
    fn from(value: DVec2) -> Self {
        Point::new(value.x, value.y)
    }
}

/// Lexicographic ordering by `x`, then `z`
pub fn compare_points(a: &Point, b: &Point) -> Ordering {
    a.x.partial_cmp(&b.x)
        .unwrap_or(Ordering::Equal)
        .then(a.z.partial_cmp(&b.z).unwrap_or(Ordering::Equal))
}

/// An undirected Delaunay edge between two sites
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Index of the first site
    pub a: usize,
    /// Index of the second site
    pub b: usize,
    /// Position of the first site
    pub start: Point,
    /// Position of the second site
    pub end: Point,
}

impl Edge {
    /// Edge length
    #[inline]
    pub fn length(&self) -> f64 {
        self.start.distance(&self.end)
    }

    /// Point halfway along the edge
    #[inline]
    pub fn midpoint(&self) -> DVec2 {
        (self.start.to_vec() + self.end.to_vec()) * 0.5
    }
}

/// Directed edge of one triangle
///
/// Two triangles sharing an edge hold opposite half-edges that point at each
/// other through `twin`. A half-edge without a twin lies on the convex hull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfEdge {
    /// Site the half-edge starts at
    pub origin: usize,
    /// Site the half-edge ends at
    pub target: usize,
    /// Triangle owning this half-edge
    pub triangle: usize,
    /// Index of the opposite half-edge, if any
    pub twin: Option<usize>,
}

impl HalfEdge {
    /// True when no other triangle shares this edge
    #[inline]
    pub fn is_hull(&self) -> bool {
        self.twin.is_none()
    }
}

/// A finite Voronoi edge joining two circumcenters
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoronoiEdge {
    /// First circumcenter
    pub start: DVec2,
    /// Second circumcenter
    pub end: DVec2,
    /// The two cells separated by this edge
    pub cells: (usize, usize),
}

impl VoronoiEdge {
    /// Edge length
    #[inline]
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// Point halfway along the edge
    #[inline]
    pub fn midpoint(&self) -> DVec2 {
        (self.start + self.end) * 0.5
    }
}

/// A Delaunay triangle with the indices of its source sites
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Corner positions
    pub points: [Point; 3],
    /// Corner indices into the input point list
    pub indices: [usize; 3],
}

impl Triangle {
    /// Create a triangle, reordering corners counter-clockwise
    pub fn new(points: [Point; 3], indices: [usize; 3]) -> Self {
        let triangle = Self { points, indices };
        if triangle.orientation() < 0.0 {
            Self {
                points: [points[0], points[2], points[1]],
                indices: [indices[0], indices[2], indices[1]],
            }
        } else {
            triangle
        }
    }

    /// Twice the signed area; positive for counter-clockwise corners
    #[inline]
    pub fn orientation(&self) -> f64 {
        let [a, b, c] = self.points;
        (b.x - a.x) * (c.z - a.z) - (b.z - a.z) * (c.x - a.x)
    }

    /// Unsigned area
    #[inline]
    pub fn area(&self) -> f64 {
        self.orientation().abs() * 0.5
    }

    /// True when the triangle references site `index`
    #[inline]
    pub fn has_vertex(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    /// Number of site indices shared with another triangle
    pub fn shared_vertex_count(&self, other: &Triangle) -> usize {
        self.indices
            .iter()
            .filter(|index| other.indices.contains(index))
            .count()
    }

    /// Center of the circle through all three corners
    ///
    /// Returns `None` when the corners are (nearly) collinear.
    pub fn circumcenter(&self) -> Option<DVec2> {
        let [a, b, c] = self.points;
        let d = 2.0 * (a.x * (b.z - c.z) + b.x * (c.z - a.z) + c.x * (a.z - b.z));
        if d.abs() < DEGENERATE_EPSILON {
            return None;
        }

        let a2 = a.x * a.x + a.z * a.z;
        let b2 = b.x * b.x + b.z * b.z;
        let c2 = c.x * c.x + c.z * c.z;

        let ux = (a2 * (b.z - c.z) + b2 * (c.z - a.z) + c2 * (a.z - b.z)) / d;
        let uz = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
        Some(DVec2::new(ux, uz))
    }

    /// Strict in-circle test
    ///
    /// Uses the standard determinant on a counter-clockwise triangle and
    /// reports containment only when it is strictly positive. Points on the
    /// circle are outside. Near-cocircular inputs are sensitive to rounding.
    pub fn circumcircle_contains(&self, point: &Point) -> bool {
        let [a, b, c] = self.points;
        let ax = a.x - point.x;
        let az = a.z - point.z;
        let bx = b.x - point.x;
        let bz = b.z - point.z;
        let cx = c.x - point.x;
        let cz = c.z - point.z;

        let det = (ax * ax + az * az) * (bx * cz - cx * bz)
            - (bx * bx + bz * bz) * (ax * cz - cx * az)
            + (cx * cx + cz * cz) * (ax * bz - bx * az);

        det > 0.0
    }

    /// The three undirected edges as index pairs, in corner order
    pub fn edges(&self) -> [(usize, usize); 3] {
        let [i, j, k] = self.indices;
        [(i, j), (j, k), (k, i)]
    }
}

/// Sort vertices counter-clockwise around `center`
///
/// A single-key stable sort on `atan2`; vertices at equal angles keep their
/// input order.
pub fn sort_counterclockwise(center: DVec2, vertices: &mut [DVec2]) {
    vertices.sort_by(|a, b| {
        let angle_a = (a.y - center.y).atan2(a.x - center.x);
        let angle_b = (b.y - center.y).atan2(b.x - center.x);
        angle_a.partial_cmp(&angle_b).unwrap_or(Ordering::Equal)
    });
}

/// Arithmetic mean of a set of positions
///
/// Returns `None` for an empty slice.
pub fn centroid(points: &[DVec2]) -> Option<DVec2> {
    if points.is_empty() {
        return None;
    }
    let sum: DVec2 = points.iter().copied().sum();
    Some(sum / points.len() as f64)
}
