//! Delaunay triangulation via Bowyer-Watson
//!
//! Points are inserted one at a time, in input order, into a triangulation
//! seeded with a super-triangle that encloses the whole input. Each insertion
//! removes the triangles whose circumcircle contains the new point and fills
//! the resulting cavity with a fan around it. Insertion order matters: for
//! near-cocircular inputs it decides which of the valid triangulations wins.

use glam::DVec2;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument, trace};

use super::geometry::{Edge, HalfEdge, Point, Triangle};

/// Points closer than this on both axes are treated as duplicates
pub const DUPLICATE_TOLERANCE: f64 = 1e-5;

/// Super-triangle size as a multiple of the input bounding box
const SUPER_TRIANGLE_MARGIN: f64 = 20.0;

/// Result of a Delaunay triangulation
#[derive(Debug, Clone, Default)]
pub struct Triangulation {
    /// The input points, indexable by the triangle indices
    pub points: Vec<Point>,
    /// Final triangles (super-triangle removed), counter-clockwise
    pub triangles: Vec<Triangle>,
    /// Deduplicated undirected edges in first-seen order
    pub edges: Vec<Edge>,
    /// One circumcenter per triangle; `None` for degenerate triangles
    pub circumcenters: Vec<Option<DVec2>>,
    /// Input indices skipped as duplicates of an earlier point
    pub duplicates: Vec<usize>,
}

impl Triangulation {
    /// Number of triangles
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// True when no triangle survived
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Triangle corner indices, for export
    pub fn triangle_indices(&self) -> Vec<[usize; 3]> {
        self.triangles.iter().map(|t| t.indices).collect()
    }

    /// Build the half-edge list, three per triangle, with twins linked
    pub fn half_edges(&self) -> Vec<HalfEdge> {
        let mut half_edges: Vec<HalfEdge> = Vec::with_capacity(self.triangles.len() * 3);
        let mut by_endpoints: HashMap<(usize, usize), usize> = HashMap::new();

        for (tri_idx, triangle) in self.triangles.iter().enumerate() {
            for (origin, target) in triangle.edges() {
                let index = half_edges.len();
                let twin = by_endpoints.get(&(target, origin)).copied();
                if let Some(other) = twin.and_then(|t| half_edges.get_mut(t)) {
                    other.twin = Some(index);
                }
                by_endpoints.insert((origin, target), index);
                half_edges.push(HalfEdge {
                    origin,
                    target,
                    triangle: tri_idx,
                    twin,
                });
            }
        }

        half_edges
    }

    /// Site pairs joined by a convex-hull edge
    pub fn hull_edges(&self) -> Vec<(usize, usize)> {
        self.half_edges()
            .into_iter()
            .filter(HalfEdge::is_hull)
            .map(|h| (h.origin, h.target))
            .collect()
    }
}

/// Triangulate a point set
///
/// Fewer than three points yield an empty triangulation. Points within
/// [`DUPLICATE_TOLERANCE`] of an already inserted point are skipped and
/// reported in [`Triangulation::duplicates`].
///
/// # Example
///
/// ```rust
/// use voronoi_terrain::generation::{triangulate, Point};
///
/// let result = triangulate(&[
///     Point::new(0.0, 0.0),
///     Point::new(1.0, 0.0),
///     Point::new(0.0, 1.0),
/// ]);
/// assert_eq!(result.triangles.len(), 1);
/// assert_eq!(result.edges.len(), 3);
/// ```
#[instrument(skip_all, fields(points = points.len()))]
pub fn triangulate(points: &[Point]) -> Triangulation {
    let mut result = Triangulation {
        points: points.to_vec(),
        ..Default::default()
    };
    if points.len() < 3 {
        debug!("fewer than three points, nothing to triangulate");
        return result;
    }

    let n = points.len();
    let (super_a, super_b, super_c) = super_triangle(points);
    // Super vertices live after the input: indices n, n + 1, n + 2.
    let mut all_points = points.to_vec();
    all_points.extend([super_a, super_b, super_c]);

    let mut triangles = vec![Triangle::new([super_a, super_b, super_c], [n, n + 1, n + 2])];
    let mut inserted: Vec<Point> = Vec::with_capacity(n);

    for (index, point) in points.iter().enumerate() {
        if inserted
            .iter()
            .any(|p| p.approx_eq(point, DUPLICATE_TOLERANCE))
        {
            trace!(index, "skipping duplicate point");
            result.duplicates.push(index);
            continue;
        }
        inserted.push(*point);

        let (bad, good): (Vec<Triangle>, Vec<Triangle>) = triangles
            .into_iter()
            .partition(|t| t.circumcircle_contains(point));
        triangles = good;

        for (i, j) in cavity_boundary(&bad) {
            let (Some(&pi), Some(&pj)) = (all_points.get(i), all_points.get(j)) else {
                continue;
            };
            triangles.push(Triangle::new([pi, pj, *point], [i, j, index]));
        }
    }

    triangles.retain(|t| t.indices.iter().all(|&i| i < n));

    result.circumcenters = triangles.iter().map(Triangle::circumcenter).collect();
    result.edges = unique_edges(&triangles, points);
    result.triangles = triangles;

    debug!(
        triangles = result.triangles.len(),
        edges = result.edges.len(),
        duplicates = result.duplicates.len(),
        "triangulation complete"
    );
    result
}

/// Super-triangle enclosing the bounding box with a wide margin
fn super_triangle(points: &[Point]) -> (Point, Point, Point) {
    let mut min = DVec2::splat(f64::INFINITY);
    let mut max = DVec2::splat(f64::NEG_INFINITY);
    for p in points {
        min = min.min(p.to_vec());
        max = max.max(p.to_vec());
    }

    let delta = (max - min).max_element().max(1.0) * SUPER_TRIANGLE_MARGIN;
    let mid = (min + max) * 0.5;

    (
        Point::boundary(mid.x - delta, mid.y - delta),
        Point::boundary(mid.x, mid.y + delta),
        Point::boundary(mid.x + delta, mid.y - delta),
    )
}

/// Edges of the bad triangles that no other bad triangle shares
///
/// Returned in the order they appear in `bad`, so retriangulation is
/// deterministic.
fn cavity_boundary(bad: &[Triangle]) -> Vec<(usize, usize)> {
    let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
    for triangle in bad {
        for (i, j) in triangle.edges() {
            *counts.entry(undirected(i, j)).or_insert(0) += 1;
        }
    }

    bad.iter()
        .flat_map(Triangle::edges)
        .filter(|&(i, j)| counts.get(&undirected(i, j)).copied() == Some(1))
        .collect()
}

fn unique_edges(triangles: &[Triangle], points: &[Point]) -> Vec<Edge> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    for triangle in triangles {
        for (i, j) in triangle.edges() {
            let (a, b) = undirected(i, j);
            if !seen.insert((a, b)) {
                continue;
            }
            if let (Some(&start), Some(&end)) = (points.get(a), points.get(b)) {
                edges.push(Edge { a, b, start, end });
            }
        }
    }
    edges
}

#[inline]
fn undirected(i: usize, j: usize) -> (usize, usize) {
    if i < j {
        (i, j)
    } else {
        (j, i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::Lcg;
    use crate::generation::points::generate_sites;

    #[test]
    fn test_single_triangle() {
        let result = triangulate(&[
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
        ]);

        assert_eq!(result.triangles.len(), 1);
        assert_eq!(result.edges.len(), 3);
        assert_eq!(result.circumcenters.len(), 1);

        let center = result.circumcenters[0].unwrap();
        assert!((center.x - 0.5).abs() < 1e-9);
        assert!((center.y - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_too_few_points() {
        assert!(triangulate(&[]).is_empty());
        assert!(triangulate(&[Point::new(0.0, 0.0), Point::new(1.0, 1.0)]).is_empty());
    }

    #[test]
    fn test_duplicates_tolerated() {
        let result = triangulate(&[
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(0.000001, 0.0),
        ]);
        assert_eq!(result.duplicates, vec![3]);
        assert_eq!(result.triangles.len(), 1);
    }

    #[test]
    fn test_square_gives_two_triangles() {
        let result = triangulate(&[
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 11.0),
        ]);
        assert_eq!(result.triangles.len(), 2);
        assert_eq!(result.edges.len(), 5);
        assert_eq!(result.hull_edges().len(), 4);
    }

    #[test]
    fn test_delaunay_property() {
        let mut rng = Lcg::new(777);
        let points = generate_sites(60, 600.0, &mut rng);
        let result = triangulate(&points);
        assert!(!result.is_empty());

        for triangle in &result.triangles {
            let center = triangle.circumcenter().unwrap();
            let radius = center.distance(triangle.points[0].to_vec());
            for (index, point) in points.iter().enumerate() {
                if triangle.has_vertex(index) {
                    continue;
                }
                let distance = center.distance(point.to_vec());
                assert!(
                    distance >= radius - 1e-6,
                    "point {} lies inside a circumcircle",
                    index
                );
            }
        }
    }

    #[test]
    fn test_half_edge_twins() {
        let mut rng = Lcg::new(5);
        let points = generate_sites(30, 100.0, &mut rng);
        let result = triangulate(&points);
        let half_edges = result.half_edges();

        assert_eq!(half_edges.len(), result.triangles.len() * 3);
        for (index, half_edge) in half_edges.iter().enumerate() {
            if let Some(twin) = half_edge.twin {
                let other = &half_edges[twin];
                assert_eq!(other.twin, Some(index));
                assert_eq!(other.origin, half_edge.target);
                assert_eq!(other.target, half_edge.origin);
            }
        }

        let interior = half_edges.iter().filter(|h| !h.is_hull()).count();
        let hull = result.hull_edges().len();
        assert_eq!(interior / 2 + hull, result.edges.len());
    }

    #[test]
    fn test_determinism() {
        let mut rng_a = Lcg::new(12345);
        let mut rng_b = Lcg::new(12345);
        let a = triangulate(&generate_sites(50, 600.0, &mut rng_a));
        let b = triangulate(&generate_sites(50, 600.0, &mut rng_b));
        assert_eq!(a.triangle_indices(), b.triangle_indices());
    }
}
