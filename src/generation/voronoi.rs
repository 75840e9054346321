//! Voronoi cell construction from Delaunay triangulation
//!
//! Constructs Voronoi cells by collecting the circumcenters of the triangles
//! around each site and finding neighbor relationships between sites.

use glam::DVec2;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, instrument};

use super::delaunay::Triangulation;
use super::geometry::{sort_counterclockwise, Point, VoronoiEdge};

/// Type alias for vertex-triangle adjacency map
type VertexTriangleMap = HashMap<usize, Vec<usize>>;

/// A Voronoi cell without terrain annotations (geometry only)
///
/// This is an intermediate representation used during generation.
/// Metadata is attached later when the cell enters the [`CellGraph`](crate::CellGraph).
#[derive(Debug, Clone)]
pub struct RawCell {
    /// Unique cell identifier, equal to the site index
    pub id: usize,
    /// The site this cell surrounds
    pub site: Point,
    /// IDs of neighboring cells, sorted
    pub neighbors: Vec<usize>,
    /// Circumcenters bounding the cell (ordered counter-clockwise)
    pub vertices: Vec<DVec2>,
    /// Any vertex lies outside the map square
    pub is_edge: bool,
    /// The site sits on the convex hull of all sites
    pub on_hull: bool,
}

/// Cells plus the finite Voronoi edges between them
#[derive(Debug, Clone, Default)]
pub struct VoronoiDiagram {
    /// One cell per input site
    pub cells: Vec<RawCell>,
    /// Voronoi edges between pairs of triangles sharing a Delaunay edge
    pub edges: Vec<VoronoiEdge>,
}

/// Generate Voronoi cells from a triangulation
///
/// Every input site gets a cell, including duplicates (which end up with no
/// vertices and no neighbors).
///
/// Adjacency comes from every pair of triangles sharing exactly two sites,
/// which is quadratic in the triangle count. Sites joined by a convex-hull
/// edge are neighbors as well, so corner sites whose triangles all touch
/// the hull are never isolated.
#[instrument(skip_all, fields(sites = triangulation.points.len(), grid_size = grid_size))]
pub fn build_diagram(triangulation: &Triangulation, grid_size: f64) -> VoronoiDiagram {
    let vertex_triangle_map = build_vertex_triangle_map(triangulation);
    let mut neighbor_sets: Vec<BTreeSet<usize>> =
        vec![BTreeSet::new(); triangulation.points.len()];
    let mut edges = Vec::new();

    let triangles = &triangulation.triangles;
    for (i, first) in triangles.iter().enumerate() {
        for (j, second) in triangles.iter().enumerate().skip(i + 1) {
            if first.shared_vertex_count(second) != 2 {
                continue;
            }

            let shared: Vec<usize> = first
                .indices
                .iter()
                .copied()
                .filter(|index| second.has_vertex(*index))
                .collect();
            let (a, b) = match shared.as_slice() {
                [a, b] => (*a, *b),
                _ => continue,
            };
            link(&mut neighbor_sets, a, b);

            let centers = (
                triangulation.circumcenters.get(i).copied().flatten(),
                triangulation.circumcenters.get(j).copied().flatten(),
            );
            if let (Some(start), Some(end)) = centers {
                edges.push(VoronoiEdge {
                    start,
                    end,
                    cells: (a.min(b), a.max(b)),
                });
            }
        }
    }

    let mut hull_sites = BTreeSet::new();
    for (a, b) in triangulation.hull_edges() {
        link(&mut neighbor_sets, a, b);
        hull_sites.insert(a);
        hull_sites.insert(b);
    }

    let cells: Vec<RawCell> = triangulation
        .points
        .iter()
        .enumerate()
        .map(|(id, site)| {
            let mut vertices: Vec<DVec2> = vertex_triangle_map
                .get(&id)
                .map(|tris| {
                    tris.iter()
                        .filter_map(|&t| triangulation.circumcenters.get(t).copied().flatten())
                        .collect()
                })
                .unwrap_or_default();
            sort_counterclockwise(site.to_vec(), &mut vertices);

            let is_edge = vertices.iter().any(|v| !Point::from(*v).within_square(grid_size));
            let neighbors = neighbor_sets
                .get(id)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default();

            RawCell {
                id,
                site: *site,
                neighbors,
                vertices,
                is_edge,
                on_hull: hull_sites.contains(&id),
            }
        })
        .collect();

    debug!(
        cells = cells.len(),
        voronoi_edges = edges.len(),
        hull_sites = hull_sites.len(),
        "voronoi diagram built"
    );

    VoronoiDiagram { cells, edges }
}

/// Build map from site index to all triangles that include it
fn build_vertex_triangle_map(triangulation: &Triangulation) -> VertexTriangleMap {
    let mut map: VertexTriangleMap = HashMap::new();

    for (tri_idx, triangle) in triangulation.triangles.iter().enumerate() {
        for &vertex_idx in triangle.indices.iter() {
            map.entry(vertex_idx).or_default().push(tri_idx);
        }
    }

    map
}

fn link(neighbor_sets: &mut [BTreeSet<usize>], a: usize, b: usize) {
    if let Some(set) = neighbor_sets.get_mut(a) {
        set.insert(b);
    }
    if let Some(set) = neighbor_sets.get_mut(b) {
        set.insert(a);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::delaunay::triangulate;
    use crate::generation::points::generate_sites;
    use crate::random::Lcg;

    #[test]
    fn test_build_diagram() {
        let points = generate_sites(100, 600.0, &mut Lcg::new(42));
        let diagram = build_diagram(&triangulate(&points), 600.0);

        assert_eq!(diagram.cells.len(), 100);
        assert!(!diagram.edges.is_empty());

        for cell in &diagram.cells {
            assert!(!cell.vertices.is_empty(), "Cell should have vertices");
            assert!(!cell.neighbors.is_empty(), "Cell should have neighbors");
            assert!(!cell.neighbors.contains(&cell.id));
        }
    }

    #[test]
    fn test_neighbor_symmetry() {
        let points = generate_sites(50, 600.0, &mut Lcg::new(12345));
        let diagram = build_diagram(&triangulate(&points), 600.0);

        // If A is a neighbor of B, then B should be a neighbor of A
        for cell in &diagram.cells {
            for &neighbor_id in &cell.neighbors {
                let neighbor = &diagram.cells[neighbor_id];
                assert!(
                    neighbor.neighbors.contains(&cell.id),
                    "Neighbor relationship should be symmetric"
                );
            }
        }
    }

    #[test]
    fn test_vertices_counterclockwise() {
        let points = generate_sites(40, 600.0, &mut Lcg::new(3));
        let diagram = build_diagram(&triangulate(&points), 600.0);

        for cell in &diagram.cells {
            let center = cell.site.to_vec();
            let angles: Vec<f64> = cell
                .vertices
                .iter()
                .map(|v| (v.y - center.y).atan2(v.x - center.x))
                .collect();
            assert!(angles.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_edge_cells_and_hull() {
        let points = generate_sites(80, 600.0, &mut Lcg::new(8));
        let diagram = build_diagram(&triangulate(&points), 600.0);

        let edge_cells = diagram.cells.iter().filter(|c| c.is_edge).count();
        let hull_cells = diagram.cells.iter().filter(|c| c.on_hull).count();
        assert!(edge_cells > 0);
        assert!(hull_cells >= 3);

        for cell in diagram.cells.iter().filter(|c| !c.is_edge) {
            for v in &cell.vertices {
                assert!(v.x >= 0.0 && v.x <= 600.0 && v.y >= 0.0 && v.y <= 600.0);
            }
        }
    }

    #[test]
    fn test_single_triangle_cells() {
        let triangulation = triangulate(&[
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
        ]);
        let diagram = build_diagram(&triangulation, 1.0);

        assert_eq!(diagram.cells.len(), 3);
        assert!(diagram.edges.is_empty());
        for cell in &diagram.cells {
            assert_eq!(cell.vertices.len(), 1);
            assert_eq!(cell.neighbors.len(), 2);
            assert!(cell.on_hull);
        }
    }
}
