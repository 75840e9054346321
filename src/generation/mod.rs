//! Core Voronoi generation algorithm
//!
//! Builds the planar cell graph: random sites, Bowyer-Watson Delaunay
//! triangulation, then Voronoi cells from the triangle circumcenters.

mod delaunay;
mod geometry;
mod points;
mod voronoi;

pub use delaunay::{triangulate, Triangulation, DUPLICATE_TOLERANCE};
pub use geometry::{
    centroid, compare_points, sort_counterclockwise, Edge, HalfEdge, Point, Triangle, VoronoiEdge,
    DEGENERATE_EPSILON,
};
pub use points::generate_sites;
pub use voronoi::{build_diagram, RawCell, VoronoiDiagram};

use tracing::instrument;

use crate::error::{Result, TerrainError};

/// Triangulate `sites` and build their Voronoi diagram
///
/// Returns `InvalidPoint` if any site lies outside `[0, grid_size]²`.
#[instrument(skip_all, fields(sites = sites.len()))]
pub fn generate_diagram(sites: &[Point], grid_size: f64) -> Result<(Triangulation, VoronoiDiagram)> {
    if let Some(site) = sites.iter().find(|s| !s.within_square(grid_size)) {
        return Err(TerrainError::InvalidPoint {
            x: site.x,
            z: site.z,
            grid_size,
        });
    }

    let triangulation = triangulate(sites);
    let diagram = build_diagram(&triangulation, grid_size);
    Ok((triangulation, diagram))
}
