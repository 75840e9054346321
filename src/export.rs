//! Export surface for TerrainMap
//!
//! Flattens a generated map into plain arrays and index lists that any
//! renderer or file writer can consume without depending on glam or on the
//! generator types.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::map::TerrainMap;

/// One Delaunay edge between two sites
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportEdge {
    /// First site index
    pub a: usize,
    /// Second site index
    pub b: usize,
    /// Euclidean length
    pub length: f64,
    /// Length scaled by the height difference, see [`edge_weight`]
    pub weight: f64,
}

/// One cell polygon
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ExportCell {
    /// Cell id, equal to its site index
    pub id: usize,
    /// Boundary vertices, counter-clockwise
    pub vertices: Vec<[f64; 2]>,
    /// Neighbor ids, sorted
    pub neighbors: Vec<usize>,
    /// Resolved elevation
    pub height: f64,
    /// Polygon reaches outside the map square
    pub is_edge: bool,
}

/// Engine-agnostic map data output
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapExport {
    /// Side length of the square map
    pub grid_size: f64,
    /// Site positions as `[x, z]`
    pub points: Vec<[f64; 2]>,
    /// Triangle site indices, counter-clockwise
    pub triangles: Vec<[usize; 3]>,
    /// Delaunay edges
    pub edges: Vec<ExportEdge>,
    /// Cell polygons and adjacency
    pub cells: Vec<ExportCell>,
    /// Site index paths of the routed rivers, source first
    pub rivers: Vec<Vec<usize>>,
    /// Site index paths of the tributaries, source first
    pub tributaries: Vec<Vec<usize>>,
    /// Coastline cell ids, sorted
    pub coastline: Vec<usize>,
}

impl MapExport {
    /// Get the number of points
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Get the number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Check if the export holds no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl From<&TerrainMap> for MapExport {
    fn from(map: &TerrainMap) -> Self {
        generate_export(map)
    }
}

/// Edge weight used by the export: `length × (1 + |Δheight| / 100)`
#[inline]
pub fn edge_weight(length: f64, height_a: f64, height_b: f64) -> f64 {
    length * (1.0 + (height_a - height_b).abs() / 100.0)
}

/// Flatten a map into a [`MapExport`]
pub fn generate_export(map: &TerrainMap) -> MapExport {
    let graph = map.graph();
    let triangulation = map.triangulation();

    let points = triangulation.points.iter().map(|p| [p.x, p.z]).collect();

    let edges = triangulation
        .edges
        .iter()
        .map(|edge| {
            let length = edge.length();
            ExportEdge {
                a: edge.a,
                b: edge.b,
                length,
                weight: edge_weight(length, graph.height(edge.a), graph.height(edge.b)),
            }
        })
        .collect();

    let cells = graph
        .cells()
        .iter()
        .map(|cell| ExportCell {
            id: cell.id,
            vertices: cell.vertices.iter().map(|v| [v.x, v.y]).collect(),
            neighbors: cell.neighbors.clone(),
            height: cell.height(),
            is_edge: cell.is_edge,
        })
        .collect();

    MapExport {
        grid_size: graph.grid_size(),
        points,
        triangles: triangulation.triangle_indices(),
        edges,
        cells,
        rivers: map
            .rivers()
            .river_paths()
            .into_iter()
            .map(<[usize]>::to_vec)
            .collect(),
        tributaries: map
            .tributaries()
            .tributary_paths()
            .into_iter()
            .map(<[usize]>::to_vec)
            .collect(),
        coastline: map.coastline().coastline_cells().iter().copied().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfigBuilder;

    fn sample_map() -> TerrainMap {
        let config = MapConfigBuilder::new()
            .seed(12345)
            .site_count(100)
            .build()
            .unwrap();
        TerrainMap::generate(config).unwrap()
    }

    #[test]
    fn test_generate_export() {
        let map = sample_map();
        let export = generate_export(&map);

        assert!(!export.is_empty());
        assert_eq!(export.point_count(), map.cell_count());
        assert_eq!(export.cells.len(), map.cell_count());
        assert_eq!(export.triangle_count(), map.triangulation().triangle_count());
        assert_eq!(export.rivers.len(), map.rivers().river_paths().len());
        for triangle in &export.triangles {
            assert!(triangle.iter().all(|&i| i < export.point_count()));
        }
    }

    #[test]
    fn test_edge_weights() {
        assert_eq!(edge_weight(10.0, 0.0, 0.0), 10.0);
        assert_eq!(edge_weight(10.0, 20.0, 70.0), 15.0);
        assert_eq!(edge_weight(10.0, 70.0, 20.0), 15.0);

        let export = MapExport::from(&sample_map());
        for edge in &export.edges {
            assert!(edge.weight >= edge.length);
        }
    }

    #[test]
    fn test_export_consistency() {
        let map = sample_map();
        assert_eq!(generate_export(&map), generate_export(&map));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_export_serialization() {
        let export = generate_export(&sample_map());
        let json = serde_json::to_string(&export).unwrap();
        let restored: MapExport = serde_json::from_str(&json).unwrap();
        assert_eq!(export, restored);
    }
}
