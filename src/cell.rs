//! Voronoi Cell Structure
//!
//! Represents an individual cell of the terrain map with its site, boundary,
//! neighbors and the annotations written by the feature generators.

use glam::DVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::Direction;
use crate::generation::{Point, RawCell};

/// River membership of a cell
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiverTag {
    /// Index of the river that claimed the cell
    pub index: usize,
    /// Position of the cell along the river path (0 = source)
    pub position: usize,
    /// Elevation of the cell when the river was committed
    pub elevation: f64,
}

/// Tributary membership of a cell
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TributaryTag {
    /// Index of the tributary that claimed the cell
    pub index: usize,
    /// Branching depth (1 = branches directly off a river)
    pub depth: usize,
    /// River the branch system ultimately drains into
    pub river: usize,
    /// Position of the cell along the tributary path
    pub position: usize,
}

/// Marsh annotation with the distances that qualified the cell
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarshTag {
    /// Hops to the nearest coastline cell
    pub dist_to_coast: u32,
    /// Hops to the nearest lake cell
    pub dist_to_lake: u32,
}

/// Annotations every generator may write onto a cell
///
/// Each field belongs to exactly one generator. A flag is set if and only if
/// the cell is in that generator's own cell set.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellMetadata {
    /// Resolved elevation in `[0, 100]`
    pub height: Option<f64>,
    /// Part of a grown hill region
    pub hill: bool,
    /// Height came from the edge gradient alone
    pub gradient: bool,
    /// Coastline band the cell belongs to
    pub coastline: Option<Direction>,
    /// Part of a lake
    pub lake: bool,
    /// Marsh annotation
    pub marsh: Option<MarshTag>,
    /// River annotation
    pub river: Option<RiverTag>,
    /// Tributary annotation
    pub tributary: Option<TributaryTag>,
}

impl CellMetadata {
    /// Elevation, treating unset heights as sea level
    #[inline]
    pub fn elevation(&self) -> f64 {
        self.height.unwrap_or(0.0)
    }

    /// True for coastline cells
    #[inline]
    pub fn is_coastline(&self) -> bool {
        self.coastline.is_some()
    }

    /// True for marsh cells
    #[inline]
    pub fn is_marsh(&self) -> bool {
        self.marsh.is_some()
    }

    /// True for river cells
    #[inline]
    pub fn is_river(&self) -> bool {
        self.river.is_some()
    }

    /// True for tributary cells
    #[inline]
    pub fn is_tributary(&self) -> bool {
        self.tributary.is_some()
    }

    /// True for any standing water (coast, lake or marsh)
    #[inline]
    pub fn is_water(&self) -> bool {
        self.is_coastline() || self.lake || self.is_marsh()
    }

    /// True when a river or tributary runs through the cell
    #[inline]
    pub fn is_claimed(&self) -> bool {
        self.is_river() || self.is_tributary()
    }
}

/// A single Voronoi cell of the terrain map
///
/// Cells are created once per site when the diagram is built. After that only
/// [`Cell::metadata`] changes; the id stays stable for the whole pass.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct Cell {
    /// Unique identifier for this cell (0 to cell_count-1), equal to its site index
    pub id: usize,

    /// The site this cell was built around
    pub site: Point,

    /// Boundary vertices ordered counter-clockwise around the site
    ///
    /// These are the circumcenters of the Delaunay triangles touching the site.
    pub vertices: Vec<DVec2>,

    /// IDs of adjacent cells, sorted
    ///
    /// Used for:
    /// - A* pathfinding (graph edges)
    /// - Hill growth
    /// - Breadth-first distance queries
    pub neighbors: Vec<usize>,

    /// Any boundary vertex lies outside the map square
    pub is_edge: bool,

    /// The site is on the convex hull of all sites
    pub on_hull: bool,

    /// Generator annotations
    pub metadata: CellMetadata,
}

impl Cell {
    /// Create a new cell with empty metadata
    pub fn new(id: usize, site: Point, vertices: Vec<DVec2>, neighbors: Vec<usize>) -> Self {
        Self {
            id,
            site,
            vertices,
            neighbors,
            is_edge: false,
            on_hull: false,
            metadata: CellMetadata::default(),
        }
    }

    /// Site position as a vector
    #[inline]
    pub fn position(&self) -> DVec2 {
        self.site.to_vec()
    }

    /// Get the number of neighboring cells
    #[inline]
    pub fn neighbor_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Check if this cell is a neighbor of another cell
    #[inline]
    pub fn is_neighbor_of(&self, other_cell_id: usize) -> bool {
        self.neighbors.binary_search(&other_cell_id).is_ok()
    }

    /// Get the vertex count (polygon complexity)
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Polygon area from the shoelace formula
    ///
    /// Edge cells whose vertices were clipped by the diagram hull report the
    /// area of the partial polygon.
    pub fn area(&self) -> f64 {
        if self.vertices.len() < 3 {
            return 0.0;
        }

        let twice_area: f64 = self
            .vertices
            .iter()
            .zip(self.vertices.iter().cycle().skip(1))
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum();

        twice_area.abs() * 0.5
    }

    /// Euclidean distance between the two sites
    #[inline]
    pub fn distance_to(&self, other: &Cell) -> f64 {
        self.site.distance(&other.site)
    }

    /// Elevation of this cell
    #[inline]
    pub fn height(&self) -> f64 {
        self.metadata.elevation()
    }
}

impl From<RawCell> for Cell {
    fn from(raw: RawCell) -> Self {
        Self {
            id: raw.id,
            site: raw.site,
            vertices: raw.vertices,
            neighbors: raw.neighbors,
            is_edge: raw.is_edge,
            on_hull: raw.on_hull,
            metadata: CellMetadata::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_cell() -> Cell {
        Cell::new(
            0,
            Point::new(1.0, 1.0),
            vec![
                DVec2::new(0.0, 0.0),
                DVec2::new(2.0, 0.0),
                DVec2::new(2.0, 2.0),
                DVec2::new(0.0, 2.0),
            ],
            vec![1, 2, 3],
        )
    }

    #[test]
    fn test_cell_creation() {
        let cell = square_cell();

        assert_eq!(cell.id, 0);
        assert_eq!(cell.neighbor_count(), 3);
        assert_eq!(cell.vertex_count(), 4);
        assert!(cell.is_neighbor_of(1));
        assert!(!cell.is_neighbor_of(99));
        assert_eq!(cell.metadata, CellMetadata::default());
    }

    #[test]
    fn test_area() {
        assert!((square_cell().area() - 4.0).abs() < 1e-12);

        let degenerate = Cell::new(1, Point::new(0.0, 0.0), vec![DVec2::ZERO], vec![]);
        assert_eq!(degenerate.area(), 0.0);
    }

    #[test]
    fn test_distance_to() {
        let a = Cell::new(0, Point::new(0.0, 0.0), vec![], vec![]);
        let b = Cell::new(1, Point::new(6.0, 8.0), vec![], vec![]);
        assert_eq!(a.distance_to(&b), 10.0);
    }

    #[test]
    fn test_metadata_flags() {
        let mut metadata = CellMetadata::default();
        assert_eq!(metadata.elevation(), 0.0);
        assert!(!metadata.is_water());

        metadata.height = Some(42.0);
        metadata.lake = true;
        assert_eq!(metadata.elevation(), 42.0);
        assert!(metadata.is_water());
        assert!(!metadata.is_claimed());

        metadata.river = Some(RiverTag {
            index: 0,
            position: 3,
            elevation: 42.0,
        });
        assert!(metadata.is_claimed());
    }
}
