//! The cell graph shared by every feature generator
//!
//! Cells are stored in a `Vec` indexed by id, and adjacency is the sorted
//! neighbor list on each cell, so graph searches work on plain indices.

use glam::DVec2;
use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::cell::Cell;
use crate::config::Direction;
use crate::error::{Result, TerrainError};
use crate::generation::{VoronoiDiagram, VoronoiEdge};

/// Voronoi cells plus global adjacency
#[derive(Debug, Clone, Default)]
pub struct CellGraph {
    cells: Vec<Cell>,
    edges: Vec<VoronoiEdge>,
    grid_size: f64,
}

impl CellGraph {
    /// Create a graph from cells whose ids equal their index
    pub fn new(cells: Vec<Cell>, edges: Vec<VoronoiEdge>, grid_size: f64) -> Self {
        debug_assert!(cells.iter().enumerate().all(|(i, c)| c.id == i));
        Self {
            cells,
            edges,
            grid_size,
        }
    }

    /// Convert a built diagram into a graph with empty metadata
    pub fn from_diagram(diagram: VoronoiDiagram, grid_size: f64) -> Self {
        let cells = diagram.cells.into_iter().map(Cell::from).collect();
        Self::new(cells, diagram.edges, grid_size)
    }

    /// Number of cells
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True for a graph without cells
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Side length of the square map
    #[inline]
    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    /// Get a cell by ID
    #[inline]
    pub fn get(&self, id: usize) -> Option<&Cell> {
        self.cells.get(id)
    }

    /// Get a mutable cell by ID
    #[inline]
    pub fn get_mut(&mut self, id: usize) -> Option<&mut Cell> {
        self.cells.get_mut(id)
    }

    /// Get a cell by ID, failing with `CellNotFound`
    pub fn cell(&self, id: usize) -> Result<&Cell> {
        self.cells.get(id).ok_or(TerrainError::CellNotFound(id))
    }

    /// All cells, indexed by id
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Finite Voronoi edges
    #[inline]
    pub fn voronoi_edges(&self) -> &[VoronoiEdge] {
        &self.edges
    }

    /// Neighbor IDs of a cell; empty for an unknown id
    pub fn neighbors(&self, id: usize) -> &[usize] {
        self.cells
            .get(id)
            .map(|c| c.neighbors.as_slice())
            .unwrap_or(&[])
    }

    /// Site position of a cell
    #[inline]
    pub fn position(&self, id: usize) -> Option<DVec2> {
        self.cells.get(id).map(Cell::position)
    }

    /// Elevation of a cell; unknown ids and unset heights read as 0
    #[inline]
    pub fn height(&self, id: usize) -> f64 {
        self.cells.get(id).map(Cell::height).unwrap_or(0.0)
    }

    /// Euclidean distance between two sites, infinite for unknown ids
    pub fn distance(&self, a: usize, b: usize) -> f64 {
        match (self.position(a), self.position(b)) {
            (Some(pa), Some(pb)) => pa.distance(pb),
            _ => f64::INFINITY,
        }
    }

    /// Distance from a cell's site to one side of the map
    pub fn distance_to_side(&self, id: usize, side: Direction) -> f64 {
        self.cells
            .get(id)
            .map(|c| side.distance_from(c.site.x, c.site.z, self.grid_size))
            .unwrap_or(f64::INFINITY)
    }

    /// Distance from a cell's site to the closest side of the map
    pub fn distance_to_border(&self, id: usize) -> f64 {
        Direction::ALL
            .iter()
            .map(|&side| self.distance_to_side(id, side))
            .fold(f64::INFINITY, f64::min)
    }

    /// Reset every cell's metadata
    ///
    /// Called before each generation pass so no annotation survives from a
    /// previous one.
    pub fn clear_metadata(&mut self) {
        for cell in &mut self.cells {
            cell.metadata = Default::default();
        }
    }

    /// Find cells within a given hop count from a center cell (BFS)
    ///
    /// Returns the cell ids reachable in at most `hops` steps, including the
    /// center. Returns an empty vec if `center_id` is invalid.
    pub fn find_cells_within_hops(&self, center_id: usize, hops: usize) -> Vec<usize> {
        if center_id >= self.cells.len() {
            return vec![];
        }

        let mut visited = HashSet::new();
        let mut order = vec![center_id];
        let mut current = vec![center_id];
        visited.insert(center_id);

        for _ in 0..hops {
            let mut next = Vec::new();
            for &cell_id in &current {
                for &neighbor in self.neighbors(cell_id) {
                    if visited.insert(neighbor) {
                        next.push(neighbor);
                        order.push(neighbor);
                    }
                }
            }
            current = next;
        }

        order
    }

    /// Hop distance from the nearest member of `sources`, for every cell
    ///
    /// Breadth-first from all sources at once. Cells farther than `cap` hops,
    /// or unreachable, get `None`.
    pub fn multi_source_distances(&self, sources: &BTreeSet<usize>, cap: u32) -> Vec<Option<u32>> {
        let mut distances = vec![None; self.cells.len()];
        let mut queue = VecDeque::new();

        for &source in sources {
            if let Some(slot) = distances.get_mut(source) {
                *slot = Some(0);
                queue.push_back((source, 0u32));
            }
        }

        while let Some((cell_id, depth)) = queue.pop_front() {
            if depth >= cap {
                continue;
            }
            for &neighbor in self.neighbors(cell_id) {
                if let Some(slot) = distances.get_mut(neighbor) {
                    if slot.is_none() {
                        *slot = Some(depth + 1);
                        queue.push_back((neighbor, depth + 1));
                    }
                }
            }
        }

        distances
    }

    /// Ids of all cells whose site lies within `margin` of the given side
    pub fn cells_near_side(&self, side: Direction, margin: f64) -> Vec<usize> {
        (0..self.cells.len())
            .filter(|&id| self.distance_to_side(id, side) <= margin)
            .collect()
    }
}
