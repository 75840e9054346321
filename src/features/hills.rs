//! Elevation field
//!
//! Hills grow from a few full-height origins by repeatedly attaching a random
//! neighbor at a slightly lower height until the budget runs out. An optional
//! gradient then raises the land toward one or two sides of the map.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

use super::CellSet;
use crate::config::{Direction, HillConfig};
use crate::error::Result;
use crate::graph::CellGraph;
use crate::random::{Lcg, RandomSource};
use crate::terrain::{FeatureType, TerrainData, TerrainFeature};

/// Height of every hill origin and the top of the elevation range
pub const HILL_MAX_HEIGHT: f64 = 100.0;
/// Lowest height a grown hill cell can get
pub const HILL_MIN_HEIGHT: f64 = 10.0;

const DROP_MIN: f64 = 5.0;
const DROP_MAX: f64 = 15.0;
const HILL_GRADIENT_BLEND: f64 = 0.3;

/// Summary of the last elevation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HillStats {
    /// Origins placed
    pub origins: usize,
    /// Cells in any hill region, origins included
    pub hill_cells: usize,
    /// Budget units spent
    pub budget_used: usize,
    /// Growth iterations run
    pub iterations: usize,
    /// Sides the gradient rises toward; empty without a gradient
    pub gradient_edges: Vec<Direction>,
    /// Lowest resolved height
    pub min_height: f64,
    /// Highest resolved height
    pub max_height: f64,
}

/// Grows hill regions and resolves a height for every cell
#[derive(Debug, Clone)]
pub struct HillsGenerator<R = Lcg> {
    config: HillConfig,
    rng: R,
    cells: BTreeSet<usize>,
    /// Raw hill height per hill cell, before the gradient blend
    hill_heights: BTreeMap<usize, f64>,
    /// Cells grown from each origin, origin first
    regions: Vec<Vec<usize>>,
    stats: HillStats,
}

impl HillsGenerator<Lcg> {
    /// Create a generator drawing from a seeded [`Lcg`]
    pub fn new(config: HillConfig, seed: u64) -> Self {
        Self::with_rng(config, Lcg::new(seed))
    }
}

impl<R: RandomSource> HillsGenerator<R> {
    /// Create a generator with an explicit random source
    pub fn with_rng(config: HillConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            cells: BTreeSet::new(),
            hill_heights: BTreeMap::new(),
            regions: Vec::new(),
            stats: HillStats::default(),
        }
    }

    /// Grow hills and write a height into every cell
    #[instrument(skip_all, fields(cells = graph.len(), budget = self.config.budget))]
    pub fn generate(&mut self, graph: &mut CellGraph) -> &BTreeSet<usize> {
        self.reset(graph);
        if graph.is_empty() {
            warn!("hills skipped: cell graph is empty");
            return &self.cells;
        }

        let mut budget = self.config.budget;
        let mut region_of: BTreeMap<usize, usize> = BTreeMap::new();
        let mut order: Vec<usize> = Vec::new();

        // Origins
        let mut remaining: Vec<usize> = (0..graph.len()).collect();
        let origin_count = self.config.origins.min(budget);
        for region in 0..origin_count {
            let Some(pick) = self.rng.index(remaining.len()) else {
                break;
            };
            let origin = remaining.swap_remove(pick);
            self.hill_heights.insert(origin, HILL_MAX_HEIGHT);
            region_of.insert(origin, region);
            self.regions.push(vec![origin]);
            order.push(origin);
            budget -= 1;
        }
        self.stats.origins = self.regions.len();

        // Growth
        let max_iterations = budget * 2;
        let mut iterations = 0;
        while budget > 0 && iterations < max_iterations && !order.is_empty() {
            iterations += 1;

            // A saturated parent wastes the iteration; the scan only decides
            // whether growth is still possible at all.
            let Some((parent, child)) = self.random_attachment(graph, &order) else {
                if !self.has_free_neighbor(graph, &order) {
                    debug!(iterations, budget, "no free neighbors left for hill growth");
                    break;
                }
                continue;
            };

            let parent_height = self.hill_heights.get(&parent).copied().unwrap_or(HILL_MAX_HEIGHT);
            let height = (parent_height - self.rng.range(DROP_MIN, DROP_MAX)).max(HILL_MIN_HEIGHT);
            self.hill_heights.insert(child, height);

            let region = region_of.get(&parent).copied().unwrap_or(0);
            region_of.insert(child, region);
            if let Some(cells) = self.regions.get_mut(region) {
                cells.push(child);
            }
            order.push(child);
            budget -= 1;
        }

        self.stats.iterations = iterations;
        self.stats.budget_used = self.config.budget - budget;
        self.cells = self.hill_heights.keys().copied().collect();
        self.stats.hill_cells = self.cells.len();

        self.apply_heights(graph);

        info!(
            origins = self.stats.origins,
            hill_cells = self.stats.hill_cells,
            iterations,
            gradient_edges = self.stats.gradient_edges.len(),
            "hills generated"
        );
        &self.cells
    }

    /// A random free neighbor of a random hill cell, as `(parent, child)`
    fn random_attachment(&mut self, graph: &CellGraph, order: &[usize]) -> Option<(usize, usize)> {
        let parent = order[self.rng.index(order.len())?];
        let free: Vec<usize> = graph
            .neighbors(parent)
            .iter()
            .copied()
            .filter(|n| !self.hill_heights.contains_key(n))
            .collect();
        let child = free[self.rng.index(free.len())?];
        Some((parent, child))
    }

    fn has_free_neighbor(&self, graph: &CellGraph, order: &[usize]) -> bool {
        order.iter().any(|&id| {
            graph
                .neighbors(id)
                .iter()
                .any(|n| !self.hill_heights.contains_key(n))
        })
    }

    fn pick_gradient_edges(&mut self) -> Vec<Direction> {
        let count = 1 + usize::from(self.rng.chance(0.5));
        let mut pool = Direction::ALL.to_vec();
        let mut edges = Vec::with_capacity(count);
        for _ in 0..count {
            if let Some(pick) = self.rng.index(pool.len()) {
                edges.push(pool.remove(pick));
            }
        }
        edges
    }

    fn apply_heights(&mut self, graph: &mut CellGraph) {
        let edges = if self.config.gradient_enabled {
            self.pick_gradient_edges()
        } else {
            Vec::new()
        };
        let grid_size = graph.grid_size();

        let mut min_height = f64::INFINITY;
        let mut max_height = f64::NEG_INFINITY;
        for id in 0..graph.len() {
            let gradient = if edges.is_empty() {
                None
            } else {
                let nearest = edges
                    .iter()
                    .map(|&side| graph.distance_to_side(id, side))
                    .fold(f64::INFINITY, f64::min);
                let proximity = (1.0 - nearest / grid_size).clamp(0.0, 1.0);
                Some(proximity * HILL_MAX_HEIGHT)
            };

            let hill = self.hill_heights.get(&id).copied();
            let (height, from_gradient) = match (hill, gradient) {
                (Some(h), Some(g)) => (h.max(g + h * HILL_GRADIENT_BLEND), false),
                (Some(h), None) => (h, false),
                (None, Some(g)) => (g, true),
                (None, None) => (0.0, false),
            };
            let height = height.clamp(0.0, HILL_MAX_HEIGHT);

            if let Some(cell) = graph.get_mut(id) {
                cell.metadata.height = Some(height);
                cell.metadata.hill = hill.is_some();
                cell.metadata.gradient = from_gradient;
            }
            min_height = min_height.min(height);
            max_height = max_height.max(height);
        }

        self.stats.gradient_edges = edges;
        self.stats.min_height = min_height;
        self.stats.max_height = max_height;
    }

    /// Clear every height and hill flag this generator wrote
    pub fn reset(&mut self, graph: &mut CellGraph) {
        for id in 0..graph.len() {
            if let Some(cell) = graph.get_mut(id) {
                cell.metadata.height = None;
                cell.metadata.hill = false;
                cell.metadata.gradient = false;
            }
        }
        self.cells.clear();
        self.hill_heights.clear();
        self.regions.clear();
        self.stats = HillStats::default();
    }

    /// True when `id` belongs to a hill region
    #[inline]
    pub fn is_hill_cell(&self, id: usize) -> bool {
        self.cells.contains(&id)
    }

    /// All hill cells
    #[inline]
    pub fn hill_cells(&self) -> &BTreeSet<usize> {
        &self.cells
    }

    /// Raw hill height of a hill cell, before the gradient blend
    pub fn hill_height(&self, id: usize) -> Option<f64> {
        self.hill_heights.get(&id).copied()
    }

    /// Cells of each hill region, origin first
    pub fn regions(&self) -> &[Vec<usize>] {
        &self.regions
    }

    /// Summary of the last pass
    #[inline]
    pub fn hill_stats(&self) -> &HillStats {
        &self.stats
    }

    /// Record one feature per hill region
    pub fn create_hill_features(&self, graph: &CellGraph, data: &mut TerrainData) -> Result<usize> {
        for (index, region) in self.regions.iter().enumerate() {
            let Some(&origin) = region.first() else {
                continue;
            };
            let peak = region
                .iter()
                .map(|&id| graph.height(id))
                .fold(0.0, f64::max);
            let feature = TerrainFeature::new(FeatureType::Hill, format!("hill-{}", index))
                .with_cells(graph, region)
                .with_meta("origin", origin)
                .with_meta("peak", peak);
            data.add_feature(feature)?;
        }
        Ok(self.regions.len())
    }
}

impl<R> CellSet for HillsGenerator<R> {
    fn cell_ids(&self) -> &BTreeSet<usize> {
        &self.cells
    }
}
