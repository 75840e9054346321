//! Coastline band along one side of the map
//!
//! Every cell whose site lies within `thickness` of the chosen side becomes
//! coastline. When the band catches nothing it is widened a few times before
//! giving up.

use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

use super::CellSet;
use crate::config::{CoastlineConfig, Direction};
use crate::error::{Result, TerrainError};
use crate::graph::CellGraph;
use crate::random::{Lcg, RandomSource};
use crate::terrain::{FeatureType, TerrainData, TerrainFeature};

/// Widening attempts after the first band comes up empty
pub const MAX_COASTLINE_RETRIES: usize = 3;

const MIN_PERCENT: f64 = 0.05;
const MAX_PERCENT: f64 = 0.20;
const RANDOM_PERCENT_MIN: f64 = 0.15;
const RETRY_GROWTH: f64 = 1.2;

/// Summary of the last coastline pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoastlineStats {
    /// Side the band was placed on
    pub direction: Option<Direction>,
    /// Final band thickness in world units
    pub thickness: f64,
    /// Attempts made, including the first
    pub attempts: usize,
    /// Number of coastline cells
    pub cell_count: usize,
}

/// Marks a band of cells along one side of the map as coastline
#[derive(Debug, Clone)]
pub struct CoastlineGenerator<R = Lcg> {
    config: CoastlineConfig,
    rng: R,
    cells: BTreeSet<usize>,
    stats: CoastlineStats,
}

impl CoastlineGenerator<Lcg> {
    /// Create a generator drawing from a seeded [`Lcg`]
    pub fn new(config: CoastlineConfig, seed: u64) -> Self {
        Self::with_rng(config, Lcg::new(seed))
    }
}

impl<R: RandomSource> CoastlineGenerator<R> {
    /// Create a generator with an explicit random source
    pub fn with_rng(config: CoastlineConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            cells: BTreeSet::new(),
            stats: CoastlineStats::default(),
        }
    }

    /// Select the coastline band and tag its cells
    ///
    /// An empty graph is a precondition failure and yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns `CoastlineUnsatisfiable` when the band is still empty after
    /// [`MAX_COASTLINE_RETRIES`] widenings. The previous coastline is cleared
    /// either way.
    #[instrument(skip_all, fields(cells = graph.len()))]
    pub fn generate(&mut self, graph: &mut CellGraph) -> Result<&BTreeSet<usize>> {
        self.reset(graph);
        if graph.is_empty() {
            warn!("coastline skipped: cell graph is empty");
            return Ok(&self.cells);
        }

        let direction = match self.config.direction {
            Some(direction) => direction,
            None => {
                let index = self.rng.index(Direction::ALL.len()).unwrap_or(0);
                Direction::ALL[index]
            }
        };
        let percent = match self.config.percent.filter(|p| p.is_finite()) {
            Some(percent) => percent,
            None => self.rng.range(RANDOM_PERCENT_MIN, MAX_PERCENT),
        }
        .clamp(MIN_PERCENT, MAX_PERCENT);

        let grid_size = graph.grid_size();
        let max_thickness = grid_size * MAX_PERCENT;
        let mut thickness = grid_size * percent;
        let mut attempts = 0;
        let mut selected = Vec::new();

        while attempts <= MAX_COASTLINE_RETRIES {
            attempts += 1;
            selected = band_cells(graph, direction, thickness);
            if !selected.is_empty() {
                break;
            }
            if attempts <= MAX_COASTLINE_RETRIES {
                thickness = (thickness * RETRY_GROWTH).min(max_thickness);
                debug!(attempts, thickness, "coastline band empty, widening");
            }
        }

        self.stats = CoastlineStats {
            direction: Some(direction),
            thickness,
            attempts,
            cell_count: selected.len(),
        };

        if selected.is_empty() {
            warn!(?direction, attempts, thickness, "no cells inside the coastline band");
            return Err(TerrainError::CoastlineUnsatisfiable {
                direction,
                attempts,
                thickness,
            });
        }

        for &id in &selected {
            if let Some(cell) = graph.get_mut(id) {
                cell.metadata.coastline = Some(direction);
            }
        }
        self.cells = selected.into_iter().collect();

        info!(
            ?direction,
            thickness,
            attempts,
            cells = self.cells.len(),
            "coastline generated"
        );
        Ok(&self.cells)
    }

    /// Remove this generator's tags from the graph and forget its cells
    pub fn reset(&mut self, graph: &mut CellGraph) {
        for &id in &self.cells {
            if let Some(cell) = graph.get_mut(id) {
                cell.metadata.coastline = None;
            }
        }
        self.cells.clear();
        self.stats = CoastlineStats::default();
    }

    /// True when `id` is a coastline cell
    #[inline]
    pub fn is_coastline_cell(&self, id: usize) -> bool {
        self.cells.contains(&id)
    }

    /// All coastline cells
    #[inline]
    pub fn coastline_cells(&self) -> &BTreeSet<usize> {
        &self.cells
    }

    /// Summary of the last pass
    #[inline]
    pub fn coastline_stats(&self) -> CoastlineStats {
        self.stats
    }

    /// Record the coastline as a single feature
    ///
    /// Returns the number of features added (0 or 1).
    pub fn create_coastline_features(&self, graph: &CellGraph, data: &mut TerrainData) -> Result<usize> {
        let Some(direction) = self.stats.direction.filter(|_| !self.cells.is_empty()) else {
            return Ok(0);
        };

        let ids: Vec<usize> = self.cells.iter().copied().collect();
        let mut shoreline = ids.clone();
        // Order along the shore so the curve does not zig-zag.
        shoreline.sort_by(|&a, &b| {
            let key = |id: usize| match direction {
                Direction::North | Direction::South => graph.position(id).map(|p| p.x),
                Direction::East | Direction::West => graph.position(id).map(|p| p.y),
            };
            key(a)
                .partial_cmp(&key(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let feature = TerrainFeature::new(FeatureType::Coastline, "coastline-0")
            .with_cells(graph, &ids)
            .with_path_curve(graph, &shoreline)
            .with_meta("direction", direction.name())
            .with_meta("thickness", self.stats.thickness);
        data.add_feature(feature)?;
        Ok(1)
    }
}

impl<R> CellSet for CoastlineGenerator<R> {
    fn cell_ids(&self) -> &BTreeSet<usize> {
        &self.cells
    }
}

fn band_cells(graph: &CellGraph, direction: Direction, thickness: f64) -> Vec<usize> {
    graph
        .cells()
        .iter()
        .filter(|cell| !cell.site.is_boundary)
        .filter(|cell| graph.distance_to_side(cell.id, direction) <= thickness)
        .map(|cell| cell.id)
        .collect()
}
