//! Inland lakes
//!
//! Lakes are seeded on interior cells and grown by attaching random frontier
//! neighbors, the same way hills grow but without heights.

use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

use super::{CellSet, LakeSource};
use crate::config::LakeConfig;
use crate::error::Result;
use crate::graph::CellGraph;
use crate::random::{Lcg, RandomSource};
use crate::terrain::{FeatureType, TerrainData, TerrainFeature};

/// Lake seeds must be farther than this from every side of the map
pub const LAKE_BORDER_MARGIN: f64 = 20.0;

/// Summary of the last lake pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LakeStats {
    /// Lakes placed
    pub lake_count: usize,
    /// Total lake cells
    pub cell_count: usize,
    /// Cells in the biggest lake
    pub largest: usize,
}

/// Places a handful of small lakes on interior cells
#[derive(Debug, Clone)]
pub struct LakesGenerator<R = Lcg> {
    config: LakeConfig,
    rng: R,
    lakes: Vec<Vec<usize>>,
    cells: BTreeSet<usize>,
}

impl LakesGenerator<Lcg> {
    /// Create a generator drawing from a seeded [`Lcg`]
    pub fn new(config: LakeConfig, seed: u64) -> Self {
        Self::with_rng(config, Lcg::new(seed))
    }
}

impl<R: RandomSource> LakesGenerator<R> {
    /// Create a generator with an explicit random source
    pub fn with_rng(config: LakeConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            lakes: Vec::new(),
            cells: BTreeSet::new(),
        }
    }

    /// Place lakes and tag their cells
    ///
    /// Coastline cells must already be tagged; they are never turned into
    /// lakes.
    #[instrument(skip_all, fields(cells = graph.len(), lakes = self.config.count))]
    pub fn generate(&mut self, graph: &mut CellGraph) -> &BTreeSet<usize> {
        self.reset(graph);
        if graph.is_empty() {
            warn!("lakes skipped: cell graph is empty");
            return &self.cells;
        }
        if self.config.max_size == 0 {
            return &self.cells;
        }

        let mut candidates: Vec<usize> = graph
            .cells()
            .iter()
            .filter(|cell| is_lake_site(graph, cell.id))
            .map(|cell| cell.id)
            .collect();

        for lake_index in 0..self.config.count {
            candidates.retain(|id| !self.cells.contains(id));
            let Some(pick) = self.rng.index(candidates.len()) else {
                debug!(lake_index, "no interior cells left for another lake");
                break;
            };
            let seed_cell = candidates.swap_remove(pick);

            let lake = self.grow_lake(graph, seed_cell);
            debug!(lake_index, seed_cell, size = lake.len(), "lake placed");
            self.cells.extend(lake.iter().copied());
            self.lakes.push(lake);
        }

        for &id in &self.cells {
            if let Some(cell) = graph.get_mut(id) {
                cell.metadata.lake = true;
            }
        }

        let stats = self.lake_stats();
        info!(
            lakes = stats.lake_count,
            cells = stats.cell_count,
            largest = stats.largest,
            "lakes generated"
        );
        &self.cells
    }

    fn grow_lake(&mut self, graph: &CellGraph, seed_cell: usize) -> Vec<usize> {
        let mut lake = vec![seed_cell];
        let mut members: BTreeSet<usize> = [seed_cell].into_iter().collect();

        while lake.len() < self.config.max_size {
            let frontier: Vec<usize> = members
                .iter()
                .flat_map(|&id| graph.neighbors(id).iter().copied())
                .filter(|id| !members.contains(id) && !self.cells.contains(id))
                .filter(|&id| is_lake_site(graph, id))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            let Some(pick) = self.rng.index(frontier.len()) else {
                break;
            };
            let next = frontier[pick];
            members.insert(next);
            lake.push(next);
        }

        lake
    }

    /// Remove this generator's tags from the graph and forget its lakes
    pub fn reset(&mut self, graph: &mut CellGraph) {
        for &id in &self.cells {
            if let Some(cell) = graph.get_mut(id) {
                cell.metadata.lake = false;
            }
        }
        self.cells.clear();
        self.lakes.clear();
    }

    /// Cells of each lake, in placement order
    pub fn lakes(&self) -> &[Vec<usize>] {
        &self.lakes
    }

    /// Summary of the last pass
    pub fn lake_stats(&self) -> LakeStats {
        LakeStats {
            lake_count: self.lakes.len(),
            cell_count: self.cells.len(),
            largest: self.lakes.iter().map(Vec::len).max().unwrap_or(0),
        }
    }

    /// Record one feature per lake
    pub fn create_lake_features(&self, graph: &CellGraph, data: &mut TerrainData) -> Result<usize> {
        for (index, lake) in self.lakes.iter().enumerate() {
            let feature = TerrainFeature::new(FeatureType::Lake, format!("lake-{}", index))
                .with_cells(graph, lake)
                .with_meta("size", lake.len());
            data.add_feature(feature)?;
        }
        Ok(self.lakes.len())
    }
}

impl<R> LakeSource for LakesGenerator<R> {
    fn lake_cells(&self) -> &BTreeSet<usize> {
        &self.cells
    }
}

impl<R> CellSet for LakesGenerator<R> {
    fn cell_ids(&self) -> &BTreeSet<usize> {
        &self.cells
    }
}

fn is_lake_site(graph: &CellGraph, id: usize) -> bool {
    graph.get(id).is_some_and(|cell| {
        !cell.is_edge
            && !cell.metadata.is_coastline()
            && graph.distance_to_border(id) > LAKE_BORDER_MARGIN
    })
}
