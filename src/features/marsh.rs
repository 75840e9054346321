//! Wetlands between the coast and the lakes
//!
//! A cell is marsh when it is within a couple of hops of both the coastline
//! and a lake. Distances come from two multi-source breadth-first searches.

use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, info, instrument};

use super::{CellSet, LakeSource};
use crate::cell::MarshTag;
use crate::error::Result;
use crate::graph::CellGraph;
use crate::terrain::{FeatureType, TerrainData, TerrainFeature};

/// Largest hop distance to both coast and lake that still counts as marsh
pub const MARSH_MAX_DISTANCE: u32 = 2;

/// Distances beyond this are treated as unreachable
const SEARCH_CAP: u32 = 3;

/// Summary of the last marsh pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarshStats {
    /// Marsh cells
    pub cell_count: usize,
    /// Connected marsh areas
    pub component_count: usize,
    /// Size of the coastline set used
    pub coast_cells: usize,
    /// Size of the lake set used
    pub lake_cells: usize,
}

/// Detects marsh cells from the coastline and lake sets
#[derive(Debug, Clone, Default)]
pub struct MarshGenerator {
    cells: BTreeSet<usize>,
    stats: MarshStats,
}

impl MarshGenerator {
    /// Create an empty generator
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every cell close to both the coast and a lake
    ///
    /// Coastline and lake cells are never marsh. Either set being empty
    /// yields no marsh.
    #[instrument(skip_all, fields(cells = graph.len()))]
    pub fn generate(
        &mut self,
        graph: &mut CellGraph,
        coast: &impl CellSet,
        lakes: &impl LakeSource,
    ) -> &BTreeSet<usize> {
        self.reset(graph);
        let coast = coast.cell_ids();
        let lakes = lakes.lake_cells();
        self.stats.coast_cells = coast.len();
        self.stats.lake_cells = lakes.len();

        if coast.is_empty() || lakes.is_empty() {
            debug!(
                coast = coast.len(),
                lakes = lakes.len(),
                "marsh needs both coast and lake cells"
            );
            return &self.cells;
        }

        let to_coast = graph.multi_source_distances(coast, SEARCH_CAP);
        let to_lake = graph.multi_source_distances(lakes, SEARCH_CAP);

        for id in 0..graph.len() {
            if coast.contains(&id) || lakes.contains(&id) {
                continue;
            }
            let (Some(dist_to_coast), Some(dist_to_lake)) = (to_coast[id], to_lake[id]) else {
                continue;
            };
            if dist_to_coast <= MARSH_MAX_DISTANCE && dist_to_lake <= MARSH_MAX_DISTANCE {
                if let Some(cell) = graph.get_mut(id) {
                    cell.metadata.marsh = Some(MarshTag {
                        dist_to_coast,
                        dist_to_lake,
                    });
                }
                self.cells.insert(id);
            }
        }

        self.stats.cell_count = self.cells.len();
        self.stats.component_count = self.components(graph).len();
        info!(
            marsh = self.stats.cell_count,
            components = self.stats.component_count,
            "marsh generated"
        );
        &self.cells
    }

    /// Remove this generator's tags from the graph and forget its cells
    pub fn reset(&mut self, graph: &mut CellGraph) {
        for &id in &self.cells {
            if let Some(cell) = graph.get_mut(id) {
                cell.metadata.marsh = None;
            }
        }
        self.cells.clear();
        self.stats = MarshStats::default();
    }

    /// Connected groups of marsh cells, each sorted, ordered by smallest id
    pub fn components(&self, graph: &CellGraph) -> Vec<Vec<usize>> {
        let mut seen = BTreeSet::new();
        let mut components = Vec::new();

        for &start in &self.cells {
            if !seen.insert(start) {
                continue;
            }
            let mut component = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(id) = queue.pop_front() {
                for &neighbor in graph.neighbors(id) {
                    if self.cells.contains(&neighbor) && seen.insert(neighbor) {
                        component.push(neighbor);
                        queue.push_back(neighbor);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }

        components
    }

    #[inline]
    pub fn is_marsh_cell(&self, id: usize) -> bool {
        self.cells.contains(&id)
    }

    #[inline]
    pub fn marsh_cells(&self) -> &BTreeSet<usize> {
        &self.cells
    }

    #[inline]
    pub fn marsh_stats(&self) -> MarshStats {
        self.stats
    }

    /// Record one feature per connected marsh area
    pub fn create_marsh_features(&self, graph: &CellGraph, data: &mut TerrainData) -> Result<usize> {
        let components = self.components(graph);
        for (index, component) in components.iter().enumerate() {
            let feature = TerrainFeature::new(FeatureType::Marsh, format!("marsh-{}", index))
                .with_cells(graph, component)
                .with_meta("size", component.len());
            data.add_feature(feature)?;
        }
        Ok(components.len())
    }
}

impl CellSet for MarshGenerator {
    fn cell_ids(&self) -> &BTreeSet<usize> {
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::generation::Point;

    /// A path graph 0 - 1 - ... - (len - 1)
    fn line_graph(len: usize) -> CellGraph {
        let cells = (0..len)
            .map(|i| {
                let mut neighbors = Vec::new();
                if i > 0 {
                    neighbors.push(i - 1);
                }
                if i + 1 < len {
                    neighbors.push(i + 1);
                }
                Cell::new(i, Point::new(10.0 * i as f64 + 5.0, 50.0), vec![], neighbors)
            })
            .collect();
        CellGraph::new(cells, vec![], 100.0)
    }

    fn set(ids: &[usize]) -> BTreeSet<usize> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_marsh_between_coast_and_lake() {
        let mut graph = line_graph(8);
        let mut generator = MarshGenerator::new();
        // coast at 0, lake at 4: cells 2 (2, 2) qualifies, 1 (1, 3) and 3 (3, 1) do not
        let marsh = generator
            .generate(&mut graph, &set(&[0]), &set(&[4]))
            .clone();

        assert_eq!(marsh, set(&[2]));
        assert_eq!(
            graph.get(2).unwrap().metadata.marsh,
            Some(MarshTag {
                dist_to_coast: 2,
                dist_to_lake: 2,
            })
        );
        assert!(graph.get(1).unwrap().metadata.marsh.is_none());
    }

    #[test]
    fn test_marsh_containment() {
        let mut graph = line_graph(8);
        let coast = set(&[0, 7]);
        let lakes = set(&[3, 4]);
        let mut generator = MarshGenerator::new();
        generator.generate(&mut graph, &coast, &lakes);

        assert_eq!(generator.marsh_cells(), &set(&[1, 2, 5, 6]));
        for &id in generator.marsh_cells() {
            assert!(!coast.contains(&id) && !lakes.contains(&id));
            let tag = graph.get(id).unwrap().metadata.marsh.unwrap();
            assert!(tag.dist_to_coast <= MARSH_MAX_DISTANCE);
            assert!(tag.dist_to_lake <= MARSH_MAX_DISTANCE);
        }
        assert_eq!(generator.marsh_stats().component_count, 2);
    }

    #[test]
    fn test_empty_inputs_give_empty_marsh() {
        let mut graph = line_graph(8);
        let mut generator = MarshGenerator::new();
        assert!(generator.generate(&mut graph, &set(&[]), &set(&[]))
            .is_empty());
        assert!(generator.generate(&mut graph, &set(&[0]), &set(&[]))
            .is_empty());
        assert!(generator.generate(&mut graph, &set(&[]), &set(&[3]))
            .is_empty());
    }

    #[test]
    fn test_rerun_clears_previous_tags() {
        let mut graph = line_graph(8);
        let mut generator = MarshGenerator::new();
        generator.generate(&mut graph, &set(&[0]), &set(&[4]));
        generator.generate(&mut graph, &set(&[7]), &set(&[5]));

        assert_eq!(generator.marsh_cells(), &set(&[6]));
        assert!(graph.get(2).unwrap().metadata.marsh.is_none());
    }

    #[test]
    fn test_features_per_component() {
        let mut graph = line_graph(8);
        let mut generator = MarshGenerator::new();
        generator.generate(&mut graph, &set(&[0, 7]), &set(&[3, 4]));

        let mut data = TerrainData::new();
        assert_eq!(generator.create_marsh_features(&graph, &mut data).unwrap(), 2);
        assert!(data.get("marsh-0").is_some());
        assert!(data.get("marsh-1").is_some());
    }
}
