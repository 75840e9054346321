//! Rivers from the map edge to standing water
//!
//! Each river starts on a cell near the border and runs downhill-ish toward
//! the closest coast, lake or marsh. Rivers never share cells, and starts and
//! ends keep a minimum distance from each other.

use std::collections::BTreeSet;
use tracing::{debug, info, instrument, warn};

use super::pathfinder::{Pathfinder, SearchFailure};
use super::CellSet;
use crate::cell::RiverTag;
use crate::config::{Direction, RiverConfig};
use crate::error::Result;
use crate::graph::CellGraph;
use crate::random::{Lcg, RandomSource};
use crate::terrain::{FeatureType, TerrainData, TerrainFeature};

/// One river attempt
#[derive(Debug, Clone, PartialEq)]
pub struct River {
    /// Position in generation order
    pub index: usize,
    /// Chosen start cell, if any candidate existed
    pub start: Option<usize>,
    /// Side of the map the start is closest to
    pub start_edge: Option<Direction>,
    /// Nearest valid target when the search began
    ///
    /// Informational only: the search accepts any target, so the actual
    /// mouth in [`River::end`] may be a different cell.
    pub intended_end: Option<usize>,
    /// Cells from source to mouth; empty when the search failed
    pub path: Vec<usize>,
}

impl River {
    fn failed(index: usize) -> Self {
        Self {
            index,
            start: None,
            start_edge: None,
            intended_end: None,
            path: Vec::new(),
        }
    }

    /// Last cell of the path
    pub fn end(&self) -> Option<usize> {
        self.path.last().copied()
    }

    /// True when the search produced no path
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Number of cells on the path
    pub fn len(&self) -> usize {
        self.path.len()
    }
}

/// Summary of the last river pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiverStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Total cells over all rivers
    pub cell_count: usize,
    /// Rivers whose start or end ignored the separation rule
    pub separation_fallbacks: usize,
    /// Rivers aimed at the opposite edge because the map had no water
    pub edge_targets: usize,
}

/// Routes rivers with the elevation-aware A* search
#[derive(Debug, Clone)]
pub struct RiversGenerator<R = Lcg> {
    config: RiverConfig,
    /// Base seed; river `i` draws from `Lcg::new(seed + i)`
    seed: Option<u64>,
    rng: R,
    rivers: Vec<River>,
    cells: BTreeSet<usize>,
    stats: RiverStats,
}

impl RiversGenerator<Lcg> {
    /// Create a generator that seeds each river from `seed` plus its index
    pub fn new(config: RiverConfig, seed: u64) -> Self {
        let mut generator = Self::with_rng(config, Lcg::new(seed));
        generator.seed = Some(seed);
        generator
    }
}

impl<R: RandomSource> RiversGenerator<R> {
    /// Create a generator that draws every river from one random source
    pub fn with_rng(config: RiverConfig, rng: R) -> Self {
        Self {
            config,
            seed: None,
            rng,
            rivers: Vec::new(),
            cells: BTreeSet::new(),
            stats: RiverStats::default(),
        }
    }

    /// Route up to `count` rivers and tag their cells
    ///
    /// Coastline, lake, marsh and height metadata must already be in place.
    #[instrument(skip_all, fields(cells = graph.len(), rivers = self.config.count))]
    pub fn generate(&mut self, graph: &mut CellGraph) -> &[River] {
        self.reset(graph);
        if graph.is_empty() {
            warn!("rivers skipped: cell graph is empty");
            return &self.rivers;
        }

        let config = self.config;
        let water: BTreeSet<usize> = graph
            .cells()
            .iter()
            .filter(|cell| cell.metadata.is_water())
            .map(|cell| cell.id)
            .collect();

        let mut starts: Vec<usize> = Vec::new();
        let mut ends: Vec<usize> = Vec::new();

        for index in 0..config.count {
            self.stats.attempted += 1;

            let start = {
                let mut seeded;
                let rng: &mut dyn RandomSource = match self.seed {
                    Some(seed) => {
                        seeded = Lcg::new(seed.wrapping_add(index as u64));
                        &mut seeded
                    }
                    None => &mut self.rng,
                };
                pick_start(graph, &config, &starts, &self.cells, rng)
            };
            let Some((start, start_fallback)) = start else {
                warn!(index, "no start cell left for river");
                self.stats.failed += 1;
                self.rivers.push(River::failed(index));
                continue;
            };
            starts.push(start);

            let start_edge = graph
                .get(start)
                .map(|cell| Direction::nearest(cell.site.x, cell.site.z, graph.grid_size()))
                .unwrap_or(Direction::North);

            let (targets, end_fallback, from_edge) =
                valid_targets(graph, &config, &water, &self.cells, &ends, start_edge);
            if start_fallback || end_fallback {
                self.stats.separation_fallbacks += 1;
            }
            if from_edge {
                self.stats.edge_targets += 1;
            }

            let intended_end = targets.iter().copied().min_by(|&a, &b| {
                graph
                    .distance(start, a)
                    .partial_cmp(&graph.distance(start, b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut river = River {
                index,
                start: Some(start),
                start_edge: Some(start_edge),
                intended_end,
                path: Vec::new(),
            };

            let search = Pathfinder::new(graph, &self.cells)
                .with_max_iterations(config.max_iterations)
                .find_path(start, &targets);
            match search {
                Ok(path) => {
                    debug!(index, start, end = ?path.last(), len = path.len(), "river routed");
                    if let Some(&end) = path.last() {
                        ends.push(end);
                    }
                    river.path = path;
                }
                Err(failure) => {
                    log_failure(index, start, &failure);
                }
            }

            if river.is_empty() {
                self.stats.failed += 1;
            } else {
                self.commit(graph, &river);
                self.stats.succeeded += 1;
            }
            self.rivers.push(river);
        }

        self.stats.cell_count = self.cells.len();
        info!(
            succeeded = self.stats.succeeded,
            failed = self.stats.failed,
            cells = self.stats.cell_count,
            "rivers generated"
        );
        &self.rivers
    }

    fn commit(&mut self, graph: &mut CellGraph, river: &River) {
        for (position, &id) in river.path.iter().enumerate() {
            if let Some(cell) = graph.get_mut(id) {
                let elevation = cell.height();
                cell.metadata.river = Some(RiverTag {
                    index: river.index,
                    position,
                    elevation,
                });
            }
            self.cells.insert(id);
        }
    }

    /// Remove this generator's tags from the graph and forget its rivers
    pub fn reset(&mut self, graph: &mut CellGraph) {
        for &id in &self.cells {
            if let Some(cell) = graph.get_mut(id) {
                cell.metadata.river = None;
            }
        }
        self.cells.clear();
        self.rivers.clear();
        self.stats = RiverStats::default();
    }

    /// True when a river runs through `id`
    #[inline]
    pub fn is_river_cell(&self, id: usize) -> bool {
        self.cells.contains(&id)
    }

    /// All river cells
    #[inline]
    pub fn river_cells(&self) -> &BTreeSet<usize> {
        &self.cells
    }

    /// Every attempt, failed ones included, in generation order
    #[inline]
    pub fn rivers(&self) -> &[River] {
        &self.rivers
    }

    /// Paths of the rivers that succeeded
    pub fn river_paths(&self) -> Vec<&[usize]> {
        self.rivers
            .iter()
            .filter(|river| !river.is_empty())
            .map(|river| river.path.as_slice())
            .collect()
    }

    /// Summary of the last pass
    #[inline]
    pub fn river_stats(&self) -> RiverStats {
        self.stats
    }

    /// Record one feature per successful river
    pub fn create_river_features(&self, graph: &CellGraph, data: &mut TerrainData) -> Result<usize> {
        let mut added = 0;
        for river in self.rivers.iter().filter(|river| !river.is_empty()) {
            let source = river.path[0];
            let mouth = river.path[river.path.len() - 1];
            let feature = TerrainFeature::new(FeatureType::River, format!("river-{}", river.index))
                .with_cells(graph, &river.path)
                .with_path_curve(graph, &river.path)
                .with_meta("riverIndex", river.index)
                .with_meta("length", river.len())
                .with_meta("source", source)
                .with_meta("mouth", mouth)
                .with_meta("sourceElevation", graph.height(source))
                .with_meta("mouthElevation", graph.height(mouth));
            data.add_feature(feature)?;
            added += 1;
        }
        Ok(added)
    }
}

impl<R> CellSet for RiversGenerator<R> {
    fn cell_ids(&self) -> &BTreeSet<usize> {
        &self.cells
    }
}

/// Random start near the border, separated from earlier starts when possible
///
/// Lake and marsh cells are valid starts; a start that is already a target
/// gives a single-cell river.
///
/// The flag is true when separation had to be ignored.
fn pick_start(
    graph: &CellGraph,
    config: &RiverConfig,
    starts: &[usize],
    claimed: &BTreeSet<usize>,
    rng: &mut dyn RandomSource,
) -> Option<(usize, bool)> {
    let near_edge: Vec<usize> = (0..graph.len())
        .filter(|&id| graph.distance_to_border(id) <= config.edge_margin)
        .filter(|id| !claimed.contains(id))
        .filter(|&id| graph.get(id).is_some_and(|cell| !cell.metadata.is_coastline()))
        .collect();

    let separated: Vec<usize> = near_edge
        .iter()
        .copied()
        .filter(|&id| is_separated(graph, id, starts, config.min_separation))
        .collect();

    let (pool, fallback) = if separated.is_empty() {
        if !near_edge.is_empty() {
            warn!(
                candidates = near_edge.len(),
                "no start far enough from earlier rivers, ignoring separation"
            );
        }
        (near_edge, true)
    } else {
        (separated, false)
    };

    let pick = rng.index(pool.len())?;
    Some((pool[pick], fallback))
}

/// Targets for the next river: `(targets, separation_ignored, opposite_edge_used)`
fn valid_targets(
    graph: &CellGraph,
    config: &RiverConfig,
    water: &BTreeSet<usize>,
    claimed: &BTreeSet<usize>,
    ends: &[usize],
    start_edge: Direction,
) -> (BTreeSet<usize>, bool, bool) {
    let (base, from_edge): (BTreeSet<usize>, bool) = if water.is_empty() {
        let opposite = graph
            .cells_near_side(start_edge.opposite(), config.edge_margin)
            .into_iter()
            .collect();
        (opposite, true)
    } else {
        (water.clone(), false)
    };

    let unclaimed: BTreeSet<usize> = base
        .into_iter()
        .filter(|id| !claimed.contains(id))
        .collect();
    let separated: BTreeSet<usize> = unclaimed
        .iter()
        .copied()
        .filter(|&id| is_separated(graph, id, ends, config.min_separation))
        .collect();

    if separated.is_empty() && !unclaimed.is_empty() {
        warn!(
            targets = unclaimed.len(),
            "no target far enough from earlier river ends, ignoring separation"
        );
        (unclaimed, true, from_edge)
    } else {
        (separated, false, from_edge)
    }
}

fn is_separated(graph: &CellGraph, id: usize, others: &[usize], min_separation: f64) -> bool {
    others
        .iter()
        .all(|&other| graph.distance(id, other) >= min_separation)
}

fn log_failure(index: usize, start: usize, failure: &SearchFailure) {
    match failure {
        SearchFailure::Exhausted(_) | SearchFailure::Unreachable => {
            warn!(index, start, %failure, "river search failed")
        }
        SearchFailure::InvalidStart(_) | SearchFailure::NoTargets => {
            debug!(index, start, %failure, "river not attempted")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::MarshTag;
    use crate::config::{CoastlineConfig, HillConfig};
    use crate::features::test_support::{lattice_graph, random_graph};
    use crate::features::{CoastlineGenerator, HillsGenerator};

    fn prepared_graph(seed: u64) -> CellGraph {
        let mut graph = random_graph(200, seed);
        CoastlineGenerator::new(
            CoastlineConfig {
                direction: Some(Direction::South),
                percent: Some(0.15),
                ..Default::default()
            },
            seed + 3000,
        )
        .generate(&mut graph)
        .unwrap();
        HillsGenerator::new(HillConfig::default(), seed + 1000).generate(&mut graph);
        graph
    }

    #[test]
    fn test_rivers_reach_water() {
        let mut graph = prepared_graph(12);
        let mut generator = RiversGenerator::new(RiverConfig::default(), 2000);
        generator.generate(&mut graph);

        let stats = generator.river_stats();
        assert_eq!(stats.attempted, 3);
        assert!(stats.succeeded > 0);
        for river in generator.rivers().iter().filter(|r| !r.is_empty()) {
            let start = river.path[0];
            assert_eq!(river.start, Some(start));
            assert!(graph.distance_to_border(start) <= 20.0);
            assert!(!graph.get(start).unwrap().metadata.is_coastline());

            let end = river.end().unwrap();
            assert!(graph.get(end).unwrap().metadata.is_water());
            for pair in river.path.windows(2) {
                assert!(graph.neighbors(pair[0]).contains(&pair[1]));
            }
        }
    }

    #[test]
    fn test_rivers_are_exclusive() {
        let mut graph = prepared_graph(13);
        let config = RiverConfig {
            count: 5,
            ..Default::default()
        };
        let mut generator = RiversGenerator::new(config, 2000);
        generator.generate(&mut graph);

        let mut seen = BTreeSet::new();
        for river in generator.rivers() {
            for &id in &river.path {
                assert!(seen.insert(id), "cell {} used twice", id);
                let tag = graph.get(id).unwrap().metadata.river.unwrap();
                assert_eq!(tag.index, river.index);
            }
        }
        assert_eq!(&seen, generator.river_cells());
    }

    /// Flat 20 x 20 lattice with a South coast band two rows deep
    fn coastal_lattice() -> CellGraph {
        let mut graph = lattice_graph(20, 600.0);
        CoastlineGenerator::new(
            CoastlineConfig {
                direction: Some(Direction::South),
                percent: Some(0.1),
                ..Default::default()
            },
            3000,
        )
        .generate(&mut graph)
        .unwrap();
        graph
    }

    #[test]
    fn test_start_and_end_separation() {
        let mut graph = coastal_lattice();
        let config = RiverConfig {
            count: 2,
            ..Default::default()
        };
        let mut generator = RiversGenerator::new(config, 2000);
        generator.generate(&mut graph);

        assert_eq!(generator.river_stats().separation_fallbacks, 0);
        let starts: Vec<usize> = generator.rivers().iter().filter_map(|r| r.start).collect();
        assert_eq!(starts.len(), 2);
        assert!(graph.distance(starts[0], starts[1]) >= 50.0);

        let ends: Vec<usize> = generator.rivers().iter().filter_map(River::end).collect();
        assert!(!ends.is_empty());
        for (i, &a) in ends.iter().enumerate() {
            assert!(graph.get(a).unwrap().metadata.is_coastline());
            for &b in &ends[i + 1..] {
                assert!(graph.distance(a, b) >= 50.0);
            }
        }
    }

    #[test]
    fn test_marsh_cells_on_the_edge_can_start_rivers() {
        let mut graph = coastal_lattice();
        let strip: Vec<usize> = (0..graph.len())
            .filter(|&id| graph.distance_to_border(id) <= 20.0)
            .filter(|&id| !graph.get(id).unwrap().metadata.is_coastline())
            .collect();
        assert!(!strip.is_empty());
        for &id in &strip {
            graph.get_mut(id).unwrap().metadata.marsh = Some(MarshTag {
                dist_to_coast: 2,
                dist_to_lake: 2,
            });
        }

        let config = RiverConfig {
            count: 1,
            ..Default::default()
        };
        let mut generator = RiversGenerator::new(config, 2000);
        generator.generate(&mut graph);

        assert_eq!(generator.river_stats().succeeded, 1);
        let river = &generator.rivers()[0];
        let start = river.start.unwrap();
        assert!(strip.contains(&start));
        assert_eq!(river.path, vec![start]);
        assert_eq!(graph.get(start).unwrap().metadata.river.unwrap().index, 0);
    }

    #[test]
    fn test_opposite_edge_without_water() {
        let mut graph = random_graph(200, 15);
        HillsGenerator::new(HillConfig::default(), 1000).generate(&mut graph);
        let config = RiverConfig {
            count: 1,
            ..Default::default()
        };
        let mut generator = RiversGenerator::new(config, 2000);
        generator.generate(&mut graph);

        let river = &generator.rivers()[0];
        assert_eq!(generator.river_stats().edge_targets, 1);
        if let Some(end) = river.end() {
            let edge = river.start_edge.unwrap().opposite();
            assert!(graph.distance_to_side(end, edge) <= 20.0);
        }
    }

    #[test]
    fn test_determinism_and_reset() {
        let mut a = prepared_graph(16);
        let mut b = prepared_graph(16);
        let mut first = RiversGenerator::new(RiverConfig::default(), 2000);
        let mut second = RiversGenerator::new(RiverConfig::default(), 2000);
        assert_eq!(first.generate(&mut a), second.generate(&mut b));

        first.reset(&mut a);
        assert!(a.cells().iter().all(|c| c.metadata.river.is_none()));
        assert!(first.rivers().is_empty());
    }

    #[test]
    fn test_features() {
        let mut graph = prepared_graph(17);
        let mut generator = RiversGenerator::new(RiverConfig::default(), 2000);
        generator.generate(&mut graph);

        let mut data = TerrainData::new();
        let added = generator.create_river_features(&graph, &mut data).unwrap();
        assert_eq!(added, generator.river_paths().len());
        for feature in data.features_of_type(FeatureType::River) {
            assert_eq!(feature.curves().len(), 1);
        }
    }
}
