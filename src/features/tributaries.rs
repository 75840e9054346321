//! Branching tributaries
//!
//! Walks each committed river looking for junction points, then routes a
//! short branch from a source off to one side back into the junction. Branches
//! can sprout branches of their own, with every distance and the branching
//! chance shrinking per level.

use glam::DVec2;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, trace, warn};

use super::pathfinder::{ClaimPolicy, Pathfinder};
use super::rivers::River;
use super::CellSet;
use crate::cell::TributaryTag;
use crate::config::TributaryConfig;
use crate::error::Result;
use crate::graph::CellGraph;
use crate::random::{Lcg, RandomSource};
use crate::terrain::{FeatureType, TerrainData, TerrainFeature};

/// Path positions skipped at either end of a parent before junctions may form
const END_MARGIN: usize = 2;
/// Sources are drawn from this many farthest candidates
const TOP_CANDIDATES: usize = 5;
/// Junctions need at least this many free neighbors
const MIN_FREE_NEIGHBORS: usize = 2;
const SEARCH_ITERATIONS: usize = 1000;

/// One routed branch
#[derive(Debug, Clone, PartialEq)]
pub struct Tributary {
    /// Position in generation order
    pub index: usize,
    /// 1 for branches off a river, 2 for branches off those, and so on
    pub depth: usize,
    /// River the branch system drains into
    pub river: usize,
    /// Tributary this one branches off, `None` for branches off a river
    pub parent: Option<usize>,
    /// Cell on the parent path where the branch joins
    pub junction: usize,
    /// Cells from source to junction
    pub path: Vec<usize>,
}

impl Tributary {
    /// First cell of the branch
    pub fn source(&self) -> usize {
        self.path.first().copied().unwrap_or(self.junction)
    }
}

/// Summary of the last tributary pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TributaryStats {
    /// Junctions that passed every gate and got a search
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Junctions with no source candidate on the chosen side
    pub no_candidates: usize,
    /// Successful branches per depth
    pub by_depth: BTreeMap<usize, usize>,
    /// Cells tagged as tributary
    pub cell_count: usize,
}

/// Per-level parameters after applying the depth decay
#[derive(Debug, Clone, Copy)]
struct LevelParams {
    probability: f64,
    min_distance: f64,
    max_distance: f64,
    separation: f64,
}

impl LevelParams {
    fn for_depth(config: &TributaryConfig, depth: usize) -> Self {
        let exponent = i32::try_from(depth.saturating_sub(1)).unwrap_or(i32::MAX);
        let scale = config.depth_decay.powi(exponent);
        Self {
            probability: config.branch_probability * scale,
            min_distance: config.min_distance * scale,
            max_distance: config.max_distance * scale,
            separation: config.branching_separation * scale,
        }
    }
}

/// A path new branches may join
struct ParentPath {
    path: Vec<usize>,
    river: usize,
    tributary: Option<usize>,
}

/// Grows tributaries off committed rivers
#[derive(Debug, Clone)]
pub struct TributariesGenerator<R = Lcg> {
    config: TributaryConfig,
    rng: R,
    tributaries: Vec<Tributary>,
    cells: BTreeSet<usize>,
    stats: TributaryStats,
}

impl TributariesGenerator<Lcg> {
    /// Create a generator drawing from a seeded [`Lcg`]
    pub fn new(config: TributaryConfig, seed: u64) -> Self {
        Self::with_rng(config, Lcg::new(seed))
    }
}

impl<R: RandomSource> TributariesGenerator<R> {
    /// Create a generator with an explicit random source
    pub fn with_rng(config: TributaryConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            tributaries: Vec::new(),
            cells: BTreeSet::new(),
            stats: TributaryStats::default(),
        }
    }

    /// Branch off every non-empty river, level by level up to `max_depth`
    #[instrument(skip_all, fields(rivers = rivers.len(), max_depth = self.config.max_depth))]
    pub fn generate(&mut self, graph: &mut CellGraph, rivers: &[River]) -> &[Tributary] {
        self.reset(graph);
        if !self.config.enabled {
            return &self.tributaries;
        }
        if graph.is_empty() {
            warn!("tributaries skipped: cell graph is empty");
            return &self.tributaries;
        }

        let mut claimed: BTreeSet<usize> = graph
            .cells()
            .iter()
            .filter(|cell| cell.metadata.is_claimed())
            .map(|cell| cell.id)
            .collect();

        let mut parents: Vec<ParentPath> = rivers
            .iter()
            .filter(|river| !river.is_empty())
            .map(|river| ParentPath {
                path: river.path.clone(),
                river: river.index,
                tributary: None,
            })
            .collect();

        for depth in 1..=self.config.max_depth {
            if parents.is_empty() {
                break;
            }
            let params = LevelParams::for_depth(&self.config, depth);
            let mut next = Vec::new();

            for parent in &parents {
                let added = self.branch_from(graph, parent, depth, params, &mut claimed);
                for index in added {
                    if let Some(tributary) = self.tributaries.get(index) {
                        next.push(ParentPath {
                            path: tributary.path.clone(),
                            river: tributary.river,
                            tributary: Some(index),
                        });
                    }
                }
            }

            debug!(depth, branches = next.len(), "tributary level done");
            parents = next;
        }

        self.stats.cell_count = self.cells.len();
        info!(
            tributaries = self.tributaries.len(),
            failed = self.stats.failed,
            cells = self.stats.cell_count,
            "tributaries generated"
        );
        &self.tributaries
    }

    /// Try every eligible junction on one parent; returns the new tributary indices
    fn branch_from(
        &mut self,
        graph: &mut CellGraph,
        parent: &ParentPath,
        depth: usize,
        params: LevelParams,
        claimed: &mut BTreeSet<usize>,
    ) -> Vec<usize> {
        let path = &parent.path;
        let mut added = Vec::new();
        let mut junctions: Vec<usize> = Vec::new();
        if path.len() < END_MARGIN * 2 + 1 {
            return added;
        }

        for position in END_MARGIN..path.len() - END_MARGIN {
            let junction = path[position];

            let free_neighbors = graph
                .neighbors(junction)
                .iter()
                .filter(|&&n| !claimed.contains(&n))
                .count();
            if free_neighbors < MIN_FREE_NEIGHBORS {
                continue;
            }
            if junctions
                .iter()
                .any(|&other| graph.distance(junction, other) < params.separation)
            {
                continue;
            }
            if !self.rng.chance(params.probability) {
                continue;
            }

            let (Some(upstream), Some(here), Some(downstream)) = (
                graph.position(path[position - 1]),
                graph.position(junction),
                graph.position(path[position + 1]),
            ) else {
                continue;
            };
            let flow = downstream - upstream;
            let side = if self.rng.chance(0.5) { 1.0 } else { -1.0 };

            let Some(source) = self.pick_source(graph, here, flow, side, params, claimed) else {
                trace!(junction, depth, "no source candidate on this side");
                self.stats.no_candidates += 1;
                continue;
            };

            self.stats.attempted += 1;
            let targets: BTreeSet<usize> = [junction].into_iter().collect();
            let search = Pathfinder::new(graph, claimed)
                .with_policy(ClaimPolicy::Penalize(self.config.river_penalty))
                .with_max_iterations(SEARCH_ITERATIONS)
                .find_path(source, &targets);

            let branch = match search {
                Ok(branch) if branch.len() >= 2 => branch,
                Ok(_) => {
                    self.stats.failed += 1;
                    continue;
                }
                Err(failure) => {
                    debug!(junction, source, depth, %failure, "tributary search failed");
                    self.stats.failed += 1;
                    continue;
                }
            };

            let index = self.tributaries.len();
            let tributary = Tributary {
                index,
                depth,
                river: parent.river,
                parent: parent.tributary,
                junction,
                path: branch,
            };
            self.commit(graph, &tributary, claimed);
            debug!(
                index,
                depth,
                junction,
                source,
                len = tributary.path.len(),
                "tributary routed"
            );

            *self.stats.by_depth.entry(depth).or_insert(0) += 1;
            self.stats.succeeded += 1;
            self.tributaries.push(tributary);
            junctions.push(junction);
            added.push(index);
        }

        added
    }

    /// Random pick among the farthest free cells in the distance band on `side`
    fn pick_source(
        &mut self,
        graph: &CellGraph,
        junction: DVec2,
        flow: DVec2,
        side: f64,
        params: LevelParams,
        claimed: &BTreeSet<usize>,
    ) -> Option<usize> {
        let mut candidates: Vec<(usize, f64)> = graph
            .cells()
            .iter()
            .filter(|cell| !claimed.contains(&cell.id))
            .filter(|cell| !cell.metadata.is_coastline() && !cell.metadata.lake)
            .filter_map(|cell| {
                let offset = cell.position() - junction;
                let distance = offset.length();
                let on_side = flow.perp_dot(offset) * side > 0.0;
                (on_side && distance >= params.min_distance && distance <= params.max_distance)
                    .then_some((cell.id, distance))
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        candidates.truncate(TOP_CANDIDATES);

        let pick = self.rng.index(candidates.len())?;
        Some(candidates[pick].0)
    }

    /// Tag the branch cells that no river or earlier branch owns yet
    fn commit(&mut self, graph: &mut CellGraph, tributary: &Tributary, claimed: &mut BTreeSet<usize>) {
        for (position, &id) in tributary.path.iter().enumerate() {
            if claimed.contains(&id) {
                continue;
            }
            if let Some(cell) = graph.get_mut(id) {
                cell.metadata.tributary = Some(TributaryTag {
                    index: tributary.index,
                    depth: tributary.depth,
                    river: tributary.river,
                    position,
                });
            }
            self.cells.insert(id);
            claimed.insert(id);
        }
    }

    /// Remove this generator's tags from the graph and forget its branches
    pub fn reset(&mut self, graph: &mut CellGraph) {
        for &id in &self.cells {
            if let Some(cell) = graph.get_mut(id) {
                cell.metadata.tributary = None;
            }
        }
        self.cells.clear();
        self.tributaries.clear();
        self.stats = TributaryStats::default();
    }

    #[inline]
    pub fn is_tributary_cell(&self, id: usize) -> bool {
        self.cells.contains(&id)
    }

    /// Cells tagged as tributary (junctions and crossed river cells excluded)
    #[inline]
    pub fn tributary_cells(&self) -> &BTreeSet<usize> {
        &self.cells
    }

    #[inline]
    pub fn tributaries(&self) -> &[Tributary] {
        &self.tributaries
    }

    /// Full paths, source to junction
    pub fn tributary_paths(&self) -> Vec<&[usize]> {
        self.tributaries.iter().map(|t| t.path.as_slice()).collect()
    }

    #[inline]
    pub fn tributary_stats(&self) -> &TributaryStats {
        &self.stats
    }

    /// Record one feature per tributary
    pub fn create_tributary_features(&self, graph: &CellGraph, data: &mut TerrainData) -> Result<usize> {
        for tributary in &self.tributaries {
            let mut feature =
                TerrainFeature::new(FeatureType::Tributary, format!("tributary-{}", tributary.index))
                    .with_cells(graph, &tributary.path)
                    .with_path_curve(graph, &tributary.path)
                    .with_meta("depth", tributary.depth)
                    .with_meta("riverIndex", tributary.river)
                    .with_meta("junction", tributary.junction)
                    .with_meta("source", tributary.source());
            if let Some(parent) = tributary.parent {
                feature = feature.with_meta("parent", parent);
            }
            data.add_feature(feature)?;
        }
        Ok(self.tributaries.len())
    }
}

impl<R> CellSet for TributariesGenerator<R> {
    fn cell_ids(&self) -> &BTreeSet<usize> {
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CoastlineConfig, Direction, HillConfig, RiverConfig};
    use crate::features::test_support::random_graph;
    use crate::features::{CoastlineGenerator, HillsGenerator, RiversGenerator};

    fn river_map(seed: u64) -> (CellGraph, Vec<River>) {
        let mut graph = random_graph(250, seed);
        CoastlineGenerator::new(
            CoastlineConfig {
                direction: Some(Direction::East),
                percent: Some(0.1),
                ..Default::default()
            },
            3000,
        )
        .generate(&mut graph)
        .unwrap();
        HillsGenerator::new(HillConfig::default(), 1000).generate(&mut graph);
        let rivers = RiversGenerator::new(RiverConfig::default(), 2000)
            .generate(&mut graph)
            .to_vec();
        (graph, rivers)
    }

    fn eager() -> TributaryConfig {
        TributaryConfig {
            branch_probability: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_branches_join_their_parent() {
        let (mut graph, rivers) = river_map(31);
        let mut generator = TributariesGenerator::new(eager(), 4000);
        let tributaries = generator.generate(&mut graph, &rivers).to_vec();

        for tributary in &tributaries {
            assert!(tributary.depth >= 1 && tributary.depth <= 2);
            assert_eq!(tributary.path.last(), Some(&tributary.junction));
            let parent_path = match tributary.parent {
                Some(parent) => &tributaries[parent].path,
                None => &rivers[tributary.river].path,
            };
            assert!(parent_path.contains(&tributary.junction));
            for pair in tributary.path.windows(2) {
                assert!(graph.neighbors(pair[0]).contains(&pair[1]));
            }
        }
    }

    #[test]
    fn test_sources_respect_distance_band() {
        let (mut graph, rivers) = river_map(32);
        let config = eager();
        let mut generator = TributariesGenerator::new(config, 4000);
        generator.generate(&mut graph, &rivers);

        for tributary in generator.tributaries() {
            let params = LevelParams::for_depth(&config, tributary.depth);
            let distance = graph.distance(tributary.source(), tributary.junction);
            assert!(distance >= params.min_distance - 1e-9);
            assert!(distance <= params.max_distance + 1e-9);
        }
    }

    #[test]
    fn test_river_cells_not_retagged() {
        let (mut graph, rivers) = river_map(33);
        let mut generator = TributariesGenerator::new(eager(), 4000);
        generator.generate(&mut graph, &rivers);

        for &id in generator.tributary_cells() {
            let metadata = &graph.get(id).unwrap().metadata;
            assert!(metadata.river.is_none());
            assert!(metadata.tributary.is_some());
        }
        for river in &rivers {
            for &id in &river.path {
                assert!(!generator.is_tributary_cell(id));
            }
        }
    }

    #[test]
    fn test_disabled_or_zero_probability() {
        let (mut graph, rivers) = river_map(34);
        let disabled = TributaryConfig {
            enabled: false,
            ..eager()
        };
        assert!(TributariesGenerator::new(disabled, 4000)
            .generate(&mut graph, &rivers)
            .is_empty());

        let never = TributaryConfig {
            branch_probability: 0.0,
            ..Default::default()
        };
        assert!(TributariesGenerator::new(never, 4000)
            .generate(&mut graph, &rivers)
            .is_empty());
    }

    #[test]
    fn test_level_params_decay() {
        let config = TributaryConfig::default();
        let first = LevelParams::for_depth(&config, 1);
        let second = LevelParams::for_depth(&config, 2);
        assert_eq!(first.max_distance, 150.0);
        assert!((second.max_distance - 90.0).abs() < 1e-9);
        assert!((second.probability - 0.3).abs() < 1e-9);
        assert!((second.separation - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_determinism() {
        let (mut a, rivers_a) = river_map(35);
        let (mut b, rivers_b) = river_map(35);
        let first = TributariesGenerator::new(eager(), 4000)
            .generate(&mut a, &rivers_a)
            .to_vec();
        let second = TributariesGenerator::new(eager(), 4000)
            .generate(&mut b, &rivers_b)
            .to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn test_features() {
        let (mut graph, rivers) = river_map(36);
        let mut generator = TributariesGenerator::new(eager(), 4000);
        generator.generate(&mut graph, &rivers);

        let mut data = TerrainData::new();
        let added = generator.create_tributary_features(&graph, &mut data).unwrap();
        assert_eq!(added, generator.tributaries().len());
        assert_eq!(data.features_of_type(FeatureType::Tributary).count(), added);
    }
}
