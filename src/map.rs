//! TerrainMap main structure
//!
//! Owns the cell graph and every feature generator, and runs the stages in
//! their fixed order: coastline, lakes, hills, marsh, rivers, tributaries.

#[cfg(feature = "spatial-index")]
use glam::DVec2;
use tracing::{info, instrument, warn};

use crate::cell::Cell;
use crate::config::{
    MapConfig, COASTLINE_SEED_OFFSET, HILLS_SEED_OFFSET, LAKES_SEED_OFFSET, RIVERS_SEED_OFFSET,
    TRIBUTARIES_SEED_OFFSET,
};
use crate::error::Result;
use crate::features::{
    CoastlineGenerator, HillsGenerator, LakesGenerator, MarshGenerator, RiversGenerator,
    TributariesGenerator,
};
use crate::generation::{generate_diagram, generate_sites, Point, Triangulation};
use crate::graph::CellGraph;
use crate::random::Lcg;
use crate::terrain::TerrainData;

#[cfg(feature = "spatial-index")]
use crate::spatial::SpatialIndex;

/// A complete generated terrain map
///
/// Built in one pass from a [`MapConfig`]. The same configuration always
/// gives the same sites, graph, heights and paths.
///
/// # Examples
///
/// ```
/// use voronoi_terrain::*;
///
/// let config = MapConfigBuilder::new()
///     .seed(42)
///     .site_count(80)
///     .build()
///     .unwrap();
///
/// let map = TerrainMap::generate(config).unwrap();
/// println!("Generated {} cells", map.cell_count());
///
/// for river in map.rivers().river_paths() {
///     println!("river with {} cells", river.len());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TerrainMap {
    /// Configuration used to generate this map
    config: MapConfig,

    /// Delaunay triangulation of the sites
    triangulation: Triangulation,

    /// All cells (indexed by cell ID) with adjacency and metadata
    graph: CellGraph,

    coastline: CoastlineGenerator,
    lakes: LakesGenerator,
    hills: HillsGenerator,
    marsh: MarshGenerator,
    rivers: RiversGenerator,
    tributaries: TributariesGenerator,

    /// Geometric records produced by the generators
    terrain_data: TerrainData,

    /// Spatial index for fast position-to-cell lookups (optional, requires spatial-index feature)
    #[cfg(feature = "spatial-index")]
    spatial_index: SpatialIndex,
}

impl TerrainMap {
    /// Generate a map from random sites
    ///
    /// Sites come from an [`Lcg`] seeded with `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns `CoastlineUnsatisfiable` only when the coastline is marked as
    /// required and no band could be placed.
    pub fn generate(config: MapConfig) -> Result<Self> {
        let sites = generate_sites(config.site_count, config.grid_size, &mut Lcg::new(config.seed));
        Self::from_points(config, sites)
    }

    /// Generate a map over caller-supplied sites
    ///
    /// `config.site_count` is ignored; every site gets a cell whose id is its
    /// index in `sites`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPoint` for a site outside `[0, grid_size]²`, and the
    /// same coastline error as [`TerrainMap::generate`].
    #[instrument(skip_all, fields(seed = config.seed, sites = sites.len()))]
    pub fn from_points(config: MapConfig, sites: Vec<Point>) -> Result<Self> {
        let (triangulation, diagram) = generate_diagram(&sites, config.grid_size)?;
        let graph = CellGraph::from_diagram(diagram, config.grid_size);

        #[cfg(feature = "spatial-index")]
        let spatial_index = {
            let positions: Vec<DVec2> = graph.cells().iter().map(Cell::position).collect();
            SpatialIndex::new(&positions)
        };

        let mut map = Self {
            config,
            triangulation,
            graph,
            coastline: CoastlineGenerator::new(config.coastline, config.stage_seed(COASTLINE_SEED_OFFSET)),
            lakes: LakesGenerator::new(config.lakes, config.stage_seed(LAKES_SEED_OFFSET)),
            hills: HillsGenerator::new(config.hills, config.stage_seed(HILLS_SEED_OFFSET)),
            marsh: MarshGenerator::new(),
            rivers: RiversGenerator::new(config.rivers, config.stage_seed(RIVERS_SEED_OFFSET)),
            tributaries: TributariesGenerator::new(
                config.tributaries,
                config.stage_seed(TRIBUTARIES_SEED_OFFSET),
            ),
            terrain_data: TerrainData::new(),
            #[cfg(feature = "spatial-index")]
            spatial_index,
        };
        map.run_stages()?;
        Ok(map)
    }

    /// Throw everything away and generate again with `config`
    ///
    /// On error the map is left empty rather than half-built.
    pub fn regenerate(&mut self, config: MapConfig) -> Result<()> {
        match Self::generate(config) {
            Ok(map) => {
                *self = map;
                Ok(())
            }
            Err(error) => {
                self.clear();
                Err(error)
            }
        }
    }

    fn clear(&mut self) {
        self.coastline.reset(&mut self.graph);
        self.lakes.reset(&mut self.graph);
        self.hills.reset(&mut self.graph);
        self.marsh.reset(&mut self.graph);
        self.rivers.reset(&mut self.graph);
        self.tributaries.reset(&mut self.graph);
        self.terrain_data.clear();
        self.graph = CellGraph::default();
        self.triangulation = Triangulation::default();
        #[cfg(feature = "spatial-index")]
        {
            self.spatial_index = SpatialIndex::new(&[]);
        }
    }

    fn run_stages(&mut self) -> Result<()> {
        self.graph.clear_metadata();
        self.terrain_data.clear();
        let graph = &mut self.graph;

        if self.config.coastline.enabled {
            if let Err(error) = self.coastline.generate(graph) {
                if self.config.coastline.required {
                    return Err(error);
                }
                warn!(%error, "continuing without a coastline");
            }
        } else {
            self.coastline.reset(graph);
        }

        self.lakes.generate(graph);
        self.hills.generate(graph);
        self.marsh.generate(graph, &self.coastline, &self.lakes);
        self.rivers.generate(graph);
        self.tributaries.generate(graph, self.rivers.rivers());

        let graph = &self.graph;
        let data = &mut self.terrain_data;
        let mut features = self.coastline.create_coastline_features(graph, data)?;
        features += self.lakes.create_lake_features(graph, data)?;
        features += self.hills.create_hill_features(graph, data)?;
        features += self.marsh.create_marsh_features(graph, data)?;
        features += self.rivers.create_river_features(graph, data)?;
        features += self.tributaries.create_tributary_features(graph, data)?;

        info!(
            cells = self.graph.len(),
            triangles = self.triangulation.triangle_count(),
            features,
            "terrain map generated"
        );
        Ok(())
    }

    /// Get the configuration used to generate this map
    #[inline]
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Get the number of cells
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.graph.len()
    }

    /// The cell graph with all metadata
    #[inline]
    pub fn graph(&self) -> &CellGraph {
        &self.graph
    }

    /// The Delaunay triangulation the cells were built from
    #[inline]
    pub fn triangulation(&self) -> &Triangulation {
        &self.triangulation
    }

    /// Get a cell by ID
    ///
    /// Returns `None` if the cell ID is out of bounds.
    #[inline]
    pub fn get_cell(&self, id: usize) -> Option<&Cell> {
        self.graph.get(id)
    }

    /// Get all cells as a slice
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        self.graph.cells()
    }

    /// Get neighbor IDs for a cell
    ///
    /// Returns empty slice if cell ID is invalid.
    pub fn get_neighbors(&self, cell_id: usize) -> &[usize] {
        self.graph.neighbors(cell_id)
    }

    /// Cells within `hops` steps of `center_id`, center included
    pub fn find_cells_within_hops(&self, center_id: usize, hops: usize) -> Vec<usize> {
        self.graph.find_cells_within_hops(center_id, hops)
    }

    /// Find the cell containing a position (requires spatial-index feature)
    ///
    /// # Example
    ///
    /// ```
    /// # use voronoi_terrain::*;
    /// # #[cfg(feature = "spatial-index")]
    /// # {
    /// # let map = TerrainMap::generate(MapConfigBuilder::new().seed(3).site_count(60).build().unwrap()).unwrap();
    /// let site = map.get_cell(0).unwrap().position();
    /// assert_eq!(map.find_cell_at(site), Some(0));
    /// # }
    /// ```
    #[cfg(feature = "spatial-index")]
    pub fn find_cell_at(&self, position: DVec2) -> Option<usize> {
        self.spatial_index.find_nearest(position)
    }

    #[inline]
    pub fn coastline(&self) -> &CoastlineGenerator {
        &self.coastline
    }

    #[inline]
    pub fn lakes(&self) -> &LakesGenerator {
        &self.lakes
    }

    #[inline]
    pub fn hills(&self) -> &HillsGenerator {
        &self.hills
    }

    #[inline]
    pub fn marsh(&self) -> &MarshGenerator {
        &self.marsh
    }

    #[inline]
    pub fn rivers(&self) -> &RiversGenerator {
        &self.rivers
    }

    #[inline]
    pub fn tributaries(&self) -> &TributariesGenerator {
        &self.tributaries
    }

    /// Feature catalog filled by the last pass
    #[inline]
    pub fn terrain_data(&self) -> &TerrainData {
        &self.terrain_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CoastlineConfig, Direction, MapConfigBuilder};
    use crate::error::TerrainError;
    use crate::features::LakeSource;
    use crate::terrain::FeatureType;

    fn small_config(seed: u64) -> MapConfig {
        MapConfigBuilder::new()
            .seed(seed)
            .site_count(120)
            .build()
            .unwrap()
    }

    #[test]
    fn test_map_generation() {
        let map = TerrainMap::generate(small_config(42)).unwrap();

        assert_eq!(map.cell_count(), 120);
        assert!(map.triangulation().triangle_count() > 0);
        assert!(map.cells().iter().all(|c| c.metadata.height.is_some()));
        assert!(!map.terrain_data().is_empty());
    }

    #[test]
    fn test_get_cell_and_neighbors() {
        let map = TerrainMap::generate(small_config(42)).unwrap();

        assert!(map.get_cell(0).is_some());
        assert!(map.get_cell(map.cell_count()).is_none());
        assert!(!map.get_neighbors(0).is_empty());
        assert!(map.get_neighbors(999_999).is_empty());
    }

    #[cfg(feature = "spatial-index")]
    #[test]
    fn test_find_cell_at() {
        let map = TerrainMap::generate(small_config(7)).unwrap();
        for id in [0, 10, 50] {
            let site = map.get_cell(id).unwrap().position();
            assert_eq!(map.find_cell_at(site), Some(id));
        }
    }

    #[test]
    fn test_find_cells_within_hops() {
        let map = TerrainMap::generate(small_config(9)).unwrap();
        assert_eq!(map.find_cells_within_hops(0, 0), vec![0]);
        assert_eq!(
            map.find_cells_within_hops(0, 1).len(),
            1 + map.get_neighbors(0).len()
        );
    }

    #[test]
    fn test_flags_match_generator_sets() {
        let map = TerrainMap::generate(small_config(11)).unwrap();
        for cell in map.cells() {
            let id = cell.id;
            assert_eq!(cell.metadata.is_coastline(), map.coastline().is_coastline_cell(id));
            assert_eq!(cell.metadata.lake, map.lakes().lake_cells().contains(&id));
            assert_eq!(cell.metadata.hill, map.hills().is_hill_cell(id));
            assert_eq!(cell.metadata.is_marsh(), map.marsh().is_marsh_cell(id));
            assert_eq!(cell.metadata.is_river(), map.rivers().is_river_cell(id));
            assert_eq!(cell.metadata.is_tributary(), map.tributaries().is_tributary_cell(id));
        }
    }

    #[test]
    fn test_regenerate_replaces_everything() {
        let mut map = TerrainMap::generate(small_config(1)).unwrap();
        map.regenerate(small_config(2)).unwrap();

        let fresh = TerrainMap::generate(small_config(2)).unwrap();
        assert_eq!(map.config().seed, 2);
        assert_eq!(map.terrain_data().len(), fresh.terrain_data().len());
        for (a, b) in map.cells().iter().zip(fresh.cells()) {
            assert_eq!(a.metadata, b.metadata);
        }
    }

    #[test]
    fn test_required_coastline_propagates() {
        let sites = vec![
            Point::new(250.0, 250.0),
            Point::new(350.0, 260.0),
            Point::new(300.0, 340.0),
        ];
        let coastline = CoastlineConfig {
            direction: Some(Direction::North),
            percent: Some(0.05),
            required: true,
            ..Default::default()
        };
        let config = MapConfigBuilder::new()
            .seed(5)
            .coastline(coastline)
            .unwrap()
            .build()
            .unwrap();

        let result = TerrainMap::from_points(config, sites.clone());
        assert!(matches!(
            result,
            Err(TerrainError::CoastlineUnsatisfiable { attempts: 4, .. })
        ));

        let optional = MapConfig {
            coastline: CoastlineConfig {
                required: false,
                ..coastline
            },
            ..config
        };
        let map = TerrainMap::from_points(optional, sites).unwrap();
        assert!(map.coastline().coastline_cells().is_empty());
        assert_eq!(map.terrain_data().features_of_type(FeatureType::Coastline).count(), 0);
    }

    #[test]
    fn test_invalid_point_rejected() {
        let sites = vec![
            Point::new(10.0, 10.0),
            Point::new(700.0, 10.0),
            Point::new(10.0, 300.0),
        ];
        let result = TerrainMap::from_points(MapConfig::default(), sites);
        assert!(matches!(result, Err(TerrainError::InvalidPoint { .. })));
    }

    #[test]
    fn test_too_few_sites() {
        let config = MapConfigBuilder::new().seed(1).site_count(2).build().unwrap();
        let map = TerrainMap::generate(config).unwrap();
        assert_eq!(map.triangulation().triangle_count(), 0);
        assert!(map.rivers().river_paths().is_empty());
    }
}
