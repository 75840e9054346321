//! Terrain Map Configuration and Builder
//!
//! This module provides configuration types for deterministic terrain map generation.
//! Every generator gets its own small config struct; [`MapConfig`] bundles them with
//! the shared seed and grid size.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};

/// Seed offset for the hills generator
pub const HILLS_SEED_OFFSET: u64 = 1000;
/// Seed offset for the rivers generator (each river adds its own index)
pub const RIVERS_SEED_OFFSET: u64 = 2000;
/// Seed offset for the coastline generator
pub const COASTLINE_SEED_OFFSET: u64 = 3000;
/// Seed offset for the tributaries generator
pub const TRIBUTARIES_SEED_OFFSET: u64 = 4000;
/// Seed offset for the lakes generator
pub const LAKES_SEED_OFFSET: u64 = 5000;

/// Default side length of the square map
pub const DEFAULT_GRID_SIZE: f64 = 600.0;

/// Compass direction naming one side of the square map
///
/// The map uses screen coordinates: north is `z = 0`, south is `z = grid_size`,
/// west is `x = 0` and east is `x = grid_size`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Top edge (`z = 0`)
    North,
    /// Bottom edge (`z = grid_size`)
    South,
    /// Right edge (`x = grid_size`)
    East,
    /// Left edge (`x = 0`)
    West,
}

impl Direction {
    /// All four directions in draw order
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// The direction on the other side of the map
    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// Distance from `(x, z)` to this side of a `grid_size` square
    pub fn distance_from(self, x: f64, z: f64, grid_size: f64) -> f64 {
        match self {
            Direction::North => z,
            Direction::South => grid_size - z,
            Direction::East => grid_size - x,
            Direction::West => x,
        }
    }

    /// The side of the map closest to `(x, z)`
    ///
    /// Ties resolve in [`Direction::ALL`] order.
    pub fn nearest(x: f64, z: f64, grid_size: f64) -> Self {
        let mut best = Direction::North;
        let mut best_distance = f64::INFINITY;
        for direction in Self::ALL {
            let distance = direction.distance_from(x, z, grid_size);
            if distance < best_distance {
                best = direction;
                best_distance = distance;
            }
        }
        best
    }

    /// Short label used in feature metadata
    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "N",
            Direction::South => "S",
            Direction::East => "E",
            Direction::West => "W",
        }
    }
}

/// Coastline band settings
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoastlineConfig {
    /// Run the coastline stage at all
    pub enabled: bool,
    /// Side of the map to place the coast on; random when `None`
    pub direction: Option<Direction>,
    /// Band thickness as a fraction of the grid size
    ///
    /// Random in `[0.15, 0.20)` when `None` or non-finite. Always clamped to
    /// `[0.05, 0.20]`.
    pub percent: Option<f64>,
    /// Abort the whole pass when no coastline can be placed
    pub required: bool,
}

impl Default for CoastlineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            direction: None,
            percent: None,
            required: false,
        }
    }
}

/// Lake placement settings
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LakeConfig {
    /// Number of lakes to seed
    pub count: usize,
    /// Maximum number of cells in a single lake
    pub max_size: usize,
}

impl Default for LakeConfig {
    fn default() -> Self {
        Self {
            count: 2,
            max_size: 4,
        }
    }
}

/// Elevation settings
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HillConfig {
    /// Total number of hill placements (origins included)
    pub budget: usize,
    /// Number of full-height origin cells
    pub origins: usize,
    /// Blend a map-edge gradient into every cell
    pub gradient_enabled: bool,
}

impl Default for HillConfig {
    fn default() -> Self {
        Self {
            budget: 100,
            origins: 3,
            gradient_enabled: true,
        }
    }
}

/// River pathfinding settings
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiverConfig {
    /// Number of rivers to attempt
    pub count: usize,
    /// Minimum distance between any two start points, and between any two end points
    pub min_separation: f64,
    /// How close to the map edge a start cell must be
    pub edge_margin: f64,
    /// A* iteration cap per river
    pub max_iterations: usize,
}

impl Default for RiverConfig {
    fn default() -> Self {
        Self {
            count: 3,
            min_separation: 50.0,
            edge_margin: 20.0,
            max_iterations: 1000,
        }
    }
}

/// Tributary branching settings
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TributaryConfig {
    /// Run the tributary stage at all
    pub enabled: bool,
    /// Deepest branching level (1 = branches off rivers only)
    pub max_depth: usize,
    /// Chance that an eligible path vertex sprouts a branch at depth 1
    pub branch_probability: f64,
    /// Closest a branch source may be to its junction
    pub min_distance: f64,
    /// Farthest a branch source may be from its junction
    pub max_distance: f64,
    /// Minimum distance between two junctions on the same parent path
    pub branching_separation: f64,
    /// Per-level multiplier applied to probability and all distances
    pub depth_decay: f64,
    /// Cost multiplier for stepping onto an existing river or tributary
    pub river_penalty: f64,
}

impl Default for TributaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: 2,
            branch_probability: 0.5,
            min_distance: 40.0,
            max_distance: 150.0,
            branching_separation: 60.0,
            depth_decay: 0.6,
            river_penalty: 100.0,
        }
    }
}

/// Configuration for deterministic terrain map generation
///
/// The same configuration always produces the identical map: same sites, same
/// cell graph, same heights and the same river paths.
///
/// # Example
///
/// ```rust
/// use voronoi_terrain::*;
///
/// let config = MapConfigBuilder::new()
///     .seed(42)
///     .site_count(120)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.grid_size, 600.0);
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapConfig {
    /// Base seed; each generator offsets it by its own constant
    pub seed: u64,
    /// Side length of the square map
    pub grid_size: f64,
    /// Number of random Voronoi sites
    pub site_count: usize,
    /// Coastline settings
    pub coastline: CoastlineConfig,
    /// Lake settings
    pub lakes: LakeConfig,
    /// Elevation settings
    pub hills: HillConfig,
    /// River settings
    pub rivers: RiverConfig,
    /// Tributary settings
    pub tributaries: TributaryConfig,
}

impl MapConfig {
    /// Seed for a stage, offset from the base seed
    #[inline]
    pub fn stage_seed(&self, offset: u64) -> u64 {
        self.seed.wrapping_add(offset)
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            grid_size: DEFAULT_GRID_SIZE,
            site_count: 200,
            coastline: CoastlineConfig::default(),
            lakes: LakeConfig::default(),
            hills: HillConfig::default(),
            rivers: RiverConfig::default(),
            tributaries: TributaryConfig::default(),
        }
    }
}

/// Builder for creating MapConfig with validation
///
/// # Example
///
/// ```rust
/// use voronoi_terrain::*;
///
/// let config = MapConfigBuilder::new()
///     .seed(12345)
///     .grid_size(800.0)
///     .unwrap()
///     .river_count(2)
///     .hills(HillConfig { budget: 60, origins: 2, gradient_enabled: false })
///     .build()
///     .unwrap();
///
/// assert_eq!(config.rivers.count, 2);
/// ```
#[derive(Debug, Clone)]
pub struct MapConfigBuilder {
    seed: Option<u64>,
    grid_size: f64,
    site_count: usize,
    coastline: CoastlineConfig,
    lakes: LakeConfig,
    hills: HillConfig,
    rivers: RiverConfig,
    tributaries: TributaryConfig,
}

impl MapConfigBuilder {
    /// Create a new builder with default values
    ///
    /// Defaults:
    /// - seed: Random (generated from thread_rng)
    /// - grid_size: 600
    /// - site_count: 200
    /// - every generator config at its `Default`
    pub fn new() -> Self {
        let defaults = MapConfig::default();
        Self {
            seed: None,
            grid_size: defaults.grid_size,
            site_count: defaults.site_count,
            coastline: defaults.coastline,
            lakes: defaults.lakes,
            hills: defaults.hills,
            rivers: defaults.rivers,
            tributaries: defaults.tributaries,
        }
    }

    /// Set the base seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the side length of the square map
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the size is not a positive finite number
    pub fn grid_size(mut self, grid_size: f64) -> Result<Self> {
        if !grid_size.is_finite() || grid_size <= 0.0 {
            return Err(TerrainError::InvalidConfig(format!(
                "grid size must be positive (got {})",
                grid_size
            )));
        }
        self.grid_size = grid_size;
        Ok(self)
    }

    /// Set the number of random sites
    ///
    /// Fewer than three sites produce an empty graph rather than an error.
    pub fn site_count(mut self, count: usize) -> Self {
        self.site_count = count;
        self
    }

    /// Replace the coastline settings
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a finite percent is not positive
    pub fn coastline(mut self, coastline: CoastlineConfig) -> Result<Self> {
        if let Some(percent) = coastline.percent {
            if percent.is_finite() && percent <= 0.0 {
                return Err(TerrainError::InvalidConfig(format!(
                    "coastline percent must be positive (got {})",
                    percent
                )));
            }
        }
        self.coastline = coastline;
        Ok(self)
    }

    /// Replace the lake settings
    pub fn lakes(mut self, lakes: LakeConfig) -> Self {
        self.lakes = lakes;
        self
    }

    /// Replace the elevation settings
    pub fn hills(mut self, hills: HillConfig) -> Self {
        self.hills = hills;
        self
    }

    /// Set the number of rivers, keeping the other river settings
    pub fn river_count(mut self, count: usize) -> Self {
        self.rivers.count = count;
        self
    }

    /// Replace the river settings
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for negative distances or a zero iteration cap
    pub fn rivers(mut self, rivers: RiverConfig) -> Result<Self> {
        if rivers.min_separation < 0.0 || rivers.edge_margin < 0.0 {
            return Err(TerrainError::InvalidConfig(
                "river separation and edge margin must be >= 0".to_string(),
            ));
        }
        if rivers.max_iterations == 0 {
            return Err(TerrainError::InvalidConfig(
                "river search needs at least one iteration".to_string(),
            ));
        }
        self.rivers = rivers;
        Ok(self)
    }

    /// Replace the tributary settings
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the probability or decay leaves `[0, 1]`, or
    /// if `min_distance > max_distance`
    pub fn tributaries(mut self, tributaries: TributaryConfig) -> Result<Self> {
        if !(0.0..=1.0).contains(&tributaries.branch_probability) {
            return Err(TerrainError::InvalidConfig(format!(
                "branch probability must be within [0, 1] (got {})",
                tributaries.branch_probability
            )));
        }
        if !(0.0..=1.0).contains(&tributaries.depth_decay) {
            return Err(TerrainError::InvalidConfig(format!(
                "depth decay must be within [0, 1] (got {})",
                tributaries.depth_decay
            )));
        }
        if tributaries.min_distance > tributaries.max_distance {
            return Err(TerrainError::InvalidConfig(format!(
                "tributary min distance {} exceeds max distance {}",
                tributaries.min_distance, tributaries.max_distance
            )));
        }
        self.tributaries = tributaries;
        Ok(self)
    }

    /// Build the configuration
    ///
    /// If no seed was provided, generates a random seed using thread_rng.
    pub fn build(self) -> Result<MapConfig> {
        let seed = self.seed.unwrap_or_else(|| u64::from(rand::random::<u32>()));

        Ok(MapConfig {
            seed,
            grid_size: self.grid_size,
            site_count: self.site_count,
            coastline: self.coastline,
            lakes: self.lakes,
            hills: self.hills,
            rivers: self.rivers,
            tributaries: self.tributaries,
        })
    }
}

impl Default for MapConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = MapConfigBuilder::new().build().unwrap();
        assert_eq!(config.grid_size, 600.0);
        assert_eq!(config.site_count, 200);
        assert_eq!(config.rivers.min_separation, 50.0);
        assert_eq!(config.rivers.max_iterations, 1000);
        assert_eq!(config.hills.budget, 100);
    }

    #[test]
    fn test_builder_custom() {
        let config = MapConfigBuilder::new()
            .seed(42)
            .site_count(50)
            .river_count(2)
            .hills(HillConfig {
                budget: 10,
                origins: 1,
                gradient_enabled: false,
            })
            .build()
            .unwrap();

        assert_eq!(config.seed, 42);
        assert_eq!(config.site_count, 50);
        assert_eq!(config.rivers.count, 2);
        assert!(!config.hills.gradient_enabled);
    }

    #[test]
    fn test_builder_invalid_grid() {
        assert!(MapConfigBuilder::new().grid_size(0.0).is_err());
        assert!(MapConfigBuilder::new().grid_size(-5.0).is_err());
        assert!(MapConfigBuilder::new().grid_size(f64::NAN).is_err());
    }

    #[test]
    fn test_builder_invalid_tributaries() {
        let bad_probability = TributaryConfig {
            branch_probability: 1.5,
            ..Default::default()
        };
        assert!(MapConfigBuilder::new().tributaries(bad_probability).is_err());

        let bad_band = TributaryConfig {
            min_distance: 200.0,
            max_distance: 100.0,
            ..Default::default()
        };
        assert!(MapConfigBuilder::new().tributaries(bad_band).is_err());
    }

    #[test]
    fn test_non_finite_coast_percent_is_accepted() {
        let coastline = CoastlineConfig {
            percent: Some(f64::NAN),
            ..Default::default()
        };
        assert!(MapConfigBuilder::new().coastline(coastline).is_ok());

        let coastline = CoastlineConfig {
            percent: Some(-0.1),
            ..Default::default()
        };
        assert!(MapConfigBuilder::new().coastline(coastline).is_err());
    }

    #[test]
    fn test_stage_seed_offsets() {
        let config = MapConfigBuilder::new().seed(12345).build().unwrap();
        assert_eq!(config.stage_seed(RIVERS_SEED_OFFSET), 14345);
    }

    #[test]
    fn test_direction_helpers() {
        assert_eq!(Direction::North.opposite(), Direction::South);
        assert_eq!(Direction::East.opposite(), Direction::West);
        assert_eq!(Direction::nearest(5.0, 300.0, 600.0), Direction::West);
        assert_eq!(Direction::nearest(300.0, 590.0, 600.0), Direction::South);
        assert_eq!(Direction::South.distance_from(0.0, 590.0, 600.0), 10.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_serialization() {
        let config = MapConfigBuilder::new().seed(12345).build().unwrap();

        let json = serde_json::to_string(&config).unwrap();
        let restored: MapConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config, restored);
    }
}
