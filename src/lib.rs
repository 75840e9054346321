//! Seeded Voronoi terrain map generation
//!
//! A standalone library for generating flat, square Voronoi maps with
//! coastlines, lakes, marshes, hills, rivers and tributaries, suitable for
//! use with any game engine or renderer.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use voronoi_terrain::*;
//!
//! // Generate a map
//! let config = MapConfigBuilder::new()
//!     .seed(42)
//!     .site_count(200)
//!     .river_count(3)
//!     .hills(HillConfig { budget: 120, origins: 4, gradient_enabled: true })
//!     .build().unwrap();
//!
//! let map = TerrainMap::generate(config).unwrap();
//!
//! // Flatten it for rendering or saving
//! let export = MapExport::from(&map);
//! println!("Generated {} cells, {} rivers", export.cells.len(), export.rivers.len());
//! ```
//!
//! # Features
//!
//! - `spatial-index` (default): Enables O(log n) position-to-cell lookups using KD-tree
//! - `serde`: Enables serialization support for configuration, cells and exports

// Modules
pub mod error;
pub mod config;
pub mod random;
pub mod cell;
pub mod graph;
pub mod generation;
pub mod features;
pub mod terrain;
pub mod map;
pub mod export;

#[cfg(feature = "spatial-index")]
pub mod spatial;

// Re-export core types for convenience
pub use error::{TerrainError, Result};
pub use config::{
    CoastlineConfig, Direction, HillConfig, LakeConfig, MapConfig, MapConfigBuilder, RiverConfig,
    TributaryConfig,
};
pub use random::{Lcg, RandomSource, RngSource, ThreadRandom};
pub use cell::{Cell, CellMetadata, MarshTag, RiverTag, TributaryTag};
pub use graph::CellGraph;
pub use features::{
    CellSet, ClaimPolicy, CoastlineGenerator, HillsGenerator, LakeSource, LakesGenerator,
    MarshGenerator, Pathfinder, River, RiversGenerator, SearchFailure, Tributary,
    TributariesGenerator,
};
pub use terrain::{BezierCurve, FeatureType, MetaValue, TerrainData, TerrainFeature, TILE_SIZE};
pub use map::TerrainMap;
pub use export::{generate_export, ExportCell, ExportEdge, MapExport};
pub use generation::{Point, Triangulation};

#[cfg(feature = "spatial-index")]
pub use spatial::SpatialIndex;

// Re-export glam::DVec2 for convenience
pub use glam::DVec2;
