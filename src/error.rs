//! Error types for terrain map generation

use thiserror::Error;

use crate::config::Direction;

/// Errors that can occur during map generation or queries
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TerrainError {
    /// Configuration validation failed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A caller-supplied site lies outside the square grid
    #[error("site ({x}, {z}) lies outside the grid [0, {grid_size}]")]
    InvalidPoint {
        /// Site x coordinate
        x: f64,
        /// Site z coordinate
        z: f64,
        /// Grid side length
        grid_size: f64,
    },
    /// Requested cell ID does not exist
    #[error("cell not found: {0}")]
    CellNotFound(usize),
    /// No cell fell inside the coastline band, even after widening it
    #[error("no coastline cells along {direction:?} after {attempts} attempts (thickness {thickness:.1})")]
    CoastlineUnsatisfiable {
        /// Side of the map the band was placed on
        direction: Direction,
        /// Total attempts including the first one
        attempts: usize,
        /// Final band thickness in world units
        thickness: f64,
    },
    /// The terrain catalog is append-only and the id is taken
    #[error("duplicate terrain feature id: {0}")]
    DuplicateFeature(String),
}

/// Result type alias for terrain operations
pub type Result<T> = std::result::Result<T, TerrainError>;
