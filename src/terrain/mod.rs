//! Terrain feature catalog
//!
//! Each generator records its geometric output here as [`TerrainFeature`]
//! values: a centroid, smoothed curves, point sets, the tiles it touches and a
//! little metadata. Renderers and exporters read the catalog without knowing
//! how the features were produced.

mod bezier;

pub use bezier::{BezierCurve, CubicSegment};

use glam::DVec2;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};
use crate::generation::centroid;
use crate::graph::CellGraph;

/// Side length of one affected-tile square, in world units
pub const TILE_SIZE: f64 = 10.0;

/// Kind of terrain feature
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureType {
    /// Coastline band
    Coastline,
    /// Lake
    Lake,
    /// Connected marsh area
    Marsh,
    /// Hill region grown from one origin
    Hill,
    /// River path
    River,
    /// Tributary path
    Tributary,
}

impl FeatureType {
    /// Lowercase name used as the feature id prefix
    pub fn name(self) -> &'static str {
        match self {
            FeatureType::Coastline => "coastline",
            FeatureType::Lake => "lake",
            FeatureType::Marsh => "marsh",
            FeatureType::Hill => "hill",
            FeatureType::River => "river",
            FeatureType::Tributary => "tributary",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A metadata value attached to a feature
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    /// Integer value
    Int(i64),
    /// Floating-point value
    Float(f64),
    /// Text value
    Text(String),
    /// Boolean value
    Flag(bool),
    /// List of cell ids
    CellIds(Vec<usize>),
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Int(value)
    }
}

impl From<usize> for MetaValue {
    fn from(value: usize) -> Self {
        MetaValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::Float(value)
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Text(value.to_string())
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        MetaValue::Flag(value)
    }
}

impl From<Vec<usize>> for MetaValue {
    fn from(value: Vec<usize>) -> Self {
        MetaValue::CellIds(value)
    }
}

/// Geometric record of one generated feature
///
/// Built by the generator that owns it through the `with_*` methods and then
/// handed to [`TerrainData`]; after that it is read-only.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainFeature {
    feature_type: FeatureType,
    id: String,
    centroid: DVec2,
    curves: Vec<BezierCurve>,
    point_sets: Vec<Vec<DVec2>>,
    affected_tiles: Vec<(i64, i64)>,
    metadata: BTreeMap<String, MetaValue>,
}

impl TerrainFeature {
    /// Create an empty feature
    pub fn new(feature_type: FeatureType, id: impl Into<String>) -> Self {
        Self {
            feature_type,
            id: id.into(),
            centroid: DVec2::ZERO,
            curves: Vec::new(),
            point_sets: Vec::new(),
            affected_tiles: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Populate centroid, point set and affected tiles from a list of cells
    ///
    /// The centroid is the mean site position; tiles are deduplicated and
    /// keep first-seen order.
    pub fn with_cells(mut self, graph: &CellGraph, cell_ids: &[usize]) -> Self {
        let positions: Vec<DVec2> = cell_ids
            .iter()
            .filter_map(|&id| graph.position(id))
            .collect();

        self.centroid = centroid(&positions).unwrap_or(DVec2::ZERO);
        let mut tiles = Vec::new();
        for position in &positions {
            let tile = tile_of(*position);
            if !tiles.contains(&tile) {
                tiles.push(tile);
            }
        }
        self.affected_tiles = tiles;
        self.point_sets.push(positions);
        self.metadata
            .insert("cells".to_string(), MetaValue::CellIds(cell_ids.to_vec()));
        self
    }

    /// Add a smoothed curve through the sites of `path`
    pub fn with_path_curve(mut self, graph: &CellGraph, path: &[usize]) -> Self {
        let points: Vec<DVec2> = path.iter().filter_map(|&id| graph.position(id)).collect();
        let curve = BezierCurve::through(&points);
        if !curve.is_empty() {
            self.curves.push(curve);
        }
        self
    }

    /// Add an extra point set
    pub fn with_points(mut self, points: Vec<DVec2>) -> Self {
        self.point_sets.push(points);
        self
    }

    /// Attach a metadata value
    pub fn with_meta(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Feature kind
    #[inline]
    pub fn feature_type(&self) -> FeatureType {
        self.feature_type
    }

    /// Unique id within the catalog
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Mean position of the feature's cells
    #[inline]
    pub fn centroid(&self) -> DVec2 {
        self.centroid
    }

    /// Smoothed curves
    #[inline]
    pub fn curves(&self) -> &[BezierCurve] {
        &self.curves
    }

    /// Point distributions
    #[inline]
    pub fn point_sets(&self) -> &[Vec<DVec2>] {
        &self.point_sets
    }

    /// Tile coordinates touched by the feature
    #[inline]
    pub fn affected_tiles(&self) -> &[(i64, i64)] {
        &self.affected_tiles
    }

    /// Look up a metadata value
    pub fn meta(&self, key: &str) -> Option<&MetaValue> {
        self.metadata.get(key)
    }

    /// All metadata
    #[inline]
    pub fn metadata(&self) -> &BTreeMap<String, MetaValue> {
        &self.metadata
    }
}

/// Tile coordinate containing a position
#[inline]
pub fn tile_of(position: DVec2) -> (i64, i64) {
    (
        (position.x / TILE_SIZE).floor() as i64,
        (position.y / TILE_SIZE).floor() as i64,
    )
}

/// Append-only feature catalog, keyed by feature id in insertion order
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct TerrainData {
    features: IndexMap<String, TerrainFeature>,
}

impl TerrainData {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature
    ///
    /// # Errors
    ///
    /// Returns `DuplicateFeature` if the id is already present; the existing
    /// feature is left untouched.
    pub fn add_feature(&mut self, feature: TerrainFeature) -> Result<()> {
        if self.features.contains_key(feature.id()) {
            return Err(TerrainError::DuplicateFeature(feature.id().to_string()));
        }
        self.features.insert(feature.id().to_string(), feature);
        Ok(())
    }

    /// Look up a feature by id
    pub fn get(&self, id: &str) -> Option<&TerrainFeature> {
        self.features.get(id)
    }

    /// All features in insertion order
    pub fn features(&self) -> impl Iterator<Item = &TerrainFeature> {
        self.features.values()
    }

    /// Features of one kind in insertion order
    pub fn features_of_type(&self, feature_type: FeatureType) -> impl Iterator<Item = &TerrainFeature> {
        self.features
            .values()
            .filter(move |f| f.feature_type() == feature_type)
    }

    /// Number of features
    #[inline]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// True for an empty catalog
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Drop every feature (used on regeneration)
    pub fn clear(&mut self) {
        self.features.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use crate::generation::Point;

    fn tiny_graph() -> CellGraph {
        let cells = vec![
            Cell::new(0, Point::new(5.0, 5.0), vec![], vec![1]),
            Cell::new(1, Point::new(15.0, 5.0), vec![], vec![0, 2]),
            Cell::new(2, Point::new(17.0, 25.0), vec![], vec![1]),
        ];
        CellGraph::new(cells, vec![], 100.0)
    }

    #[test]
    fn test_feature_from_cells() {
        let graph = tiny_graph();
        let feature = TerrainFeature::new(FeatureType::River, "river-0")
            .with_cells(&graph, &[0, 1, 2])
            .with_path_curve(&graph, &[0, 1, 2])
            .with_meta("riverIndex", 0usize);

        assert_eq!(feature.id(), "river-0");
        assert_eq!(feature.feature_type(), FeatureType::River);
        assert!((feature.centroid() - DVec2::new(37.0 / 3.0, 35.0 / 3.0)).length() < 1e-9);
        assert_eq!(feature.affected_tiles(), &[(0, 0), (1, 0), (1, 2)]);
        assert_eq!(feature.curves().len(), 1);
        assert_eq!(feature.point_sets()[0].len(), 3);
        assert_eq!(feature.meta("riverIndex"), Some(&MetaValue::Int(0)));
        assert_eq!(
            feature.meta("cells"),
            Some(&MetaValue::CellIds(vec![0, 1, 2]))
        );
    }

    #[test]
    fn test_catalog_is_append_only() {
        let mut data = TerrainData::new();
        data.add_feature(TerrainFeature::new(FeatureType::Lake, "lake-0").with_meta("size", 3usize))
            .unwrap();

        let duplicate = TerrainFeature::new(FeatureType::Lake, "lake-0");
        assert_eq!(
            data.add_feature(duplicate),
            Err(TerrainError::DuplicateFeature("lake-0".to_string()))
        );
        assert_eq!(data.get("lake-0").unwrap().meta("size"), Some(&MetaValue::Int(3)));

        data.add_feature(TerrainFeature::new(FeatureType::Marsh, "marsh-0"))
            .unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.features_of_type(FeatureType::Lake).count(), 1);

        let ids: Vec<&str> = data.features().map(TerrainFeature::id).collect();
        assert_eq!(ids, vec!["lake-0", "marsh-0"]);

        data.clear();
        assert!(data.is_empty());
    }

    #[test]
    fn test_tile_of() {
        assert_eq!(tile_of(DVec2::new(0.0, 0.0)), (0, 0));
        assert_eq!(tile_of(DVec2::new(19.9, 30.0)), (1, 3));
        assert_eq!(tile_of(DVec2::new(-0.5, 5.0)), (-1, 0));
    }
}
