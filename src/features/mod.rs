//! Feature generators
//!
//! Each generator owns its random source, its configuration and the set of
//! cells it has claimed, and mirrors that set onto the matching
//! [`CellMetadata`](crate::CellMetadata) field. Generators run in a fixed
//! order: coastline and lakes, hills, marsh, rivers, tributaries.

mod coastline;
mod hills;
mod lakes;
mod marsh;
mod pathfinder;
mod rivers;
mod tributaries;

pub use coastline::{CoastlineGenerator, CoastlineStats, MAX_COASTLINE_RETRIES};
pub use hills::{HillStats, HillsGenerator, HILL_MAX_HEIGHT};
pub use lakes::{LakeStats, LakesGenerator};
pub use marsh::{MarshGenerator, MarshStats, MARSH_MAX_DISTANCE};
pub use pathfinder::{step_cost, ClaimPolicy, Pathfinder, SearchFailure};
pub use rivers::{River, RiverStats, RiversGenerator};
pub use tributaries::{Tributary, TributaryStats, TributariesGenerator};

use std::collections::BTreeSet;

/// Anything exposing a set of claimed cell ids
pub trait CellSet {
    /// The claimed cell ids, sorted
    fn cell_ids(&self) -> &BTreeSet<usize>;

    /// True when `id` is claimed
    fn contains_cell(&self, id: usize) -> bool {
        self.cell_ids().contains(&id)
    }
}

impl CellSet for BTreeSet<usize> {
    fn cell_ids(&self) -> &BTreeSet<usize> {
        self
    }
}

/// Collaborator interface for whatever places lakes
pub trait LakeSource {
    /// All lake cells
    fn lake_cells(&self) -> &BTreeSet<usize>;

    /// True when `id` is a lake cell
    fn is_lake_cell(&self, id: usize) -> bool {
        self.lake_cells().contains(&id)
    }
}

impl LakeSource for BTreeSet<usize> {
    fn lake_cells(&self) -> &BTreeSet<usize> {
        self
    }
}
