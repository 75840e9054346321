//! Random site placement
//!
//! Sites are drawn uniformly inside the square map from the caller's
//! [`RandomSource`], `x` first and then `z` for each site, so a seeded source
//! always produces the same layout.

use crate::generation::geometry::Point;
use crate::random::RandomSource;

/// Generate `count` uniformly distributed sites inside `[0, grid_size)²`
///
/// # Example
///
/// ```rust
/// use voronoi_terrain::generation::generate_sites;
/// use voronoi_terrain::Lcg;
///
/// let sites = generate_sites(50, 600.0, &mut Lcg::new(12345));
/// assert_eq!(sites.len(), 50);
/// ```
pub fn generate_sites<R: RandomSource>(count: usize, grid_size: f64, rng: &mut R) -> Vec<Point> {
    (0..count)
        .map(|_| {
            let x = rng.next_f64() * grid_size;
            let z = rng.next_f64() * grid_size;
            Point::new(x, z)
        })
        .collect()
}
