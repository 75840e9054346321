//! Complete workflow demonstration for voronoi_terrain
//!
//! Run with `RUST_LOG=voronoi_terrain=debug` to see the per-stage logs.

use tracing_subscriber::EnvFilter;
use voronoi_terrain::*;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== voronoi_terrain Complete Demo ===\n");

    // Step 1: Configure map
    println!("Step 1: Configuring map...");
    let config = MapConfigBuilder::new()
        .seed(12345)
        .site_count(300)
        .coastline(CoastlineConfig {
            direction: Some(Direction::South),
            ..CoastlineConfig::default()
        })?
        .river_count(3)
        .build()?;

    println!("  Seed: {}", config.seed);
    println!("  Grid: {} ({} sites)", config.grid_size, config.site_count);

    // Step 2: Generate map
    println!("\nStep 2: Generating map...");
    let map = TerrainMap::generate(config)?;
    println!("  Generated {} cells", map.cell_count());
    println!("  Triangles: {}", map.triangulation().triangle_count());

    // Step 3: Feature summary
    println!("\nStep 3: Features:");
    let coast = map.coastline().coastline_stats();
    println!(
        "  Coastline: {} cells on {} (thickness {:.1})",
        coast.cell_count,
        coast.direction.map_or("-", Direction::name),
        coast.thickness
    );
    let lakes = map.lakes().lake_stats();
    println!("  Lakes: {} ({} cells)", lakes.lake_count, lakes.cell_count);
    let hills = map.hills().hill_stats();
    println!(
        "  Hills: {} cells from {} origins, heights {:.1}..{:.1}",
        hills.hill_cells, hills.origins, hills.min_height, hills.max_height
    );
    let marsh = map.marsh().marsh_stats();
    println!("  Marsh: {} cells in {} patches", marsh.cell_count, marsh.component_count);
    let rivers = map.rivers().river_stats();
    println!("  Rivers: {}/{} routed", rivers.succeeded, rivers.attempted);
    let tributaries = map.tributaries().tributary_stats();
    println!("  Tributaries: {} ({} cells)", tributaries.succeeded, tributaries.cell_count);

    for river in map.rivers().rivers().iter().filter(|r| !r.is_empty()) {
        println!(
            "    river {}: {} cells, {:?} -> {:?}",
            river.index,
            river.len(),
            river.start,
            river.end()
        );
    }

    // Step 4: Query spatial index
    #[cfg(feature = "spatial-index")]
    {
        println!("\nStep 4: Spatial queries:");
        let position = DVec2::new(300.0, 300.0);
        if let Some(cell) = map.find_cell_at(position).and_then(|id| map.get_cell(id)) {
            println!("  Position {:?} -> Cell {} (height {:.1})", position, cell.id, cell.height());
            println!("  Cell has {} neighbors", cell.neighbor_count());
        }
    }

    // Step 5: Export
    println!("\nStep 5: Exporting...");
    let export = MapExport::from(&map);
    println!("  Points: {}", export.point_count());
    println!("  Edges: {}", export.edges.len());
    println!("  Terrain features: {}", map.terrain_data().len());

    println!("\n=== Demo Complete ===");
    Ok(())
}
