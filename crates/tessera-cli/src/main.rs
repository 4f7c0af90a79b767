//! Headless driver for the tessera terrain pipeline.
//!
//! Generates synthetic datasets, queries elevations and runs the tessellator
//! over a few frames from a chosen viewpoint, logging what it selects.

mod camera;
mod generate;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tessera_elevation::{ElevationConfig, ElevationModel, Result, TileKey};
use tessera_geo::{Angle, Ellipsoid};
use tessera_mesh::{DEFAULT_DENSITY, RectangularTessellator, TessellatorSettings};

use camera::Camera;
use generate::SyntheticDataset;

/// Default latitude (Matterhorn).
const DEFAULT_LAT: f64 = 45.976;
/// Default longitude (Matterhorn).
const DEFAULT_LON: f64 = 7.658;
/// Default altitude above the ground in metres.
const DEFAULT_ALTITUDE: f64 = 20_000.0;

#[derive(Parser)]
#[command(name = "tessera", about = "Multi-resolution terrain from tiled elevation rasters")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a synthetic whole-globe dataset.
    Generate(GenerateArgs),
    /// Describe a dataset's level pyramid.
    Info {
        /// Dataset configuration file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Look up the elevation at a location.
    Elevation(ElevationArgs),
    /// Tessellate the terrain seen from a viewpoint.
    View(ViewArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Output directory.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value = "Earth/Synthetic")]
    name: String,

    #[arg(long, default_value_t = 3)]
    levels: usize,

    /// Level-zero tile size in degrees.
    #[arg(long, default_value_t = 36.0)]
    level_zero_delta: f64,

    /// Samples per tile side.
    #[arg(long, default_value_t = 32)]
    tile_size: usize,
}

#[derive(Args)]
struct ElevationArgs {
    /// Dataset configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Latitude in degrees.
    #[arg(long, default_value_t = DEFAULT_LAT)]
    lat: f64,

    /// Longitude in degrees.
    #[arg(long, default_value_t = DEFAULT_LON)]
    lon: f64,

    /// Level to load before sampling; defaults to the finest.
    #[arg(long)]
    level: Option<usize>,
}

#[derive(Args)]
struct ViewArgs {
    /// Dataset configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Latitude in degrees.
    #[arg(long, default_value_t = DEFAULT_LAT)]
    lat: f64,

    /// Longitude in degrees.
    #[arg(long, default_value_t = DEFAULT_LON)]
    lon: f64,

    /// Altitude above the ground in metres.
    #[arg(long, default_value_t = DEFAULT_ALTITUDE)]
    altitude: f64,

    /// Camera pitch in degrees: 0 looks straight down, 90 at the horizon.
    #[arg(long, default_value_t = 0.0)]
    pitch: f64,

    /// Vertical field of view in degrees.
    #[arg(long, default_value_t = 45.0)]
    fov: f64,

    #[arg(long, default_value_t = 16.0 / 9.0)]
    aspect: f64,

    /// Grid cells per tile side.
    #[arg(long, default_value_t = DEFAULT_DENSITY)]
    density: usize,

    #[arg(long, default_value_t = 5)]
    frames: usize,

    /// Wait for every outstanding tile load between frames.
    #[arg(long)]
    wait: bool,

    /// Pause between frames in milliseconds, when not waiting.
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,
}

fn load_model(path: &Path) -> Result<Arc<ElevationModel>> {
    let config = ElevationConfig::load(path)?;
    let model = ElevationModel::from_config(&config)?;
    model.load_all_level_zero_tiles()?;
    Ok(Arc::new(model))
}

fn info(path: &Path) -> Result<()> {
    let config = ElevationConfig::load(path)?;
    let model = ElevationModel::from_config(&config)?;
    let levels = model.levels();

    println!("sector       {}", levels.sector());
    println!("store        {}", model.store_path().display());
    println!("elevations   {} .. {} m", model.min_elevation(), model.max_elevation());
    for level in levels.levels() {
        let delta = level.tile_delta();
        println!(
            "level {:>2}     {} x {} samples, {:.4} x {:.4} deg tiles, {:.2} m texels",
            level.level_number(),
            level.tile_width(),
            level.tile_height(),
            delta.latitude.degrees(),
            delta.longitude.degrees(),
            level.texel_size() * Ellipsoid::WGS84.radius(),
        );
    }
    Ok(())
}

fn elevation(args: &ElevationArgs) -> Result<()> {
    let model = load_model(&args.config)?;
    let latitude = Angle::from_degrees(args.lat);
    let longitude = Angle::from_degrees(args.lon);

    let levels = model.levels();
    let level = match args.level {
        Some(number) => levels.level(number)?,
        None => levels.last_level(),
    };
    let key = TileKey::from_lat_lon(latitude, longitude, levels, level);
    model.request_tile(&key)?;
    model.finish_pending()?;
    if !model.is_resident(&key) {
        tracing::warn!(%key, "tile not available, using a coarser level");
    }

    println!(
        "{:.6}, {:.6}: {:.1} m",
        args.lat,
        args.lon,
        model.elevation(latitude, longitude)
    );
    Ok(())
}

fn view(args: &ViewArgs) -> Result<()> {
    let model = load_model(&args.config)?;
    let settings = TessellatorSettings {
        density: args.density,
        ..TessellatorSettings::default()
    };
    let ellipsoid = settings.ellipsoid;
    let mut tessellator = RectangularTessellator::new(Arc::clone(&model), settings)?;

    let latitude = Angle::from_degrees(args.lat);
    let longitude = Angle::from_degrees(args.lon);
    let camera = Camera::over(
        &ellipsoid,
        latitude,
        longitude,
        model.elevation(latitude, longitude),
        args.altitude,
        Angle::from_degrees(args.pitch),
        Angle::from_degrees(args.fov),
    );
    let frustum = camera.frustum(args.aspect);
    tracing::info!(near = camera.near, far = camera.far, "camera placed");

    for frame in 0..args.frames {
        tessellator.tessellate(camera.eye, camera.field_of_view, &frustum)?;
        let stats = tessellator.stats();
        tracing::info!(
            frame,
            tiles = stats.tiles_current,
            culled = stats.tiles_culled,
            built = stats.meshes_built,
            reused = stats.meshes_reused,
            landed = stats.tiles_landed,
            pending = model.pending_requests(),
            "frame"
        );

        if args.wait {
            model.finish_pending()?;
        } else {
            std::thread::sleep(Duration::from_millis(args.interval_ms));
        }
    }

    let tiles = tessellator.current_tiles();
    let mut per_level = BTreeMap::new();
    for tile in tiles {
        *per_level.entry(tile.level()).or_insert(0usize) += 1;
    }
    let vertices: usize = tiles.iter().map(|t| t.render_info().vertices().len()).sum();

    println!("tiles        {}", tiles.len());
    for (level, count) in &per_level {
        println!("  level {level:>2}   {count}");
    }
    println!("vertices     {vertices}");
    println!("resident     {} tiles, {} bytes cached", model.resident_tile_count(), model.cached_bytes());
    match tessellator.surface_point(latitude, longitude) {
        Some(point) => {
            let surface = ellipsoid.cartesian_to_geodetic(point);
            println!("surface      {:.1} m", surface.elevation);
        }
        None => println!("surface      not in view"),
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate(args) => {
            let layout = SyntheticDataset {
                cache_name: args.name,
                num_levels: args.levels,
                level_zero_delta: args.level_zero_delta,
                tile_size: args.tile_size,
            };
            let dataset = generate::generate(&args.out, &layout)?;
            println!("{}", dataset.display());
            Ok(())
        }
        Command::Info { config } => info(&config),
        Command::Elevation(args) => elevation(&args),
        Command::View(args) => view(&args),
    }
}

fn main() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Cli::parse()) {
        tracing::error!(error = %e, "failed");
        process::exit(1);
    }
}
