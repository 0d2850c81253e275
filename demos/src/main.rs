//! Command-line front end for signalbox.
//!
//! Run: cargo run --bin signalbox -- route --layout line.txt --from 0,0,WE --station 1
//!
//! `route` plans one trip on a text layout and prints every tile it passes.
//! `bench` fires random station queries at a generated network and reports
//! how the segment cache held up.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use log::info;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use signalbox_core::{Layout, NetworkGen, Point, Trackdir};
use signalbox_paths::{PathError, PathQuery, Pathfinder, RailSettings, StationTarget, Train};

#[derive(Parser)]
#[command(name = "signalbox", about = "Railway pathfinding demos")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find a route from a tile to a station on a layout file.
    Route {
        /// Layout text file, one character per tile.
        #[arg(long)]
        layout: PathBuf,
        /// Origin as `X,Y,TRACKDIR`, for example `0,0,WE`.
        #[arg(long, value_parser = parse_origin)]
        from: (Point, Trackdir),
        /// Destination station id.
        #[arg(long)]
        station: u16,
        /// JSON file with pathfinder settings; missing fields keep defaults.
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Train length in tiles.
        #[arg(long, default_value_t = 2)]
        length: u32,
        #[arg(long)]
        max_speed: Option<u16>,
    },
    /// Run random queries on a generated network.
    Bench {
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Width and height of the generated network.
        #[arg(long, default_value_t = 48)]
        size: i32,
        #[arg(long, default_value_t = 500)]
        queries: u32,
    },
}

fn parse_origin(s: &str) -> Result<(Point, Trackdir), String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [x, y, td] = parts.as_slice() else {
        return Err(format!("expected X,Y,TRACKDIR, got {s:?}"));
    };
    let x = x.parse().map_err(|e| format!("bad x {x:?}: {e}"))?;
    let y = y.parse().map_err(|e| format!("bad y {y:?}: {e}"))?;
    let td = td.parse::<Trackdir>().map_err(|e| e.to_string())?;
    Ok((Point::new(x, y), td))
}

fn load_settings(path: Option<&Path>) -> Result<RailSettings, Box<dyn Error>> {
    match path {
        Some(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => Ok(RailSettings::default()),
    }
}

fn route(
    layout: &Path,
    (tile, td): (Point, Trackdir),
    station: u16,
    settings: Option<&Path>,
    length: u32,
    max_speed: Option<u16>,
) -> Result<(), Box<dyn Error>> {
    let map = Layout::parse_map(&fs::read_to_string(layout)?)?;
    let mut pf = Pathfinder::new(load_settings(settings)?)?;
    let mut train = Train::new(length);
    if let Some(speed) = max_speed {
        train = train.with_max_speed(speed);
    }
    let dest = StationTarget::new(&map, station)
        .ok_or_else(|| format!("no station {station} on the layout"))?;

    let route = pf.find_path(&map, &train, &PathQuery::new(tile, td.bits()), &dest)?;
    let follower = pf.follower(&train);
    for key in route.tiles(&map, &follower) {
        println!("{} {}", key.tile, key.td);
    }
    println!(
        "cost {} ({} segments, {} nodes)",
        route.cost,
        route.steps.len(),
        route.stats.nodes_created
    );
    Ok(())
}

fn bench(seed: u64, size: i32, queries: u32) -> Result<(), Box<dyn Error>> {
    let mut generator = NetworkGen::new(size, size, StdRng::seed_from_u64(seed));
    let net = generator.generate();
    let origins = net.origins();
    if origins.is_empty() || net.stations.is_empty() {
        return Err("generated network has no origins or stations".into());
    }
    info!(
        "network {size}x{size}: {} origins, {} stations",
        origins.len(),
        net.stations.len()
    );

    let mut rng = StdRng::seed_from_u64(seed ^ 0x5eed);
    let mut pf = Pathfinder::new(RailSettings::default())?;
    let train = Train::new(3);
    let (mut found, mut failed) = (0u32, 0u32);
    let start = Instant::now();
    for _ in 0..queries {
        let (tile, td) = origins[rng.random_range(0..origins.len())];
        let id = net.stations[rng.random_range(0..net.stations.len())];
        let Some(dest) = StationTarget::new(&net.map, id) else {
            continue;
        };
        match pf.find_path(&net.map, &train, &PathQuery::new(tile, td.bits()), &dest) {
            Ok(_) => found += 1,
            Err(PathError::NoPath | PathError::BudgetExceeded { .. }) => failed += 1,
            Err(e) => return Err(e.into()),
        }
    }
    let elapsed = start.elapsed();

    let stats = pf.cache().stats();
    println!("queries    {queries} ({found} routed, {failed} without route)");
    println!("time       {elapsed:?}");
    println!("segments   {}", pf.cache().len());
    println!("hits       {}", stats.hits);
    println!("misses     {}", stats.misses);
    println!("inserted   {}", stats.inserted);
    println!("dropped    {}", stats.invalidated);
    println!("flushes    {}", stats.flushes);
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let res = match &cli.command {
        Command::Route {
            layout,
            from,
            station,
            settings,
            length,
            max_speed,
        } => route(layout, *from, *station, settings.as_deref(), *length, *max_speed),
        Command::Bench {
            seed,
            size,
            queries,
        } => bench(*seed, *size, *queries),
    };
    if let Err(e) = res {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
