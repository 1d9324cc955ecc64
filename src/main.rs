// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use routewave::astar::{self, Params};
use routewave::graph_file::{self, FileFormat};
use routewave::router::{LeapMode, Options, RouterError};
use routewave::{CancelFlag, Graph, Router};

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct GraphLoadError(PathBuf, #[source] graph_file::Error);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    /// Unidirectional A* over the whole graph
    Astar,

    /// Bidirectional A* over the whole graph
    Bidirectional,

    /// Bidirectional A* over region transitions, with leaps expanded afterwards
    Leaps,

    /// Leaps between regions, bidirectional A* within one region
    Auto,
}

#[derive(Parser)]
struct Cli {
    /// The path to the graph file (plain, gzip or bzip2 compressed)
    graph_file: PathBuf,

    /// Latitude of the start point
    start_lat: f32,

    /// Longitude of the start point
    start_lon: f32,

    /// Latitude of the end point
    end_lat: f32,

    /// Longitude of the end point
    end_lon: f32,

    /// Search algorithm
    #[arg(short, long, value_enum, default_value_t = Algorithm::Auto)]
    algorithm: Algorithm,

    /// Give up the search after this many milliseconds
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Increase logging verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    colog::default_builder()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .init();

    let g = load_graph(&cli.graph_file)?;
    log::info!("loaded {} nodes from {}", g.len(), cli.graph_file.display());

    let mode = match cli.algorithm {
        Algorithm::Astar | Algorithm::Bidirectional => LeapMode::NoLeaps,
        Algorithm::Leaps => LeapMode::LeapsOnly,
        Algorithm::Auto => LeapMode::Auto,
    };
    let router = Router::new(&g, Options { mode, ..Options::default() });

    let start = router
        .snap(cli.start_lat, cli.start_lon)
        .ok_or("no node corresponding to the given start position")?;
    let end = router
        .snap(cli.end_lat, cli.end_lon)
        .ok_or("no node corresponding to the given end position")?;

    let cancel = CancelFlag::new();
    if let Some(timeout) = cli.timeout_ms {
        // The timer thread is left running; it only raises the flag.
        let _ = cancel.cancel_after(Duration::from_millis(timeout));
    }

    let route = match cli.algorithm {
        Algorithm::Astar => {
            let mut params = Params::new(&g, start.id, end.id, &cancel);
            astar::find_path(&mut params).map_err(RouterError::from)
        }
        _ => router.route_with_progress(start.id, end.id, &cancel, |p| {
            log::trace!("at {} ({:.3} km from {})", p.vertex, p.remaining, p.counterpart)
        }),
    }?;

    log::info!("route of {} nodes, {:.3} km", route.path.len(), route.distance);

    println!("{{");
    println!("  \"type\": \"FeatureCollection\",");
    println!("  \"features\": [");
    println!("    {{");
    println!("      \"type\": \"Feature\",");
    println!("      \"properties\": {{\"distance\": {}}},", route.distance);

    println!("      \"geometry\": {{");
    println!("        \"type\": \"LineString\",");
    println!("        \"coordinates\": [");

    let mut nodes = route
        .path
        .iter()
        .filter_map(|&node_id| g.get_node(node_id))
        .peekable();
    while let Some(node) = nodes.next() {
        let suffix = if nodes.peek().is_some() { "," } else { "" };
        println!("          [{}, {}]{}", node.lon, node.lat, suffix);
    }

    println!("        ]");
    println!("      }}");
    println!("    }}");
    println!("  ]");
    println!("}}");

    Ok(())
}

fn load_graph<P: AsRef<Path>>(path: P) -> Result<Graph, GraphLoadError> {
    let mut g = Graph::default();
    match graph_file::add_from_file(&mut g, FileFormat::Unknown, path.as_ref()) {
        Ok(()) => Ok(g),
        Err(e) => Err(GraphLoadError(PathBuf::from(path.as_ref()), e)),
    }
}
