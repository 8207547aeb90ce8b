mod http;
mod reports;
mod scenarios;
mod seeds;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::json;
use skysweep_engine::camera::Viewport;
use skysweep_engine::config::OverlayCfg;
use skysweep_engine::events::MapEvent;
use skysweep_engine::geo::{GeoBounds, LatLon};
use skysweep_engine::session::MapSession;
use std::fs::File;
use std::io::{Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use http::OverpassHttpClient;
use scenarios::{
    LOGIC_SCENARIOS, ScenarioResult, run_grid_alignment, run_scan_distribution,
    run_subgrid_coverage,
};
use seeds::{resolve_seed_inputs, split_csv};

#[derive(Debug, Parser)]
#[command(name = "skysweep-tester", version)]
#[command(about = "Automated QA for the Skysweep overlay engine - acceptance sweeps and live road fetches")]
struct Args {
    /// Scenarios to run (comma-separated)
    #[arg(long, default_value = "scan-distribution,grid-alignment,subgrid-coverage")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated integers or N..M ranges)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Iterations per seed for the logic scenarios
    #[arg(long, default_value_t = 40)]
    iterations: usize,

    /// Run extended acceptance sweeps (forces ≥400 iterations)
    #[arg(long)]
    acceptance: bool,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["console", "json", "markdown"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    // Live fetch options (roads-live scenario)
    /// Overpass endpoint for the live road fetch
    #[arg(long, default_value = "https://overpass-api.de/api/interpreter")]
    endpoint: String,

    /// Bounding box for the live fetch as "south,west,north,east"
    #[arg(long, default_value = "40.0,-105.2,40.3,-104.9")]
    bbox: String,

    /// Optional origin point as "lat,lon" for the distance reference line
    #[arg(long)]
    origin: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.list_scenarios {
        for name in LOGIC_SCENARIOS {
            println!("{name}");
        }
        println!("roads-live");
        return Ok(());
    }

    let seeds = resolve_seed_inputs(&split_csv(&args.seeds)).context("resolving --seeds")?;
    let iterations = if args.acceptance {
        args.iterations.max(400)
    } else {
        args.iterations
    };

    let started = Instant::now();
    let mut results: Vec<ScenarioResult> = Vec::new();
    for name in split_csv(&args.scenarios) {
        let result = match name.as_str() {
            "scan-distribution" => run_scan_distribution(&seeds, iterations),
            "grid-alignment" => run_grid_alignment(&seeds, iterations),
            "subgrid-coverage" => run_subgrid_coverage(&seeds, iterations),
            "roads-live" => run_roads_live(&args, seeds[0]).await?,
            unknown => bail!("unknown scenario: {unknown}"),
        };
        results.push(result);
    }

    match args.report.as_str() {
        "console" => reports::generate_console_report(&results, started.elapsed()),
        "json" => write_report(&args.output, |out| reports::generate_json_report(&results, out))?,
        "markdown" => write_report(&args.output, |out| {
            reports::generate_markdown_report(&results, out)
        })?,
        other => bail!("unknown report format: {other}"),
    }

    if results.iter().any(|result| !result.passed) {
        std::process::exit(1);
    }
    Ok(())
}

fn write_report(
    output: &Option<PathBuf>,
    write: impl FnOnce(&mut dyn Write) -> Result<()>,
) -> Result<()> {
    match output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("creating report file {}", path.display()))?;
            write(&mut file)
        }
        None => write(&mut stdout()),
    }
}

fn parse_bbox(raw: &str) -> Result<GeoBounds> {
    let parts: Vec<f64> = split_csv(raw)
        .iter()
        .map(|part| part.parse::<f64>().context("parsing --bbox"))
        .collect::<Result<_>>()?;
    let [south, west, north, east] = parts.as_slice() else {
        bail!("--bbox wants four comma-separated numbers, got {raw}");
    };
    let bounds = GeoBounds::from_edges(*south, *west, *north, *east);
    if bounds.is_empty() {
        bail!("--bbox encloses no area: {raw}");
    }
    Ok(bounds)
}

fn parse_origin(raw: &str) -> Result<LatLon> {
    let parts: Vec<f64> = split_csv(raw)
        .iter()
        .map(|part| part.parse::<f64>().context("parsing --origin"))
        .collect::<Result<_>>()?;
    let [lat, lon] = parts.as_slice() else {
        bail!("--origin wants \"lat,lon\", got {raw}");
    };
    Ok(LatLon::new(*lat, *lon))
}

/// Drive a full toggle → select → scan → road-mapping round against the real
/// Overpass endpoint.
async fn run_roads_live(args: &Args, seed: u64) -> Result<ScenarioResult> {
    let started = Instant::now();
    let bbox = parse_bbox(&args.bbox)?;
    let origin = args.origin.as_deref().map(parse_origin).transpose()?;

    let mut session = MapSession::new(OverlayCfg::default(), seed, Viewport::new(bbox, 12.0));
    session.toggle_grid();
    let center = bbox.center();
    session.click(center.lat, center.lon);
    session.start_subgrid_scan(0);
    let scan = &session.config().scan;
    let settle = scan.cell_count() as u64 * scan.reveal_delay_ms
        + u64::from(scan.flash_repeats) * scan.flash_interval_ms;
    session.tick(settle);

    let request = session
        .begin_road_mapping(origin)
        .context("no subcell selected after scan")?;
    log::info!("querying {} for round {}", args.endpoint, request.token);

    let client = OverpassHttpClient::new(&args.endpoint, session.config().roads.timeout_secs)
        .map_err(|error| anyhow::anyhow!(error))?;
    let outcome = client.fetch(&request.query).await;
    session.apply_road_response(request.token, outcome);

    let mut details = Vec::new();
    let mut passed = false;
    let mut feature_count = 0usize;
    for record in session.drain_events() {
        match record.event {
            MapEvent::RoadMappingCompleted { success, data, message } => {
                feature_count = data.as_ref().map_or(0, skysweep_engine::FeatureCollection::len);
                passed = true;
                details.push(match (success, message) {
                    (true, _) => format!("{feature_count} road features rendered"),
                    (false, Some(message)) => message,
                    (false, None) => String::from("no roads found"),
                });
            }
            MapEvent::RoadMappingFailed { error } => {
                details.push(format!("fetch failed: {error}"));
            }
            _ => {}
        }
    }

    Ok(ScenarioResult {
        name: String::from("roads-live"),
        passed,
        iterations: 1,
        duration_ms: started.elapsed().as_millis(),
        details,
        metrics: json!({
            "endpoint": args.endpoint,
            "bbox": args.bbox,
            "features": feature_count,
        }),
    })
}
