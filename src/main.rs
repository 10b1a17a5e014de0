//! Fleet VPP simulator entry point — CLI wiring and run orchestration.

use std::path::Path;
use std::process;

use tracing::info;
use tracing_subscriber::EnvFilter;

use fleet_vpp::capacity::calculate_capacity;
use fleet_vpp::config::ScenarioConfig;
use fleet_vpp::controller::{
    Balancing, BiddingController, BiddingStrategy, Integrated, Intraday, Regular,
};
use fleet_vpp::forecast::CapacityForecast;
use fleet_vpp::io::export::export_csv;
use fleet_vpp::kpi::RunReport;
use fleet_vpp::market::Market;
use fleet_vpp::sim::{Engine, RunOutcome};
use fleet_vpp::synthetic;
use fleet_vpp::trips::TripTable;

/// Seed offsets keeping the synthetic price series decorrelated from the
/// trip table.
const BALANCING_SEED_OFFSET: u64 = 31;
const INTRADAY_SEED_OFFSET: u64 = 57;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    trips_path: Option<String>,
    balancing_prices: Option<String>,
    intraday_prices: Option<String>,
    capacity_out: Option<String>,
}

fn print_help() {
    eprintln!("fleet-vpp — carsharing EV fleet virtual power plant simulator");
    eprintln!();
    eprintln!("Usage: fleet-vpp [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>           Load scenario from TOML config file");
    eprintln!("  --preset <name>             Use a built-in preset (regular, balancing,");
    eprintln!("                              intraday, integrated)");
    eprintln!("  --seed <u64>                Override the demo-data random seed");
    eprintln!("  --trips <path>              Trip table CSV (default: synthetic demo data)");
    eprintln!("  --balancing-prices <path>   Balancing clearing-price CSV");
    eprintln!("  --intraday-prices <path>    Intraday clearing-price CSV");
    eprintln!("  --capacity-out <path>       Export the capacity time series to CSV");
    eprintln!("  --help                      Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the regular preset is used.");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        trips_path: None,
        balancing_prices: None,
        intraday_prices: None,
        capacity_out: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                cli.scenario_path = Some(required_value(&args, i, "--scenario", "a path"));
            }
            "--preset" => {
                i += 1;
                cli.preset = Some(required_value(&args, i, "--preset", "a name"));
            }
            "--seed" => {
                i += 1;
                let raw = required_value(&args, i, "--seed", "a u64");
                match raw.parse::<u64>() {
                    Ok(seed) => cli.seed_override = Some(seed),
                    Err(_) => {
                        eprintln!("error: --seed value \"{raw}\" is not a valid u64");
                        process::exit(1);
                    }
                }
            }
            "--trips" => {
                i += 1;
                cli.trips_path = Some(required_value(&args, i, "--trips", "a path"));
            }
            "--balancing-prices" => {
                i += 1;
                cli.balancing_prices =
                    Some(required_value(&args, i, "--balancing-prices", "a path"));
            }
            "--intraday-prices" => {
                i += 1;
                cli.intraday_prices = Some(required_value(&args, i, "--intraday-prices", "a path"));
            }
            "--capacity-out" => {
                i += 1;
                cli.capacity_out = Some(required_value(&args, i, "--capacity-out", "a path"));
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn required_value(args: &[String], index: usize, flag: &str, expected: &str) -> String {
    match args.get(index) {
        Some(value) => value.clone(),
        None => {
            eprintln!("error: {flag} requires {expected} argument");
            process::exit(1);
        }
    }
}

/// Builds a market from a price CSV, or synthesizes one covering the run.
fn build_market(
    name: &'static str,
    csv_path: Option<&String>,
    bounds: (i64, i64),
    scenario: &ScenarioConfig,
    seed: u64,
) -> Market {
    match csv_path {
        Some(path) => match Market::from_price_csv(name, Path::new(path)) {
            Ok(market) => market,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        },
        None => {
            let demo = &scenario.demo;
            let prices = synthetic::demo_prices(
                bounds.0,
                bounds.1 + 900,
                demo.base_price_eur_mwh,
                demo.price_amplitude_eur_mwh,
                demo.price_noise_std,
                seed,
            );
            info!(market = name, slots = prices.len(), "synthesized clearing prices");
            Market::new(name, prices)
        }
    }
}

fn run_with<S: BiddingStrategy>(
    table: &TripTable,
    strategy: S,
    controller: BiddingController,
    scenario: &ScenarioConfig,
) -> RunOutcome {
    Engine::new(table, strategy, controller, &scenario.charging_params()).run()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = parse_args();

    // Load config: --scenario takes priority, then --preset, then regular.
    let mut scenario = if let Some(ref path) = cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match ScenarioConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        ScenarioConfig::from_preset("regular").unwrap_or_else(|e| {
            eprintln!("{e}");
            process::exit(1);
        })
    };

    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let params = scenario.charging_params();

    // Trip table: real data or a synthetic demo fleet.
    let table = if let Some(ref path) = cli.trips_path {
        match TripTable::from_csv(Path::new(path)) {
            Ok(table) => table,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
    } else {
        let demo = &scenario.demo;
        info!(
            vehicles = demo.vehicles,
            days = demo.days,
            "no trip table given, generating demo fleet"
        );
        match synthetic::demo_trips(
            demo.vehicles,
            demo.days,
            demo.start_time,
            &params,
            scenario.simulation.seed,
        ) {
            Ok(table) => table,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        }
    };

    info!(
        trips = table.len(),
        vehicles = table.vehicle_count(),
        "trip table loaded"
    );

    // Aggregate capacity series on the 5-minute grid.
    let rows = calculate_capacity(&table, &params);

    if let Some(ref path) = cli.capacity_out {
        if let Err(e) = export_csv(&rows, Path::new(path)) {
            eprintln!("error: failed to write capacity CSV: {e}");
            process::exit(1);
        }
        info!(path = %path, rows = rows.len(), "capacity series exported");
    }

    // Event-driven run with the configured bidding strategy.
    let bounds = table.time_bounds();
    let seed = scenario.simulation.seed;
    let balancing = build_market(
        "balancing",
        cli.balancing_prices.as_ref(),
        bounds,
        &scenario,
        seed.wrapping_add(BALANCING_SEED_OFFSET),
    );
    let intraday = build_market(
        "intraday",
        cli.intraday_prices.as_ref(),
        bounds,
        &scenario,
        seed.wrapping_add(INTRADAY_SEED_OFFSET),
    );

    let controller = BiddingController::new(
        balancing,
        intraday,
        CapacityForecast::from_rows(&rows),
        scenario.controller.industry_tariff_eur_mwh,
    );

    let outcome = match scenario.controller.strategy.as_str() {
        "balancing" => run_with(&table, Balancing::default(), controller, &scenario),
        "intraday" => run_with(&table, Intraday::default(), controller, &scenario),
        "integrated" => run_with(&table, Integrated, controller, &scenario),
        _ => run_with(&table, Regular, controller, &scenario),
    };

    let report = RunReport::from_run(&rows, &outcome);
    println!("{report}");
}
