use clap::{App, Arg, ArgMatches};
use colored::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use vehsim::config::{CREDENTIAL_PATH, DATABASE_URL, VEHICLE_ID};
use vehsim::publisher::shutdown_channel;
use vehsim::store::FirebaseConfig;
use vehsim::{
    Credential, FirebaseStore, MemoryStore, PublishError, Publisher, PublisherConfig,
    PublisherStats, ReadingGenerator, RecordStore,
};

const DEFAULT_INTERVAL_SECS: &str = "5";

fn cli<'a, 'b>() -> App<'a, 'b> {
    App::new("vehsim")
        .version(env!("CARGO_PKG_VERSION"))
        .author("IoT Vehicles Team")
        .about("🚗 Vehicle telemetry simulator - keeps the latest vehicle state in Firebase")
        .arg(
            Arg::with_name("database-url")
                .short("d")
                .long("database-url")
                .value_name("URL")
                .help("Firebase Realtime Database URL")
                .takes_value(true)
                .default_value(DATABASE_URL),
        )
        .arg(
            Arg::with_name("credentials")
                .short("c")
                .long("credentials")
                .value_name("FILE")
                .help("Service-account key, or a file with \"database_secret\" or \"access_token\"")
                .takes_value(true)
                .default_value(CREDENTIAL_PATH),
        )
        .arg(
            Arg::with_name("vehicle")
                .long("vehicle")
                .value_name("ID")
                .help("Database location written every cycle")
                .takes_value(true)
                .default_value(VEHICLE_ID),
        )
        .arg(
            Arg::with_name("interval")
                .short("i")
                .long("interval")
                .value_name("SECONDS")
                .help("Idle time between two writes")
                .takes_value(true)
                .default_value(DEFAULT_INTERVAL_SECS)
                .validator(validate_number),
        )
        .arg(
            Arg::with_name("cycles")
                .short("n")
                .long("cycles")
                .value_name("COUNT")
                .help("Stop after this many writes (default: run until Ctrl+C)")
                .takes_value(true)
                .validator(validate_number),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .value_name("SEED")
                .help("Seed the reading generator for reproducible runs")
                .takes_value(true)
                .validator(validate_number),
        )
        .arg(
            Arg::with_name("dry-run")
                .long("dry-run")
                .help("Publish into an in-memory store instead of Firebase"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Enable verbose output"),
        )
}

fn validate_number(v: String) -> Result<(), String> {
    match v.parse::<u64>() {
        Ok(_) => Ok(()),
        Err(_) => Err("Value must be a non-negative integer".into()),
    }
}

/// Everything the command line decides about one run.
#[derive(Debug)]
struct RunOptions {
    config: PublisherConfig,
    seed: Option<u64>,
    dry_run: bool,
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let matches = cli().get_matches();

    let options = match parse_options(&matches) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    let level = if options.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(options).await {
        error!("❌ Fatal: {}", e);
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn parse_options(matches: &ArgMatches<'_>) -> Result<RunOptions, Box<dyn std::error::Error>> {
    let config = build_config(matches)?;
    config.validate()?;

    let seed = match matches.value_of("seed") {
        Some(seed) => Some(seed.parse()?),
        None => None,
    };

    Ok(RunOptions {
        config,
        seed,
        dry_run: matches.is_present("dry-run"),
        verbose: matches.is_present("verbose"),
    })
}

async fn run(options: RunOptions) -> Result<PublisherStats, Box<dyn std::error::Error>> {
    let RunOptions { config, seed, dry_run, .. } = options;

    let generator = match seed {
        Some(seed) => ReadingGenerator::seeded(seed),
        None => ReadingGenerator::new(),
    };

    println!("{}", "🚗 Vehicle Telemetry Simulator".bold());
    println!("==============================");
    println!("   Vehicle:  {}", config.vehicle_id.cyan());
    println!("   Interval: {:?}", config.interval);

    let stats = if dry_run {
        println!("   Store:    {}", "in-memory (dry run)".yellow());
        publish(MemoryStore::new(), generator, config).await?
    } else {
        println!("   Store:    {}", config.database_url.cyan());
        let credential = Credential::from_file(&config.credential_path)?;
        info!("🔐 Loaded {:?} from {}", credential, config.credential_path.display());
        let store = FirebaseStore::connect(FirebaseConfig::new(config.database_url.clone()), credential)?;
        publish(store, generator, config).await?
    };

    println!(
        "{} after {} cycles",
        "🛑 Publisher stopped".green(),
        stats.cycles_completed
    );
    Ok(stats)
}

fn build_config(matches: &ArgMatches<'_>) -> Result<PublisherConfig, Box<dyn std::error::Error>> {
    let mut config = PublisherConfig::default();

    if let Some(url) = matches.value_of("database-url") {
        config.database_url = url.to_string();
    }
    if let Some(path) = matches.value_of("credentials") {
        config.credential_path = PathBuf::from(path);
    }
    if let Some(vehicle) = matches.value_of("vehicle") {
        config.vehicle_id = vehicle.to_string();
    }
    if let Some(secs) = matches.value_of("interval") {
        config.interval = Duration::from_secs(secs.parse()?);
    }
    if let Some(cycles) = matches.value_of("cycles") {
        config.max_cycles = Some(cycles.parse()?);
    }

    Ok(config)
}

async fn publish<S: RecordStore>(
    store: S,
    generator: ReadingGenerator,
    config: PublisherConfig,
) -> Result<PublisherStats, PublishError> {
    let (trigger, signal) = shutdown_channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl+C received, stopping after the current cycle");
                trigger.trigger();
            }
            Err(e) => warn!("Cannot listen for Ctrl+C: {}", e),
        }
    });

    let mut publisher = Publisher::with_generator(store, generator, config);
    publisher.run(signal).await
}
