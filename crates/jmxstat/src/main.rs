//! jmxstat - JMX attribute sampler.
//!
//! Periodically reads attributes of one managed resource through a Jolokia
//! agent and prints them as a tab-separated table on stdout, vmstat style.
//! Logs go to stderr.

use std::process;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::EnvFilter;

use jmxstat_core::config::{self, MIN_INTERVAL};
use jmxstat_core::source::jolokia::JolokiaConnector;
use jmxstat_core::{
    ConfigError, Credentials, ResourceId, SampleError, SampleRequest, Sampler, Shutdown,
    StreamWriter, SystemClock, TimestampMode,
};

/// JMX attribute sampler.
#[derive(Parser, Debug)]
#[command(name = "jmxstat", about = "Collect statistics from JMX attributes", version = jmxstat_core::VERSION)]
struct Args {
    /// Jolokia agent URL, e.g. http://localhost:8778/jolokia
    #[arg(short = 's', long = "url", env = "JMXSTAT_URL")]
    url: String,

    /// Object name of the resource to sample, e.g. java.lang:type=Memory
    #[arg(short, long)]
    object_name: String,

    /// Attribute name, or a comma-separated list of attribute names.
    #[arg(short, long)]
    attribute: String,

    /// Username for the agent. Used only together with --password.
    #[arg(short, long, env = "JMXSTAT_USERNAME")]
    username: Option<String>,

    /// Password for the agent.
    #[arg(short, long, env = "JMXSTAT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Sampling interval in milliseconds (minimum 250). 0 samples once.
    #[arg(short, long, default_value_t = 250)]
    interval: u64,

    /// Number of samples between repeated header lines (0 = header only once).
    #[arg(short, long, default_value_t = 0)]
    lines: u32,

    /// Prefix each row with the milliseconds since the first sample.
    #[arg(short, long)]
    timestamp: bool,

    /// With --timestamp, print milliseconds since the Unix epoch instead.
    #[arg(long)]
    unixtime: bool,

    /// Stop after this many samples.
    #[arg(short, long)]
    count: Option<u64>,

    /// Timeout for each request to the agent, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    timeout: u64,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Failures that end the process.
#[derive(Debug)]
enum AppError {
    Config(ConfigError),
    Sample(SampleError),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) => 2,
            AppError::Sample(_) => 1,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "configuration error: {}", e),
            AppError::Sample(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AppError {}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}

impl From<SampleError> for AppError {
    fn from(e: SampleError) -> Self {
        AppError::Sample(e)
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["jmxstat", "jmxstat_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Validates the arguments and applies the caller-side adjustments: interval
/// floor, ignored `--unixtime`, credentials only as a pair.
fn build_config(args: &Args) -> Result<(SampleRequest, JolokiaConnector), ConfigError> {
    let resource = ResourceId::parse(&args.object_name)?;
    let attributes = config::parse_attribute_list(&args.attribute)?;

    let interval_ms = config::clamp_interval_ms(args.interval);
    if interval_ms != args.interval {
        warn!(
            "interval value too small, setting to {}ms",
            MIN_INTERVAL.as_millis()
        );
    }
    if args.unixtime && !args.timestamp {
        warn!("--unixtime has no effect without --timestamp");
    }
    if args.username.is_some() != args.password.is_some() {
        warn!("--username and --password must be given together, connecting without credentials");
    }
    if resource.is_pattern() {
        warn!(
            "object name {} is a pattern, the agent will return one value per matching resource",
            resource
        );
    }

    let request = SampleRequest::new(resource, attributes)?
        .with_interval(Duration::from_millis(interval_ms))
        .with_header_repeat(args.lines)
        .with_timestamp(TimestampMode::from_flags(args.timestamp, args.unixtime))
        .with_count(args.count);

    let connector = JolokiaConnector::new(&args.url)?
        .with_credentials(Credentials::from_parts(
            args.username.clone(),
            args.password.clone(),
        ))
        .with_timeout(Duration::from_millis(args.timeout));

    Ok((request, connector))
}

fn run(args: &Args) -> Result<u64, AppError> {
    let (request, connector) = build_config(args)?;

    info!("jmxstat {} starting", jmxstat_core::VERSION);
    info!(
        "Config: url={}, object={}, attributes={}, interval={}ms",
        connector.base_url(),
        request.resource(),
        request.attributes().join(","),
        request.interval().as_millis()
    );

    // Setup graceful shutdown
    let shutdown = Shutdown::new();
    let handle = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        handle.request();
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let stdout = std::io::stdout().lock();
    let mut sampler = Sampler::new(
        request,
        connector,
        StreamWriter::new(stdout),
        SystemClock::new(),
    );
    let rows = sampler.run(&shutdown)?;
    debug!("{} rows written", rows);
    Ok(rows)
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(&args) {
        eprintln!("jmxstat: {}", e);
        process::exit(e.exit_code());
    }
}
