//! sensorscope - headless resolver / temperature monitor
//!
//! Polls one sensor pipeline and prints a line (or JSON object) per snapshot.
//! Runs until Ctrl-C or until `--duration` elapses.

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use sensorscope::{
    backend::{self, LiveConnector},
    clock::{Clock, SystemClock},
    config::MonitorConfig,
    pipeline::{
        angular_loop, thermal_loop, ConsoleDisplay, LoopCommand, OutputFormat, PollLoop, Runner,
        Stages,
    },
    Endpoint,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(
    name = "sensorscope",
    version,
    about = "Live resolver and temperature monitor over SWD",
    long_about = "Reads sensor variables from a running target through a debug probe.\n\
                  Without a probe or symbol file it runs on a synthetic signal."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Monitor the resolver: angle, speed and turn count
    Angular(RunArgs),
    /// Monitor the temperature sensor
    Thermal(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Firmware ELF used to resolve variable names
    #[arg(long)]
    elf: Option<PathBuf>,

    /// Target chip name
    #[arg(long)]
    chip: Option<String>,

    /// Probe selector (VID:PID or serial number)
    #[arg(long)]
    probe: Option<String>,

    /// Run on the synthetic source without touching the probe
    #[arg(long, conflicts_with = "mock")]
    demo: bool,

    /// Connect to a simulated target
    #[arg(long)]
    mock: bool,

    /// Print JSON lines instead of text
    #[arg(long)]
    json: bool,

    /// Print every Nth snapshot
    #[arg(long, default_value_t = 1)]
    every: u64,

    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<f64>,
}

#[derive(Clone, Copy)]
enum Sensor {
    Angular,
    Thermal,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => MonitorConfig::default_path()
            .map(|path| MonitorConfig::load_or_default(path))
            .unwrap_or_default(),
    };

    let _log_guard = init_logging(&config, cli.verbose)?;
    tracing::info!("Starting sensorscope");

    let (sensor, args) = match cli.command {
        Command::Angular(args) => (Sensor::Angular, args),
        Command::Thermal(args) => (Sensor::Thermal, args),
    };
    run(config, sensor, args)
}

/// Install the subscriber; the returned guard flushes the log file on drop
fn init_logging(
    config: &MonitorConfig,
    verbose: u8,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let directive = match verbose {
        0 => config.logging.filter.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive));

    // Snapshots go to stdout; logs stay on stderr
    let console = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();
    Ok(guard)
}

fn run(mut config: MonitorConfig, sensor: Sensor, args: RunArgs) -> anyhow::Result<()> {
    if let Some(elf) = args.elf {
        config.probe.symbol_file = Some(elf);
    }
    if let Some(chip) = args.chip {
        config.probe.target_chip = chip;
    }
    if args.probe.is_some() {
        config.probe.selector = args.probe;
    }
    config.validate()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let connector = select_connector(&config, sensor, &clock, args.demo, args.mock)?;
    let endpoint = match (&connector, config.probe.endpoint()) {
        (None, _) => None,
        (Some(_), Some(endpoint)) => Some(endpoint),
        // The simulated target resolves names without an ELF
        (Some(_), None) if args.mock => Some(Endpoint::new(
            config.probe.target_chip.clone(),
            PathBuf::new(),
        )),
        (Some(_), None) => {
            tracing::warn!("No symbol file configured, running on the synthetic source");
            None
        }
    };

    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let display = Box::new(ConsoleDisplay::new(std::io::stdout(), format).every(args.every));
    let duration = args.duration.map(Duration::from_secs_f64);

    match sensor {
        Sensor::Angular => {
            let poll_loop = angular_loop(&config.angular, connector, display, clock.clone());
            drive(poll_loop, clock, endpoint, duration)
        }
        Sensor::Thermal => {
            let poll_loop = thermal_loop(&config.thermal, connector, display, clock.clone());
            drive(poll_loop, clock, endpoint, duration)
        }
    }
}

fn select_connector(
    config: &MonitorConfig,
    sensor: Sensor,
    clock: &Arc<dyn Clock>,
    demo: bool,
    mock: bool,
) -> anyhow::Result<Option<Box<dyn LiveConnector>>> {
    if demo {
        return Ok(None);
    }
    if mock {
        return mock_connector(config, sensor, clock).map(Some);
    }
    Ok(backend::default_connector(&config.probe))
}

#[cfg(feature = "mock-probe")]
fn mock_connector(
    config: &MonitorConfig,
    sensor: Sensor,
    clock: &Arc<dyn Clock>,
) -> anyhow::Result<Box<dyn LiveConnector>> {
    use sensorscope::backend::{MockConnector, MockTarget};

    let target = match sensor {
        Sensor::Angular => MockTarget::resolver(clock.clone(), config.angular.demo_frequency_hz),
        Sensor::Thermal => MockTarget::thermal(clock.clone()),
    };
    Ok(Box::new(MockConnector::new(target)))
}

#[cfg(not(feature = "mock-probe"))]
fn mock_connector(
    _config: &MonitorConfig,
    _sensor: Sensor,
    _clock: &Arc<dyn Clock>,
) -> anyhow::Result<Box<dyn LiveConnector>> {
    bail!("--mock needs a build with the `mock-probe` feature")
}

fn drive<T: Stages>(
    poll_loop: PollLoop<T>,
    clock: Arc<dyn Clock>,
    endpoint: Option<Endpoint>,
    duration: Option<Duration>,
) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;

    runtime.block_on(async move {
        let (runner, commands) = Runner::channel(poll_loop, clock, 8);

        let ctrl_c = commands.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted");
                let _ = ctrl_c.send(LoopCommand::Shutdown).await;
            }
        });
        if let Some(duration) = duration {
            let timeout = commands.clone();
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                let _ = timeout.send(LoopCommand::Shutdown).await;
            });
        }

        let startup = start(commands, endpoint);
        let (poll_loop, started) = tokio::join!(runner.run(), startup);

        let stats = poll_loop.stats();
        tracing::info!(
            "Stopped after {} polls ({} published, {} read faults)",
            stats.polls,
            stats.published,
            stats.read_faults
        );
        started
    })
}

/// Send the first command and shut down if the connect fails
async fn start(
    commands: mpsc::Sender<LoopCommand>,
    endpoint: Option<Endpoint>,
) -> anyhow::Result<()> {
    let Some(endpoint) = endpoint else {
        return commands
            .send(LoopCommand::StartDemo)
            .await
            .map_err(|_| anyhow!("Runner stopped before starting"));
    };

    let (reply, result) = oneshot::channel();
    commands
        .send(LoopCommand::Connect {
            endpoint,
            reply: Some(reply),
        })
        .await
        .map_err(|_| anyhow!("Runner stopped before connecting"))?;
    match result.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            let _ = commands.send(LoopCommand::Shutdown).await;
            Err(e).context("Failed to connect")
        }
        Err(_) => bail!("Runner stopped before connecting"),
    }
}
