use clap::{Parser, ValueEnum};
use glovefilter::config::DeviceConfig;
use glovefilter::session::{CycleOutcome, Driver};
use glovefilter::sink::recorder::{format_event, ContactView, EventRecorder};
use glovefilter::sink::InputSink;
use glovefilter::transport::capture::{Capture, Directive};
use glovefilter::transport::snapshot::SnapshotTransport;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Family {
    Tma4xx,
    Tma1036,
}

#[derive(Parser)]
#[command(name = "glovefilter", about = "Replay cyttsp4 touch reports through the glove filter")]
struct Cli {
    /// Capture file: hex register snapshots and lifecycle directives
    capture: PathBuf,

    /// Controller family preset
    #[arg(short, long, value_enum, default_value_t = Family::Tma4xx)]
    family: Family,

    /// TOML file layered over the preset
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Start with the leather cover on
    #[arg(long)]
    covered: bool,

    /// Emit through a uinput virtual touchscreen instead of printing
    #[cfg(target_os = "linux")]
    #[arg(long)]
    uinput: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("glovefilter: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> glovefilter::Result<()> {
    let preset = match cli.family {
        Family::Tma4xx => DeviceConfig::tma4xx(),
        Family::Tma1036 => DeviceConfig::tma1036(),
    };
    let config = match &cli.config {
        Some(path) => DeviceConfig::from_file(&preset, path)?,
        None => preset,
    };
    let capture = Capture::open(&cli.capture)?;
    tracing::info!(
        path = %cli.capture.display(),
        directives = capture.directives.len(),
        "loaded capture"
    );

    #[cfg(target_os = "linux")]
    if cli.uinput {
        let sink = glovefilter::sink::uinput::UinputSink::create(&config)?;
        let driver = Driver::new(config, SnapshotTransport::new(), sink);
        return replay(&driver, cli.covered, &capture, |_| {});
    }

    let driver = Driver::new(config, SnapshotTransport::new(), EventRecorder::new());
    let mut view = ContactView::new();
    replay(&driver, cli.covered, &capture, |recorder| {
        for event in recorder.take() {
            println!("{}", format_event(&event));
            view.process(&event);
        }
        let active: Vec<String> = view
            .active()
            .map(|(slot, t)| format!("{}:({},{})", slot, t.position_x, t.position_y))
            .collect();
        if !active.is_empty() {
            println!("# touching={} active=[{}]", view.touching, active.join(" "));
        }
    })
}

fn replay<S: InputSink>(
    driver: &Driver<SnapshotTransport, S>,
    covered: bool,
    capture: &Capture,
    mut after: impl FnMut(&mut S),
) -> glovefilter::Result<()> {
    if covered {
        driver.store_cover("0")?;
    }

    for (idx, directive) in capture.directives.iter().enumerate() {
        match directive {
            Directive::Packet(registers) => {
                driver.with(|_, transport, _| transport.load(registers.clone()));
                match driver.attention() {
                    Ok(CycleOutcome::Reported(frame)) => {
                        tracing::debug!(cycle = idx, reported = frame.contacts.len(), "cycle done")
                    }
                    Ok(outcome) => tracing::debug!(cycle = idx, ?outcome, "cycle done"),
                    Err(e) => tracing::warn!(cycle = idx, "cycle aborted: {}", e),
                }
            }
            Directive::Startup => driver.startup(),
            Directive::Suspend => driver.suspend(),
            Directive::Resume => driver.resume(),
            Directive::Cover(value) => match driver.store_cover(value) {
                Ok(_) => tracing::info!(cover = %driver.show_cover(), "cover written"),
                Err(e) => tracing::error!(value = %value, "cover write failed: {}", e),
            },
        }
        driver.with(|_, _, sink| after(sink));
    }

    let state = driver.with(|session, _, _| session.classifier().state());
    tracing::info!(?state, "replay finished");
    Ok(())
}
