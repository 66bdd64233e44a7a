use std::{
    path::PathBuf,
    sync::Arc,
    thread,
    time::{
        Duration,
        Instant,
    },
};

use anyhow::Context;
use clap::Parser;
use obfstr::obfstr;
use raid::{
    Radar,
    RefreshScheduler,
    SessionBoundary,
    Watchlist,
};
use raid_memory::{
    MemoryAccess,
    MemoryImage,
};
use raid_offsets::OffsetTable;
use settings::AppSettings;

mod settings;

fn main() {
    let args = match AppArgs::try_parse() {
        Ok(args) => args,
        Err(error) => {
            println!("{:#}", error);
            std::process::exit(1);
        }
    };

    env_logger::builder()
        .filter_level(if args.verbose {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    if let Err(error) = real_main(&args) {
        log::error!("{:#}", error);
        std::process::exit(1);
    }
}

#[derive(Debug, Parser)]
#[clap(name = "raid-radar", version)]
struct AppArgs {
    /// Enable verbose logging ($env:RUST_LOG="trace")
    #[clap(short, long)]
    verbose: bool,

    /// Offset table of the targeted game version
    #[clap(long)]
    offsets: PathBuf,

    /// Memory image to replay
    #[clap(long)]
    image: PathBuf,

    /// Watchlist mapping account ids to reasons
    #[clap(long)]
    watchlist: Option<PathBuf>,

    /// Config file (defaults to config.yaml next to the executable)
    #[clap(long)]
    config: Option<PathBuf>,

    /// Amount of frames to run
    #[clap(long, default_value_t = 600)]
    frames: usize,

    /// Write the effective config back to disk
    #[clap(long)]
    save_config: bool,
}

fn log_session_boundary(boundary: &SessionBoundary) {
    match boundary.world {
        Some(world) => log::info!("{} {}", obfstr!("Entered game world"), world),
        None => log::info!("{}", obfstr!("Left game world")),
    }
}

fn real_main(args: &AppArgs) -> anyhow::Result<()> {
    log::info!(
        "{} v{}",
        obfstr!("raid-radar controller"),
        env!("CARGO_PKG_VERSION")
    );

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => AppSettings::default_path()?,
    };
    let settings = AppSettings::load_from(&config_path)?;

    let table = OffsetTable::load_from(&args.offsets).with_context(|| {
        format!(
            "{} {}",
            obfstr!("failed to load offset table"),
            args.offsets.display()
        )
    })?;
    log::info!(
        "Loaded offsets for game version {}",
        table.game_version()
    );

    let memory = Arc::new(MemoryImage::load_from(&args.image)?);
    let watchlist = match &args.watchlist {
        Some(path) => Watchlist::load_from(path)?,
        None => Watchlist::default(),
    };

    let radar = Arc::new(Radar::new(
        memory.clone(),
        Arc::new(table),
        settings.radar.clone(),
        watchlist,
    ));
    radar.subscribe_session_boundary(Box::new(log_session_boundary));

    match radar.discovery_pass() {
        Ok(report) => log::info!(
            "Initial discovery: {} players, {} rejected, {} failed",
            report.allocated,
            report.rejected,
            report.failed
        ),
        Err(err) => log::warn!("{}: {}", obfstr!("Initial discovery failed"), err),
    }

    let scheduler = RefreshScheduler::start(radar.clone())?;
    match radar.refresh_wishlist(scheduler.cancellation()) {
        Ok(count) => log::info!("Loaded {} wishlist items", count),
        Err(err) => log::debug!("Wishlist not available: {}", err),
    }

    let tick = Duration::from_millis(settings.tick_ms);
    for frame in 0..args.frames {
        let frame_start = Instant::now();
        let read_calls = memory.total_read_calls();

        let report = radar.realtime_pass();
        let snapshot = radar.snapshot();
        log::trace!(
            "Frame {}: {} read calls, {} entities, {} reads ({} unreadable, {} rejected)",
            frame,
            memory.total_read_calls() - read_calls,
            snapshot.len(),
            report.operations,
            report.unreadable,
            report.rejected
        );

        if settings.snapshot_interval > 0 && frame % settings.snapshot_interval == 0 {
            let (alive, dead, departed) = radar.population();
            log::info!(
                "Frame {}: {} alive, {} dead, {} departed",
                frame,
                alive,
                dead,
                departed
            );

            for entity in snapshot.iter() {
                log::debug!("{}", serde_json::to_string(entity)?);
            }
        }

        let elapsed = frame_start.elapsed();
        if elapsed < tick {
            thread::sleep(tick - elapsed);
        }
    }

    scheduler.stop();
    log::info!(
        "Finished after {} frames with {} read calls in total",
        args.frames,
        memory.total_read_calls()
    );

    if args.save_config {
        settings.save_to(&config_path)?;
    }

    Ok(())
}
