//! mused - host daemon for the Muse content rotation engine
//!
//! Loads the configuration, runs the aligned tick schedule, prints each
//! selection, and accepts context updates over IPC.

use anyhow::{Context, Result};
use clap::Parser;
use muse::engine::split_segments;
use muse::ipc::{IpcServer, MuseHandler};
use muse::{
    Clock, Engine, FileStore, MuseConfig, RenderTick, Renderer, ScheduleAligner, SystemClock,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Muse - content rotation daemon
#[derive(Parser, Debug)]
#[command(name = "mused", version, about)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/muse/muse.toml")]
    config: PathBuf,

    /// Socket path (overrides the configuration)
    #[arg(short, long)]
    socket: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

/// Prints every segment on its own line
struct StdoutRenderer;

impl Renderer for StdoutRenderer {
    fn render(&self, segments: &[&str], _fade: Duration) {
        for segment in segments {
            println!("{}", segment);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = MuseConfig::load(&args.config)
        .with_context(|| format!("Failed to load {:?}", args.config))?;

    // Initialize logging
    let log_level = if args.debug {
        "debug".to_string()
    } else {
        config.daemon.log_level.clone()
    };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    info!("Muse v{} starting", VERSION);
    info!("Configuration loaded from {:?}", args.config);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::from_config(config.clock.timezone.as_deref())?);
    let store = FileStore::new(&config.daemon.state_path, clock.clone());
    let mut engine = Engine::new(&config, store, clock.clone());

    if let Some(source) = &config.source.remote_file {
        let base_dir = args.config.parent().unwrap_or(Path::new("."));
        let content = muse::remote::load_content(source, base_dir)
            .await
            .with_context(|| format!("Failed to load remote content from {}", source))?;
        engine.replace_content(Arc::new(content));
    }

    let engine = Arc::new(RwLock::new(engine));
    let fade = Duration::from_millis(config.schedule.fade_speed_ms);

    let aligner = ScheduleAligner::new(config.schedule.update_interval_ms, clock);

    // Show something until the first aligned tick
    if !aligner.first_delay().is_zero() {
        let text = engine.write().await.next_item();
        StdoutRenderer.render(&split_segments(&text), fade);
    }

    let schedule = aligner.spawn(RenderTick::new(engine.clone(), StdoutRenderer, fade));

    let socket_path = args.socket.unwrap_or(config.daemon.socket_path);
    let server = IpcServer::new(socket_path, MuseHandler::new(engine));

    info!("Muse ready");

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("IPC server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    schedule.stop().await;
    Ok(())
}
