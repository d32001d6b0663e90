//! Markar Daemon - Main entry point
//!
//! Runs the AR session controller and serves the operator API.

mod api;
mod config;
mod fetch;
mod server;
mod state;
mod ws;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "markar")]
#[command(about = "Marker-anchored AR asset session daemon")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "markar.toml")]
    config: PathBuf,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write a default configuration file to the config path and exit
    #[arg(long)]
    write_default_config: bool,

    /// Start a session, render some frames, stop, and exit
    #[arg(long)]
    run_once: bool,

    /// Frames to render in --run-once mode
    #[arg(long, default_value_t = 60)]
    frames: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Markar v{}", env!("CARGO_PKG_VERSION"));

    if args.write_default_config {
        config::save_default_config(&args.config)
            .with_context(|| format!("Failed to write {}", args.config.display()))?;
        println!("Wrote default configuration to {}", args.config.display());
        return Ok(());
    }

    // Load configuration
    let mut config = config::load_config(&args.config)?;

    // Override bind address if specified
    if let Some(bind) = args.bind {
        config.daemon.bind = bind;
    }

    if args.run_once {
        // Frames are stepped by hand below
        config.daemon.frame_rate = 0;
    }

    info!(
        marker = %config.marker.path,
        assets = config.assets.len(),
        max_targets = config.experience().max_tracked_targets(),
        "Configuration loaded"
    );

    // Create application state
    let state = state::AppState::new(config.clone())?;

    if args.run_once {
        // Single session mode
        info!(frames = args.frames, "Running single session");
        let started = state.controller.start().await?;
        println!("Bound {} assets:", started.bound.len());
        for anchor in &started.bound {
            println!("  - anchor {}", anchor);
        }
        for failed in &started.failed {
            println!(
                "  ! {} (anchor {}): {}",
                failed.path, failed.anchor_index, failed.reason
            );
        }

        for _ in 0..args.frames {
            state.frame_loop.step();
        }
        println!("Rendered {} frames", state.frame_loop.frames_rendered());

        let stopped = state.controller.stop().await?;
        for error in &stopped.teardown_errors {
            println!("  ! teardown: {}", error);
        }
    } else {
        // Daemon mode - run web server
        server::run(state, &config.daemon.bind).await?;
    }

    Ok(())
}
