//! cat_sentry - webcam cat detector daemon
//!
//! This daemon:
//! 1. Loads configuration (.env, optional config file, environment)
//! 2. Loads the detection model once
//! 3. Every interval: captures a frame, runs detection, posts positives to the webhook
//! 4. Runs until SIGINT/SIGTERM

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cat_sentry::{
    detect, logging, Detector, FswebcamSource, Sentry, SentryConfig, WebhookNotifier,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Capture, detect cats, notify")]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "CAT_SENTRY_CONFIG")]
    config: Option<PathBuf>,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    // A missing .env is fine; the environment may already be populated.
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let cfg = SentryConfig::load_from(args.config.as_deref())?;
    logging::init(&cfg.log_dir)?;
    logging::install_panic_hook();
    log::info!("starting cat sentry v{}", env!("CARGO_PKG_VERSION"));

    cfg.layout.ensure_dirs()?;
    let backend = detect::load_backend(&cfg.model).context("failed to load detection model")?;
    let detector = Detector::new(backend, cfg.target_class, cfg.layout.positive_dir.clone());
    let notifier = WebhookNotifier::new(cfg.webhook.clone())?;
    let acquirer = FswebcamSource::new(cfg.capture.clone());

    let mut sentry = Sentry::new(
        Box::new(acquirer),
        detector,
        Box::new(notifier),
        cfg.layout.clone(),
        cfg.interval,
    );

    if args.once {
        let outcome = sentry.run_once();
        log::info!("single cycle finished: {}", outcome);
        return Ok(());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    sentry.run(&shutdown);
    let stats = sentry.stats();
    log::info!(
        "stopped: cycles={} detections={} capture_failed={}",
        stats.cycles,
        stats.detections(),
        stats.capture_failed
    );
    Ok(())
}
