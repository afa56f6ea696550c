//! Headless driver for the mean-value-theorem scene.
//!
//! # Responsibility
//! - Boot the scene against the in-memory store and replay slider and
//!   function edits.
//! - Print one deterministic summary line per step.

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use futures::FutureExt;
use log::info;

use mvt_core::{init_logging, AliveDelivery, AppConfig, InMemoryStore, MvtScene, ObjectStore};

/// Replays edits on a headless mean-value-theorem scene
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Division counts to set on the slider, in order
    #[clap(short, long, value_delimiter = ',')]
    divisions: Vec<u32>,

    /// New right-hand side for `f(x)`, applied after the slider steps
    ///
    /// (an empty value leaves the function undefined)
    #[clap(short, long)]
    redefine: Option<String>,

    /// Overrides the configured log level
    #[clap(long)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files
    #[clap(long)]
    log_dir: Option<String>,

    /// Report liveness before acknowledging each creation
    #[clap(long)]
    immediate_alive: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config `{}`", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if let Some(dir) = &args.log_dir {
        config.logging.log_dir = Some(dir.clone());
    }
    init_logging(&config.logging).map_err(anyhow::Error::msg)?;

    let delivery = if args.immediate_alive {
        AliveDelivery::Immediate
    } else {
        AliveDelivery::Deferred
    };
    let store = Rc::new(InMemoryStore::new(delivery));
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();

    let init = spawner
        .spawn_local_with_handle(MvtScene::init(
            Rc::clone(&store) as Rc<dyn ObjectStore>,
            spawner.clone(),
            config.scene.clone(),
        ))
        .map_err(|err| anyhow!("failed to spawn scene init: {err}"))?;
    store.run_until_idle(&mut pool);
    let scene = init
        .now_or_never()
        .ok_or_else(|| anyhow!("scene init did not complete"))??;
    report(&store, &scene, "init");

    for divisions in &args.divisions {
        store.set_value(scene.slider(), f64::from(*divisions));
        store.run_until_idle(&mut pool);
        report(&store, &scene, &format!("slider={divisions}"));
    }

    if let Some(definition) = &args.redefine {
        let function = scene.anchors().function.clone();
        let defined = !definition.trim().is_empty();
        store.redefine(&function, &format!("{function}(x) = {definition}"), defined);
        store.run_until_idle(&mut pool);
        report(&store, &scene, "redefine");
    }

    info!("event=cli_done module=cli status=ok");
    Ok(())
}

fn report(store: &InMemoryStore, scene: &MvtScene, step: &str) {
    let tracker = scene.tracker();
    println!(
        "step={step} divisions={} generation={} transient={} objects={} pending_interest={} unmatched={}",
        scene.divisions(),
        tracker.generation(),
        tracker.transient_handles().len(),
        store.object_count(),
        tracker.pending_interest_count(),
        tracker.unmatched_count(),
    );
}
