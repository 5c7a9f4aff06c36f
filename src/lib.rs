// src/lib.rs

pub mod classify;
pub mod cli;
pub mod config;
pub mod document;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod query;
pub mod render;
pub mod types;
pub mod watch;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::document::{Document, DocumentSnapshot};
use crate::engine::{
    CoreRuntime, OrchestratorSettings, Runtime, RuntimeEvent, RuntimeOptions, UiEvent,
};
use crate::exec::{resolve_interpreter, ProcessRunner, RealExecutorBackend, ScratchDir};
use crate::query::{Preamble, QueryBuilder};
use crate::types::QueryKind;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - preamble + interpreter resolution (startup-fatal on failure)
/// - document model, orchestrator core and runtime
/// - executor
/// - renderer
/// - (optional) config-file watcher
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone();
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let (ui_tx, ui_rx) = mpsc::unbounded_channel::<UiEvent>();
    let renderer = render::spawn_renderer(ui_rx);

    let preamble = match Preamble::load(&cfg.interpreter) {
        Ok(p) => p,
        Err(e) => return fatal(ui_tx, renderer, e.into()).await,
    };
    let builder = QueryBuilder::new(&preamble);
    let seed = cfg.document.to_snapshot();

    if args.dry_run {
        print_dry_run(&cfg, &builder, &seed);
        return Ok(());
    }

    let program = match resolve_interpreter(
        cfg.interpreter.path.as_deref(),
        &cfg.interpreter.candidates,
    ) {
        Ok(p) => p,
        Err(e) => return fatal(ui_tx, renderer, e.into()).await,
    };

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let scratch = ScratchDir::new(cfg.config.effective_scratch_dir());
    info!(scratch = %scratch.dir().display(), "query scripts go here");
    let executor = RealExecutorBackend::new(ProcessRunner::new(program, scratch), rt_tx.clone());

    // Document model; the first snapshot starts the first cycle.
    let (doc_tx, doc_rx) = mpsc::unbounded_channel::<DocumentSnapshot>();
    let mut document = Document::new(&seed);
    document.subscribe(doc_tx);
    document.publish_current();

    // Optional config watcher (disabled in --once mode). It owns the document.
    let _watcher_handle = if !args.once {
        Some(watch::spawn_document_watcher(&config_path, document)?)
    } else {
        drop(document);
        None
    };

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    let settings = OrchestratorSettings {
        debounce: cfg.config.debounce(),
        task_timeout: cfg.config.task_timeout(),
    };
    let options = RuntimeOptions {
        exit_when_idle: args.once,
    };

    // Construct the pure core runtime (single source of truth for semantics).
    let core = CoreRuntime::new(builder, settings, options);

    // Construct the async IO shell around the core.
    let runtime = Runtime::new(core, rt_tx, rt_rx, doc_rx, ui_tx, executor);
    runtime.run().await?;

    // The runtime owned the last UI sender; let the renderer drain.
    if let Err(e) = renderer.await {
        debug!(error = %e, "renderer task ended abnormally");
    }
    Ok(())
}

/// Report a startup-fatal error to the UI, then return it.
async fn fatal(
    ui_tx: mpsc::UnboundedSender<UiEvent>,
    renderer: tokio::task::JoinHandle<()>,
    err: anyhow::Error,
) -> Result<()> {
    let _ = ui_tx.send(UiEvent::Fatal(format!("{err:#}")));
    drop(ui_tx);
    let _ = renderer.await;
    Err(err)
}

/// Dry-run output: print settings and every query the seed document produces.
fn print_dry_run(cfg: &ConfigFile, builder: &QueryBuilder, seed: &DocumentSnapshot) {
    println!("barliman dry-run");
    println!("  config.debounce_ms = {}", cfg.config.debounce_ms);
    println!("  config.task_timeout_ms = {}", cfg.config.task_timeout_ms);
    println!(
        "  config.scratch_dir = {}",
        cfg.config.effective_scratch_dir().display()
    );
    println!(
        "  holes = {}",
        seed.hole_markers().into_iter().collect::<String>()
    );
    println!();

    for kind in QueryKind::all() {
        match builder.build(seed, kind) {
            Ok(script) => {
                println!(";;; ---- {} ({}) ----", kind, exec::scratch_file_name(kind));
                println!("{script}");
            }
            Err(e) => debug!(kind = %kind, reason = %e, "not scheduled for this document"),
        }
    }

    debug!("dry-run complete (no execution)");
}
