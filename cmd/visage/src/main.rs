//! visage - audio-to-blendshape inference service.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use visage_engine::{BackendSelection, Engine};
use visage_native::{bring_up, BringUpConfig, BringUpReport};
use visage_readiness::{CheckStatus, Readiness, ReadinessVerdict};
use visage_server::{router, standard_checks, AppState, Config};

/// Audio-to-blendshape inference service.
///
/// Startup runs in a fixed order: environment, native GPU bring-up, engine
/// initialization, readiness checks. The HTTP listener starts afterwards and
/// keeps serving status routes even when the engine is unavailable.
#[derive(Parser)]
#[command(name = "visage")]
#[command(about = "Audio-to-blendshape inference service")]
#[command(version)]
struct Cli {
    /// Config file (default is ~/.visage/server/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve(ServeArgs),
    /// Run the readiness checks and exit 0 when healthy
    Check,
    /// Run the native bring-up alone and exit 0 when ready
    Bringup,
}

#[derive(Args)]
struct ServeArgs {
    /// Listen host
    #[arg(long)]
    host: Option<String>,

    /// Listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Engine backend: binding, shared_library or auto
    #[arg(long)]
    backend: Option<BackendSelection>,

    /// Scratch directory for uploads
    #[arg(long)]
    temp_dir: Option<PathBuf>,
}

impl ServeArgs {
    fn apply(self, config: &mut Config) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(backend) = self.backend {
            config.engine.backend = backend;
        }
        if let Some(dir) = self.temp_dir {
            config.temp_dir = dir;
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref()).context("load config")?;
    init_tracing(&config.log_level, cli.verbose);
    info!(source = %config.source_description(), "configuration loaded");

    // Still single-threaded here: no runtime has been built yet.
    unsafe { config.bringup.apply_env() };

    match cli.command {
        Commands::Serve(args) => {
            args.apply(&mut config);
            serve(config)
        }
        Commands::Check => Ok(check(&config)),
        Commands::Bringup => bringup(&config.bringup),
    }
}

fn init_tracing(level: &str, verbose: bool) {
    let default = if verbose {
        "debug".to_string()
    } else {
        format!("{level},tower_http=info")
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn serve(config: Config) -> anyhow::Result<ExitCode> {
    info!(version = env!("CARGO_PKG_VERSION"), "starting visage");

    let report = bring_up(&config.bringup).clone();
    let engine = Arc::new(Engine::new());
    if report.is_ready() || !config.bringup.enabled {
        match engine.initialize(&config.engine) {
            Ok(info) => info!(model = %info.model_path, backend = ?info.backend, "engine ready"),
            Err(e) => error!(error = %e, "engine unavailable, inference routes will return 503"),
        }
    } else {
        warn!("native bring-up failed, engine not initialized");
    }

    let readiness = Readiness::new(standard_checks(&config));
    print_verdict(&readiness.verdict());

    let addr = config.bind_addr();
    let state = AppState::new(config, engine.clone(), readiness, report);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    let served = runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("bind {addr}"))?;
        info!("listening on http://{addr}");
        axum::serve(listener, router(state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("serve")
    });

    engine.release();
    served?;
    info!("stopped");
    Ok(ExitCode::SUCCESS)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

fn check(config: &Config) -> ExitCode {
    let verdict = standard_checks(config).run_all();
    print_verdict(&verdict);
    if verdict.healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_verdict(verdict: &ReadinessVerdict) {
    println!();
    for result in &verdict.results {
        let mark = match result.status {
            CheckStatus::Passed => "ok  ",
            CheckStatus::Failed => "FAIL",
            CheckStatus::Warning => "warn",
        };
        println!("[{mark}] {}: {}", result.name, result.detail);
    }
    println!();
    println!("{}", verdict.summary());
    if !verdict.healthy {
        println!("Critical checks failed; inference may be unavailable.");
    } else if verdict.warnings > 0 {
        println!("Ready with warnings.");
    } else {
        println!("All checks passed.");
    }
    println!();
}

fn bringup(config: &BringUpConfig) -> anyhow::Result<ExitCode> {
    let report: &BringUpReport = bring_up(config);
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(if report.is_ready() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
