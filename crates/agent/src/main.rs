use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig as _;

use td_agent::api;
use td_agent::bootstrap;
use td_agent::cli::{Cli, Command, ConfigCommand};
use td_domain::config::{Config, ObservabilityConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Secrets may live in a local .env file.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        // Default to serve when no subcommand is given.
        None | Some(Command::Serve) => {
            let (config, _) = td_agent::cli::load_config()?;
            let tracer_provider = init_tracing(&config.observability);
            run_server(Arc::new(config), tracer_provider).await
        }
        Some(Command::Run { message, model }) => {
            init_cli_tracing();
            let (config, _) = td_agent::cli::load_config()?;
            td_agent::cli::run::run(Arc::new(config), message, model).await
        }
        Some(Command::Chat { model }) => {
            init_cli_tracing();
            let (config, _) = td_agent::cli::load_config()?;
            td_agent::cli::chat::chat(Arc::new(config), model).await
        }
        Some(Command::History { limit }) => {
            init_cli_tracing();
            let (config, _) = td_agent::cli::load_config()?;
            td_agent::cli::history::show(&config, limit).await
        }
        Some(Command::ImportLegacy { file }) => {
            init_cli_tracing();
            let (config, _) = td_agent::cli::load_config()?;
            td_agent::cli::import::import_legacy(&config, &file).await
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = td_agent::cli::load_config()?;
            if !td_agent::cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _) = td_agent::cli::load_config()?;
            td_agent::cli::config::show(&config)
        }
        Some(Command::Config(ConfigCommand::SetSecret { service, account })) => {
            init_cli_tracing();
            td_agent::cli::config::set_secret(&service, &account)
        }
        Some(Command::Version) => {
            println!("tidings {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// JSON logs for `serve`, plus OTLP span export when
/// `observability.otlp_endpoint` is set. The returned provider is shut down
/// on exit so buffered spans are flushed.
fn init_tracing(
    obs: &ObservabilityConfig,
) -> Option<opentelemetry_sdk::trace::SdkTracerProvider> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,td_agent=debug"));
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json());

    let tracer_provider = obs
        .exports()
        .then(|| otlp_tracer_provider(obs))
        .flatten();

    match &tracer_provider {
        Some(provider) => registry
            .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("tidings")))
            .init(),
        None => registry.init(),
    }
    tracer_provider
}

fn otlp_tracer_provider(
    obs: &ObservabilityConfig,
) -> Option<opentelemetry_sdk::trace::SdkTracerProvider> {
    let endpoint = obs.otlp_endpoint.as_deref()?;
    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            // The subscriber is not installed yet.
            eprintln!("WARNING: OTLP exporter for {endpoint} failed ({e}); spans will not be exported");
            return None;
        }
    };

    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(obs.service_name.clone())
        .build();

    Some(
        opentelemetry_sdk::trace::SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(obs.sample_rate))
            .with_resource(resource)
            .build(),
    )
}

/// Initialize compact stderr-only tracing for CLI one-shot commands.
///
/// Defaults to `warn` level so diagnostic output does not pollute stdout.
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Serve the HTTP trigger until SIGINT/SIGTERM.
async fn run_server(
    config: Arc<Config>,
    tracer_provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
) -> anyhow::Result<()> {
    tracing::info!("Tidings starting");

    // The server is the single writer for this history while it runs.
    let _lock = td_agent::cli::lock::acquire_history_lock(&config.history.lock_path())?;

    let state = bootstrap::build_app_state(config.clone(), None)?;

    let app = api::router(&state)
        .layer(TraceLayer::new_for_http())
        .layer(tower::limit::ConcurrencyLimitLayer::new(64))
        .with_state(state.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    tracing::info!(addr = %addr, endpoint = %config.server.endpoint, "Tidings listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("axum server error")?;

    td_agent::runtime::drain_runs(&state).await;

    if let Some(provider) = tracer_provider {
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = ?e, "OpenTelemetry tracer provider shutdown failed");
        }
    }

    tracing::info!("shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot register SIGTERM handler, SIGINT only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        tracing::info!("received SIGINT, shutting down");
    }
}
