use std::sync::Arc;

use krishi_assist::assistant::Assistant;
use krishi_assist::channels::CliChannel;
use krishi_assist::config::AppConfig;
use krishi_assist::data::{DataService, LatencyProfile, StaticDataService};
use krishi_assist::engine::create_engine;
use krishi_assist::flow::{FlowNavigator, Generation};
use krishi_assist::server::api_routes;
use krishi_assist::session::{PreferencesStore, SessionStore, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing — daily-rolling file when KRISHI_LOG_DIR is set,
    // stderr otherwise. The appender guard must outlive the runtime.
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    let _log_guard = match std::env::var("KRISHI_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "krishi-assist.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .init();
            None
        }
    };

    let config = AppConfig::load()?;

    // ── Storage ──────────────────────────────────────────────────────────
    let data_dir = std::env::var("KRISHI_DATA_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            std::path::PathBuf::from(home).join(".krishi-assist")
        });
    let storage = Arc::new(Storage::open(&data_dir)?);
    let session = SessionStore::open(Arc::clone(&storage));
    let prefs = PreferencesStore::open(storage);

    // ── Data services ────────────────────────────────────────────────────
    let latency = if config.data.simulate_latency {
        LatencyProfile::default()
    } else {
        LatencyProfile::off()
    };
    let data: Arc<dyn DataService> = Arc::new(StaticDataService::from_embedded(latency)?);

    // ── Core ─────────────────────────────────────────────────────────────
    let engine = create_engine(&config, Arc::clone(&data));
    let generation = Generation::new();
    let navigator = FlowNavigator::new(
        Arc::clone(&session),
        Arc::clone(&data),
        Arc::clone(&generation),
        &config,
    );
    let assistant = Assistant::new(
        Arc::clone(&session),
        engine.clone(),
        navigator,
        generation,
        config.chat.clone(),
    );
    assistant.navigator().initialize().await;

    eprintln!("🌾 {} v{}", config.branding.app_name, env!("CARGO_PKG_VERSION"));
    eprintln!("   {}", config.branding.tagline);
    eprintln!("   Engine: {}", engine.name());
    eprintln!("   Storage: {}", data_dir.display());
    eprintln!("   API: http://{}/api/session", config.server.bind_addr);
    eprintln!("   WS: ws://{}/ws", config.server.bind_addr);
    eprintln!("   Type a message and press Enter. /help for commands, /quit to exit.\n");

    // ── HTTP/WS server ───────────────────────────────────────────────────
    let app = api_routes(Arc::clone(&assistant), Arc::clone(&prefs));
    let bind_addr = config.server.bind_addr.clone();
    tokio::spawn(async move {
        let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(addr = %bind_addr, error = %e, "Failed to bind API server");
                return;
            }
        };
        tracing::info!(addr = %bind_addr, "API server started");
        axum::serve(listener, app).await.ok();
    });

    // ── CLI REPL ─────────────────────────────────────────────────────────
    CliChannel::new(assistant).run().await?;

    Ok(())
}
