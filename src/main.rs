use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use tracing::Level;
use wait_watch::clock::{Clock, SystemClock};
use wait_watch::config::{self, Config, NotifierKind};
use wait_watch::error::AppError;
use wait_watch::estimation::model::Estimator;
use wait_watch::history::csv::{HistorySources, load_store};
use wait_watch::history::AttractionId;
use wait_watch::lightning::{LaneContext, LaneWatch};
use wait_watch::monitor::{Monitor, MonitorRegistry, TickContext};
use wait_watch::notify::log::LogNotifier;
use wait_watch::notify::pushover::{self, PushoverNotifier};
use wait_watch::notify::{Notifier, NotifyError};
use wait_watch::source::LiveReadingSource;
use wait_watch::source::thrill::ThrillPageSource;
use wait_watch::{api, estimation, scheduler, state};

/// Install the global subscriber. Returns the rejected level string, if any,
/// so it can be reported once logging works.
fn init_tracing(level: &str) -> Option<String> {
    let (max_level, rejected) = match level.parse::<Level>() {
        Ok(parsed) => (parsed, None),
        Err(_) => (Level::INFO, Some(level.to_string())),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(max_level)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
    rejected
}

fn main() -> Result<(), AppError> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let config = config::load_from_path(&config_path)?;
    if let Some(rejected) = init_tracing(&config.logging.level) {
        tracing::warn!(level = %rejected, "Unrecognised [logging].level, using info");
    }
    tracing::info!(config_path = %config_path, app = %config.app.name, "wait-watch starting");

    // The local offset can only be read reliably before worker threads exist.
    let clock = SystemClock::detect();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config, clock))
}

async fn run(config: Config, clock: SystemClock) -> Result<(), AppError> {
    let attractions: Vec<(AttractionId, HistorySources)> = config
        .attractions
        .iter()
        .map(|attraction| (attraction.id(), attraction.history_sources()))
        .collect();
    let store = load_store(attractions.iter().map(|(id, sources)| (id, sources)))?;
    tracing::info!(
        attractions = store.attractions().count(),
        samples = store.len(),
        "History loaded"
    );

    let mut registry = MonitorRegistry::new();
    for attraction in &config.attractions {
        let monitor = Monitor::new(attraction.id(), attraction.monitor_settings());
        if registry.insert(monitor).is_some() {
            tracing::warn!(attraction = %attraction.name, "Duplicate attraction replaced");
        }
    }

    let estimator = estimation::create_estimator(config.estimator_kind());
    tracing::info!(model = estimator.name(), "Estimator selected");

    let source = Arc::new(ThrillPageSource::new(
        config.source_url(),
        config.source_timeout(),
    )?);
    let notifier = build_notifier(&config)?;
    let clock: Arc<dyn Clock> = Arc::new(clock);
    let state = Arc::new(RwLock::new(state::AppState::new()));

    let ctx = TickContext {
        store: Arc::new(store),
        estimator,
        source: Arc::clone(&source) as Arc<dyn LiveReadingSource>,
        notifier: Arc::clone(&notifier),
        clock: Arc::clone(&clock),
        state: Arc::clone(&state),
    };
    let mut handle = scheduler::spawn(registry.into_monitors(), ctx, config.scheduler_mode());

    let lanes = lane_watches(&config);
    if !lanes.is_empty() {
        tracing::info!(lanes = lanes.len(), "Lightning Lane tracking enabled");
        let lane_ctx = LaneContext {
            source,
            notifier,
            clock,
            state: Arc::clone(&state),
        };
        handle.spawn_lanes(lanes, lane_ctx);
    }

    let app = api::router(Arc::clone(&state));
    let port = config.server_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(tasks = handle.task_count(), "Stopping monitors");
    handle.shutdown().await;
    tracing::info!("wait-watch stopped");

    Ok(())
}

fn lane_watches(config: &Config) -> Vec<LaneWatch> {
    config
        .attractions
        .iter()
        .filter_map(|attraction| {
            attraction
                .lane_settings()
                .map(|settings| LaneWatch::new(attraction.id(), settings))
        })
        .collect()
}

fn build_notifier(config: &Config) -> Result<Arc<dyn Notifier>, NotifyError> {
    match config.notifier_kind() {
        NotifierKind::Log => Ok(Arc::new(LogNotifier)),
        NotifierKind::Pushover => {
            let section = config
                .notifier
                .as_ref()
                .ok_or_else(|| NotifyError::Unavailable("missing [notifier] section".to_string()))?;
            let token = section
                .token
                .clone()
                .ok_or_else(|| NotifyError::Unavailable("missing pushover token".to_string()))?;
            let user = section
                .user
                .clone()
                .ok_or_else(|| NotifyError::Unavailable("missing pushover user".to_string()))?;
            let endpoint = section
                .endpoint
                .clone()
                .unwrap_or_else(|| pushover::DEFAULT_ENDPOINT.to_string());
            let notifier = PushoverNotifier::new(endpoint, token, user, config.source_timeout())?;
            Ok(Arc::new(notifier))
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
