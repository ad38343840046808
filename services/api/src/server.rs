use crate::cli::ServeArgs;
use crate::infra::{review_service, store_path, AppState, ConfiguredStore};
use crate::routes::with_placement_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use wil_risk::config::AppConfig;
use wil_risk::error::AppError;
use wil_risk::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = ConfiguredStore::open(store_path(args.store.as_deref(), &config))?;
    let service = review_service(&config.risk, Arc::new(store));

    let app = with_placement_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        sustainable_daily_hours = config.risk.scoring.sustainable_daily_hours,
        no_response_window_days = config.risk.scoring.no_response_window_days,
        "placement risk review service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
