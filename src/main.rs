use sinapi_budget_rust::{api, AppConfig, CandidateExtractor, DatasetCache, LoaderOptions};
use tracing::{info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging with local time
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // configuration
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Config file/env layering failed ({}), using plain environment", e);
            AppConfig::from_env()
        }
    };
    info!("Starting server with config: {:?}", config);

    // composition sheet, loaded once
    let cache = DatasetCache::new(LoaderOptions {
        header_row: config.dataset.header_row,
        csv_delimiter: config.csv_delimiter_byte(),
    });
    let report = cache.load(&config.dataset.path);
    match &report.error {
        None => info!("Dataset ready: {} compositions", report.dataset.len()),
        Some(reason) => warn!("Serving with an empty dataset: {}", reason),
    }

    let extractor = CandidateExtractor::new(&config.extractor)?;
    if config.extractor.api_key.is_none() {
        warn!("No extractor API key configured; /api/pages/extract needs one per request");
    }

    let state = api::AppState::new(report.dataset, extractor);
    let app = api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/search            - composition lookup");
    info!("  POST /api/pages/extract     - services from page text");
    info!("  GET  /api/session           - pending queue and last search");
    info!("  GET  /api/budget/export     - budget as CSV");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
