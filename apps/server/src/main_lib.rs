use std::sync::Arc;

use crate::config::Config;
use income_clarity_core::import::{ImportService, ImportServiceTrait};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub import_service: Arc<dyn ImportServiceTrait + Send + Sync>,
}

pub fn init_tracing() {
    let log_format = std::env::var("IC_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_state(config: &Config) -> Arc<AppState> {
    tracing::info!(
        "Import limits: {} rows, {} bytes, warning policy {:?}",
        config.import.max_rows,
        config.import.max_bytes,
        config.import.warning_policy
    );
    let import_service = Arc::new(ImportService::new(config.import.clone()));
    Arc::new(AppState { import_service })
}
