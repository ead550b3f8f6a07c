pub mod api;
pub mod app;
pub mod config;
pub mod disclosure;
pub mod events;
pub mod feed;
pub mod routes;
pub mod session;
pub mod types;
pub mod view;

#[cfg(test)]
mod test_support;

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::HttpDetectorApi;
use crate::app::App;
use crate::events::EventBus;

/// Initialize structured logging with tracing.
/// Respects RUST_LOG env var; defaults to `info` level for the vigil crate.
/// Without a log file, logs go to stderr, which shares the terminal with the page.
pub fn init_tracing(log_file: Option<&Path>) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vigil=info,vigil_lib=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

/// Open `path` for appending, creating it and its parent directory if needed.
pub fn open_log_file(path: &Path) -> Result<File, String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create log directory {}: {}", parent.display(), e))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))
}

pub fn run() -> Result<(), String> {
    dotenvy::dotenv().ok();
    let config = config::load().map_err(|e| e.to_string())?;
    init_tracing(config.log_file.as_deref())?;

    let api = HttpDetectorApi::from_config(&config).map_err(|e| e.to_string())?;
    info!(base_url = api.base_url(), "Starting vigil");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to build runtime: {}", e))?;

    let result = runtime.block_on(async move {
        let app = App::new(Arc::new(api), config, EventBus::new());
        app::run_shell(app).await
    });
    // A blocked stdin read must not hold up exit.
    runtime.shutdown_background();
    result
}
