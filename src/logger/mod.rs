//! Logger module
//!
//! Logging utilities for the rendering server:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Render failure and dev-reload logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use crate::render::RenderError;
use std::net::SocketAddr;
use std::time::Duration;

/// Initialize the logger with configuration
///
/// Should be called once at application startup.
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

/// Write to info/access log
fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_access(message),
        None => println!("{message}"),
    }
}

/// Write to error log
fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("Render server started successfully");
    write_info(&format!("Listening on: http://{addr}"));
    write_info(&format!("Mode: {:?}", config.mode));
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("======================================\n");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_info(&entry.format(format));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

/// Record a render failure together with the URL that triggered it
pub fn log_render_failure(url: &str, err: &RenderError) {
    write_error(&format!("[ERROR] Render failed for '{url}': {err}"));
}

/// Record the duration of a completed render
pub fn log_render_complete(url: &str, elapsed: Duration) {
    write_info(&format!("[Render] '{url}' completed in {elapsed:?}"));
}

pub fn log_reload_installed() {
    write_info("[Reload] Renderer and template refreshed from build output");
}

pub fn log_reload_failed(detail: &str) {
    write_error(&format!("[WARN] Reload skipped: {detail}"));
}

pub fn log_waiting_for_build() {
    write_info("[Reload] Waiting for build artifacts...");
}

pub fn log_shutdown() {
    write_info("\n[Shutdown] Interrupt received, stopping server");
}
