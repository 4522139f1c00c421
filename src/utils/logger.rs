use std::io;
use std::sync::Mutex;

use slog::{o, Drain, Logger};

/// Builds a structured JSON logger writing to stdout. Called once at process
/// startup (CLI entry points and the HTTP server) and passed down explicitly
/// rather than held behind a global, per §9's "no singletons" design note.
pub fn get_logger() -> Logger {
    let drain = slog_json::Json::default(io::stdout()).fuse();
    let drain = Mutex::new(drain).fuse();
    Logger::root(drain, o!())
}
