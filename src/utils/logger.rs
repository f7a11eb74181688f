use std::io::Write;

use anyhow::Result;
use chrono::Local;
use env_logger::Builder;
use log::{debug, LevelFilter};

pub fn init(level: &str) -> Result<()> {
    // LOG_LEVEL in the environment wins over the configured level
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| level.to_string());
    let filter = match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    };

    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            writeln!(
                buf,
                "[{}] [{}] {}",
                timestamp,
                record.level(),
                record.args()
            )
        })
        .filter(None, filter);

    // Optionally split logging out to a file
    if let Ok(log_file) = std::env::var("LOG_FILE") {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();

    debug!("Logger initialized with level: {}", level);
    Ok(())
}
