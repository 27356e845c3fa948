use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::{fmt::time::UtcTime, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize logging: console output plus an optional rolling file
/// appender. Level precedence: config level, then `RUST_LOG`, then "info".
pub fn init_with_config(cfg: &LoggingConfig) {
    let filter = match &cfg.level {
        Some(level) => EnvFilter::new(level.as_str()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let file_writer = cfg.enable_file_logging.then(|| file_writer(cfg)).flatten();

    // The four layer stacks have distinct types, so each arm finishes the
    // subscriber itself. try_init keeps repeated initialization (tests) from
    // panicking.
    let result = match (cfg.format, file_writer) {
        (LogFormat::Json, Some(writer)) => registry
            .with(json_layer(std::io::stdout))
            .with(json_layer(writer))
            .try_init(),
        (LogFormat::Json, None) => registry.with(json_layer(std::io::stdout)).try_init(),
        (LogFormat::Text, Some(writer)) => registry
            .with(text_layer(std::io::stdout, true))
            .with(text_layer(writer, false))
            .try_init(),
        (LogFormat::Text, None) => registry
            .with(text_layer(std::io::stdout, true))
            .try_init(),
    };
    let _ = result;
}

fn json_layer<S, W>(writer: W) -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    W: for<'a> tracing_subscriber::fmt::MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_ansi(false)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(writer)
}

fn text_layer<S, W>(writer: W, ansi: bool) -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    W: for<'a> tracing_subscriber::fmt::MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_ansi(ansi)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(writer)
}

/// Build the non-blocking rolling file writer, or fall back to console-only
/// logging when the log directory cannot be created.
fn file_writer(cfg: &LoggingConfig) -> Option<NonBlocking> {
    let rotation = match cfg.rotation.to_lowercase().as_str() {
        "hourly" => tracing_appender::rolling::Rotation::HOURLY,
        "never" => tracing_appender::rolling::Rotation::NEVER,
        _ => tracing_appender::rolling::Rotation::DAILY,
    };

    if let Err(error) = std::fs::create_dir_all(&cfg.dir) {
        eprintln!(
            "Failed to create log directory '{}' ({error}), continuing with console logs",
            cfg.dir
        );
        return None;
    }

    let appender =
        tracing_appender::rolling::RollingFileAppender::new(rotation, &cfg.dir, &cfg.filename);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    // Dropping the guard would lose buffered lines; it must outlive every
    // log call, so leak it.
    Box::leak(Box::new(guard));

    Some(writer)
}
