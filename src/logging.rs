// logging.rs - tracing initialization for the engine process

use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Level directives derived from config. Disabling tracing silences the
/// engine's own targets (the `spotx` crate and the bare `orderbook`
/// target its fill events use) while dependency logs stay at the
/// configured level.
fn build_filter(config: &AppConfig) -> EnvFilter {
    let directives = if config.enable_tracing {
        config.log_level.clone()
    } else {
        format!("{},spotx=off,orderbook=off", config.log_level)
    };
    EnvFilter::new(directives)
}

/// Install the global subscriber: a rolling file sink (JSON or plain)
/// plus a plain stdout layer in non-JSON mode. The returned guard must
/// be held for the lifetime of the process or buffered lines are lost.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let appender = match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => tracing_appender::rolling::daily(&config.log_dir, &config.log_file),
        _ => tracing_appender::rolling::never(&config.log_dir, &config.log_file),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);

    // RUST_LOG wins over the config-derived directives.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| build_filter(config));
    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        // JSON sink for log shippers; targets kept so events can be
        // queried by name (engine.order_placed, orderbook.fill, ...).
        let file_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(writer)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_writer(writer)
            .with_ansi(false);
        let stdout_layer = fmt::layer().with_target(false).with_ansi(true);
        registry.with(file_layer).with(stdout_layer).init();
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_tracing_silences_engine_targets() {
        let cfg = AppConfig {
            enable_tracing: false,
            ..AppConfig::default()
        };
        let filter = build_filter(&cfg).to_string();
        assert!(filter.contains("spotx=off"));
        assert!(filter.contains("orderbook=off"));
    }

    #[test]
    fn enabled_tracing_uses_configured_level_only() {
        let cfg = AppConfig {
            log_level: "debug".to_string(),
            ..AppConfig::default()
        };
        let filter = build_filter(&cfg).to_string();
        assert_eq!(filter, "debug");
    }
}
