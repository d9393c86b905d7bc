//! spotx - Simulated Spot Exchange Engine
//!
//! Entry point: a line-oriented JSON driver. One command per stdin
//! line, one response per stdout line; market events and persistence
//! records are printed after the response so an external adapter can
//! fan them out.

use std::io::{self, BufRead, Write};

use chrono::Utc;
use spotx::config::AppConfig;
use spotx::engine::Engine;
use spotx::messages::Command;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "default".to_string()
}

fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env).unwrap_or_else(|e| {
        eprintln!("config load failed ({e}), using built-in defaults");
        AppConfig::default()
    });
    let _log_guard = spotx::logging::init_logging(&app_config);

    tracing::info!("Starting spotx engine in {} mode", env);

    let mut engine = Engine::new(&app_config.engine)?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let cmd: Command = match serde_json::from_str(&line) {
            Ok(cmd) => cmd,
            Err(e) => {
                tracing::warn!(%e, "driver.malformed_command");
                writeln!(out, "{{\"type\":\"ERROR\",\"payload\":{{\"message\":\"malformed command\"}}}}")?;
                continue;
            }
        };

        let now_ms = Utc::now().timestamp_millis();
        let output = engine.process(cmd, now_ms);

        writeln!(out, "{}", serde_json::to_string(&output.response)?)?;
        for event in &output.market_events {
            let envelope = serde_json::json!({
                "stream": event.topic(),
                "data": event,
            });
            writeln!(out, "{envelope}")?;
        }
        for record in &output.persistence {
            writeln!(out, "{}", serde_json::to_string(record)?)?;
        }
        out.flush()?;
    }

    Ok(())
}
