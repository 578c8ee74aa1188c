use crate::config::LogSettings;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::str::FromStr;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Expands a bare level into a directive string. Anything containing `,`
/// or `=` is taken as written.
pub fn filter_directives(level: &str) -> String {
    let normalized = level.trim();
    if normalized.is_empty() {
        return "info".to_string();
    }
    if normalized.contains(',') || normalized.contains('=') {
        normalized.to_string()
    } else {
        format!("{normalized},mio=warn,crossterm=warn")
    }
}

/// Logs go to a file; the terminal belongs to the dashboard.
pub fn setup_logging(settings: &LogSettings) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&settings.file)
        .with_context(|| format!("failed to open log file {}", settings.file))?;
    let writer = Mutex::new(file);

    let filter_spec = filter_directives(&settings.level);
    let filter = EnvFilter::from_str(&filter_spec).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry().with(filter);

    if settings.json {
        let json_layer = fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(false)
            .with_current_span(false);
        subscriber.with(json_layer).try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .compact();
        subscriber.with(fmt_layer).try_init()?;
    }

    tracing::info!(
        filter = %filter_spec,
        format = if settings.json { "json" } else { "compact" },
        file = %settings.file,
        "logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_levels_quiet_the_terminal_crates() {
        assert_eq!(filter_directives("debug"), "debug,mio=warn,crossterm=warn");
        assert_eq!(filter_directives("  "), "info");
    }

    #[test]
    fn explicit_directives_pass_through() {
        assert_eq!(
            filter_directives("info,hwgw_batcher::sim=trace"),
            "info,hwgw_batcher::sim=trace"
        );
        assert!(EnvFilter::from_str(&filter_directives("warn")).is_ok());
    }
}
