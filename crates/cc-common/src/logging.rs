//! Logging bootstrap for ClinicCore client crates
//!
//! Call [`init_logging`] once at startup, before the first SDK call.
//! `RUST_LOG` sets the filter (default `info`, e.g.
//! `RUST_LOG=cc_client=debug,reqwest=warn`); `LOG_FORMAT=json` emits
//! JSON lines for log shippers, anything else prints human-readable
//! text.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber for the named consumer.
pub fn init_logging(service_name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().flatten_event(true).with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_ansi(true))
            .init();
    }

    tracing::debug!(service = service_name, "Logging initialized");
}

/// [`init_logging`] under the platform's default service name.
pub fn init_default_logging() {
    init_logging("cliniccore");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert_eq!(EnvFilter::new("info").to_string(), "info");
    }
}
