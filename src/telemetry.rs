//! Structured logging setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::TryInitError;

/// Chooses the log filter: `RUST_LOG` wins, then `configured`, then `info`.
///
/// Returns the filter and, when `configured` could not be parsed, the parse
/// error so the caller can report it once logging is up.
#[must_use]
pub fn resolve_filter(configured: &str) -> (EnvFilter, Option<String>) {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return (filter, None);
    }
    match configured.parse::<EnvFilter>() {
        Ok(filter) => (filter, None),
        Err(err) => (EnvFilter::new("info"), Some(err.to_string())),
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`TryInitError`] when a global subscriber is already set.
pub fn init(filter: EnvFilter, json: bool) -> Result<(), TryInitError> {
    use tracing_subscriber::util::SubscriberInitExt;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    if json {
        subscriber.json().finish().try_init()
    } else {
        subscriber.finish().try_init()
    }
}
