use std::fmt::Display;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Name of the env variable which controls log output, e.g. `TIMELINE_LOG=timeline_engine=debug`.
pub const LOG_ENV_VAR: &str = "TIMELINE_LOG";

/// Installs a global fmt subscriber filtered by [`LOG_ENV_VAR`].
///
/// Returns `false` if a global subscriber was installed already (e.g. by the host).
pub fn setup_tracing() -> bool {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_env(LOG_ENV_VAR))
        .finish();
    tracing::subscriber::set_global_default(subscriber).is_ok()
}

pub fn ok_or_log_as_warn<T, E: Display>(result: Result<T, E>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!("{e}");
            None
        }
    }
}
