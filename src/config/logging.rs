use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError};

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rottenbikes=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
