use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,craftlist_lib=debug";

/// Install the global fmt subscriber. `RUST_LOG` overrides the default filter.
/// Calling it again once a subscriber is installed does nothing.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
    {
        tracing::debug!("Tracing initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        init_tracing();
        init_tracing();
    }
}
