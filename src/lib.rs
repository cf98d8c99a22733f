pub mod api;
pub mod core;

use std::sync::Once;

static LOGGER: Once = Once::new();

/// Installs the `env_logger` backend. `RUST_LOG` overrides the `info` default.
pub fn init_logging() {
    LOGGER.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init();
    });
}
