use std::path::Path;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::config::{load_config, DemoConfig};

const CONFIG_PATH_ENV_VAR: &str = "ATMOS_DEMO_CONFIG";

pub(crate) struct AppWiring {
    pub(crate) config: DemoConfig,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Atmosphere Demo Startup ===");

    AppWiring {
        config: resolve_config(std::env::var(CONFIG_PATH_ENV_VAR).ok().as_deref()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// A missing or broken config file never blocks startup.
fn resolve_config(raw_path: Option<&str>) -> DemoConfig {
    let Some(raw_path) = raw_path.map(str::trim).filter(|path| !path.is_empty()) else {
        return DemoConfig::default();
    };
    match load_config(Path::new(raw_path)) {
        Ok(config) => {
            info!(path = raw_path, "demo_config_loaded");
            config
        }
        Err(error) => {
            warn!(error = %error, "demo_config_invalid_using_defaults");
            DemoConfig::default()
        }
    }
}
