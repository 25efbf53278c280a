//! # WA-Router Service
//!
//! Binary entry point for the WA-Router HTTP service.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes logging
//! - Builds the rule store, resolution cache and routing pipeline
//! - Starts the HTTP server from wa-router-api

mod bootstrap;

use bootstrap::build_routing_stack;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wa_router_api::{start_server, LoggingConfig, ServiceConfig};

const CONFIGURATION_EXIT_CODE: i32 = 3;

#[tokio::main]
async fn main() {
    // -------------------------------------------------------------------------
    // Load configuration
    //
    // Sources (later sources override earlier ones):
    //  1. /etc/wa-router/service.yaml   system-wide defaults
    //  2. ./config/service.yaml         deployment-local override
    //  3. Path given by WAR_CONFIG_FILE operator-specified file
    //  4. Environment variables prefixed WAR__ (double-underscore separator)
    //     e.g. WAR__SERVER__PORT=9090 sets server.port = 9090
    //
    // Every field carries a serde default, so an unconfigured environment
    // still produces a valid config. A malformed file is a hard error.
    // -------------------------------------------------------------------------
    let service_config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&LoggingConfig::default());
            error!(error = %e, "Failed to load service configuration; aborting");
            std::process::exit(CONFIGURATION_EXIT_CODE);
        }
    };

    init_tracing(&service_config.logging);
    info!("Starting WA-Router Service");

    if let Err(e) = service_config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(CONFIGURATION_EXIT_CODE);
    }

    let stack = match build_routing_stack(&service_config).await {
        Ok(stack) => stack,
        Err(e) => {
            error!(error = %e, "Failed to build routing stack; aborting");
            std::process::exit(e.exit_code());
        }
    };

    let (vendors, environments, rules) = stack.store.counts().await;
    if vendors == 0 {
        warn!("No vendors configured; every delivery will be answered with the failure body");
    }

    info!(
        vendors,
        environments,
        rules,
        host = %service_config.server.host,
        port = service_config.server.port,
        cache_ttl_seconds = service_config.cache.ttl_seconds,
        forward_timeout_seconds = service_config.forwarding.timeout_seconds,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(service_config, stack.pipeline, stack.cache).await {
        error!("Server terminated: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn load_config() -> Result<ServiceConfig, config::ConfigError> {
    let mut config_builder = config::Config::builder()
        .add_source(
            config::File::with_name("/etc/wa-router/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name("config/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    if let Ok(explicit_path) = std::env::var("WAR_CONFIG_FILE") {
        if !explicit_path.is_empty() {
            config_builder = config_builder.add_source(
                config::File::with_name(&explicit_path)
                    .required(true)
                    .format(config::FileFormat::Yaml),
            );
        }
    }

    config_builder
        .add_source(config::Environment::with_prefix("WAR").separator("__"))
        .build()?
        .try_deserialize()
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "wa_router_service={level},wa_router_api={level},wa_router_core={level},tower_http=info",
            level = logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json_format {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
