//! Tessera Runtime
//!
//! Client-facing entry point: logging setup, configuration loading, the
//! worklet dispatcher and the [`TesseraRuntime`] asset facade.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::path::Path;
//! use tessera_runtime::prelude::*;
//!
//! let config = tessera_runtime::init(Some(Path::new("tessera.toml")))?;
//! let runtime = TesseraRuntime::builder(parser).with_config(config).build()?;
//!
//! let file = runtime.files().from_url(url, Some(&assets)).await?;
//! file.update_referenced_assets(&more_assets);
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

mod runtime;

#[cfg(test)]
mod tests;

pub use runtime::{TesseraRuntime, TesseraRuntimeBuilder};

pub use tessera_assets;
pub use tessera_core;
pub use tessera_platform;

use tessera_assets::AssetLoaderConfig;
use tessera_core::Relay;

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "tessera_core=info,tessera_assets=info,tessera_runtime=info";

/// Install a `tracing` fmt subscriber filtered by `RUST_LOG`
///
/// Does nothing if a global subscriber is already set.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Initialize logging and load the asset configuration
///
/// Without a path the standard configuration is used. A configured cache
/// root becomes the host cache area.
pub fn init(config_path: Option<&Path>) -> anyhow::Result<AssetLoaderConfig> {
    init_logging();

    let config = match config_path {
        Some(path) => AssetLoaderConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AssetLoaderConfig::standard(),
    };
    if let Some(root) = &config.cache_root {
        tessera_platform::cache_area::set_cache_root(root.clone());
    }

    tracing::info!(
        "Tessera initialized (cache {}, timeout {}s)",
        if config.cache_enabled { "on" } else { "off" },
        config.http_timeout().as_secs()
    );
    Ok(config)
}

/// Install the process-wide relay for callbacks boxed on the worklet context
///
/// Idempotent. Call it on the context that will drain the relay.
pub fn install_worklet_dispatcher() -> Arc<Relay> {
    tessera_core::install_dispatcher()
}

pub mod prelude {
    pub use crate::{init, init_logging, install_worklet_dispatcher, TesseraRuntime};
    pub use tessera_assets::{
        AssetFile, AssetFileFactory, AssetLoaderConfig, BatchReport, DataLoaderError,
        DataSource, ReferencedAsset, ReferencedAssets,
    };
    pub use tessera_core::{
        BooleanProperty, ColorProperty, EnumProperty, ImageProperty, ListProperty,
        NumberProperty, PropertyListeners, PropertyValue, StringProperty, TriggerProperty,
    };
}
