// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup: configuration, connections, catalog load, runtime
//! assembly.

use crate::env;
use dalston_adapters::{
    EventBusError, LeaseError, RedisEventBus, RedisEventSubscriber, RedisLease, RedisRegistry,
    RedisStreams, RegistryError, StreamError,
};
use dalston_catalog::{Catalog, CatalogError};
use dalston_core::{Knobs, SystemClock, UuidIdGen};
use dalston_engine::{Runtime, RuntimeDeps, StaleScanner};
use dalston_storage::{PgStore, StoreError};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors during daemon startup
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("stream error: {0}")]
    Stream(#[from] StreamError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("event bus error: {0}")]
    Bus(#[from] EventBusError),
    #[error("lease error: {0}")]
    Lease(#[from] LeaseError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon configuration, resolved from the environment.
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub catalog_path: PathBuf,
    pub log_path: Option<PathBuf>,
    pub knobs: Knobs,
    /// This controller's identity, used as the leader-lease owner.
    pub instance_id: String,
}

impl Config {
    pub fn load() -> Result<Self, LifecycleError> {
        Ok(Self {
            database_url: env::database_url()?,
            redis_url: env::redis_url(),
            catalog_path: env::catalog_path(),
            log_path: env::log_path(),
            knobs: env::knobs(),
            instance_id: format!("dalstond-{}", uuid::Uuid::new_v4()),
        })
    }
}

/// The controller's production runtime type.
pub type ControllerRuntime =
    Runtime<PgStore, RedisStreams, RedisRegistry, RedisEventBus, SystemClock, UuidIdGen>;

/// The controller's production scanner type.
pub type ControllerScanner = StaleScanner<RedisStreams, RedisEventBus, RedisLease, SystemClock>;

/// A fully-wired controller.
pub struct Daemon {
    pub runtime: ControllerRuntime,
    pub scanner: ControllerScanner,
    pub subscriber: RedisEventSubscriber,
}

/// Connect the stores, load and validate the catalog, assemble the
/// runtime. A malformed catalog fails startup here.
pub async fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    let store = PgStore::connect(&config.database_url).await?;
    tracing::info!("database connected, migrations applied");

    let streams = RedisStreams::connect(&config.redis_url).await?;
    let registry = RedisRegistry::connect(&config.redis_url).await?;
    let bus = RedisEventBus::connect(&config.redis_url).await?;
    let lease = RedisLease::connect(&config.redis_url, config.instance_id.clone()).await?;
    let subscriber = RedisEventSubscriber::connect(&config.redis_url).await?;
    tracing::info!(instance = %config.instance_id, "redis adapters connected");

    let catalog = Arc::new(Catalog::load(&config.catalog_path)?);

    let runtime = Runtime::new(
        RuntimeDeps {
            store,
            streams: streams.clone(),
            registry,
            bus: bus.clone(),
        },
        catalog,
        config.knobs.clone(),
        SystemClock,
        UuidIdGen,
    );
    let scanner = StaleScanner::new(streams, bus, lease, SystemClock, config.knobs.clone());

    Ok(Daemon {
        runtime,
        scanner,
        subscriber,
    })
}
