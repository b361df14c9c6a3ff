use std::ops::{Deref, DerefMut};
use std::time::Duration;

use deadpool::managed;
use tablet_core::driver::{Capability, Connection, Driver};
use tracing::{debug, trace};

use crate::db::Connect;
use crate::{Error, Result};

/// Sizing and wait limits for a [`Pool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Upper bound on open connections. A driver limit, such as in-memory
    /// SQLite, takes precedence when smaller.
    pub max_size: usize,

    /// How long a checkout may wait for a free connection. `None` waits
    /// forever.
    pub wait_timeout: Option<Duration>,
}

impl PoolConfig {
    pub fn new() -> PoolConfig {
        PoolConfig {
            max_size: managed::PoolConfig::default().max_size,
            wait_timeout: None,
        }
    }

    pub fn max_size(mut self, max_size: usize) -> PoolConfig {
        self.max_size = max_size;
        self
    }

    pub fn wait_timeout(mut self, timeout: Duration) -> PoolConfig {
        self.wait_timeout = Some(timeout);
        self
    }

    fn timeouts(&self) -> managed::Timeouts {
        managed::Timeouts {
            wait: self.wait_timeout,
            ..managed::Timeouts::default()
        }
    }
}

impl Default for PoolConfig {
    fn default() -> PoolConfig {
        PoolConfig::new()
    }
}

/// Driver connections shared by every [`Table`](crate::Table) of a database.
#[derive(Debug)]
pub struct Pool {
    connections: managed::Pool<DriverManager>,
    capability: &'static Capability,
}

impl Pool {
    pub fn new(driver: impl Driver, config: PoolConfig) -> Result<Pool> {
        let capability = driver.capability();
        let max_size = driver
            .max_connections()
            .map_or(config.max_size, |cap| cap.min(config.max_size));

        debug!(max_size, "building connection pool");

        let connections = managed::Pool::builder(DriverManager(Box::new(driver)))
            .runtime(deadpool::Runtime::Tokio1)
            .max_size(max_size)
            .timeouts(config.timeouts())
            .build()
            .map_err(Error::connection_pool)?;

        Ok(Pool {
            connections,
            capability,
        })
    }

    /// Builds a pool with default settings for the driver named by `url`.
    pub fn connect(url: &str) -> Result<Pool> {
        Pool::new(Connect::new(url)?, PoolConfig::default())
    }

    /// Checks out a connection, opening a new one if none is idle.
    pub async fn get(&self) -> Result<PoolConnection> {
        let connection = self.connections.get().await.map_err(Error::connection_pool)?;

        trace!(
            available = self.connections.status().available,
            "checked out connection"
        );

        Ok(PoolConnection(connection))
    }

    pub fn capability(&self) -> &'static Capability {
        self.capability
    }

    /// Stops handing out connections. Checked-out connections close when
    /// they are returned.
    pub fn close(&self) {
        self.connections.close();
    }

    pub fn is_closed(&self) -> bool {
        self.connections.is_closed()
    }
}

#[derive(Debug)]
struct DriverManager(Box<dyn Driver>);

impl managed::Manager for DriverManager {
    type Type = Box<dyn Connection>;
    type Error = Error;

    async fn create(&self) -> Result<Box<dyn Connection>> {
        self.0.connect().await
    }

    async fn recycle(
        &self,
        _connection: &mut Box<dyn Connection>,
        _metrics: &managed::Metrics,
    ) -> managed::RecycleResult<Error> {
        Ok(())
    }
}

/// A checked-out connection. Dropping it hands the connection back.
pub struct PoolConnection(managed::Object<DriverManager>);

impl std::fmt::Debug for PoolConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PoolConnection").field(&**self.0).finish()
    }
}

impl Deref for PoolConnection {
    type Target = Box<dyn Connection>;

    fn deref(&self) -> &Box<dyn Connection> {
        &self.0
    }
}

impl DerefMut for PoolConnection {
    fn deref_mut(&mut self) -> &mut Box<dyn Connection> {
        &mut self.0
    }
}
