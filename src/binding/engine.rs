//! State shared by the registry, its proxies and every mapping call

use super::codec::LiteralCodec;
use super::descriptor::DescriptorRegistry;
use super::error::BindingResult;
use super::lock::LockRegistry;
use super::proxy::{LiveProxy, ProxyNodeCache};
use crate::config::BindingConfig;
use crate::rdf::{GraphName, NamedNode};
use crate::store::{Connection, ConnectionPool, StoreError};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Callback fired once for every node a registry creates
pub type CreatedListener = Arc<dyn Fn(&LiveProxy) + Send + Sync>;

pub(crate) struct Engine {
    pub config: BindingConfig,
    pub default_graphs: Vec<GraphName>,
    pub binding_class: NamedNode,
    pub descriptors: Arc<DescriptorRegistry>,
    pub locks: LockRegistry,
    pub proxies: ProxyNodeCache,
    pub pool: ConnectionPool,
    pub codec: Arc<dyn LiteralCodec>,
    pub listeners: RwLock<Vec<CreatedListener>>,
    pub closed: AtomicBool,
}

impl Engine {
    /// The calling thread's connection
    pub fn connection(&self) -> BindingResult<Arc<dyn Connection>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::ConnectionClosed.into());
        }
        Ok(self.pool.current()?)
    }

    /// Run `op` inside a transaction
    ///
    /// If the connection already has one, `op` joins it and nothing is
    /// committed here. Otherwise a transaction is opened, committed on
    /// success and rolled back on failure.
    pub fn in_transaction<T>(
        &self,
        conn: &dyn Connection,
        what: &str,
        op: impl FnOnce() -> BindingResult<T>,
    ) -> BindingResult<T> {
        if conn.is_active() {
            return op();
        }

        conn.begin()?;
        let result = op().and_then(|value| {
            conn.commit()?;
            Ok(value)
        });
        if let Err(e) = &result {
            warn!("{} failed, rolling back: {}", what, e);
            if conn.is_active() {
                if let Err(rollback) = conn.rollback() {
                    warn!("Rollback after failed {} also failed: {}", what, rollback);
                }
            }
        } else {
            debug!("{} committed", what);
        }
        result
    }

    pub fn notify_created(&self, proxy: &LiveProxy) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener(proxy);
        }
    }
}
