use std::collections::BTreeMap;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::Error;
use crate::event::{Event, NodeInfo};

pub mod docker;
pub use docker::DockerSource;

/// Read side of the container runtime: startup identity queries plus the
/// lifecycle event subscription.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Version field name → value, as reported by the daemon.
    async fn version(&self) -> Result<BTreeMap<String, String>, Error>;

    /// Node name and Swarm membership.
    async fn node_info(&self) -> Result<NodeInfo, Error>;

    /// Unbounded lazy sequence of lifecycle events. Not restartable; an
    /// `Err` item means the subscription is gone.
    fn subscribe(&self) -> BoxStream<'_, Result<Event, Error>>;
}
