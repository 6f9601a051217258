use std::collections::BTreeMap;

use async_trait::async_trait;
use bollard::models::{EventMessage, EventMessageTypeEnum};
use bollard::Docker;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use log::debug;

use super::EventSource;
use crate::error::Error;
use crate::event::{Event, EventKind, NodeInfo};

/// Event source backed by a local Docker daemon.
pub struct DockerSource {
    docker: Docker,
}

impl DockerSource {
    /// Connect to the local Docker daemon using default settings.
    /// This handles unix socket on Linux.
    pub fn connect() -> Result<Self, Error> {
        let docker = Docker::connect_with_local_defaults().map_err(Error::Connection)?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl EventSource for DockerSource {
    async fn version(&self) -> Result<BTreeMap<String, String>, Error> {
        let version = self.docker.version().await.map_err(Error::Connection)?;

        let mut fields = BTreeMap::new();
        let mut insert = |key: &str, value: Option<String>| {
            if let Some(v) = value {
                fields.insert(key.to_string(), v);
            }
        };
        insert("Version", version.version);
        insert("ApiVersion", version.api_version);
        insert("MinAPIVersion", version.min_api_version);
        insert("GitCommit", version.git_commit);
        insert("GoVersion", version.go_version);
        insert("Os", version.os);
        insert("Arch", version.arch);
        insert("KernelVersion", version.kernel_version);
        insert("BuildTime", version.build_time);
        Ok(fields)
    }

    async fn node_info(&self) -> Result<NodeInfo, Error> {
        let info = self.docker.info().await.map_err(Error::Connection)?;
        let swarm = info.swarm;
        let node_id = swarm.as_ref().and_then(|s| s.node_id.clone());
        Ok(NodeInfo {
            name: info.name.unwrap_or_default(),
            swarm_active: node_id.map(|id| !id.is_empty()).unwrap_or(false),
            manager: swarm
                .and_then(|s| s.control_available)
                .unwrap_or(false),
        })
    }

    fn subscribe(&self) -> BoxStream<'_, Result<Event, Error>> {
        self.docker
            .events::<String>(None)
            .map(|item| match item {
                Ok(message) => convert(message),
                Err(e) => Err(Error::Connection(e)),
            })
            .boxed()
    }
}

/// Convert a wire-level event into the bridge's record.
///
/// Docker dropped the legacy top-level `from` field from newer API versions;
/// the source image lives in the actor's `image` attribute for container
/// events and in the actor id for image events.
fn convert(message: EventMessage) -> Result<Event, Error> {
    let kind = match message.typ {
        Some(EventMessageTypeEnum::CONTAINER) => EventKind::Container,
        Some(EventMessageTypeEnum::IMAGE) => EventKind::Image,
        Some(EventMessageTypeEnum::NETWORK) => EventKind::Network,
        Some(EventMessageTypeEnum::VOLUME) => EventKind::Volume,
        Some(_) => EventKind::Other,
        None => return Err(Error::Render("event has no Type".into())),
    };
    let action = message
        .action
        .filter(|a| !a.is_empty())
        .ok_or_else(|| Error::Render("event has no Action".into()))?;

    let actor = message.actor.unwrap_or_default();
    let id = actor.id.unwrap_or_default();
    let attributes = actor.attributes.unwrap_or_default();

    let name = match attributes.get("name") {
        Some(n) if !n.is_empty() => n.clone(),
        _ => id.clone(),
    };
    let from = match attributes.get("image") {
        Some(image) if !image.is_empty() => image.clone(),
        _ if kind == EventKind::Image => id,
        _ => String::new(),
    };

    debug!("Runtime event: {} {} ({})", kind.as_str(), action, name);
    Ok(Event {
        kind,
        action,
        from,
        name,
        attributes,
    })
}
