//! Bridge-side view of a Docker lifecycle event.
//!
//! The raw wire shape (`bollard::models::EventMessage`) is all optionals;
//! the adapter converts it into this record once, so the renderer and the
//! control loop never re-validate fields.

use serde::{Deserialize, Serialize};

/// Event category, mirroring the Docker API's `Type` field.
///
/// Categories the bridge has no templates for collapse into `Other` so the
/// renderer's match stays exhaustive without enumerating the full API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Container,
    Image,
    Network,
    Volume,
    Other,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Container => "container",
            EventKind::Image => "image",
            EventKind::Network => "network",
            EventKind::Volume => "volume",
            EventKind::Other => "other",
        }
    }
}

/// A single lifecycle occurrence, consumed once and discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    /// Verb, e.g. `start`, `die`, `pull`.
    pub action: String,
    /// Source image identifier; what the configured filter pattern runs on.
    pub from: String,
    /// Actor name (container/image/network name), falling back to the actor id.
    pub name: String,
    /// Remaining actor attributes, e.g. `exitCode` on `die`.
    pub attributes: std::collections::HashMap<String, String>,
}

impl Event {
    /// Attribute lookup, empty string when absent.
    pub fn attribute(&self, key: &str) -> &str {
        self.attributes.get(key).map(String::as_str).unwrap_or("")
    }
}

/// Node identity as reported by the daemon's info endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    /// True when the daemon participates in a Swarm (a node ID is present).
    pub swarm_active: bool,
    /// True when this node can control the Swarm.
    pub manager: bool,
}

impl NodeInfo {
    /// Human label used in the startup status line, e.g.
    /// `Node @ host-1 (Swarm Manager)`.
    pub fn label(&self) -> String {
        let mut label = format!("Node @ {}", self.name);
        if self.swarm_active {
            if self.manager {
                label.push_str(" (Swarm Manager)");
            } else {
                label.push_str(" (Swarm Worker)");
            }
        }
        label
    }
}
