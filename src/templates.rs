//! Template renderer: maps an event's (kind, action) pair to an optional
//! attachment. Pure and data-driven; unknown pairs render nothing, which is
//! the normal filtering path, not a fault.

use crate::event::{Event, EventKind};
use crate::notify::{Attachment, Field};

/// Render `event` into a chat attachment, or `None` when the event carries
/// no template or the template decides there is nothing worth saying.
pub fn render(event: &Event) -> Option<Attachment> {
    match (event.kind, event.action.as_str()) {
        (EventKind::Container, "start") => Some(titled(
            "Container started",
            "good",
            container_fields(event),
        )),
        (EventKind::Container, "stop") => Some(titled(
            "Container stopped",
            "warning",
            container_fields(event),
        )),
        (EventKind::Container, "die") => {
            // Clean exits already show up as `stop`; only report failures.
            let exit_code = event.attribute("exitCode");
            if exit_code.is_empty() || exit_code == "0" {
                return None;
            }
            let mut fields = container_fields(event);
            fields.push(Field::short("exit code", exit_code));
            Some(titled("Container died", "danger", fields))
        }
        (EventKind::Container, "kill") => {
            let mut fields = container_fields(event);
            let signal = event.attribute("signal");
            if !signal.is_empty() {
                fields.push(Field::short("signal", signal));
            }
            Some(titled("Container killed", "danger", fields))
        }
        (EventKind::Container, "destroy") => Some(titled(
            "Container destroyed",
            "warning",
            container_fields(event),
        )),
        (EventKind::Container, "restart") => Some(titled(
            "Container restarted",
            "warning",
            container_fields(event),
        )),
        (EventKind::Container, "pause") => {
            Some(titled("Container paused", "warning", container_fields(event)))
        }
        (EventKind::Container, "unpause") => {
            Some(titled("Container unpaused", "good", container_fields(event)))
        }
        (EventKind::Container, "oom") => Some(titled(
            "Container out of memory",
            "danger",
            container_fields(event),
        )),
        (EventKind::Image, "pull") => {
            Some(titled("Image pulled", "good", vec![Field::short("image", event.name.as_str())]))
        }
        (EventKind::Image, "delete") => {
            Some(titled("Image deleted", "warning", vec![Field::short("image", event.name.as_str())]))
        }
        (EventKind::Image, "tag") => {
            Some(titled("Image tagged", "good", vec![Field::short("image", event.name.as_str())]))
        }
        (EventKind::Image, "untag") => {
            Some(titled("Image untagged", "warning", vec![Field::short("image", event.name.as_str())]))
        }
        (EventKind::Network, "connect") => Some(titled(
            "Network connected",
            "good",
            network_fields(event),
        )),
        (EventKind::Network, "disconnect") => Some(titled(
            "Network disconnected",
            "warning",
            network_fields(event),
        )),
        (EventKind::Volume, "create") => {
            Some(titled("Volume created", "good", vec![Field::short("volume", event.name.as_str())]))
        }
        (EventKind::Volume, "destroy") => {
            Some(titled("Volume destroyed", "warning", vec![Field::short("volume", event.name.as_str())]))
        }
        _ => None,
    }
}

fn titled(title: &str, color: &str, fields: Vec<Field>) -> Attachment {
    Attachment {
        title: Some(title.to_string()),
        color: Some(color.to_string()),
        fields,
        ..Default::default()
    }
}

fn container_fields(event: &Event) -> Vec<Field> {
    vec![
        Field::short("container", event.name.as_str()),
        Field::short("image", event.from.as_str()),
    ]
}

fn network_fields(event: &Event) -> Vec<Field> {
    let mut fields = vec![Field::short("network", event.name.as_str())];
    let container = event.attribute("container");
    if !container.is_empty() {
        fields.push(Field::short("container", container));
    }
    fields
}
