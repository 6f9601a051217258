//! The bridge control loop: announce the daemon at startup, then pump the
//! event subscription one event at a time, rendering and forwarding matches.

use futures_util::StreamExt;
use log::{error, info};
use regex::Regex;

use crate::config::Config;
use crate::error::Error;
use crate::event::Event;
use crate::notify::{Field, Message, Notify};
use crate::runtime::EventSource;
use crate::templates;

pub struct Bridge {
    filter: Regex,
    include_hostname: bool,
    hostname: Option<String>,
}

impl Bridge {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let filter = Regex::new(&config.image_regexp)
            .map_err(|e| anyhow::anyhow!("Invalid image_regexp: {}", e))?;
        Ok(Self {
            filter,
            include_hostname: config.include_hostname,
            hostname: config.hostname.clone(),
        })
    }

    /// Announce the daemon, then consume the event subscription until it
    /// ends. Per-event failures are reported and skipped; a subscription
    /// failure is fatal.
    pub async fn run<S, N>(&self, source: &S, notifier: &N) -> Result<(), Error>
    where
        S: EventSource,
        N: Notify,
    {
        self.announce(source, notifier).await?;

        let mut stream = source.subscribe();
        info!("Listening for runtime events...");
        while let Some(item) = stream.next().await {
            match item {
                Ok(event) => {
                    if let Err(e) = self.handle_event(&event, notifier).await {
                        error!("Failed to handle {} event: {}", event.action, e);
                        notifier.send_error(&e.to_string()).await;
                    }
                }
                // A malformed event is a per-event fault, not a dropped
                // subscription.
                Err(e @ Error::Render(_)) => {
                    error!("Skipping event: {}", e);
                    notifier.send_error(&e.to_string()).await;
                }
                Err(e) => return Err(e),
            }
        }
        info!("Event subscription ended");
        Ok(())
    }

    /// Send the one-off startup status message: daemon version fields, plus
    /// node identity when configured.
    async fn announce<S, N>(&self, source: &S, notifier: &N) -> Result<(), Error>
    where
        S: EventSource,
        N: Notify,
    {
        let version = source.version().await?;
        info!("Connected to runtime, {} version fields", version.len());

        let text = if self.include_hostname {
            let node = source.node_info().await?;
            format!("Docker is running: {}", node.label())
        } else {
            "Docker is running".to_string()
        };

        let fields = version
            .into_iter()
            .map(|(title, value)| Field::short(title, value))
            .collect();
        notifier.send_status(&text, fields).await
    }

    async fn handle_event<N: Notify>(&self, event: &Event, notifier: &N) -> Result<(), Error> {
        if !self.filter.is_match(&event.from) {
            return Ok(());
        }
        let Some(attachment) = templates::render(event) else {
            return Ok(());
        };

        let mut username = format!(
            "{} {} {}",
            notifier.username(),
            event.kind.as_str(),
            event.name
        );
        if self.include_hostname {
            if let Some(host) = &self.hostname {
                username.push_str(&format!(" @ {}", host));
            }
        }

        notifier
            .send(&Message {
                username,
                icon_emoji: notifier.icon_emoji().to_string(),
                attachments: vec![attachment],
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, NodeInfo};
    use crate::notify::Attachment;
    use async_trait::async_trait;
    use futures_util::stream::BoxStream;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeSource {
        version: BTreeMap<String, String>,
        node: NodeInfo,
        events: Mutex<Option<Vec<Result<Event, Error>>>>,
        info_calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(events: Vec<Result<Event, Error>>) -> Self {
            let mut version = BTreeMap::new();
            version.insert("Version".to_string(), "27.0.1".to_string());
            version.insert("ApiVersion".to_string(), "1.46".to_string());
            version.insert("Os".to_string(), "linux".to_string());
            Self {
                version,
                node: NodeInfo {
                    name: "node-a".into(),
                    swarm_active: true,
                    manager: false,
                },
                events: Mutex::new(Some(events)),
                info_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EventSource for FakeSource {
        async fn version(&self) -> Result<BTreeMap<String, String>, Error> {
            Ok(self.version.clone())
        }

        async fn node_info(&self) -> Result<NodeInfo, Error> {
            self.info_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.node.clone())
        }

        fn subscribe(&self) -> BoxStream<'_, Result<Event, Error>> {
            let events = self.events.lock().unwrap().take().expect("subscribed twice");
            futures_util::stream::iter(events).boxed()
        }
    }

    /// Records delivered messages; fails delivery when the attachment fields
    /// mention a poisoned container name.
    struct Recorder {
        sent: Mutex<Vec<Message>>,
        fail_on: Option<&'static str>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn failing_on(name: &'static str) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_on: Some(name),
            }
        }

        fn sent(&self) -> Vec<Message> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notify for Recorder {
        async fn send(&self, message: &Message) -> Result<(), Error> {
            if let Some(marker) = self.fail_on {
                if message.username.contains(marker) {
                    return Err(Error::Delivery("simulated webhook outage".into()));
                }
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }

        fn username(&self) -> &str {
            "docker"
        }

        fn icon_emoji(&self) -> &str {
            ":whale:"
        }
    }

    fn container_event(action: &str, name: &str, from: &str) -> Event {
        Event {
            kind: EventKind::Container,
            action: action.into(),
            from: from.into(),
            name: name.into(),
            attributes: HashMap::new(),
        }
    }

    fn bridge(image_regexp: &str, include_hostname: bool) -> Bridge {
        Bridge::new(&Config {
            webhook_url: "http://chat.example/hooks/x".into(),
            image_regexp: image_regexp.into(),
            include_hostname,
            hostname: Some("node-a".into()),
            ..Config::default()
        })
        .unwrap()
    }

    fn event_messages(sent: &[Message]) -> Vec<&Message> {
        // Everything after the startup status message.
        sent.iter().skip(1).collect()
    }

    #[tokio::test]
    async fn non_matching_image_sends_nothing() {
        let source = FakeSource::new(vec![Ok(container_event(
            "start",
            "web-1",
            "redis:latest",
        ))]);
        let notifier = Recorder::new();
        bridge("^nginx", false).run(&source, &notifier).await.unwrap();
        assert!(event_messages(&notifier.sent()).is_empty());
    }

    #[tokio::test]
    async fn unmapped_action_sends_nothing() {
        let source = FakeSource::new(vec![Ok(container_event(
            "exec_create",
            "web-1",
            "nginx:latest",
        ))]);
        let notifier = Recorder::new();
        bridge(".*", false).run(&source, &notifier).await.unwrap();
        assert!(event_messages(&notifier.sent()).is_empty());
    }

    #[tokio::test]
    async fn empty_template_result_sends_nothing() {
        let mut event = container_event("die", "web-1", "nginx:latest");
        event
            .attributes
            .insert("exitCode".to_string(), "0".to_string());
        let source = FakeSource::new(vec![Ok(event)]);
        let notifier = Recorder::new();
        bridge(".*", false).run(&source, &notifier).await.unwrap();
        assert!(event_messages(&notifier.sent()).is_empty());
    }

    #[tokio::test]
    async fn matching_start_event_is_forwarded() {
        let source = FakeSource::new(vec![Ok(container_event(
            "start",
            "web-1",
            "nginx:latest",
        ))]);
        let notifier = Recorder::new();
        bridge(".*", false).run(&source, &notifier).await.unwrap();

        let sent = notifier.sent();
        let messages = event_messages(&sent);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].username.contains("web-1"));
        assert_eq!(
            messages[0].attachments[0].title.as_deref(),
            Some("Container started")
        );
    }

    #[tokio::test]
    async fn delivery_failure_does_not_stop_the_pump() {
        let source = FakeSource::new(vec![
            Ok(container_event("start", "flaky-1", "nginx:latest")),
            Ok(container_event("start", "web-2", "nginx:latest")),
        ]);
        let notifier = Recorder::failing_on("flaky-1");
        bridge(".*", false).run(&source, &notifier).await.unwrap();

        let sent = notifier.sent();
        assert!(sent.iter().any(|m| m.username.contains("web-2")));
        // The failed delivery was reported best-effort.
        assert!(sent
            .iter()
            .any(|m| m.attachments[0].title.as_deref() == Some("Error")));
    }

    #[tokio::test]
    async fn status_message_comes_first_with_all_version_fields() {
        let source = FakeSource::new(vec![Ok(container_event(
            "start",
            "web-1",
            "nginx:latest",
        ))]);
        let notifier = Recorder::new();
        bridge(".*", false).run(&source, &notifier).await.unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        let status: &Attachment = &sent[0].attachments[0];
        assert_eq!(status.color.as_deref(), Some("good"));
        for key in ["Version", "ApiVersion", "Os"] {
            assert!(status.fields.iter().any(|f| f.title == key));
        }
    }

    #[tokio::test]
    async fn hostname_flag_unset_omits_node_info() {
        let source = FakeSource::new(vec![Ok(container_event(
            "start",
            "web-1",
            "nginx:latest",
        ))]);
        let notifier = Recorder::new();
        bridge(".*", false).run(&source, &notifier).await.unwrap();

        assert_eq!(source.info_calls.load(Ordering::SeqCst), 0);
        let sent = notifier.sent();
        assert_eq!(sent[0].attachments[0].text.as_deref(), Some("Docker is running"));
        assert!(!sent[1].username.contains('@'));
    }

    #[tokio::test]
    async fn hostname_flag_set_adds_node_info() {
        let source = FakeSource::new(vec![Ok(container_event(
            "start",
            "web-1",
            "nginx:latest",
        ))]);
        let notifier = Recorder::new();
        bridge(".*", true).run(&source, &notifier).await.unwrap();

        let sent = notifier.sent();
        assert_eq!(
            sent[0].attachments[0].text.as_deref(),
            Some("Docker is running: Node @ node-a (Swarm Worker)")
        );
        assert!(sent[1].username.ends_with("@ node-a"));
    }

    #[tokio::test]
    async fn malformed_event_is_reported_and_skipped() {
        let source = FakeSource::new(vec![
            Err(Error::Render("event has no Action".into())),
            Ok(container_event("start", "web-1", "nginx:latest")),
        ]);
        let notifier = Recorder::new();
        bridge(".*", false).run(&source, &notifier).await.unwrap();

        let sent = notifier.sent();
        assert!(sent
            .iter()
            .any(|m| m.attachments[0].title.as_deref() == Some("Error")));
        assert!(sent.iter().any(|m| m.username.contains("web-1")));
    }

    #[tokio::test]
    async fn subscription_failure_is_fatal() {
        let dropped = bollard::errors::Error::DockerResponseServerError {
            status_code: 500,
            message: "stream closed".into(),
        };
        let source = FakeSource::new(vec![
            Ok(container_event("start", "web-1", "nginx:latest")),
            Err(Error::Connection(dropped)),
            Ok(container_event("start", "web-2", "nginx:latest")),
        ]);
        let notifier = Recorder::new();
        let result = bridge(".*", false).run(&source, &notifier).await;

        assert!(matches!(result, Err(Error::Connection(_))));
        // Events before the failure were still delivered, later ones not.
        let sent = notifier.sent();
        assert!(sent.iter().any(|m| m.username.contains("web-1")));
        assert!(!sent.iter().any(|m| m.username.contains("web-2")));
    }

    #[test]
    fn invalid_filter_pattern_is_rejected_up_front() {
        assert!(Bridge::new(&Config {
            image_regexp: "(".into(),
            ..Config::default()
        })
        .is_err());
    }
}
