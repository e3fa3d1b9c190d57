//! Event system for received radio traffic.
//!
//! Events are published under dot-separated topic names. A subscriber to a
//! topic also receives events published under any of its descendants, so a
//! subscription to `meshtastic.receive` sees `meshtastic.receive.text`,
//! `meshtastic.receive.position` and so on.

use std::borrow::Cow;
use std::fmt;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::types::{Node, Packet};

/// Hierarchical event topic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(Cow<'static, str>);

impl Topic {
    /// Session configured and streaming.
    pub const CONNECTION_ESTABLISHED: Self = Self::from_static("meshtastic.connection.established");
    /// Radio stream ended.
    pub const CONNECTION_LOST: Self = Self::from_static("meshtastic.connection.lost");
    /// Node table entry added or changed.
    pub const NODE_UPDATED: Self = Self::from_static("meshtastic.node.updated");
    /// Any received packet.
    pub const RECEIVE: Self = Self::from_static("meshtastic.receive");
    /// Text message packets.
    pub const RECEIVE_TEXT: Self = Self::from_static("meshtastic.receive.text");
    /// Position packets.
    pub const RECEIVE_POSITION: Self = Self::from_static("meshtastic.receive.position");
    /// Node info (user) packets.
    pub const RECEIVE_USER: Self = Self::from_static("meshtastic.receive.user");
    /// Telemetry packets.
    pub const RECEIVE_TELEMETRY: Self = Self::from_static("meshtastic.receive.telemetry");
    /// Routing packets.
    pub const RECEIVE_ROUTING: Self = Self::from_static("meshtastic.receive.routing");
    /// Admin packets.
    pub const RECEIVE_ADMIN: Self = Self::from_static("meshtastic.receive.admin");

    const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Creates a topic from a dot-separated name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Returns the topic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Returns true if `other` is this topic or one of its descendants.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        match other.name().strip_prefix(self.name()) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        }
    }

    /// Returns the receive topic for a packet with the given port name.
    #[must_use]
    pub fn for_port(portnum: Option<&str>) -> Self {
        match portnum {
            None => Self::RECEIVE,
            Some("TEXT_MESSAGE_APP") => Self::RECEIVE_TEXT,
            Some("POSITION_APP") => Self::RECEIVE_POSITION,
            Some("NODEINFO_APP") => Self::RECEIVE_USER,
            Some("TELEMETRY_APP") => Self::RECEIVE_TELEMETRY,
            Some("ROUTING_APP") => Self::RECEIVE_ROUTING,
            Some("ADMIN_APP") => Self::RECEIVE_ADMIN,
            Some(other) => Self::new(format!("meshtastic.receive.data.{other}")),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Event types that can be dispatched.
#[derive(Debug, Clone)]
pub enum Event {
    /// Session configured.
    Connected,
    /// Radio stream ended.
    Disconnected,
    /// Node table entry added or changed.
    NodeUpdated(Node),
    /// Packet received from the mesh.
    Packet(Box<Packet>),
}

impl Event {
    /// Returns the topic this event is published under.
    #[must_use]
    pub fn topic(&self) -> Topic {
        match self {
            Self::Connected => Topic::CONNECTION_ESTABLISHED,
            Self::Disconnected => Topic::CONNECTION_LOST,
            Self::NodeUpdated(_) => Topic::NODE_UPDATED,
            Self::Packet(packet) => Topic::for_port(packet.portnum()),
        }
    }
}

/// A subscription to events under one topic.
pub struct Subscription {
    receiver: broadcast::Receiver<Event>,
    topic: Topic,
}

impl Subscription {
    /// Receives the next matching event.
    ///
    /// Returns `None` once the dispatcher is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.topic.covers(&event.topic()) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("subscriber on {} skipped {} events", self.topic, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Publish/subscribe registry for session events.
#[derive(Clone)]
pub struct EventDispatcher {
    sender: broadcast::Sender<Event>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Dispatches an event to all subscribers.
    pub fn dispatch(&self, event: Event) {
        tracing::trace!("dispatching {}", event.topic());
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    /// Subscribes to events under `topic`.
    #[must_use]
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            topic,
        }
    }

    /// Invokes `handler` for every event under `topic` on a background task.
    ///
    /// The subscription is registered before this returns, so no event
    /// dispatched afterwards is missed.
    pub fn on<F>(&self, topic: Topic, handler: F) -> JoinHandle<()>
    where
        F: Fn(&Event) + Send + 'static,
    {
        let mut subscription = self.subscribe(topic);
        tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                handler(&event);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::types::Decoded;

    fn packet_on(portnum: Option<&str>) -> Event {
        Event::Packet(Box::new(Packet {
            decoded: portnum.map(|p| Decoded {
                portnum: Some(p.into()),
                ..Decoded::default()
            }),
            ..Packet::default()
        }))
    }

    #[test]
    fn test_topic_hierarchy() {
        assert!(Topic::RECEIVE.covers(&Topic::RECEIVE));
        assert!(Topic::RECEIVE.covers(&Topic::RECEIVE_TEXT));
        assert!(Topic::RECEIVE.covers(&Topic::new("meshtastic.receive.data.PRIVATE_APP")));
        assert!(!Topic::RECEIVE_TEXT.covers(&Topic::RECEIVE));
        assert!(!Topic::RECEIVE.covers(&Topic::new("meshtastic.receiver")));
        assert!(!Topic::RECEIVE.covers(&Topic::CONNECTION_LOST));
    }

    #[test]
    fn test_packet_topics() {
        assert_eq!(packet_on(None).topic(), Topic::RECEIVE);
        assert_eq!(packet_on(Some("TEXT_MESSAGE_APP")).topic(), Topic::RECEIVE_TEXT);
        assert_eq!(packet_on(Some("NODEINFO_APP")).topic(), Topic::RECEIVE_USER);
        assert_eq!(
            packet_on(Some("RANGE_TEST_APP")).topic().name(),
            "meshtastic.receive.data.RANGE_TEST_APP"
        );
        assert_eq!(Event::Disconnected.topic(), Topic::CONNECTION_LOST);
    }

    #[tokio::test]
    async fn test_subscription_filters_by_topic() {
        let dispatcher = EventDispatcher::new(16);
        let mut sub = dispatcher.subscribe(Topic::RECEIVE);

        dispatcher.dispatch(Event::Connected);
        dispatcher.dispatch(packet_on(Some("TEXT_MESSAGE_APP")));

        let event = tokio::time::timeout(Duration::from_millis(100), sub.recv())
            .await
            .unwrap();

        assert!(matches!(event, Some(Event::Packet(_))));
    }

    #[tokio::test]
    async fn test_subscription_ends_when_dispatcher_dropped() {
        let dispatcher = EventDispatcher::new(16);
        let mut sub = dispatcher.subscribe(Topic::RECEIVE);
        drop(dispatcher);

        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_handler_invoked_per_event() {
        let dispatcher = EventDispatcher::new(16);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let task = dispatcher.on(Topic::RECEIVE_POSITION, move |event| {
            let _ = tx.send(event.topic());
        });

        dispatcher.dispatch(packet_on(Some("TEXT_MESSAGE_APP")));
        dispatcher.dispatch(packet_on(Some("POSITION_APP")));
        dispatcher.dispatch(packet_on(Some("POSITION_APP")));
        drop(dispatcher);

        task.await.unwrap();
        assert_eq!(rx.recv().await, Some(Topic::RECEIVE_POSITION));
        assert_eq!(rx.recv().await, Some(Topic::RECEIVE_POSITION));
        assert_eq!(rx.recv().await, None);
    }
}
