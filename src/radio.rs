//! Meshtastic radio connector.
//!
//! Framing, protobuf decoding and the configuration handshake are handled by
//! the `meshtastic` crate. This module opens the stream, keeps a node table
//! for textual ids, and turns each `FromRadio` message into session events
//! shaped like the packets Meshtastic tooling hands to its subscribers.

use std::collections::HashMap;

use futures::FutureExt;
use futures::future::BoxFuture;
use meshtastic::Message;
use meshtastic::api::StreamApi;
use meshtastic::protobufs::{self, FromRadio, MeshPacket, PortNum, from_radio, mesh_packet, telemetry};
use meshtastic::utils;
use serde_json::Number;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::event::Event;
use crate::session::Session;
use crate::transport::{Connector, Endpoint, SerialConfig, list_ports};
use crate::types::{BROADCAST_ID, BROADCAST_NUM, Decoded, Node, Packet, presumptive_id};

/// Position coordinates are sent as integers scaled by 1e7.
const COORD_SCALE: f64 = 1e-7;

/// Proto3 scalars carry no presence; zero means "not set".
fn nonzero(value: u32) -> Option<u32> {
    (value != 0).then_some(value)
}

/// Known nodes, keyed by node number.
#[derive(Debug, Default)]
pub struct NodeTable {
    nodes: HashMap<u32, Node>,
}

impl NodeTable {
    /// Creates an empty node table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the textual id for a node number.
    ///
    /// The broadcast address maps to `^all`; unknown nodes to `None`.
    #[must_use]
    pub fn id_of(&self, num: u32) -> Option<String> {
        if num == BROADCAST_NUM {
            return Some(BROADCAST_ID.to_owned());
        }
        self.nodes.get(&num).map(|node| node.id.clone())
    }

    /// Inserts or replaces a node. Returns true if the table changed.
    pub fn update(&mut self, node: Node) -> bool {
        if self.nodes.get(&node.num) == Some(&node) {
            return false;
        }
        self.nodes.insert(node.num, node);
        true
    }

    /// Converts one radio message into session events, updating the table.
    pub fn events_for(&mut self, message: FromRadio) -> Vec<Event> {
        let mut events = Vec::new();

        match message.payload_variant {
            Some(from_radio::PayloadVariant::Packet(packet)) => {
                // A zero sender is the radio echoing a packet this session sent
                if packet.from == 0 {
                    tracing::warn!("device returned a packet we sent, ignoring");
                    return events;
                }
                if let Some(node) = node_from_packet(&packet) {
                    if self.update(node.clone()) {
                        events.push(Event::NodeUpdated(node));
                    }
                }
                events.push(Event::Packet(Box::new(packet_from_mesh(&packet, self))));
            }
            Some(from_radio::PayloadVariant::NodeInfo(info)) => {
                let node = match info.user {
                    Some(user) => node_from_user(info.num, user),
                    None => Node::unnamed(info.num),
                };
                if self.update(node.clone()) {
                    events.push(Event::NodeUpdated(node));
                }
            }
            Some(from_radio::PayloadVariant::ConfigCompleteId(id)) => {
                tracing::debug!("radio configuration {} complete", id);
                events.push(Event::Connected);
            }
            Some(from_radio::PayloadVariant::MyInfo(info)) => {
                tracing::debug!("local node is {}", presumptive_id(info.my_node_num));
            }
            Some(_) => tracing::trace!("ignoring radio message {}", message.id),
            None => tracing::trace!("radio message without payload"),
        }

        events
    }
}

fn node_from_user(num: u32, user: protobufs::User) -> Node {
    let non_empty = |s: String| (!s.is_empty()).then_some(s);
    Node {
        num,
        id: non_empty(user.id).unwrap_or_else(|| presumptive_id(num)),
        long_name: non_empty(user.long_name),
        short_name: non_empty(user.short_name),
    }
}

/// Extracts the sender's identity from a `NODEINFO_APP` packet.
fn node_from_packet(packet: &MeshPacket) -> Option<Node> {
    let Some(mesh_packet::PayloadVariant::Decoded(data)) = &packet.payload_variant else {
        return None;
    };
    if data.portnum() != PortNum::NodeinfoApp || packet.from == 0 {
        return None;
    }
    match protobufs::User::decode(data.payload.as_slice()) {
        Ok(user) => Some(node_from_user(packet.from, user)),
        Err(e) => {
            tracing::warn!("failed to decode user from {}: {}", packet.from, e);
            None
        }
    }
}

/// Builds the decoded payload view of a packet.
///
/// Payloads that fail to decode leave the affected fields empty.
fn decoded_from_data(data: &protobufs::Data) -> Decoded {
    let port = data.portnum();
    let mut decoded = Decoded {
        portnum: Some(port.as_str_name().to_owned()),
        bitfield: data.bitfield,
        ..Decoded::default()
    };

    match port {
        PortNum::TextMessageApp => {
            decoded.text = String::from_utf8(data.payload.clone()).ok();
        }
        PortNum::PositionApp => match protobufs::Position::decode(data.payload.as_slice()) {
            Ok(position) => {
                decoded.latitude = position.latitude_i.map(|v| f64::from(v) * COORD_SCALE);
                decoded.longitude = position.longitude_i.map(|v| f64::from(v) * COORD_SCALE);
                decoded.altitude = position.altitude.map(Number::from);
            }
            Err(e) => tracing::warn!("failed to decode position: {}", e),
        },
        PortNum::TelemetryApp => match protobufs::Telemetry::decode(data.payload.as_slice()) {
            Ok(telemetry) => {
                if let Some(telemetry::Variant::DeviceMetrics(metrics)) = telemetry.variant {
                    decoded.battery_level = metrics.battery_level.map(Number::from);
                }
            }
            Err(e) => tracing::warn!("failed to decode telemetry: {}", e),
        },
        _ => {}
    }

    decoded
}

/// Converts a radio packet into a [`Packet`].
///
/// Fields left at their protobuf default are reported as absent, except the
/// recipient, which is always present. Textual ids are resolved through
/// `nodes`.
#[must_use]
pub fn packet_from_mesh(packet: &MeshPacket, nodes: &NodeTable) -> Packet {
    let from = nonzero(packet.from);
    let to = packet.to;

    let decoded = match &packet.payload_variant {
        Some(mesh_packet::PayloadVariant::Decoded(data)) => Some(decoded_from_data(data)),
        _ => None,
    };

    Packet {
        from,
        to: Some(to),
        id: nonzero(packet.id),
        rx_time: nonzero(packet.rx_time),
        rx_snr: (packet.rx_snr != 0.0).then_some(packet.rx_snr),
        rx_rssi: (packet.rx_rssi != 0).then_some(packet.rx_rssi),
        hop_limit: nonzero(packet.hop_limit),
        hop_start: nonzero(packet.hop_start),
        from_id: from.and_then(|num| nodes.id_of(num)),
        to_id: nodes.id_of(to),
        decoded,
    }
}

/// Serial connector backed by the `meshtastic` crate.
#[derive(Debug, Clone, Default)]
pub struct MeshtasticConnector {
    config: SerialConfig,
}

impl MeshtasticConnector {
    /// Creates a connector with the given serial configuration.
    #[must_use]
    pub const fn new(config: SerialConfig) -> Self {
        Self { config }
    }
}

impl Connector for MeshtasticConnector {
    fn endpoints(&self) -> Result<Vec<Endpoint>> {
        list_ports()
    }

    fn open(&self, endpoint: Endpoint) -> BoxFuture<'_, Result<Session>> {
        async move {
            tracing::debug!("opening serial stream on {}", endpoint);

            let stream = utils::stream::build_serial_stream(
                endpoint.path.clone(),
                Some(self.config.baud_rate),
                self.config.dtr,
                self.config.rts,
            )
            .map_err(Error::connection)?;

            let (mut from_radio, api) = StreamApi::new().connect(stream).await;
            let config_id = utils::generate_rand_id();
            let api = api.configure(config_id).await.map_err(Error::connection)?;

            let (tx, rx) = mpsc::channel(self.config.event_capacity);
            tokio::spawn(async move {
                // The stream stays open for as long as the API handle lives
                let _api = api;
                let mut nodes = NodeTable::new();

                while let Some(message) = from_radio.recv().await {
                    for event in nodes.events_for(message) {
                        if tx.send(event).await.is_err() {
                            tracing::debug!("session dropped");
                            return;
                        }
                    }
                }
                tracing::info!("radio stream ended");
            });

            tracing::debug!("configuration requested from {}", endpoint);
            Ok(Session::from_events(endpoint, self.config.event_capacity, rx))
        }
        .boxed()
    }
}
