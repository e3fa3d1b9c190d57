//! Received packet records.
//!
//! [`Packet`] is the inbound, partially populated view of a received mesh
//! packet. [`PacketRecord`] is the flat record written to the output stream;
//! it always carries every key, with absent values serialized as `null`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use crate::error::Result;

/// Reads an optional field, mapping values of the wrong shape to `None`.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Decoded application payload of a packet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Decoded {
    /// Port (application) name, e.g. `TEXT_MESSAGE_APP`.
    #[serde(deserialize_with = "lenient")]
    pub portnum: Option<String>,
    /// Text content of a text message.
    #[serde(deserialize_with = "lenient")]
    pub text: Option<String>,
    /// Packet bitfield flags.
    #[serde(deserialize_with = "lenient")]
    pub bitfield: Option<u32>,
    /// Latitude in decimal degrees.
    #[serde(deserialize_with = "lenient")]
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees.
    #[serde(deserialize_with = "lenient")]
    pub longitude: Option<f64>,
    /// Altitude in meters.
    #[serde(deserialize_with = "lenient")]
    pub altitude: Option<Number>,
    /// Battery level in percent.
    #[serde(deserialize_with = "lenient")]
    pub battery_level: Option<Number>,
}

/// A packet received from the mesh.
///
/// Every field is optional. Deserializing from JSON accepts the loosely
/// typed shape produced by Meshtastic tooling: missing keys and keys
/// holding a value of the wrong type both read as `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Packet {
    /// Sender node number.
    #[serde(deserialize_with = "lenient")]
    pub from: Option<u32>,
    /// Recipient node number.
    #[serde(deserialize_with = "lenient")]
    pub to: Option<u32>,
    /// Packet id.
    #[serde(deserialize_with = "lenient")]
    pub id: Option<u32>,
    /// Receive time (Unix seconds).
    #[serde(deserialize_with = "lenient")]
    pub rx_time: Option<u32>,
    /// Receive signal-to-noise ratio in dB.
    #[serde(deserialize_with = "lenient")]
    pub rx_snr: Option<f32>,
    /// Receive signal strength in dBm.
    #[serde(deserialize_with = "lenient")]
    pub rx_rssi: Option<i32>,
    /// Remaining hops.
    #[serde(deserialize_with = "lenient")]
    pub hop_limit: Option<u32>,
    /// Hop limit the packet was sent with.
    #[serde(deserialize_with = "lenient")]
    pub hop_start: Option<u32>,
    /// Sender node id, e.g. `!a1b2c3d4`.
    #[serde(deserialize_with = "lenient")]
    pub from_id: Option<String>,
    /// Recipient node id, `^all` for broadcasts.
    #[serde(deserialize_with = "lenient")]
    pub to_id: Option<String>,
    /// Decoded payload, absent for packets that could not be decrypted.
    #[serde(deserialize_with = "lenient")]
    pub decoded: Option<Decoded>,
}

impl Packet {
    /// Returns the decoded port name, if any.
    #[must_use]
    pub fn portnum(&self) -> Option<&str> {
        self.decoded.as_ref()?.portnum.as_deref()
    }
}

/// Flat output record for one received packet.
///
/// Field order is fixed and every key is always serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketRecord {
    pub from: Option<u32>,
    pub to: Option<u32>,
    pub id: Option<u32>,
    pub rx_time: Option<u32>,
    pub rx_snr: Option<f32>,
    pub rx_rssi: Option<i32>,
    pub hop_limit: Option<u32>,
    pub hop_start: Option<u32>,
    pub from_id: Option<String>,
    pub to_id: Option<String>,
    pub decoded: Decoded,
}

impl PacketRecord {
    /// Serializes the record to a single JSON line (without the newline).
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<&Packet> for PacketRecord {
    fn from(packet: &Packet) -> Self {
        Self {
            from: packet.from,
            to: packet.to,
            id: packet.id,
            rx_time: packet.rx_time,
            rx_snr: packet.rx_snr,
            rx_rssi: packet.rx_rssi,
            hop_limit: packet.hop_limit,
            hop_start: packet.hop_start,
            from_id: packet.from_id.clone(),
            to_id: packet.to_id.clone(),
            decoded: packet.decoded.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_NULL: &str = r#"{"from":null,"to":null,"id":null,"rxTime":null,"rxSnr":null,"rxRssi":null,"hopLimit":null,"hopStart":null,"fromId":null,"toId":null,"decoded":{"portnum":null,"text":null,"bitfield":null,"latitude":null,"longitude":null,"altitude":null,"batteryLevel":null}}"#;

    fn record_json(input: &str) -> String {
        let packet: Packet = serde_json::from_str(input).unwrap();
        PacketRecord::from(&packet).to_json().unwrap()
    }

    #[test]
    fn test_text_packet_scenario() {
        assert_eq!(
            record_json(r#"{"from": 1, "to": 2, "decoded": {"text": "hi"}}"#),
            r#"{"from":1,"to":2,"id":null,"rxTime":null,"rxSnr":null,"rxRssi":null,"hopLimit":null,"hopStart":null,"fromId":null,"toId":null,"decoded":{"portnum":null,"text":"hi","bitfield":null,"latitude":null,"longitude":null,"altitude":null,"batteryLevel":null}}"#
        );
    }

    #[test]
    fn test_empty_packet_keeps_every_key() {
        assert_eq!(record_json("{}"), ALL_NULL);
        assert_eq!(PacketRecord::from(&Packet::default()).to_json().unwrap(), ALL_NULL);
    }

    #[test]
    fn test_fully_populated_packet() {
        let packet = Packet {
            from: Some(0xa1b2_c3d4),
            to: Some(0xffff_ffff),
            id: Some(42),
            rx_time: Some(1_700_000_000),
            rx_snr: Some(-7.25),
            rx_rssi: Some(-110),
            hop_limit: Some(2),
            hop_start: Some(3),
            from_id: Some("!a1b2c3d4".into()),
            to_id: Some("^all".into()),
            decoded: Some(Decoded {
                portnum: Some("POSITION_APP".into()),
                text: Some("hello \"mesh\"".into()),
                bitfield: Some(1),
                latitude: Some(52.5),
                longitude: Some(13.25),
                altitude: Some(Number::from(34)),
                battery_level: Some(Number::from(87)),
            }),
        };

        assert_eq!(
            PacketRecord::from(&packet).to_json().unwrap(),
            r#"{"from":2712847316,"to":4294967295,"id":42,"rxTime":1700000000,"rxSnr":-7.25,"rxRssi":-110,"hopLimit":2,"hopStart":3,"fromId":"!a1b2c3d4","toId":"^all","decoded":{"portnum":"POSITION_APP","text":"hello \"mesh\"","bitfield":1,"latitude":52.5,"longitude":13.25,"altitude":34,"batteryLevel":87}}"#
        );
    }

    #[test]
    fn test_missing_decoded_fields_are_null() {
        let json = record_json(r#"{"id": 7, "decoded": {}}"#);
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["id"], 7);
        let decoded = value["decoded"].as_object().unwrap();
        assert_eq!(decoded.len(), 7);
        assert!(decoded.values().all(Value::is_null));
    }

    #[test]
    fn test_wrong_types_read_as_null() {
        let packet: Packet = serde_json::from_str(
            r#"{"from": "one", "to": -5, "rxSnr": 6, "decoded": {"bitfield": "x", "text": 3}}"#,
        )
        .unwrap();

        assert_eq!(packet.from, None);
        assert_eq!(packet.to, None);
        assert_eq!(packet.rx_snr, Some(6.0));
        let decoded = packet.decoded.unwrap();
        assert_eq!(decoded.bitfield, None);
        assert_eq!(decoded.text, None);
    }

    #[test]
    fn test_non_object_decoded_is_dropped() {
        let packet: Packet = serde_json::from_str(r#"{"decoded": "garbage"}"#).unwrap();
        assert_eq!(packet.decoded, None);
        assert_eq!(PacketRecord::from(&packet).to_json().unwrap(), ALL_NULL);
    }

    #[test]
    fn test_extra_keys_ignored() {
        let json = record_json(
            r#"{"from": 1, "channel": 0, "raw": [1, 2], "decoded": {"payload": "aGk=", "portnum": "TEXT_MESSAGE_APP"}}"#,
        );
        assert!(json.contains(r#""portnum":"TEXT_MESSAGE_APP""#));
        assert!(!json.contains("channel"));
        assert!(!json.contains("payload"));
    }

    #[test]
    fn test_serialization_is_idempotent() {
        let packet: Packet =
            serde_json::from_str(r#"{"from": 9, "rxSnr": 5.5, "decoded": {"text": "again"}}"#)
                .unwrap();
        let first = PacketRecord::from(&packet).to_json().unwrap();
        let second = PacketRecord::from(&packet).to_json().unwrap();
        assert_eq!(first, second);
        assert!(!first.contains('\n'));
    }

    #[test]
    fn test_portnum_accessor() {
        let packet: Packet =
            serde_json::from_str(r#"{"decoded": {"portnum": "TELEMETRY_APP"}}"#).unwrap();
        assert_eq!(packet.portnum(), Some("TELEMETRY_APP"));
        assert_eq!(Packet::default().portnum(), None);
    }
}
