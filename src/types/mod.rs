//! Data types for received mesh traffic.
//!
//! - Packets and their output records
//! - Node identities

pub mod node;
pub mod packet;

pub use node::{BROADCAST_ID, BROADCAST_NUM, Node, presumptive_id};
pub use packet::{Decoded, Packet, PacketRecord};
