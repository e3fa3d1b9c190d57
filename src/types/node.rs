//! Mesh node identities.

/// Node number used as the destination of broadcast packets.
pub const BROADCAST_NUM: u32 = 0xffff_ffff;

/// Textual id of the broadcast address.
pub const BROADCAST_ID: &str = "^all";

/// Formats the default textual id for a node number, e.g. `!a1b2c3d4`.
#[must_use]
pub fn presumptive_id(num: u32) -> String {
    format!("!{}", hex::encode(num.to_be_bytes()))
}

/// A node known to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Node number.
    pub num: u32,
    /// Textual node id.
    pub id: String,
    /// Long display name.
    pub long_name: Option<String>,
    /// Short display name.
    pub short_name: Option<String>,
}

impl Node {
    /// Creates a node entry carrying only the presumptive id.
    #[must_use]
    pub fn unnamed(num: u32) -> Self {
        Self {
            num,
            id: presumptive_id(num),
            long_name: None,
            short_name: None,
        }
    }
}
