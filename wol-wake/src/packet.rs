//! Magic packet layout.

use crate::mac::MacAddress;

/// Number of leading `0xFF` synchronisation bytes.
const SYNC_LEN: usize = 6;

/// Number of times the hardware address is repeated after the sync stream.
const REPETITIONS: usize = 16;

/// Total payload length: 6 sync bytes + 16 * 6 address bytes.
pub const MAGIC_PACKET_LEN: usize = SYNC_LEN + REPETITIONS * 6;

/// A Wake-on-LAN payload ready to be sent as a single UDP datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicPacket([u8; MAGIC_PACKET_LEN]);

impl MagicPacket {
    pub fn new(mac: MacAddress) -> Self {
        let mut payload = [0xFFu8; MAGIC_PACKET_LEN];
        let octets = mac.octets();
        for chunk in payload[SYNC_LEN..].chunks_exact_mut(6) {
            chunk.copy_from_slice(&octets);
        }
        Self(payload)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<MacAddress> for MagicPacket {
    fn from(mac: MacAddress) -> Self {
        Self::new(mac)
    }
}
