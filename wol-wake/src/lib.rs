//! Wake-on-LAN magic packets
//!
//! Builds the fixed 102-byte magic packet for a hardware address and sends it
//! as a single UDP datagram, by default to `255.255.255.255:9`.
//!
//! ```no_run
//! use wol_wake::{MagicPacketSender, WakeTarget};
//!
//! // Default target: limited broadcast on the discard port
//! wol_wake::send("AA:BB:CC:DD:EE:FF")?;
//!
//! // Directed broadcast for a specific subnet
//! let sender = MagicPacketSender::new(WakeTarget::new([192, 168, 1, 255], 9));
//! sender.send("aa-bb-cc-dd-ee-ff")?;
//! # Ok::<(), wol_wake::WakeError>(())
//! ```

mod error;
mod mac;
mod packet;
mod sender;

pub use error::{Result, WakeError};
pub use mac::MacAddress;
pub use packet::{MagicPacket, MAGIC_PACKET_LEN};
pub use sender::{send, MagicPacketSender, WakeTarget, DEFAULT_BROADCAST, DEFAULT_WAKE_PORT};
