//! UDP dispatch of magic packets.
//!
//! Wake-on-LAN is send-and-forget: a successful send only means the datagram
//! was handed to the local network stack. Nothing here waits for, or could
//! observe, the target powering on.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use crate::error::{Result, WakeError};
use crate::mac::MacAddress;
use crate::packet::{MagicPacket, MAGIC_PACKET_LEN};

/// Default limited-broadcast destination.
pub const DEFAULT_BROADCAST: Ipv4Addr = Ipv4Addr::BROADCAST;

/// Default discard port used by most adapters.
pub const DEFAULT_WAKE_PORT: u16 = 9;

/// Where magic packets are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeTarget {
    /// Broadcast (or directed/unicast) destination address
    /// Default: 255.255.255.255
    pub broadcast_address: IpAddr,

    /// Destination UDP port
    /// Default: 9
    pub port: u16,
}

impl Default for WakeTarget {
    fn default() -> Self {
        Self {
            broadcast_address: IpAddr::V4(DEFAULT_BROADCAST),
            port: DEFAULT_WAKE_PORT,
        }
    }
}

impl WakeTarget {
    pub fn new(broadcast_address: impl Into<IpAddr>, port: u16) -> Self {
        Self {
            broadcast_address: broadcast_address.into(),
            port,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.broadcast_address, self.port)
    }
}

/// Builds and transmits magic packets.
#[derive(Debug, Clone, Default)]
pub struct MagicPacketSender {
    target: WakeTarget,
}

impl MagicPacketSender {
    pub fn new(target: WakeTarget) -> Self {
        Self { target }
    }

    pub fn target(&self) -> WakeTarget {
        self.target
    }

    /// Send a magic packet for `hardware_address` to the configured target.
    pub fn send(&self, hardware_address: &str) -> Result<()> {
        self.send_to(hardware_address, self.target)
    }

    /// Send a magic packet for `hardware_address` to an explicit target.
    ///
    /// The address is validated before any socket is opened, so an
    /// `AddressInvalid` failure never transmits anything.
    pub fn send_to(&self, hardware_address: &str, target: WakeTarget) -> Result<()> {
        let mac: MacAddress = hardware_address.parse()?;
        let packet = MagicPacket::new(mac);

        transmit(&packet, target.socket_addr())?;

        tracing::info!(
            "Sent magic packet for {} to {}",
            mac,
            target.socket_addr()
        );
        Ok(())
    }
}

/// Convenience wrapper: wake `hardware_address` via 255.255.255.255:9.
pub fn send(hardware_address: &str) -> Result<()> {
    MagicPacketSender::default().send(hardware_address)
}

fn transmit(packet: &MagicPacket, destination: SocketAddr) -> Result<()> {
    let bind_addr: SocketAddr = match destination {
        SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED), 0),
    };

    let socket = UdpSocket::bind(bind_addr)
        .map_err(|e| WakeError::SendFailed(format!("Failed to bind UDP socket: {}", e)))?;

    if destination.is_ipv4() {
        socket
            .set_broadcast(true)
            .map_err(|e| WakeError::SendFailed(format!("Failed to enable broadcast: {}", e)))?;
    }

    let sent = socket
        .send_to(packet.as_bytes(), destination)
        .map_err(|e| WakeError::SendFailed(format!("Failed to send to {}: {}", destination, e)))?;

    if sent != MAGIC_PACKET_LEN {
        return Err(WakeError::SendFailed(format!(
            "Short write to {}: {} of {} bytes",
            destination, sent, MAGIC_PACKET_LEN
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_target() {
        let target = WakeTarget::default();
        assert_eq!(
            target.socket_addr(),
            "255.255.255.255:9".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_invalid_address_sends_nothing() {
        // Point at a local socket so a stray datagram would be observable
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let port = listener.local_addr().unwrap().port();

        let sender = MagicPacketSender::new(WakeTarget::new(Ipv4Addr::LOCALHOST, port));
        let result = sender.send("AA:BB:CC");

        assert_eq!(result, Err(WakeError::AddressInvalid("AA:BB:CC".to_string())));

        let mut buf = [0u8; 256];
        let err = listener.recv_from(&mut buf).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::WouldBlock);
    }
}
