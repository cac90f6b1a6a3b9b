//! Datagram link to the game server.
//!
//! The board binds one UDP port, receives commands on it and sends status
//! updates from it to the registered listener.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};

use log::{debug, info, warn};

use crate::traits::StatusTransport;

/// Non-blocking UDP socket implementing [`StatusTransport`].
pub struct Esp32Udp {
    socket: UdpSocket,
}

impl Esp32Udp {
    /// Binds `0.0.0.0:port` in non-blocking mode.
    pub fn bind(port: u16) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))?;
        socket.set_nonblocking(true)?;
        info!("UDP listening on port {}", port);
        Ok(Self { socket })
    }

    /// Local address of the socket.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }
}

impl StatusTransport for Esp32Udp {
    type Error = std::io::Error;

    fn send_to(&mut self, dest: SocketAddrV4, payload: &[u8]) -> Result<(), Self::Error> {
        self.socket.send_to(payload, dest)?;
        Ok(())
    }

    fn try_recv(&mut self, buf: &mut [u8]) -> Option<usize> {
        match self.socket.recv_from(buf) {
            Ok((len, from)) => {
                debug!("Received {} bytes from {}", len, from);
                Some(len)
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => None,
            Err(e) => {
                warn!("UDP receive failed: {}", e);
                None
            }
        }
    }
}
