use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::UdpSocket;

/* === Definitions === */

/// Sends a single command datagram. Nothing is read back, the fans never
/// acknowledge a command.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, addr: SocketAddr, payload: &[u8]) -> Result<(), TransmitError>;
}

/// Binds a fresh socket for every datagram and drops it straight after.
#[derive(Clone, Copy, Debug, Default)]
pub struct UdpLink;

#[derive(Debug, Error)]
pub enum TransmitError {
    #[error("Failed to bind socket: {0}")]
    Bind(#[source] io::Error),

    #[error("Failed to send datagram to {addr}: {source}")]
    Send { addr: SocketAddr, source: io::Error },

    #[error("Short send to {addr}: {sent} of {expected} bytes")]
    Truncated {
        addr: SocketAddr,
        sent: usize,
        expected: usize,
    },

    #[error("Dispatch task failed: {0}")]
    Aborted(String),
}

/* === Implementations === */

impl UdpLink {
    fn local_addr(remote: SocketAddr) -> SocketAddr {
        match remote {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        }
    }
}

#[async_trait]
impl Transport for UdpLink {
    async fn send(&self, addr: SocketAddr, payload: &[u8]) -> Result<(), TransmitError> {
        let socket = UdpSocket::bind(Self::local_addr(addr))
            .await
            .map_err(TransmitError::Bind)?;

        let sent = socket
            .send_to(payload, addr)
            .await
            .map_err(|source| TransmitError::Send { addr, source })?;

        if sent != payload.len() {
            return Err(TransmitError::Truncated {
                addr,
                sent,
                expected: payload.len(),
            });
        }

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn test_udp_link_sends_payload() {
        let receiver = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = receiver.local_addr().unwrap();

        UdpLink.send(addr, b"ON_BYTES").await.unwrap();

        let mut buf = [0u8; 64];
        let (size, _) = timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(&buf[..size], b"ON_BYTES");
    }

    #[tokio::test]
    async fn test_udp_link_one_datagram_per_send() {
        let receiver = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = receiver.local_addr().unwrap();

        UdpLink.send(addr, b"FIRST").await.unwrap();
        UdpLink.send(addr, b"SECOND").await.unwrap();

        let mut buf = [0u8; 64];

        for expected in [&b"FIRST"[..], &b"SECOND"[..]] {
            let (size, _) = timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
                .await
                .unwrap()
                .unwrap();

            assert_eq!(&buf[..size], expected);
        }
    }

    #[test]
    fn test_local_addr_matches_family() {
        let v4: SocketAddr = "192.168.0.130:5600".parse().unwrap();
        let v6: SocketAddr = "[::1]:5600".parse().unwrap();

        assert!(UdpLink::local_addr(v4).is_ipv4());
        assert!(UdpLink::local_addr(v6).is_ipv6());
    }
}
