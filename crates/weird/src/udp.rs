//! UDP transport — one datagram per framed unit.
//!
//! Sends never wait: a full socket buffer drops the unit, which the
//! scheduler's rate budget is there to avoid in the first place.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio::net::UdpSocket;

use weir_core::config::PeerConfig;
use weir_core::NodeId;
use weir_services::Transport;

/// Largest datagram accepted from a peer.
const MAX_DATAGRAM: usize = 65536;

pub struct UdpTransport {
    socket: UdpSocket,
    peers: HashMap<NodeId, SocketAddr>,
    /// Scratch space for incoming datagrams, reused across receives.
    recv_buf: Mutex<Box<[u8]>>,
}

impl UdpTransport {
    pub async fn bind(listen: &str, peers: &[PeerConfig]) -> Result<Self> {
        let socket = UdpSocket::bind(listen)
            .await
            .with_context(|| format!("failed to bind server link on {listen}"))?;
        let peers = peers
            .iter()
            .map(|p| {
                let addr = p
                    .addr
                    .parse::<SocketAddr>()
                    .with_context(|| format!("peer {} has invalid address {}", p.id, p.addr))?;
                Ok((p.id, addr))
            })
            .collect::<Result<HashMap<_, _>>>()?;
        // Prime write readiness so the first try_send_to does not bounce.
        socket.writable().await?;
        Ok(Self {
            socket,
            peers,
            recv_buf: Mutex::new(vec![0u8; MAX_DATAGRAM].into_boxed_slice()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl Transport for UdpTransport {
    fn send(&self, dest: NodeId, unit: Bytes) {
        let Some(addr) = self.peers.get(&dest) else {
            tracing::warn!(%dest, "no address for destination, unit dropped");
            return;
        };
        match self.socket.try_send_to(&unit, *addr) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                tracing::debug!(%dest, size = unit.len(), "socket buffer full, unit dropped");
            }
            Err(e) => tracing::warn!(%dest, error = %e, "send failed"),
        }
    }

    fn poll_next(&self) -> Option<Bytes> {
        let mut buf = self.recv_buf.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match self.socket.try_recv_from(&mut buf) {
                Ok((len, _from)) => return Some(Bytes::copy_from_slice(&buf[..len])),
                Err(e) if e.kind() == ErrorKind::WouldBlock => return None,
                Err(e) => {
                    // ICMP errors from earlier sends surface here on some platforms
                    tracing::trace!(error = %e, "recv error, skipping");
                    continue;
                }
            }
        }
    }
}
