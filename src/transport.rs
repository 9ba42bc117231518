//! Datagram transport
//!
//! One serialized record per UDP datagram, fire-and-forget. The socket is
//! bound once when the transmitter is opened and closed when it is dropped;
//! sends through one transmitter are serialized.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::TransportConfig;
use crate::error::TransportError;

/// Largest UDP payload over IPv4
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Payload size above which datagrams are likely to be IP-fragmented on a LAN
pub const FRAGMENTATION_WARN_BYTES: usize = 1_400;

/// Destination for encoded records
pub trait DatagramSink: Send + Sync {
    /// Send one payload as a single datagram, returning the bytes written
    fn send_datagram(&self, payload: &[u8]) -> Result<usize, TransportError>;
}

/// UDP transmitter bound once and reused for every frame
#[derive(Debug)]
pub struct UdpTransmitter {
    socket: Mutex<UdpSocket>,
    local_addr: SocketAddr,
    destination: SocketAddr,
    max_datagram_bytes: usize,
    warn_datagram_bytes: usize,
    warned_size: AtomicBool,
}

impl UdpTransmitter {
    /// Bind the local socket and resolve the destination
    pub fn open(config: &TransportConfig) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(&config.bind_address).map_err(|source| TransportError::Bind {
            addr: config.bind_address.clone(),
            source,
        })?;

        let local_addr = socket.local_addr().map_err(|source| TransportError::Bind {
            addr: config.bind_address.clone(),
            source,
        })?;

        let destination = resolve(&config.host, config.port, local_addr)?;

        socket
            .set_nonblocking(true)
            .map_err(|source| TransportError::Bind {
                addr: config.bind_address.clone(),
                source,
            })?;

        tracing::info!("UDP transmitter bound on {} sending to {}", local_addr, destination);

        Ok(Self {
            socket: Mutex::new(socket),
            local_addr,
            destination,
            max_datagram_bytes: config.max_datagram_bytes.min(MAX_UDP_PAYLOAD),
            warn_datagram_bytes: config.warn_datagram_bytes,
            warned_size: AtomicBool::new(false),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }
}

impl DatagramSink for UdpTransmitter {
    fn send_datagram(&self, payload: &[u8]) -> Result<usize, TransportError> {
        if payload.len() > self.max_datagram_bytes {
            return Err(TransportError::Oversize {
                len: payload.len(),
                max: self.max_datagram_bytes,
            });
        }

        if payload.len() > self.warn_datagram_bytes && !self.warned_size.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                "Datagram of {} bytes exceeds {} bytes and may be fragmented",
                payload.len(),
                self.warn_datagram_bytes
            );
        }

        let socket = self.socket.lock().map_err(|_| TransportError::Poisoned)?;
        socket
            .send_to(payload, self.destination)
            .map_err(|source| TransportError::Send {
                addr: self.destination,
                source,
            })
    }
}

impl Drop for UdpTransmitter {
    fn drop(&mut self) {
        tracing::info!("UDP transmitter to {} closed", self.destination);
    }
}

/// Resolve `host:port`, preferring an address of the bound socket's family
fn resolve(host: &str, port: u16, local: SocketAddr) -> Result<SocketAddr, TransportError> {
    let target = format!("{host}:{port}");
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| TransportError::Resolve(format!("{target}: {e}")))?
        .collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4() == local.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or(TransportError::Resolve(target))
}

/// Running delivery counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransmitStats {
    pub frames_sent: u64,
    pub frames_dropped: u64,
    pub bytes_sent: u64,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl TransmitStats {
    pub fn record_sent(&mut self, bytes: usize) {
        self.frames_sent += 1;
        self.bytes_sent += bytes as u64;
        self.last_sent_at = Some(Utc::now());
    }

    pub fn record_dropped(&mut self, reason: &str) {
        self.frames_dropped += 1;
        self.last_error = Some(reason.to_string());
    }
}
