// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UDPM transport: socket ownership and the publish path.
//!
//! Owns the receive socket (bound to the multicast port, joined to the
//! group) and the send socket (ephemeral port). Serializes outbound
//! messages into a single short packet or a sequence of fragments.

use crate::error::{Error, Result};
use crate::protocol::{
    self, FRAGMENT_MAX_PAYLOAD, SHORT_MESSAGE_MAX_SIZE,
};
use crate::provider::UdpmConfig;
use crate::transport::multicast::join_multicast_group;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// UDPM transport for bidirectional multicast communication.
///
/// The receive socket is shared with the listener thread; the send socket
/// is used exclusively by the publish path.
pub struct UdpmTransport {
    /// Receive socket, bound to the multicast port on all interfaces.
    recv_socket: Arc<UdpSocket>,
    /// Send socket, bound to an ephemeral port.
    send_socket: UdpSocket,
    /// Multicast destination address.
    dest: SocketAddr,
    /// Per-message sequence counter (incremented once per logical message).
    seq: AtomicU32,
}

impl UdpmTransport {
    /// Create the UDPM socket pair for `config`.
    ///
    /// Binds the receive socket to the multicast port with SO_REUSEADDR so
    /// multiple instances on one host can listen, joins the multicast
    /// group, and applies the configured TTL to the send socket.
    pub fn new(config: &UdpmConfig) -> Result<Self> {
        let socket2 = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        // SO_REUSEADDR lets multiple instances on one host share the
        // multicast port. On BSD-derived stacks that needs SO_REUSEPORT.
        socket2.set_reuse_address(true)?;
        #[cfg(any(target_os = "macos", target_os = "freebsd"))]
        socket2.set_reuse_port(true)?;

        let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.port);
        socket2.bind(&SocketAddr::from(bind_addr).into())?;
        log::debug!(
            "[UDPM] recv socket bound to {} group={}",
            bind_addr,
            config.address
        );

        let recv_socket: UdpSocket = socket2.into();
        join_multicast_group(&recv_socket, config.address)?;

        let send_socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        send_socket.set_multicast_ttl_v4(config.ttl)?;
        send_socket.set_multicast_loop_v4(true)?;
        log::debug!(
            "[UDPM] send socket bound to {} ttl={}",
            send_socket.local_addr()?,
            config.ttl
        );

        Ok(Self {
            recv_socket: Arc::new(recv_socket),
            send_socket,
            dest: SocketAddr::V4(SocketAddrV4::new(config.address, config.port)),
            seq: AtomicU32::new(0),
        })
    }

    /// Get shared receive socket reference for the listener thread.
    #[must_use]
    pub fn recv_socket(&self) -> Arc<UdpSocket> {
        Arc::clone(&self.recv_socket)
    }

    /// Get the multicast destination address.
    #[must_use]
    pub fn dest(&self) -> SocketAddr {
        self.dest
    }

    /// Publish `payload` on `channel`, fragmenting when it cannot fit a
    /// single short packet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelNameTooLong`] for channels over 63 ASCII
    /// bytes, [`Error::MessageTooLarge`] when more than 65535 fragments
    /// would be needed, and I/O errors from the underlying send.
    pub fn publish(&self, channel: &str, payload: &[u8]) -> Result<()> {
        protocol::validate_channel(channel)?;

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let need = channel.len() + 1 + payload.len();

        if need <= SHORT_MESSAGE_MAX_SIZE {
            let packet = protocol::encode_short(seq, channel, payload);
            self.send(&packet)?;
            log::debug!(
                "[UDPM] sent short seq={} channel='{}' len={}",
                seq,
                channel,
                payload.len()
            );
            return Ok(());
        }

        self.publish_fragments(seq, channel, payload)
    }

    /// Send `payload` as a fragment sequence, ascending index order.
    fn publish_fragments(&self, seq: u32, channel: &str, payload: &[u8]) -> Result<()> {
        let count = protocol::fragment_count(channel.len(), payload.len())?;
        // The fragmented path is only taken for payloads beyond the short
        // limit, which always fit u32 offsets.
        let total_size = payload.len() as u32;

        let mut offset = 0usize;
        for index in 0..count {
            let budget = if index == 0 {
                FRAGMENT_MAX_PAYLOAD - (channel.len() + 1)
            } else {
                FRAGMENT_MAX_PAYLOAD
            };
            let chunk_len = budget.min(payload.len() - offset);
            let chunk = &payload[offset..offset + chunk_len];
            let channel_field = (index == 0).then_some(channel);

            let packet = protocol::encode_fragment(
                seq,
                total_size,
                offset as u32,
                index,
                count,
                channel_field,
                chunk,
            );
            self.send(&packet)?;
            offset += chunk_len;
        }

        log::debug!(
            "[UDPM] sent fragmented seq={} channel='{}' len={} fragments={}",
            seq,
            channel,
            payload.len(),
            count
        );
        Ok(())
    }

    fn send(&self, packet: &[u8]) -> Result<()> {
        match self.send_socket.send_to(packet, self.dest) {
            Ok(_) => Ok(()),
            Err(err) => {
                log::debug!(
                    "[UDPM] send error={} dest={} len={}",
                    err,
                    self.dest,
                    packet.len()
                );
                Err(Error::Io(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(port: u16) -> UdpmConfig {
        UdpmConfig {
            address: Ipv4Addr::new(239, 255, 76, 67),
            port,
            ttl: 0,
        }
    }

    #[test]
    #[ignore = "requires UDP socket, flaky in CI"]
    fn test_transport_creation() {
        let transport = UdpmTransport::new(&test_config(17667));
        assert!(transport.is_ok(), "Transport creation should succeed");

        let transport = transport.expect("Transport creation should succeed");
        assert_eq!(transport.dest().to_string(), "239.255.76.67:17667");
    }

    #[test]
    #[ignore = "requires UDP socket, flaky in CI"]
    fn test_publish_short_message() {
        let transport =
            UdpmTransport::new(&test_config(17668)).expect("Transport creation should succeed");
        let result = transport.publish("TEST", &[1, 2, 3, 4, 5]);
        assert!(result.is_ok(), "Short publish should succeed");
    }

    #[test]
    #[ignore = "requires UDP socket, flaky in CI"]
    fn test_publish_rejects_long_channel() {
        let transport =
            UdpmTransport::new(&test_config(17669)).expect("Transport creation should succeed");
        let channel = "C".repeat(64);
        assert!(matches!(
            transport.publish(&channel, &[0]),
            Err(Error::ChannelNameTooLong(64))
        ));
    }

    #[test]
    #[ignore = "requires UDP socket, flaky in CI"]
    fn test_sequence_increments_per_message() {
        let transport =
            UdpmTransport::new(&test_config(17670)).expect("Transport creation should succeed");
        transport.publish("A", &[0]).expect("Publish should succeed");
        transport.publish("A", &[0]).expect("Publish should succeed");
        assert_eq!(transport.seq.load(Ordering::Relaxed), 2);
    }
}
