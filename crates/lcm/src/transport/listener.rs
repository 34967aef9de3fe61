// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UDPM listener thread: receive, reassemble, dispatch.
//!
//! Spawns a dedicated IO thread that waits for socket readability with
//! mio, drains all available datagrams per wakeup, reassembles fragmented
//! messages, and dispatches complete messages to matching subscriptions.
//!
//! ```text
//! mio::poll() -> recv_from(temp_buf) -> parse_datagram() -> FragmentStore -> dispatch()
//! ```

use crate::protocol::{self, Datagram};
use crate::subscription::SubscriptionList;
use crate::transport::fragment::FragmentStore;
use mio::{Events, Interest, Poll, Token};
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Largest possible UDP datagram.
const MAX_DATAGRAM_SIZE: usize = 65_536;

/// Listener metrics for diagnostics.
#[derive(Debug)]
pub struct ListenerMetrics {
    /// Total datagrams received (all kinds).
    pub packets_received: AtomicU64,
    /// Datagrams dropped (runt, bad magic, reassembly inconsistency).
    pub packets_dropped: AtomicU64,
    /// Total bytes received.
    pub bytes_received: AtomicU64,
    /// Handler panics caught during dispatch.
    pub handler_errors: AtomicU64,
}

impl ListenerMetrics {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            packets_received: AtomicU64::new(0),
            packets_dropped: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            handler_errors: AtomicU64::new(0),
        })
    }

    /// Get snapshot of metrics.
    pub fn snapshot(&self) -> (u64, u64, u64, u64) {
        (
            self.packets_received.load(Ordering::Relaxed),
            self.packets_dropped.load(Ordering::Relaxed),
            self.bytes_received.load(Ordering::Relaxed),
            self.handler_errors.load(Ordering::Relaxed),
        )
    }
}

/// Datagram processing state owned by the listener thread.
///
/// Separate from the thread machinery so the receive path can be exercised
/// directly in tests without sockets.
pub(crate) struct RxState {
    store: FragmentStore,
    subs: Arc<SubscriptionList>,
    metrics: Arc<ListenerMetrics>,
}

impl RxState {
    pub fn new(subs: Arc<SubscriptionList>, metrics: Arc<ListenerMetrics>) -> Self {
        Self {
            store: FragmentStore::new(),
            subs,
            metrics,
        }
    }

    /// Classify and handle one received datagram.
    pub fn process_datagram(&mut self, src: SocketAddr, data: &[u8]) {
        self.metrics.packets_received.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .bytes_received
            .fetch_add(data.len() as u64, Ordering::Relaxed);

        match protocol::parse_datagram(data) {
            Some(Datagram::Short { channel, payload }) => {
                self.dispatch(channel, payload);
            }
            Some(Datagram::Fragment {
                seq,
                total_size,
                offset,
                index,
                count,
                channel,
                chunk,
            }) => {
                let before = self.store.len();
                let complete = self
                    .store
                    .insert(src, seq, total_size, offset, index, count, channel, chunk);
                match complete {
                    Some((channel, payload)) => {
                        self.dispatch(&channel, &payload);
                    }
                    None => {
                        // An insert that shrank the table without producing a
                        // message dropped an inconsistent slot.
                        if self.store.len() < before {
                            self.metrics.packets_dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            }
            None => {
                self.metrics.packets_dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!("[RX] dropping unrecognized datagram len={} src={}", data.len(), src);
            }
        }
    }

    fn dispatch(&self, channel: &str, payload: &[u8]) {
        let (matched, panicked) = self.subs.dispatch(channel, payload);
        if panicked > 0 {
            self.metrics
                .handler_errors
                .fetch_add(panicked as u64, Ordering::Relaxed);
        }
        log::debug!(
            "[RX] dispatched channel='{}' len={} matches={}",
            channel,
            payload.len(),
            matched
        );
    }
}

/// UDPM listener thread handle.
///
/// Signals the thread through a running flag and joins it on shutdown or
/// drop.
pub(crate) struct UdpmListener {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    pub metrics: Arc<ListenerMetrics>,
}

impl UdpmListener {
    /// Spawn the listener thread on `socket`, dispatching to `subs`.
    pub fn spawn(socket: Arc<UdpSocket>, subs: Arc<SubscriptionList>) -> io::Result<Self> {
        socket.set_nonblocking(true)?;

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);

        let metrics = ListenerMetrics::new();
        let metrics_clone = Arc::clone(&metrics);

        let handle = std::thread::Builder::new()
            .name("lcm-udpm-rx".to_string())
            .spawn(move || {
                Self::run_loop(socket, subs, running_clone, metrics_clone);
            })?;

        Ok(Self {
            handle: Some(handle),
            running,
            metrics,
        })
    }

    /// Main IO loop (runs in the dedicated thread).
    fn run_loop(
        socket: Arc<UdpSocket>,
        subs: Arc<SubscriptionList>,
        running: Arc<AtomicBool>,
        metrics: Arc<ListenerMetrics>,
    ) {
        let local_addr = socket
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());
        log::debug!(
            "[RX] listener started addr={} thread={:?}",
            local_addr,
            std::thread::current().id()
        );

        let mut poll = match Poll::new() {
            Ok(p) => p,
            Err(e) => {
                log::error!("[RX] failed to create poll: {}", e);
                return;
            }
        };
        let mut events = Events::with_capacity(16);

        // Clone the socket for mio registration; Arc<UdpSocket> does not
        // implement Source.
        let socket_clone = match socket.try_clone() {
            Ok(s) => s,
            Err(e) => {
                log::error!("[RX] failed to clone socket: {}", e);
                return;
            }
        };
        let mut mio_socket = mio::net::UdpSocket::from_std(socket_clone);

        const SOCKET_TOKEN: Token = Token(0);
        if let Err(e) = poll
            .registry()
            .register(&mut mio_socket, SOCKET_TOKEN, Interest::READABLE)
        {
            log::error!("[RX] failed to register socket with poll: {}", e);
            return;
        }

        let mut state = RxState::new(subs, metrics);
        let mut temp_buf = vec![0u8; MAX_DATAGRAM_SIZE];

        while running.load(Ordering::Relaxed) {
            // Short timeout so the shutdown flag is observed promptly.
            if let Err(e) = poll.poll(&mut events, Some(Duration::from_millis(100))) {
                if e.kind() != io::ErrorKind::Interrupted {
                    log::debug!("[RX] poll error: {:?}", e);
                }
                continue;
            }

            for event in events.iter() {
                if event.token() != SOCKET_TOKEN {
                    continue;
                }

                // Drain all available datagrams (edge-triggered style).
                loop {
                    let (len, src_addr) = match mio_socket.recv_from(&mut temp_buf) {
                        Ok(result) => result,
                        Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                        Err(e) => {
                            log::debug!("[RX] recv_from error: {:?}", e);
                            break;
                        }
                    };
                    state.process_datagram(src_addr, &temp_buf[..len]);
                }
            }
        }

        log::debug!("[RX] listener stopped addr={}", local_addr);
    }

    /// Shutdown listener gracefully: signal the thread and join it.
    pub fn shutdown(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for UdpmListener {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode_fragment, encode_short, fragment_count, FRAGMENT_MAX_PAYLOAD};
    use parking_lot::Mutex;

    fn collector(
        subs: &SubscriptionList,
        pattern: &str,
    ) -> Arc<Mutex<Vec<(String, Vec<u8>)>>> {
        let seen: Arc<Mutex<Vec<(String, Vec<u8>)>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        subs.subscribe(
            pattern,
            Box::new(move |channel, payload| {
                seen_clone.lock().push((channel.to_string(), payload.to_vec()));
            }),
        )
        .expect("Subscribe should succeed");
        seen
    }

    fn sender() -> SocketAddr {
        "192.168.1.5:41234".parse().expect("Address should parse")
    }

    fn rx_state(subs: Arc<SubscriptionList>) -> (RxState, Arc<ListenerMetrics>) {
        let metrics = ListenerMetrics::new();
        (RxState::new(subs, Arc::clone(&metrics)), metrics)
    }

    /// Cut `payload` into fragment datagrams the way the publish path does.
    fn make_fragments(seq: u32, channel: &str, payload: &[u8]) -> Vec<Vec<u8>> {
        let count = fragment_count(channel.len(), payload.len()).expect("Count should succeed");
        let mut packets = Vec::new();
        let mut offset = 0usize;
        for index in 0..count {
            let budget = if index == 0 {
                FRAGMENT_MAX_PAYLOAD - (channel.len() + 1)
            } else {
                FRAGMENT_MAX_PAYLOAD
            };
            let chunk_len = budget.min(payload.len() - offset);
            packets.push(encode_fragment(
                seq,
                payload.len() as u32,
                offset as u32,
                index,
                count,
                (index == 0).then_some(channel),
                &payload[offset..offset + chunk_len],
            ));
            offset += chunk_len;
        }
        packets
    }

    #[test]
    fn test_short_datagram_dispatched() {
        let subs = Arc::new(SubscriptionList::new());
        let seen = collector(&subs, "TEST");
        let (mut state, metrics) = rx_state(Arc::clone(&subs));

        state.process_datagram(sender(), &encode_short(0, "TEST", &[1, 2, 3, 4, 5]));

        let messages = seen.lock();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, "TEST");
        assert_eq!(messages[0].1, vec![1, 2, 3, 4, 5]);

        let (received, dropped, _, errors) = metrics.snapshot();
        assert_eq!(received, 1);
        assert_eq!(dropped, 0);
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_large_message_reassembled_in_order() {
        let subs = Arc::new(SubscriptionList::new());
        let seen = collector(&subs, "BIG");
        let (mut state, _metrics) = rx_state(Arc::clone(&subs));

        let payload: Vec<u8> = (0..200_000usize).map(|i| (i % 251) as u8).collect();
        for packet in make_fragments(7, "BIG", &payload) {
            state.process_datagram(sender(), &packet);
        }

        let messages = seen.lock();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, "BIG");
        assert_eq!(messages[0].1, payload);
    }

    #[test]
    fn test_large_message_reassembled_out_of_order() {
        let subs = Arc::new(SubscriptionList::new());
        let seen = collector(&subs, "BIG");
        let (mut state, _metrics) = rx_state(Arc::clone(&subs));

        let payload: Vec<u8> = (0..200_000usize).map(|i| (i % 247) as u8).collect();
        let mut packets = make_fragments(9, "BIG", &payload);
        packets.reverse();
        for packet in packets {
            state.process_datagram(sender(), &packet);
        }

        let messages = seen.lock();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1, payload);
    }

    #[test]
    fn test_interleaved_senders_reassemble_independently() {
        let subs = Arc::new(SubscriptionList::new());
        let seen = collector(&subs, "BIG");
        let (mut state, _metrics) = rx_state(Arc::clone(&subs));

        let other: SocketAddr = "192.168.1.6:41234".parse().expect("Address should parse");
        let payload_a: Vec<u8> = vec![0xAA; 100_000];
        let payload_b: Vec<u8> = vec![0xBB; 100_000];
        let frags_a = make_fragments(1, "BIG", &payload_a);
        let frags_b = make_fragments(1, "BIG", &payload_b);

        // Interleave fragments from two senders sharing a sequence number.
        for (a, b) in frags_a.iter().zip(frags_b.iter()) {
            state.process_datagram(sender(), a);
            state.process_datagram(other, b);
        }

        let messages = seen.lock();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].1, payload_a);
        assert_eq!(messages[1].1, payload_b);
    }

    #[test]
    fn test_runt_and_unknown_magic_counted_as_dropped() {
        let subs = Arc::new(SubscriptionList::new());
        let (mut state, metrics) = rx_state(Arc::clone(&subs));

        state.process_datagram(sender(), &[1, 2, 3]);
        state.process_datagram(sender(), &[0xFF; 32]);

        let (received, dropped, _, _) = metrics.snapshot();
        assert_eq!(received, 2);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn test_handler_panic_counted_but_not_fatal() {
        let subs = Arc::new(SubscriptionList::new());
        subs.subscribe("CH", Box::new(|_, _| panic!("handler failure")))
            .expect("Subscribe should succeed");
        let seen = collector(&subs, "CH");
        let (mut state, metrics) = rx_state(Arc::clone(&subs));

        state.process_datagram(sender(), &encode_short(0, "CH", &[1]));

        assert_eq!(seen.lock().len(), 1);
        let (_, _, _, errors) = metrics.snapshot();
        assert_eq!(errors, 1);
    }
}
