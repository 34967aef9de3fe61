// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The LCM client instance: publish, subscribe, close.

use crate::error::{Error, Result};
use crate::message::LcmMessage;
use crate::provider::UdpmConfig;
use crate::subscription::{Subscription, SubscriptionList};
use crate::transport::{UdpmListener, UdpmTransport};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An LCM client instance.
///
/// Owns the UDPM socket pair, the receiver thread, and the subscription
/// list. A process may construct multiple instances; each is independent.
///
/// # Example
///
/// ```rust,no_run
/// use lcm::Lcm;
///
/// let lcm = Lcm::new()?;
/// let subscription = lcm.subscribe("POSE", |channel, payload| {
///     println!("{}: {} bytes", channel, payload.len());
/// })?;
/// lcm.publish("POSE", &[1, 2, 3])?;
/// # Ok::<(), lcm::Error>(())
/// ```
pub struct Lcm {
    transport: Mutex<Option<UdpmTransport>>,
    listener: Mutex<Option<UdpmListener>>,
    subs: Arc<SubscriptionList>,
    closed: AtomicBool,
}

impl Lcm {
    /// Create an instance from `LCM_DEFAULT_URL`, or the default
    /// `udpm://239.255.76.67:7667?ttl=0` when the variable is unset.
    pub fn new() -> Result<Self> {
        Self::with_config(UdpmConfig::from_env_or_default()?)
    }

    /// Create an instance from an explicit provider URL.
    pub fn with_url(url: &str) -> Result<Self> {
        Self::with_config(UdpmConfig::parse(url)?)
    }

    fn with_config(config: UdpmConfig) -> Result<Self> {
        let transport = UdpmTransport::new(&config)?;
        let subs = Arc::new(SubscriptionList::new());
        let listener = UdpmListener::spawn(transport.recv_socket(), Arc::clone(&subs))?;
        log::debug!(
            "[LCM] instance up group={}:{} ttl={}",
            config.address,
            config.port,
            config.ttl
        );

        Ok(Self {
            transport: Mutex::new(Some(transport)),
            listener: Mutex::new(Some(listener)),
            subs,
            closed: AtomicBool::new(false),
        })
    }

    /// Publish raw `payload` bytes on `channel`.
    ///
    /// Synchronous; returns once the datagram(s) have been handed to the
    /// OS. Oversized payloads are fragmented transparently.
    pub fn publish(&self, channel: &str, payload: &[u8]) -> Result<()> {
        let transport = self.transport.lock();
        let transport = transport.as_ref().ok_or(Error::InstanceClosed)?;
        transport.publish(channel, payload)
    }

    /// Encode `message` and publish it on `channel`.
    pub fn publish_message<M: LcmMessage>(&self, channel: &str, message: &M) -> Result<()> {
        let payload = message.encode_to_vec()?;
        self.publish(channel, &payload)
    }

    /// Subscribe `handler` to channels matching `pattern`.
    ///
    /// The pattern is a regular expression anchored at both ends; it takes
    /// effect for deliveries after this call returns.
    pub fn subscribe<F>(&self, pattern: &str, handler: F) -> Result<Subscription>
    where
        F: Fn(&str, &[u8]) + Send + Sync + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::InstanceClosed);
        }
        self.subs.subscribe(pattern, Box::new(handler))
    }

    /// Remove a subscription by handle. Removal takes effect for
    /// subsequent deliveries; a delivery already in flight completes.
    pub fn unsubscribe(&self, subscription: Subscription) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::InstanceClosed);
        }
        if !self.subs.unsubscribe(subscription) {
            log::debug!("[LCM] unsubscribe on unknown handle");
        }
        Ok(())
    }

    /// Number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subs.len()
    }

    /// Receive-path metrics snapshot: (packets received, packets dropped,
    /// bytes received, handler errors). `None` once the instance is closed.
    pub fn rx_metrics(&self) -> Option<(u64, u64, u64, u64)> {
        self.listener.lock().as_ref().map(|l| l.metrics.snapshot())
    }

    /// Shut the instance down: stop the receiver thread, close both
    /// sockets, and clear subscriptions.
    ///
    /// Partially reassembled messages are discarded with the receiver
    /// thread and never surfaced to subscribers. Idempotent; subsequent
    /// `publish`/`subscribe` calls fail with [`Error::InstanceClosed`].
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(listener) = self.listener.lock().take() {
            listener.shutdown();
        }
        // Dropping the transport closes both sockets.
        self.transport.lock().take();
        self.subs.clear();
        log::debug!("[LCM] instance closed");
    }
}

impl Drop for Lcm {
    fn drop(&mut self) {
        self.close();
    }
}
