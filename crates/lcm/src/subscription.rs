// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Channel subscriptions and message dispatch.
//!
//! Subscriptions pair an anchored regular expression with a handler
//! callback. Every delivered message is offered to every subscription whose
//! pattern matches the channel name, in insertion order.

use crate::error::{Error, Result};
use parking_lot::RwLock;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handler callback invoked with (channel, payload).
pub type Handler = Box<dyn Fn(&str, &[u8]) + Send + Sync + 'static>;

/// Opaque subscription handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    id: u64,
}

struct Entry {
    id: u64,
    pattern: Regex,
    handler: Handler,
}

/// Ordered subscription registry shared between the API and the receiver
/// thread.
pub(crate) struct SubscriptionList {
    entries: RwLock<Vec<Arc<Entry>>>,
    next_id: AtomicU64,
}

impl SubscriptionList {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Compile `pattern` anchored at both ends and append a new entry.
    pub fn subscribe(&self, pattern: &str, handler: Handler) -> Result<Subscription> {
        let anchored = format!("^{}$", pattern);
        let pattern = Regex::new(&anchored).map_err(|e| Error::InvalidPattern(e.to_string()))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.write().push(Arc::new(Entry {
            id,
            pattern,
            handler,
        }));
        Ok(Subscription { id })
    }

    /// Remove a subscription by handle identity. Returns whether an entry
    /// was removed.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.id != subscription.id);
        entries.len() != before
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Offer (channel, payload) to every matching subscription.
    ///
    /// Handlers run outside the registry lock, so a handler may subscribe
    /// or unsubscribe without deadlocking; such changes affect subsequent
    /// deliveries only. Panicking handlers are caught and logged, and do
    /// not interrupt delivery to the remaining matches.
    ///
    /// Returns (matched, panicked) counts.
    pub fn dispatch(&self, channel: &str, payload: &[u8]) -> (usize, usize) {
        let matches: Vec<Arc<Entry>> = self
            .entries
            .read()
            .iter()
            .filter(|e| e.pattern.is_match(channel))
            .cloned()
            .collect();

        let mut panicked = 0;
        for entry in &matches {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                (entry.handler)(channel, payload);
            }));
            if result.is_err() {
                panicked += 1;
                log::error!(
                    "[RX] handler for subscription {} panicked on channel '{}'",
                    entry.id,
                    channel
                );
            }
        }
        (matches.len(), panicked)
    }
}
