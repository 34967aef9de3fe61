// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport provider URL parsing.
//!
//! LCM instances are configured by a provider URL of the form
//! `udpm://[address[:port]]?ttl=N`. Only the `udpm` scheme is supported.

use crate::error::{Error, Result};
use std::net::Ipv4Addr;

/// Default multicast group address.
pub const DEFAULT_ADDRESS: Ipv4Addr = Ipv4Addr::new(239, 255, 76, 67);
/// Default multicast port.
pub const DEFAULT_PORT: u16 = 7667;
/// Default time-to-live: packets stay on the local host.
pub const DEFAULT_TTL: u32 = 0;

/// Environment variable consulted by [`UdpmConfig::from_env_or_default`].
pub const DEFAULT_URL_ENV: &str = "LCM_DEFAULT_URL";

/// Parsed UDPM provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpmConfig {
    /// Multicast group address.
    pub address: Ipv4Addr,
    /// Multicast port.
    pub port: u16,
    /// Multicast time-to-live.
    pub ttl: u32,
}

impl Default for UdpmConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            port: DEFAULT_PORT,
            ttl: DEFAULT_TTL,
        }
    }
}

impl UdpmConfig {
    /// Parse a provider URL.
    ///
    /// Omitted components fall back to the defaults. `ttl > 1` sends
    /// packets beyond the local subnet, which is rarely intended, so it
    /// logs a warning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProvider`] on an unknown scheme, a
    /// non-multicast address, or a malformed component.
    pub fn parse(url: &str) -> Result<Self> {
        let rest = url.strip_prefix("udpm://").ok_or_else(|| {
            Error::InvalidProvider(format!("unsupported scheme in '{}' (expected udpm://)", url))
        })?;

        let (authority, query) = match rest.split_once('?') {
            Some((a, q)) => (a, Some(q)),
            None => (rest, None),
        };

        let mut config = Self::default();

        if !authority.is_empty() {
            let (addr_str, port_str) = match authority.split_once(':') {
                Some((a, p)) => (a, Some(p)),
                None => (authority, None),
            };
            config.address = addr_str
                .parse()
                .map_err(|_| Error::InvalidProvider(format!("invalid address '{}'", addr_str)))?;
            if let Some(port_str) = port_str {
                config.port = port_str
                    .parse()
                    .map_err(|_| Error::InvalidProvider(format!("invalid port '{}'", port_str)))?;
            }
        }

        if let Some(query) = query {
            for param in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = param.split_once('=').ok_or_else(|| {
                    Error::InvalidProvider(format!("malformed query parameter '{}'", param))
                })?;
                match key {
                    "ttl" => {
                        config.ttl = value.parse().map_err(|_| {
                            Error::InvalidProvider(format!("invalid ttl '{}'", value))
                        })?;
                    }
                    other => {
                        return Err(Error::InvalidProvider(format!(
                            "unknown query parameter '{}'",
                            other
                        )));
                    }
                }
            }
        }

        if !config.address.is_multicast() {
            return Err(Error::InvalidProvider(format!(
                "'{}' is not a multicast address",
                config.address
            )));
        }

        if config.ttl > 1 {
            log::warn!(
                "[UDPM] ttl={} will send packets beyond the local subnet",
                config.ttl
            );
        }

        Ok(config)
    }

    /// Configuration from the `LCM_DEFAULT_URL` environment variable, or the
    /// defaults when unset.
    pub fn from_env_or_default() -> Result<Self> {
        match std::env::var(DEFAULT_URL_ENV) {
            Ok(url) => Self::parse(&url),
            Err(_) => Ok(Self::default()),
        }
    }
}
